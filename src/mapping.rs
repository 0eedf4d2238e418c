//! Pluggable per-slot mappings for hash-indexed tries.
//!
//! The adaptive tries index by integer only. To serve as the substrate of a
//! hash map or hash set, they store an opaque *mapping* in each slot and index
//! it by the hash code of the keys it holds. Everything that depends on the
//! key type (equality, collision chaining, how many entries a mapping holds)
//! is delegated to a [`MappingStrategy`].
//!
//! # Contract
//!
//! - [`assign`](MappingStrategy::assign) and
//!   [`update`](MappingStrategy::update) always return a mapping holding at
//!   least one entry.
//! - [`delete`](MappingStrategy::delete) reports
//!   [`Removal::Unchanged`] when the key is absent, [`Removal::Updated`] with
//!   a non-empty mapping, or [`Removal::Removed`] when the last entry left.
//! - [`size`](MappingStrategy::size) reports the live entries of one mapping;
//!   the trie sums it to keep its own size exact across collisions.
//!
//! A strategy that breaks the contract makes the trie panic.
//!
//! # Examples
//!
//! ```rust
//! use trie_array::{MappedTrieArray, MappingStrategy, Removal};
//!
//! /// Collisions are chained in a small vector.
//! #[derive(Clone, Copy)]
//! struct Chained;
//!
//! impl MappingStrategy<String, i32> for Chained {
//!     type Mapping = Vec<(String, i32)>;
//!
//!     fn assign(&self, current: Option<&Self::Mapping>, key: String, value: i32) -> Self::Mapping {
//!         self.update(current, key, |_| value)
//!     }
//!
//!     fn update<G>(&self, current: Option<&Self::Mapping>, key: String, generator: G) -> Self::Mapping
//!     where
//!         G: FnOnce(Option<&i32>) -> i32,
//!     {
//!         let mut entries = current.cloned().unwrap_or_default();
//!         match entries.iter_mut().find(|(existing, _)| *existing == key) {
//!             Some(entry) => entry.1 = generator(Some(&entry.1)),
//!             None => entries.push((key, generator(None))),
//!         }
//!         entries
//!     }
//!
//!     fn delete(&self, current: &Self::Mapping, key: &String) -> Removal<Self::Mapping> {
//!         match current.iter().position(|(existing, _)| existing == key) {
//!             None => Removal::Unchanged,
//!             Some(_) if current.len() == 1 => Removal::Removed,
//!             Some(position) => {
//!                 let mut entries = current.clone();
//!                 entries.remove(position);
//!                 Removal::Updated(entries)
//!             }
//!         }
//!     }
//!
//!     fn size(&self, mapping: &Self::Mapping) -> usize {
//!         mapping.len()
//!     }
//!
//!     fn find<'a>(&self, mapping: &'a Self::Mapping, key: &String) -> Option<&'a i32> {
//!         mapping.iter().find(|(existing, _)| existing == key).map(|(_, value)| value)
//!     }
//! }
//!
//! // Two keys sharing hash code 7 live in one slot.
//! let map = MappedTrieArray::new(Chained)
//!     .assign(7, "a".to_string(), 1)
//!     .assign(7, "b".to_string(), 2);
//! assert_eq!(map.len(), 2);
//! assert_eq!(map.mapping_count(), 1);
//! assert_eq!(map.find(7, &"b".to_string()), Some(&2));
//! ```

/// Outcome of deleting a key from one mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Removal<M> {
    /// The key was not present; the mapping stays as it is.
    Unchanged,
    /// The key was removed and other entries remain.
    Updated(M),
    /// The key was the last entry; the slot becomes empty.
    Removed,
}

/// Key-aware callbacks used by the mapped trie operations.
///
/// `K` is the key type and `V` the value type of the collection built on top
/// of the trie. The trie itself only sees [`Self::Mapping`].
pub trait MappingStrategy<K, V> {
    /// What a single trie slot stores for one hash code.
    type Mapping;

    /// Inserts or replaces `key` in `current` (absent for a fresh slot).
    fn assign(&self, current: Option<&Self::Mapping>, key: K, value: V) -> Self::Mapping;

    /// Inserts or replaces `key` with a value computed from its old value.
    fn update<G>(&self, current: Option<&Self::Mapping>, key: K, generator: G) -> Self::Mapping
    where
        G: FnOnce(Option<&V>) -> V;

    /// Removes `key` from `current`.
    fn delete(&self, current: &Self::Mapping, key: &K) -> Removal<Self::Mapping>;

    /// Number of live entries held by `mapping`.
    fn size(&self, mapping: &Self::Mapping) -> usize;

    /// Looks `key` up inside `mapping`.
    fn find<'a>(&self, mapping: &'a Self::Mapping, key: &K) -> Option<&'a V>;

    /// Returns `true` if `mapping` holds `key`.
    fn contains(&self, mapping: &Self::Mapping, key: &K) -> bool {
        self.find(mapping, key).is_some()
    }
}

/// Weight of a stored mapping, panicking on an empty result.
pub(crate) fn checked_size<K, V, S>(strategy: &S, mapping: &S::Mapping, operation: &str) -> usize
where
    S: MappingStrategy<K, V>,
{
    let size = strategy.size(mapping);
    if size == 0 {
        log::error!("mapping strategy returned an empty mapping from {operation}");
        panic!("mapping strategy contract violated: {operation} produced an empty mapping");
    }
    size
}
