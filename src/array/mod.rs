//! Adaptive tries over `i32` indices.
//!
//! [`TrieArray`] stores values directly in the branch nodes that route to
//! them, and only creates the levels needed to tell its indices apart. A
//! sparse array over a handful of distant indices is therefore a shallow tree
//! of a few nodes instead of a fixed seven-level path per entry.
//!
//! [`MappedTrieArray`] runs the same engine with an opaque mapping per slot,
//! for use as the backbone of hash maps and hash sets.
//!
//! # Examples
//!
//! ```rust
//! use trie_array::TrieArray;
//!
//! let sparse = TrieArray::new()
//!     .assign(1 << 30, "far")
//!     .assign(-3, "negative")
//!     .assign(7, "near");
//!
//! assert_eq!(sparse.len(), 3);
//! assert_eq!(sparse.find(7), Some(&"near"));
//! assert_eq!(sparse.values().copied().collect::<Vec<_>>(), vec!["negative", "near", "far"]);
//!
//! let counted = sparse.update(7, |old| old.map_or("new", |_| "seen"));
//! assert_eq!(counted.find(7), Some(&"seen"));
//! ```

mod cursor;
mod mapped;
mod node;

use std::fmt;

pub use cursor::ArrayCursor;
pub use mapped::MappedTrieArray;

use node::{ArrayNode, Deleted, NodeRef, unit};

use crate::ReferenceCounter;
use crate::bits::int::{MAX_SHIFT, flip};
#[cfg(any(test, debug_assertions, feature = "invariants"))]
use crate::error::InvariantViolation;
use crate::mapping::Removal;
use crate::sequence::{Positional, Slice, check_window};

/// A persistent `i32`-indexed array on adaptive nodes.
pub struct TrieArray<T> {
    root: Option<NodeRef<T>>,
}

impl<T> TrieArray<T> {
    /// Creates an empty array.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self { root: None }
    }

    /// Number of entries.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.root.as_ref().map_or(0, |root| root.size())
    }

    /// Returns `true` if the array has no entries.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Returns the value at `index`, if any.
    #[must_use]
    pub fn find(&self, index: i32) -> Option<&T> {
        self.root.as_ref()?.find(flip(index))
    }

    /// Alias of [`find`](Self::find).
    #[inline]
    #[must_use]
    pub fn get(&self, index: i32) -> Option<&T> {
        self.find(index)
    }

    /// Returns the value at `index`, or `default` when it is absent.
    #[must_use]
    pub fn get_value_or<'a>(&'a self, index: i32, default: &'a T) -> &'a T {
        self.find(index).unwrap_or(default)
    }

    /// Returns `true` if `index` holds a value.
    #[must_use]
    pub fn contains(&self, index: i32) -> bool {
        self.find(index).is_some()
    }

    /// Iterates `(index, &value)` pairs in ascending index order.
    #[must_use]
    pub fn iter(&self) -> ArrayCursor<'_, T> {
        ArrayCursor::new(self.root.as_deref(), 0, self.len())
    }

    /// Iterates indices in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = i32> + '_ {
        self.iter().map(|(index, _)| index)
    }

    /// Iterates values in ascending index order.
    pub fn values(&self) -> impl Iterator<Item = &T> + '_ {
        self.iter().map(|(_, value)| value)
    }

    /// Window over the entries at positions `offset..limit`.
    ///
    /// # Panics
    ///
    /// Panics if `offset > limit` or `limit > self.len()`.
    #[must_use]
    pub fn slice(&self, offset: usize, limit: usize) -> Slice<&Self> {
        Slice::new(self, offset, limit)
    }

    /// Returns `true` if both arrays share the same root node.
    ///
    /// Two empty arrays are always considered identical.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.root, &other.root) {
            (None, None) => true,
            (Some(left), Some(right)) => ReferenceCounter::ptr_eq(left, right),
            _ => false,
        }
    }

    /// Verifies the structural rules of adaptive nodes.
    ///
    /// # Errors
    ///
    /// Returns the first [`InvariantViolation`] found.
    #[cfg(any(test, debug_assertions, feature = "invariants"))]
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        self.root
            .as_ref()
            .map_or(Ok(()), |root| root.check_with(&unit).map(drop))
    }
}

impl<T: Clone> TrieArray<T> {
    /// Returns an array with `value` stored at `index`.
    ///
    /// # Complexity
    ///
    /// O(log32 N) node copies, plus at most one synthesised ancestor.
    #[must_use]
    pub fn assign(&self, index: i32, value: T) -> Self {
        self.update(index, |_| value)
    }

    /// Returns an array whose value at `index` is `generator(current)`.
    #[must_use]
    pub fn update<F>(&self, index: i32, generator: F) -> Self
    where
        F: FnOnce(Option<&T>) -> T,
    {
        let key = flip(index);
        let root = ArrayNode::assign_root(self.root.as_ref(), MAX_SHIFT, key, generator, &unit);
        Self { root: Some(root) }
    }

    /// Returns an array without `index`.
    ///
    /// Deleting an absent index returns an array sharing this array's root.
    #[must_use]
    pub fn delete(&self, index: i32) -> Self {
        let Some(root) = &self.root else {
            return Self::new();
        };
        match ArrayNode::delete_with(root, flip(index), |_| Removal::Removed, &unit) {
            Deleted::Unchanged => self.clone(),
            Deleted::Emptied => Self::new(),
            Deleted::Replaced(root) => Self { root: Some(root) },
        }
    }
}

impl<T> Clone for TrieArray<T> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
        }
    }
}

impl<T> Default for TrieArray<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for TrieArray<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_map().entries(self.iter()).finish()
    }
}

impl<T: PartialEq> PartialEq for TrieArray<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || (self.len() == other.len() && self.iter().eq(other.iter()))
    }
}

impl<T: Eq> Eq for TrieArray<T> {}

impl<T: Clone> FromIterator<(i32, T)> for TrieArray<T> {
    fn from_iter<I: IntoIterator<Item = (i32, T)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |array, (index, value)| array.assign(index, value))
    }
}

impl<'a, T> IntoIterator for &'a TrieArray<T> {
    type Item = (i32, &'a T);
    type IntoIter = ArrayCursor<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T> Positional for &'a TrieArray<T> {
    type Item = (i32, &'a T);
    type Cursor = ArrayCursor<'a, T>;

    fn positions(&self) -> usize {
        self.len()
    }

    fn cursor(&self, offset: usize, limit: usize) -> Self::Cursor {
        let array: &'a TrieArray<T> = *self;
        check_window(offset, limit, array.len());
        ArrayCursor::new(array.root.as_deref(), offset, limit)
    }
}

// =============================================================================
// Serde Support
// =============================================================================

#[cfg(feature = "serde")]
impl<T: serde::Serialize> serde::Serialize for TrieArray<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (index, value) in self {
            map.serialize_entry(&index, value)?;
        }
        map.end()
    }
}

#[cfg(feature = "serde")]
struct TrieArrayVisitor<T> {
    marker: std::marker::PhantomData<T>,
}

#[cfg(feature = "serde")]
impl<'de, T> serde::de::Visitor<'de> for TrieArrayVisitor<T>
where
    T: serde::Deserialize<'de> + Clone,
{
    type Value = TrieArray<T>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map from i32 indices to values")
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: serde::de::MapAccess<'de>,
    {
        let mut array = TrieArray::new();
        while let Some((index, value)) = access.next_entry::<i32, T>()? {
            array = array.assign(index, value);
        }
        Ok(array)
    }
}

#[cfg(feature = "serde")]
impl<'de, T> serde::Deserialize<'de> for TrieArray<T>
where
    T: serde::Deserialize<'de> + Clone,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_map(TrieArrayVisitor {
            marker: std::marker::PhantomData,
        })
    }
}

#[cfg(feature = "arc")]
static_assertions::assert_impl_all!(TrieArray<i32>: Send, Sync);

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_new_is_empty() {
        let array: TrieArray<i32> = TrieArray::new();
        assert!(array.is_empty());
        assert_eq!(array.len(), 0);
        assert_eq!(array.find(0), None);
        assert_eq!(array.check_invariants(), Ok(()));
    }

    #[rstest]
    fn test_assign_and_find() {
        let array = TrieArray::new().assign(10, "ten").assign(-10, "minus ten");
        assert_eq!(array.find(10), Some(&"ten"));
        assert_eq!(array.get(-10), Some(&"minus ten"));
        assert_eq!(array.find(0), None);
        assert_eq!(array.len(), 2);
    }

    #[rstest]
    fn test_update_sees_current_value() {
        let array = TrieArray::new().assign(1, 1);
        let array = array.update(1, |old| old.copied().unwrap_or(0) + 1);
        let array = array.update(2, |old| old.copied().unwrap_or(0) + 1);
        assert_eq!(array.find(1), Some(&2));
        assert_eq!(array.find(2), Some(&1));
    }

    #[rstest]
    fn test_delete_absent_shares_root() {
        let array = TrieArray::new().assign(1, ()).assign(1 << 16, ());
        assert!(array.delete(2).ptr_eq(&array));
        assert!(array.delete(i32::MIN).ptr_eq(&array));
    }

    #[rstest]
    fn test_delete_from_empty() {
        let array: TrieArray<i32> = TrieArray::new();
        assert!(array.delete(0).ptr_eq(&TrieArray::new()));
    }

    #[rstest]
    fn test_delete_last_is_canonical_empty() {
        let array = TrieArray::new().assign(42, 'x');
        let emptied = array.delete(42);
        assert!(emptied.is_empty());
        assert!(emptied.ptr_eq(&TrieArray::new()));
    }

    #[rstest]
    fn test_signed_iteration_order() {
        let array: TrieArray<()> = [-5, 0, 5, i32::MAX, i32::MIN]
            .into_iter()
            .map(|index| (index, ()))
            .collect();
        assert_eq!(
            array.keys().collect::<Vec<_>>(),
            vec![i32::MIN, -5, 0, 5, i32::MAX]
        );
    }

    #[rstest]
    fn test_debug_is_a_map() {
        let array = TrieArray::new().assign(3, "c").assign(-3, "a");
        assert_eq!(format!("{array:?}"), r#"{-3: "a", 3: "c"}"#);
    }

    #[rstest]
    fn test_equality_is_by_entries() {
        let forward: TrieArray<i32> = (0..64).map(|index| (index * 3, index)).collect();
        let backward: TrieArray<i32> = (0..64).rev().map(|index| (index * 3, index)).collect();
        assert_eq!(forward, backward);
        assert_ne!(forward, backward.assign(0, -1));
    }
}
