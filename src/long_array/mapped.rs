use std::fmt;
use std::marker::PhantomData;

use super::cursor::LongArrayCursor;
use super::node::{Deleted, LongArrayNode, NodeRef};
use crate::ReferenceCounter;
use crate::bits::long::{MAX_SHIFT, flip};
#[cfg(any(test, debug_assertions, feature = "invariants"))]
use crate::error::{InvariantViolation, report};
use crate::mapping::{MappingStrategy, Removal, checked_size};

/// An adaptive trie indexed by `i64` hash codes, one mapping per hash.
///
/// Behaves like [`MappedTrieArray`](crate::MappedTrieArray) with 64-bit
/// hashes.
pub struct MappedLongTrieArray<K, V, S: MappingStrategy<K, V>> {
    root: Option<NodeRef<S::Mapping>>,
    mappings: usize,
    strategy: S,
    marker: PhantomData<fn(K, V)>,
}

impl<K, V, S: MappingStrategy<K, V>> MappedLongTrieArray<K, V, S> {
    /// Creates an empty trie using `strategy`.
    #[must_use]
    pub const fn new(strategy: S) -> Self {
        Self {
            root: None,
            mappings: 0,
            strategy,
            marker: PhantomData,
        }
    }

    /// The strategy this trie was created with.
    #[inline]
    #[must_use]
    pub const fn strategy(&self) -> &S {
        &self.strategy
    }

    /// Number of entries across all mappings.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.root.as_ref().map_or(0, |root| root.size())
    }

    /// Returns `true` if no mapping is stored.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Number of occupied hash codes.
    #[inline]
    #[must_use]
    pub const fn mapping_count(&self) -> usize {
        self.mappings
    }

    /// Looks up `key` in the mapping stored for `hash`.
    #[must_use]
    pub fn find(&self, hash: i64, key: &K) -> Option<&V> {
        let mapping = self.root.as_ref()?.find(flip(hash))?;
        self.strategy.find(mapping, key)
    }

    /// Returns `true` if the mapping stored for `hash` holds `key`.
    #[must_use]
    pub fn contains(&self, hash: i64, key: &K) -> bool {
        self.root
            .as_ref()
            .and_then(|root| root.find(flip(hash)))
            .is_some_and(|mapping| self.strategy.contains(mapping, key))
    }

    /// Iterates `(hash, &mapping)` pairs in ascending hash order.
    #[must_use]
    pub fn mappings(&self) -> LongArrayCursor<'_, S::Mapping> {
        LongArrayCursor::new(self.root.as_deref(), 0, self.mappings)
    }

    /// Returns `true` if both tries share the same root node.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.root, &other.root) {
            (None, None) => true,
            (Some(left), Some(right)) => ReferenceCounter::ptr_eq(left, right),
            _ => false,
        }
    }

    /// Verifies the node structure and both cached counts.
    ///
    /// # Errors
    ///
    /// Returns the first [`InvariantViolation`] found.
    #[cfg(any(test, debug_assertions, feature = "invariants"))]
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let Some(root) = &self.root else {
            return Ok(());
        };
        let strategy = &self.strategy;
        root.check_with(&|mapping: &S::Mapping| strategy.size(mapping))?;
        let computed = LongArrayCursor::new(self.root.as_deref(), 0, usize::MAX).count();
        if computed == self.mappings {
            Ok(())
        } else {
            Err(report(InvariantViolation::SizeMismatch {
                cached: self.mappings,
                computed,
            }))
        }
    }

    fn with_root(&self, root: Option<NodeRef<S::Mapping>>, mappings: usize) -> Self
    where
        S: Clone,
    {
        Self {
            root,
            mappings,
            strategy: self.strategy.clone(),
            marker: PhantomData,
        }
    }
}

impl<K, V, S> MappedLongTrieArray<K, V, S>
where
    S: MappingStrategy<K, V> + Clone,
    S::Mapping: Clone,
{
    /// Returns a trie where the mapping for `hash` holds `key -> value`.
    ///
    /// # Panics
    ///
    /// Panics if the strategy returns a mapping holding no entries.
    #[must_use]
    pub fn assign(&self, hash: i64, key: K, value: V) -> Self {
        let strategy = &self.strategy;
        self.store(hash, |current| strategy.assign(current, key, value))
    }

    /// Returns a trie where `key` maps to `generator(current value)`.
    ///
    /// # Panics
    ///
    /// Panics if the strategy returns a mapping holding no entries.
    #[must_use]
    pub fn update<G>(&self, hash: i64, key: K, generator: G) -> Self
    where
        G: FnOnce(Option<&V>) -> V,
    {
        let strategy = &self.strategy;
        self.store(hash, |current| strategy.update(current, key, generator))
    }

    fn store<F>(&self, hash: i64, make: F) -> Self
    where
        F: FnOnce(Option<&S::Mapping>) -> S::Mapping,
    {
        let strategy = &self.strategy;
        let weight = |mapping: &S::Mapping| checked_size::<K, V, S>(strategy, mapping, "assign");
        let mut created = false;
        let root = LongArrayNode::assign_root(
            self.root.as_ref(),
            MAX_SHIFT,
            flip(hash),
            |current| {
                created = current.is_none();
                make(current)
            },
            &weight,
        );
        self.with_root(Some(root), self.mappings + usize::from(created))
    }

    /// Returns a trie without `key` in the mapping for `hash`.
    ///
    /// # Panics
    ///
    /// Panics if the strategy reports an updated mapping holding no entries.
    #[must_use]
    pub fn delete(&self, hash: i64, key: &K) -> Self {
        let Some(root) = &self.root else {
            return self.clone();
        };
        let strategy = &self.strategy;
        let weight = |mapping: &S::Mapping| checked_size::<K, V, S>(strategy, mapping, "delete");
        let mut removed = false;
        let outcome = LongArrayNode::delete_with(
            root,
            flip(hash),
            |mapping| {
                let removal = strategy.delete(mapping, key);
                removed = matches!(removal, Removal::Removed);
                removal
            },
            &weight,
        );
        match outcome {
            Deleted::Unchanged => self.clone(),
            Deleted::Emptied => self.with_root(None, 0),
            Deleted::Replaced(root) => {
                self.with_root(Some(root), self.mappings - usize::from(removed))
            }
        }
    }
}

impl<K, V, S> Clone for MappedLongTrieArray<K, V, S>
where
    S: MappingStrategy<K, V> + Clone,
{
    fn clone(&self) -> Self {
        self.with_root(self.root.clone(), self.mappings)
    }
}

impl<K, V, S> Default for MappedLongTrieArray<K, V, S>
where
    S: MappingStrategy<K, V> + Default,
{
    fn default() -> Self {
        Self::new(S::default())
    }
}

impl<K, V, S> fmt::Debug for MappedLongTrieArray<K, V, S>
where
    S: MappingStrategy<K, V>,
    S::Mapping: fmt::Debug,
{
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_map().entries(self.mappings()).finish()
    }
}
