//! The classic trie family.
//!
//! [`Trie`] is a persistent array indexed by `i32` whose nodes follow a fixed
//! shift schedule: the root branches on bits 30-31, its children on bits
//! 25-29, and so on down to bits 0-4. Branches with one child and branches
//! with several children are distinct node shapes, and a lone entry is kept
//! in a leaf as high up the tree as possible.
//!
//! Dense tries are best created with a [`TrieBuilder`], which appends values
//! at indices `0, 1, 2, ...` without rebuilding the root path for each one.
//!
//! # Examples
//!
//! ```rust
//! use trie_array::Trie;
//!
//! let trie: Trie<&str> = ["a", "b", "c"].into_iter().collect();
//! let updated = trie.assign(-1, "z");
//!
//! assert_eq!(trie.len(), 3);
//! assert_eq!(updated.keys().collect::<Vec<_>>(), vec![-1, 0, 1, 2]);
//! assert_eq!(updated.get_value_or(7, &"?"), &"?");
//! ```

mod builder;
mod cursor;
mod node;

use std::fmt;

pub use builder::TrieBuilder;
#[cfg(feature = "arc")]
pub use builder::SharedTrieBuilder;
pub use cursor::TrieCursor;

use node::{Deleted, NodeRef, ROOT_SHIFT, TrieNode};

use crate::ReferenceCounter;
use crate::bits::int::flip;
#[cfg(any(test, debug_assertions, feature = "invariants"))]
use crate::error::{InvariantViolation, report};
use crate::sequence::{Positional, Slice, check_window};

/// A persistent `i32`-indexed array on the classic node family.
pub struct Trie<T> {
    root: NodeRef<T>,
    length: usize,
}

impl<T> Trie<T> {
    /// Creates an empty trie.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: NodeRef::new(TrieNode::Empty),
            length: 0,
        }
    }

    pub(crate) const fn from_root(root: NodeRef<T>, length: usize) -> Self {
        Self { root, length }
    }

    /// Creates a builder for dense tries starting at index 0.
    #[must_use]
    pub const fn builder() -> TrieBuilder<T> {
        TrieBuilder::new()
    }

    /// Number of entries.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.length
    }

    /// Returns `true` if the trie has no entries.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Returns the value at `index`, if any.
    #[must_use]
    pub fn find(&self, index: i32) -> Option<&T> {
        self.root.find(flip(index))
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
        self.root.get_value_or(flip(index), default)
    }

    /// Returns `true` if `index` holds a value.
    #[must_use]
    pub fn contains(&self, index: i32) -> bool {
        self.find(index).is_some()
    }

    /// Returns a trie with `value` stored at `index`.
    ///
    /// # Complexity
    ///
    /// O(log32 N) allocations along the root path.
    #[must_use]
    pub fn assign(&self, index: i32, value: T) -> Self {
        let root = TrieNode::assign(&self.root, ROOT_SHIFT, flip(index), value);
        let length = root.value_count();
        Self { root, length }
    }

    /// Returns a trie without `index`.
    ///
    /// Deleting an absent index returns a trie sharing this trie's root.
    #[must_use]
    pub fn delete(&self, index: i32) -> Self {
        match TrieNode::delete(&self.root, flip(index)) {
            Deleted::Unchanged => self.clone(),
            Deleted::Emptied => Self::new(),
            Deleted::Replaced(root) => Self {
                root,
                length: self.length - 1,
            },
        }
    }

    /// Iterates `(index, &value)` pairs in ascending index order.
    #[must_use]
    pub fn iter(&self) -> TrieCursor<'_, T> {
        TrieCursor::new(&self.root, 0, self.length)
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

    /// Returns `true` if both tries share the same root node.
    ///
    /// Two empty tries are always considered identical.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        (self.root.is_empty() && other.root.is_empty())
            || ReferenceCounter::ptr_eq(&self.root, &other.root)
    }

    /// Verifies the structural rules of the classic family.
    ///
    /// # Errors
    ///
    /// Returns the first [`InvariantViolation`] found.
    #[cfg(any(test, debug_assertions, feature = "invariants"))]
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let computed = self.root.check(ROOT_SHIFT, 0, 0)?;
        if computed == self.length {
            Ok(())
        } else {
            Err(report(InvariantViolation::SizeMismatch {
                cached: self.length,
                computed,
            }))
        }
    }
}

impl<T> Clone for Trie<T> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            length: self.length,
        }
    }
}

impl<T> Default for Trie<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for Trie<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_map().entries(self.iter()).finish()
    }
}

impl<T: PartialEq> PartialEq for Trie<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || (self.length == other.length && self.iter().eq(other.iter()))
    }
}

impl<T: Eq> Eq for Trie<T> {}

/// Collects values at consecutive indices starting at 0.
impl<T> FromIterator<T> for Trie<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut builder = TrieBuilder::new();
        builder.extend(iter);
        builder.build()
    }
}

impl<'a, T> IntoIterator for &'a Trie<T> {
    type Item = (i32, &'a T);
    type IntoIter = TrieCursor<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T> Positional for &'a Trie<T> {
    type Item = (i32, &'a T);
    type Cursor = TrieCursor<'a, T>;

    fn positions(&self) -> usize {
        self.length
    }

    fn cursor(&self, offset: usize, limit: usize) -> Self::Cursor {
        let trie: &'a Trie<T> = *self;
        check_window(offset, limit, trie.length);
        TrieCursor::new(&trie.root, offset, limit)
    }
}

// =============================================================================
// Serde Support
// =============================================================================

#[cfg(feature = "serde")]
impl<T: serde::Serialize> serde::Serialize for Trie<T> {
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
struct TrieVisitor<T> {
    marker: std::marker::PhantomData<T>,
}

#[cfg(feature = "serde")]
impl<'de, T: serde::Deserialize<'de>> serde::de::Visitor<'de> for TrieVisitor<T> {
    type Value = Trie<T>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map from i32 indices to values")
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: serde::de::MapAccess<'de>,
    {
        let mut trie = Trie::new();
        while let Some((index, value)) = access.next_entry::<i32, T>()? {
            trie = trie.assign(index, value);
        }
        Ok(trie)
    }
}

#[cfg(feature = "serde")]
impl<'de, T: serde::Deserialize<'de>> serde::Deserialize<'de> for Trie<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_map(TrieVisitor {
            marker: std::marker::PhantomData,
        })
    }
}

#[cfg(feature = "arc")]
static_assertions::assert_impl_all!(Trie<i32>: Send, Sync);

// =============================================================================
// Tests
// =============================================================================
