//! Adaptive tries over `i64` indices.
//!
//! [`LongTrieArray`] is the 64-bit counterpart of
//! [`TrieArray`](crate::TrieArray): six bits per level, `u64` bitmaps, and up
//! to 64 values and 64 children per node. [`MappedLongTrieArray`] is the
//! hash-indexed variant for 64-bit hash codes.
//!
//! ```rust
//! use trie_array::LongTrieArray;
//!
//! let array = LongTrieArray::new()
//!     .assign(i64::MIN, "min")
//!     .assign(1 << 40, "far")
//!     .assign(0, "zero");
//!
//! assert_eq!(array.keys().collect::<Vec<_>>(), vec![i64::MIN, 0, 1 << 40]);
//! ```

mod cursor;
mod mapped;
mod node;

use std::fmt;

pub use cursor::LongArrayCursor;
pub use mapped::MappedLongTrieArray;

use node::{Deleted, LongArrayNode, NodeRef, unit};

use crate::ReferenceCounter;
use crate::bits::long::{MAX_SHIFT, flip};
#[cfg(any(test, debug_assertions, feature = "invariants"))]
use crate::error::InvariantViolation;
use crate::mapping::Removal;
use crate::sequence::{Positional, Slice, check_window};

/// A persistent `i64`-indexed array on adaptive nodes.
pub struct LongTrieArray<T> {
    root: Option<NodeRef<T>>,
}

impl<T> LongTrieArray<T> {
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
    pub fn find(&self, index: i64) -> Option<&T> {
        self.root.as_ref()?.find(flip(index))
    }

    /// Alias of [`find`](Self::find).
    #[inline]
    #[must_use]
    pub fn get(&self, index: i64) -> Option<&T> {
        self.find(index)
    }

    /// Returns the value at `index`, or `default` when it is absent.
    #[must_use]
    pub fn get_value_or<'a>(&'a self, index: i64, default: &'a T) -> &'a T {
        self.find(index).unwrap_or(default)
    }

    /// Returns `true` if `index` holds a value.
    #[must_use]
    pub fn contains(&self, index: i64) -> bool {
        self.find(index).is_some()
    }

    /// Iterates `(index, &value)` pairs in ascending index order.
    #[must_use]
    pub fn iter(&self) -> LongArrayCursor<'_, T> {
        LongArrayCursor::new(self.root.as_deref(), 0, self.len())
    }

    /// Iterates indices in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = i64> + '_ {
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

impl<T: Clone> LongTrieArray<T> {
    /// Returns an array with `value` stored at `index`.
    #[must_use]
    pub fn assign(&self, index: i64, value: T) -> Self {
        self.update(index, |_| value)
    }

    /// Returns an array whose value at `index` is `generator(current)`.
    #[must_use]
    pub fn update<F>(&self, index: i64, generator: F) -> Self
    where
        F: FnOnce(Option<&T>) -> T,
    {
        let root =
            LongArrayNode::assign_root(self.root.as_ref(), MAX_SHIFT, flip(index), generator, &unit);
        Self { root: Some(root) }
    }

    /// Returns an array without `index`.
    #[must_use]
    pub fn delete(&self, index: i64) -> Self {
        let Some(root) = &self.root else {
            return Self::new();
        };
        match LongArrayNode::delete_with(root, flip(index), |_| Removal::Removed, &unit) {
            Deleted::Unchanged => self.clone(),
            Deleted::Emptied => Self::new(),
            Deleted::Replaced(root) => Self { root: Some(root) },
        }
    }
}

impl<T> Clone for LongTrieArray<T> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
        }
    }
}

impl<T> Default for LongTrieArray<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for LongTrieArray<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_map().entries(self.iter()).finish()
    }
}

impl<T: PartialEq> PartialEq for LongTrieArray<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || (self.len() == other.len() && self.iter().eq(other.iter()))
    }
}

impl<T: Eq> Eq for LongTrieArray<T> {}

impl<T: Clone> FromIterator<(i64, T)> for LongTrieArray<T> {
    fn from_iter<I: IntoIterator<Item = (i64, T)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |array, (index, value)| array.assign(index, value))
    }
}

impl<'a, T> IntoIterator for &'a LongTrieArray<T> {
    type Item = (i64, &'a T);
    type IntoIter = LongArrayCursor<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T> Positional for &'a LongTrieArray<T> {
    type Item = (i64, &'a T);
    type Cursor = LongArrayCursor<'a, T>;

    fn positions(&self) -> usize {
        self.len()
    }

    fn cursor(&self, offset: usize, limit: usize) -> Self::Cursor {
        let array: &'a LongTrieArray<T> = *self;
        check_window(offset, limit, array.len());
        LongArrayCursor::new(array.root.as_deref(), offset, limit)
    }
}

// =============================================================================
// Serde Support
// =============================================================================

#[cfg(feature = "serde")]
impl<T: serde::Serialize> serde::Serialize for LongTrieArray<T> {
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
struct LongTrieArrayVisitor<T> {
    marker: std::marker::PhantomData<T>,
}

#[cfg(feature = "serde")]
impl<'de, T> serde::de::Visitor<'de> for LongTrieArrayVisitor<T>
where
    T: serde::Deserialize<'de> + Clone,
{
    type Value = LongTrieArray<T>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map from i64 indices to values")
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: serde::de::MapAccess<'de>,
    {
        let mut array = LongTrieArray::new();
        while let Some((index, value)) = access.next_entry::<i64, T>()? {
            array = array.assign(index, value);
        }
        Ok(array)
    }
}

#[cfg(feature = "serde")]
impl<'de, T> serde::Deserialize<'de> for LongTrieArray<T>
where
    T: serde::Deserialize<'de> + Clone,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_map(LongTrieArrayVisitor {
            marker: std::marker::PhantomData,
        })
    }
}

#[cfg(feature = "arc")]
static_assertions::assert_impl_all!(LongTrieArray<i64>: Send, Sync);
