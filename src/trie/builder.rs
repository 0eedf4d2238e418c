//! Append-only construction of classic tries.
//!
//! Appending values one by one through [`Trie::assign`] rebuilds the whole
//! root path on every call. [`TrieBuilder`] instead keeps one partially filled
//! buffer per level and only allocates a branch node when a buffer fills up,
//! so a trie of `n` values is built with `O(n)` allocations.

use arrayvec::ArrayVec;

use super::Trie;
use super::node::{NodeRef, ROOT_SHIFT, TrieNode};
use crate::bits::int::{SHIFT_PER_LEVEL, flip, slot_at};

/// Slots per level.
const BRANCH_WIDTH: usize = 32;

/// Collects values at consecutive indices `0, 1, 2, ...` into a [`Trie`].
///
/// # Examples
///
/// ```rust
/// use trie_array::TrieBuilder;
///
/// let mut builder = TrieBuilder::new();
/// builder.add("zero");
/// builder.add("one");
/// let first = builder.build();
///
/// builder.add("two");
/// let second = builder.build();
///
/// assert_eq!(first.len(), 2);
/// assert_eq!(second.find(2), Some(&"two"));
/// ```
pub struct TrieBuilder<T> {
    /// `levels[n]` holds the finished children of the next branch at shift `5 * n`.
    levels: Vec<ArrayVec<NodeRef<T>, BRANCH_WIDTH>>,
    length: usize,
}

impl<T> TrieBuilder<T> {
    /// Creates an empty builder.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            levels: Vec::new(),
            length: 0,
        }
    }

    /// Number of values added so far.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.length
    }

    /// Returns `true` if nothing has been added.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Appends `value` at index `self.len()`.
    ///
    /// # Panics
    ///
    /// Panics if the builder already holds `i32::MAX + 1` values.
    pub fn add(&mut self, value: T) {
        let Ok(index) = i32::try_from(self.length) else {
            log::error!("trie builder is full at {} values", self.length);
            panic!("trie builder cannot hold more than {} values", self.length);
        };
        self.push(
            0,
            NodeRef::new(TrieNode::Leaf {
                key: flip(index),
                value,
            }),
        );
        self.length += 1;
    }

    fn push(&mut self, level: usize, node: NodeRef<T>) {
        if self.levels.len() == level {
            self.levels.push(ArrayVec::new());
        }
        let buffer = &mut self.levels[level];
        buffer.push(node);
        if buffer.is_full() {
            let children = std::mem::take(buffer).into_iter().collect();
            if let Some(branch) = TrieNode::branch(level_shift(level), children) {
                self.push(level + 1, branch);
            }
        }
    }

    /// Builds a trie of everything added so far.
    ///
    /// The builder is left intact: later additions extend it and a later
    /// `build` shares every node the two tries have in common.
    #[must_use]
    pub fn build(&self) -> Trie<T> {
        let mut carry: Option<NodeRef<T>> = None;
        for (level, buffer) in self.levels.iter().enumerate() {
            let children = buffer.iter().cloned().chain(carry.take()).collect();
            carry = TrieNode::branch(level_shift(level), children);
        }

        log::trace!(
            "built trie of {} values from {} builder levels",
            self.length,
            self.levels.len()
        );
        carry.map_or_else(Trie::new, |node| Trie::from_root(raise(node), self.length))
    }

    /// Discards every value added so far.
    pub fn clear(&mut self) {
        self.levels.clear();
        self.length = 0;
    }
}

const fn level_shift(level: usize) -> u32 {
    #[allow(clippy::cast_possible_truncation)]
    let level = level as u32;
    level * SHIFT_PER_LEVEL
}

/// Wraps a branch in single-branch nodes until it sits at the root shift.
fn raise<T>(mut node: NodeRef<T>) -> NodeRef<T> {
    loop {
        let shift = match node.as_ref() {
            TrieNode::SingleBranch { shift, .. } | TrieNode::MultiBranch { shift, .. }
                if *shift < ROOT_SHIFT =>
            {
                *shift + SHIFT_PER_LEVEL
            }
            _ => return node,
        };
        let branch = node.first_key().map_or(0, |key| slot_at(shift, key));
        node = NodeRef::new(TrieNode::SingleBranch {
            shift,
            branch,
            child: node,
        });
    }
}

impl<T> Default for TrieBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Extend<T> for TrieBuilder<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.add(value);
        }
    }
}

impl<T> std::fmt::Debug for TrieBuilder<T> {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("TrieBuilder")
            .field("length", &self.length)
            .field("levels", &self.levels.len())
            .finish()
    }
}

/// A [`TrieBuilder`] that can be fed from several threads.
///
/// Values are appended in the order the calls to [`add`](Self::add) acquire
/// the lock.
#[cfg(feature = "arc")]
pub struct SharedTrieBuilder<T> {
    inner: parking_lot::Mutex<TrieBuilder<T>>,
}

#[cfg(feature = "arc")]
impl<T> SharedTrieBuilder<T> {
    /// Creates an empty shared builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: parking_lot::Mutex::new(TrieBuilder::new()),
        }
    }

    /// Appends `value` at the next index.
    ///
    /// # Panics
    ///
    /// Panics if the builder already holds `i32::MAX + 1` values.
    pub fn add(&self, value: T) {
        self.inner.lock().add(value);
    }

    /// Number of values added so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Returns `true` if nothing has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Builds a trie of everything added so far.
    #[must_use]
    pub fn build(&self) -> Trie<T> {
        self.inner.lock().build()
    }

    /// Discards every value added so far.
    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    /// Unwraps the underlying builder.
    #[must_use]
    pub fn into_inner(self) -> TrieBuilder<T> {
        self.inner.into_inner()
    }
}

#[cfg(feature = "arc")]
impl<T> Default for SharedTrieBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}
