//! Lazy, windowed, splittable sequences over a trie's entries.
//!
//! Every trie orders its entries by index. The *position* of an entry is its
//! rank in that order, so a trie of `n` entries has positions `0..n`. A
//! [`Positional`] source can open a cursor at any position without realising
//! the entries before it: cursors skip whole subtrees using their cached sizes.
//!
//! [`Slice`] pairs a source with a `[offset, limit)` window. Slices are cheap
//! values: iterating one never mutates shared state, so the same slice can be
//! iterated again, and [`Slice::split_at`] / [`Slice::halve`] produce
//! independent sub-windows that can be consumed concurrently. With the `rayon`
//! feature a slice is a `rayon::iter::ParallelIterator` that splits itself by
//! halving its window.
//!
//! # Examples
//!
//! ```rust
//! use trie_array::TrieArray;
//!
//! let array: TrieArray<char> = ('a'..='j').zip(0..).map(|(value, index)| (index, value)).collect();
//!
//! let (front, back) = array.slice(2, 8).split_at(3);
//! let front: String = front.into_values().copied().collect();
//! let back: String = back.into_values().copied().collect();
//! assert_eq!(front, "cde");
//! assert_eq!(back, "fgh");
//! ```

/// A source of entries addressable by in-order position.
pub trait Positional {
    /// Item produced for each position.
    type Item;
    /// Pull iterator over a window of positions.
    type Cursor: Iterator<Item = Self::Item>;

    /// Number of positions (entries) in the source.
    fn positions(&self) -> usize;

    /// Opens a cursor yielding positions `offset..limit`.
    ///
    /// Callers guarantee `offset <= limit <= self.positions()`.
    fn cursor(&self, offset: usize, limit: usize) -> Self::Cursor;
}

/// A `[offset, limit)` window over a [`Positional`] source.
#[derive(Clone, Copy, Debug)]
pub struct Slice<S> {
    source: S,
    offset: usize,
    limit: usize,
}

/// Panics unless `offset..limit` lies within `0..=positions`.
pub(crate) fn check_window(offset: usize, limit: usize, positions: usize) {
    if offset > limit || limit > positions {
        log::error!("window {offset}..{limit} lies outside 0..{positions}");
        panic!("window {offset}..{limit} lies outside 0..{positions}");
    }
}

impl<S: Positional> Slice<S> {
    /// Creates a window over `source`.
    ///
    /// # Panics
    ///
    /// Panics if `offset > limit` or `limit > source.positions()`.
    #[must_use]
    pub fn new(source: S, offset: usize, limit: usize) -> Self {
        check_window(offset, limit, source.positions());
        Self {
            source,
            offset,
            limit,
        }
    }

    /// Creates a window over every position of `source`.
    #[must_use]
    pub fn full(source: S) -> Self {
        let limit = source.positions();
        Self {
            source,
            offset: 0,
            limit,
        }
    }

    /// First position covered by the window.
    #[inline]
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Position one past the end of the window.
    #[inline]
    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }

    /// Number of positions in the window.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.limit - self.offset
    }

    /// Returns `true` if the window covers no positions.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.limit == self.offset
    }

    /// Opens a fresh cursor over the window; the slice itself is not consumed.
    #[must_use]
    pub fn iter(&self) -> S::Cursor {
        self.source.cursor(self.offset, self.limit)
    }

    /// Consumes the slice, yielding the first element of each entry pair.
    pub fn into_keys<K, V>(self) -> impl Iterator<Item = K>
    where
        S: Positional<Item = (K, V)>,
    {
        self.into_iter().map(|(key, _)| key)
    }

    /// Consumes the slice, yielding the second element of each entry pair.
    pub fn into_values<K, V>(self) -> impl Iterator<Item = V>
    where
        S: Positional<Item = (K, V)>,
    {
        self.into_iter().map(|(_, value)| value)
    }
}

impl<S: Positional + Clone> Slice<S> {
    /// Splits the window into `[offset, offset + mid)` and the remainder.
    ///
    /// # Panics
    ///
    /// Panics if `mid > self.len()`.
    #[must_use]
    pub fn split_at(self, mid: usize) -> (Self, Self) {
        check_window(0, mid, self.len());
        let middle = self.offset + mid;
        let front = Self {
            source: self.source.clone(),
            offset: self.offset,
            limit: middle,
        };
        let back = Self {
            source: self.source,
            offset: middle,
            limit: self.limit,
        };
        (front, back)
    }

    /// Splits the window in two halves, or returns it whole if it is too short.
    #[must_use]
    pub fn halve(self) -> (Self, Option<Self>) {
        if self.len() < 2 {
            return (self, None);
        }
        let mid = self.len() / 2;
        let (front, back) = self.split_at(mid);
        (front, Some(back))
    }
}

impl<S: Positional> IntoIterator for Slice<S> {
    type Item = S::Item;
    type IntoIter = S::Cursor;

    fn into_iter(self) -> Self::IntoIter {
        self.source.cursor(self.offset, self.limit)
    }
}

#[cfg(feature = "rayon")]
mod parallel {
    use super::{Positional, Slice};
    use rayon::iter::ParallelIterator;
    use rayon::iter::plumbing::{Folder, UnindexedConsumer, UnindexedProducer, bridge_unindexed};

    /// Windows shorter than this are consumed sequentially.
    const SEQUENTIAL_THRESHOLD: usize = 64;

    impl<S> UnindexedProducer for Slice<S>
    where
        S: Positional + Clone + Send,
        S::Item: Send,
    {
        type Item = S::Item;

        fn split(self) -> (Self, Option<Self>) {
            if self.len() < SEQUENTIAL_THRESHOLD {
                (self, None)
            } else {
                self.halve()
            }
        }

        fn fold_with<F>(self, folder: F) -> F
        where
            F: Folder<Self::Item>,
        {
            folder.consume_iter(self)
        }
    }

    impl<S> ParallelIterator for Slice<S>
    where
        S: Positional + Clone + Send,
        S::Item: Send,
    {
        type Item = S::Item;

        fn drive_unindexed<C>(self, consumer: C) -> C::Result
        where
            C: UnindexedConsumer<Self::Item>,
        {
            bridge_unindexed(self, consumer)
        }
    }
}
