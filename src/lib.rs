//! # trie-array
//!
//! Persistent (immutable, structurally shared) integer-indexed arrays built on
//! a 32-way bitmapped trie.
//!
//! ## Overview
//!
//! Every mutation returns a new version of the trie and leaves the previous
//! version untouched. Unmodified subtrees are shared between versions by
//! reference counting, so an `assign` or `delete` only allocates the nodes on
//! the path from the root to the affected slot.
//!
//! - [`trie`]: the classic node family (empty, leaf, single-branch,
//!   multi-branch) with a fixed shift schedule and an append-only
//!   [`TrieBuilder`](trie::TrieBuilder).
//! - [`array`]: the adaptive node, which holds values and children in the
//!   same node and skips empty intermediate levels. [`TrieArray`] is its
//!   root handle, [`MappedTrieArray`] reuses it as a hash-indexed substrate.
//! - [`long_array`]: the same adaptive algorithm over 64-bit indices.
//! - [`sequence`]: lazy, windowed, splittable iteration shared by all roots.
//!
//! ## Feature Flags
//!
//! - `arc`: use `Arc` instead of `Rc` so tries are `Send + Sync`
//! - `rayon`: parallel iteration over [`Slice`](sequence::Slice)
//! - `serde`: serialization of the root handles as index-to-value maps
//! - `invariants`: keep `check_invariants` in release builds
//!
//! ## Example
//!
//! ```rust
//! use trie_array::TrieArray;
//!
//! let array = TrieArray::new()
//!     .assign(-5, "minus five")
//!     .assign(i32::MAX, "max")
//!     .assign(0, "zero");
//!
//! let keys: Vec<i32> = array.keys().collect();
//! assert_eq!(keys, vec![-5, 0, i32::MAX]);
//!
//! // Structural sharing: the original array is preserved
//! let smaller = array.delete(0);
//! assert_eq!(array.find(0), Some(&"zero"));
//! assert_eq!(smaller.find(0), None);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_closure_for_method_calls)]

/// Prelude module for convenient imports.
///
/// ```rust
/// use trie_array::prelude::*;
///
/// let array: TrieArray<i32> = [(1, 10), (2, 20)].into_iter().collect();
/// assert_eq!(array.len(), 2);
/// ```
pub mod prelude {
    pub use crate::array::{MappedTrieArray, TrieArray};
    pub use crate::error::InvariantViolation;
    pub use crate::long_array::{LongTrieArray, MappedLongTrieArray};
    pub use crate::mapping::{MappingStrategy, Removal};
    pub use crate::sequence::{Positional, Slice};
    pub use crate::trie::{Trie, TrieBuilder};
}

// =============================================================================
// Reference Counter Type Alias
// =============================================================================

/// Reference-counted smart pointer type.
///
/// When the `arc` feature is enabled, this is `std::sync::Arc`,
/// which is thread-safe but has slightly higher overhead.
///
/// When the `arc` feature is disabled (default), this is `std::rc::Rc`,
/// which is faster but not thread-safe.
#[cfg(feature = "arc")]
pub(crate) type ReferenceCounter<T> = std::sync::Arc<T>;

#[cfg(not(feature = "arc"))]
pub(crate) type ReferenceCounter<T> = std::rc::Rc<T>;

pub mod array;
pub mod bits;
pub mod error;
pub mod long_array;
pub mod mapping;
pub mod sequence;
pub mod trie;

pub use array::{MappedTrieArray, TrieArray};
pub use error::InvariantViolation;
pub use long_array::{LongTrieArray, MappedLongTrieArray};
pub use mapping::{MappingStrategy, Removal};
pub use trie::{Trie, TrieBuilder};

#[cfg(feature = "arc")]
pub use trie::SharedTrieBuilder;

// =============================================================================
// Tests
// =============================================================================
