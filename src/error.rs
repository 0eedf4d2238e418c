//! Error types for structural invariant checks.
//!
//! Tries never fail on ordinary input: absent indices are reported through
//! `Option`. The only error this crate produces is [`InvariantViolation`],
//! returned by the `check_invariants` methods when a node no longer satisfies
//! the structural rules of its family. A violation means the trie is corrupt,
//! so callers (normally test suites) should treat it as fatal.

use std::fmt;

/// Describes the first structural rule a trie was found to break.
///
/// # Examples
///
/// ```rust
/// use trie_array::InvariantViolation;
///
/// let error = InvariantViolation::SizeMismatch {
///     cached: 3,
///     computed: 2,
/// };
/// assert_eq!(
///     format!("{error}"),
///     "cached size 3 does not match recomputed size 2"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// A child node does not sit strictly below its parent.
    ShiftOrder {
        /// Shift of the parent node.
        parent_shift: u32,
        /// Shift of the offending child.
        child_shift: u32,
    },
    /// A bitmap population count disagrees with its compacted array.
    BitmapMismatch {
        /// Which array was checked (`"values"`, `"children"`).
        array: &'static str,
        /// Number of bits set in the bitmap.
        bits: u32,
        /// Length of the compacted array.
        length: usize,
    },
    /// A cached size disagrees with the size recomputed from the subtree.
    SizeMismatch {
        /// Size stored in the node.
        cached: usize,
        /// Size recomputed bottom-up.
        computed: usize,
    },
    /// A branch retains a child holding no entries.
    EmptyChild {
        /// Shift of the parent holding the empty child.
        shift: u32,
    },
    /// A node has no values and a single child, so the level is redundant.
    CollapsibleNode {
        /// Shift of the redundant node.
        shift: u32,
    },
    /// A child's base index does not share its parent's high bits.
    BaseMismatch {
        /// Base index the parent expects at that slot.
        expected: u64,
        /// Base index the child carries.
        actual: u64,
    },
    /// An entry is stored at a position its index does not route to.
    MisplacedKey {
        /// The (sign-flipped) key that was found out of place.
        key: u64,
        /// Shift of the node holding it.
        shift: u32,
    },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShiftOrder {
                parent_shift,
                child_shift,
            } => write!(
                formatter,
                "child shift {child_shift} is not below parent shift {parent_shift}"
            ),
            Self::BitmapMismatch {
                array,
                bits,
                length,
            } => write!(
                formatter,
                "{array} bitmap has {bits} bits but the array holds {length} entries"
            ),
            Self::SizeMismatch { cached, computed } => write!(
                formatter,
                "cached size {cached} does not match recomputed size {computed}"
            ),
            Self::EmptyChild { shift } => {
                write!(formatter, "node at shift {shift} retains an empty child")
            }
            Self::CollapsibleNode { shift } => write!(
                formatter,
                "node at shift {shift} has no values and a single child"
            ),
            Self::BaseMismatch { expected, actual } => write!(
                formatter,
                "child base index {actual:#x} does not match expected {expected:#x}"
            ),
            Self::MisplacedKey { key, shift } => write!(
                formatter,
                "key {key:#x} is stored out of place in node at shift {shift}"
            ),
        }
    }
}

impl std::error::Error for InvariantViolation {}

/// Logs a detected violation and hands it back for `Err(..)`.
pub(crate) fn report(violation: InvariantViolation) -> InvariantViolation {
    log::debug!("trie invariant violated: {violation}");
    violation
}
