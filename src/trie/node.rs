//! Node shapes of the classic trie family.
//!
//! A classic trie descends from [`ROOT_SHIFT`] in fixed steps of five bits.
//! Branch nodes record the shift they branch on, and that shift always equals
//! the one their parent hands down. Leaves carry their full key and may sit at
//! any depth: a leaf is only pushed down (by wrapping it in a single-branch
//! node) when a second key arrives at the same position, and it is lifted back
//! up when a deletion leaves it alone under a branch.

use crate::ReferenceCounter;
use crate::bits::int::{
    MAX_SHIFT, SHIFT_PER_LEVEL, add_bit, array_index_for_bit, bit_from_index, bit_is_present,
    index_from_bit, remove_bit, slot_at,
};

#[cfg(any(test, debug_assertions, feature = "invariants"))]
use crate::bits::int::SLOT_MASK;
#[cfg(any(test, debug_assertions, feature = "invariants"))]
use crate::error::{InvariantViolation, report};

/// Shift of the root level of every classic trie.
pub(crate) const ROOT_SHIFT: u32 = MAX_SHIFT;

/// Shared handle to a classic node.
pub(crate) type NodeRef<T> = ReferenceCounter<TrieNode<T>>;

/// The closed set of classic node shapes.
pub(crate) enum TrieNode<T> {
    /// The empty trie. Only ever appears as a root.
    Empty,
    /// Exactly one entry.
    Leaf {
        /// Sign-flipped index.
        key: u32,
        value: T,
    },
    /// Exactly one child at one of the 32 slots of `shift`.
    SingleBranch {
        shift: u32,
        branch: u32,
        child: NodeRef<T>,
    },
    /// Two to 32 children, compacted by `bitmap`.
    MultiBranch {
        shift: u32,
        bitmap: u32,
        /// Total entries below this node.
        size: usize,
        children: Box<[NodeRef<T>]>,
    },
}

/// Result of deleting a key below a node.
pub(crate) enum Deleted<T> {
    /// The key was absent; the caller keeps its node.
    Unchanged,
    /// The node lost its last entry.
    Emptied,
    /// The node was rebuilt without the key.
    Replaced(NodeRef<T>),
}

#[inline]
const fn child_shift(shift: u32) -> u32 {
    shift.saturating_sub(SHIFT_PER_LEVEL)
}

fn leaf<T>(key: u32, value: T) -> NodeRef<T> {
    NodeRef::new(TrieNode::Leaf { key, value })
}

impl<T> TrieNode<T> {
    #[inline]
    pub(crate) const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    #[inline]
    pub(crate) const fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf { .. })
    }

    /// Number of entries below this node.
    pub(crate) fn value_count(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Leaf { .. } => 1,
            Self::SingleBranch { child, .. } => child.value_count(),
            Self::MultiBranch { size, .. } => *size,
        }
    }

    /// Smallest key below this node.
    pub(crate) fn first_key(&self) -> Option<u32> {
        match self {
            Self::Empty => None,
            Self::Leaf { key, .. } => Some(*key),
            Self::SingleBranch { child, .. } => child.first_key(),
            Self::MultiBranch { children, .. } => children.first().and_then(|child| child.first_key()),
        }
    }

    pub(crate) fn find(&self, key: u32) -> Option<&T> {
        let mut node = self;
        loop {
            match node {
                Self::Empty => return None,
                Self::Leaf {
                    key: existing,
                    value,
                } => return (*existing == key).then_some(value),
                Self::SingleBranch {
                    shift,
                    branch,
                    child,
                } => {
                    if slot_at(*shift, key) != *branch {
                        return None;
                    }
                    node = child;
                }
                Self::MultiBranch {
                    shift,
                    bitmap,
                    children,
                    ..
                } => {
                    let bit = bit_from_index(slot_at(*shift, key));
                    if !bit_is_present(*bitmap, bit) {
                        return None;
                    }
                    node = &children[array_index_for_bit(*bitmap, bit)];
                }
            }
        }
    }

    pub(crate) fn get_value_or<'a>(&'a self, key: u32, default: &'a T) -> &'a T {
        self.find(key).unwrap_or(default)
    }

    /// Returns a node holding `value` at `key`; `shift` is the level this
    /// node occupies in its parent.
    pub(crate) fn assign(this: &NodeRef<T>, shift: u32, key: u32, value: T) -> NodeRef<T> {
        match this.as_ref() {
            Self::Empty => leaf(key, value),
            Self::Leaf { key: existing, .. } => {
                if *existing == key {
                    return leaf(key, value);
                }
                let wrapped = NodeRef::new(Self::SingleBranch {
                    shift,
                    branch: slot_at(shift, *existing),
                    child: this.clone(),
                });
                Self::assign(&wrapped, shift, key, value)
            }
            Self::SingleBranch {
                shift,
                branch,
                child,
            } => Self::assign_into_single(*shift, *branch, child, key, value),
            Self::MultiBranch {
                shift,
                bitmap,
                size,
                children,
            } => Self::assign_into_multi(*shift, *bitmap, *size, children, key, value),
        }
    }

    fn assign_into_single(
        shift: u32,
        branch: u32,
        child: &NodeRef<T>,
        key: u32,
        value: T,
    ) -> NodeRef<T> {
        let slot = slot_at(shift, key);
        if slot == branch {
            let child = Self::assign(child, child_shift(shift), key, value);
            return NodeRef::new(Self::SingleBranch {
                shift,
                branch,
                child,
            });
        }

        // Widen to two children.
        let size = child.value_count() + 1;
        let children: Box<[NodeRef<T>]> = if slot < branch {
            Box::new([leaf(key, value), child.clone()])
        } else {
            Box::new([child.clone(), leaf(key, value)])
        };
        NodeRef::new(Self::MultiBranch {
            shift,
            bitmap: add_bit(bit_from_index(branch), bit_from_index(slot)),
            size,
            children,
        })
    }

    fn assign_into_multi(
        shift: u32,
        bitmap: u32,
        size: usize,
        children: &[NodeRef<T>],
        key: u32,
        value: T,
    ) -> NodeRef<T> {
        let bit = bit_from_index(slot_at(shift, key));
        let position = array_index_for_bit(bitmap, bit);
        let mut new_children = children.to_vec();

        if bit_is_present(bitmap, bit) {
            let old = &children[position];
            let new = Self::assign(old, child_shift(shift), key, value);
            let size = size + new.value_count() - old.value_count();
            new_children[position] = new;
            NodeRef::new(Self::MultiBranch {
                shift,
                bitmap,
                size,
                children: new_children.into_boxed_slice(),
            })
        } else {
            new_children.insert(position, leaf(key, value));
            NodeRef::new(Self::MultiBranch {
                shift,
                bitmap: add_bit(bitmap, bit),
                size: size + 1,
                children: new_children.into_boxed_slice(),
            })
        }
    }

    pub(crate) fn delete(this: &NodeRef<T>, key: u32) -> Deleted<T> {
        match this.as_ref() {
            Self::Empty => Deleted::Unchanged,
            Self::Leaf { key: existing, .. } => {
                if *existing == key {
                    Deleted::Emptied
                } else {
                    Deleted::Unchanged
                }
            }
            Self::SingleBranch {
                shift,
                branch,
                child,
            } => {
                if slot_at(*shift, key) != *branch {
                    return Deleted::Unchanged;
                }
                match Self::delete(child, key) {
                    Deleted::Unchanged => Deleted::Unchanged,
                    Deleted::Emptied => Deleted::Emptied,
                    Deleted::Replaced(child) if child.is_leaf() => Deleted::Replaced(child),
                    Deleted::Replaced(child) => Deleted::Replaced(NodeRef::new(Self::SingleBranch {
                        shift: *shift,
                        branch: *branch,
                        child,
                    })),
                }
            }
            Self::MultiBranch {
                shift,
                bitmap,
                size,
                children,
            } => Self::delete_from_multi(*shift, *bitmap, *size, children, key),
        }
    }

    fn delete_from_multi(
        shift: u32,
        bitmap: u32,
        size: usize,
        children: &[NodeRef<T>],
        key: u32,
    ) -> Deleted<T> {
        let bit = bit_from_index(slot_at(shift, key));
        if !bit_is_present(bitmap, bit) {
            return Deleted::Unchanged;
        }
        let position = array_index_for_bit(bitmap, bit);

        match Self::delete(&children[position], key) {
            Deleted::Unchanged => Deleted::Unchanged,
            Deleted::Replaced(child) => {
                let mut new_children = children.to_vec();
                new_children[position] = child;
                Deleted::Replaced(NodeRef::new(Self::MultiBranch {
                    shift,
                    bitmap,
                    size: size - 1,
                    children: new_children.into_boxed_slice(),
                }))
            }
            Deleted::Emptied => {
                let bitmap = remove_bit(bitmap, bit);
                let mut new_children = children.to_vec();
                new_children.remove(position);
                match new_children.as_slice() {
                    [] => Deleted::Emptied,
                    [lone] => Deleted::Replaced(Self::lone_child(shift, bitmap, lone.clone())),
                    _ => Deleted::Replaced(NodeRef::new(Self::MultiBranch {
                        shift,
                        bitmap,
                        size: size - 1,
                        children: new_children.into_boxed_slice(),
                    })),
                }
            }
        }
    }

    /// Shape for a branch left with one child: leaves move up, branches keep
    /// their level under a single-branch node.
    fn lone_child(shift: u32, bitmap: u32, child: NodeRef<T>) -> NodeRef<T> {
        if child.is_leaf() {
            child
        } else {
            NodeRef::new(Self::SingleBranch {
                shift,
                branch: index_from_bit(bitmap),
                child,
            })
        }
    }

    /// Branch node at `shift` over `children`, which are in ascending slot order.
    pub(crate) fn branch(shift: u32, children: Vec<NodeRef<T>>) -> Option<NodeRef<T>> {
        let slot_of = |child: &NodeRef<T>| child.first_key().map_or(0, |key| slot_at(shift, key));
        match children.as_slice() {
            [] => None,
            [lone] if lone.is_leaf() => Some(lone.clone()),
            [lone] => Some(NodeRef::new(Self::SingleBranch {
                shift,
                branch: slot_of(lone),
                child: lone.clone(),
            })),
            _ => {
                let bitmap = children
                    .iter()
                    .fold(0, |bitmap, child| add_bit(bitmap, bit_from_index(slot_of(child))));
                let size = children.iter().map(|child| child.value_count()).sum();
                Some(NodeRef::new(Self::MultiBranch {
                    shift,
                    bitmap,
                    size,
                    children: children.into_boxed_slice(),
                }))
            }
        }
    }

    /// Recomputes this subtree's size while checking its structure.
    ///
    /// `path` holds the key bits fixed by the slots above this node and
    /// `path_mask` marks which bits those are.
    #[cfg(any(test, debug_assertions, feature = "invariants"))]
    pub(crate) fn check(
        &self,
        shift: u32,
        path: u32,
        path_mask: u32,
    ) -> Result<usize, InvariantViolation> {
        match self {
            Self::Empty => Ok(0),
            Self::Leaf { key, .. } => {
                if key & path_mask == path {
                    Ok(1)
                } else {
                    Err(report(InvariantViolation::MisplacedKey {
                        key: u64::from(*key),
                        shift,
                    }))
                }
            }
            Self::SingleBranch {
                shift: own,
                branch,
                child,
            } => {
                Self::check_shift(shift, *own)?;
                if child.is_empty() {
                    return Err(report(InvariantViolation::EmptyChild { shift: *own }));
                }
                if child.is_leaf() {
                    return Err(report(InvariantViolation::CollapsibleNode { shift: *own }));
                }
                Self::check_child(child, *own, *branch, path, path_mask)
            }
            Self::MultiBranch {
                shift: own,
                bitmap,
                size,
                children,
            } => {
                Self::check_shift(shift, *own)?;
                if bitmap.count_ones() as usize != children.len() {
                    return Err(report(InvariantViolation::BitmapMismatch {
                        array: "children",
                        bits: bitmap.count_ones(),
                        length: children.len(),
                    }));
                }
                if children.len() < 2 {
                    return Err(report(InvariantViolation::CollapsibleNode { shift: *own }));
                }
                let mut remaining = *bitmap;
                let mut computed = 0;
                for child in children.iter() {
                    let bit = remaining & remaining.wrapping_neg();
                    remaining ^= bit;
                    if child.is_empty() {
                        return Err(report(InvariantViolation::EmptyChild { shift: *own }));
                    }
                    computed += Self::check_child(child, *own, index_from_bit(bit), path, path_mask)?;
                }
                if computed == *size {
                    Ok(computed)
                } else {
                    Err(report(InvariantViolation::SizeMismatch {
                        cached: *size,
                        computed,
                    }))
                }
            }
        }
    }

    #[cfg(any(test, debug_assertions, feature = "invariants"))]
    fn check_shift(expected: u32, actual: u32) -> Result<(), InvariantViolation> {
        if expected == actual {
            Ok(())
        } else {
            Err(report(InvariantViolation::ShiftOrder {
                parent_shift: expected + SHIFT_PER_LEVEL,
                child_shift: actual,
            }))
        }
    }

    #[cfg(any(test, debug_assertions, feature = "invariants"))]
    fn check_child(
        child: &Self,
        shift: u32,
        slot: u32,
        path: u32,
        path_mask: u32,
    ) -> Result<usize, InvariantViolation> {
        let path = path | (slot << shift);
        let path_mask = path_mask | (SLOT_MASK << shift);
        if shift == 0 && !child.is_leaf() {
            return Err(report(InvariantViolation::ShiftOrder {
                parent_shift: 0,
                child_shift: 0,
            }));
        }
        child.check(child_shift(shift), path, path_mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::int::flip;
    use rstest::rstest;

    fn build(indices: &[i32]) -> NodeRef<i32> {
        indices.iter().fold(NodeRef::new(TrieNode::Empty), |node, index| {
            TrieNode::assign(&node, ROOT_SHIFT, flip(*index), *index)
        })
    }

    fn remove(node: &NodeRef<i32>, index: i32) -> NodeRef<i32> {
        match TrieNode::delete(node, flip(index)) {
            Deleted::Unchanged => node.clone(),
            Deleted::Emptied => NodeRef::new(TrieNode::Empty),
            Deleted::Replaced(node) => node,
        }
    }

    #[rstest]
    fn test_single_assign_is_a_leaf_at_the_root() {
        let node = build(&[7]);
        assert!(node.is_leaf());
        assert_eq!(node.find(flip(7)), Some(&7));
        assert_eq!(node.find(flip(8)), None);
    }

    #[rstest]
    fn test_two_keys_grow_only_where_they_diverge() {
        // 0 and 1 share every chunk except the lowest.
        let node = build(&[0, 1]);
        let mut depth = 0;
        let mut current: &TrieNode<i32> = &node;
        while let TrieNode::SingleBranch { child, .. } = current {
            depth += 1;
            current = child;
        }
        assert_eq!(depth, 6);
        assert!(matches!(current, TrieNode::MultiBranch { shift: 0, size: 2, .. }));
        assert_eq!(node.check(ROOT_SHIFT, 0, 0), Ok(2));
    }

    #[rstest]
    fn test_assign_shares_untouched_siblings() {
        let node = build(&[0, 1 << 10, 2 << 10]);
        let TrieNode::SingleBranch { child: before, .. } = node.as_ref() else {
            panic!("expected a single branch root");
        };
        let updated = TrieNode::assign(&node, ROOT_SHIFT, flip(1), 1);
        let TrieNode::SingleBranch { child: after, .. } = updated.as_ref() else {
            panic!("expected a single branch root");
        };
        let (
            TrieNode::SingleBranch { child: before, .. },
            TrieNode::SingleBranch { child: after, .. },
        ) = (before.as_ref(), after.as_ref())
        else {
            panic!("expected single branches at shift 25");
        };
        let (
            TrieNode::SingleBranch { child: before, .. },
            TrieNode::SingleBranch { child: after, .. },
        ) = (before.as_ref(), after.as_ref())
        else {
            panic!("expected single branches at shift 20");
        };
        let (
            TrieNode::SingleBranch { child: before, .. },
            TrieNode::SingleBranch { child: after, .. },
        ) = (before.as_ref(), after.as_ref())
        else {
            panic!("expected single branches at shift 15");
        };
        let (
            TrieNode::MultiBranch { children: before, .. },
            TrieNode::MultiBranch { children: after, .. },
        ) = (before.as_ref(), after.as_ref())
        else {
            panic!("expected multi branches at shift 10");
        };
        assert!(!NodeRef::ptr_eq(&before[0], &after[0]));
        assert!(NodeRef::ptr_eq(&before[1], &after[1]));
        assert!(NodeRef::ptr_eq(&before[2], &after[2]));
    }

    #[rstest]
    fn test_delete_absent_key_is_unchanged() {
        let node = build(&[1, 2, 3]);
        assert!(matches!(TrieNode::delete(&node, flip(4)), Deleted::Unchanged));
        assert!(matches!(TrieNode::delete(&node, flip(1 << 20)), Deleted::Unchanged));
    }

    #[rstest]
    fn test_delete_lifts_lone_leaf() {
        let node = build(&[0, 1]);
        let node = remove(&node, 0);
        assert!(node.is_leaf());
        assert_eq!(node.find(flip(1)), Some(&1));
        assert_eq!(node.check(ROOT_SHIFT, 0, 0), Ok(1));
    }

    #[rstest]
    fn test_delete_keeps_lone_branch_at_its_level() {
        let node = build(&[0, 1, 1 << 10]);
        let node = remove(&node, 1 << 10);
        assert_eq!(node.value_count(), 2);
        assert_eq!(node.check(ROOT_SHIFT, 0, 0), Ok(2));
        assert_eq!(node.find(flip(0)), Some(&0));
        assert_eq!(node.find(flip(1)), Some(&1));
    }

    #[rstest]
    fn test_delete_everything_empties() {
        let indices = [5, -5, 0, i32::MAX, i32::MIN, 1 << 20];
        let mut node = build(&indices);
        for index in indices {
            node = remove(&node, index);
            node.check(ROOT_SHIFT, 0, 0).expect("valid after delete");
        }
        assert!(node.is_empty());
    }

    #[rstest]
    fn test_branch_builds_every_shape() {
        assert!(TrieNode::<i32>::branch(0, Vec::new()).is_none());

        let lone = TrieNode::branch(0, vec![leaf(3, 3)]).expect("one leaf");
        assert!(lone.is_leaf());

        let pair = TrieNode::branch(0, vec![leaf(3, 3), leaf(9, 9)]).expect("two leaves");
        assert!(matches!(
            pair.as_ref(),
            TrieNode::MultiBranch { bitmap, size: 2, .. } if *bitmap == (1 << 3) | (1 << 9)
        ));

        let single = TrieNode::branch(5, vec![pair]).expect("one branch");
        assert!(matches!(
            single.as_ref(),
            TrieNode::SingleBranch { shift: 5, branch: 0, .. }
        ));
    }

    #[rstest]
    fn test_check_detects_size_drift() {
        let node: NodeRef<i32> = NodeRef::new(TrieNode::MultiBranch {
            shift: ROOT_SHIFT,
            bitmap: 0b11,
            size: 5,
            children: Box::new([leaf(0, 0), leaf(1 << 30, 1)]),
        });
        assert_eq!(
            node.check(ROOT_SHIFT, 0, 0),
            Err(InvariantViolation::SizeMismatch {
                cached: 5,
                computed: 2
            })
        );
    }

    #[rstest]
    fn test_check_detects_misplaced_leaf() {
        let node: NodeRef<i32> = NodeRef::new(TrieNode::MultiBranch {
            shift: ROOT_SHIFT,
            bitmap: 0b11,
            size: 2,
            children: Box::new([leaf(0, 0), leaf(3 << 30, 1)]),
        });
        assert!(matches!(
            node.check(ROOT_SHIFT, 0, 0),
            Err(InvariantViolation::MisplacedKey { .. })
        ));
    }
}
