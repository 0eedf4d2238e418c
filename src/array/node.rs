//! The adaptive node over 32-bit keys.
//!
//! An adaptive node at shift `s` covers every key whose bits above `s + 5`
//! equal its `base`. Slot `i` of the node can hold both a *value* and a
//! *child*:
//!
//! - the value is the entry for the key `base | i << s`, i.e. the one key of
//!   that slot whose bits below `s` are all zero;
//! - the child covers every other key of the slot and sits at a lower shift.
//!
//! A child does not have to sit exactly one level below its parent. Levels
//! that would only ever hold a single child are never materialised; when a
//! key arrives that a node does not cover, the common ancestor of the node
//! and the key is created on the spot.
//!
//! All mutating operations come in a weighted form (`assign_with`,
//! `delete_with`). The weight of a stored value is the number of entries it
//! counts for in `size`: one for a plain array, the strategy-reported entry
//! count for a mapped array.

use crate::ReferenceCounter;
use crate::bits::int::{
    SHIFT_PER_LEVEL, add_bit, array_index_for_bit, base_index_at_shift, bit_from_index,
    bit_is_present, find_shift_for_index, is_aligned_at_shift, natural_shift, remove_bit, slot_at,
};
use crate::mapping::Removal;

#[cfg(any(test, debug_assertions, feature = "invariants"))]
use crate::bits::int::{index_from_bit, least_bit, low_mask};
#[cfg(any(test, debug_assertions, feature = "invariants"))]
use crate::error::{InvariantViolation, report};

/// Shared handle to an adaptive node.
pub(crate) type NodeRef<T> = ReferenceCounter<ArrayNode<T>>;

/// Weight of a value in a plain (unmapped) array.
pub(crate) const fn unit<T>(_: &T) -> usize {
    1
}

pub(crate) struct ArrayNode<T> {
    pub(super) shift: u32,
    pub(super) base: u32,
    pub(super) values_bitmap: u32,
    pub(super) values: ReferenceCounter<[T]>,
    pub(super) nodes_bitmap: u32,
    pub(super) children: ReferenceCounter<[NodeRef<T>]>,
    /// Total weight of the values in this subtree.
    pub(super) size: usize,
}

/// Result of deleting a key below a node.
pub(crate) enum Deleted<T> {
    Unchanged,
    Emptied,
    Replaced(NodeRef<T>),
}

impl<T> ArrayNode<T> {
    #[inline]
    pub(crate) const fn size(&self) -> usize {
        self.size
    }

    /// Returns `true` if `key` lies in the range this node covers.
    #[inline]
    pub(crate) const fn covers(&self, key: u32) -> bool {
        find_shift_for_index(key ^ self.base) <= self.shift
    }

    /// Key of the value stored at `slot`.
    #[inline]
    pub(super) const fn key_at(&self, slot: u32) -> u32 {
        self.base | (slot << self.shift)
    }

    pub(crate) fn find(&self, key: u32) -> Option<&T> {
        let mut node = self;
        loop {
            if !node.covers(key) {
                return None;
            }
            let bit = bit_from_index(slot_at(node.shift, key));
            if is_aligned_at_shift(node.shift, key) {
                return bit_is_present(node.values_bitmap, bit)
                    .then(|| &node.values[array_index_for_bit(node.values_bitmap, bit)]);
            }
            if !bit_is_present(node.nodes_bitmap, bit) {
                return None;
            }
            node = &node.children[array_index_for_bit(node.nodes_bitmap, bit)];
        }
    }

    fn collapse(node: Self) -> NodeRef<T> {
        if node.values.is_empty() && node.children.len() == 1 {
            node.children[0].clone()
        } else {
            NodeRef::new(node)
        }
    }
}

impl<T: Clone> ArrayNode<T> {
    /// A node holding the single value at `key`, placed as high as `key`'s
    /// alignment allows without reaching `shift_limit`.
    pub(crate) fn for_value<W>(shift_limit: u32, key: u32, value: T, weight: &W) -> NodeRef<T>
    where
        W: Fn(&T) -> usize,
    {
        let shift = natural_shift(key).min(shift_limit);
        NodeRef::new(Self {
            shift,
            base: base_index_at_shift(shift, key),
            values_bitmap: bit_from_index(slot_at(shift, key)),
            size: weight(&value),
            values: ReferenceCounter::new([value]),
            nodes_bitmap: 0,
            children: ReferenceCounter::default(),
        })
    }

    /// Assigns below an optional root; an absent root is the empty trie.
    pub(crate) fn assign_root<F, W>(
        root: Option<&NodeRef<T>>,
        max_shift: u32,
        key: u32,
        make: F,
        weight: &W,
    ) -> NodeRef<T>
    where
        F: FnOnce(Option<&T>) -> T,
        W: Fn(&T) -> usize,
    {
        match root {
            None => Self::for_value(max_shift, key, make(None), weight),
            Some(root) => Self::assign_with(root, key, make, weight),
        }
    }

    /// Returns a node storing `make(current)` at `key`.
    ///
    /// If `key` lies outside this node's range, the common ancestor of the
    /// two is synthesised first and the assignment continues from there.
    pub(crate) fn assign_with<F, W>(this: &NodeRef<T>, key: u32, make: F, weight: &W) -> NodeRef<T>
    where
        F: FnOnce(Option<&T>) -> T,
        W: Fn(&T) -> usize,
    {
        let node = this.as_ref();
        let common = find_shift_for_index(key ^ node.base);
        if common > node.shift {
            let parent = Self::ancestor(this, common, weight);
            return Self::assign_with(&parent, key, make, weight);
        }

        let bit = bit_from_index(slot_at(node.shift, key));
        if is_aligned_at_shift(node.shift, key) {
            let position = array_index_for_bit(node.values_bitmap, bit);
            let mut values = node.values.to_vec();
            if bit_is_present(node.values_bitmap, bit) {
                let old = &node.values[position];
                let value = make(Some(old));
                let size = node.size - weight(old) + weight(&value);
                values[position] = value;
                NodeRef::new(node.with_values(node.values_bitmap, values, size))
            } else {
                let value = make(None);
                let size = node.size + weight(&value);
                values.insert(position, value);
                NodeRef::new(node.with_values(add_bit(node.values_bitmap, bit), values, size))
            }
        } else {
            let position = array_index_for_bit(node.nodes_bitmap, bit);
            let mut children = node.children.to_vec();
            if bit_is_present(node.nodes_bitmap, bit) {
                let old = &node.children[position];
                let child = Self::assign_with(old, key, make, weight);
                let size = node.size - old.size + child.size;
                children[position] = child;
                NodeRef::new(node.with_children(node.nodes_bitmap, children, size))
            } else {
                // Unaligned keys never reach a node at shift 0.
                let child =
                    Self::for_value(node.shift - SHIFT_PER_LEVEL, key, make(None), weight);
                let size = node.size + child.size;
                children.insert(position, child);
                NodeRef::new(node.with_children(add_bit(node.nodes_bitmap, bit), children, size))
            }
        }
    }

    /// A node at `shift` whose range contains this node's range.
    ///
    /// The key equal to this node's base is aligned at `shift`, so if this
    /// node stores it, it moves up into the new node's values.
    fn ancestor<W>(this: &NodeRef<T>, shift: u32, weight: &W) -> NodeRef<T>
    where
        W: Fn(&T) -> usize,
    {
        let node = this.as_ref();
        let bit = bit_from_index(slot_at(shift, node.base));
        let base = base_index_at_shift(shift, node.base);

        let hoisted = is_aligned_at_shift(shift, node.base)
            && bit_is_present(node.values_bitmap, bit_from_index(0));
        if !hoisted {
            return NodeRef::new(Self {
                shift,
                base,
                values_bitmap: 0,
                values: ReferenceCounter::default(),
                nodes_bitmap: bit,
                children: ReferenceCounter::new([this.clone()]),
                size: node.size,
            });
        }

        let value = node.values[0].clone();
        let remainder = node.without_value(bit_from_index(0), 0, weight(&value));
        let (nodes_bitmap, children): (u32, ReferenceCounter<[NodeRef<T>]>) =
            match remainder {
                Some(child) => (bit, ReferenceCounter::from([child])),
                None => (0, ReferenceCounter::default()),
            };
        NodeRef::new(Self {
            shift,
            base,
            values_bitmap: bit,
            values: ReferenceCounter::new([value]),
            nodes_bitmap,
            children,
            size: node.size,
        })
    }

    /// Removes or rewrites the value at `key` as `remove` decides.
    pub(crate) fn delete_with<R, W>(this: &NodeRef<T>, key: u32, remove: R, weight: &W) -> Deleted<T>
    where
        R: FnOnce(&T) -> Removal<T>,
        W: Fn(&T) -> usize,
    {
        let node = this.as_ref();
        if !node.covers(key) {
            return Deleted::Unchanged;
        }

        let bit = bit_from_index(slot_at(node.shift, key));
        if is_aligned_at_shift(node.shift, key) {
            if !bit_is_present(node.values_bitmap, bit) {
                return Deleted::Unchanged;
            }
            let position = array_index_for_bit(node.values_bitmap, bit);
            let old = &node.values[position];
            match remove(old) {
                Removal::Unchanged => Deleted::Unchanged,
                Removal::Updated(value) => {
                    let size = node.size - weight(old) + weight(&value);
                    let mut values = node.values.to_vec();
                    values[position] = value;
                    Deleted::Replaced(NodeRef::new(node.with_values(
                        node.values_bitmap,
                        values,
                        size,
                    )))
                }
                Removal::Removed => node
                    .without_value(bit, position, weight(old))
                    .map_or(Deleted::Emptied, Deleted::Replaced),
            }
        } else {
            if !bit_is_present(node.nodes_bitmap, bit) {
                return Deleted::Unchanged;
            }
            let position = array_index_for_bit(node.nodes_bitmap, bit);
            let old = &node.children[position];
            match Self::delete_with(old, key, remove, weight) {
                Deleted::Unchanged => Deleted::Unchanged,
                Deleted::Replaced(child) => {
                    let size = node.size - old.size + child.size;
                    let mut children = node.children.to_vec();
                    children[position] = child;
                    Deleted::Replaced(NodeRef::new(node.with_children(
                        node.nodes_bitmap,
                        children,
                        size,
                    )))
                }
                Deleted::Emptied => node
                    .without_child(bit, position, old.size)
                    .map_or(Deleted::Emptied, Deleted::Replaced),
            }
        }
    }

    fn with_values(&self, values_bitmap: u32, values: Vec<T>, size: usize) -> Self {
        Self {
            shift: self.shift,
            base: self.base,
            values_bitmap,
            values: ReferenceCounter::from(values),
            nodes_bitmap: self.nodes_bitmap,
            children: self.children.clone(),
            size,
        }
    }

    fn with_children(&self, nodes_bitmap: u32, children: Vec<NodeRef<T>>, size: usize) -> Self {
        Self {
            shift: self.shift,
            base: self.base,
            values_bitmap: self.values_bitmap,
            values: self.values.clone(),
            nodes_bitmap,
            children: ReferenceCounter::from(children),
            size,
        }
    }

    /// This node without the value at `position`, or `None` if nothing is left.
    fn without_value(&self, bit: u32, position: usize, removed: usize) -> Option<NodeRef<T>> {
        let size = self.size - removed;
        if size == 0 {
            return None;
        }
        let mut values = self.values.to_vec();
        values.remove(position);
        Some(Self::collapse(self.with_values(
            remove_bit(self.values_bitmap, bit),
            values,
            size,
        )))
    }

    /// This node without the child at `position`, or `None` if nothing is left.
    fn without_child(&self, bit: u32, position: usize, removed: usize) -> Option<NodeRef<T>> {
        let size = self.size - removed;
        if size == 0 {
            return None;
        }
        let mut children = self.children.to_vec();
        children.remove(position);
        Some(Self::collapse(self.with_children(
            remove_bit(self.nodes_bitmap, bit),
            children,
            size,
        )))
    }
}

#[cfg(any(test, debug_assertions, feature = "invariants"))]
impl<T> ArrayNode<T> {
    /// Recomputes this subtree's weight while checking its structure.
    pub(crate) fn check_with<W>(&self, weight: &W) -> Result<usize, InvariantViolation>
    where
        W: Fn(&T) -> usize,
    {
        if self.values_bitmap.count_ones() as usize != self.values.len() {
            return Err(report(InvariantViolation::BitmapMismatch {
                array: "values",
                bits: self.values_bitmap.count_ones(),
                length: self.values.len(),
            }));
        }
        if self.nodes_bitmap.count_ones() as usize != self.children.len() {
            return Err(report(InvariantViolation::BitmapMismatch {
                array: "children",
                bits: self.nodes_bitmap.count_ones(),
                length: self.children.len(),
            }));
        }
        let expected = base_index_at_shift(self.shift, self.base);
        if expected != self.base {
            return Err(report(InvariantViolation::BaseMismatch {
                expected: u64::from(expected),
                actual: u64::from(self.base),
            }));
        }
        if self.values.is_empty() {
            match self.children.len() {
                0 => return Err(report(InvariantViolation::EmptyChild { shift: self.shift })),
                1 => {
                    return Err(report(InvariantViolation::CollapsibleNode {
                        shift: self.shift,
                    }));
                }
                _ => {}
            }
        }

        let mut computed: usize = self.values.iter().map(weight).sum();
        let mut remaining = self.nodes_bitmap;
        for child in self.children.iter() {
            let bit = least_bit(remaining);
            remaining ^= bit;
            self.check_child(child, index_from_bit(bit))?;
            computed += child.check_with(weight)?;
        }

        if computed == self.size {
            Ok(computed)
        } else {
            Err(report(InvariantViolation::SizeMismatch {
                cached: self.size,
                computed,
            }))
        }
    }

    fn check_child(&self, child: &Self, slot: u32) -> Result<(), InvariantViolation> {
        if child.shift >= self.shift {
            return Err(report(InvariantViolation::ShiftOrder {
                parent_shift: self.shift,
                child_shift: child.shift,
            }));
        }
        let expected = self.key_at(slot);
        let actual = child.base & !low_mask(self.shift);
        if actual != expected {
            return Err(report(InvariantViolation::BaseMismatch {
                expected: u64::from(expected),
                actual: u64::from(actual),
            }));
        }
        // That key belongs in this node's values.
        if is_aligned_at_shift(self.shift, child.base)
            && bit_is_present(child.values_bitmap, bit_from_index(0))
        {
            return Err(report(InvariantViolation::MisplacedKey {
                key: u64::from(child.base),
                shift: child.shift,
            }));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::int::{MAX_SHIFT, flip};
    use rstest::rstest;

    fn assign(root: Option<&NodeRef<i32>>, index: i32) -> NodeRef<i32> {
        ArrayNode::assign_root(root, MAX_SHIFT, flip(index), |_| index, &unit)
    }

    fn build(indices: &[i32]) -> NodeRef<i32> {
        let (first, rest) = indices.split_first().expect("at least one index");
        rest.iter()
            .fold(assign(None, *first), |root, index| assign(Some(&root), *index))
    }

    fn delete(root: &NodeRef<i32>, index: i32) -> Deleted<i32> {
        ArrayNode::delete_with(root, flip(index), |_| Removal::Removed, &unit)
    }

    #[rstest]
    #[case(0, MAX_SHIFT)]
    #[case(1, 0)]
    #[case(32, 5)]
    #[case(1 << 20, 20)]
    #[case(-1, 0)]
    fn test_for_value_sits_at_natural_shift(#[case] index: i32, #[case] shift: u32) {
        let node = assign(None, index);
        assert_eq!(node.shift, shift);
        assert_eq!(node.find(flip(index)), Some(&index));
        assert_eq!(node.check_with(&unit), Ok(1));
    }

    #[rstest]
    fn test_ancestor_synthesis_skips_levels() {
        // 1 and 2 share a shift 0 node; 1 << 20 forces an ancestor at shift 20.
        let root = build(&[1, 2, 1 << 20]);
        assert_eq!(root.shift, 20);
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].shift, 0);
        assert_eq!(root.check_with(&unit), Ok(3));
    }

    #[rstest]
    fn test_ancestor_hoists_aligned_base_value() {
        // 32 and 33 share a shift 0 node whose base is 32; assigning 0 needs a
        // shift 5 ancestor in which 32 is a value.
        let root = build(&[33, 32, 0]);
        assert_eq!(root.shift, 5);
        assert_eq!(root.values.len(), 2);
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.check_with(&unit), Ok(3));
        for index in [0, 32, 33] {
            assert_eq!(root.find(flip(index)), Some(&index));
        }
    }

    #[rstest]
    fn test_hoist_can_leave_no_remainder() {
        // After deleting 33 the shift 0 node holds only its base key 32.
        let Deleted::Replaced(root) = delete(&build(&[33, 32]), 33) else {
            panic!("expected a replacement");
        };
        assert_eq!(root.shift, 0);
        let root = assign(Some(&root), 0);
        assert_eq!(root.shift, 5);
        assert!(root.children.is_empty());
        assert_eq!(root.check_with(&unit), Ok(2));
    }

    #[rstest]
    fn test_assign_shares_untouched_children() {
        let before = build(&[(1 << 10) + 1, (2 << 10) + 1, (3 << 10) + 1]);
        let after = ArrayNode::assign_with(&before, flip((2 << 10) + 2), |_| 0, &unit);
        assert_eq!(before.children.len(), after.children.len());
        let shared = before
            .children
            .iter()
            .zip(after.children.iter())
            .filter(|(old, new)| NodeRef::ptr_eq(old, new))
            .count();
        assert_eq!(shared, before.children.len() - 1);
        assert_eq!(after.check_with(&unit), Ok(4));
    }

    std::thread_local! {
        static CLONES: std::cell::Cell<usize> = const { std::cell::Cell::new(0) };
    }

    /// Counts how often it is cloned on the current thread.
    #[derive(Debug, PartialEq)]
    struct Counted(i32);

    impl Clone for Counted {
        fn clone(&self) -> Self {
            CLONES.with(|clones| clones.set(clones.get() + 1));
            Self(self.0)
        }
    }

    fn assign_counted(root: Option<&NodeRef<Counted>>, index: i32) -> NodeRef<Counted> {
        ArrayNode::assign_root(root, MAX_SHIFT, flip(index), |_| Counted(index), &unit)
    }

    fn clones_during(operation: impl FnOnce()) -> usize {
        CLONES.with(|clones| clones.set(0));
        operation();
        CLONES.with(std::cell::Cell::get)
    }

    #[rstest]
    fn test_assign_into_child_shares_parent_values() {
        // 32, 64, ..., 992 then 0 fill all 32 value slots of a shift 5 root;
        // 1 and 2 live in the child of slot 0.
        let indices = (1..32).map(|slot| slot << 5).chain([0, 1, 2]);
        let root = indices.fold(None, |root, index| Some(assign_counted(root.as_ref(), index)));
        let root = root.expect("non-empty");
        assert_eq!(root.shift, 5);
        assert_eq!(root.values.len(), 32);

        let mut fresh_child = None;
        let clones = clones_during(|| fresh_child = Some(assign_counted(Some(&root), 33)));
        assert_eq!(clones, 0);
        let fresh_child = fresh_child.expect("assigned");
        assert!(ReferenceCounter::ptr_eq(&root.values, &fresh_child.values));

        let mut grown_child = None;
        let clones = clones_during(|| grown_child = Some(assign_counted(Some(&root), 3)));
        // Only the two values of the rebuilt child are copied.
        assert_eq!(clones, 2);
        let grown_child = grown_child.expect("assigned");
        assert!(ReferenceCounter::ptr_eq(&root.values, &grown_child.values));
        assert_eq!(grown_child.check_with(&unit), Ok(35));
    }

    #[rstest]
    fn test_assign_value_shares_children() {
        let root = build(&[33, 32, 0]);
        let updated = assign(Some(&root), 64);
        assert!(ReferenceCounter::ptr_eq(&root.children, &updated.children));
    }

    #[rstest]
    fn test_assign_replaces_value_in_place() {
        let root = build(&[4, 8]);
        let updated =
            ArrayNode::assign_with(&root, flip(4), |old| old.copied().unwrap_or(0) + 100, &unit);
        assert_eq!(updated.find(flip(4)), Some(&104));
        assert_eq!(updated.size(), 2);
    }

    #[rstest]
    fn test_delete_absent_is_unchanged() {
        let root = build(&[1, 2, 1 << 20]);
        for index in [0, 3, 1 << 21, -1, i32::MIN] {
            assert!(matches!(delete(&root, index), Deleted::Unchanged));
        }
    }

    #[rstest]
    fn test_delete_lifts_lone_child() {
        let root = build(&[1, 2, 1 << 20]);
        let Deleted::Replaced(root) = delete(&root, 1 << 20) else {
            panic!("expected a replacement");
        };
        assert_eq!(root.shift, 0);
        assert_eq!(root.check_with(&unit), Ok(2));
    }

    #[rstest]
    fn test_delete_everything_empties() {
        let indices = [7, -7, 0, i32::MAX, i32::MIN, 1 << 12, 33, 32];
        let mut root = build(&indices);
        for (position, index) in indices.iter().enumerate() {
            match delete(&root, *index) {
                Deleted::Replaced(next) => {
                    assert_eq!(next.check_with(&unit), Ok(indices.len() - position - 1));
                    root = next;
                }
                Deleted::Emptied => assert_eq!(position, indices.len() - 1),
                Deleted::Unchanged => panic!("{index} was present"),
            }
        }
    }

    #[rstest]
    fn test_weighted_size() {
        let weight = |value: &i32| value.unsigned_abs() as usize;
        let root = ArrayNode::for_value(MAX_SHIFT, flip(1), 3, &weight);
        let root = ArrayNode::assign_with(&root, flip(100), |_| 4, &weight);
        assert_eq!(root.size(), 7);
        assert_eq!(root.check_with(&weight), Ok(7));

        let Deleted::Replaced(root) =
            ArrayNode::delete_with(&root, flip(100), |_| Removal::Updated(1), &weight)
        else {
            panic!("expected an update");
        };
        assert_eq!(root.size(), 4);
    }

    #[rstest]
    fn test_check_detects_collapsible_node() {
        let child = build(&[1, 2]);
        let node = ArrayNode {
            shift: 10,
            base: child.base & !low_mask(15),
            values_bitmap: 0,
            values: ReferenceCounter::default(),
            nodes_bitmap: bit_from_index(slot_at(10, child.base)),
            children: ReferenceCounter::new([child]),
            size: 2,
        };
        assert_eq!(
            node.check_with(&unit),
            Err(InvariantViolation::CollapsibleNode { shift: 10 })
        );
    }

    #[rstest]
    fn test_check_detects_misplaced_base_key() {
        let child = build(&[33, 32]);
        let node = ArrayNode {
            shift: 5,
            base: child.base & !low_mask(10),
            values_bitmap: bit_from_index(0),
            values: ReferenceCounter::new([0]),
            nodes_bitmap: bit_from_index(1),
            children: ReferenceCounter::new([child]),
            size: 3,
        };
        assert!(matches!(
            node.check_with(&unit),
            Err(InvariantViolation::MisplacedKey { .. })
        ));
    }
}
