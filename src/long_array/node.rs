//! The adaptive node over 64-bit keys.
//!
//! Same layout and algorithms as the 32-bit node in
//! [`array`](crate::array): a node at shift `s` covers the keys whose bits
//! above `s + 6` equal its `base`, stores the key `base | i << s` as the value
//! of slot `i` and everything else of that slot in a lower child. Levels are
//! six bits wide so that one `u64` bitmap addresses every slot.

use crate::ReferenceCounter;
use crate::bits::long::{
    SHIFT_PER_LEVEL, add_bit, array_index_for_bit, base_index_at_shift, bit_from_index,
    bit_is_present, find_shift_for_index, is_aligned_at_shift, natural_shift, remove_bit, slot_at,
};
use crate::mapping::Removal;

#[cfg(any(test, debug_assertions, feature = "invariants"))]
use crate::bits::long::{index_from_bit, least_bit, low_mask};
#[cfg(any(test, debug_assertions, feature = "invariants"))]
use crate::error::{InvariantViolation, report};

pub(crate) type NodeRef<T> = ReferenceCounter<LongArrayNode<T>>;

pub(crate) const fn unit<T>(_: &T) -> usize {
    1
}

pub(crate) struct LongArrayNode<T> {
    pub(super) shift: u32,
    pub(super) base: u64,
    pub(super) values_bitmap: u64,
    pub(super) values: ReferenceCounter<[T]>,
    pub(super) nodes_bitmap: u64,
    pub(super) children: ReferenceCounter<[NodeRef<T>]>,
    pub(super) size: usize,
}

pub(crate) enum Deleted<T> {
    Unchanged,
    Emptied,
    Replaced(NodeRef<T>),
}

impl<T> LongArrayNode<T> {
    #[inline]
    pub(crate) const fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub(crate) const fn covers(&self, key: u64) -> bool {
        find_shift_for_index(key ^ self.base) <= self.shift
    }

    #[inline]
    pub(super) fn key_at(&self, slot: u32) -> u64 {
        self.base | (u64::from(slot) << self.shift)
    }

    pub(crate) fn find(&self, key: u64) -> Option<&T> {
        let mut node = self;
        while node.covers(key) {
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
        None
    }

    fn collapse(node: Self) -> NodeRef<T> {
        if node.values.is_empty() && node.children.len() == 1 {
            node.children[0].clone()
        } else {
            NodeRef::new(node)
        }
    }
}

impl<T: Clone> LongArrayNode<T> {
    pub(crate) fn for_value<W>(shift_limit: u32, key: u64, value: T, weight: &W) -> NodeRef<T>
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

    pub(crate) fn assign_root<F, W>(
        root: Option<&NodeRef<T>>,
        max_shift: u32,
        key: u64,
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

    pub(crate) fn assign_with<F, W>(this: &NodeRef<T>, key: u64, make: F, weight: &W) -> NodeRef<T>
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
                let child =
                    Self::for_value(node.shift - SHIFT_PER_LEVEL, key, make(None), weight);
                let size = node.size + child.size;
                children.insert(position, child);
                NodeRef::new(node.with_children(add_bit(node.nodes_bitmap, bit), children, size))
            }
        }
    }

    /// Common ancestor of this node at `shift`, taking over this node's base
    /// value when that key is aligned at `shift`.
    fn ancestor<W>(this: &NodeRef<T>, shift: u32, weight: &W) -> NodeRef<T>
    where
        W: Fn(&T) -> usize,
    {
        let node = this.as_ref();
        let bit = bit_from_index(slot_at(shift, node.base));
        let base = base_index_at_shift(shift, node.base);

        if !is_aligned_at_shift(shift, node.base)
            || !bit_is_present(node.values_bitmap, bit_from_index(0))
        {
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
        let (nodes_bitmap, children): (u64, ReferenceCounter<[NodeRef<T>]>) =
            match node.without_value(bit_from_index(0), 0, weight(&value)) {
                Some(remainder) => (bit, ReferenceCounter::from([remainder])),
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

    pub(crate) fn delete_with<R, W>(this: &NodeRef<T>, key: u64, remove: R, weight: &W) -> Deleted<T>
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
            return match remove(old) {
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
            };
        }

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

    fn with_values(&self, values_bitmap: u64, values: Vec<T>, size: usize) -> Self {
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

    fn with_children(&self, nodes_bitmap: u64, children: Vec<NodeRef<T>>, size: usize) -> Self {
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

    fn without_value(&self, bit: u64, position: usize, removed: usize) -> Option<NodeRef<T>> {
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

    fn without_child(&self, bit: u64, position: usize, removed: usize) -> Option<NodeRef<T>> {
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
impl<T> LongArrayNode<T> {
    pub(crate) fn check_with<W>(&self, weight: &W) -> Result<usize, InvariantViolation>
    where
        W: Fn(&T) -> usize,
    {
        for (array, bits, length) in [
            ("values", self.values_bitmap.count_ones(), self.values.len()),
            ("children", self.nodes_bitmap.count_ones(), self.children.len()),
        ] {
            if bits as usize != length {
                return Err(report(InvariantViolation::BitmapMismatch {
                    array,
                    bits,
                    length,
                }));
            }
        }
        let expected = base_index_at_shift(self.shift, self.base);
        if expected != self.base {
            return Err(report(InvariantViolation::BaseMismatch {
                expected,
                actual: self.base,
            }));
        }
        if self.values.is_empty() && self.children.is_empty() {
            return Err(report(InvariantViolation::EmptyChild { shift: self.shift }));
        }
        if self.values.is_empty() && self.children.len() == 1 {
            return Err(report(InvariantViolation::CollapsibleNode { shift: self.shift }));
        }

        let mut computed: usize = self.values.iter().map(weight).sum();
        let mut remaining = self.nodes_bitmap;
        for child in self.children.iter() {
            let bit = least_bit(remaining);
            remaining ^= bit;
            if child.shift >= self.shift {
                return Err(report(InvariantViolation::ShiftOrder {
                    parent_shift: self.shift,
                    child_shift: child.shift,
                }));
            }
            let expected = self.key_at(index_from_bit(bit));
            let actual = child.base & !low_mask(self.shift);
            if actual != expected {
                return Err(report(InvariantViolation::BaseMismatch { expected, actual }));
            }
            if is_aligned_at_shift(self.shift, child.base)
                && bit_is_present(child.values_bitmap, bit_from_index(0))
            {
                return Err(report(InvariantViolation::MisplacedKey {
                    key: child.base,
                    shift: child.shift,
                }));
            }
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
}
