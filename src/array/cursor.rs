use std::iter::FusedIterator;

use smallvec::SmallVec;

use super::node::ArrayNode;
use crate::bits::int::{array_index_for_bit, index_from_bit, least_bit, unflip};

/// Slots of one node not yet visited.
struct Frame<'a, T> {
    node: &'a ArrayNode<T>,
    values: u32,
    nodes: u32,
}

enum Step<'a, T> {
    Value(u32, &'a T),
    Child(&'a ArrayNode<T>),
}

impl<'a, T> Frame<'a, T> {
    const fn new(node: &'a ArrayNode<T>) -> Self {
        Self {
            node,
            values: node.values_bitmap,
            nodes: node.nodes_bitmap,
        }
    }

    /// Next value or child in slot order; a slot's value precedes its child.
    fn step(&mut self) -> Option<Step<'a, T>> {
        let node = self.node;
        let bit = least_bit(self.values | self.nodes);
        if bit == 0 {
            None
        } else if self.values & bit != 0 {
            self.values ^= bit;
            let value = &node.values[array_index_for_bit(node.values_bitmap, bit)];
            Some(Step::Value(node.key_at(index_from_bit(bit)), value))
        } else {
            self.nodes ^= bit;
            Some(Step::Child(
                &node.children[array_index_for_bit(node.nodes_bitmap, bit)],
            ))
        }
    }
}

/// In-order iterator over a window of a [`TrieArray`](super::TrieArray).
pub struct ArrayCursor<'a, T> {
    stack: SmallVec<[Frame<'a, T>; 8]>,
    remaining: usize,
}

impl<'a, T> ArrayCursor<'a, T> {
    pub(crate) fn new(root: Option<&'a ArrayNode<T>>, offset: usize, limit: usize) -> Self {
        let mut cursor = Self {
            stack: SmallVec::new(),
            remaining: limit - offset,
        };
        if let Some(root) = root
            && cursor.remaining > 0
        {
            cursor.stack.push(Frame::new(root));
            cursor.skip_positions(offset);
        }
        cursor
    }

    fn skip_positions(&mut self, mut count: usize) {
        while count > 0 {
            let Some(frame) = self.stack.last_mut() else {
                return;
            };
            match frame.step() {
                None => {
                    self.stack.pop();
                }
                Some(Step::Value(..)) => count -= 1,
                Some(Step::Child(child)) if child.size() <= count => count -= child.size(),
                Some(Step::Child(child)) => self.stack.push(Frame::new(child)),
            }
        }
    }
}

impl<'a, T> Iterator for ArrayCursor<'a, T> {
    type Item = (i32, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        while self.remaining > 0 {
            let frame = self.stack.last_mut()?;
            match frame.step() {
                None => {
                    self.stack.pop();
                }
                Some(Step::Value(key, value)) => {
                    self.remaining -= 1;
                    return Some((unflip(key), value));
                }
                Some(Step::Child(child)) => self.stack.push(Frame::new(child)),
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for ArrayCursor<'_, T> {}

impl<T> FusedIterator for ArrayCursor<'_, T> {}

#[cfg(test)]
mod tests {
    use super::super::TrieArray;
    use rstest::rstest;

    #[rstest]
    fn test_value_precedes_child_in_same_slot() {
        // 32 is a value at slot 1 of the root; 33 lives in that slot's child.
        let array = TrieArray::new().assign(33, 'b').assign(32, 'a').assign(0, 'z');
        assert_eq!(array.keys().collect::<Vec<_>>(), vec![0, 32, 33]);
    }

    #[rstest]
    #[case(0, 300)]
    #[case(1, 2)]
    #[case(64, 200)]
    #[case(299, 300)]
    #[case(150, 150)]
    fn test_window_matches_skipping(#[case] offset: usize, #[case] limit: usize) {
        let array: TrieArray<i32> = (0..300)
            .map(|position| (position * 7919 - 1_000_000, position))
            .collect();
        let all: Vec<i32> = array.keys().collect();
        let window: Vec<i32> = array.slice(offset, limit).into_keys().collect();
        assert_eq!(window, all[offset..limit]);
    }

    #[rstest]
    fn test_exact_size() {
        let array: TrieArray<i32> = (0..40).map(|index| (index, index)).collect();
        let mut cursor = array.slice(5, 25).iter();
        assert_eq!(cursor.len(), 20);
        cursor.next();
        assert_eq!(cursor.len(), 19);
    }
}
