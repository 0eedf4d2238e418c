use std::iter::FusedIterator;

use smallvec::SmallVec;

use super::node::LongArrayNode;
use crate::bits::long::{array_index_for_bit, index_from_bit, least_bit, unflip};

struct Frame<'a, T> {
    node: &'a LongArrayNode<T>,
    values: u64,
    nodes: u64,
}

enum Step<'a, T> {
    Value(u64, &'a T),
    Child(&'a LongArrayNode<T>),
}

impl<'a, T> Frame<'a, T> {
    const fn new(node: &'a LongArrayNode<T>) -> Self {
        Self {
            node,
            values: node.values_bitmap,
            nodes: node.nodes_bitmap,
        }
    }

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

/// In-order iterator over a window of a [`LongTrieArray`](super::LongTrieArray).
pub struct LongArrayCursor<'a, T> {
    stack: SmallVec<[Frame<'a, T>; 12]>,
    remaining: usize,
}

impl<'a, T> LongArrayCursor<'a, T> {
    pub(crate) fn new(root: Option<&'a LongArrayNode<T>>, offset: usize, limit: usize) -> Self {
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

impl<'a, T> Iterator for LongArrayCursor<'a, T> {
    type Item = (i64, &'a T);

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

impl<T> ExactSizeIterator for LongArrayCursor<'_, T> {}

impl<T> FusedIterator for LongArrayCursor<'_, T> {}

#[cfg(test)]
mod tests {
    use super::super::LongTrieArray;
    use rstest::rstest;

    #[rstest]
    fn test_value_precedes_child_in_same_slot() {
        let array = LongTrieArray::new().assign(65, 'b').assign(64, 'a').assign(0, 'z');
        assert_eq!(array.keys().collect::<Vec<_>>(), vec![0, 64, 65]);
    }

    #[rstest]
    #[case(0, 250)]
    #[case(3, 4)]
    #[case(100, 250)]
    #[case(249, 250)]
    fn test_window_matches_skipping(#[case] offset: usize, #[case] limit: usize) {
        let array: LongTrieArray<i64> = (0..250_i64)
            .map(|position| (position * 0x0001_0000_0001 - (1 << 40), position))
            .collect();
        let all: Vec<i64> = array.keys().collect();
        let window: Vec<i64> = array.slice(offset, limit).into_keys().collect();
        assert_eq!(window, all[offset..limit]);
    }
}
