use std::iter::FusedIterator;
use std::slice;

use smallvec::SmallVec;

use super::node::{NodeRef, TrieNode};
use crate::bits::int::unflip;

/// Siblings still to visit at one level.
struct Frame<'a, T> {
    nodes: &'a [NodeRef<T>],
    next: usize,
}

/// In-order iterator over a window of a classic trie.
///
/// Created by [`Trie::iter`](super::Trie::iter) and by slices of a
/// [`Trie`](super::Trie).
pub struct TrieCursor<'a, T> {
    stack: SmallVec<[Frame<'a, T>; 8]>,
    remaining: usize,
}

impl<'a, T> TrieCursor<'a, T> {
    pub(crate) fn new(root: &'a NodeRef<T>, offset: usize, limit: usize) -> Self {
        let mut cursor = Self {
            stack: SmallVec::new(),
            remaining: limit - offset,
        };
        if cursor.remaining > 0 {
            cursor.stack.push(Frame {
                nodes: slice::from_ref(root),
                next: 0,
            });
            cursor.skip_positions(offset);
        }
        cursor
    }

    /// Advances past `count` entries, stepping over whole subtrees.
    fn skip_positions(&mut self, mut count: usize) {
        while count > 0 {
            let Some(frame) = self.stack.last_mut() else {
                return;
            };
            let nodes = frame.nodes;
            let Some(node) = nodes.get(frame.next) else {
                self.stack.pop();
                continue;
            };
            let size = node.value_count();
            if size <= count {
                count -= size;
                frame.next += 1;
                continue;
            }
            frame.next += 1;
            match node.as_ref() {
                TrieNode::SingleBranch { child, .. } => self.stack.push(Frame {
                    nodes: slice::from_ref(child),
                    next: 0,
                }),
                TrieNode::MultiBranch { children, .. } => self.stack.push(Frame {
                    nodes: children,
                    next: 0,
                }),
                // A leaf is never larger than the count left to skip.
                TrieNode::Empty | TrieNode::Leaf { .. } => {}
            }
        }
    }
}

impl<'a, T> Iterator for TrieCursor<'a, T> {
    type Item = (i32, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        while self.remaining > 0 {
            let frame = self.stack.last_mut()?;
            let nodes = frame.nodes;
            let Some(node) = nodes.get(frame.next) else {
                self.stack.pop();
                continue;
            };
            frame.next += 1;
            match node.as_ref() {
                TrieNode::Leaf { key, value } => {
                    self.remaining -= 1;
                    return Some((unflip(*key), value));
                }
                TrieNode::SingleBranch { child, .. } => self.stack.push(Frame {
                    nodes: slice::from_ref(child),
                    next: 0,
                }),
                TrieNode::MultiBranch { children, .. } => self.stack.push(Frame {
                    nodes: children,
                    next: 0,
                }),
                TrieNode::Empty => {}
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for TrieCursor<'_, T> {}

impl<T> FusedIterator for TrieCursor<'_, T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::int::flip;
    use crate::trie::node::ROOT_SHIFT;
    use rstest::rstest;

    fn build(indices: impl IntoIterator<Item = i32>) -> NodeRef<i32> {
        indices.into_iter().fold(NodeRef::new(TrieNode::Empty), |node, index| {
            TrieNode::assign(&node, ROOT_SHIFT, flip(index), index)
        })
    }

    #[rstest]
    fn test_empty_root_yields_nothing() {
        let root: NodeRef<i32> = NodeRef::new(TrieNode::Empty);
        assert_eq!(TrieCursor::new(&root, 0, 0).count(), 0);
    }

    #[rstest]
    fn test_signed_order() {
        let root = build([5, i32::MIN, 0, -5, i32::MAX]);
        let keys: Vec<i32> = TrieCursor::new(&root, 0, 5).map(|(key, _)| key).collect();
        assert_eq!(keys, vec![i32::MIN, -5, 0, 5, i32::MAX]);
    }

    #[rstest]
    #[case(0, 100)]
    #[case(31, 33)]
    #[case(64, 64)]
    #[case(99, 100)]
    #[case(17, 81)]
    fn test_window_matches_skipping(#[case] offset: usize, #[case] limit: usize) {
        let root = build((0..100).map(|index| index * 37 - 1800));
        let all: Vec<i32> = TrieCursor::new(&root, 0, 100).map(|(key, _)| key).collect();
        let window: Vec<i32> = TrieCursor::new(&root, offset, limit)
            .map(|(key, _)| key)
            .collect();
        assert_eq!(window, all[offset..limit]);
    }

    #[rstest]
    fn test_exact_size() {
        let root = build(0..10);
        let mut cursor = TrieCursor::new(&root, 2, 9);
        assert_eq!(cursor.len(), 7);
        cursor.next();
        assert_eq!(cursor.len(), 6);
    }
}
