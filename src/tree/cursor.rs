use std::iter::FusedIterator;

use super::{Arena, MerkleBTree, NodeId};
use crate::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    /// Before the first item.
    Begin,
    At {
        node: NodeId,
        index: usize,
    },
    /// After the last item.
    End,
}

/// A bidirectional cursor over the items of a [`MerkleBTree`] in ascending
/// order.
///
/// A fresh cursor sits on the `Begin` sentinel, before the first item.
/// Moving past either end parks it on the corresponding sentinel, where
/// [`Cursor::current`] yields nothing.
pub struct Cursor<'a, T> {
    nodes: &'a Arena<T>,
    root: Option<NodeId>,
    position: Position,
}

impl<T> Clone for Cursor<'_, T> {
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes,
            root: self.root,
            position: self.position,
        }
    }
}

impl<'a, T> Cursor<'a, T> {
    pub(crate) fn new(nodes: &'a Arena<T>, root: Option<NodeId>) -> Self {
        Self {
            nodes,
            root,
            position: Position::Begin,
        }
    }

    /// The item under the cursor; `None` on a sentinel.
    pub fn current(&self) -> Option<&'a T> {
        match self.position {
            Position::At { node, index } => Some(&self.nodes[node].entries[index].item),
            Position::Begin | Position::End => None,
        }
    }

    pub fn is_begin(&self) -> bool {
        self.position == Position::Begin
    }

    pub fn is_end(&self) -> bool {
        self.position == Position::End
    }

    /// Parks the cursor before the first item.
    pub fn begin(&mut self) {
        self.position = Position::Begin;
    }

    /// Parks the cursor after the last item.
    pub fn end(&mut self) {
        self.position = Position::End;
    }

    /// Jumps to the smallest item. Returns `false`, leaving the cursor on
    /// `End`, when the tree is empty.
    pub fn first(&mut self) -> bool {
        match self.root {
            Some(root) => {
                let node = self.nodes.leftmost_leaf(root);
                self.position = Position::At { node, index: 0 };
                true
            }
            None => {
                self.position = Position::End;
                false
            }
        }
    }

    /// Jumps to the largest item. Returns `false`, leaving the cursor on
    /// `Begin`, when the tree is empty.
    pub fn last(&mut self) -> bool {
        match self.root {
            Some(root) => {
                let node = self.nodes.rightmost_leaf(root);
                let index = self.nodes[node].entries.len() - 1;
                self.position = Position::At { node, index };
                true
            }
            None => {
                self.position = Position::Begin;
                false
            }
        }
    }

    /// Moves one item forward. Returns whether the cursor landed on an item;
    /// stepping past the largest one parks it on `End`, where it stays.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> bool {
        let (node, index) = match self.position {
            Position::Begin => return self.first(),
            Position::End => return false,
            Position::At { node, index } => (node, index),
        };

        let current = &self.nodes[node];

        if !current.is_leaf() {
            let leaf = self.nodes.leftmost_leaf(current.children[index + 1]);
            self.position = Position::At {
                node: leaf,
                index: 0,
            };
            return true;
        }

        if index + 1 < current.entries.len() {
            self.position = Position::At {
                node,
                index: index + 1,
            };
            return true;
        }

        // Climb until we arrive from a child that has a separator to its right.
        let mut child = node;
        while let Some(parent) = self.nodes[child].parent {
            let slot = self.nodes.position_in_parent(parent, child);
            if slot < self.nodes[parent].entries.len() {
                self.position = Position::At {
                    node: parent,
                    index: slot,
                };
                return true;
            }
            child = parent;
        }

        self.position = Position::End;
        false
    }

    /// Moves one item backward. Returns whether the cursor landed on an
    /// item; stepping before the smallest one parks it on `Begin`.
    pub fn prev(&mut self) -> bool {
        let (node, index) = match self.position {
            Position::End => return self.last(),
            Position::Begin => return false,
            Position::At { node, index } => (node, index),
        };

        let current = &self.nodes[node];

        if !current.is_leaf() {
            let leaf = self.nodes.rightmost_leaf(current.children[index]);
            self.position = Position::At {
                node: leaf,
                index: self.nodes[leaf].entries.len() - 1,
            };
            return true;
        }

        if index > 0 {
            self.position = Position::At {
                node,
                index: index - 1,
            };
            return true;
        }

        let mut child = node;
        while let Some(parent) = self.nodes[child].parent {
            let slot = self.nodes.position_in_parent(parent, child);
            if slot > 0 {
                self.position = Position::At {
                    node: parent,
                    index: slot - 1,
                };
                return true;
            }
            child = parent;
        }

        self.position = Position::Begin;
        false
    }
}

impl<T: Content> Cursor<'_, T> {
    /// Positions the cursor on the smallest item not less than `probe`.
    /// Returns `false`, leaving the cursor on `End`, when every item is
    /// smaller.
    pub fn seek(&mut self, probe: &T) -> bool {
        let mut found = Position::End;
        let mut cursor = self.root;

        while let Some(id) = cursor {
            let node = &self.nodes[id];
            match node.search(probe) {
                Ok(index) => {
                    found = Position::At { node: id, index };
                    break;
                }
                Err(index) => {
                    if index < node.entries.len() {
                        found = Position::At { node: id, index };
                    }
                    cursor = node.children.get(index).copied();
                }
            }
        }

        self.position = found;
        !self.is_end()
    }
}

/// Iterator over the items of a [`MerkleBTree`] in ascending order, from
/// either end.
pub struct Iter<'a, T> {
    front: Cursor<'a, T>,
    back: Cursor<'a, T>,
    remaining: usize,
}

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Self {
            front: self.front.clone(),
            back: self.back.clone(),
            remaining: self.remaining,
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        self.front.next();
        self.remaining -= 1;
        self.front.current()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> DoubleEndedIterator for Iter<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        self.back.prev();
        self.remaining -= 1;
        self.back.current()
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}

impl<T, D> MerkleBTree<T, D> {
    /// A cursor parked before the first item.
    pub fn cursor(&self) -> Cursor<'_, T> {
        Cursor::new(&self.nodes, self.root)
    }

    pub fn iter(&self) -> Iter<'_, T> {
        let mut back = self.cursor();
        back.end();

        Iter {
            front: self.cursor(),
            back,
            remaining: self.len,
        }
    }
}

impl<'a, T, D> IntoIterator for &'a MerkleBTree<T, D> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use test_strategy::proptest;

    use super::*;
    use crate::testing::*;

    type Blake3 = blake3::Hasher;
    type Tree = MerkleBTree<Pair, Blake3>;

    fn key(cursor: &Cursor<'_, Pair>) -> Option<u64> {
        cursor.current().map(|item| item.key)
    }

    #[test]
    fn test_cursor_on_empty_tree() {
        let tree = Tree::new(3).unwrap();
        let mut cursor = tree.cursor();

        assert!(cursor.is_begin());
        assert_eq!(key(&cursor), None);

        assert!(!cursor.next());
        assert!(cursor.is_end());
        assert!(!cursor.prev());
        assert!(cursor.is_begin());

        assert!(!cursor.first());
        assert!(!cursor.last());
        assert_eq!(key(&cursor), None);
        assert_eq!(tree.iter().next(), None);
    }

    #[test]
    fn test_cursor_walks_forward() {
        let tree = Tree::from_items(3, (1..=7).map(pair)).unwrap();
        let mut cursor = tree.cursor();

        for expected in 1..=7 {
            assert!(cursor.next());
            assert_eq!(key(&cursor), Some(expected));
        }

        assert!(!cursor.next());
        assert!(cursor.is_end());
        assert_eq!(key(&cursor), None);

        assert!(!cursor.next());
        assert!(cursor.is_end());
    }

    #[test]
    fn test_cursor_walks_backward() {
        let tree = Tree::from_items(3, (1..=7).map(pair)).unwrap();
        let mut cursor = tree.cursor();
        cursor.end();

        for expected in (1..=7).rev() {
            assert!(cursor.prev());
            assert_eq!(key(&cursor), Some(expected));
        }

        assert!(!cursor.prev());
        assert!(cursor.is_begin());
        assert!(!cursor.prev());
    }

    #[test]
    fn test_cursor_turns_around() {
        let tree = Tree::from_items(3, (1..=9).map(pair)).unwrap();
        let mut cursor = tree.cursor();

        // 4 is the root separator: stepping away from it and back crosses levels
        while key(&cursor) != Some(4) {
            assert!(cursor.next());
        }
        assert!(cursor.next());
        assert_eq!(key(&cursor), Some(5));
        assert!(cursor.prev());
        assert_eq!(key(&cursor), Some(4));
        assert!(cursor.prev());
        assert_eq!(key(&cursor), Some(3));

        cursor.begin();
        assert!(!cursor.prev());
        assert!(cursor.next());
        assert_eq!(key(&cursor), Some(1));

        cursor.end();
        assert!(cursor.prev());
        assert_eq!(key(&cursor), Some(9));
    }

    #[test]
    fn test_cursor_first_and_last() {
        let tree = Tree::from_items(4, (10..60).map(pair)).unwrap();
        let mut cursor = tree.cursor();

        assert!(cursor.last());
        assert_eq!(key(&cursor), Some(59));
        assert!(!cursor.next());

        assert!(cursor.first());
        assert_eq!(key(&cursor), Some(10));
        assert!(!cursor.prev());
        assert!(cursor.is_begin());
    }

    #[test]
    fn test_seek() {
        let tree = Tree::from_items(3, (0..20).map(|key| pair(key * 10))).unwrap();
        let mut cursor = tree.cursor();

        assert!(cursor.seek(&Pair::probe(70)));
        assert_eq!(key(&cursor), Some(70));

        assert!(cursor.seek(&Pair::probe(71)));
        assert_eq!(key(&cursor), Some(80));
        assert!(cursor.next());
        assert_eq!(key(&cursor), Some(90));

        assert!(cursor.seek(&Pair::probe(0)));
        assert_eq!(key(&cursor), Some(0));

        assert!(!cursor.seek(&Pair::probe(191)));
        assert!(cursor.is_end());
        assert!(cursor.prev());
        assert_eq!(key(&cursor), Some(190));
    }

    #[test]
    fn test_iter_from_both_ends() {
        let tree = Tree::from_items(3, (1..=10).map(pair)).unwrap();
        let mut iter = tree.iter();

        assert_eq!(iter.len(), 10);
        assert_eq!(iter.next().map(|item| item.key), Some(1));
        assert_eq!(iter.next_back().map(|item| item.key), Some(10));
        assert_eq!(iter.next_back().map(|item| item.key), Some(9));
        assert_eq!(iter.len(), 7);

        let rest = iter.map(|item| item.key).collect::<Vec<_>>();
        assert_eq!(rest, vec![2, 3, 4, 5, 6, 7, 8]);

        let reversed = tree.iter().rev().map(|item| item.key).collect::<Vec<_>>();
        assert_eq!(reversed, (1..=10).rev().collect::<Vec<_>>());
    }

    #[proptest(fork = false)]
    fn test_iteration_is_sorted(
        #[strategy(MIN_ORDER..=10usize)] order: usize,
        #[strategy(distinct_keys(0..300))] keys: Vec<u64>,
    ) {
        let tree = Tree::from_items(order, keys.iter().copied().map(pair))?;

        let mut sorted = keys.clone();
        sorted.sort_unstable();

        let forward = (&tree).into_iter().map(|item| item.key).collect::<Vec<_>>();
        prop_assert_eq!(&forward, &sorted);

        let mut cursor = tree.cursor();
        cursor.end();
        let mut backward = Vec::new();
        while cursor.prev() {
            backward.extend(key(&cursor));
        }
        backward.reverse();
        prop_assert_eq!(backward, sorted);
    }

    #[proptest(fork = false)]
    fn test_seek_finds_lower_bound(
        #[strategy(MIN_ORDER..=6usize)] order: usize,
        #[strategy(distinct_keys(0..100))] keys: Vec<u64>,
        probe: u64,
    ) {
        let tree = Tree::from_items(order, keys.iter().copied().map(pair))?;
        let expected = keys.iter().copied().filter(|&key| key >= probe).min();

        let mut cursor = tree.cursor();
        prop_assert_eq!(cursor.seek(&Pair::probe(probe)), expected.is_some());
        prop_assert_eq!(key(&cursor), expected);
    }
}
