use tracing::trace;

use super::{Entry, MerkleBTree, Node, NodeId};
use crate::prelude::*;

impl<T: Content, D: CombiningHash> MerkleBTree<T, D> {
    /// Stores `item`, replacing (and returning) the stored item that
    /// compares equal to it, if any.
    ///
    /// The item's digest is computed before the tree is touched: if it
    /// fails, the error is returned and the tree is left exactly as it was.
    pub fn put(&mut self, item: T) -> Result<Option<T>> {
        let entry = Entry::new(item)?;

        let Some(mut id) = self.root else {
            let root = self.nodes.insert(Node::new(None, vec![entry], Vec::new()));
            self.root = Some(root);
            self.len = 1;
            self.rehash(root);
            return Ok(None);
        };

        loop {
            let node = &mut self.nodes[id];

            match node.search(&entry.item) {
                Ok(index) => {
                    let previous = std::mem::replace(&mut node.entries[index], entry);
                    self.rehash_to_root(id);
                    return Ok(Some(previous.item));
                }
                Err(index) if node.is_leaf() => {
                    node.entries.insert(index, entry);
                    self.len += 1;
                    self.split(id);
                    return Ok(None);
                }
                Err(index) => id = node.children[index],
            }
        }
    }

    /// Splits `id` if it overflowed, then keeps splitting upwards while the
    /// parent receiving the separator overflows in turn. Finishes by
    /// rehashing the path to the root.
    fn split(&mut self, mut id: NodeId) {
        let pivot = self.order.pivot();

        loop {
            if self.nodes[id].entries.len() <= self.order.max_contents() {
                self.rehash_to_root(id);
                return;
            }

            trace!(node = %id, "splitting overfull node");

            // `id` keeps the left half in place, a fresh node takes the right one.
            let node = &mut self.nodes[id];
            let right_entries = node.entries.split_off(pivot + 1);
            let separator = node.entries.remove(pivot);
            let right_children = if node.is_leaf() {
                Vec::new()
            } else {
                node.children.split_off(pivot + 1)
            };
            let parent = node.parent;

            let right = self
                .nodes
                .insert(Node::new(parent, right_entries, right_children));
            let moved = self.nodes[right].children.clone();
            self.nodes.adopt(right, &moved);

            self.rehash(id);
            self.rehash(right);

            let Some(parent) = parent else {
                let root = self
                    .nodes
                    .insert(Node::new(None, vec![separator], vec![id, right]));
                self.nodes.adopt(root, &[id, right]);
                self.root = Some(root);
                self.rehash(root);

                trace!(root = %root, height = self.height(), "grew a new root");
                return;
            };

            let parent_node = &mut self.nodes[parent];
            let slot = match parent_node.search(&separator.item) {
                Ok(slot) | Err(slot) => slot,
            };
            parent_node.entries.insert(slot, separator);
            parent_node.children.insert(slot + 1, right);

            id = parent;
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::{collection::vec, prelude::*};

    use super::*;
    use crate::testing::*;

    type Blake3 = blake3::Hasher;
    type Tree = MerkleBTree<Pair, Blake3>;

    #[test]
    fn test_put_into_empty_tree() {
        let mut tree = Tree::new(3).unwrap();
        assert_eq!(tree.put(pair(1)), Ok(None));

        assert_eq!(tree.len(), 1);
        assert_eq!(tree.height(), 1);
        assert_shape(&tree, &[&[&[1]]]);
        assert!(tree.verify().unwrap());
    }

    #[test]
    fn test_put_order_3_sequential() {
        let mut tree = Tree::new(3).unwrap();

        tree.put(pair(1)).unwrap();
        tree.put(pair(2)).unwrap();
        assert_shape(&tree, &[&[&[1, 2]]]);

        tree.put(pair(3)).unwrap();
        assert_shape(&tree, &[&[&[2]], &[&[1], &[3]]]);

        tree.put(pair(4)).unwrap();
        assert_shape(&tree, &[&[&[2]], &[&[1], &[3, 4]]]);

        tree.put(pair(5)).unwrap();
        assert_shape(&tree, &[&[&[2, 4]], &[&[1], &[3], &[5]]]);

        tree.put(pair(6)).unwrap();
        assert_shape(&tree, &[&[&[2, 4]], &[&[1], &[3], &[5, 6]]]);

        tree.put(pair(7)).unwrap();
        assert_shape(
            &tree,
            &[&[&[4]], &[&[2], &[6]], &[&[1], &[3], &[5], &[7]]],
        );

        assert_eq!(tree.len(), 7);
        assert_eq!(tree.height(), 3);
        check_invariants(&tree).unwrap();
    }

    #[test]
    fn test_put_order_4_biases_right() {
        let mut tree = Tree::new(4).unwrap();

        for key in [0, 2, 1, 1] {
            tree.put(pair(key)).unwrap();
        }
        assert_eq!(tree.len(), 3);
        assert_shape(&tree, &[&[&[0, 1, 2]]]);

        tree.put(pair(3)).unwrap();
        assert_shape(&tree, &[&[&[1]], &[&[0], &[2, 3]]]);

        tree.put(pair(4)).unwrap();
        assert_shape(&tree, &[&[&[1]], &[&[0], &[2, 3, 4]]]);

        tree.put(pair(5)).unwrap();
        assert_shape(&tree, &[&[&[1, 3]], &[&[0], &[2], &[4, 5]]]);
        check_invariants(&tree).unwrap();
    }

    #[test]
    fn test_put_order_6() {
        let mut tree = Tree::new(6).unwrap();

        for key in [10, 20, 30, 40, 50] {
            tree.put(pair(key)).unwrap();
        }
        assert_shape(&tree, &[&[&[10, 20, 30, 40, 50]]]);

        tree.put(pair(60)).unwrap();
        assert_shape(&tree, &[&[&[30]], &[&[10, 20], &[40, 50, 60]]]);

        for key in [70, 80, 90] {
            tree.put(pair(key)).unwrap();
        }
        assert_shape(
            &tree,
            &[&[&[30, 60]], &[&[10, 20], &[40, 50], &[70, 80, 90]]],
        );
        check_invariants(&tree).unwrap();
    }

    #[test]
    fn test_put_descending_splits_left() {
        let mut tree = MerkleBTree::<Item<i64, ()>, Blake3>::new(3).unwrap();

        for key in (-4..=6).rev() {
            tree.put(Item::new(key, ())).unwrap();
        }

        let levels = tree
            .levels()
            .iter()
            .map(|level| {
                level
                    .iter()
                    .map(|node| node.contents().map(|item| item.key).collect::<Vec<_>>())
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();

        assert_eq!(
            levels,
            vec![
                vec![vec![-1, 3]],
                vec![vec![-3], vec![1], vec![5]],
                vec![vec![-4], vec![-2], vec![0], vec![2], vec![4], vec![6]],
            ]
        );
        assert!(tree.verify().unwrap());
    }

    #[test]
    fn test_overwrite_returns_previous_item() {
        let mut tree = Tree::from_items(3, (1..=7).map(pair)).unwrap();

        let previous = tree.put(Item::new(4, "replaced".to_string())).unwrap();
        assert_eq!(previous, Some(pair(4)));
        assert_eq!(tree.get(&Pair::probe(4)).map(|item| item.value.as_str()), Some("replaced"));

        let previous = tree.put(Item::new(1, "leaf".to_string())).unwrap();
        assert_eq!(previous, Some(pair(1)));
        assert_eq!(tree.len(), 7);
        assert!(tree.verify().unwrap());
    }

    #[test]
    fn test_failed_digest_leaves_tree_untouched() {
        let mut tree = MerkleBTree::<Flaky, Blake3>::new(3).unwrap();
        assert!(matches!(tree.put(Flaky::broken(1)), Err(Error::Digest(_))));
        assert!(tree.is_empty());
        assert_eq!(tree.root_digest_hex(), "");

        for key in 0..20 {
            tree.put(Flaky::fine(key)).unwrap();
        }
        let before = tree.root_digest();

        assert!(matches!(tree.put(Flaky::broken(7)), Err(Error::Digest(_))));
        assert!(matches!(tree.put(Flaky::broken(100)), Err(Error::Digest(_))));

        assert_eq!(tree.len(), 20);
        assert_eq!(tree.root_digest(), before);
        assert_eq!(tree.get(&Flaky::fine(7)), Some(&Flaky::fine(7)));
        assert!(tree.get(&Flaky::fine(100)).is_none());
        check_invariants(&tree).unwrap();
    }

    #[test_strategy::proptest]
    fn test_every_put_keeps_invariants(
        #[strategy(MIN_ORDER..=10usize)] order: usize,
        #[strategy(vec(0..500u64, 0..200))] keys: Vec<u64>,
    ) {
        let mut tree = Tree::new(order)?;

        for key in keys {
            tree.put(pair(key))?;
            prop_assert_eq!(check_invariants(&tree), Ok(()));
            prop_assert!(tree.verify()?);
        }
    }

    #[test_strategy::proptest]
    fn test_put_is_idempotent(tree: Tree, key: u64) {
        let mut once = tree.clone();
        once.put(pair(key))?;

        let mut twice = once.clone();
        twice.put(pair(key))?;

        prop_assert_eq!(once.root_digest(), twice.root_digest());
        prop_assert_eq!(once.len(), twice.len());
        prop_assert_eq!(shape(&once), shape(&twice));
    }
}
