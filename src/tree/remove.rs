use tracing::trace;

use super::{MerkleBTree, NodeId};
use crate::prelude::*;

impl<T: Content, D: CombiningHash> MerkleBTree<T, D> {
    /// Removes and returns the stored item comparing equal to `probe`.
    /// Removing an absent item is a no-op returning `None`.
    pub fn remove(&mut self, probe: &T) -> Option<T> {
        let (id, index) = self.locate(probe)?;

        let removed = if self.nodes[id].is_leaf() {
            let removed = self.nodes[id].entries.remove(index);
            self.rebalance(id);
            removed
        } else {
            // Swap in the in-order predecessor, the largest item of the left
            // subtree, which always sits at the end of a leaf.
            let leaf = self.nodes.rightmost_leaf(self.nodes[id].children[index]);
            let predecessor = self.nodes[leaf].entries.pop()?;
            let removed = std::mem::replace(&mut self.nodes[id].entries[index], predecessor);
            self.rebalance(leaf);
            removed
        };

        self.len -= 1;
        Some(removed.item)
    }

    /// Restores the minimum occupancy of `id` after it lost an item, by
    /// borrowing through the parent from a sibling, or else by merging with
    /// one. Merges take an item from the parent, so they may cascade upwards.
    /// Finishes by rehashing the path to the root.
    fn rebalance(&mut self, mut id: NodeId) {
        let min = self.order.min_contents();

        loop {
            let node = &self.nodes[id];

            let Some(parent) = node.parent else {
                if node.entries.is_empty() {
                    // the last item of a root leaf is gone
                    self.nodes.clear();
                    self.root = None;
                } else {
                    self.rehash(id);
                }
                return;
            };

            if node.entries.len() >= min {
                self.rehash_to_root(id);
                return;
            }

            let position = self.nodes.position_in_parent(parent, id);
            let siblings = &self.nodes[parent].children;
            let left = position.checked_sub(1).map(|slot| siblings[slot]);
            let right = siblings.get(position + 1).copied();

            if let Some(left) = left.filter(|&left| self.nodes[left].entries.len() > min) {
                self.rotate_right(parent, position - 1, left, id);
                return;
            }

            if let Some(right) = right.filter(|&right| self.nodes[right].entries.len() > min) {
                self.rotate_left(parent, position, id, right);
                return;
            }

            match (left, right) {
                (_, Some(right)) => self.merge(parent, position, id, right),
                (Some(left), None) => self.merge_into_right(parent, position - 1, left, id),
                (None, None) => unreachable!("non-root node {id} has no siblings"),
            }

            if self.root == Some(parent) && self.nodes[parent].entries.is_empty() {
                self.nodes.remove(parent);
                self.nodes[id].parent = None;
                self.root = Some(id);

                trace!(root = %id, height = self.height(), "collapsed the root");
                return;
            }

            id = parent;
        }
    }

    /// Moves the last item of `left` up into the parent and the parent's
    /// separator down in front of `node`.
    fn rotate_right(&mut self, parent: NodeId, separator: usize, left: NodeId, node: NodeId) {
        trace!(node = %node, sibling = %left, "borrowing from the left sibling");

        let sibling = &mut self.nodes[left];
        let Some(borrowed) = sibling.entries.pop() else {
            unreachable!("sibling {left} lends from an empty node");
        };
        let child = sibling.children.pop();

        let separator = std::mem::replace(&mut self.nodes[parent].entries[separator], borrowed);
        self.nodes[node].entries.insert(0, separator);

        if let Some(child) = child {
            self.nodes[node].children.insert(0, child);
            self.nodes.adopt(node, &[child]);
        }

        self.rehash(node);
        self.rehash(left);
        self.rehash_to_root(parent);
    }

    /// Moves the first item of `right` up into the parent and the parent's
    /// separator down at the end of `node`.
    fn rotate_left(&mut self, parent: NodeId, separator: usize, node: NodeId, right: NodeId) {
        trace!(node = %node, sibling = %right, "borrowing from the right sibling");

        let sibling = &mut self.nodes[right];
        let borrowed = sibling.entries.remove(0);
        let child = (!sibling.is_leaf()).then(|| sibling.children.remove(0));

        let separator = std::mem::replace(&mut self.nodes[parent].entries[separator], borrowed);
        self.nodes[node].entries.push(separator);

        if let Some(child) = child {
            self.nodes[node].children.push(child);
            self.nodes.adopt(node, &[child]);
        }

        self.rehash(node);
        self.rehash(right);
        self.rehash_to_root(parent);
    }

    /// Folds the separator at `separator` and all of `right` into the end of
    /// `node`, releasing `right`.
    fn merge(&mut self, parent: NodeId, separator: usize, node: NodeId, right: NodeId) {
        trace!(node = %node, sibling = %right, "merging with the right sibling");

        let parent_node = &mut self.nodes[parent];
        let separator = parent_node.entries.remove(separator);
        parent_node.children.retain(|&child| child != right);

        let sibling = self.nodes.remove(right);
        self.nodes.adopt(node, &sibling.children);

        let node_ref = &mut self.nodes[node];
        node_ref.entries.push(separator);
        node_ref.entries.extend(sibling.entries);
        node_ref.children.extend(sibling.children);

        self.rehash(node);
    }

    /// Folds all of `left` and the separator at `separator` into the front
    /// of `node`, releasing `left`.
    fn merge_into_right(&mut self, parent: NodeId, separator: usize, left: NodeId, node: NodeId) {
        trace!(node = %node, sibling = %left, "merging with the left sibling");

        let parent_node = &mut self.nodes[parent];
        let separator = parent_node.entries.remove(separator);
        parent_node.children.retain(|&child| child != left);

        let sibling = self.nodes.remove(left);
        self.nodes.adopt(node, &sibling.children);

        let node_ref = &mut self.nodes[node];
        let mut entries = sibling.entries;
        entries.push(separator);
        entries.append(&mut node_ref.entries);
        node_ref.entries = entries;

        let mut children = sibling.children;
        children.append(&mut node_ref.children);
        node_ref.children = children;

        self.rehash(node);
    }
}
