use std::{
    fmt,
    ops::{Index, IndexMut},
};

use crate::prelude::*;

/// Stable handle to a node slot inside an [`Arena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct NodeId(usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A stored item together with its digest, computed once when the item
/// entered the tree.
#[derive(Debug, Clone)]
pub(crate) struct Entry<T> {
    pub(crate) item: T,
    pub(crate) digest: Vec<u8>,
}

impl<T: Content> Entry<T> {
    pub(crate) fn new(item: T) -> Result<Self> {
        let digest = item.digest()?;
        Ok(Self { item, digest })
    }
}

/// A single node: up to `m - 1` entries in ascending order and, unless it is
/// a leaf, exactly one more child than entries.
#[derive(Debug, Clone)]
pub(crate) struct Node<T> {
    pub(crate) parent: Option<NodeId>,
    pub(crate) entries: Vec<Entry<T>>,
    pub(crate) children: Vec<NodeId>,

    /// Digest of the entries followed by the children's digests. `None` only
    /// between allocation and the first hashing of the node.
    pub(crate) hash: Option<Hash>,
}

impl<T> Node<T> {
    pub(crate) fn new(
        parent: Option<NodeId>,
        entries: Vec<Entry<T>>,
        children: Vec<NodeId>,
    ) -> Self {
        Self {
            parent,
            entries,
            children,
            hash: None,
        }
    }

    pub(crate) fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub(crate) fn last_child(&self) -> Option<NodeId> {
        self.children.last().copied()
    }
}

impl<T: Content> Node<T> {
    /// Binary search among this node's entries only: `Ok(index)` when found,
    /// `Err(index)` with the child slot to descend into otherwise.
    pub(crate) fn search(&self, item: &T) -> Result<usize, usize> {
        self.entries
            .binary_search_by(|entry| entry.item.compare(item))
    }
}

/// Owner of every node of a tree. Parent and child links are indices into
/// the arena, so the cyclic parent/child graph never needs shared ownership.
/// Freed slots are recycled by later allocations.
#[derive(Debug, Clone)]
pub(crate) struct Arena<T> {
    slots: Vec<Option<Node<T>>>,
    vacant: Vec<NodeId>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            vacant: Vec::new(),
        }
    }
}

impl<T> Arena<T> {
    pub(crate) fn insert(&mut self, node: Node<T>) -> NodeId {
        match self.vacant.pop() {
            Some(id) => {
                self.slots[id.0] = Some(node);
                id
            }
            None => {
                self.slots.push(Some(node));
                NodeId(self.slots.len() - 1)
            }
        }
    }

    pub(crate) fn remove(&mut self, id: NodeId) -> Node<T> {
        match self.slots.get_mut(id.0).and_then(Option::take) {
            Some(node) => {
                self.vacant.push(id);
                node
            }
            None => panic!("node {id} is not allocated"),
        }
    }

    /// Number of live nodes.
    pub(crate) fn len(&self) -> usize {
        self.slots.len() - self.vacant.len()
    }

    /// Upper bound (exclusive) of the slot indices handed out so far.
    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn slot(id: NodeId) -> usize {
        id.0
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.vacant.clear();
    }

    /// Points every node in `children` at `parent`.
    pub(crate) fn adopt(&mut self, parent: NodeId, children: &[NodeId]) {
        for &child in children {
            self[child].parent = Some(parent);
        }
    }

    /// The leaf reached by always following the first child.
    pub(crate) fn leftmost_leaf(&self, from: NodeId) -> NodeId {
        let mut id = from;
        while let Some(&child) = self[id].children.first() {
            id = child;
        }
        id
    }

    /// The leaf reached by always following the last child.
    pub(crate) fn rightmost_leaf(&self, from: NodeId) -> NodeId {
        let mut id = from;
        while let Some(child) = self[id].last_child() {
            id = child;
        }
        id
    }

    /// Slot of `child` within the child list of its parent.
    pub(crate) fn position_in_parent(&self, parent: NodeId, child: NodeId) -> usize {
        match self[parent].children.iter().position(|&id| id == child) {
            Some(position) => position,
            None => unreachable!("node {child} is not a child of {parent}"),
        }
    }
}

impl<T> Index<NodeId> for Arena<T> {
    type Output = Node<T>;

    fn index(&self, id: NodeId) -> &Self::Output {
        match self.slots.get(id.0) {
            Some(Some(node)) => node,
            _ => panic!("node {id} is not allocated"),
        }
    }
}

impl<T> IndexMut<NodeId> for Arena<T> {
    fn index_mut(&mut self, id: NodeId) -> &mut Self::Output {
        match self.slots.get_mut(id.0) {
            Some(Some(node)) => node,
            _ => panic!("node {id} is not allocated"),
        }
    }
}

/// Read-only view of a node of a [`MerkleBTree`].
pub struct NodeRef<'a, T> {
    arena: &'a Arena<T>,
    id: NodeId,
}

impl<T> Clone for NodeRef<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for NodeRef<'_, T> {}

impl<'a, T> NodeRef<'a, T> {
    pub(crate) fn new(arena: &'a Arena<T>, id: NodeId) -> Self {
        Self { arena, id }
    }

    pub(crate) fn id(&self) -> NodeId {
        self.id
    }

    fn node(&self) -> &'a Node<T> {
        &self.arena[self.id]
    }

    /// Items held by this node, in ascending order.
    pub fn contents(&self) -> impl ExactSizeIterator<Item = &'a T> + 'a {
        self.node().entries.iter().map(|entry| &entry.item)
    }

    /// The cached digest of each item, aligned with [`NodeRef::contents`].
    pub fn content_digests(&self) -> impl ExactSizeIterator<Item = &'a [u8]> + 'a {
        self.node().entries.iter().map(|entry| entry.digest.as_slice())
    }

    pub fn children(&self) -> impl ExactSizeIterator<Item = NodeRef<'a, T>> + 'a {
        let arena = self.arena;
        self.node()
            .children
            .iter()
            .map(move |&id| NodeRef::new(arena, id))
    }

    pub fn child(&self, index: usize) -> Option<NodeRef<'a, T>> {
        self.node()
            .children
            .get(index)
            .map(|&id| NodeRef::new(self.arena, id))
    }

    pub fn parent(&self) -> Option<NodeRef<'a, T>> {
        self.node().parent.map(|id| NodeRef::new(self.arena, id))
    }

    pub fn hash(&self) -> Option<Hash> {
        self.node().hash
    }

    pub fn is_leaf(&self) -> bool {
        self.node().is_leaf()
    }

    pub fn is_root(&self) -> bool {
        self.node().parent.is_none()
    }

    /// Number of items in this node.
    pub fn len(&self) -> usize {
        self.node().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node().entries.is_empty()
    }

    pub fn first(&self) -> Option<&'a T> {
        self.node().entries.first().map(|entry| &entry.item)
    }

    pub fn last(&self) -> Option<&'a T> {
        self.node().entries.last().map(|entry| &entry.item)
    }
}

impl<T> PartialEq for NodeRef<'_, T> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.arena, other.arena) && self.id == other.id
    }
}

impl<T> Eq for NodeRef<'_, T> {}

impl<T: fmt::Debug> fmt::Debug for NodeRef<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id)
            .field("contents", &self.contents().collect::<Vec<_>>())
            .field("children", &self.node().children.len())
            .field("hash", &self.hash())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Pair = Item<u32, ()>;

    fn leaf(keys: &[u32]) -> Node<Pair> {
        let entries = keys
            .iter()
            .map(|&key| Entry::new(Pair::probe(key)).unwrap())
            .collect();
        Node::new(None, entries, Vec::new())
    }

    #[test]
    fn test_search_within_node() {
        assert_eq!(leaf(&[]).search(&Pair::probe(0)), Err(0));

        let node = leaf(&[2, 4, 6]);
        let expected = [
            (0, Err(0)),
            (1, Err(0)),
            (2, Ok(0)),
            (3, Err(1)),
            (4, Ok(1)),
            (5, Err(2)),
            (6, Ok(2)),
            (7, Err(3)),
        ];

        for (key, position) in expected {
            assert_eq!(node.search(&Pair::probe(key)), position, "key {key}");
        }
    }

    #[test]
    fn test_arena_recycles_slots() {
        let mut arena = Arena::default();
        let a = arena.insert(leaf(&[1]));
        let b = arena.insert(leaf(&[2]));
        assert_eq!(arena.len(), 2);

        let removed = arena.remove(a);
        assert_eq!(removed.entries[0].item.key, 1);
        assert_eq!(arena.len(), 1);

        let c = arena.insert(leaf(&[3]));
        assert_eq!(c, a);
        assert_ne!(c, b);
        assert_eq!(arena.capacity(), 2);
        assert_eq!(arena[c].entries[0].item.key, 3);
    }

    #[test]
    #[should_panic(expected = "is not allocated")]
    fn test_dangling_index_panics() {
        let mut arena = Arena::default();
        let a = arena.insert(leaf(&[1]));
        arena.remove(a);
        let _ = &arena[a];
    }

    #[test]
    fn test_adopt_rewrites_parents() {
        let mut arena = Arena::default();
        let a = arena.insert(leaf(&[1]));
        let b = arena.insert(leaf(&[3]));
        let parent = arena.insert(leaf(&[2]));

        arena.adopt(parent, &[a, b]);

        assert_eq!(arena[a].parent, Some(parent));
        assert_eq!(arena[b].parent, Some(parent));
        assert_eq!(arena[parent].parent, None);
    }

    #[test]
    fn test_descend_to_extreme_leaves() {
        let mut arena = Arena::default();
        let a = arena.insert(leaf(&[1]));
        let b = arena.insert(leaf(&[3]));
        let c = arena.insert(leaf(&[5]));
        let root = arena.insert(leaf(&[2, 4]));
        arena[root].children = vec![a, b, c];
        arena.adopt(root, &[a, b, c]);

        assert_eq!(arena.leftmost_leaf(root), a);
        assert_eq!(arena.rightmost_leaf(root), c);
        assert_eq!(arena.leftmost_leaf(b), b);
        assert_eq!(arena.position_in_parent(root, b), 1);
        assert_eq!(arena.position_in_parent(root, c), 2);
    }
}
