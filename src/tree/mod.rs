mod cursor;
mod hashing;
mod insert;
mod node;
mod order;
mod remove;

use std::{fmt, marker::PhantomData};

use proptest::{collection::vec, prelude::*};
use tracing::debug;

use crate::prelude::*;

pub(crate) use node::{Arena, Entry, Node, NodeId};
pub use {
    cursor::{Cursor, Iter},
    node::NodeRef,
    order::{Order, MIN_ORDER},
};

/// An authenticated B-tree.
///
/// Every node carries a digest over its items' digests followed by its
/// children's digests:
///
/// - leaf: `H(d(c₁) ‖ … ‖ d(cₖ))`
/// - internal: `H(d(c₁) ‖ … ‖ d(cₖ) ‖ h(child₀) ‖ … ‖ h(childₖ))`
///
/// so the digest of the root commits to the whole ordered item set and to
/// the shape of the tree. Digests are maintained incrementally: every
/// mutation rehashes the touched nodes bottom-up, children strictly before
/// their parents, and returns only once the root digest is current again.
///
/// `H` is the type parameter `D`; content digests `d` come from
/// [`Content::digest`] and are computed once, when an item is stored.
///
/// The structure is single-threaded: wrap it in a lock to share it.
pub struct MerkleBTree<T, D = blake3::Hasher> {
    nodes: Arena<T>,
    root: Option<NodeId>,
    len: usize,
    order: Order,
    _digest: PhantomData<D>,
}

#[cfg(feature = "blake2")]
pub type Blake2sTree<T> = MerkleBTree<T, blake2::Blake2s256>;

#[cfg(feature = "sha2")]
pub type Sha256Tree<T> = MerkleBTree<T, sha2::Sha256>;

impl<T, D> MerkleBTree<T, D> {
    /// Creates an empty tree whose nodes have at most `order` children.
    pub fn new(order: usize) -> Result<Self> {
        Ok(Self::with_order(Order::new(order)?))
    }

    pub fn with_order(order: Order) -> Self {
        debug!(order = order.get(), "creating merkle b-tree");

        Self {
            nodes: Arena::default(),
            root: None,
            len: 0,
            order,
            _digest: PhantomData,
        }
    }

    pub fn order(&self) -> Order {
        self.order
    }

    /// Number of items stored.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of nodes currently allocated.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of node levels; 0 for an empty tree.
    pub fn height(&self) -> usize {
        let mut height = 0;
        let mut cursor = self.root;

        while let Some(id) = cursor {
            height += 1;
            cursor = self.nodes[id].children.first().copied();
        }

        height
    }

    pub fn clear(&mut self) {
        debug!(len = self.len, "clearing merkle b-tree");

        self.nodes.clear();
        self.root = None;
        self.len = 0;
    }

    pub fn root(&self) -> Option<NodeRef<'_, T>> {
        self.root.map(|id| NodeRef::new(&self.nodes, id))
    }

    /// The leaf holding the smallest item.
    pub fn leftmost(&self) -> Option<NodeRef<'_, T>> {
        self.root
            .map(|root| NodeRef::new(&self.nodes, self.nodes.leftmost_leaf(root)))
    }

    /// The leaf holding the largest item.
    pub fn rightmost(&self) -> Option<NodeRef<'_, T>> {
        self.root
            .map(|root| NodeRef::new(&self.nodes, self.nodes.rightmost_leaf(root)))
    }

    pub fn leftmost_item(&self) -> Option<&T> {
        self.leftmost().and_then(|node| node.first())
    }

    pub fn rightmost_item(&self) -> Option<&T> {
        self.rightmost().and_then(|node| node.last())
    }

    /// All items in ascending order.
    pub fn contents(&self) -> Vec<&T> {
        self.iter().collect()
    }
}

impl<T: Content, D: CombiningHash> MerkleBTree<T, D> {
    /// Builds a tree out of `items`, later duplicates replacing earlier ones.
    pub fn from_items<I>(order: usize, items: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
    {
        let mut tree = Self::new(order)?;
        for item in items {
            tree.put(item)?;
        }
        Ok(tree)
    }

    /// Looks up the stored item comparing equal to `probe`.
    pub fn get(&self, probe: &T) -> Option<&T> {
        self.locate(probe)
            .map(|(id, index)| &self.nodes[id].entries[index].item)
    }

    pub fn contains(&self, probe: &T) -> bool {
        self.locate(probe).is_some()
    }

    /// Descends from the root to the node holding `probe`.
    pub(crate) fn locate(&self, probe: &T) -> Option<(NodeId, usize)> {
        let mut id = self.root?;

        loop {
            let node = &self.nodes[id];
            match node.search(probe) {
                Ok(index) => return Some((id, index)),
                Err(_) if node.is_leaf() => return None,
                Err(index) => id = node.children[index],
            }
        }
    }
}

impl<T: Clone, D> Clone for MerkleBTree<T, D> {
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
            root: self.root,
            len: self.len,
            order: self.order,
            _digest: PhantomData,
        }
    }
}

impl<T, D> PartialEq for MerkleBTree<T, D> {
    fn eq(&self, other: &Self) -> bool {
        self.root_digest() == other.root_digest()
    }
}

impl<T, D> Eq for MerkleBTree<T, D> {}

impl<T: fmt::Debug, D> fmt::Debug for MerkleBTree<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MerkleBTree")
            .field("order", &self.order.get())
            .field("len", &self.len)
            .field("root", &self.root_digest())
            .field("contents", &self.contents())
            .finish()
    }
}

/// Renders the tree sideways: one item per line, indented by depth, in
/// ascending order.
impl<T: fmt::Debug, D> fmt::Display for MerkleBTree<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "MerkleBTree {}", self.root_digest_hex())?;

        match self.root() {
            Some(root) => write_outline(f, root, 0),
            None => Ok(()),
        }
    }
}

fn write_outline<T: fmt::Debug>(
    f: &mut fmt::Formatter<'_>,
    node: NodeRef<'_, T>,
    depth: usize,
) -> fmt::Result {
    let contents = node.contents().collect::<Vec<_>>();

    for slot in 0..=contents.len() {
        if let Some(child) = node.child(slot) {
            write_outline(f, child, depth + 1)?;
        }
        if let Some(item) = contents.get(slot) {
            writeln!(f, "{}{:?}", "    ".repeat(depth), item)?;
        }
    }

    Ok(())
}

impl<T, D> Arbitrary for MerkleBTree<T, D>
where
    T: Content + Arbitrary + fmt::Debug + 'static,
    D: CombiningHash + 'static,
{
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (MIN_ORDER..=8usize, vec(any::<T>(), 0..256))
            .prop_filter_map("content digest failed", |(order, items)| {
                Self::from_items(order, items).ok()
            })
            .boxed()
    }
}
