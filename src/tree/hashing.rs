use super::{Arena, MerkleBTree, NodeId, NodeRef};
use crate::prelude::*;

impl<T, D> MerkleBTree<T, D> {
    /// The cached digest of the root node; `None` for an empty tree.
    pub fn root_digest(&self) -> Option<Hash> {
        self.root.and_then(|id| self.nodes[id].hash)
    }

    /// Hex encoding of [`MerkleBTree::root_digest`], `""` for an empty tree.
    pub fn root_digest_hex(&self) -> String {
        self.root_digest()
            .map(|hash| hash.to_hex())
            .unwrap_or_default()
    }

    /// Nodes grouped by depth, root level first, each level left to right.
    pub fn levels(&self) -> Vec<Vec<NodeRef<'_, T>>> {
        let mut levels = Vec::new();
        let mut current = self.root().into_iter().collect::<Vec<_>>();

        while !current.is_empty() {
            let next = current
                .iter()
                .flat_map(|node| node.children())
                .collect::<Vec<_>>();
            levels.push(current);
            current = next;
        }

        levels
    }
}

impl<T, D: CombiningHash> MerkleBTree<T, D> {
    /// Recomputes the digest of `id` from its entries' digests and its
    /// children's cached digests. Children must already be current.
    pub(crate) fn rehash(&mut self, id: NodeId) {
        let node = &self.nodes[id];

        let contents = node.entries.iter().map(|entry| entry.digest.as_slice());
        let children = node.children.iter().map(|&child| {
            let hash = self.nodes[child].hash.as_ref();
            debug_assert!(hash.is_some(), "child {child} of {id} was never hashed");
            hash.map_or(&[][..], |hash| hash.as_ref())
        });

        let hash = Hash::combine::<D, _>(contents.chain(children));
        self.nodes[id].hash = Some(hash);
    }

    /// Rehashes `from` and then every ancestor up to the root.
    pub(crate) fn rehash_to_root(&mut self, from: NodeId) {
        let mut cursor = Some(from);

        while let Some(id) = cursor {
            self.rehash(id);
            cursor = self.nodes[id].parent;
        }
    }
}

impl<T: Content, D: CombiningHash> MerkleBTree<T, D> {
    /// Recomputes the root digest from scratch, level by level from the
    /// leaves up, deriving every content digest again from the items.
    ///
    /// Cached digests are neither read nor written, so this is an
    /// independent check of the incrementally maintained root digest.
    pub fn compute_root_digest(&self) -> Result<Option<Hash>> {
        let Some(root) = self.root else {
            return Ok(None);
        };

        let mut computed = vec![None; self.nodes.capacity()];

        for level in self.levels().iter().rev() {
            for node in level {
                let contents = node
                    .contents()
                    .map(Content::digest)
                    .collect::<Result<Vec<_>>>()?;
                let children = node
                    .children()
                    .map(|child| computed[Arena::<T>::slot(child.id())].unwrap_or_default())
                    .collect::<Vec<Hash>>();

                let hash = Hash::combine::<D, _>(
                    contents
                        .iter()
                        .map(Vec::as_slice)
                        .chain(children.iter().map(Hash::as_ref)),
                );
                computed[Arena::<T>::slot(node.id())] = Some(hash);
            }
        }

        Ok(computed[Arena::<T>::slot(root)])
    }

    /// Whether the cached root digest matches [`MerkleBTree::compute_root_digest`].
    pub fn verify(&self) -> Result<bool> {
        Ok(self.compute_root_digest()? == self.root_digest())
    }
}
