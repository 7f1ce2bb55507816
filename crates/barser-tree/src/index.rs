//! Path index: compound hash -> collision chain of nodes.
//!
//! The backing store is a plain hash map from the 32-bit compound path
//! hash to the head of a chain of nodes sharing that hash. Chains are
//! threaded through the nodes themselves (`index_next`), append at the
//! tail, and therefore preserve insertion order modulo deletes.

use rustc_hash::FxHashMap;

use crate::dict::BsDict;
use crate::node::{flags, NodeId};

/// Hash-to-chain map backing the dictionary index.
#[derive(Debug, Default)]
pub(crate) struct PathIndex {
    buckets: FxHashMap<u32, NodeId>,
}

impl BsDict {
    /// Head of the collision chain for `hash`, if any.
    pub fn index_get(&self, hash: u32) -> Option<NodeId> {
        self.index.as_ref()?.buckets.get(&hash).copied()
    }

    /// Insert a node into the index, appending to its hash chain.
    /// No-op on unindexed dictionaries.
    pub(crate) fn index_put(&mut self, id: NodeId) {
        if self.index.is_none() {
            return;
        }
        let hash = self.node(id).hash;
        {
            let n = self.node_mut(id);
            n.index_next = None;
            n.flags |= flags::INDEXED;
        }
        let head = self
            .index
            .as_ref()
            .and_then(|ix| ix.buckets.get(&hash).copied());
        match head {
            None => {
                if let Some(ix) = self.index.as_mut() {
                    ix.buckets.insert(hash, id);
                }
            }
            Some(mut tail) => {
                while let Some(next) = self.node(tail).index_next {
                    tail = next;
                }
                self.node_mut(tail).index_next = Some(id);
            }
        }
    }

    /// Unlink a node from its hash chain. No-op on unindexed
    /// dictionaries or for nodes that are not in the index.
    pub(crate) fn index_delete(&mut self, id: NodeId) {
        if self.index.is_none() {
            return;
        }
        let hash = self.node(id).hash;
        let head = self
            .index
            .as_ref()
            .and_then(|ix| ix.buckets.get(&hash).copied());
        let Some(head) = head else {
            return;
        };

        if head == id {
            let next = self.node(id).index_next;
            if let Some(ix) = self.index.as_mut() {
                match next {
                    Some(n) => {
                        ix.buckets.insert(hash, n);
                    }
                    None => {
                        ix.buckets.remove(&hash);
                    }
                }
            }
        } else {
            let mut cur = head;
            loop {
                let next = self.node(cur).index_next;
                match next {
                    Some(n) if n == id => {
                        self.node_mut(cur).index_next = self.node(id).index_next;
                        break;
                    }
                    Some(n) => cur = n,
                    None => return, // not chained under this hash
                }
            }
        }

        let n = self.node_mut(id);
        n.index_next = None;
        n.flags &= !flags::INDEXED;
    }

    /// Build the path index for a previously unindexed dictionary,
    /// inserting every node that is not yet indexed. The root itself is
    /// never indexed.
    pub fn index(&mut self) {
        if self.index.is_none() {
            self.index = Some(PathIndex::default());
            self.flags &= !Self::NOINDEX;
        }
        let mut ids = Vec::with_capacity(self.node_count);
        self.collect_subtree(self.root, &mut ids);
        for id in ids {
            if id != self.root && !self.node(id).has_flag(flags::INDEXED) {
                self.index_put(id);
            }
        }
    }

    /// Rebuild index membership for every node after structural changes:
    /// a full walk deleting and re-inserting each node.
    pub fn reindex(&mut self) {
        if self.index.is_none() {
            self.index();
            return;
        }
        let mut ids = Vec::with_capacity(self.node_count);
        self.collect_subtree(self.root, &mut ids);
        for id in ids {
            if id != self.root {
                self.index_delete(id);
                self.index_put(id);
            }
        }
    }
}
