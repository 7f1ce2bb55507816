//! The dictionary: an arena of nodes plus the node store operations.
//!
//! All mutation is routed through the dictionary so that the hash and
//! index invariants are re-established before anything can observe the
//! tree: renaming or moving a node rehashes and reindexes its whole
//! subtree, deleting removes every descendant from the index first, and
//! array children keep their ordinal names through deletes and moves.

use crate::hash::{mix, xxh32, ROOT_HASH};
use crate::index::PathIndex;
use crate::node::{flags, BsNode, NodeId, NodeKind};

/// A parsed, queryable, mutable dictionary of nodes.
pub struct BsDict {
    pub(crate) name: Vec<u8>,
    pub(crate) flags: u32,
    pub(crate) nodes: Vec<Option<BsNode>>,
    pub(crate) free: Vec<u32>,
    pub(crate) root: NodeId,
    pub(crate) index: Option<PathIndex>,
    pub(crate) node_count: usize,
}

/// Forward iterator over the children of a node.
pub struct Children<'a> {
    dict: &'a BsDict,
    cur: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.cur?;
        self.cur = self.dict.node(id).next;
        Some(id)
    }
}

impl BsDict {
    /// Do not maintain a path index; queries fall back to naive descent.
    pub const NOINDEX: u32 = 1 << 0;
    /// Refuse mutation. Populated read-only dictionaries come from
    /// [`BsDict::duplicate`].
    pub const READONLY: u32 = 1 << 1;

    /// Create a named dictionary with an empty root.
    pub fn new(name: impl AsRef<[u8]>, dict_flags: u32) -> Self {
        let mut root = BsNode::new(NodeKind::Root, Vec::new());
        root.hash = ROOT_HASH;
        BsDict {
            name: name.as_ref().to_vec(),
            flags: dict_flags,
            nodes: vec![Some(root)],
            free: Vec::new(),
            root: NodeId(0),
            index: if dict_flags & Self::NOINDEX == 0 {
                Some(PathIndex::default())
            } else {
                None
            },
            node_count: 1,
        }
    }

    /// Dictionary name.
    pub fn name(&self) -> &[u8] {
        &self.name
    }

    /// Dictionary flags.
    pub fn flags(&self) -> u32 {
        self.flags
    }

    /// Whether a path index is maintained.
    pub fn is_indexed(&self) -> bool {
        self.index.is_some()
    }

    /// Whether the dictionary refuses mutation.
    pub fn is_readonly(&self) -> bool {
        self.flags & Self::READONLY != 0
    }

    /// The root node handle.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Total number of live nodes, root included.
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Borrow a node. Handles are only valid for the dictionary that
    /// issued them and die with the node.
    #[inline]
    pub fn node(&self, id: NodeId) -> &BsNode {
        self.nodes[id.0 as usize]
            .as_ref()
            .expect("stale node handle")
    }

    #[inline]
    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut BsNode {
        self.nodes[id.0 as usize]
            .as_mut()
            .expect("stale node handle")
    }

    /// Iterate the children of `id` in insertion order.
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            dict: self,
            cur: self.node(id).first_child,
        }
    }

    /// The `n`-th child of `id`, counting from 0.
    pub fn nth_child(&self, id: NodeId, n: usize) -> Option<NodeId> {
        self.children(id).nth(n)
    }

    // ---- allocation ----------------------------------------------------

    fn alloc(&mut self, node: BsNode) -> NodeId {
        match self.free.pop() {
            Some(slot) => {
                self.nodes[slot as usize] = Some(node);
                NodeId(slot)
            }
            None => {
                self.nodes.push(Some(node));
                NodeId((self.nodes.len() - 1) as u32)
            }
        }
    }

    fn dealloc(&mut self, id: NodeId) {
        self.nodes[id.0 as usize] = None;
        self.free.push(id.0);
    }

    // ---- linked child list ---------------------------------------------

    fn link_last(&mut self, parent: NodeId, id: NodeId) {
        let old_last = self.node(parent).last_child;
        {
            let n = self.node_mut(id);
            n.parent = Some(parent);
            n.prev = old_last;
            n.next = None;
        }
        match old_last {
            Some(last) => self.node_mut(last).next = Some(id),
            None => self.node_mut(parent).first_child = Some(id),
        }
        let p = self.node_mut(parent);
        p.last_child = Some(id);
        p.child_count += 1;
    }

    fn unlink(&mut self, id: NodeId) {
        let (parent, prev, next) = {
            let n = self.node(id);
            (n.parent, n.prev, n.next)
        };
        let parent = match parent {
            Some(p) => p,
            None => return,
        };
        match prev {
            Some(p) => self.node_mut(p).next = next,
            None => self.node_mut(parent).first_child = next,
        }
        match next {
            Some(n) => self.node_mut(n).prev = prev,
            None => self.node_mut(parent).last_child = prev,
        }
        let p = self.node_mut(parent);
        p.child_count -= 1;
        let n = self.node_mut(id);
        n.parent = None;
        n.prev = None;
        n.next = None;
    }

    // ---- node creation -------------------------------------------------

    /// Internal node creation: no read-only gate, used by the parser and
    /// the public wrappers. A child of an array is named by its ordinal
    /// regardless of `name`.
    pub(crate) fn create_raw(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        name: Option<Vec<u8>>,
        value: Option<Vec<u8>>,
        extra_flags: u32,
    ) -> NodeId {
        let name = if self.node(parent).kind == NodeKind::Array {
            let mut buf = itoa::Buffer::new();
            buf.format(self.node(parent).child_count).as_bytes().to_vec()
        } else {
            name.unwrap_or_default()
        };

        let parent_hash = self.node(parent).hash;
        let parent_flags = self.node(parent).flags;

        let mut node = BsNode::new(kind, name);
        node.hash = mix(xxh32(&node.name), parent_hash, node.name.len());
        node.flags = extra_flags | flags::inherit(parent_flags);
        node.value = if kind == NodeKind::Array { None } else { value };

        let id = self.alloc(node);
        self.link_last(parent, id);
        self.node_count += 1;
        self.index_put(id);
        id
    }

    /// Create a node under `parent`.
    ///
    /// Refused (returning `None`) on read-only dictionaries and for the
    /// `Root` kind. Under an array parent the name is ignored in favor of
    /// the ordinal. Arrays never carry a value.
    pub fn create_node(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        name: Option<&[u8]>,
        value: Option<&[u8]>,
    ) -> Option<NodeId> {
        if self.is_readonly() || kind == NodeKind::Root {
            return None;
        }
        let id = self.create_raw(
            parent,
            kind,
            name.map(<[u8]>::to_vec),
            value.map(<[u8]>::to_vec),
            flags::MODIFIED,
        );
        Some(id)
    }

    // ---- deletion ------------------------------------------------------

    /// Delete a node and all its descendants. Deleting the root is
    /// refused; drop the dictionary instead.
    pub fn delete_node(&mut self, id: NodeId) -> bool {
        if self.is_readonly() || id == self.root {
            return false;
        }
        let parent = self.node(id).parent;
        self.delete_subtree(id);
        // keep array ordinals dense
        if let Some(p) = parent {
            if self.node(p).kind == NodeKind::Array {
                self.renumber_array(p);
            }
        }
        true
    }

    fn delete_subtree(&mut self, id: NodeId) {
        let mut child = self.node(id).first_child;
        while let Some(c) = child {
            let next = self.node(c).next;
            self.delete_subtree(c);
            child = next;
        }
        if self.node(id).has_flag(flags::INDEXED) {
            self.index_delete(id);
        }
        self.unlink(id);
        self.dealloc(id);
        self.node_count -= 1;
    }

    /// Re-establish ordinal names for every child of an array after a
    /// structural change.
    fn renumber_array(&mut self, array: NodeId) {
        let mut buf = itoa::Buffer::new();
        let children: Vec<NodeId> = self.children(array).collect();
        for (i, id) in children.into_iter().enumerate() {
            let want = buf.format(i).as_bytes().to_vec();
            if self.node(id).name != want {
                self.set_name_and_rehash(id, want);
            }
        }
    }

    // ---- rename / move / copy ------------------------------------------

    /// Update a node's name and re-establish the hash and index
    /// invariants for it and all its descendants.
    fn set_name_and_rehash(&mut self, id: NodeId, new_name: Vec<u8>) {
        let parent_hash = match self.node(id).parent {
            Some(p) => self.node(p).hash,
            None => return,
        };
        let new_hash = mix(xxh32(&new_name), parent_hash, new_name.len());
        let old_hash = self.node(id).hash;
        self.node_mut(id).name = new_name;
        if new_hash != old_hash {
            self.rehash_subtree(id);
        }
    }

    /// Recompute compound hashes for `id` and all descendants, keeping
    /// the path index in step.
    pub(crate) fn rehash_subtree(&mut self, id: NodeId) {
        if let Some(parent) = self.node(id).parent {
            let parent_hash = self.node(parent).hash;
            if self.node(id).has_flag(flags::INDEXED) {
                self.index_delete(id);
            }
            let name_len = self.node(id).name.len();
            let name_hash = xxh32(&self.node(id).name);
            self.node_mut(id).hash = mix(name_hash, parent_hash, name_len);
            self.index_put(id);
        }
        let mut child = self.node(id).first_child;
        while let Some(c) = child {
            let next = self.node(c).next;
            self.rehash_subtree(c);
            child = next;
        }
    }

    /// Rename a node.
    ///
    /// Renaming the root, an array member, or anything in a read-only
    /// dictionary is a no-op returning `None`.
    pub fn rename_node(&mut self, id: NodeId, new_name: &[u8]) -> Option<NodeId> {
        if self.is_readonly() {
            return None;
        }
        let parent = self.node(id).parent?;
        if self.node(parent).kind == NodeKind::Array {
            return None;
        }
        self.set_name_and_rehash(id, new_name.to_vec());
        self.node_mut(id).flags |= flags::MODIFIED;
        Some(id)
    }

    /// Whether `id` is `ancestor` or one of its descendants.
    pub(crate) fn in_subtree(&self, id: NodeId, ancestor: NodeId) -> bool {
        let mut cur = Some(id);
        while let Some(c) = cur {
            if c == ancestor {
                return true;
            }
            cur = self.node(c).parent;
        }
        false
    }

    /// Move a node under a new parent, optionally renaming it.
    ///
    /// Moving the root, moving a node into its own subtree, or mutating a
    /// read-only dictionary is a no-op returning `None`. A move within
    /// the same parent degenerates to a rename.
    pub fn move_node(
        &mut self,
        id: NodeId,
        new_parent: NodeId,
        new_name: Option<&[u8]>,
    ) -> Option<NodeId> {
        if self.is_readonly() || id == self.root {
            return None;
        }
        if self.in_subtree(new_parent, id) {
            return None;
        }
        let old_parent = self.node(id).parent?;

        if new_parent == old_parent {
            return match new_name {
                Some(n) => self.rename_node(id, n),
                None => Some(id),
            };
        }

        self.unlink(id);
        self.link_last(new_parent, id);

        if self.node(new_parent).kind == NodeKind::Array {
            // array members are named by ordinal, the given name is moot
            let ordinal = self.node(new_parent).child_count - 1;
            let mut buf = itoa::Buffer::new();
            self.node_mut(id).name = buf.format(ordinal).as_bytes().to_vec();
        } else if let Some(n) = new_name {
            self.node_mut(id).name = n.to_vec();
        }

        self.node_mut(id).flags |= flags::MODIFIED;
        self.rehash_subtree(id);

        if self.node(old_parent).kind == NodeKind::Array {
            self.renumber_array(old_parent);
        }
        Some(id)
    }

    /// Deep-copy a node under a new parent, optionally renaming the copy.
    ///
    /// Children are copied in order; self flags carry over while the
    /// inherited flags re-derive from the new ancestry. Copying the root
    /// or into the copied subtree is refused.
    pub fn copy_node(
        &mut self,
        id: NodeId,
        new_parent: NodeId,
        new_name: Option<&[u8]>,
    ) -> Option<NodeId> {
        if self.is_readonly() || id == self.root {
            return None;
        }
        if self.in_subtree(new_parent, id) {
            return None;
        }
        let copy = self.copy_level(id, new_parent, new_name.map(<[u8]>::to_vec));
        self.node_mut(copy).flags |= flags::MODIFIED;
        Some(copy)
    }

    fn copy_level(&mut self, src: NodeId, dest_parent: NodeId, name: Option<Vec<u8>>) -> NodeId {
        let (kind, src_name, value, keep) = {
            let n = self.node(src);
            (
                n.kind,
                n.name.clone(),
                n.value.clone(),
                n.flags & (flags::SELF_MASK | flags::INHERITABLE_MASK) & !flags::INDEXED,
            )
        };
        let copy = self.create_raw(
            dest_parent,
            kind,
            Some(name.unwrap_or(src_name)),
            value,
            keep,
        );
        let mut child = self.node(src).first_child;
        while let Some(c) = child {
            let next = self.node(c).next;
            self.copy_level(c, copy, None);
            child = next;
        }
        copy
    }

    /// Duplicate the whole dictionary under a new name and flag set.
    pub fn duplicate(&self, new_name: impl AsRef<[u8]>, new_flags: u32) -> BsDict {
        let mut dest = BsDict::new(new_name, new_flags);
        let dest_root = dest.root;
        Self::copy_between(self, self.root, &mut dest, dest_root);
        dest
    }

    fn copy_between(src_dict: &BsDict, src: NodeId, dest_dict: &mut BsDict, dest: NodeId) {
        // carry root-level flags over, then mirror children
        let keep = src_dict.node(src).flags
            & (flags::SELF_MASK | flags::INHERITABLE_MASK)
            & !flags::INDEXED;
        dest_dict.node_mut(dest).flags |= keep;
        let mut child = src_dict.node(src).first_child;
        while let Some(c) = child {
            let n = src_dict.node(c);
            let copy = dest_dict.create_raw(
                dest,
                n.kind,
                Some(n.name.clone()),
                n.value.clone(),
                n.flags & (flags::SELF_MASK | flags::INHERITABLE_MASK) & !flags::INDEXED,
            );
            Self::copy_between(src_dict, c, dest_dict, copy);
            child = src_dict.node(c).next;
        }
    }

    // ---- child lookup --------------------------------------------------

    /// Find the first child of `parent` named `name`, via the path index
    /// when available, else by a two-ended scan of the child list.
    pub fn get_child(&self, parent: NodeId, name: &[u8]) -> Option<NodeId> {
        if name.is_empty() {
            return None;
        }
        let child_hash = mix(xxh32(name), self.node(parent).hash, name.len());

        if self.index.is_some() {
            let mut cur = self.index_get(child_hash);
            while let Some(id) = cur {
                let n = self.node(id);
                if n.parent == Some(parent) && n.name.len() == name.len() && n.name == name {
                    return Some(id);
                }
                cur = n.index_next;
            }
            return None;
        }

        // unindexed: scan from both ends alternately, hash first
        let matches = |id: NodeId| {
            let n = self.node(id);
            n.hash == child_hash && n.name == name
        };
        let mut front = self.node(parent).first_child;
        let mut back = self.node(parent).last_child;
        while let (Some(f), Some(b)) = (front, back) {
            if matches(f) {
                return Some(f);
            }
            if f == b {
                break;
            }
            if matches(b) {
                return Some(b);
            }
            let nf = self.node(f).next;
            if nf == Some(b) {
                break;
            }
            front = nf;
            back = self.node(b).prev;
        }
        None
    }

    /// All children of `parent` named `name`, in insertion order.
    pub fn get_children(&self, parent: NodeId, name: &[u8]) -> Vec<NodeId> {
        if name.is_empty() {
            return Vec::new();
        }
        let child_hash = mix(xxh32(name), self.node(parent).hash, name.len());
        self.children(parent)
            .filter(|&id| {
                let n = self.node(id);
                n.hash == child_hash && n.name == name
            })
            .collect()
    }
}
