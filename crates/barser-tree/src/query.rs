//! Path queries.
//!
//! Queries are `/`-separated byte strings with `\\` and `\/` escapes. An
//! indexed dictionary resolves a query by computing the compound path hash
//! segment by segment, probing the index, and byte-verifying each
//! candidate's reconstructed path against the cleaned query — the
//! verification must agree bit-for-bit with the path the tree itself
//! produces for the node. Unindexed dictionaries descend naively instead.

use barser_parse::chartable::{self as ct, has_class};
use barser_parse::escape::unescape_byte;
use barser_parse::PATH_SEP;

use crate::dict::BsDict;
use crate::hash::{mix, xxh32};
use crate::node::NodeId;

/// Next `/`-separated segment of `query` starting at `*pos`, unescaped.
/// Leading separators and stray non-token bytes are skipped.
pub(crate) fn next_segment(query: &[u8], pos: &mut usize) -> Option<Vec<u8>> {
    let mut i = *pos;
    while i < query.len() {
        let c = query[i];
        if c == PATH_SEP || !has_class(c, ct::TOK | ct::EXT) {
            i += 1;
        } else {
            break;
        }
    }
    if i >= query.len() {
        *pos = i;
        return None;
    }

    let mut out = Vec::new();
    while i < query.len() {
        let mut c = query[i];
        if c == PATH_SEP {
            i += 1;
            break;
        }
        if c == ct::ESCAPE_CHAR {
            if i + 1 >= query.len() {
                i += 1;
                break;
            }
            i += 1;
            let e = query[i];
            c = if e == PATH_SEP { PATH_SEP } else { unescape_byte(e) };
        }
        out.push(c);
        i += 1;
    }
    *pos = i;
    Some(out)
}

/// Split a query into unescaped segments.
pub(crate) fn segments(query: &[u8]) -> Vec<Vec<u8>> {
    let mut out = Vec::new();
    let mut pos = 0;
    while let Some(seg) = next_segment(query, &mut pos) {
        if !seg.is_empty() {
            out.push(seg);
        }
    }
    out
}

/// Normalize a query the way [`BsDict::get_path`] renders paths:
/// separators collapsed, escapes expanded, trimmed on both ends.
pub(crate) fn clean_query(query: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    for seg in segments(query) {
        if !out.is_empty() {
            out.push(PATH_SEP);
        }
        out.extend_from_slice(&seg);
    }
    out
}

/// Escape `\` and `/` inside a path segment.
pub(crate) fn escape_segment(name: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(name.len());
    for &b in name {
        if b == PATH_SEP || b == ct::ESCAPE_CHAR {
            out.push(ct::ESCAPE_CHAR);
        }
        out.push(b);
    }
    out
}

impl BsDict {
    /// Compound path hash of `query` relative to `node`: the node's own
    /// hash with each segment's name hash mixed in, top-down.
    pub fn path_hash(&self, node: NodeId, query: &[u8]) -> u32 {
        let mut hash = self.node(node).hash;
        let mut pos = 0;
        while let Some(seg) = next_segment(query, &mut pos) {
            hash = mix(xxh32(&seg), hash, seg.len());
        }
        hash
    }

    /// Resolve a path query against the whole dictionary.
    pub fn get(&self, query: impl AsRef<[u8]>) -> Option<NodeId> {
        self.get_from_node(self.root, query)
    }

    /// Resolve a path query relative to `node`.
    pub fn get_from_node(&self, node: NodeId, query: impl AsRef<[u8]>) -> Option<NodeId> {
        let query = query.as_ref();
        let segs = segments(query);
        if segs.is_empty() {
            return Some(node);
        }

        if self.is_indexed() {
            // absolute cleaned path: the reference node's path plus the query
            let mut want = self.get_path(node);
            for seg in &segs {
                if !want.is_empty() {
                    want.push(PATH_SEP);
                }
                want.extend_from_slice(seg);
            }
            let hash = self.path_hash(node, query);
            let mut cur = self.index_get(hash);
            while let Some(id) = cur {
                if self.get_path(id) == want {
                    return Some(id);
                }
                cur = self.node(id).index_next;
            }
            None
        } else {
            let mut cur = node;
            for seg in &segs {
                cur = self.get_child(cur, seg)?;
            }
            Some(cur)
        }
    }

    /// The `/`-separated path of a node from the root, unescaped. The
    /// root's path is empty; paths carry no leading separator.
    pub fn get_path(&self, id: NodeId) -> Vec<u8> {
        let mut segs: Vec<&[u8]> = Vec::new();
        let mut cur = id;
        while let Some(parent) = self.node(cur).parent {
            segs.push(self.node(cur).name());
            cur = parent;
        }
        let mut out = Vec::new();
        for seg in segs.iter().rev() {
            if !out.is_empty() {
                out.push(PATH_SEP);
            }
            out.extend_from_slice(seg);
        }
        out
    }

    /// The path of a node with `\` and `/` escaped inside each segment,
    /// suitable for feeding back into [`BsDict::get`].
    pub fn get_escaped_path(&self, id: NodeId) -> Vec<u8> {
        let mut segs: Vec<Vec<u8>> = Vec::new();
        let mut cur = id;
        while let Some(parent) = self.node(cur).parent {
            segs.push(escape_segment(self.node(cur).name()));
            cur = parent;
        }
        let mut out = Vec::new();
        for seg in segs.iter().rev() {
            if !out.is_empty() {
                out.push(PATH_SEP);
            }
            out.extend_from_slice(seg);
        }
        out
    }
}
