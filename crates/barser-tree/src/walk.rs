//! Tree traversal.
//!
//! Depth-first preorder walks with a per-node feedback value flowing from
//! parent to children and an early-termination signal. The walkers are the
//! foundation for dump, duplicate, filtering and index rebuilds.

use barser_parse::PATH_SEP;

use crate::dict::BsDict;
use crate::node::NodeId;
use crate::query::escape_segment;

impl BsDict {
    /// Walk the whole dictionary. See [`BsDict::node_walk`].
    pub fn walk<T, F>(&self, seed: T, callback: &mut F) -> Option<NodeId>
    where
        F: FnMut(&BsDict, NodeId, &T, &mut bool) -> T,
    {
        self.node_walk(self.root, seed, callback)
    }

    /// Walk the subtree rooted at `node` in preorder.
    ///
    /// The callback receives the feedback produced by its parent's
    /// invocation (`seed` for the start node) and returns the feedback for
    /// its children. Setting the stop signal ends the walk; the node that
    /// signaled is returned.
    pub fn node_walk<T, F>(&self, node: NodeId, seed: T, callback: &mut F) -> Option<NodeId>
    where
        F: FnMut(&BsDict, NodeId, &T, &mut bool) -> T,
    {
        self.walk_inner(node, &seed, callback)
    }

    fn walk_inner<T, F>(&self, node: NodeId, feedback: &T, callback: &mut F) -> Option<NodeId>
    where
        F: FnMut(&BsDict, NodeId, &T, &mut bool) -> T,
    {
        let mut stop = false;
        let child_feedback = callback(self, node, feedback, &mut stop);
        if stop {
            return Some(node);
        }
        let mut child = self.node(node).first_child;
        while let Some(c) = child {
            if let Some(hit) = self.walk_inner(c, &child_feedback, callback) {
                return Some(hit);
            }
            child = self.node(c).next;
        }
        None
    }

    /// Path-threaded walk: the callback receives each node's path from
    /// the root, escaped when `escape` is set. The path buffer is built
    /// incrementally, one extension per node.
    pub fn p_walk<F>(&self, escape: bool, callback: &mut F) -> Option<NodeId>
    where
        F: FnMut(&BsDict, NodeId, &[u8], &mut bool),
    {
        let mut path = Vec::new();
        self.p_walk_inner(self.root, escape, &mut path, callback)
    }

    fn p_walk_inner<F>(
        &self,
        node: NodeId,
        escape: bool,
        path: &mut Vec<u8>,
        callback: &mut F,
    ) -> Option<NodeId>
    where
        F: FnMut(&BsDict, NodeId, &[u8], &mut bool),
    {
        let mut stop = false;
        callback(self, node, path, &mut stop);
        if stop {
            return Some(node);
        }
        let mut child = self.node(node).first_child;
        while let Some(c) = child {
            let saved = path.len();
            if !path.is_empty() || self.node(node).parent.is_some() {
                path.push(PATH_SEP);
            }
            if escape {
                path.extend_from_slice(&escape_segment(self.node(c).name()));
            } else {
                path.extend_from_slice(self.node(c).name());
            }
            let hit = self.p_walk_inner(c, escape, path, callback);
            path.truncate(saved);
            if hit.is_some() {
                return hit;
            }
            child = self.node(c).next;
        }
        None
    }

    /// Collect the nodes the callback accepts, in document order. The
    /// whole tree is visited; acceptance does not cut the walk short.
    pub fn filter<F>(&self, callback: &mut F) -> Vec<NodeId>
    where
        F: FnMut(&BsDict, NodeId) -> bool,
    {
        let mut out = Vec::new();
        self.filter_inner(self.root, callback, &mut out);
        out
    }

    fn filter_inner<F>(&self, node: NodeId, callback: &mut F, out: &mut Vec<NodeId>)
    where
        F: FnMut(&BsDict, NodeId) -> bool,
    {
        if callback(self, node) {
            out.push(node);
        }
        let mut child = self.node(node).first_child;
        while let Some(c) = child {
            self.filter_inner(c, callback, out);
            child = self.node(c).next;
        }
    }

    /// Path-threaded filter: like [`BsDict::filter`] with each node's
    /// (optionally escaped) path passed to the callback.
    pub fn p_filter<F>(&self, escape: bool, callback: &mut F) -> Vec<NodeId>
    where
        F: FnMut(&BsDict, NodeId, &[u8]) -> bool,
    {
        let mut out = Vec::new();
        let mut cb = |dict: &BsDict, id: NodeId, path: &[u8], _stop: &mut bool| {
            if callback(dict, id, path) {
                out.push(id);
            }
        };
        self.p_walk(escape, &mut cb);
        out
    }

    /// Collect `node` and all its descendants in preorder.
    pub(crate) fn collect_subtree(&self, node: NodeId, out: &mut Vec<NodeId>) {
        out.push(node);
        let mut child = self.node(node).first_child;
        while let Some(c) = child {
            self.collect_subtree(c, out);
            child = self.node(c).next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeKind;

    fn sample() -> BsDict {
        let mut dict = BsDict::new("test", 0);
        let root = dict.root();
        let a = dict
            .create_node(root, NodeKind::Branch, Some(b"a"), None)
            .unwrap();
        dict.create_node(a, NodeKind::Leaf, Some(b"x"), Some(b"1"))
            .unwrap();
        dict.create_node(a, NodeKind::Leaf, Some(b"y"), Some(b"2"))
            .unwrap();
        dict.create_node(root, NodeKind::Leaf, Some(b"b"), None)
            .unwrap();
        dict
    }

    #[test]
    fn test_preorder_visit_order() {
        let dict = sample();
        let mut seen = Vec::new();
        dict.walk(0u32, &mut |d, id, _, _| {
            seen.push(d.node(id).name_str().into_owned());
            0
        });
        assert_eq!(seen, ["", "a", "x", "y", "b"]);
    }

    #[test]
    fn test_feedback_flows_to_children() {
        let dict = sample();
        // feedback carries the depth; verify child depth = parent depth + 1
        let mut depths = Vec::new();
        dict.walk(0usize, &mut |d, id, depth, _| {
            depths.push((d.node(id).name_str().into_owned(), *depth));
            depth + 1
        });
        assert_eq!(
            depths,
            [
                ("".to_string(), 0),
                ("a".to_string(), 1),
                ("x".to_string(), 2),
                ("y".to_string(), 2),
                ("b".to_string(), 1)
            ]
        );
    }

    #[test]
    fn test_stop_signal() {
        let dict = sample();
        let hit = dict.walk((), &mut |d, id, _, stop| {
            if d.node(id).name() == b"x" {
                *stop = true;
            }
        });
        let hit = hit.unwrap();
        assert_eq!(dict.node(hit).name(), b"x");
    }

    #[test]
    fn test_p_walk_paths() {
        let dict = sample();
        let mut paths = Vec::new();
        dict.p_walk(false, &mut |_, _, path, _| {
            paths.push(String::from_utf8_lossy(path).into_owned());
        });
        assert_eq!(paths, ["", "a", "a/x", "a/y", "b"]);
    }

    #[test]
    fn test_p_walk_escaped() {
        let mut dict = BsDict::new("test", 0);
        let root = dict.root();
        let odd = dict
            .create_node(root, NodeKind::Branch, Some(b"a/b"), None)
            .unwrap();
        dict.create_node(odd, NodeKind::Leaf, Some(b"c"), None)
            .unwrap();
        let mut paths = Vec::new();
        dict.p_walk(true, &mut |_, _, path, _| {
            paths.push(String::from_utf8_lossy(path).into_owned());
        });
        assert_eq!(paths, ["", "a\\/b", "a\\/b/c"]);
    }

    #[test]
    fn test_filter_order() {
        let dict = sample();
        let leaves = dict.filter(&mut |d, id| d.node(id).kind() == NodeKind::Leaf);
        let names: Vec<_> = leaves
            .iter()
            .map(|&id| dict.node(id).name_str().into_owned())
            .collect();
        assert_eq!(names, ["x", "y", "b"]);
    }

    #[test]
    fn test_p_filter() {
        let dict = sample();
        let hits = dict.p_filter(false, &mut |_, _, path| path.starts_with(b"a/"));
        let names: Vec<_> = hits
            .iter()
            .map(|&id| dict.node(id).name_str().into_owned())
            .collect();
        assert_eq!(names, ["x", "y"]);
    }
}
