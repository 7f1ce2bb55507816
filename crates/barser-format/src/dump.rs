//! Node rendering rules.
//!
//! The dump is free to choose whitespace as long as parsing the output
//! reproduces the same tree; a second dump of the re-parsed output is
//! byte-identical to the first. Insertion order is preserved, quoted
//! flags are re-emitted, instances render compactly, and `inactive:`
//! prefixes appear on the top-most inactive node only.

use std::io::{self, Write};

use barser_tree::{flags, BsDict, NodeId, NodeKind};

use crate::writer::DumpWriter;

/// An instance-name prefix segment carried down to the rendered child.
#[derive(Clone)]
struct Seg {
    name: Vec<u8>,
    quoted: bool,
    inactive: bool,
}

/// Dump a whole dictionary.
pub fn dump<W: Write>(dict: &BsDict, sink: W) -> io::Result<()> {
    dump_node(dict, dict.root(), sink)
}

/// Dump the subtree rooted at `id` as a top-level document.
pub fn dump_node<W: Write>(dict: &BsDict, id: NodeId, sink: W) -> io::Result<()> {
    let mut w = DumpWriter::new(sink);
    render(dict, &mut w, id, 0, &[])
}

/// Dump a dictionary into a fresh byte vector.
pub fn dump_to_vec(dict: &BsDict) -> Vec<u8> {
    let mut out = Vec::new();
    dump(dict, &mut out).expect("writing to a Vec cannot fail");
    out
}

/// Dump a dictionary into a string.
///
/// # Panics
/// Panics if the dictionary holds names or values that are not valid
/// UTF-8; use [`dump_to_vec`] for raw byte content.
pub fn dump_to_string(dict: &BsDict) -> String {
    String::from_utf8(dump_to_vec(dict)).expect("dump of UTF-8 content is UTF-8")
}

fn render<W: Write>(
    dict: &BsDict,
    w: &mut DumpWriter<W>,
    id: NodeId,
    level: usize,
    prefix: &[Seg],
) -> io::Result<()> {
    let n = dict.node(id);
    match n.kind() {
        NodeKind::Root => {
            for c in dict.children(id) {
                render(dict, w, c, level, &[])?;
            }
            Ok(())
        }
        // an instance prints nothing itself; each child goes out prefixed
        // with the instance name
        NodeKind::Instance => {
            let mut p = prefix.to_vec();
            p.push(Seg {
                name: n.name().to_vec(),
                quoted: n.has_flag(flags::QUOTED_NAME),
                inactive: n.has_flag(flags::INACTIVE),
            });
            for c in dict.children(id) {
                render(dict, w, c, level, &p)?;
            }
            Ok(())
        }
        _ => {
            let in_array = n
                .parent()
                .map(|p| dict.node(p).kind() == NodeKind::Array)
                .unwrap_or(false);
            if in_array {
                render_array_member(dict, w, id, level)
            } else {
                render_statement(dict, w, id, level, prefix)
            }
        }
    }
}

/// Whether a value is worth emitting: quoted empties survive, unquoted
/// empties do not.
fn has_value(dict: &BsDict, id: NodeId) -> bool {
    let n = dict.node(id);
    match n.value() {
        Some(v) => !v.is_empty() || n.has_flag(flags::QUOTED_VALUE),
        None => false,
    }
}

/// One statement line or block for a named node outside arrays.
fn render_statement<W: Write>(
    dict: &BsDict,
    w: &mut DumpWriter<W>,
    id: NodeId,
    level: usize,
    prefix: &[Seg],
) -> io::Result<()> {
    let n = dict.node(id);
    w.indent(level)?;

    // the top-most inactive ancestor gets the modifier; descendants only
    // carry INACTIVE_CHILD and are not re-prefixed
    if n.has_flag(flags::INACTIVE) || prefix.iter().any(|s| s.inactive) {
        w.raw(b"inactive: ")?;
    }
    for seg in prefix {
        w.quoted(&seg.name, seg.quoted)?;
        w.byte(b' ')?;
    }

    // compact instance-child form: `car bob doors 3;` for a single-leaf
    // branch directly under one instance name
    if prefix.len() == 1 && n.kind() == NodeKind::Branch && n.child_count() == 1 {
        if let Some(only) = dict.children(id).next() {
            if dict.node(only).kind() == NodeKind::Leaf {
                let leaf = dict.node(only);
                w.quoted(n.name(), n.has_flag(flags::QUOTED_NAME))?;
                w.byte(b' ')?;
                w.quoted(leaf.name(), leaf.has_flag(flags::QUOTED_NAME))?;
                if has_value(dict, only) {
                    w.byte(b' ')?;
                    w.quoted(
                        leaf.value().unwrap_or_default(),
                        leaf.has_flag(flags::QUOTED_VALUE),
                    )?;
                }
                w.raw(b";\n")?;
                return Ok(());
            }
        }
    }

    match n.kind() {
        NodeKind::Leaf => {
            w.quoted(n.name(), n.has_flag(flags::QUOTED_NAME))?;
            if has_value(dict, id) {
                w.byte(b' ')?;
                w.quoted(n.value().unwrap_or_default(), n.has_flag(flags::QUOTED_VALUE))?;
            }
            w.raw(b";\n")
        }
        NodeKind::Branch => {
            w.quoted(n.name(), n.has_flag(flags::QUOTED_NAME))?;
            w.raw(b" {\n")?;
            for c in dict.children(id) {
                render(dict, w, c, level + 1, &[])?;
            }
            w.indent(level)?;
            w.raw(b"}\n")
        }
        NodeKind::Array => {
            w.quoted(n.name(), n.has_flag(flags::QUOTED_NAME))?;
            w.raw(b" [\n")?;
            for c in dict.children(id) {
                render(dict, w, c, level + 1, &[])?;
            }
            w.indent(level)?;
            w.raw(b"];\n")
        }
        // root and instance are handled by the caller
        _ => Ok(()),
    }
}

/// Array members are anonymous: leaves print their value alone, nested
/// blocks and arrays open without a name and close without a terminator.
fn render_array_member<W: Write>(
    dict: &BsDict,
    w: &mut DumpWriter<W>,
    id: NodeId,
    level: usize,
) -> io::Result<()> {
    let n = dict.node(id);
    w.indent(level)?;
    match n.kind() {
        NodeKind::Leaf => {
            w.quoted(n.value().unwrap_or_default(), n.has_flag(flags::QUOTED_VALUE))?;
            w.raw(b"\n")
        }
        NodeKind::Array => {
            w.raw(b"[\n")?;
            for c in dict.children(id) {
                render(dict, w, c, level + 1, &[])?;
            }
            w.indent(level)?;
            w.raw(b"]\n")
        }
        _ => {
            w.raw(b"{\n")?;
            for c in dict.children(id) {
                render(dict, w, c, level + 1, &[])?;
            }
            w.indent(level)?;
            w.raw(b"}\n")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &[u8]) -> BsDict {
        let mut dict = BsDict::new("test", 0);
        dict.parse(input).expect("parse should succeed");
        dict
    }

    #[test]
    fn test_leaf_forms() {
        let dict = parse(b"a b; bare;");
        assert_eq!(dump_to_string(&dict), "a b;\nbare;\n");
    }

    #[test]
    fn test_branch_block() {
        let dict = parse(b"outer { inner 1; }");
        assert_eq!(dump_to_string(&dict), "outer {\n    inner 1;\n}\n");
    }

    #[test]
    fn test_array_members_one_per_line() {
        let dict = parse(b"arr [ 1 2 3 ];");
        assert_eq!(dump_to_string(&dict), "arr [\n    1\n    2\n    3\n];\n");
    }

    #[test]
    fn test_quoted_value_escapes_reintroduced() {
        let dict = parse(b"s \"hel\\nlo\";");
        assert_eq!(dump_to_string(&dict), "s \"hel\\nlo\";\n");
    }

    #[test]
    fn test_instance_compact_form() {
        let dict = parse(b"car bob doors 3;");
        assert_eq!(dump_to_string(&dict), "car bob doors 3;\n");
    }

    #[test]
    fn test_instance_block_form() {
        let dict = parse(b"car bob { doors 3; wheels 4; }");
        assert_eq!(
            dump_to_string(&dict),
            "car bob {\n    doors 3;\n    wheels 4;\n}\n"
        );
    }

    #[test]
    fn test_inactive_prefix_on_topmost_only() {
        let dict = parse(b"inactive: box { side 5; }");
        assert_eq!(dump_to_string(&dict), "inactive: box {\n    side 5;\n}\n");
    }

    #[test]
    fn test_dump_node_subtree() {
        let dict = parse(b"wrap { x 1; }");
        let wrap = dict.get("wrap").unwrap();
        let mut out = Vec::new();
        dump_node(&dict, wrap, &mut out).unwrap();
        assert_eq!(out, b"wrap {\n    x 1;\n}\n");
    }

    #[test]
    fn test_empty_dict_dumps_nothing() {
        let dict = parse(b"");
        assert_eq!(dump_to_vec(&dict), b"");
    }
}
