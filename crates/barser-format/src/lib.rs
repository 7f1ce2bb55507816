//! Dump / pretty-printer for barser dictionaries.
//!
//! The contract is a fixed point: parsing a dump reproduces the same tree
//! (structure, names, values, flags, insertion order), and dumping that
//! tree again yields byte-identical output.

mod dump;
mod writer;

pub use dump::{dump, dump_node, dump_to_string, dump_to_vec};
pub use writer::{DumpWriter, INDENT_WIDTH};
