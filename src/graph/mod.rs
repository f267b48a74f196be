//! The automaton: nodes, builder/minimizer, core operations, and the
//! cursor abstraction shared with the memory-mapped reader.
//!
//! Traversal is expressed against [`GraphNode`], a cheap cloneable
//! cursor. The live [`Dawg`](crate::Dawg) hands out arena-backed
//! cursors; the [`MappedDawg`](crate::MappedDawg) hands out byte-offset
//! cursors over its mapping. Everything built on the trait (prefix
//! enumeration, wildcard matching, bounded edit distance) therefore
//! works identically on both.

pub mod builder;
pub mod dawg;
pub mod iter;
pub mod node;
pub mod value;

pub use dawg::{Dawg, NodeRef, Stats};
pub use iter::KeyIter;
pub use value::{Candidate, Entry, Value};

/// A read-only cursor over one automaton state.
///
/// Cursors speak characters, not raw units: implementations translate
/// through their alphabet (live graph) or character map (mapped reader),
/// so callers never see the encoding. Edge enumeration is strictly
/// ascending by unit code, which fixes the output order of every
/// enumeration built on top.
pub trait GraphNode: Clone {
    /// A traversal-stable identity for memoization (arena slot or byte
    /// offset). Only meaningful within one graph.
    fn node_key(&self) -> u64;

    /// Whether the key leading here is accepted.
    fn is_terminal(&self) -> bool;

    /// Dense value-table index, when this terminal carries a value.
    fn value_index(&self) -> Option<u32>;

    /// Follow the edge for `ch`, or miss.
    fn transition(&self, ch: char) -> Option<Self>;

    /// All outgoing edges in ascending unit order, decoded.
    fn edges(&self) -> Box<dyn Iterator<Item = (char, Self)> + '_>;

    /// Number of outgoing edges.
    fn edge_count(&self) -> usize;

    /// Walk a whole key from this state.
    fn walk(&self, key: &str) -> Option<Self> {
        let mut node = self.clone();
        for ch in key.chars() {
            node = node.transition(ch)?;
        }
        Some(node)
    }
}
