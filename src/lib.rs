//! # wordgraph
//!
//! Minimal acyclic word graphs (DAWGs) for dictionary workloads: build a
//! key set once, minimize it, query it many times, and ship it as an
//! immutable container file that any number of processes can traverse
//! straight out of a memory mapping.
//!
//! The alphabet representation adapts automatically: pure-ASCII sets use
//! single-byte units, small Unicode sets (≤ 89 distinct code points) are
//! compressed into single bytes through a character map, and anything
//! larger falls back to 32-bit units, with identical query semantics in
//! every mode.
//!
//! ## Example
//!
//! ```rust
//! use wordgraph::{Dawg, Value};
//!
//! let mut dawg = Dawg::new();
//! dawg.add_with_value("apple", Value::Int(1));
//! dawg.add("apply");
//! dawg.minimize().unwrap();
//!
//! assert!(dawg.contains("apple"));
//! let found: Vec<String> = dawg.find_prefixes("app").collect();
//! assert_eq!(found, vec!["apple", "apply"]);
//!
//! for candidate in dawg.fuzzy("aple", 1) {
//!     println!("{} (distance {})", candidate.term, candidate.distance);
//! }
//! ```
//!
//! Persist with [`Dawg::save_binary`] and reopen with
//! [`MappedDawg::open`] for zero-deserialization reads, or exchange the
//! logical content as JSON via [`Dawg::save_text`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod alphabet;
pub mod container;
pub mod distance;
pub mod error;
pub mod graph;
pub mod search;

pub use alphabet::{Alphabet, EncodingChoice, EncodingMode};
pub use container::reader::{MappedDawg, MappedNode};
pub use error::DawgError;
pub use graph::{Candidate, Dawg, Entry, GraphNode, KeyIter, NodeRef, Stats, Value};

/// Common imports for convenient usage.
pub mod prelude {
    pub use crate::alphabet::{EncodingChoice, EncodingMode};
    pub use crate::container::reader::MappedDawg;
    pub use crate::error::DawgError;
    pub use crate::graph::{Candidate, Dawg, Entry, GraphNode, Stats, Value};
}
