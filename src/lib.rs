//! # libmafsa
//!
//! Minimal acyclic finite-state automata with minimal perfect hashing.
//!
//! This library builds the minimal acyclic DFA for a set of strings inserted
//! in lexicographic order, using the incremental algorithm described in:
//!
//! > Daciuk, Jan, Stoyan Mihov, Bruce W. Watson, and Richard E. Watson.
//! > "Incremental construction of minimal acyclic finite-state automata."
//! > Computational Linguistics 26.1 (2000): 3-16.
//!
//! Every node additionally stores the number of accepted suffixes below it,
//! which turns a walk through the automaton into a dense 0-based index over
//! the accepted set: a minimal perfect hash that needs no external table.
//! The finished automaton serializes to a compact, self-describing byte
//! stream and decodes into an immutable graph that is safe to share across
//! threads.
//!
//! ## Example
//!
//! ```rust
//! use libmafsa::prelude::*;
//!
//! let mut builder = Builder::new();
//! for term in ["cities", "city", "pities", "pity"] {
//!     builder.insert(term)?;
//! }
//! builder.finish();
//!
//! let bytes = builder.encode()?;
//! let graph = decode(&bytes)?;
//!
//! assert!(graph.contains("city"));
//! assert_eq!(graph.index_of("pity"), Some(3));
//! assert_eq!(graph.terms().collect::<Vec<_>>(),
//!            vec!["cities", "city", "pities", "pity"]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod automaton;
pub mod serialization;

/// Common imports for convenient usage
pub mod prelude {
    pub use crate::automaton::builder::{BuildError, Builder};
    pub use crate::automaton::graph::ReadGraph;
    pub use crate::automaton::iterator::TermIterator;
    pub use crate::automaton::{Automaton, AutomatonNode};
    pub use crate::serialization::{decode, DecodeError, EncodeError};
}
