//! The decoded, read-only automaton.
//!
//! Nodes live in an `Arc`'d arena and are addressed by index; handles clone
//! the `Arc`, so the graph can be shared across threads and outlives any
//! iterator or node handle taken from it. Mutation is not possible after
//! decoding.

use crate::automaton::builder::EdgeList;
use crate::automaton::{Automaton, AutomatonNode};
use std::sync::Arc;

/// Edge counts at or above this use binary instead of linear search.
const BINARY_SEARCH_THRESHOLD: usize = 16;

/// An immutable node in the decoded automaton.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub(crate) struct ReadNode {
    pub(crate) is_final: bool,
    /// Outgoing edges in ascending label order: (label, arena index).
    pub(crate) edges: EdgeList,
    /// Accepted strings terminating at or below this node.
    pub(crate) count: usize,
}

impl ReadNode {
    pub(crate) fn empty() -> Self {
        ReadNode {
            is_final: false,
            edges: EdgeList::new(),
            count: 0,
        }
    }
}

/// The read-only automaton produced by [`decode`](crate::serialization::decode).
///
/// Once constructed the graph is frozen: it is safe to query from multiple
/// threads concurrently without synchronization, and cloning it only bumps a
/// reference count.
///
/// # Example
///
/// ```rust
/// use libmafsa::prelude::*;
///
/// let builder = Builder::from_terms(["ab", "ac", "ad"])?;
/// let graph = decode(&builder.encode()?)?;
///
/// assert!(graph.contains("ac"));
/// assert_eq!(graph.index_of("ac"), Some(1));
/// assert_eq!(graph.term_count(), 3);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReadGraph {
    /// Node arena; index 0 is the root.
    nodes: Arc<Vec<ReadNode>>,
    term_count: usize,
}

impl ReadGraph {
    pub(crate) fn from_parts(nodes: Vec<ReadNode>) -> Self {
        let term_count = nodes[0].count;
        ReadGraph {
            nodes: Arc::new(nodes),
            term_count,
        }
    }

    /// Get the number of accepted strings.
    pub fn term_count(&self) -> usize {
        self.term_count
    }

    /// Get the number of nodes in the decoded graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

impl Automaton for ReadGraph {
    type Node = ReadNodeRef;

    fn root(&self) -> Self::Node {
        ReadNodeRef {
            nodes: Arc::clone(&self.nodes),
            idx: 0,
        }
    }

    fn len(&self) -> Option<usize> {
        Some(self.term_count)
    }

    /// Optimized membership test that walks arena indices directly,
    /// avoiding a handle (and `Arc` clone) per step.
    fn contains(&self, term: &str) -> bool {
        let mut idx = 0usize;
        for label in term.chars() {
            match find_edge(&self.nodes[idx].edges, label) {
                Some(next) => idx = next as usize,
                None => return false,
            }
        }
        self.nodes[idx].is_final
    }
}

/// A lightweight handle to a node of a [`ReadGraph`].
///
/// Cloning is cheap (`Arc` reference counting), and the handle keeps the
/// whole graph alive.
#[derive(Clone)]
pub struct ReadNodeRef {
    nodes: Arc<Vec<ReadNode>>,
    idx: u32,
}

impl AutomatonNode for ReadNodeRef {
    fn is_final(&self) -> bool {
        self.nodes[self.idx as usize].is_final
    }

    fn transition(&self, label: char) -> Option<Self> {
        find_edge(&self.nodes[self.idx as usize].edges, label).map(|idx| ReadNodeRef {
            nodes: Arc::clone(&self.nodes),
            idx,
        })
    }

    fn edges(&self) -> Box<dyn Iterator<Item = (char, Self)> + '_> {
        Box::new(
            self.nodes[self.idx as usize]
                .edges
                .iter()
                .map(|&(label, idx)| {
                    (
                        label,
                        ReadNodeRef {
                            nodes: Arc::clone(&self.nodes),
                            idx,
                        },
                    )
                }),
        )
    }

    fn suffix_count(&self) -> usize {
        self.nodes[self.idx as usize].count
    }

    fn edge_count(&self) -> usize {
        self.nodes[self.idx as usize].edges.len()
    }
}

/// Adaptive edge lookup: linear scan is cache-friendlier for the small
/// fan-outs that dominate real dictionaries, binary search wins above the
/// threshold.
fn find_edge(edges: &EdgeList, label: char) -> Option<u32> {
    if edges.len() < BINARY_SEARCH_THRESHOLD {
        edges
            .iter()
            .find(|&&(c, _)| c == label)
            .map(|&(_, idx)| idx)
    } else {
        edges
            .binary_search_by_key(&label, |&(c, _)| c)
            .ok()
            .map(|pos| edges[pos].1)
    }
}
