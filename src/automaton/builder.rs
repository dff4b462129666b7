//! Online construction of the minimal automaton.
//!
//! Keys must arrive in strictly ascending lexicographic order. The builder
//! keeps the path of the most recent key (the spine) mutable; everything off
//! that path is already minimal and registered. Inserting the next key
//! minimizes the divergent tail of the spine bottom-up against the register
//! before growing a fresh chain for the new suffix, which is the
//! Daciuk-Mihov incremental construction.

use crate::automaton::{Automaton, AutomatonNode};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use thiserror::Error;

/// Errors surfaced while building an automaton.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// The key was not strictly greater than the previously inserted key.
    #[error("key {key:?} is not strictly greater than previously inserted key {previous:?}")]
    OutOfOrder {
        /// The rejected key.
        key: String,
        /// The most recently accepted key.
        previous: String,
    },

    /// The empty key has no representation (it would require a final root).
    #[error("the empty key is not supported")]
    EmptyKey,

    /// The builder was already finished.
    #[error("cannot insert into a finished builder")]
    Finished,
}

/// Inline capacity for edge lists; fan-out is typically 1-5.
pub(crate) type EdgeList = SmallVec<[(char, u32); 4]>;

/// A mutable node in the builder's arena.
///
/// Edges carry arena indices rather than owned children: minimization makes
/// the graph a DAG, so a child may be shared by many parents.
#[derive(Debug, Default, Clone)]
pub(crate) struct BuildNode {
    pub(crate) is_final: bool,
    pub(crate) edges: EdgeList,
    pub(crate) count: usize,
}

/// Structural identity of a node: finality plus the ordered outgoing edges.
///
/// Edge targets are arena indices of already-registered (canonical) nodes,
/// which is why minimization must run bottom-up: a signature taken before
/// the node's descendants are canonical would be unstable.
#[derive(Debug, PartialEq, Eq, Hash)]
struct NodeSignature {
    is_final: bool,
    edges: EdgeList,
}

impl NodeSignature {
    fn of(node: &BuildNode) -> Self {
        NodeSignature {
            is_final: node.is_final,
            edges: node.edges.clone(),
        }
    }
}

/// Incrementally builds the minimal automaton for keys inserted in
/// lexicographic order.
///
/// # Example
///
/// ```rust
/// use libmafsa::prelude::*;
///
/// let mut builder = Builder::new();
/// builder.insert("dog")?;
/// builder.insert("dogs")?;
/// builder.finish();
///
/// assert!(builder.view().contains("dogs"));
/// assert_eq!(builder.view().len(), Some(2));
/// # Ok::<(), libmafsa::prelude::BuildError>(())
/// ```
pub struct Builder {
    /// Node arena; index 0 is always the root.
    nodes: Vec<BuildNode>,
    /// Canonical node per structural signature.
    register: FxHashMap<NodeSignature, u32>,
    /// The most recently inserted key.
    prev_key: String,
    /// Arena indices along `prev_key`'s path, starting at the root.
    spine: Vec<u32>,
    finished: bool,
}

impl Builder {
    /// Create an empty builder with a single non-final root.
    pub fn new() -> Self {
        Builder {
            nodes: vec![BuildNode::default()],
            register: FxHashMap::default(),
            prev_key: String::new(),
            spine: vec![0],
            finished: false,
        }
    }

    /// Build a finished automaton from arbitrary terms.
    ///
    /// Terms are sorted and deduplicated before insertion, so any iteration
    /// order is accepted. Fails only if a term is empty.
    pub fn from_terms<I, S>(terms: I) -> Result<Self, BuildError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut sorted: Vec<String> = terms
            .into_iter()
            .map(|term| term.as_ref().to_owned())
            .collect();
        sorted.sort();
        sorted.dedup();

        let mut builder = Builder::new();
        for term in &sorted {
            builder.insert(term)?;
        }
        builder.finish();
        Ok(builder)
    }

    /// Insert the next key.
    ///
    /// The key must be strictly greater than every previously inserted key
    /// under code-point order (for `&str` this coincides with byte order).
    /// A failed insert leaves the builder unchanged.
    pub fn insert(&mut self, key: &str) -> Result<(), BuildError> {
        if self.finished {
            return Err(BuildError::Finished);
        }
        if key.is_empty() {
            return Err(BuildError::EmptyKey);
        }
        if !self.prev_key.is_empty() && key <= self.prev_key.as_str() {
            return Err(BuildError::OutOfOrder {
                key: key.to_owned(),
                previous: self.prev_key.clone(),
            });
        }

        let common = key
            .chars()
            .zip(self.prev_key.chars())
            .take_while(|(a, b)| a == b)
            .count();

        // The previous key's tail below the divergence point is complete;
        // fold it into the register before growing the new suffix.
        self.minimize(common);

        for label in key.chars().skip(common) {
            let child = self.nodes.len() as u32;
            self.nodes.push(BuildNode::default());
            let parent = self.spine[self.spine.len() - 1] as usize;
            self.nodes[parent].edges.push((label, child));
            self.spine.push(child);
        }

        let last = self.spine[self.spine.len() - 1] as usize;
        self.nodes[last].is_final = true;
        self.prev_key.clear();
        self.prev_key.push_str(key);
        Ok(())
    }

    /// Finish construction: minimize the remaining spine, drop unreachable
    /// nodes, and compute per-node suffix counts.
    ///
    /// Idempotent; a second call is a no-op. After finishing, `insert` fails
    /// with [`BuildError::Finished`].
    pub fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.minimize(0);
        self.compact();
        self.compute_counts();
        self.register = FxHashMap::default();
        self.finished = true;
    }

    /// Serialize the finished automaton with the default 4-byte pointers.
    pub fn encode(&self) -> Result<Vec<u8>, crate::serialization::EncodeError> {
        crate::serialization::encode(self, crate::serialization::DEFAULT_POINTER_WIDTH)
    }

    /// Serialize the finished automaton with `width`-byte pointers
    /// (1 through 8).
    pub fn encode_with_pointer_width(
        &self,
        width: u8,
    ) -> Result<Vec<u8>, crate::serialization::EncodeError> {
        crate::serialization::encode(self, width)
    }

    /// View the builder's graph through the [`Automaton`] trait.
    ///
    /// Navigation is meaningful once [`finish`](Builder::finish) has run;
    /// before that, nodes on the current spine are not yet minimal and
    /// suffix counts are still zero.
    pub fn view(&self) -> BuildGraph<'_> {
        BuildGraph { builder: self }
    }

    /// Number of nodes in the automaton.
    ///
    /// Exact after [`finish`](Builder::finish); before that the arena still
    /// holds nodes orphaned by register replacement.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn arena(&self) -> &[BuildNode] {
        &self.nodes
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.finished
    }

    /// Minimize the spine bottom-up until `down_to` key characters remain.
    fn minimize(&mut self, down_to: usize) {
        while self.spine.len() > down_to + 1 {
            let child = self.spine[self.spine.len() - 1];
            self.spine.pop();
            let parent = self.spine[self.spine.len() - 1] as usize;
            let signature = NodeSignature::of(&self.nodes[child as usize]);
            if let Some(&canonical) = self.register.get(&signature) {
                // The spine child is always the most recently attached edge:
                // keys ascend, so every edge along the previous key's path
                // was appended after its siblings.
                if let Some(last) = self.nodes[parent].edges.last_mut() {
                    last.1 = canonical;
                }
            } else {
                self.register.insert(signature, child);
            }
        }
    }

    /// Renumber the reachable nodes in depth-first preorder (children in
    /// ascending label order), dropping nodes orphaned by minimization.
    /// This is also the order the encoder emits, so arena order and stream
    /// order agree.
    fn compact(&mut self) {
        fn visit(
            nodes: &[BuildNode],
            idx: u32,
            remap: &mut FxHashMap<u32, u32>,
            order: &mut Vec<u32>,
        ) {
            for &(_, child) in &nodes[idx as usize].edges {
                if !remap.contains_key(&child) {
                    remap.insert(child, order.len() as u32);
                    order.push(child);
                    visit(nodes, child, remap, order);
                }
            }
        }

        let mut remap = FxHashMap::default();
        let mut order = Vec::with_capacity(self.nodes.len());
        remap.insert(0, 0);
        order.push(0);
        visit(&self.nodes, 0, &mut remap, &mut order);

        let mut compacted = Vec::with_capacity(order.len());
        for &old in &order {
            let node = &self.nodes[old as usize];
            compacted.push(BuildNode {
                is_final: node.is_final,
                edges: node.edges.iter().map(|&(c, t)| (c, remap[&t])).collect(),
                count: 0,
            });
        }
        self.nodes = compacted;
        self.spine = vec![0];
    }

    /// Post-order count computation, memoized per node: the graph is a DAG,
    /// so shared subtrees must not be summed twice.
    fn compute_counts(&mut self) {
        fn fill(nodes: &mut [BuildNode], done: &mut [bool], idx: u32) -> usize {
            if done[idx as usize] {
                return nodes[idx as usize].count;
            }
            let mut total = usize::from(nodes[idx as usize].is_final);
            let edges = nodes[idx as usize].edges.clone();
            for (_, child) in edges {
                total += fill(nodes, done, child);
            }
            nodes[idx as usize].count = total;
            done[idx as usize] = true;
            total
        }

        let mut done = vec![false; self.nodes.len()];
        fill(&mut self.nodes, &mut done, 0);
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

/// A borrow of a [`Builder`]'s graph implementing [`Automaton`].
#[derive(Clone, Copy)]
pub struct BuildGraph<'a> {
    builder: &'a Builder,
}

impl<'a> Automaton for BuildGraph<'a> {
    type Node = BuildNodeRef<'a>;

    fn root(&self) -> Self::Node {
        BuildNodeRef {
            nodes: &self.builder.nodes,
            idx: 0,
        }
    }

    fn len(&self) -> Option<usize> {
        self.builder
            .finished
            .then(|| self.builder.nodes[0].count)
    }
}

/// A lightweight handle to a node in a [`Builder`]'s arena.
#[derive(Clone, Copy)]
pub struct BuildNodeRef<'a> {
    nodes: &'a [BuildNode],
    idx: u32,
}

impl AutomatonNode for BuildNodeRef<'_> {
    fn is_final(&self) -> bool {
        self.nodes[self.idx as usize].is_final
    }

    fn transition(&self, label: char) -> Option<Self> {
        let edges = &self.nodes[self.idx as usize].edges;
        edges
            .binary_search_by_key(&label, |&(c, _)| c)
            .ok()
            .map(|pos| BuildNodeRef {
                nodes: self.nodes,
                idx: edges[pos].1,
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
                        BuildNodeRef {
                            nodes: self.nodes,
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
