//! Automaton abstractions shared by the build-side and decoded graphs.
//!
//! The same set of strings exists in two forms: the mutable graph a
//! [`Builder`](builder::Builder) grows during insertion, and the immutable
//! [`ReadGraph`](graph::ReadGraph) decoded from the binary encoding. Both
//! expose their nodes through the [`Automaton`] / [`AutomatonNode`] trait
//! pair, so membership tests, prefix walks, perfect-hash indexing, and
//! lexicographic enumeration are implemented once, here, as provided
//! methods.

pub mod builder;
pub mod graph;
pub mod iterator;

pub use builder::{BuildError, BuildGraph, BuildNodeRef, Builder};
pub use graph::{ReadGraph, ReadNodeRef};
pub use iterator::TermIterator;

/// A set of strings represented as a minimal acyclic DFA.
///
/// Walks start at [`root`](Automaton::root) and consume one Unicode scalar
/// value per edge. All provided methods rely on two structural guarantees
/// that both graph forms uphold: edges iterate in ascending label order, and
/// every node knows how many accepted strings terminate at or below it.
pub trait Automaton {
    /// The node type used for traversal.
    type Node: AutomatonNode;

    /// Get the root node of the automaton.
    fn root(&self) -> Self::Node;

    /// Get the total number of accepted strings (if known).
    fn len(&self) -> Option<usize>;

    /// Check if the automaton accepts no strings.
    fn is_empty(&self) -> bool {
        self.len().map(|n| n == 0).unwrap_or(false)
    }

    /// Check if `term` is in the accepted set.
    fn contains(&self, term: &str) -> bool {
        self.traverse(term).map(|node| node.is_final()).unwrap_or(false)
    }

    /// Walk from the root consuming `prefix`.
    ///
    /// Returns the node reached after the last character, or `None` if some
    /// step has no matching edge. The empty prefix returns the root.
    fn traverse(&self, prefix: &str) -> Option<Self::Node> {
        let mut node = self.root();
        for label in prefix.chars() {
            node = node.transition(label)?;
        }
        Some(node)
    }

    /// Walk from the root consuming `prefix`, accumulating a rank as it goes.
    ///
    /// The returned index counts the accepted strings that are
    /// lexicographically `<=` the walked path: stepping from a node by
    /// character `c` adds the suffix counts of all siblings with labels
    /// `< c`, plus one whenever the step lands on a final node. For an
    /// accepted `prefix` the index therefore equals `rank + 1`, where `rank`
    /// is the prefix's 0-based position in the sorted set; see
    /// [`index_of`](Automaton::index_of) for the subtraction done for you.
    ///
    /// If the walk falls off the graph, the node is `None` and the index
    /// holds the sum accumulated up to the failing step. The empty prefix
    /// yields the root and index 0.
    fn indexed_traverse(&self, prefix: &str) -> (Option<Self::Node>, usize) {
        let mut node = self.root();
        let mut index = 0;
        for label in prefix.chars() {
            let Some(next) = node.transition(label) else {
                return (None, index);
            };
            for (sibling, child) in node.edges() {
                if sibling >= label {
                    break;
                }
                index += child.suffix_count();
            }
            if next.is_final() {
                index += 1;
            }
            node = next;
        }
        (Some(node), index)
    }

    /// Get the 0-based rank of `term` in the sorted accepted set.
    ///
    /// This is the minimal perfect hash: every accepted string maps to a
    /// distinct index in `0..len()`, in lexicographic order, making the
    /// result directly usable as a subscript into a caller-supplied parallel
    /// array. Returns `None` when `term` is not accepted.
    fn index_of(&self, term: &str) -> Option<usize> {
        match self.indexed_traverse(term) {
            (Some(node), index) if node.is_final() => Some(index - 1),
            _ => None,
        }
    }

    /// Enumerate the accepted strings in ascending lexicographic order.
    ///
    /// The iterator is lazy and pull-based; it borrows nothing mutable and
    /// holds the graph alive through its node handles.
    fn terms(&self) -> TermIterator<Self::Node> {
        TermIterator::new(self.root())
    }
}

/// A traversable node of an [`Automaton`].
///
/// Handles are cheap to clone and carry whatever reference keeps the backing
/// arena alive. Edge iteration yields labels in strictly ascending order.
pub trait AutomatonNode: Clone + Send + Sync {
    /// Check if an accepted string ends at this node.
    fn is_final(&self) -> bool;

    /// Transition to a child node via the given label.
    ///
    /// Returns `None` if no such edge exists.
    fn transition(&self, label: char) -> Option<Self>;

    /// Iterate over all outgoing edges as `(label, child)` pairs, in
    /// ascending label order.
    fn edges(&self) -> Box<dyn Iterator<Item = (char, Self)> + '_>;

    /// Number of accepted strings whose walk terminates at or below this
    /// node (counting this node itself when final).
    fn suffix_count(&self) -> usize;

    /// Number of outgoing edges.
    fn edge_count(&self) -> usize {
        self.edges().count()
    }
}
