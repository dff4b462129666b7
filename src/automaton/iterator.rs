//! Lexicographic enumeration of accepted strings.

use crate::automaton::AutomatonNode;

/// One level of the depth-first walk: a node's materialized children and a
/// cursor over them, plus the byte length this level's label contributed to
/// the shared path buffer.
struct Frame<N> {
    children: Vec<(char, N)>,
    next: usize,
    label_len: usize,
}

/// Iterator over an automaton's accepted strings in ascending lexicographic
/// order by code-point sequence.
///
/// The walk is a depth-first descent visiting children in ascending label
/// order and yielding the accumulated path at every final node; a string is
/// therefore always yielded before its extensions and before any greater
/// sibling subtree. The iterator is pull-based (bounded work per `next`),
/// finite, and not restartable; its node handles keep the graph alive for
/// the iteration's lifetime.
///
/// # Example
///
/// ```rust
/// use libmafsa::prelude::*;
///
/// let builder = Builder::from_terms(["pity", "city"])?;
/// let terms: Vec<String> = builder.view().terms().collect();
/// assert_eq!(terms, vec!["city", "pity"]);
/// # Ok::<(), libmafsa::prelude::BuildError>(())
/// ```
pub struct TermIterator<N: AutomatonNode> {
    stack: Vec<Frame<N>>,
    path: String,
}

impl<N: AutomatonNode> TermIterator<N> {
    /// Create an iterator rooted at `root`.
    pub fn new(root: N) -> Self {
        TermIterator {
            stack: vec![Frame {
                children: root.edges().collect(),
                next: 0,
                label_len: 0,
            }],
            path: String::new(),
        }
    }
}

impl<N: AutomatonNode> Iterator for TermIterator<N> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            let depth = self.stack.len();
            if depth == 0 {
                return None;
            }

            let frame = &mut self.stack[depth - 1];
            if frame.next < frame.children.len() {
                let (label, node) = frame.children[frame.next].clone();
                frame.next += 1;

                self.path.push(label);
                let is_final = node.is_final();
                self.stack.push(Frame {
                    children: node.edges().collect(),
                    next: 0,
                    label_len: label.len_utf8(),
                });
                if is_final {
                    return Some(self.path.clone());
                }
            } else {
                let finished = match self.stack.pop() {
                    Some(frame) => frame,
                    None => return None,
                };
                self.path.truncate(self.path.len() - finished.label_len);
            }
        }
    }
}
