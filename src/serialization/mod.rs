//! The binary encoding of a finished automaton and its inverse.
//!
//! The stream is a sequence of variable-width words. The first word is the
//! header; every following word encodes exactly one edge:
//!
//! ```text
//! header:    [version: 1] [pointer width P: 1] [zero padding: P]
//! edge word: [flags: 1] [UTF-8 label: 1..4] [pointer: P, big-endian]
//! ```
//!
//! Flag bits: `0x01` end-of-word (the edge's target is final), `0x02`
//! end-of-node (last edge of the source node's run), bits 2..4 the label's
//! UTF-8 byte length (1..=4), bits 5..7 reserved and zero.
//!
//! A node is a contiguous run of edge words in ascending label order; the
//! run's last word has end-of-node set. Nodes without outgoing edges emit no
//! words at all: every pointer to them is 0, and their finality travels on
//! the referencing edge's end-of-word bit. All other pointers are absolute
//! byte offsets of the target node's first edge word. The root's run starts
//! immediately after the header.
//!
//! Emission order is depth-first preorder from the root with children in
//! ascending label order, so a given key set always encodes to identical
//! bytes. Structure sharing in the DAG appears as multiple edge words
//! carrying the same pointer.

use crate::automaton::builder::{BuildNode, Builder, EdgeList};
use crate::automaton::graph::{ReadGraph, ReadNode};
use rustc_hash::FxHashMap;
use std::collections::hash_map::Entry;
use thiserror::Error;

/// Current format version, the first byte of every stream.
pub const FORMAT_VERSION: u8 = 0x02;

/// Pointer width written by [`Builder::encode`].
pub const DEFAULT_POINTER_WIDTH: u8 = 4;

/// Widest supported pointer field.
pub const MAX_POINTER_WIDTH: u8 = 8;

/// The edge's target node is final.
const FLAG_EOW: u8 = 0x01;
/// The edge is the last of its source node's run.
const FLAG_EON: u8 = 0x02;
const LABEL_LEN_MASK: u8 = 0x1c;
const LABEL_LEN_SHIFT: u8 = 2;
const RESERVED_MASK: u8 = 0xe0;

/// Errors surfaced while encoding a builder.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// The builder has not been finished.
    #[error("the builder must be finished before encoding")]
    Unfinished,

    /// The requested pointer width is outside 1..=8.
    #[error("pointer width {width} is outside the supported range 1..=8")]
    BadPointerWidth {
        /// The rejected width.
        width: u8,
    },

    /// A node's byte offset does not fit in the requested pointer width.
    #[error("node offset {offset:#x} does not fit in a {width}-byte pointer")]
    PointerOverflow {
        /// The unrepresentable offset.
        offset: u64,
        /// The pointer width in use.
        width: u8,
    },
}

/// Errors surfaced while decoding a stream.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The header declares an unknown format version.
    #[error("bad header: unsupported format version {version:#04x}")]
    BadVersion {
        /// The declared version.
        version: u8,
    },

    /// The header declares an implausible pointer width.
    #[error("bad header: unsupported pointer width {width}")]
    BadPointerWidth {
        /// The declared width.
        width: u8,
    },

    /// The stream ends in the middle of a word (or of the header).
    #[error("truncated stream: word at offset {offset} is incomplete")]
    Truncated {
        /// Start of the incomplete word.
        offset: usize,
    },

    /// An edge word has reserved flag bits set or a label length outside
    /// 1..=4.
    #[error("invalid edge flags {flags:#04x} at offset {offset}")]
    BadFlags {
        /// Offset of the offending word.
        offset: usize,
        /// The flag byte.
        flags: u8,
    },

    /// A label field is not a single character of the declared length.
    #[error("invalid UTF-8 label at offset {offset}")]
    BadUtf8 {
        /// Offset of the label bytes.
        offset: usize,
    },

    /// A pointer leads outside the stream or to a byte that does not start
    /// an edge word.
    #[error("pointer {pointer:#x} at offset {offset} is out of bounds or misaligned")]
    BadPointer {
        /// Offset of the word carrying the pointer.
        offset: usize,
        /// The pointer value.
        pointer: u64,
    },

    /// The pointer graph contains a cycle; a valid stream is acyclic.
    #[error("pointer cycle through the node at offset {offset:#x}")]
    Cyclic {
        /// Offset of a node on the cycle.
        offset: u64,
    },
}

/// Serialize a finished builder's automaton.
pub(crate) fn encode(builder: &Builder, pointer_width: u8) -> Result<Vec<u8>, EncodeError> {
    if !builder.is_finished() {
        return Err(EncodeError::Unfinished);
    }
    if !(1..=MAX_POINTER_WIDTH).contains(&pointer_width) {
        return Err(EncodeError::BadPointerWidth {
            width: pointer_width,
        });
    }

    let nodes = builder.arena();
    let width = pointer_width as usize;
    let header_len = 2 + width;

    let mut offsets: FxHashMap<u32, u64> = FxHashMap::default();
    let mut order: Vec<u32> = Vec::new();
    let mut cursor = header_len as u64;
    assign_offsets(nodes, 0, width, &mut offsets, &mut order, &mut cursor);

    if pointer_width < MAX_POINTER_WIDTH {
        let limit = 1u64 << (8 * pointer_width as u32);
        if let Some(&offset) = offsets.values().max() {
            if offset >= limit {
                return Err(EncodeError::PointerOverflow {
                    offset,
                    width: pointer_width,
                });
            }
        }
    }

    let mut bytes = Vec::with_capacity(cursor as usize);
    bytes.push(FORMAT_VERSION);
    bytes.push(pointer_width);
    bytes.resize(header_len, 0);

    let mut label_buf = [0u8; 4];
    for &idx in &order {
        let node = &nodes[idx as usize];
        for (pos, &(label, target)) in node.edges.iter().enumerate() {
            let target_node = &nodes[target as usize];
            let mut flags = (label.len_utf8() as u8) << LABEL_LEN_SHIFT;
            if target_node.is_final {
                flags |= FLAG_EOW;
            }
            if pos + 1 == node.edges.len() {
                flags |= FLAG_EON;
            }
            bytes.push(flags);
            bytes.extend_from_slice(label.encode_utf8(&mut label_buf).as_bytes());
            let pointer = if target_node.edges.is_empty() {
                0
            } else {
                offsets[&target]
            };
            bytes.extend_from_slice(&pointer.to_be_bytes()[8 - width..]);
        }
    }
    Ok(bytes)
}

/// Depth-first preorder offset assignment. A node's whole run is reserved
/// before its children's, and only edge-bearing nodes occupy bytes.
fn assign_offsets(
    nodes: &[BuildNode],
    idx: u32,
    width: usize,
    offsets: &mut FxHashMap<u32, u64>,
    order: &mut Vec<u32>,
    cursor: &mut u64,
) {
    let node = &nodes[idx as usize];
    if node.edges.is_empty() || offsets.contains_key(&idx) {
        return;
    }
    offsets.insert(idx, *cursor);
    order.push(idx);
    *cursor += node
        .edges
        .iter()
        .map(|&(label, _)| (1 + label.len_utf8() + width) as u64)
        .sum::<u64>();
    for &(_, child) in &node.edges {
        assign_offsets(nodes, child, width, offsets, order, cursor);
    }
}

/// A parsed edge word.
struct EdgeWord {
    offset: u64,
    flags: u8,
    label: char,
    target: u64,
}

/// Decode a stream produced by [`Builder::encode`] into a read-only graph.
///
/// The decoded graph is isomorphic to the one that was encoded: same edges,
/// same finality, same suffix counts (recomputed from the graph), same
/// structure sharing.
pub fn decode(bytes: &[u8]) -> Result<ReadGraph, DecodeError> {
    if bytes.len() < 2 {
        return Err(DecodeError::Truncated { offset: 0 });
    }
    let version = bytes[0];
    if version != FORMAT_VERSION {
        return Err(DecodeError::BadVersion { version });
    }
    if !(1..=MAX_POINTER_WIDTH).contains(&bytes[1]) {
        return Err(DecodeError::BadPointerWidth { width: bytes[1] });
    }
    let width = bytes[1] as usize;
    let header_len = 2 + width;
    if bytes.len() < header_len {
        return Err(DecodeError::Truncated { offset: 0 });
    }

    let (words, word_index) = scan_words(bytes, header_len, width)?;
    if let Some(last) = words.last() {
        if last.flags & FLAG_EON == 0 {
            return Err(DecodeError::Truncated {
                offset: last.offset as usize,
            });
        }
    }

    let mut nodes: Vec<ReadNode> = Vec::new();
    let mut node_offsets: Vec<u64> = Vec::new();
    if words.is_empty() {
        nodes.push(ReadNode::empty());
        node_offsets.push(header_len as u64);
    } else {
        materialize(&words, &word_index, header_len as u64, &mut nodes, &mut node_offsets)?;
    }
    compute_counts(&mut nodes, &node_offsets)?;
    Ok(ReadGraph::from_parts(nodes))
}

/// Scan the stream into edge words, validating flags, labels, and word
/// boundaries. Returns the words plus an offset -> word position map.
fn scan_words(
    bytes: &[u8],
    header_len: usize,
    width: usize,
) -> Result<(Vec<EdgeWord>, FxHashMap<u64, usize>), DecodeError> {
    let mut words = Vec::new();
    let mut word_index = FxHashMap::default();
    let mut pos = header_len;
    while pos < bytes.len() {
        let flags = bytes[pos];
        if flags & RESERVED_MASK != 0 {
            return Err(DecodeError::BadFlags { offset: pos, flags });
        }
        let label_len = ((flags & LABEL_LEN_MASK) >> LABEL_LEN_SHIFT) as usize;
        if !(1..=4).contains(&label_len) {
            return Err(DecodeError::BadFlags { offset: pos, flags });
        }
        if pos + 1 + label_len + width > bytes.len() {
            return Err(DecodeError::Truncated { offset: pos });
        }

        let label_bytes = &bytes[pos + 1..pos + 1 + label_len];
        let label = match std::str::from_utf8(label_bytes) {
            Ok(s) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => c,
                    _ => return Err(DecodeError::BadUtf8 { offset: pos + 1 }),
                }
            }
            Err(_) => return Err(DecodeError::BadUtf8 { offset: pos + 1 }),
        };

        let mut target = 0u64;
        for &b in &bytes[pos + 1 + label_len..pos + 1 + label_len + width] {
            target = (target << 8) | u64::from(b);
        }

        word_index.insert(pos as u64, words.len());
        words.push(EdgeWord {
            offset: pos as u64,
            flags,
            label,
            target,
        });
        pos += 1 + label_len + width;
    }
    Ok((words, word_index))
}

/// Materialize one `ReadNode` per distinct referenced offset, starting at
/// the root. Pointer value 0 designates a fresh no-outgoing-edges child
/// whose finality comes from the referencing edge's end-of-word bit.
fn materialize(
    words: &[EdgeWord],
    word_index: &FxHashMap<u64, usize>,
    root_offset: u64,
    nodes: &mut Vec<ReadNode>,
    node_offsets: &mut Vec<u64>,
) -> Result<(), DecodeError> {
    let mut node_at: FxHashMap<u64, u32> = FxHashMap::default();
    let mut pending: Vec<u64> = Vec::new();

    node_at.insert(root_offset, 0);
    nodes.push(ReadNode::empty());
    node_offsets.push(root_offset);
    pending.push(root_offset);

    while let Some(offset) = pending.pop() {
        let node_idx = node_at[&offset] as usize;
        let mut wi = word_index[&offset];
        let mut edges = EdgeList::new();
        loop {
            let word = &words[wi];
            let is_final = word.flags & FLAG_EOW != 0;
            let child = if word.target == 0 {
                let leaf = nodes.len() as u32;
                nodes.push(ReadNode {
                    is_final,
                    edges: EdgeList::new(),
                    count: 0,
                });
                node_offsets.push(0);
                leaf
            } else {
                if !word_index.contains_key(&word.target) {
                    return Err(DecodeError::BadPointer {
                        offset: word.offset as usize,
                        pointer: word.target,
                    });
                }
                let idx = match node_at.entry(word.target) {
                    Entry::Occupied(entry) => *entry.get(),
                    Entry::Vacant(entry) => {
                        let idx = nodes.len() as u32;
                        nodes.push(ReadNode::empty());
                        node_offsets.push(word.target);
                        entry.insert(idx);
                        pending.push(word.target);
                        idx
                    }
                };
                nodes[idx as usize].is_final = is_final;
                idx
            };
            edges.push((word.label, child));
            if word.flags & FLAG_EON != 0 {
                break;
            }
            wi += 1;
        }
        edges.sort_unstable_by_key(|&(label, _)| label);
        nodes[node_idx].edges = edges;
    }
    Ok(())
}

/// Iterative memoized post-order count computation. Works on untrusted
/// graphs: recursion depth is bounded by an explicit stack and revisiting an
/// in-progress node means the pointers form a cycle.
fn compute_counts(nodes: &mut [ReadNode], node_offsets: &[u64]) -> Result<(), DecodeError> {
    const NEW: u8 = 0;
    const ACTIVE: u8 = 1;

    let mut state = vec![NEW; nodes.len()];
    let mut stack: Vec<(u32, usize)> = vec![(0, 0)];
    state[0] = ACTIVE;

    while let Some(&(idx, cursor)) = stack.last() {
        if let Some(&(_, child)) = nodes[idx as usize].edges.get(cursor) {
            if let Some(top) = stack.last_mut() {
                top.1 += 1;
            }
            match state[child as usize] {
                NEW => {
                    state[child as usize] = ACTIVE;
                    stack.push((child, 0));
                }
                ACTIVE => {
                    return Err(DecodeError::Cyclic {
                        offset: node_offsets[child as usize],
                    });
                }
                _ => {}
            }
        } else {
            let total = usize::from(nodes[idx as usize].is_final)
                + nodes[idx as usize]
                    .edges
                    .iter()
                    .map(|&(_, child)| nodes[child as usize].count)
                    .sum::<usize>();
            nodes[idx as usize].count = total;
            state[idx as usize] = 2;
            stack.pop();
        }
    }
    Ok(())
}
