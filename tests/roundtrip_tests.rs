//! End-to-end tests: build, encode, decode, navigate.

use libmafsa::prelude::*;

/// Parse the edge-word run starting at `offset`: (label, end-of-word,
/// pointer) per edge, assuming the default 4-byte pointer profile.
fn edges_at(bytes: &[u8], offset: usize) -> Vec<(char, bool, u32)> {
    let mut pos = offset;
    let mut edges = Vec::new();
    loop {
        let flags = bytes[pos];
        let label_len = ((flags >> 2) & 0x07) as usize;
        let label = std::str::from_utf8(&bytes[pos + 1..pos + 1 + label_len])
            .unwrap()
            .chars()
            .next()
            .unwrap();
        let pointer = u32::from_be_bytes(
            bytes[pos + 1 + label_len..pos + 1 + label_len + 4]
                .try_into()
                .unwrap(),
        );
        edges.push((label, flags & 0x01 != 0, pointer));
        if flags & 0x02 != 0 {
            break;
        }
        pos += 1 + label_len + 4;
    }
    edges
}

fn pointer_of(bytes: &[u8], offset: usize, label: char) -> u32 {
    edges_at(bytes, offset)
        .into_iter()
        .find(|&(l, _, _)| l == label)
        .map(|(_, _, pointer)| pointer)
        .unwrap_or_else(|| panic!("no edge {label:?} at offset {offset}"))
}

#[test]
fn test_cities_scenario() {
    let terms = ["cities", "city", "pities", "pity"];
    let builder = Builder::from_terms(terms).unwrap();
    let graph = decode(&builder.encode().unwrap()).unwrap();

    assert!(graph.contains("city"));
    assert!(!graph.contains("pitiful"));
    assert!(!graph.contains("cit"));
    assert_eq!(graph.terms().collect::<Vec<_>>(), terms);
}

#[test]
fn test_reference_encoding() {
    let terms = ["dog", "dogs", "hello", "jello", "été", "あello"];
    let mut builder = Builder::new();
    for term in terms {
        builder.insert(term).unwrap();
    }
    builder.finish();
    let bytes = builder.encode().unwrap();

    // Version 2, 4-byte pointers, padded to the minimal word width.
    assert_eq!(&bytes[..6], &[0x02, 0x04, 0x00, 0x00, 0x00, 0x00]);

    // The root's edges, ascending by code point.
    let root: Vec<char> = edges_at(&bytes, 6).iter().map(|&(l, _, _)| l).collect();
    assert_eq!(root, vec!['d', 'h', 'j', 'é', 'あ']);

    // "hello", "jello", and "あello" share their whole tails, so all three
    // first edges point at the same run.
    let after_h = pointer_of(&bytes, 6, 'h');
    assert_eq!(pointer_of(&bytes, 6, 'j'), after_h);
    assert_eq!(pointer_of(&bytes, 6, 'あ'), after_h);

    // Walking h-e-l-l lands on the shared node at offset 0x4b.
    let after_he = pointer_of(&bytes, after_h as usize, 'e');
    let after_hel = pointer_of(&bytes, after_he as usize, 'l');
    let after_hell = pointer_of(&bytes, after_hel as usize, 'l');
    assert_eq!(after_hell, 0x4b);

    // Its single edge reaches the accepting leaf: pointer 0, end-of-word.
    assert_eq!(edges_at(&bytes, 0x4b), vec![('o', true, 0)]);

    let graph = decode(&bytes).unwrap();
    assert_eq!(graph.terms().collect::<Vec<_>>(), terms);
}

#[test]
fn test_rank_consistency() {
    let terms = ["dog", "dogs", "hello", "jello", "été", "あello"];
    let builder = Builder::from_terms(terms).unwrap();
    let graph = decode(&builder.encode().unwrap()).unwrap();

    for (rank, term) in terms.iter().enumerate() {
        let (node, index) = graph.indexed_traverse(term);
        assert!(node.unwrap().is_final());
        assert_eq!(index, rank + 1, "index of {term}");
        assert_eq!(graph.index_of(term), Some(rank));
    }
    assert_eq!(graph.index_of("doge"), None);
    assert_eq!(graph.index_of("hell"), None);
}

#[test]
fn test_indexed_traverse_edges() {
    let builder = Builder::from_terms(["ab", "ac", "b"]).unwrap();
    let graph = decode(&builder.encode().unwrap()).unwrap();

    // Empty prefix: the root at index 0.
    let (root, index) = graph.indexed_traverse("");
    assert_eq!(index, 0);
    assert_eq!(root.unwrap().suffix_count(), 3);

    // A live prefix that is not itself accepted.
    let (node, index) = graph.indexed_traverse("a");
    assert!(!node.unwrap().is_final());
    assert_eq!(index, 0);

    // "b" sorts after both "ab" and "ac".
    assert_eq!(graph.indexed_traverse("b").1, 3);

    // A dead prefix returns no node and the sum accumulated so far.
    let (node, _) = graph.indexed_traverse("az");
    assert!(node.is_none());
    assert!(graph.traverse("az").is_none());
}

#[test]
fn test_empty_set_roundtrip() {
    let mut builder = Builder::new();
    builder.finish();
    let bytes = builder.encode().unwrap();
    assert_eq!(bytes.len(), 6);

    let graph = decode(&bytes).unwrap();
    assert_eq!(graph.term_count(), 0);
    assert!(graph.is_empty());
    assert!(!graph.contains(""));
    assert_eq!(graph.terms().next(), None);
}

#[test]
fn test_build_view_and_decoded_graph_agree() {
    let terms = ["do", "dog", "dogs", "tail", "tails", "talk"];
    let builder = Builder::from_terms(terms).unwrap();
    let bytes = builder.encode().unwrap();
    let graph = decode(&bytes).unwrap();
    let view = builder.view();

    assert_eq!(view.len(), graph.len());
    for term in terms {
        assert_eq!(view.index_of(term), graph.index_of(term));
    }
    for probe in ["d", "dogss", "tai", "zzz"] {
        assert_eq!(view.contains(probe), graph.contains(probe));
    }
    assert_eq!(
        view.terms().collect::<Vec<_>>(),
        graph.terms().collect::<Vec<_>>()
    );
}

#[test]
fn test_multibyte_labels_roundtrip() {
    let terms = ["caffè", "café", "中文", "中国", "🎉🎊"];
    let builder = Builder::from_terms(terms).unwrap();
    let graph = decode(&builder.encode().unwrap()).unwrap();

    let mut sorted: Vec<&str> = terms.to_vec();
    sorted.sort();
    assert_eq!(graph.terms().collect::<Vec<_>>(), sorted);
    for term in terms {
        assert!(graph.contains(term), "missing {term}");
    }
    assert!(!graph.contains("caf"));
    assert!(!graph.contains("中"));
}
