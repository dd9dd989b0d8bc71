//! Property-based tests over randomly generated element graphs.
//!
//! These tests use proptest to check that both encodings reproduce any
//! reachable graph, cycles and shared elements included, and that the
//! decoders reject arbitrary input without panicking.

mod common;

use proptest::prelude::*;

use common::assert_same_graph;
use dmx::{decode, derived_id, encode, DataModel, Encoding, Value};

const TARGETS: [(Encoding, i32); 3] = [
    (Encoding::Binary, 5),
    (Encoding::KeyValues2, 1),
    (Encoding::KeyValues2, 2),
];

#[derive(Debug, Clone)]
struct ElementSpec {
    name: String,
    element_type: String,
    int: i32,
    /// Sixty-fourths, so the text encoding's ten decimals are exact.
    float: i32,
    text: String,
    refs: Vec<Option<usize>>,
    list: Vec<Option<usize>>,
}

/// Strategy for one element whose references point at indices below `n`.
fn element(n: usize) -> impl Strategy<Value = ElementSpec> {
    (
        "[ -~]{0,12}",
        prop::sample::select(vec!["DmElement", "DmeMesh", "DmeJoint", "element"]),
        any::<i32>(),
        -8192i32..8192,
        "[ -~\t\n]{0,16}",
        prop::collection::vec(prop::option::of(0..n), 0..3),
        prop::collection::vec(prop::option::of(0..n), 0..4),
    )
        .prop_map(|(name, element_type, int, float, text, refs, list)| ElementSpec {
            name,
            element_type: element_type.to_string(),
            int,
            float,
            text,
            refs,
            list,
        })
}

/// Strategy for a whole graph of one to twelve elements.
fn graph() -> impl Strategy<Value = Vec<ElementSpec>> {
    (1usize..=12).prop_flat_map(|n| prop::collection::vec(element(n), n))
}

fn build(specs: &[ElementSpec]) -> DataModel {
    let mut dm = DataModel::new("model", 1).unwrap();
    let handles: Vec<_> = specs
        .iter()
        .enumerate()
        .map(|(i, spec)| {
            dm.add_element_with_id(
                spec.name.as_str(),
                spec.element_type.as_str(),
                derived_id(format!("element {i}").as_bytes()),
            )
            .unwrap()
        })
        .collect();

    for (spec, &handle) in specs.iter().zip(&handles) {
        dm.add_attribute(handle, "int", spec.int).unwrap();
        dm.add_attribute(handle, "float", spec.float as f32 / 64.0)
            .unwrap();
        dm.add_attribute(handle, "text", spec.text.as_str()).unwrap();
        for (j, target) in spec.refs.iter().enumerate() {
            dm.add_attribute(
                handle,
                format!("ref{j}"),
                Value::Element(target.map(|t| handles[t])),
            )
            .unwrap();
        }
        let list = spec.list.iter().map(|t| t.map(|t| handles[t])).collect();
        dm.add_attribute(handle, "list", Value::ElementArray(list))
            .unwrap();
    }
    dm
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Any graph survives a round trip through every write target.
    #[test]
    fn graph_round_trips(specs in graph()) {
        let dm = build(&specs);
        for (encoding, version) in TARGETS {
            let bytes = encode(&dm, encoding, version).unwrap();
            let decoded = decode(&bytes).unwrap();
            assert_same_graph(&dm, &decoded);
        }
    }

    /// Encoding a decoded model again reproduces the same bytes.
    #[test]
    fn reencoding_is_stable(specs in graph()) {
        let dm = build(&specs);
        for (encoding, version) in TARGETS {
            let first = encode(&dm, encoding, version).unwrap();
            let second = encode(&decode(&first).unwrap(), encoding, version).unwrap();
            prop_assert_eq!(first, second);
        }
    }

    /// Arbitrary bytes after a binary header never panic the decoder.
    #[test]
    fn binary_decoder_rejects_garbage(body in prop::collection::vec(any::<u8>(), 0..256)) {
        let mut input = b"<!-- dmx encoding binary 5 format model 1 -->\n".to_vec();
        input.extend_from_slice(&body);
        let _ = decode(&input);
    }

    /// Arbitrary text after a keyvalues2 header never panics the parser.
    #[test]
    fn text_parser_rejects_garbage(body in "[\"{}\\[\\], a-z0-9/\n\\\\]{0,200}") {
        let input = format!("<!-- dmx encoding keyvalues2 2 format model 1 -->\n{body}");
        let _ = decode(input.as_bytes());
    }

    /// Every prefix of a valid text encoding either parses or errors cleanly.
    #[test]
    fn truncated_text_never_panics(specs in graph(), cut in any::<prop::sample::Index>()) {
        let bytes = encode(&build(&specs), Encoding::KeyValues2, 2).unwrap();
        let _ = decode(&bytes[..cut.index(bytes.len() + 1)]);
    }
}
