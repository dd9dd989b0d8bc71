//! Helpers shared by the integration tests.

#![allow(dead_code)]

use dmx::codec::{Header, Reader};
use dmx::limits::{MAX_DICT_SIZE, MAX_STRING_LEN};
use dmx::walk::discovery_order;
use dmx::{DataModel, ElementHandle, Value};

/// Asserts that the graphs reachable from the two roots match element by
/// element in discovery order: names, types, ids, attribute names and values,
/// and references up to handle renumbering.
pub fn assert_same_graph(expected: &DataModel, actual: &DataModel) {
    assert_eq!(expected.format(), actual.format());
    assert_eq!(expected.format_version(), actual.format_version());

    let left = discovery_order(expected);
    let right = discovery_order(actual);
    assert_eq!(left.len(), right.len(), "reachable element count");

    let position = |order: &[ElementHandle], h: Option<ElementHandle>| {
        h.map(|h| order.iter().position(|&o| o == h).expect("target is reachable"))
    };

    for (&l, &r) in left.iter().zip(&right) {
        let (le, re) = (&expected[l], &actual[r]);
        assert_eq!(le.name(), re.name());
        assert_eq!(le.element_type(), re.element_type());
        assert_eq!(le.id(), re.id());
        assert_eq!(le.len(), re.len(), "attribute count of {}", le.name());

        for (la, ra) in le.attributes().iter().zip(re.attributes()) {
            assert_eq!(la.name(), ra.name());
            assert_eq!(la.kind(), ra.kind(), "kind of {}", la.name());
            match (la.value(), ra.value()) {
                (Value::Element(a), Value::Element(b)) => {
                    assert_eq!(position(&left, *a), position(&right, *b), "{}", la.name());
                }
                (Value::ElementArray(a), Value::ElementArray(b)) => {
                    let a: Vec<_> = a.iter().map(|&h| position(&left, h)).collect();
                    let b: Vec<_> = b.iter().map(|&h| position(&right, h)).collect();
                    assert_eq!(a, b, "{}", la.name());
                }
                (a, b) => assert_eq!(a, b, "value of {}", la.name()),
            }
        }
    }
}

/// Reads the string dictionary of a binary-encoded model.
pub fn read_dictionary(bytes: &[u8]) -> Vec<String> {
    let (_, consumed) = Header::parse(bytes).unwrap();
    let mut reader = Reader::new(&bytes[consumed..]);
    assert_eq!(reader.read_byte("nul").unwrap(), 0);
    let count = reader.read_len(MAX_DICT_SIZE, "dictionary").unwrap();
    (0..count)
        .map(|_| reader.read_cstring(MAX_STRING_LEN, "entry").unwrap())
        .collect()
}

/// Counts non-overlapping occurrences of `needle` in `haystack`.
pub fn count_occurrences(haystack: &[u8], needle: &[u8]) -> usize {
    let mut count = 0;
    let mut i = 0;
    while i + needle.len() <= haystack.len() {
        if &haystack[i..i + needle.len()] == needle {
            count += 1;
            i += needle.len();
        } else {
            i += 1;
        }
    }
    count
}
