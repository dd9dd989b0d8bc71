//! Type registry: value kind <-> type tag, per (encoding, version).
//!
//! Two tag layouts exist. Both put the fourteen leaf slots at tags 1..=14 and
//! the matching array kinds at tags 15..=28, in the same order.
//!
//! | Tag | Current layout | Legacy layout |
//! |-----|----------------|---------------|
//! | 7   | `time`         | `elementid`   |
//! | 14  | `matrix`       | (none)        |
//!
//! The legacy layout is used by binary version 2 and keyvalues2 version 1;
//! the current layout by binary version 5 and keyvalues2 version 2.

use lazy_static::lazy_static;
use rustc_hash::FxHashMap;

use crate::codec::Encoding;
use crate::model::ValueKind;

/// Number of leaf slots in a layout; array tags start right after them.
const LEAF_SLOTS: u8 = 14;

/// Bidirectional kind/tag lookup for one tag layout.
#[derive(Debug)]
pub struct TypeTable {
    name: &'static str,
    kinds: FxHashMap<u8, ValueKind>,
    tags: FxHashMap<ValueKind, u8>,
}

impl TypeTable {
    fn from_leaves(name: &'static str, leaves: [Option<ValueKind>; LEAF_SLOTS as usize]) -> Self {
        let mut kinds = FxHashMap::default();
        let mut tags = FxHashMap::default();
        for (slot, leaf) in (1u8..).zip(leaves) {
            let Some(leaf) = leaf else { continue };
            for (tag, kind) in [(slot, leaf), (slot + LEAF_SLOTS, leaf.array_kind())] {
                kinds.insert(tag, kind);
                tags.insert(kind, tag);
            }
        }
        Self { name, kinds, tags }
    }

    /// Layout name, for diagnostics.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the kind registered under `tag`.
    pub fn kind_for(&self, tag: u8) -> Option<ValueKind> {
        self.kinds.get(&tag).copied()
    }

    /// Returns the tag registered for `kind`.
    pub fn tag_for(&self, kind: ValueKind) -> Option<u8> {
        self.tags.get(&kind).copied()
    }

    /// Returns true if values of `kind` can be written with this layout.
    pub fn supports(&self, kind: ValueKind) -> bool {
        self.tags.contains_key(&kind)
    }
}

lazy_static! {
    static ref CURRENT: TypeTable = TypeTable::from_leaves(
        "current",
        [
            Some(ValueKind::Element),
            Some(ValueKind::Int),
            Some(ValueKind::Float),
            Some(ValueKind::Bool),
            Some(ValueKind::String),
            Some(ValueKind::Binary),
            Some(ValueKind::Time),
            Some(ValueKind::Color),
            Some(ValueKind::Vector2),
            Some(ValueKind::Vector3),
            Some(ValueKind::Vector4),
            Some(ValueKind::Angle),
            Some(ValueKind::Quaternion),
            Some(ValueKind::Matrix),
        ],
    );
    static ref LEGACY: TypeTable = TypeTable::from_leaves(
        "legacy",
        [
            Some(ValueKind::Element),
            Some(ValueKind::Int),
            Some(ValueKind::Float),
            Some(ValueKind::Bool),
            Some(ValueKind::String),
            Some(ValueKind::Binary),
            Some(ValueKind::ObjectId),
            Some(ValueKind::Color),
            Some(ValueKind::Vector2),
            Some(ValueKind::Vector3),
            Some(ValueKind::Vector4),
            Some(ValueKind::Angle),
            Some(ValueKind::Quaternion),
            None,
        ],
    );
}

/// Returns the tag layout for an (encoding, version) pair, or `None` if the
/// pair is not recognized.
pub fn table(encoding: Encoding, version: i32) -> Option<&'static TypeTable> {
    match (encoding, version) {
        (Encoding::Binary, 2) | (Encoding::KeyValues2, 1) => Some(&*LEGACY),
        (Encoding::Binary, 5) | (Encoding::KeyValues2, 2) => Some(&*CURRENT),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_layout() {
        let t = table(Encoding::Binary, 5).unwrap();
        assert_eq!(t.kind_for(1), Some(ValueKind::Element));
        assert_eq!(t.kind_for(7), Some(ValueKind::Time));
        assert_eq!(t.kind_for(14), Some(ValueKind::Matrix));
        assert_eq!(t.kind_for(15), Some(ValueKind::ElementArray));
        assert_eq!(t.kind_for(21), Some(ValueKind::TimeArray));
        assert_eq!(t.kind_for(28), Some(ValueKind::MatrixArray));
        assert!(!t.supports(ValueKind::ObjectId));
    }

    #[test]
    fn test_legacy_layout() {
        let t = table(Encoding::KeyValues2, 1).unwrap();
        assert_eq!(t.kind_for(7), Some(ValueKind::ObjectId));
        assert_eq!(t.kind_for(21), Some(ValueKind::ObjectIdArray));
        assert_eq!(t.kind_for(14), None);
        assert_eq!(t.kind_for(28), None);
        assert_eq!(t.tag_for(ValueKind::Quaternion), Some(13));
        assert!(!t.supports(ValueKind::Time));
        assert!(!t.supports(ValueKind::Matrix));
    }

    #[test]
    fn test_tags_are_inverse() {
        for (encoding, version) in [
            (Encoding::Binary, 2),
            (Encoding::Binary, 5),
            (Encoding::KeyValues2, 1),
            (Encoding::KeyValues2, 2),
        ] {
            let t = table(encoding, version).unwrap();
            for tag in 0..=u8::MAX {
                if let Some(kind) = t.kind_for(tag) {
                    assert_eq!(t.tag_for(kind), Some(tag));
                }
            }
        }
    }

    #[test]
    fn test_unknown_tags_and_pairs() {
        let t = table(Encoding::Binary, 5).unwrap();
        assert_eq!(t.kind_for(0), None);
        assert_eq!(t.kind_for(29), None);
        assert!(table(Encoding::Binary, 4).is_none());
        assert!(table(Encoding::KeyValues2, 3).is_none());
    }
}
