//! KeyValues2 serializer.
//!
//! The root is written as the first top-level block, followed by one
//! top-level block for every other reachable element with more than one
//! user. Every other element is written inline at its single point of use,
//! so each element is defined exactly once and referenced by id elsewhere.

use std::fmt::Write as _;

use tracing::debug;

use crate::codec::header::Header;
use crate::codec::keyvalues2::lexer::escape;
use crate::codec::registry::TypeTable;
use crate::codec::Encoding;
use crate::error::EncodeError;
use crate::limits::MAX_NESTING_DEPTH;
use crate::model::{format_id, DataModel, ElementHandle, Time, Value};
use crate::walk::{discovery_order, user_counts, UserCounts};

/// Formats a float with ten decimals, then trims trailing zeros and a
/// trailing dot: `1.5` becomes `"1.5"`, `2.0` becomes `"2"`.
pub fn format_float(value: f64) -> String {
    let mut text = format!("{value:.10}");
    if text.contains('.') {
        let trimmed = text.trim_end_matches('0').trim_end_matches('.').len();
        text.truncate(trimmed);
    }
    text
}

fn format_floats(values: &[f32]) -> String {
    values
        .iter()
        .map(|&v| format_float(v.into()))
        .collect::<Vec<_>>()
        .join(" ")
}

fn format_time(time: Time) -> String {
    format_float(time.seconds())
}

struct Kv2Writer<'m, 't> {
    model: &'m DataModel,
    root: ElementHandle,
    users: UserCounts,
    table: &'t TypeTable,
    version: i32,
    out: String,
    /// Single-use elements pushed out of line by the nesting limit.
    deferred: Vec<ElementHandle>,
}

/// Serializes the graph reachable from the model's root.
pub fn encode_keyvalues2(
    model: &DataModel,
    header: &Header,
    table: &TypeTable,
) -> Result<Vec<u8>, EncodeError> {
    let Some(root) = model.root() else {
        return Err(EncodeError::EmptyModel);
    };
    let order = discovery_order(model);
    let users = user_counts(model);

    let mut writer = Kv2Writer {
        model,
        root,
        users,
        table,
        version: header.encoding_version,
        out: header.to_line(),
        deferred: Vec::new(),
    };

    let mut blocks = 0usize;
    for &handle in &order {
        if handle == root || writer.users.get(handle) > 1 {
            writer.top_level(handle)?;
            blocks += 1;
        }
    }
    let mut next = 0;
    while let Some(&handle) = writer.deferred.get(next) {
        writer.top_level(handle)?;
        next += 1;
    }

    debug!(
        elements = order.len(),
        top_level_blocks = blocks + next,
        "wrote keyvalues2 body"
    );
    Ok(writer.out.into_bytes())
}

impl Kv2Writer<'_, '_> {
    fn indent(&mut self, depth: usize) {
        for _ in 0..depth {
            self.out.push('\t');
        }
    }

    fn top_level(&mut self, element: ElementHandle) -> Result<(), EncodeError> {
        self.block(element, 0)?;
        self.out.push_str("\n\n");
        Ok(())
    }

    /// Whether a reference target is written inline at `depth`.
    fn inline_at(&mut self, target: ElementHandle, depth: usize) -> bool {
        if target == self.root || self.users.get(target) != 1 {
            return false;
        }
        if depth >= MAX_NESTING_DEPTH {
            self.deferred.push(target);
            return false;
        }
        true
    }

    /// Writes `"Type"` and the braced body. The cursor is left after `}`.
    fn block(&mut self, handle: ElementHandle, depth: usize) -> Result<(), EncodeError> {
        let element = &self.model[handle];
        let _ = writeln!(self.out, "\"{}\"", escape(element.element_type()));
        self.indent(depth);
        self.out.push_str("{\n");

        self.indent(depth + 1);
        let _ = writeln!(self.out, "\"id\" \"elementid\" \"{}\"", format_id(element.id()));
        self.indent(depth + 1);
        let _ = writeln!(self.out, "\"name\" \"string\" \"{}\"", escape(element.name()));

        for attribute in element.attributes() {
            let kind = attribute.kind();
            if !self.table.supports(kind) {
                return Err(EncodeError::UnsupportedKind {
                    kind,
                    encoding: Encoding::KeyValues2,
                    version: self.version,
                });
            }
            self.indent(depth + 1);
            let _ = write!(self.out, "\"{}\" ", escape(attribute.name()));
            self.attribute_value(attribute.value(), depth + 1)?;
            self.out.push('\n');
        }

        self.indent(depth);
        self.out.push('}');
        Ok(())
    }

    /// Writes an element reference: an inline block or `"element" "<id>"`.
    fn reference(&mut self, target: Option<ElementHandle>, depth: usize) -> Result<(), EncodeError> {
        match target {
            Some(target) if self.inline_at(target, depth) => self.block(target, depth),
            Some(target) => {
                let id = format_id(self.model[target].id());
                let _ = write!(self.out, "\"element\" \"{id}\"");
                Ok(())
            }
            None => {
                self.out.push_str("\"element\" \"\"");
                Ok(())
            }
        }
    }

    fn attribute_value(&mut self, value: &Value, depth: usize) -> Result<(), EncodeError> {
        let kind = value.kind();
        match value {
            Value::Element(target) => return self.reference(*target, depth),
            Value::ElementArray(items) => {
                let _ = write!(self.out, "\"{kind}\"");
                if items.is_empty() {
                    self.out.push_str(" [ ]");
                    return Ok(());
                }
                self.out.push('\n');
                self.indent(depth);
                self.out.push_str("[\n");
                for (i, item) in items.iter().enumerate() {
                    self.indent(depth + 1);
                    self.reference(*item, depth + 1)?;
                    self.out.push_str(if i + 1 < items.len() { ",\n" } else { "\n" });
                }
                self.indent(depth);
                self.out.push(']');
                return Ok(());
            }
            _ => {}
        }

        let _ = write!(self.out, "\"{kind}\" ");
        let items: Vec<String> = match value {
            // Written above.
            Value::Element(_) | Value::ElementArray(_) => return Ok(()),
            Value::Int(v) => return self.scalar(&v.to_string()),
            Value::Float(v) => return self.scalar(&format_float((*v).into())),
            Value::Bool(v) => return self.scalar(if *v { "1" } else { "0" }),
            Value::String(s) => return self.scalar(&escape(s)),
            Value::Binary(bytes) => return self.scalar(&hex::encode(bytes)),
            Value::ObjectId(id) => return self.scalar(&format_id(id)),
            Value::Time(t) => return self.scalar(&format_time(*t)),
            Value::Color(v) => return self.scalar(&format_floats(v.as_slice())),
            Value::Vector2(v) => return self.scalar(&format_floats(v.as_slice())),
            Value::Vector3(v) => return self.scalar(&format_floats(v.as_slice())),
            Value::Vector4(v) => return self.scalar(&format_floats(v.as_slice())),
            Value::Angle(v) => return self.scalar(&format_floats(v.as_slice())),
            Value::Quaternion(v) => return self.scalar(&format_floats(v.as_slice())),
            Value::Matrix(v) => return self.scalar(&format_floats(v.as_slice())),
            Value::IntArray(items) => items.iter().map(i32::to_string).collect(),
            Value::FloatArray(items) => items.iter().map(|&v| format_float(v.into())).collect(),
            Value::BoolArray(items) => items
                .iter()
                .map(|&v| if v { "1" } else { "0" }.to_string())
                .collect(),
            Value::StringArray(items) => items.iter().map(|s| escape(s).into_owned()).collect(),
            Value::BinaryArray(items) => items.iter().map(hex::encode).collect(),
            Value::ObjectIdArray(items) => items.iter().map(format_id).collect(),
            Value::TimeArray(items) => items.iter().map(|&t| format_time(t)).collect(),
            Value::ColorArray(items) => items.iter().map(|v| format_floats(v.as_slice())).collect(),
            Value::Vector2Array(items) => items.iter().map(|v| format_floats(v.as_slice())).collect(),
            Value::Vector3Array(items) => items.iter().map(|v| format_floats(v.as_slice())).collect(),
            Value::Vector4Array(items) => items.iter().map(|v| format_floats(v.as_slice())).collect(),
            Value::AngleArray(items) => items.iter().map(|v| format_floats(v.as_slice())).collect(),
            Value::QuaternionArray(items) => {
                items.iter().map(|v| format_floats(v.as_slice())).collect()
            }
            Value::MatrixArray(items) => items.iter().map(|v| format_floats(v.as_slice())).collect(),
        };

        if items.is_empty() {
            self.out.push_str("[ ]");
        } else {
            self.out.push_str("[ ");
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    self.out.push_str(", ");
                }
                let _ = write!(self.out, "\"{item}\"");
            }
            self.out.push_str(" ]");
        }
        Ok(())
    }

    fn scalar(&mut self, text: &str) -> Result<(), EncodeError> {
        let _ = write!(self.out, "\"{text}\"");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode;
    use crate::model::{derived_id, Matrix, Vector3};

    fn text(dm: &DataModel, version: i32) -> String {
        String::from_utf8(encode(dm, Encoding::KeyValues2, version).unwrap()).unwrap()
    }

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(5.0), "5");
        assert_eq!(format_float(1.5), "1.5");
        assert_eq!(format_float(-0.25), "-0.25");
        assert_eq!(format_float(100.0), "100");
        assert_eq!(format_float(1e-12), "0");
        assert_eq!(format_float(f64::INFINITY), "inf");
        assert_eq!(format_float(0.1f32.into()), "0.1000000015");
    }

    #[test]
    fn test_scalar_lines() {
        let mut dm = DataModel::new("model", 1).unwrap();
        let root = dm
            .add_element_with_id("e1", "DmElement", derived_id(b"e1"))
            .unwrap();
        dm.add_attribute(root, "x", 5).unwrap();
        dm.add_attribute(root, "s", "hi").unwrap();
        dm.add_attribute(root, "on", true).unwrap();
        dm.add_attribute(root, "pos", Vector3([1.0, 2.5, -3.0])).unwrap();
        dm.add_attribute(root, "blob", Value::Binary(vec![0xde, 0xad])).unwrap();
        dm.add_attribute(root, "q", "say \"hi\"").unwrap();

        let out = text(&dm, 1);
        let expected = format!(
            "<!-- dmx encoding keyvalues2 1 format model 1 -->\n\
             \"DmElement\"\n\
             {{\n\
             \t\"id\" \"elementid\" \"{}\"\n\
             \t\"name\" \"string\" \"e1\"\n\
             \t\"x\" \"int\" \"5\"\n\
             \t\"s\" \"string\" \"hi\"\n\
             \t\"on\" \"bool\" \"1\"\n\
             \t\"pos\" \"vector3\" \"1 2.5 -3\"\n\
             \t\"blob\" \"binary\" \"dead\"\n\
             \t\"q\" \"string\" \"say \\\"hi\\\"\"\n\
             }}\n\n",
            format_id(&derived_id(b"e1"))
        );
        assert_eq!(out, expected);
    }

    #[test]
    fn test_single_use_element_is_inlined() {
        let mut dm = DataModel::new("model", 1).unwrap();
        let root = dm.add_element("root", "DmElement").unwrap();
        let child = dm.add_element("child", "DmeChild").unwrap();
        dm.add_attribute(root, "child", child).unwrap();

        let out = text(&dm, 2);
        assert!(out.contains("\t\"child\" \"DmeChild\"\n\t{\n\t\t\"id\" \"elementid\""));
        assert_eq!(out.matches("\"elementid\"").count(), 2);
        assert!(!out.contains("\"element\" \""));
    }

    #[test]
    fn test_shared_element_defined_once() {
        let mut dm = DataModel::new("model", 1).unwrap();
        let root = dm.add_element("root", "DmElement").unwrap();
        let shared = dm.add_element("shared", "DmElement").unwrap();
        dm.add_attribute(root, "a", shared).unwrap();
        dm.add_attribute(root, "b", shared).unwrap();

        let out = text(&dm, 2);
        let id = format_id(dm[shared].id());
        assert_eq!(out.matches(&format!("\"elementid\" \"{id}\"")).count(), 1);
        assert_eq!(out.matches(&format!("\"element\" \"{id}\"")).count(), 2);
        // The definition is its own top-level block, after the root.
        assert!(out.contains(&format!("}}\n\n\"DmElement\"\n{{\n\t\"id\" \"elementid\" \"{id}\"")));
    }

    #[test]
    fn test_arrays() {
        let mut dm = DataModel::new("model", 1).unwrap();
        let root = dm.add_element("root", "DmElement").unwrap();
        let item = dm.add_element("item", "DmElement").unwrap();
        dm.add_attribute(root, "ints", vec![1, 2, 3]).unwrap();
        dm.add_attribute(root, "none", Value::FloatArray(vec![])).unwrap();
        dm.add_attribute(root, "kids", Value::ElementArray(vec![Some(item), None]))
            .unwrap();
        dm.add_attribute(root, "nokids", Value::ElementArray(vec![])).unwrap();

        let out = text(&dm, 2);
        assert!(out.contains("\t\"ints\" \"int_array\" [ \"1\", \"2\", \"3\" ]\n"));
        assert!(out.contains("\t\"none\" \"float_array\" [ ]\n"));
        assert!(out.contains("\t\"kids\" \"element_array\"\n\t[\n\t\t\"DmElement\"\n\t\t{\n"));
        assert!(out.contains("\t\t},\n\t\t\"element\" \"\"\n\t]\n"));
        assert!(out.contains("\t\"nokids\" \"element_array\" [ ]\n"));
    }

    #[test]
    fn test_version_restricts_kinds() {
        let mut dm = DataModel::new("model", 1).unwrap();
        let root = dm.add_element("root", "DmElement").unwrap();
        dm.add_attribute(root, "m", Matrix::IDENTITY).unwrap();

        assert!(matches!(
            encode(&dm, Encoding::KeyValues2, 1),
            Err(EncodeError::UnsupportedKind { version: 1, .. })
        ));
        assert!(encode(&dm, Encoding::KeyValues2, 2).is_ok());
    }

    #[test]
    fn test_unreachable_not_written() {
        let mut dm = DataModel::new("model", 1).unwrap();
        dm.add_element("root", "DmElement").unwrap();
        let orphan = dm.add_element("orphan", "DmOrphan").unwrap();
        dm.add_attribute(orphan, "x", 1).unwrap();

        let out = text(&dm, 2);
        assert!(!out.contains("orphan"));
        assert!(!out.contains("DmOrphan"));
    }

    #[test]
    fn test_deep_chain_spills_to_top_level() {
        let mut dm = DataModel::new("model", 1).unwrap();
        let mut prev = dm.add_element("e0", "DmElement").unwrap();
        let depth = MAX_NESTING_DEPTH + 10;
        for i in 1..=depth {
            let next = dm.add_element(format!("e{i}"), "DmElement").unwrap();
            dm.add_attribute(prev, "next", next).unwrap();
            prev = next;
        }

        let out = text(&dm, 2);
        assert_eq!(out.matches("\"elementid\"").count(), depth + 1);
        assert_eq!(out.matches("\"element\" \"").count(), 1);
    }
}
