//! The binary encoding.
//!
//! ```text
//! header line, NUL
//! i32 dictionary size, dictionary entries (NUL-terminated)
//! i32 element count, per element: i32 type, i32 name, 16-byte id
//! per element: i32 attribute count,
//!              per attribute: i32 name, u8 type tag, value
//! ```
//!
//! Element names, element types, attribute names and scalar string values are
//! dictionary indices. String array members are always literal NUL-terminated
//! strings. Element references are indices into the element table, which is
//! the discovery preorder of the graph; `-1` is a null reference.

use tracing::debug;

use crate::codec::header::Header;
use crate::codec::primitives::{clamp_capacity, Reader, Writer};
use crate::codec::registry::TypeTable;
use crate::codec::Encoding;
use crate::error::{DecodeError, EncodeError};
use crate::limits::{
    MAX_ARRAY_LEN, MAX_ATTRIBUTES_PER_ELEMENT, MAX_BINARY_LEN, MAX_DICT_SIZE, MAX_ELEMENTS,
    MAX_STRING_LEN,
};
use crate::model::{
    Angle, Color, DataModel, ElementHandle, Matrix, Quaternion, Time, Value, ValueKind, Vector2,
    Vector3, Vector4,
};
use crate::walk::{discovery_order, string_dictionary, StringDictionary};

/// Wire value of a null element reference.
const NULL_ELEMENT_INDEX: i32 = -1;

// =============================================================================
// ENCODING
// =============================================================================

struct EncodeContext<'t> {
    strings: StringDictionary,
    /// Element table position per arena slot; `-1` for unreachable elements.
    positions: Vec<i32>,
    table: &'t TypeTable,
    version: i32,
}

impl EncodeContext<'_> {
    fn string_index(&mut self, s: &str) -> i32 {
        // Every indexed string was recorded by the dictionary walk, so this
        // never grows the table.
        self.strings.add(s) as i32
    }

    fn element_index(&self, target: Option<ElementHandle>) -> i32 {
        target.map_or(NULL_ELEMENT_INDEX, |h| self.positions[h.index()])
    }
}

/// Encodes the graph reachable from the model's root.
pub fn encode_binary(
    model: &DataModel,
    header: &Header,
    table: &TypeTable,
) -> Result<Vec<u8>, EncodeError> {
    let order = discovery_order(model);
    let strings = string_dictionary(model);
    check_limit("string dictionary", strings.len(), MAX_DICT_SIZE)?;
    check_limit("element table", order.len(), MAX_ELEMENTS)?;

    let mut positions = vec![NULL_ELEMENT_INDEX; model.len()];
    for (position, handle) in order.iter().enumerate() {
        positions[handle.index()] = position as i32;
    }

    debug!(
        elements = order.len(),
        strings = strings.len(),
        "writing binary body"
    );

    let mut writer = Writer::with_capacity(256 + 64 * order.len());
    writer.write_bytes(header.to_line().as_bytes());
    writer.write_byte(0);

    writer.write_i32(strings.len() as i32);
    for s in strings.strings() {
        check_limit("dictionary entry", s.len(), MAX_STRING_LEN)?;
        writer.write_cstring(s);
    }

    let mut ctx = EncodeContext {
        strings,
        positions,
        table,
        version: header.encoding_version,
    };

    writer.write_i32(order.len() as i32);
    for &handle in &order {
        let element = &model[handle];
        let type_index = ctx.string_index(element.element_type());
        let name_index = ctx.string_index(element.name());
        writer.write_i32(type_index);
        writer.write_i32(name_index);
        writer.write_id(element.id());
    }

    for &handle in &order {
        let element = &model[handle];
        check_limit("attribute count", element.len(), MAX_ATTRIBUTES_PER_ELEMENT)?;
        writer.write_i32(element.len() as i32);
        for attribute in element.attributes() {
            let kind = attribute.kind();
            let tag = ctx
                .table
                .tag_for(kind)
                .ok_or(EncodeError::UnsupportedKind {
                    kind,
                    encoding: Encoding::Binary,
                    version: ctx.version,
                })?;
            let name_index = ctx.string_index(attribute.name());
            writer.write_i32(name_index);
            writer.write_byte(tag);
            encode_value(&mut writer, attribute.value(), &mut ctx)?;
        }
    }

    Ok(writer.into_bytes())
}

fn check_limit(field: &'static str, len: usize, max: usize) -> Result<(), EncodeError> {
    if len > max {
        return Err(EncodeError::LengthExceedsLimit { field, len, max });
    }
    Ok(())
}

fn write_count(writer: &mut Writer, len: usize) -> Result<(), EncodeError> {
    check_limit("array", len, MAX_ARRAY_LEN)?;
    writer.write_i32(len as i32);
    Ok(())
}

fn write_blob(writer: &mut Writer, bytes: &[u8]) -> Result<(), EncodeError> {
    check_limit("binary", bytes.len(), MAX_BINARY_LEN)?;
    writer.write_bytes_prefixed(bytes);
    Ok(())
}

fn encode_value(writer: &mut Writer, value: &Value, ctx: &mut EncodeContext<'_>) -> Result<(), EncodeError> {
    match value {
        Value::Element(target) => writer.write_i32(ctx.element_index(*target)),
        Value::Int(v) => writer.write_i32(*v),
        Value::Float(v) => writer.write_f32(*v),
        Value::Bool(v) => writer.write_bool(*v),
        Value::String(s) => {
            check_limit("string", s.len(), MAX_STRING_LEN)?;
            let index = ctx.string_index(s);
            writer.write_i32(index);
        }
        Value::Binary(bytes) => write_blob(writer, bytes)?,
        Value::ObjectId(id) => writer.write_id(id),
        Value::Time(t) => writer.write_i32(t.ticks()),
        Value::Color(v) => writer.write_f32s(v.as_slice()),
        Value::Vector2(v) => writer.write_f32s(v.as_slice()),
        Value::Vector3(v) => writer.write_f32s(v.as_slice()),
        Value::Vector4(v) => writer.write_f32s(v.as_slice()),
        Value::Angle(v) => writer.write_f32s(v.as_slice()),
        Value::Quaternion(v) => writer.write_f32s(v.as_slice()),
        Value::Matrix(v) => writer.write_f32s(v.as_slice()),
        Value::ElementArray(items) => {
            write_count(writer, items.len())?;
            for item in items {
                writer.write_i32(ctx.element_index(*item));
            }
        }
        Value::IntArray(items) => {
            write_count(writer, items.len())?;
            for &v in items {
                writer.write_i32(v);
            }
        }
        Value::FloatArray(items) => {
            write_count(writer, items.len())?;
            writer.write_f32s(items);
        }
        Value::BoolArray(items) => {
            write_count(writer, items.len())?;
            for &v in items {
                writer.write_bool(v);
            }
        }
        Value::StringArray(items) => {
            write_count(writer, items.len())?;
            for s in items {
                check_limit("string", s.len(), MAX_STRING_LEN)?;
                writer.write_cstring(s);
            }
        }
        Value::BinaryArray(items) => {
            write_count(writer, items.len())?;
            for bytes in items {
                write_blob(writer, bytes)?;
            }
        }
        Value::ObjectIdArray(items) => {
            write_count(writer, items.len())?;
            for id in items {
                writer.write_id(id);
            }
        }
        Value::TimeArray(items) => {
            write_count(writer, items.len())?;
            for t in items {
                writer.write_i32(t.ticks());
            }
        }
        Value::ColorArray(items) => write_blocks(writer, items, Color::as_slice)?,
        Value::Vector2Array(items) => write_blocks(writer, items, Vector2::as_slice)?,
        Value::Vector3Array(items) => write_blocks(writer, items, Vector3::as_slice)?,
        Value::Vector4Array(items) => write_blocks(writer, items, Vector4::as_slice)?,
        Value::AngleArray(items) => write_blocks(writer, items, Angle::as_slice)?,
        Value::QuaternionArray(items) => write_blocks(writer, items, Quaternion::as_slice)?,
        Value::MatrixArray(items) => write_blocks(writer, items, Matrix::as_slice)?,
    }
    Ok(())
}

fn write_blocks<T>(
    writer: &mut Writer,
    items: &[T],
    ordinates: fn(&T) -> &[f32],
) -> Result<(), EncodeError> {
    write_count(writer, items.len())?;
    for item in items {
        writer.write_f32s(ordinates(item));
    }
    Ok(())
}

// =============================================================================
// DECODING
// =============================================================================

struct DecodeContext<'t> {
    strings: Vec<String>,
    elements: Vec<ElementHandle>,
    table: &'t TypeTable,
    version: i32,
}

impl DecodeContext<'_> {
    fn string(&self, index: i32) -> Result<&str, DecodeError> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.strings.get(i))
            .map(String::as_str)
            .ok_or(DecodeError::IndexOutOfBounds {
                dict: "string dictionary",
                index: index.into(),
                size: self.strings.len(),
            })
    }

    fn element(&self, index: i32) -> Result<Option<ElementHandle>, DecodeError> {
        if index == NULL_ELEMENT_INDEX {
            return Ok(None);
        }
        usize::try_from(index)
            .ok()
            .and_then(|i| self.elements.get(i))
            .map(|h| Some(*h))
            .ok_or(DecodeError::IndexOutOfBounds {
                dict: "element table",
                index: index.into(),
                size: self.elements.len(),
            })
    }
}

/// Decodes the body that follows a binary header line into `model`.
///
/// `input` starts right after the header's newline, at the NUL terminator.
pub fn decode_binary(
    input: &[u8],
    mut model: DataModel,
    header: &Header,
    table: &TypeTable,
) -> Result<DataModel, DecodeError> {
    let mut reader = Reader::new(input);
    if reader.read_byte("header terminator")? != 0 {
        return Err(DecodeError::MalformedHeader {
            reason: "binary header is not followed by NUL",
        });
    }

    let string_count = reader.read_len(MAX_DICT_SIZE, "string dictionary")?;
    let mut strings = Vec::with_capacity(clamp_capacity(string_count, 1, reader.remaining_len()));
    for _ in 0..string_count {
        strings.push(reader.read_cstring(MAX_STRING_LEN, "dictionary entry")?);
    }

    let mut ctx = DecodeContext {
        strings,
        elements: Vec::new(),
        table,
        version: header.encoding_version,
    };

    let element_count = reader.read_len(MAX_ELEMENTS, "element table")?;
    ctx.elements
        .reserve(clamp_capacity(element_count, 24, reader.remaining_len()));
    for _ in 0..element_count {
        let element_type = ctx.string(reader.read_i32("element type")?)?.to_string();
        let name = ctx.string(reader.read_i32("element name")?)?.to_string();
        let id = reader.read_id("element id")?;
        let handle = model.add_element_with_id(name, element_type, id)?;
        ctx.elements.push(handle);
    }

    debug!(
        elements = element_count,
        strings = ctx.strings.len(),
        "read binary element table"
    );

    for &handle in &ctx.elements {
        let attribute_count = reader.read_len(MAX_ATTRIBUTES_PER_ELEMENT, "attribute count")?;
        for _ in 0..attribute_count {
            let name = ctx.string(reader.read_i32("attribute name")?)?.to_string();
            let tag = reader.read_byte("type tag")?;
            let kind = ctx.table.kind_for(tag).ok_or(DecodeError::UnknownTypeTag {
                tag,
                encoding: Encoding::Binary,
                version: ctx.version,
            })?;
            let value = decode_value(&mut reader, kind, &ctx)?;
            model.add_attribute(handle, name, value)?;
        }
    }

    Ok(model)
}

fn read_items<'a, T>(
    reader: &mut Reader<'a>,
    item_size: usize,
    mut read: impl FnMut(&mut Reader<'a>) -> Result<T, DecodeError>,
) -> Result<Vec<T>, DecodeError> {
    let count = reader.read_len(MAX_ARRAY_LEN, "array")?;
    let mut items = Vec::with_capacity(clamp_capacity(count, item_size, reader.remaining_len()));
    for _ in 0..count {
        items.push(read(reader)?);
    }
    Ok(items)
}

fn decode_value(reader: &mut Reader<'_>, kind: ValueKind, ctx: &DecodeContext<'_>) -> Result<Value, DecodeError> {
    let value = match kind {
        ValueKind::Element => Value::Element(ctx.element(reader.read_i32("element")?)?),
        ValueKind::Int => Value::Int(reader.read_i32("int")?),
        ValueKind::Float => Value::Float(reader.read_f32("float")?),
        ValueKind::Bool => Value::Bool(reader.read_bool("bool")?),
        ValueKind::String => Value::String(ctx.string(reader.read_i32("string")?)?.to_string()),
        ValueKind::Binary => Value::Binary(reader.read_bytes_prefixed(MAX_BINARY_LEN, "binary")?),
        ValueKind::ObjectId => Value::ObjectId(reader.read_id("elementid")?),
        ValueKind::Time => Value::Time(Time::from_ticks(reader.read_i32("time")?)),
        ValueKind::Color => Value::Color(Color(reader.read_f32s("color")?)),
        ValueKind::Vector2 => Value::Vector2(Vector2(reader.read_f32s("vector2")?)),
        ValueKind::Vector3 => Value::Vector3(Vector3(reader.read_f32s("vector3")?)),
        ValueKind::Vector4 => Value::Vector4(Vector4(reader.read_f32s("vector4")?)),
        ValueKind::Angle => Value::Angle(Angle(reader.read_f32s("angle")?)),
        ValueKind::Quaternion => Value::Quaternion(Quaternion(reader.read_f32s("quaternion")?)),
        ValueKind::Matrix => Value::Matrix(Matrix(reader.read_f32s("matrix")?)),
        ValueKind::ElementArray => Value::ElementArray(read_items(reader, 4, |r| {
            ctx.element(r.read_i32("element")?)
        })?),
        ValueKind::IntArray => Value::IntArray(read_items(reader, 4, |r| r.read_i32("int"))?),
        ValueKind::FloatArray => Value::FloatArray(read_items(reader, 4, |r| r.read_f32("float"))?),
        ValueKind::BoolArray => Value::BoolArray(read_items(reader, 1, |r| r.read_bool("bool"))?),
        ValueKind::StringArray => Value::StringArray(read_items(reader, 1, |r| {
            r.read_cstring(MAX_STRING_LEN, "string")
        })?),
        ValueKind::BinaryArray => Value::BinaryArray(read_items(reader, 4, |r| {
            r.read_bytes_prefixed(MAX_BINARY_LEN, "binary")
        })?),
        ValueKind::ObjectIdArray => {
            Value::ObjectIdArray(read_items(reader, 16, |r| r.read_id("elementid"))?)
        }
        ValueKind::TimeArray => Value::TimeArray(read_items(reader, 4, |r| {
            r.read_i32("time").map(Time::from_ticks)
        })?),
        ValueKind::ColorArray => {
            Value::ColorArray(read_items(reader, 16, |r| r.read_f32s("color").map(Color))?)
        }
        ValueKind::Vector2Array => {
            Value::Vector2Array(read_items(reader, 8, |r| r.read_f32s("vector2").map(Vector2))?)
        }
        ValueKind::Vector3Array => {
            Value::Vector3Array(read_items(reader, 12, |r| r.read_f32s("vector3").map(Vector3))?)
        }
        ValueKind::Vector4Array => {
            Value::Vector4Array(read_items(reader, 16, |r| r.read_f32s("vector4").map(Vector4))?)
        }
        ValueKind::AngleArray => {
            Value::AngleArray(read_items(reader, 12, |r| r.read_f32s("angle").map(Angle))?)
        }
        ValueKind::QuaternionArray => Value::QuaternionArray(read_items(reader, 16, |r| {
            r.read_f32s("quaternion").map(Quaternion)
        })?),
        ValueKind::MatrixArray => {
            Value::MatrixArray(read_items(reader, 64, |r| r.read_f32s("matrix").map(Matrix))?)
        }
    };
    Ok(value)
}
