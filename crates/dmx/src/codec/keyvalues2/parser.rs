//! KeyValues2 parser.
//!
//! Parsing happens in two phases. Phase one is a recursive descent over the
//! element blocks: every block becomes an element as soon as its `{` is seen,
//! and every id-only reference becomes a null placeholder plus a [`Patch`].
//! Phase two looks up each patch target by id and fills in the placeholder,
//! so it does not matter whether a block appears before or after the
//! references to it.

use std::borrow::Cow;

use tracing::{trace, warn};

use crate::codec::keyvalues2::lexer::{Lexer, Token};
use crate::codec::ReadOptions;
use crate::error::DecodeError;
use crate::limits::{MAX_ARRAY_LEN, MAX_ATTRIBUTES_PER_ELEMENT, MAX_ELEMENTS, MAX_NESTING_DEPTH};
use crate::model::{
    parse_id, Angle, Color, DataModel, ElementHandle, Id, Matrix, Quaternion, Time, Value,
    ValueKind, Vector2, Vector3, Vector4,
};

/// Element type given to placeholders for ids that are never defined.
pub const STUB_ELEMENT_TYPE: &str = "DmElement";

/// A reference slot waiting for its target to be resolved by id.
#[derive(Debug)]
struct Patch {
    owner: ElementHandle,
    attribute: String,
    /// Position in an element array, or `None` for a scalar element attribute.
    index: Option<usize>,
    target: Id,
}

struct Parser<'a, 'o> {
    lexer: Lexer<'a>,
    model: DataModel,
    patches: Vec<Patch>,
    element_path: Option<&'o [String]>,
}

/// Parses the text that follows a keyvalues2 header line into `model`.
pub fn decode_keyvalues2(
    text: &str,
    model: DataModel,
    options: &ReadOptions,
) -> Result<DataModel, DecodeError> {
    let mut parser = Parser {
        lexer: Lexer::new(text),
        model,
        patches: Vec::new(),
        element_path: options.element_path.as_deref(),
    };
    parser.document()?;
    parser.resolve()
}

impl<'a> Parser<'a, '_> {
    fn unexpected(&self, expected: &'static str, found: &Token<'_>) -> DecodeError {
        match found {
            Token::Eof => DecodeError::UnexpectedEof { context: expected },
            other => DecodeError::UnexpectedToken {
                line: self.lexer.line(),
                expected,
                found: other.to_string(),
            },
        }
    }

    fn expect_str(&mut self, expected: &'static str) -> Result<Cow<'a, str>, DecodeError> {
        match self.lexer.next_token()? {
            Token::Str(s) => Ok(s),
            other => Err(self.unexpected(expected, &other)),
        }
    }

    fn expect(&mut self, token: Token<'static>, expected: &'static str) -> Result<(), DecodeError> {
        let found = self.lexer.next_token()?;
        if found == token {
            Ok(())
        } else {
            Err(self.unexpected(expected, &found))
        }
    }

    fn next_is_open_brace(&self) -> Result<bool, DecodeError> {
        Ok(self.lexer.peek()? == Token::OpenBrace)
    }

    /// Top level: a sequence of `"Type" { ... }` blocks.
    fn document(&mut self) -> Result<(), DecodeError> {
        loop {
            match self.lexer.next_token()? {
                Token::Eof => return Ok(()),
                Token::Str(element_type) => {
                    self.expect(Token::OpenBrace, "`{`")?;
                    self.element_body(element_type.into_owned(), 0)?;
                }
                other => return Err(self.unexpected("element type", &other)),
            }
        }
    }

    /// Parses a block body after its `{`, through the matching `}`.
    fn element_body(&mut self, element_type: String, depth: usize) -> Result<ElementHandle, DecodeError> {
        if depth > MAX_NESTING_DEPTH {
            return Err(DecodeError::NestingTooDeep {
                line: self.lexer.line(),
                max: MAX_NESTING_DEPTH,
            });
        }
        if self.model.len() >= MAX_ELEMENTS {
            return Err(DecodeError::LengthExceedsLimit {
                field: "element count",
                len: self.model.len() + 1,
                max: MAX_ELEMENTS,
            });
        }
        let handle = self.model.add_element(String::new(), element_type)?;

        let mut attributes = 0usize;
        loop {
            let name = match self.lexer.next_token()? {
                Token::CloseBrace => return Ok(handle),
                Token::Str(name) => name,
                other => return Err(self.unexpected("attribute name or `}`", &other)),
            };
            let line = self.lexer.line();
            let kind = self.expect_str("attribute type")?;

            match (name.as_ref(), kind.as_ref()) {
                ("id", "elementid") => {
                    let text = self.expect_str("element id")?;
                    let id = parse_id(&text).ok_or_else(|| DecodeError::InvalidElementId {
                        line,
                        text: text.to_string(),
                    })?;
                    self.model.reassign_id(handle, id)?;
                }
                ("name", "string") => {
                    let text = self.expect_str("element name")?;
                    self.model.set_name(handle, text.into_owned())?;
                }
                _ => {
                    attributes += 1;
                    if attributes > MAX_ATTRIBUTES_PER_ELEMENT {
                        return Err(DecodeError::LengthExceedsLimit {
                            field: "attribute count",
                            len: attributes,
                            max: MAX_ATTRIBUTES_PER_ELEMENT,
                        });
                    }
                    self.attribute(handle, name.into_owned(), kind, depth, line)?;
                }
            }
        }
    }

    /// Parses the value part of an attribute line.
    fn attribute(
        &mut self,
        owner: ElementHandle,
        name: String,
        kind_text: Cow<'a, str>,
        depth: usize,
        line: usize,
    ) -> Result<(), DecodeError> {
        if self.next_is_open_brace()? {
            self.lexer.next_token()?;
            if let Some(child) = self.nested_block(kind_text.into_owned(), depth + 1)? {
                self.model.add_attribute(owner, name, child)?;
            }
            return Ok(());
        }

        let Some(kind) = ValueKind::from_type_name(&kind_text) else {
            return Err(DecodeError::UnknownTypeName {
                line,
                name: kind_text.into_owned(),
            });
        };

        match kind {
            ValueKind::Element => {
                let text = self.expect_str("element id")?;
                let target = reference_id(&text, line)?;
                self.model
                    .add_attribute(owner, name.clone(), Value::Element(None))?;
                if let Some(target) = target {
                    self.patches.push(Patch {
                        owner,
                        attribute: name,
                        index: None,
                        target,
                    });
                }
            }
            ValueKind::ElementArray => {
                let (items, pending) = self.element_array(depth)?;
                self.model
                    .add_attribute(owner, name.clone(), Value::ElementArray(items))?;
                for (index, target) in pending {
                    self.patches.push(Patch {
                        owner,
                        attribute: name.clone(),
                        index: Some(index),
                        target,
                    });
                }
            }
            kind if kind.is_array() => {
                let items = self.string_list()?;
                let value = parse_array(kind, &items, line)?;
                self.model.add_attribute(owner, name, value)?;
            }
            kind => {
                let text = self.expect_str("attribute value")?;
                let value = parse_leaf(kind, &text, line)?;
                self.model.add_attribute(owner, name, value)?;
            }
        }
        Ok(())
    }

    /// Parses an inline block after its `{`, unless the element path filter
    /// excludes it, in which case the block is skipped and `None` returned.
    fn nested_block(
        &mut self,
        element_type: String,
        depth: usize,
    ) -> Result<Option<ElementHandle>, DecodeError> {
        if let Some(path) = self.element_path {
            if let Some(segment) = depth.checked_sub(1).and_then(|i| path.get(i)) {
                let name = self.peek_block_name()?;
                let wanted = name
                    .as_deref()
                    .is_some_and(|n| n.to_lowercase() == segment.to_lowercase());
                if !wanted {
                    trace!(
                        line = self.lexer.line(),
                        name = name.as_deref().unwrap_or(""),
                        depth,
                        "skipping element outside the element path"
                    );
                    skip_balanced(&mut self.lexer)?;
                    return Ok(None);
                }
            }
        }
        self.element_body(element_type, depth).map(Some)
    }

    /// Finds the `"name" "string"` line of the block whose `{` was just read,
    /// without consuming anything.
    fn peek_block_name(&self) -> Result<Option<String>, DecodeError> {
        let mut lexer = self.lexer.clone();
        loop {
            let Token::Str(key) = lexer.next_token()? else {
                return Ok(None);
            };
            let Token::Str(kind) = lexer.next_token()? else {
                return Ok(None);
            };
            match lexer.next_token()? {
                Token::Str(value) if key == "name" && kind == "string" => {
                    return Ok(Some(value.into_owned()));
                }
                Token::Str(_) => {}
                Token::OpenBrace | Token::OpenBracket => skip_balanced(&mut lexer)?,
                _ => return Ok(None),
            }
        }
    }

    /// Parses `[ entry, entry ]` where each entry is an inline block or an
    /// `"element" "<id>"` reference. Returns the slots and the pending
    /// (slot index, target id) pairs.
    #[allow(clippy::type_complexity)]
    fn element_array(
        &mut self,
        depth: usize,
    ) -> Result<(Vec<Option<ElementHandle>>, Vec<(usize, Id)>), DecodeError> {
        self.expect(Token::OpenBracket, "`[`")?;
        let mut items = Vec::new();
        let mut pending = Vec::new();
        loop {
            let entry = match self.lexer.next_token()? {
                Token::CloseBracket => return Ok((items, pending)),
                Token::Comma => continue,
                Token::Str(entry) => entry,
                other => return Err(self.unexpected("array entry or `]`", &other)),
            };
            if items.len() >= MAX_ARRAY_LEN {
                return Err(DecodeError::LengthExceedsLimit {
                    field: "element array",
                    len: items.len() + 1,
                    max: MAX_ARRAY_LEN,
                });
            }
            let line = self.lexer.line();
            if self.next_is_open_brace()? {
                self.lexer.next_token()?;
                if let Some(child) = self.nested_block(entry.into_owned(), depth + 1)? {
                    items.push(Some(child));
                }
            } else if entry == "element" {
                let text = self.expect_str("element id")?;
                if let Some(target) = reference_id(&text, line)? {
                    pending.push((items.len(), target));
                }
                items.push(None);
            } else {
                return Err(DecodeError::UnexpectedToken {
                    line,
                    expected: "element block or reference",
                    found: Token::Str(entry).to_string(),
                });
            }
        }
    }

    /// Parses `[ "a", "b" ]` into its raw item strings.
    fn string_list(&mut self) -> Result<Vec<Cow<'a, str>>, DecodeError> {
        self.expect(Token::OpenBracket, "`[`")?;
        let mut items = Vec::new();
        loop {
            match self.lexer.next_token()? {
                Token::CloseBracket => return Ok(items),
                Token::Comma => {}
                Token::Str(item) => {
                    if items.len() >= MAX_ARRAY_LEN {
                        return Err(DecodeError::LengthExceedsLimit {
                            field: "array",
                            len: items.len() + 1,
                            max: MAX_ARRAY_LEN,
                        });
                    }
                    items.push(item);
                }
                other => return Err(self.unexpected("array item or `]`", &other)),
            }
        }
    }

    /// Phase two: point every patched slot at its target.
    ///
    /// Ids that were never defined are an error, unless an element path was
    /// given; then a stub element stands in for each and is listed by
    /// [`DataModel::unresolved`].
    fn resolve(self) -> Result<DataModel, DecodeError> {
        let Parser {
            mut model,
            patches,
            element_path,
            ..
        } = self;

        for patch in patches {
            let target = match model.element_by_id(&patch.target) {
                Some(target) => target,
                None if element_path.is_some() => {
                    let stub =
                        model.add_element_with_id(String::new(), STUB_ELEMENT_TYPE, patch.target)?;
                    model.mark_unresolved(stub);
                    stub
                }
                None => return Err(DecodeError::UnresolvedReference { id: patch.target }),
            };
            match (model.value_mut(patch.owner, &patch.attribute), patch.index) {
                (Some(Value::Element(slot)), None) => *slot = Some(target),
                (Some(Value::ElementArray(items)), Some(index)) => {
                    if let Some(slot) = items.get_mut(index) {
                        *slot = Some(target);
                    }
                }
                _ => {}
            }
        }

        if !model.unresolved().is_empty() {
            warn!(
                count = model.unresolved().len(),
                "element references outside the element path were left unresolved"
            );
        }
        Ok(model)
    }
}

/// Consumes tokens through the bracket that closes one already consumed.
fn skip_balanced(lexer: &mut Lexer<'_>) -> Result<(), DecodeError> {
    let mut depth = 1usize;
    loop {
        match lexer.next_token()? {
            Token::OpenBrace | Token::OpenBracket => depth += 1,
            Token::CloseBrace | Token::CloseBracket => {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
            Token::Eof => {
                return Err(DecodeError::UnexpectedEof {
                    context: "skipped element block",
                })
            }
            Token::Str(_) | Token::Comma => {}
        }
    }
}

/// An empty id is a null reference.
fn reference_id(text: &str, line: usize) -> Result<Option<Id>, DecodeError> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    parse_id(text)
        .map(Some)
        .ok_or_else(|| DecodeError::InvalidElementId {
            line,
            text: text.to_string(),
        })
}

fn parse_int(text: &str) -> Option<i32> {
    text.trim().parse().ok()
}

fn parse_float(text: &str) -> Option<f32> {
    text.trim().parse().ok()
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.trim() {
        "true" => Some(true),
        "false" => Some(false),
        other => other.parse::<i64>().ok().map(|v| v != 0),
    }
}

fn parse_binary(text: &str) -> Option<Vec<u8>> {
    let digits: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(digits).ok()
}

fn parse_time(text: &str) -> Option<Time> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|s| s.is_finite())
        .map(Time::from_seconds)
}

fn parse_block<T>(text: &str, build: fn(&[f32]) -> Option<T>) -> Option<T> {
    let ordinates: Option<Vec<f32>> = text.split_whitespace().map(parse_float).collect();
    ordinates.and_then(|o| build(&o))
}

fn parse_leaf(kind: ValueKind, text: &str, line: usize) -> Result<Value, DecodeError> {
    let value = match kind {
        ValueKind::Int => parse_int(text).map(Value::Int),
        ValueKind::Float => parse_float(text).map(Value::Float),
        ValueKind::Bool => parse_bool(text).map(Value::Bool),
        ValueKind::String => Some(Value::String(text.to_string())),
        ValueKind::Binary => parse_binary(text).map(Value::Binary),
        ValueKind::ObjectId => parse_id(text).map(Value::ObjectId),
        ValueKind::Time => parse_time(text).map(Value::Time),
        ValueKind::Color => parse_block(text, Color::from_slice).map(Value::Color),
        ValueKind::Vector2 => parse_block(text, Vector2::from_slice).map(Value::Vector2),
        ValueKind::Vector3 => parse_block(text, Vector3::from_slice).map(Value::Vector3),
        ValueKind::Vector4 => parse_block(text, Vector4::from_slice).map(Value::Vector4),
        ValueKind::Angle => parse_block(text, Angle::from_slice).map(Value::Angle),
        ValueKind::Quaternion => parse_block(text, Quaternion::from_slice).map(Value::Quaternion),
        ValueKind::Matrix => parse_block(text, Matrix::from_slice).map(Value::Matrix),
        // References and arrays are not single strings.
        ValueKind::Element
        | ValueKind::ElementArray
        | ValueKind::IntArray
        | ValueKind::FloatArray
        | ValueKind::BoolArray
        | ValueKind::StringArray
        | ValueKind::BinaryArray
        | ValueKind::ObjectIdArray
        | ValueKind::TimeArray
        | ValueKind::ColorArray
        | ValueKind::Vector2Array
        | ValueKind::Vector3Array
        | ValueKind::Vector4Array
        | ValueKind::AngleArray
        | ValueKind::QuaternionArray
        | ValueKind::MatrixArray => None,
    };
    value.ok_or_else(|| DecodeError::InvalidValue {
        line,
        kind,
        text: text.to_string(),
    })
}

fn parse_items<T>(
    items: &[Cow<'_, str>],
    kind: ValueKind,
    line: usize,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<Vec<T>, DecodeError> {
    items
        .iter()
        .map(|item| {
            parse(item.as_ref()).ok_or_else(|| DecodeError::InvalidValue {
                line,
                kind: kind.item_kind(),
                text: item.to_string(),
            })
        })
        .collect()
}

fn parse_array(kind: ValueKind, items: &[Cow<'_, str>], line: usize) -> Result<Value, DecodeError> {
    let value = match kind {
        ValueKind::IntArray => Value::IntArray(parse_items(items, kind, line, parse_int)?),
        ValueKind::FloatArray => Value::FloatArray(parse_items(items, kind, line, parse_float)?),
        ValueKind::BoolArray => Value::BoolArray(parse_items(items, kind, line, parse_bool)?),
        ValueKind::StringArray => {
            Value::StringArray(items.iter().map(|item| item.to_string()).collect())
        }
        ValueKind::BinaryArray => Value::BinaryArray(parse_items(items, kind, line, parse_binary)?),
        ValueKind::ObjectIdArray => Value::ObjectIdArray(parse_items(items, kind, line, parse_id)?),
        ValueKind::TimeArray => Value::TimeArray(parse_items(items, kind, line, parse_time)?),
        ValueKind::ColorArray => Value::ColorArray(parse_items(items, kind, line, |t| {
            parse_block(t, Color::from_slice)
        })?),
        ValueKind::Vector2Array => Value::Vector2Array(parse_items(items, kind, line, |t| {
            parse_block(t, Vector2::from_slice)
        })?),
        ValueKind::Vector3Array => Value::Vector3Array(parse_items(items, kind, line, |t| {
            parse_block(t, Vector3::from_slice)
        })?),
        ValueKind::Vector4Array => Value::Vector4Array(parse_items(items, kind, line, |t| {
            parse_block(t, Vector4::from_slice)
        })?),
        ValueKind::AngleArray => Value::AngleArray(parse_items(items, kind, line, |t| {
            parse_block(t, Angle::from_slice)
        })?),
        ValueKind::QuaternionArray => Value::QuaternionArray(parse_items(items, kind, line, |t| {
            parse_block(t, Quaternion::from_slice)
        })?),
        ValueKind::MatrixArray => Value::MatrixArray(parse_items(items, kind, line, |t| {
            parse_block(t, Matrix::from_slice)
        })?),
        // Element arrays have their own grammar; leaves are not lists.
        ValueKind::ElementArray
        | ValueKind::Element
        | ValueKind::Int
        | ValueKind::Float
        | ValueKind::Bool
        | ValueKind::String
        | ValueKind::Binary
        | ValueKind::ObjectId
        | ValueKind::Time
        | ValueKind::Color
        | ValueKind::Vector2
        | ValueKind::Vector3
        | ValueKind::Vector4
        | ValueKind::Angle
        | ValueKind::Quaternion
        | ValueKind::Matrix => {
            return Err(DecodeError::InvalidValue {
                line,
                kind,
                text: String::from("[ ... ]"),
            });
        }
    };
    Ok(value)
}
