//! Error types for DMX model construction, encoding and decoding.

use thiserror::Error;

use crate::codec::Encoding;
use crate::model::{format_id, Id, ValueKind};

/// Error classes shared by both encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// E001: Unrecognized (encoding, version) pair
    UnsupportedFormat,
    /// E002: Header line absent or unparseable
    MalformedHeader,
    /// E003: End of input in the middle of a value or block
    TruncatedStream,
    /// E004: Attribute name already present on an element
    DuplicateAttribute,
    /// E005: Binary type tag with no mapping in the active table
    UnknownTypeTag,
    /// E006: Element referenced by id but never defined
    UnresolvedReference,
    /// E007: Structurally invalid input
    MalformedEncoding,
}

impl ErrorCode {
    /// Returns the error code string (e.g., "E001").
    pub fn code(&self) -> &'static str {
        match self {
            ErrorCode::UnsupportedFormat => "E001",
            ErrorCode::MalformedHeader => "E002",
            ErrorCode::TruncatedStream => "E003",
            ErrorCode::DuplicateAttribute => "E004",
            ErrorCode::UnknownTypeTag => "E005",
            ErrorCode::UnresolvedReference => "E006",
            ErrorCode::MalformedEncoding => "E007",
        }
    }
}

/// Misuse of the data-model API, rejected at construction time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("attribute {attribute:?} already exists on element {element:?}")]
    DuplicateAttribute { element: String, attribute: String },

    #[error("attribute name {name:?} is reserved")]
    ReservedAttributeName { name: String },

    #[error("{field} must not be empty")]
    EmptyName { field: &'static str },

    #[error("{field} contains a NUL byte")]
    ContainsNul { field: &'static str },

    #[error("format name {name:?} must not contain whitespace")]
    InvalidFormatName { name: String },

    #[error("element handle {index} does not belong to this model")]
    UnknownElement { index: usize },

    #[error("element id {} is already in use", format_id(.id))]
    DuplicateElementId { id: Id },
}

/// Error while reading either encoding.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    // === E001: Unsupported format ===
    #[error("[E001] unsupported encoding {encoding:?} version {version}")]
    UnsupportedFormat { encoding: String, version: i32 },

    // === E002: Malformed header ===
    #[error("[E002] malformed header: {reason}")]
    MalformedHeader { reason: &'static str },

    // === E003: Truncated stream ===
    #[error("[E003] unexpected end of input while reading {context}")]
    UnexpectedEof { context: &'static str },

    // === E004 (duplicate attribute) or E007 ===
    #[error("invalid model: {0}")]
    Model(#[from] ModelError),

    // === E005: Unknown type tag ===
    #[error("[E005] unknown type tag {tag} for {encoding} version {version}")]
    UnknownTypeTag {
        tag: u8,
        encoding: Encoding,
        version: i32,
    },

    // === E006: Unresolved reference ===
    #[error("[E006] element {} is referenced but never defined", format_id(.id))]
    UnresolvedReference { id: Id },

    // === E007: Malformed encoding ===
    #[error("[E007] {dict} index {index} out of bounds (size: {size})")]
    IndexOutOfBounds {
        dict: &'static str,
        index: i64,
        size: usize,
    },

    #[error("[E007] invalid UTF-8 in {field}")]
    InvalidUtf8 { field: &'static str },

    #[error("[E007] {field} length {len} exceeds maximum {max}")]
    LengthExceedsLimit {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("[E007] negative {field} length {len}")]
    NegativeLength { field: &'static str, len: i32 },

    #[error("[E007] line {line}: expected {expected}, found {found}")]
    UnexpectedToken {
        line: usize,
        expected: &'static str,
        found: String,
    },

    #[error("[E007] line {line}: unexpected character {found:?}")]
    UnexpectedCharacter { line: usize, found: char },

    #[error("[E007] line {line}: unknown type name {name:?}")]
    UnknownTypeName { line: usize, name: String },

    #[error("[E007] line {line}: invalid {kind} value {text:?}")]
    InvalidValue {
        line: usize,
        kind: ValueKind,
        text: String,
    },

    #[error("[E007] line {line}: invalid element id {text:?}")]
    InvalidElementId { line: usize, text: String },

    #[error("[E007] line {line}: element blocks nested deeper than {max}")]
    NestingTooDeep { line: usize, max: usize },
}

impl DecodeError {
    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            DecodeError::UnsupportedFormat { .. } => ErrorCode::UnsupportedFormat,
            DecodeError::MalformedHeader { .. } => ErrorCode::MalformedHeader,
            DecodeError::UnexpectedEof { .. } => ErrorCode::TruncatedStream,
            DecodeError::Model(err) => model_error_code(err),
            DecodeError::UnknownTypeTag { .. } => ErrorCode::UnknownTypeTag,
            DecodeError::UnresolvedReference { .. } => ErrorCode::UnresolvedReference,
            _ => ErrorCode::MalformedEncoding,
        }
    }
}

fn model_error_code(err: &ModelError) -> ErrorCode {
    match err {
        ModelError::DuplicateAttribute { .. } => ErrorCode::DuplicateAttribute,
        _ => ErrorCode::MalformedEncoding,
    }
}

/// Error while writing either encoding.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeError {
    #[error("{encoding} version {version} is not a supported write target")]
    UnsupportedFormat { encoding: Encoding, version: i32 },

    #[error("value kind {kind} has no type tag in {encoding} version {version}")]
    UnsupportedKind {
        kind: ValueKind,
        encoding: Encoding,
        version: i32,
    },

    #[error("{field} length {len} exceeds maximum {max}")]
    LengthExceedsLimit {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("model has no root element")]
    EmptyModel,
}

/// An encoding name other than `binary` or `keyvalues2`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown encoding {0:?}")]
pub struct UnknownEncoding(pub String);

/// Error from the path and stream level entry points.
#[derive(Debug, Error)]
pub enum DmxError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Encode(#[from] EncodeError),
}
