//! Reading and writing DMX files.
//!
//! Every file starts with a header line naming its encoding:
//!
//! ```text
//! <!-- dmx encoding binary 5 format model 18 -->
//! ```
//!
//! The entry points here parse or emit that line and dispatch to the
//! [`binary`] or [`keyvalues2`] codec. Supported pairs are binary 5
//! (plus binary 2 for reading) and keyvalues2 1 and 2.

pub mod binary;
pub mod header;
pub mod keyvalues2;
pub mod primitives;
pub mod registry;

use std::fmt;
use std::io::{Read, Write};
use std::path::Path;
use std::str::FromStr;

use tracing::debug;

use crate::error::{DecodeError, DmxError, EncodeError, UnknownEncoding};
use crate::model::DataModel;

pub use binary::{decode_binary, encode_binary};
pub use header::Header;
pub use keyvalues2::{decode_keyvalues2, encode_keyvalues2};
pub use primitives::{Reader, Writer};
pub use registry::TypeTable;

/// The two DMX encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// Compact binary encoding with an interned string dictionary.
    Binary,
    /// Human-readable brace/quoted-string text encoding.
    KeyValues2,
}

impl Encoding {
    /// Returns the name used in the header line.
    pub fn as_str(self) -> &'static str {
        match self {
            Encoding::Binary => "binary",
            Encoding::KeyValues2 => "keyvalues2",
        }
    }

    /// Returns true if models can be written in this encoding at `version`.
    ///
    /// Binary version 2 can be read but is not a write target.
    pub fn is_write_target(self, version: i32) -> bool {
        matches!(
            (self, version),
            (Encoding::Binary, 5) | (Encoding::KeyValues2, 1 | 2)
        )
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Encoding {
    type Err = UnknownEncoding;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "binary" => Ok(Encoding::Binary),
            "keyvalues2" => Ok(Encoding::KeyValues2),
            other => Err(UnknownEncoding(other.to_string())),
        }
    }
}

/// Options for parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Restricts a text parse to the subtree whose element names match these
    /// segments, compared case-insensitively. Ignored by the binary codec.
    pub element_path: Option<Vec<String>>,
}

impl ReadOptions {
    /// Creates default options: parse everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts parsing to a dotted element path such as `"root.skeleton"`.
    ///
    /// An empty path means no restriction.
    pub fn with_element_path(path: &str) -> Self {
        let segments: Vec<String> = path
            .split('.')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Self {
            element_path: (!segments.is_empty()).then_some(segments),
        }
    }
}

// =============================================================================
// ENCODING
// =============================================================================

/// Serializes a model to bytes.
///
/// The (encoding, version) pair is checked before anything is written.
pub fn encode(model: &DataModel, encoding: Encoding, version: i32) -> Result<Vec<u8>, EncodeError> {
    let table = registry::table(encoding, version)
        .filter(|_| encoding.is_write_target(version))
        .ok_or(EncodeError::UnsupportedFormat { encoding, version })?;
    if model.root().is_none() {
        return Err(EncodeError::EmptyModel);
    }

    let header = Header {
        encoding,
        encoding_version: version,
        format: model.format().to_string(),
        format_version: model.format_version(),
    };
    debug!(
        %encoding,
        version,
        format = model.format(),
        elements = model.len(),
        "encoding model"
    );
    match encoding {
        Encoding::Binary => encode_binary(model, &header, table),
        Encoding::KeyValues2 => encode_keyvalues2(model, &header, table),
    }
}

/// Serializes a model into a writer.
pub fn write_to<W: Write>(
    model: &DataModel,
    writer: &mut W,
    encoding: Encoding,
    version: i32,
) -> Result<(), DmxError> {
    let bytes = encode(model, encoding, version)?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// Serializes a model to a file, replacing it.
///
/// The model is encoded in memory first, so an encode error leaves the file
/// system untouched.
pub fn save(
    model: &DataModel,
    path: impl AsRef<Path>,
    encoding: Encoding,
    version: i32,
) -> Result<(), DmxError> {
    let bytes = encode(model, encoding, version)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

// =============================================================================
// DECODING
// =============================================================================

/// Parses a model from bytes in either encoding.
pub fn decode(input: &[u8]) -> Result<DataModel, DecodeError> {
    decode_with_options(input, &ReadOptions::default())
}

/// Parses a model from bytes with the given options.
pub fn decode_with_options(input: &[u8], options: &ReadOptions) -> Result<DataModel, DecodeError> {
    let (header, consumed) = Header::parse(input)?;
    let table = registry::table(header.encoding, header.encoding_version).ok_or_else(|| {
        DecodeError::UnsupportedFormat {
            encoding: header.encoding.to_string(),
            version: header.encoding_version,
        }
    })?;
    debug!(
        encoding = %header.encoding,
        version = header.encoding_version,
        format = %header.format,
        bytes = input.len(),
        "decoding model"
    );

    let model = DataModel::new(header.format.clone(), header.format_version)?;
    let body = &input[consumed..];
    match header.encoding {
        Encoding::Binary => decode_binary(body, model, &header, table),
        Encoding::KeyValues2 => {
            let text = std::str::from_utf8(body).map_err(|_| DecodeError::InvalidUtf8 {
                field: "keyvalues2 text",
            })?;
            decode_keyvalues2(text, model, options)
        }
    }
}

/// Parses a model from a reader.
pub fn read_from<R: Read>(reader: &mut R, options: &ReadOptions) -> Result<DataModel, DmxError> {
    let mut input = Vec::new();
    reader.read_to_end(&mut input)?;
    Ok(decode_with_options(&input, options)?)
}

/// Parses a model from a file.
pub fn load(path: impl AsRef<Path>, options: &ReadOptions) -> Result<DataModel, DmxError> {
    let input = std::fs::read(path)?;
    Ok(decode_with_options(&input, options)?)
}
