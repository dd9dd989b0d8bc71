//! The `<!-- dmx ... -->` header line shared by both encodings.

use crate::codec::Encoding;
use crate::error::DecodeError;
use crate::limits::MAX_HEADER_LEN;

/// Parsed header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub encoding: Encoding,
    pub encoding_version: i32,
    pub format: String,
    pub format_version: i32,
}

impl Header {
    /// Formats the header line, including its trailing newline.
    pub fn to_line(&self) -> String {
        format!(
            "<!-- dmx encoding {} {} format {} {} -->\n",
            self.encoding, self.encoding_version, self.format, self.format_version
        )
    }

    /// Parses the header line at the start of `input`.
    ///
    /// Returns the header and the number of bytes consumed, including the
    /// newline. The NUL that follows the line in binary files is not consumed.
    pub fn parse(input: &[u8]) -> Result<(Header, usize), DecodeError> {
        let window = &input[..input.len().min(MAX_HEADER_LEN)];
        let Some(newline) = window.iter().position(|&b| b == b'\n') else {
            return Err(DecodeError::MalformedHeader {
                reason: "no header line",
            });
        };
        let line = std::str::from_utf8(&window[..newline]).map_err(|_| {
            DecodeError::MalformedHeader {
                reason: "header is not valid UTF-8",
            }
        })?;

        let tokens: Vec<&str> = line.split_whitespace().collect();
        let [
            "<!--",
            "dmx",
            "encoding",
            encoding,
            encoding_version,
            "format",
            format,
            format_version,
            "-->",
        ] = tokens.as_slice()
        else {
            return Err(DecodeError::MalformedHeader {
                reason: "expected `<!-- dmx encoding <enc> <ver> format <fmt> <ver> -->`",
            });
        };

        let encoding_version = parse_version(encoding_version)?;
        let format_version = parse_version(format_version)?;
        let encoding = encoding
            .parse::<Encoding>()
            .map_err(|_| DecodeError::UnsupportedFormat {
                encoding: encoding.to_string(),
                version: encoding_version,
            })?;

        let header = Header {
            encoding,
            encoding_version,
            format: format.to_string(),
            format_version,
        };
        Ok((header, newline + 1))
    }
}

fn parse_version(text: &str) -> Result<i32, DecodeError> {
    text.parse().map_err(|_| DecodeError::MalformedHeader {
        reason: "version is not an integer",
    })
}
