//! UUID-based element identifiers.
//!
//! An element id is an RFC 4122 UUID stored as 16 raw bytes. It is the only
//! identity used for cross-references; element names carry no meaning.

use sha2::{Digest, Sha256};
use uuid::Uuid;

/// A 16-byte element identifier.
pub type Id = [u8; 16];

/// The zero/nil UUID.
pub const NIL_ID: Id = [0u8; 16];

/// Generates a fresh random (version 4) identifier.
pub fn new_id() -> Id {
    Uuid::new_v4().into_bytes()
}

/// Derives a UUIDv8 from input bytes using SHA-256.
///
/// ```text
/// hash = SHA-256(input_bytes)[0:16]
/// hash[6] = (hash[6] & 0x0F) | 0x80  // version 8
/// hash[8] = (hash[8] & 0x3F) | 0x80  // RFC 4122 variant
/// ```
///
/// Useful when a model must serialize identically across runs.
pub fn derived_id(input: &[u8]) -> Id {
    let hash = Sha256::digest(input);
    let mut id = [0u8; 16];
    id.copy_from_slice(&hash[..16]);

    id[6] = (id[6] & 0x0F) | 0x80;
    id[8] = (id[8] & 0x3F) | 0x80;

    id
}

/// Formats an id as hyphenated lowercase hex, the form used by the text encoding.
pub fn format_id(id: &Id) -> String {
    Uuid::from_bytes(*id).hyphenated().to_string()
}

/// Parses an id from hex, with or without hyphens or braces.
pub fn parse_id(s: &str) -> Option<Id> {
    Uuid::parse_str(s.trim()).ok().map(Uuid::into_bytes)
}
