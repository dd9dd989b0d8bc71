//! Security limits for decoding.
//!
//! Every count or length read from untrusted input is checked against one of
//! these bounds before anything is allocated for it.

/// Maximum length of the `<!-- dmx ... -->` header line, including the newline.
pub const MAX_HEADER_LEN: usize = 1024;

/// Maximum length in bytes of a single string (dictionary entry, literal or
/// quoted text token).
pub const MAX_STRING_LEN: usize = 16 * 1024 * 1024;

/// Maximum number of entries in the binary string dictionary.
pub const MAX_DICT_SIZE: usize = 1 << 24;

/// Maximum number of elements in one model.
pub const MAX_ELEMENTS: usize = 1 << 24;

/// Maximum number of attributes on one element.
pub const MAX_ATTRIBUTES_PER_ELEMENT: usize = 1 << 16;

/// Maximum number of items in one array attribute.
pub const MAX_ARRAY_LEN: usize = 1 << 26;

/// Maximum size in bytes of one binary blob.
pub const MAX_BINARY_LEN: usize = 256 * 1024 * 1024;

/// Maximum nesting depth of inline element blocks in the text encoding.
pub const MAX_NESTING_DEPTH: usize = 256;
