//! DMX: an element-graph data model with binary and text encodings.
//!
//! A [`DataModel`] is a directed, possibly cyclic graph of [`Element`]s.
//! Each element has a unique id, a name, a type name and an ordered list of
//! typed attributes. Attributes hold scalars, fixed-size float blocks,
//! references to other elements, or homogeneous arrays of those.
//!
//! # Quick Start
//!
//! ```rust
//! use dmx::{DataModel, Encoding, Value};
//!
//! let mut dm = DataModel::new("model", 1).unwrap();
//! let root = dm.add_element("root", "DmElement").unwrap();
//! let mesh = dm.add_element("mesh", "DmeMesh").unwrap();
//! dm.add_attribute(root, "scale", 1.5f32).unwrap();
//! dm.add_attribute(root, "mesh", mesh).unwrap();
//!
//! // Binary
//! let bytes = dm.encode(Encoding::Binary, 5).unwrap();
//! let decoded = DataModel::decode(&bytes).unwrap();
//! let root = decoded.root().unwrap();
//! assert_eq!(decoded[root].get("scale"), Some(&Value::Float(1.5)));
//!
//! // KeyValues2 text
//! let text = dm.encode(Encoding::KeyValues2, 1).unwrap();
//! assert!(text.starts_with(b"<!-- dmx encoding keyvalues2 1 format model 1 -->"));
//! let decoded = DataModel::decode(&text).unwrap();
//! assert!(decoded.find_element("mesh").is_some());
//! ```
//!
//! # Modules
//!
//! - [`model`]: Elements, values and the arena-owning model
//! - [`walk`]: Reachability walk used by both encoders
//! - [`codec`]: Header handling and the binary / KeyValues2 codecs
//! - [`error`]: Error types
//! - [`limits`]: Security limits for decoding
//!
//! # Security
//!
//! Both decoders accept untrusted input. Counts, lengths and nesting depth
//! are bounded by [`limits`], and dictionary or element indices are range
//! checked, so malformed input yields an error rather than a panic.

pub mod codec;
pub mod error;
pub mod limits;
pub mod model;
pub mod walk;

// Re-export commonly used types at crate root
pub use codec::{
    decode, decode_with_options, encode, load, read_from, save, write_to, Encoding, ReadOptions,
};
pub use error::{DecodeError, DmxError, EncodeError, ErrorCode, ModelError};
pub use model::{
    derived_id, format_id, new_id, parse_id, Angle, Attribute, Color, DataModel, Element,
    ElementHandle, Id, Matrix, Quaternion, Time, Value, ValueKind, Vector2, Vector3, Vector4,
    NIL_ID,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
