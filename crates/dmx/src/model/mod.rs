//! Data model types for DMX.
//!
//! This module contains the element graph:
//! - Identifiers (UUIDs)
//! - Value kinds and values
//! - Elements and attributes
//! - The arena-owning DataModel

pub mod datamodel;
pub mod element;
pub mod id;
pub mod value;

pub use datamodel::DataModel;
pub use element::{Attribute, Element, ElementHandle, RESERVED_ATTRIBUTE_NAMES};
pub use id::{derived_id, format_id, new_id, parse_id, Id, NIL_ID};
pub use value::{
    Angle, Color, Matrix, Quaternion, Time, Value, ValueKind, Vector2, Vector3, Vector4,
};
