//! Value kinds and typed attribute values.
//!
//! The set of kinds is closed: fourteen leaf kinds, the legacy `ObjectId`
//! kind, and one homogeneous array kind for each of them. Arrays never nest.

use std::fmt;

use crate::error::ModelError;
use crate::model::{ElementHandle, Id};

/// Every kind of value an attribute can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Element,
    Int,
    Float,
    Bool,
    String,
    Binary,
    /// Bare element id with no inline payload (older tag layout only).
    ObjectId,
    Time,
    Color,
    Vector2,
    Vector3,
    Vector4,
    Angle,
    Quaternion,
    Matrix,
    ElementArray,
    IntArray,
    FloatArray,
    BoolArray,
    StringArray,
    BinaryArray,
    ObjectIdArray,
    TimeArray,
    ColorArray,
    Vector2Array,
    Vector3Array,
    Vector4Array,
    AngleArray,
    QuaternionArray,
    MatrixArray,
}

impl ValueKind {
    /// All leaf (non-array) kinds.
    pub const LEAVES: [ValueKind; 15] = [
        ValueKind::Element,
        ValueKind::Int,
        ValueKind::Float,
        ValueKind::Bool,
        ValueKind::String,
        ValueKind::Binary,
        ValueKind::ObjectId,
        ValueKind::Time,
        ValueKind::Color,
        ValueKind::Vector2,
        ValueKind::Vector3,
        ValueKind::Vector4,
        ValueKind::Angle,
        ValueKind::Quaternion,
        ValueKind::Matrix,
    ];

    /// Returns true for the homogeneous array kinds.
    pub fn is_array(self) -> bool {
        !matches!(
            self,
            ValueKind::Element
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
                | ValueKind::Matrix
        )
    }

    /// Returns the array kind holding items of this kind (arrays map to themselves).
    pub fn array_kind(self) -> ValueKind {
        match self {
            ValueKind::Element => ValueKind::ElementArray,
            ValueKind::Int => ValueKind::IntArray,
            ValueKind::Float => ValueKind::FloatArray,
            ValueKind::Bool => ValueKind::BoolArray,
            ValueKind::String => ValueKind::StringArray,
            ValueKind::Binary => ValueKind::BinaryArray,
            ValueKind::ObjectId => ValueKind::ObjectIdArray,
            ValueKind::Time => ValueKind::TimeArray,
            ValueKind::Color => ValueKind::ColorArray,
            ValueKind::Vector2 => ValueKind::Vector2Array,
            ValueKind::Vector3 => ValueKind::Vector3Array,
            ValueKind::Vector4 => ValueKind::Vector4Array,
            ValueKind::Angle => ValueKind::AngleArray,
            ValueKind::Quaternion => ValueKind::QuaternionArray,
            ValueKind::Matrix => ValueKind::MatrixArray,
            array => array,
        }
    }

    /// Returns the item kind of an array kind (leaves map to themselves).
    pub fn item_kind(self) -> ValueKind {
        match self {
            ValueKind::ElementArray => ValueKind::Element,
            ValueKind::IntArray => ValueKind::Int,
            ValueKind::FloatArray => ValueKind::Float,
            ValueKind::BoolArray => ValueKind::Bool,
            ValueKind::StringArray => ValueKind::String,
            ValueKind::BinaryArray => ValueKind::Binary,
            ValueKind::ObjectIdArray => ValueKind::ObjectId,
            ValueKind::TimeArray => ValueKind::Time,
            ValueKind::ColorArray => ValueKind::Color,
            ValueKind::Vector2Array => ValueKind::Vector2,
            ValueKind::Vector3Array => ValueKind::Vector3,
            ValueKind::Vector4Array => ValueKind::Vector4,
            ValueKind::AngleArray => ValueKind::Angle,
            ValueKind::QuaternionArray => ValueKind::Quaternion,
            ValueKind::MatrixArray => ValueKind::Matrix,
            leaf => leaf,
        }
    }

    /// Returns the type name used by the text encoding.
    pub fn type_name(self) -> &'static str {
        match self {
            ValueKind::Element => "element",
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::Bool => "bool",
            ValueKind::String => "string",
            ValueKind::Binary => "binary",
            ValueKind::ObjectId => "elementid",
            ValueKind::Time => "time",
            ValueKind::Color => "color",
            ValueKind::Vector2 => "vector2",
            ValueKind::Vector3 => "vector3",
            ValueKind::Vector4 => "vector4",
            ValueKind::Angle => "angle",
            ValueKind::Quaternion => "quaternion",
            ValueKind::Matrix => "matrix",
            ValueKind::ElementArray => "element_array",
            ValueKind::IntArray => "int_array",
            ValueKind::FloatArray => "float_array",
            ValueKind::BoolArray => "bool_array",
            ValueKind::StringArray => "string_array",
            ValueKind::BinaryArray => "binary_array",
            ValueKind::ObjectIdArray => "elementid_array",
            ValueKind::TimeArray => "time_array",
            ValueKind::ColorArray => "color_array",
            ValueKind::Vector2Array => "vector2_array",
            ValueKind::Vector3Array => "vector3_array",
            ValueKind::Vector4Array => "vector4_array",
            ValueKind::AngleArray => "angle_array",
            ValueKind::QuaternionArray => "quaternion_array",
            ValueKind::MatrixArray => "matrix_array",
        }
    }

    /// Looks up a kind by its text type name.
    ///
    /// `qangle` is accepted as an alias of `angle`.
    pub fn from_type_name(name: &str) -> Option<ValueKind> {
        let (base, is_array) = match name.strip_suffix("_array") {
            Some(base) => (base, true),
            None => (name, false),
        };
        let leaf = match base {
            "qangle" => ValueKind::Angle,
            _ => *ValueKind::LEAVES.iter().find(|k| k.type_name() == base)?,
        };
        Some(if is_array { leaf.array_kind() } else { leaf })
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Time in seconds, stored as fixed-point ticks of 1/10000 s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Time {
    ticks: i32,
}

impl Time {
    /// Fixed-point resolution.
    pub const TICKS_PER_SECOND: i32 = 10_000;

    /// Creates a time from raw ticks.
    pub fn from_ticks(ticks: i32) -> Self {
        Self { ticks }
    }

    /// Creates a time from seconds, rounded to the nearest tick.
    ///
    /// Out-of-range values saturate.
    pub fn from_seconds(seconds: f64) -> Self {
        Self {
            ticks: (seconds * Self::TICKS_PER_SECOND as f64).round() as i32,
        }
    }

    /// Returns the raw ticks.
    pub fn ticks(self) -> i32 {
        self.ticks
    }

    /// Returns the time in seconds.
    pub fn seconds(self) -> f64 {
        self.ticks as f64 / Self::TICKS_PER_SECOND as f64
    }
}

macro_rules! float_block {
    ($(#[$meta:meta])* $name:ident, $len:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Default)]
        pub struct $name(pub [f32; $len]);

        impl $name {
            /// Number of ordinates.
            pub const LEN: usize = $len;

            /// Returns the ordinates.
            pub fn as_slice(&self) -> &[f32] {
                &self.0
            }

            pub(crate) fn from_slice(ordinates: &[f32]) -> Option<Self> {
                <[f32; $len]>::try_from(ordinates).ok().map(Self)
            }
        }

        impl From<[f32; $len]> for $name {
            fn from(ordinates: [f32; $len]) -> Self {
                Self(ordinates)
            }
        }
    };
}

float_block!(
    /// Two-component float vector.
    Vector2,
    2
);
float_block!(
    /// Three-component float vector.
    Vector3,
    3
);
float_block!(
    /// Four-component float vector.
    Vector4,
    4
);
float_block!(
    /// Euler angles (pitch, yaw, roll) in degrees.
    Angle,
    3
);
float_block!(
    /// Rotation quaternion (x, y, z, w).
    Quaternion,
    4
);
float_block!(
    /// RGBA color as four floats.
    Color,
    4
);
float_block!(
    /// 4x4 matrix, kept as an opaque block of sixteen floats.
    Matrix,
    16
);

impl Matrix {
    /// The identity matrix.
    pub const IDENTITY: Matrix = Matrix([
        1.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ]);
}

/// A typed value held by an attribute.
///
/// Element references are non-owning handles into the owning
/// [`DataModel`](crate::model::DataModel); `None` is a null reference.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Element(Option<ElementHandle>),
    Int(i32),
    Float(f32),
    Bool(bool),
    String(String),
    Binary(Vec<u8>),
    ObjectId(Id),
    Time(Time),
    Color(Color),
    Vector2(Vector2),
    Vector3(Vector3),
    Vector4(Vector4),
    Angle(Angle),
    Quaternion(Quaternion),
    Matrix(Matrix),
    ElementArray(Vec<Option<ElementHandle>>),
    IntArray(Vec<i32>),
    FloatArray(Vec<f32>),
    BoolArray(Vec<bool>),
    StringArray(Vec<String>),
    BinaryArray(Vec<Vec<u8>>),
    ObjectIdArray(Vec<Id>),
    TimeArray(Vec<Time>),
    ColorArray(Vec<Color>),
    Vector2Array(Vec<Vector2>),
    Vector3Array(Vec<Vector3>),
    Vector4Array(Vec<Vector4>),
    AngleArray(Vec<Angle>),
    QuaternionArray(Vec<Quaternion>),
    MatrixArray(Vec<Matrix>),
}

impl Value {
    /// Returns the kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Element(_) => ValueKind::Element,
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Bool(_) => ValueKind::Bool,
            Value::String(_) => ValueKind::String,
            Value::Binary(_) => ValueKind::Binary,
            Value::ObjectId(_) => ValueKind::ObjectId,
            Value::Time(_) => ValueKind::Time,
            Value::Color(_) => ValueKind::Color,
            Value::Vector2(_) => ValueKind::Vector2,
            Value::Vector3(_) => ValueKind::Vector3,
            Value::Vector4(_) => ValueKind::Vector4,
            Value::Angle(_) => ValueKind::Angle,
            Value::Quaternion(_) => ValueKind::Quaternion,
            Value::Matrix(_) => ValueKind::Matrix,
            Value::ElementArray(_) => ValueKind::ElementArray,
            Value::IntArray(_) => ValueKind::IntArray,
            Value::FloatArray(_) => ValueKind::FloatArray,
            Value::BoolArray(_) => ValueKind::BoolArray,
            Value::StringArray(_) => ValueKind::StringArray,
            Value::BinaryArray(_) => ValueKind::BinaryArray,
            Value::ObjectIdArray(_) => ValueKind::ObjectIdArray,
            Value::TimeArray(_) => ValueKind::TimeArray,
            Value::ColorArray(_) => ValueKind::ColorArray,
            Value::Vector2Array(_) => ValueKind::Vector2Array,
            Value::Vector3Array(_) => ValueKind::Vector3Array,
            Value::Vector4Array(_) => ValueKind::Vector4Array,
            Value::AngleArray(_) => ValueKind::AngleArray,
            Value::QuaternionArray(_) => ValueKind::QuaternionArray,
            Value::MatrixArray(_) => ValueKind::MatrixArray,
        }
    }

    /// Returns an empty array value of the given array kind, or `None` for a leaf kind.
    pub fn empty_array(kind: ValueKind) -> Option<Value> {
        let value = match kind {
            ValueKind::ElementArray => Value::ElementArray(Vec::new()),
            ValueKind::IntArray => Value::IntArray(Vec::new()),
            ValueKind::FloatArray => Value::FloatArray(Vec::new()),
            ValueKind::BoolArray => Value::BoolArray(Vec::new()),
            ValueKind::StringArray => Value::StringArray(Vec::new()),
            ValueKind::BinaryArray => Value::BinaryArray(Vec::new()),
            ValueKind::ObjectIdArray => Value::ObjectIdArray(Vec::new()),
            ValueKind::TimeArray => Value::TimeArray(Vec::new()),
            ValueKind::ColorArray => Value::ColorArray(Vec::new()),
            ValueKind::Vector2Array => Value::Vector2Array(Vec::new()),
            ValueKind::Vector3Array => Value::Vector3Array(Vec::new()),
            ValueKind::Vector4Array => Value::Vector4Array(Vec::new()),
            ValueKind::AngleArray => Value::AngleArray(Vec::new()),
            ValueKind::QuaternionArray => Value::QuaternionArray(Vec::new()),
            ValueKind::MatrixArray => Value::MatrixArray(Vec::new()),
            _ => return None,
        };
        Some(value)
    }

    /// Returns the referenced element of a scalar element value.
    pub fn as_element(&self) -> Option<ElementHandle> {
        match self {
            Value::Element(target) => *target,
            _ => None,
        }
    }

    /// Returns the entries of an element array.
    pub fn as_element_array(&self) -> Option<&[Option<ElementHandle>]> {
        match self {
            Value::ElementArray(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    /// Checks constraints the encodings rely on.
    ///
    /// Strings are written NUL-terminated in the binary encoding, so they must
    /// not contain NUL themselves.
    pub fn validate(&self) -> Result<(), ModelError> {
        let has_nul = match self {
            Value::String(s) => s.contains('\0'),
            Value::StringArray(items) => items.iter().any(|s| s.contains('\0')),
            _ => false,
        };
        if has_nul {
            return Err(ModelError::ContainsNul {
                field: "string value",
            });
        }
        Ok(())
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Time> for Value {
    fn from(v: Time) -> Self {
        Value::Time(v)
    }
}

impl From<Color> for Value {
    fn from(v: Color) -> Self {
        Value::Color(v)
    }
}

impl From<Vector2> for Value {
    fn from(v: Vector2) -> Self {
        Value::Vector2(v)
    }
}

impl From<Vector3> for Value {
    fn from(v: Vector3) -> Self {
        Value::Vector3(v)
    }
}

impl From<Vector4> for Value {
    fn from(v: Vector4) -> Self {
        Value::Vector4(v)
    }
}

impl From<Angle> for Value {
    fn from(v: Angle) -> Self {
        Value::Angle(v)
    }
}

impl From<Quaternion> for Value {
    fn from(v: Quaternion) -> Self {
        Value::Quaternion(v)
    }
}

impl From<Matrix> for Value {
    fn from(v: Matrix) -> Self {
        Value::Matrix(v)
    }
}

impl From<ElementHandle> for Value {
    fn from(v: ElementHandle) -> Self {
        Value::Element(Some(v))
    }
}

impl From<Option<ElementHandle>> for Value {
    fn from(v: Option<ElementHandle>) -> Self {
        Value::Element(v)
    }
}

impl From<Vec<ElementHandle>> for Value {
    fn from(v: Vec<ElementHandle>) -> Self {
        Value::ElementArray(v.into_iter().map(Some).collect())
    }
}

impl From<Vec<i32>> for Value {
    fn from(v: Vec<i32>) -> Self {
        Value::IntArray(v)
    }
}

impl From<Vec<f32>> for Value {
    fn from(v: Vec<f32>) -> Self {
        Value::FloatArray(v)
    }
}

impl From<Vec<bool>> for Value {
    fn from(v: Vec<bool>) -> Self {
        Value::BoolArray(v)
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Value::StringArray(v)
    }
}

impl From<Vec<Time>> for Value {
    fn from(v: Vec<Time>) -> Self {
        Value::TimeArray(v)
    }
}

impl From<Vec<Vector3>> for Value {
    fn from(v: Vec<Vector3>) -> Self {
        Value::Vector3Array(v)
    }
}

impl From<Vec<Quaternion>> for Value {
    fn from(v: Vec<Quaternion>) -> Self {
        Value::QuaternionArray(v)
    }
}
