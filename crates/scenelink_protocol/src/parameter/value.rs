//! Parameter types and their wire encoding.

use scenelink_shared::{Color, Quat, Vec2, Vec3, Vec4};

use crate::codec::{ByteReader, ByteWriter};
use crate::error::ProtocolError;

/// Wire type tag of a parameter value.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParameterType {
    /// One byte, 0 or 1.
    Bool = 2,
    /// i32.
    Int = 3,
    /// f32.
    Float = 4,
    /// 2×f32.
    Vec2 = 5,
    /// 3×f32.
    Vec3 = 6,
    /// 4×f32.
    Vec4 = 7,
    /// 4×f32, x y z w.
    Quat = 8,
    /// 4×f32, r g b a.
    Color = 9,
    /// Raw bytes, length from the record.
    ByteString = 10,
}

impl ParameterType {
    /// Maps a wire byte back to a type.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            2 => Some(Self::Bool),
            3 => Some(Self::Int),
            4 => Some(Self::Float),
            5 => Some(Self::Vec2),
            6 => Some(Self::Vec3),
            7 => Some(Self::Vec4),
            8 => Some(Self::Quat),
            9 => Some(Self::Color),
            10 => Some(Self::ByteString),
            _ => None,
        }
    }

    /// Encoded size, `None` for variable-length types.
    #[must_use]
    pub const fn fixed_size(self) -> Option<usize> {
        match self {
            Self::Bool => Some(1),
            Self::Int | Self::Float => Some(4),
            Self::Vec2 => Some(8),
            Self::Vec3 => Some(12),
            Self::Vec4 | Self::Quat | Self::Color => Some(16),
            Self::ByteString => None,
        }
    }
}

/// A parameter value of any supported type.
#[derive(Clone, Debug, PartialEq)]
pub enum ParameterValue {
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i32),
    /// Float.
    Float(f32),
    /// 2D vector.
    Vec2(Vec2),
    /// 3D vector.
    Vec3(Vec3),
    /// 4D vector.
    Vec4(Vec4),
    /// Rotation.
    Quat(Quat),
    /// Color.
    Color(Color),
    /// Byte string.
    ByteString(Vec<u8>),
}

impl ParameterValue {
    /// Type tag of this value.
    #[must_use]
    pub const fn parameter_type(&self) -> ParameterType {
        match self {
            Self::Bool(_) => ParameterType::Bool,
            Self::Int(_) => ParameterType::Int,
            Self::Float(_) => ParameterType::Float,
            Self::Vec2(_) => ParameterType::Vec2,
            Self::Vec3(_) => ParameterType::Vec3,
            Self::Vec4(_) => ParameterType::Vec4,
            Self::Quat(_) => ParameterType::Quat,
            Self::Color(_) => ParameterType::Color,
            Self::ByteString(_) => ParameterType::ByteString,
        }
    }

    /// Encodes the value bytes, no tag or length.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = ByteWriter::with_capacity(16);
        match self {
            Self::Bool(v) => w.write_bool(*v),
            Self::Int(v) => w.write_i32(*v),
            Self::Float(v) => w.write_f32(*v),
            Self::Vec2(v) => w.write_pod(v),
            Self::Vec3(v) => w.write_pod(v),
            Self::Vec4(v) => w.write_pod(v),
            Self::Quat(v) => w.write_pod(v),
            Self::Color(v) => w.write_pod(v),
            Self::ByteString(v) => w.write_raw(v),
        }
        w.into_bytes()
    }

    /// Decodes value bytes of a known type.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::ValueSizeMismatch`] if `data` is not exactly the
    /// type's size.
    pub fn from_bytes(parameter_type: ParameterType, data: &[u8]) -> Result<Self, ProtocolError> {
        if let Some(expected) = parameter_type.fixed_size() {
            if data.len() != expected {
                return Err(ProtocolError::ValueSizeMismatch {
                    type_tag: parameter_type as u8,
                    expected,
                    actual: data.len(),
                });
            }
        }
        if parameter_type == ParameterType::Bool {
            // Same rule as `ByteReader::read_bool`: only 0 and 1.
            return match data {
                [0] => Ok(Self::Bool(false)),
                [1] => Ok(Self::Bool(true)),
                _ => Err(ProtocolError::InvalidBool(data.first().copied().unwrap_or_default())),
            };
        }
        let mut r = ByteReader::new(data);
        // Sizes were checked above, so these reads cannot run short.
        let value = match parameter_type {
            ParameterType::Bool => r.read_bool().map(Self::Bool),
            ParameterType::Int => r.read_i32().map(Self::Int),
            ParameterType::Float => r.read_f32().map(Self::Float),
            ParameterType::Vec2 => r.read_pod().map(Self::Vec2),
            ParameterType::Vec3 => r.read_pod().map(Self::Vec3),
            ParameterType::Vec4 => r.read_pod().map(Self::Vec4),
            ParameterType::Quat => r.read_pod().map(Self::Quat),
            ParameterType::Color => r.read_pod().map(Self::Color),
            ParameterType::ByteString => Ok(Self::ByteString(data.to_vec())),
        };
        value.map_err(|_| ProtocolError::ValueSizeMismatch {
            type_tag: parameter_type as u8,
            expected: parameter_type.fixed_size().unwrap_or(data.len()),
            actual: data.len(),
        })
    }
}

/// Rust types usable as parameter values.
pub trait ParameterData: Clone + PartialEq + std::fmt::Debug + Send + 'static {
    /// Wire type tag.
    const TYPE: ParameterType;

    /// Wraps into the dynamic value.
    fn into_value(self) -> ParameterValue;

    /// Unwraps from the dynamic value, `None` on type mismatch.
    fn from_value(value: ParameterValue) -> Option<Self>;
}

macro_rules! parameter_data {
    ($ty:ty, $variant:ident) => {
        impl ParameterData for $ty {
            const TYPE: ParameterType = ParameterType::$variant;

            fn into_value(self) -> ParameterValue {
                ParameterValue::$variant(self)
            }

            fn from_value(value: ParameterValue) -> Option<Self> {
                match value {
                    ParameterValue::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }
    };
}

parameter_data!(bool, Bool);
parameter_data!(i32, Int);
parameter_data!(f32, Float);
parameter_data!(Vec2, Vec2);
parameter_data!(Vec3, Vec3);
parameter_data!(Vec4, Vec4);
parameter_data!(Quat, Quat);
parameter_data!(Color, Color);
parameter_data!(Vec<u8>, ByteString);
