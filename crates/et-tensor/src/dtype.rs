use std::fmt;
use std::str::FromStr;

use crate::error::TensorError;

/// Element types a tensor can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DType {
    /// Boolean flags.
    Bool,
    /// Unsigned 8-bit integer.
    U8,
    /// Signed 32-bit integer.
    I32,
    /// Signed 64-bit integer.
    I64,
    /// Unsigned 32-bit integer.
    U32,
    /// 16-bit floating point (IEEE 754 half-precision, via the `half` crate).
    F16,
    /// 32-bit floating point.
    F32,
    /// 64-bit floating point.
    F64,
    /// Owned UTF-8 strings.
    String,
}

impl DType {
    /// All element types, in declaration order.
    pub const ALL: [DType; 9] = [
        DType::Bool,
        DType::U8,
        DType::I32,
        DType::I64,
        DType::U32,
        DType::F16,
        DType::F32,
        DType::F64,
        DType::String,
    ];

    /// Returns the size in bytes of a single element, or `None` for the
    /// variable-width string type.
    pub fn size_in_bytes(&self) -> Option<usize> {
        match self {
            DType::Bool | DType::U8 => Some(1),
            DType::F16 => Some(2),
            DType::I32 | DType::U32 | DType::F32 => Some(4),
            DType::I64 | DType::F64 => Some(8),
            DType::String => None,
        }
    }

    /// Returns true for every type with a native numeric representation.
    pub fn is_numeric(&self) -> bool {
        !matches!(self, DType::Bool | DType::String)
    }

    /// Returns true for the floating point types.
    pub fn is_float(&self) -> bool {
        matches!(self, DType::F16 | DType::F32 | DType::F64)
    }

    pub fn name(&self) -> &'static str {
        match self {
            DType::Bool => "bool",
            DType::U8 => "u8",
            DType::I32 => "i32",
            DType::I64 => "i64",
            DType::U32 => "u32",
            DType::F16 => "f16",
            DType::F32 => "f32",
            DType::F64 => "f64",
            DType::String => "string",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DType {
    type Err = TensorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DType::ALL
            .iter()
            .copied()
            .find(|d| d.name() == s)
            .ok_or_else(|| TensorError::UnsupportedDType(s.to_string()))
    }
}
