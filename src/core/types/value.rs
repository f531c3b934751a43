//! Typed scan values and the set of scannable value types

use super::data_type::ByteOrder;
use super::error::{MemoryError, MemoryResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A typed value read from, or compared against, target memory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum MemoryValue {
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Bytes(Vec<u8>),
    String(String),
}

macro_rules! decode_fixed {
    ($bytes:expr, $order:expr, $ty:ty, $variant:ident) => {{
        const N: usize = std::mem::size_of::<$ty>();
        let raw: [u8; N] = $bytes.get(..N)?.try_into().ok()?;
        Some(MemoryValue::$variant(match $order {
            ByteOrder::Little => <$ty>::from_le_bytes(raw),
            ByteOrder::Big => <$ty>::from_be_bytes(raw),
        }))
    }};
}

impl MemoryValue {
    /// Returns the size in bytes of the value
    pub fn size(&self) -> usize {
        match self {
            MemoryValue::I8(_) | MemoryValue::U8(_) => 1,
            MemoryValue::I16(_) | MemoryValue::U16(_) => 2,
            MemoryValue::I32(_) | MemoryValue::U32(_) | MemoryValue::F32(_) => 4,
            MemoryValue::I64(_) | MemoryValue::U64(_) | MemoryValue::F64(_) => 8,
            MemoryValue::Bytes(b) => b.len(),
            MemoryValue::String(s) => s.len(),
        }
    }

    /// Decodes a value of the given type from the start of `bytes`
    pub fn from_bytes(bytes: &[u8], value_type: ValueType, order: ByteOrder) -> Option<Self> {
        match value_type {
            ValueType::I8 => bytes.first().map(|&b| MemoryValue::I8(b as i8)),
            ValueType::U8 => bytes.first().map(|&b| MemoryValue::U8(b)),
            ValueType::I16 => decode_fixed!(bytes, order, i16, I16),
            ValueType::I32 => decode_fixed!(bytes, order, i32, I32),
            ValueType::I64 => decode_fixed!(bytes, order, i64, I64),
            ValueType::U16 => decode_fixed!(bytes, order, u16, U16),
            ValueType::U32 => decode_fixed!(bytes, order, u32, U32),
            ValueType::U64 => decode_fixed!(bytes, order, u64, U64),
            ValueType::F32 => decode_fixed!(bytes, order, f32, F32),
            ValueType::F64 => decode_fixed!(bytes, order, f64, F64),
            ValueType::Bytes => Some(MemoryValue::Bytes(bytes.to_vec())),
            ValueType::String => String::from_utf8(bytes.to_vec())
                .ok()
                .map(MemoryValue::String),
        }
    }

    /// Parses user input as a value of the given type.
    ///
    /// Integers accept decimal or `0x`-prefixed hex; negative hex is not supported.
    pub fn parse(text: &str, value_type: ValueType) -> MemoryResult<Self> {
        let text = text.trim();
        let invalid =
            || MemoryError::InvalidValue(format!("'{}' is not a valid {}", text, value_type));

        macro_rules! int {
            ($ty:ty, $variant:ident) => {{
                let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
                    Some(hex) => <$ty>::from_str_radix(hex, 16),
                    None => text.parse::<$ty>(),
                };
                parsed.map(MemoryValue::$variant).map_err(|_| invalid())
            }};
        }

        match value_type {
            ValueType::I8 => int!(i8, I8),
            ValueType::I16 => int!(i16, I16),
            ValueType::I32 => int!(i32, I32),
            ValueType::I64 => int!(i64, I64),
            ValueType::U8 => int!(u8, U8),
            ValueType::U16 => int!(u16, U16),
            ValueType::U32 => int!(u32, U32),
            ValueType::U64 => int!(u64, U64),
            ValueType::F32 => text.parse().map(MemoryValue::F32).map_err(|_| invalid()),
            ValueType::F64 => text.parse().map(MemoryValue::F64).map_err(|_| invalid()),
            ValueType::String => Ok(MemoryValue::String(text.to_string())),
            ValueType::Bytes => Err(MemoryError::UnsupportedType(
                "byte arrays cannot be parsed as scan values".to_string(),
            )),
        }
    }

    /// Gets the value type enum for this value
    pub fn value_type(&self) -> ValueType {
        match self {
            MemoryValue::I8(_) => ValueType::I8,
            MemoryValue::I16(_) => ValueType::I16,
            MemoryValue::I32(_) => ValueType::I32,
            MemoryValue::I64(_) => ValueType::I64,
            MemoryValue::U8(_) => ValueType::U8,
            MemoryValue::U16(_) => ValueType::U16,
            MemoryValue::U32(_) => ValueType::U32,
            MemoryValue::U64(_) => ValueType::U64,
            MemoryValue::F32(_) => ValueType::F32,
            MemoryValue::F64(_) => ValueType::F64,
            MemoryValue::Bytes(_) => ValueType::Bytes,
            MemoryValue::String(_) => ValueType::String,
        }
    }
}

/// The type of a memory value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Bytes,
    String,
}

impl ValueType {
    /// Returns the size in bytes for this value type
    pub fn size(&self) -> Option<usize> {
        match self {
            ValueType::I8 | ValueType::U8 => Some(1),
            ValueType::I16 | ValueType::U16 => Some(2),
            ValueType::I32 | ValueType::U32 | ValueType::F32 => Some(4),
            ValueType::I64 | ValueType::U64 | ValueType::F64 => Some(8),
            ValueType::Bytes | ValueType::String => None,
        }
    }

    /// Whether values of this type can be compared by the scanner
    pub fn is_numeric(&self) -> bool {
        self.size().is_some()
    }

    pub fn is_float(&self) -> bool {
        matches!(self, ValueType::F32 | ValueType::F64)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::I8 => "i8",
            ValueType::I16 => "i16",
            ValueType::I32 => "i32",
            ValueType::I64 => "i64",
            ValueType::U8 => "u8",
            ValueType::U16 => "u16",
            ValueType::U32 => "u32",
            ValueType::U64 => "u64",
            ValueType::F32 => "f32",
            ValueType::F64 => "f64",
            ValueType::Bytes => "bytes",
            ValueType::String => "string",
        };
        f.write_str(name)
    }
}

impl FromStr for ValueType {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "i8" | "sbyte" => Ok(ValueType::I8),
            "i16" | "short" => Ok(ValueType::I16),
            "i32" | "int" => Ok(ValueType::I32),
            "i64" | "long" => Ok(ValueType::I64),
            "u8" | "byte" => Ok(ValueType::U8),
            "u16" | "ushort" => Ok(ValueType::U16),
            "u32" | "uint" => Ok(ValueType::U32),
            "u64" | "ulong" => Ok(ValueType::U64),
            "f32" | "float" => Ok(ValueType::F32),
            "f64" | "double" => Ok(ValueType::F64),
            "bytes" => Ok(ValueType::Bytes),
            "string" => Ok(ValueType::String),
            other => Err(MemoryError::UnsupportedType(other.to_string())),
        }
    }
}

impl fmt::Display for MemoryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryValue::I8(v) => write!(f, "{}", v),
            MemoryValue::I16(v) => write!(f, "{}", v),
            MemoryValue::I32(v) => write!(f, "{}", v),
            MemoryValue::I64(v) => write!(f, "{}", v),
            MemoryValue::U8(v) => write!(f, "{}", v),
            MemoryValue::U16(v) => write!(f, "{}", v),
            MemoryValue::U32(v) => write!(f, "{}", v),
            MemoryValue::U64(v) => write!(f, "{}", v),
            MemoryValue::F32(v) => write!(f, "{}", v),
            MemoryValue::F64(v) => write!(f, "{}", v),
            MemoryValue::Bytes(b) => write!(f, "{:?}", b),
            MemoryValue::String(s) => write!(f, "\"{}\"", s),
        }
    }
}
