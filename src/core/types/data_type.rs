//! Scannable data types: value type, byte order and alignment

use super::error::{MemoryError, MemoryResult};
use super::value::ValueType;
use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;

/// Byte order of values stored in target memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    #[default]
    Little,
    Big,
}

/// A value type together with the byte order it is stored in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataType {
    pub value_type: ValueType,
    #[serde(default)]
    pub byte_order: ByteOrder,
}

impl DataType {
    /// A little-endian data type
    pub const fn new(value_type: ValueType) -> Self {
        DataType {
            value_type,
            byte_order: ByteOrder::Little,
        }
    }

    /// A big-endian data type
    pub const fn big_endian(value_type: ValueType) -> Self {
        DataType {
            value_type,
            byte_order: ByteOrder::Big,
        }
    }

    /// Element size in bytes, or `UnsupportedType` for variable-size types
    pub fn size(&self) -> MemoryResult<usize> {
        self.value_type
            .size()
            .ok_or_else(|| MemoryError::UnsupportedType(self.to_string()))
    }
}

impl From<ValueType> for DataType {
    fn from(value_type: ValueType) -> Self {
        DataType::new(value_type)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.byte_order {
            ByteOrder::Little => write!(f, "{}", self.value_type),
            ByteOrder::Big => write!(f, "{}be", self.value_type),
        }
    }
}

/// Stride between scanned elements.
///
/// Serializes as `"auto"`, `"1"`, `"2"`, `"4"` or `"8"`; deserializes from
/// those strings or from the bare integers `0` (auto), `1`, `2`, `4`, `8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryAlignment {
    /// Use the element size
    #[default]
    Auto,
    #[serde(rename = "1")]
    Align1,
    #[serde(rename = "2")]
    Align2,
    #[serde(rename = "4")]
    Align4,
    #[serde(rename = "8")]
    Align8,
}

impl MemoryAlignment {
    /// Resolves the alignment in bytes for elements of `element_size`
    pub fn resolve(&self, element_size: usize) -> usize {
        match self {
            MemoryAlignment::Auto => element_size.max(1),
            MemoryAlignment::Align1 => 1,
            MemoryAlignment::Align2 => 2,
            MemoryAlignment::Align4 => 4,
            MemoryAlignment::Align8 => 8,
        }
    }

    /// Builds an explicit alignment from a byte count
    pub fn from_bytes(bytes: usize) -> MemoryResult<Self> {
        match bytes {
            0 => Ok(MemoryAlignment::Auto),
            1 => Ok(MemoryAlignment::Align1),
            2 => Ok(MemoryAlignment::Align2),
            4 => Ok(MemoryAlignment::Align4),
            8 => Ok(MemoryAlignment::Align8),
            other => Err(MemoryError::InvalidAlignment(other)),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AlignmentRepr {
    Bytes(u64),
    Name(String),
}

impl<'de> Deserialize<'de> for MemoryAlignment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bytes = match AlignmentRepr::deserialize(deserializer)? {
            AlignmentRepr::Bytes(bytes) => usize::try_from(bytes).map_err(de::Error::custom)?,
            AlignmentRepr::Name(name) if name.trim().eq_ignore_ascii_case("auto") => 0,
            AlignmentRepr::Name(name) => name.trim().parse::<usize>().map_err(|_| {
                de::Error::custom(format!("unknown alignment '{}'", name))
            })?,
        };
        MemoryAlignment::from_bytes(bytes).map_err(de::Error::custom)
    }
}
