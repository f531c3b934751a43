//! Numeric element types and the leaf predicate semantics shared by every
//! comparison form

use crate::core::types::{ByteOrder, ConstraintKind, MemoryError, MemoryResult, MemoryValue};
use std::fmt::Debug;

/// A primitive type the scanner can compare
pub trait ScanElement: Copy + PartialOrd + Debug + Send + Sync + 'static {
    /// Size in bytes
    const SIZE: usize;

    /// Decodes a value from the first `SIZE` bytes of `bytes`.
    ///
    /// Callers guarantee `bytes.len() >= SIZE`.
    fn read(bytes: &[u8], order: ByteOrder) -> Self;

    /// Converts a scan value into this type
    fn from_value(value: &MemoryValue) -> MemoryResult<Self>;

    /// Equality, tolerant to rounding for floating point types
    fn approx_eq(self, other: Self) -> bool;

    /// Addition, two's-complement wrapping for integers
    fn add_wrapping(self, other: Self) -> Self;

    /// Subtraction, two's-complement wrapping for integers
    fn sub_wrapping(self, other: Self) -> Self;

    fn zero() -> Self;
}

fn unsupported_value(value: &MemoryValue) -> MemoryError {
    MemoryError::UnsupportedType(format!(
        "{} values cannot be used as numeric scan values",
        value.value_type()
    ))
}

macro_rules! numeric_cast {
    ($value:expr, $ty:ty) => {
        match $value {
            MemoryValue::I8(v) => Ok(*v as $ty),
            MemoryValue::I16(v) => Ok(*v as $ty),
            MemoryValue::I32(v) => Ok(*v as $ty),
            MemoryValue::I64(v) => Ok(*v as $ty),
            MemoryValue::U8(v) => Ok(*v as $ty),
            MemoryValue::U16(v) => Ok(*v as $ty),
            MemoryValue::U32(v) => Ok(*v as $ty),
            MemoryValue::U64(v) => Ok(*v as $ty),
            MemoryValue::F32(v) => Ok(*v as $ty),
            MemoryValue::F64(v) => Ok(*v as $ty),
            other => Err(unsupported_value(other)),
        }
    };
}

macro_rules! decode {
    ($ty:ty, $bytes:expr, $order:expr) => {{
        let mut raw = [0u8; std::mem::size_of::<$ty>()];
        raw.copy_from_slice(&$bytes[..std::mem::size_of::<$ty>()]);
        match $order {
            ByteOrder::Little => <$ty>::from_le_bytes(raw),
            ByteOrder::Big => <$ty>::from_be_bytes(raw),
        }
    }};
}

macro_rules! impl_integer_element {
    ($($ty:ty),*) => {$(
        impl ScanElement for $ty {
            const SIZE: usize = std::mem::size_of::<$ty>();

            #[inline(always)]
            fn read(bytes: &[u8], order: ByteOrder) -> Self {
                decode!($ty, bytes, order)
            }

            fn from_value(value: &MemoryValue) -> MemoryResult<Self> {
                numeric_cast!(value, $ty)
            }

            #[inline(always)]
            fn approx_eq(self, other: Self) -> bool {
                self == other
            }

            #[inline(always)]
            fn add_wrapping(self, other: Self) -> Self {
                self.wrapping_add(other)
            }

            #[inline(always)]
            fn sub_wrapping(self, other: Self) -> Self {
                self.wrapping_sub(other)
            }

            fn zero() -> Self {
                0
            }
        }
    )*};
}

macro_rules! impl_float_element {
    ($($ty:ty),*) => {$(
        impl ScanElement for $ty {
            const SIZE: usize = std::mem::size_of::<$ty>();

            #[inline(always)]
            fn read(bytes: &[u8], order: ByteOrder) -> Self {
                decode!($ty, bytes, order)
            }

            fn from_value(value: &MemoryValue) -> MemoryResult<Self> {
                numeric_cast!(value, $ty)
            }

            #[inline(always)]
            fn approx_eq(self, other: Self) -> bool {
                (self - other).abs() <= <$ty>::EPSILON
            }

            #[inline(always)]
            fn add_wrapping(self, other: Self) -> Self {
                self + other
            }

            #[inline(always)]
            fn sub_wrapping(self, other: Self) -> Self {
                self - other
            }

            fn zero() -> Self {
                0.0
            }
        }
    )*};
}

impl_integer_element!(i8, i16, i32, i64, u8, u16, u32, u64);
impl_float_element!(f32, f64);

/// Evaluates one leaf predicate for a single element.
///
/// `value` is the constraint's scan value, or zero for kinds that take none.
#[inline(always)]
pub fn evaluate<T: ScanElement>(kind: ConstraintKind, current: T, previous: T, value: T) -> bool {
    match kind {
        ConstraintKind::Equal => current.approx_eq(value),
        ConstraintKind::NotEqual => !current.approx_eq(value),
        ConstraintKind::GreaterThan => current > value,
        ConstraintKind::GreaterThanOrEqual => current >= value,
        ConstraintKind::LessThan => current < value,
        ConstraintKind::LessThanOrEqual => current <= value,
        ConstraintKind::Changed => !current.approx_eq(previous),
        ConstraintKind::Unchanged => current.approx_eq(previous),
        ConstraintKind::Increased => current > previous,
        ConstraintKind::Decreased => current < previous,
        ConstraintKind::IncreasedByX => current.approx_eq(previous.add_wrapping(value)),
        ConstraintKind::DecreasedByX => current.approx_eq(previous.sub_wrapping(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_byte_orders() {
        let bytes = [0x01, 0x02, 0x03, 0x04];
        assert_eq!(u32::read(&bytes, ByteOrder::Little), 0x04030201);
        assert_eq!(u32::read(&bytes, ByteOrder::Big), 0x01020304);
        assert_eq!(i16::read(&[0xFF, 0xFE], ByteOrder::Big), -2);
    }

    #[test]
    fn test_from_value_casts() {
        assert_eq!(i16::from_value(&MemoryValue::U32(7)).unwrap(), 7);
        assert_eq!(f32::from_value(&MemoryValue::I32(-3)).unwrap(), -3.0);
        assert!(matches!(
            u8::from_value(&MemoryValue::String("x".into())),
            Err(MemoryError::UnsupportedType(_))
        ));
    }

    #[test]
    fn test_wrapping_deltas() {
        assert!(evaluate(ConstraintKind::IncreasedByX, 4u8, 250u8, 10u8));
        assert!(evaluate(ConstraintKind::DecreasedByX, 250u8, 4u8, 10u8));
        assert!(evaluate(ConstraintKind::IncreasedByX, i32::MIN, i32::MAX, 1));
    }

    #[test]
    fn test_float_tolerance() {
        assert!(evaluate(ConstraintKind::Equal, 0.1f32 + 0.2f32, 0.0, 0.3f32));
        assert!(evaluate(ConstraintKind::IncreasedByX, 0.3f64, 0.1, 0.2));
        assert!(!evaluate(ConstraintKind::Equal, f64::NAN, 0.0, f64::NAN));
        assert!(evaluate(ConstraintKind::Changed, 1.5f32, 1.0, 0.0));
    }

    #[test]
    fn test_ordering_uses_signedness() {
        assert!(evaluate(ConstraintKind::LessThan, -1i8, 0, 0));
        assert!(evaluate(ConstraintKind::GreaterThan, 0xFFu8, 0, 0));
        assert!(evaluate(ConstraintKind::Increased, 9u16, 5, 0));
        assert!(!evaluate(ConstraintKind::Increased, 2u16, 5, 0));
    }
}
