//! Lowering of constraint trees into executable predicates
//!
//! A [`Constraint`] is compiled once per scan into a [`CompiledPredicate`]
//! specialised for one element type. The same compiled tree has two forms:
//! a scalar form that tests one element, and a vector form that tests a
//! whole [`VECTOR_SIZE`] chunk and returns a [`LaneMask`]. Both evaluate
//! leaves through [`evaluate`], so the numeric semantics are defined once.
//!
//! [`ScanPredicate`] is the tagged union over element types handed around by
//! the orchestrator; [`with_predicate!`] unwraps it so the scan loops are
//! monomorphized per type.

use super::element::{evaluate, ScanElement};
use super::lanes::{Chunk, LaneMask, VECTOR_SIZE};
use crate::core::types::{
    missing_child, ByteOrder, Constraint, ConstraintKind, DataType, LogicalOp, MemoryError,
    MemoryResult, ValueType,
};

/// Anything the scanners can evaluate against raw memory
pub trait LanePredicate: Sync {
    /// Size in bytes of one compared element
    fn element_size(&self) -> usize;

    /// Whether previous values are read
    fn requires_previous(&self) -> bool;

    /// Compares the element at the start of `current`/`previous`.
    ///
    /// Both slices must hold at least `element_size()` bytes.
    fn matches(&self, current: &[u8], previous: &[u8]) -> bool;

    /// Compares every element of a chunk. Elements sit at lane offsets
    /// `0, size, 2 * size, ...`; each element's result fills all its lanes.
    fn compare(&self, current: &Chunk, previous: &Chunk) -> LaneMask;
}

#[derive(Debug, Clone, PartialEq)]
enum PredicateNode<T> {
    Leaf {
        kind: ConstraintKind,
        value: T,
    },
    Operation {
        op: LogicalOp,
        left: Box<PredicateNode<T>>,
        right: Box<PredicateNode<T>>,
    },
}

/// A constraint tree specialised for element type `T`
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledPredicate<T: ScanElement> {
    root: PredicateNode<T>,
    byte_order: ByteOrder,
    requires_previous: bool,
}

impl<T: ScanElement> CompiledPredicate<T> {
    /// Compiles `constraint` for elements stored in `byte_order`
    pub fn compile(constraint: &Constraint, byte_order: ByteOrder) -> MemoryResult<Self> {
        Ok(CompiledPredicate {
            root: Self::lower(constraint)?,
            byte_order,
            requires_previous: constraint.requires_previous(),
        })
    }

    fn lower(constraint: &Constraint) -> MemoryResult<PredicateNode<T>> {
        match constraint {
            Constraint::Scan(leaf) => {
                let value = match (&leaf.value, leaf.kind.requires_value()) {
                    (Some(value), true) => T::from_value(value)?,
                    (None, true) => {
                        return Err(MemoryError::MalformedConstraint(format!(
                            "{:?} requires a scan value",
                            leaf.kind
                        )))
                    }
                    (_, false) => T::zero(),
                };
                Ok(PredicateNode::Leaf {
                    kind: leaf.kind,
                    value,
                })
            }
            Constraint::Operation { op, left, right } => {
                let left = left.as_deref().ok_or_else(|| missing_child(*op, "left"))?;
                let right = right.as_deref().ok_or_else(|| missing_child(*op, "right"))?;
                Ok(PredicateNode::Operation {
                    op: *op,
                    left: Box::new(Self::lower(left)?),
                    right: Box::new(Self::lower(right)?),
                })
            }
        }
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    fn matches_node(&self, node: &PredicateNode<T>, current: T, previous: T) -> bool {
        match node {
            PredicateNode::Leaf { kind, value } => evaluate(*kind, current, previous, *value),
            PredicateNode::Operation { op, left, right } => {
                let left = self.matches_node(left, current, previous);
                match op {
                    LogicalOp::And => left && self.matches_node(right, current, previous),
                    LogicalOp::Or => left || self.matches_node(right, current, previous),
                    LogicalOp::Xor => left ^ self.matches_node(right, current, previous),
                }
            }
        }
    }

    fn compare_leaf(
        &self,
        kind: ConstraintKind,
        value: T,
        current: &Chunk,
        previous: &Chunk,
    ) -> LaneMask {
        let mut lanes = [0u8; VECTOR_SIZE];
        for (index, element) in lanes.chunks_exact_mut(T::SIZE).enumerate() {
            let at = index * T::SIZE;
            let cur = T::read(&current[at..], self.byte_order);
            let prev = T::read(&previous[at..], self.byte_order);
            if evaluate(kind, cur, prev, value) {
                element.fill(0xFF);
            }
        }
        LaneMask::from_bytes(lanes)
    }

    fn compare_node(&self, node: &PredicateNode<T>, current: &Chunk, previous: &Chunk) -> LaneMask {
        match node {
            PredicateNode::Leaf { kind, value } => {
                self.compare_leaf(*kind, *value, current, previous)
            }
            PredicateNode::Operation { op, left, right } => {
                let left = self.compare_node(left, current, previous);
                match op {
                    LogicalOp::And if left.is_all_false() => left,
                    LogicalOp::Or if left.is_all_true() => left,
                    LogicalOp::And => left & self.compare_node(right, current, previous),
                    LogicalOp::Or => left | self.compare_node(right, current, previous),
                    LogicalOp::Xor => left ^ self.compare_node(right, current, previous),
                }
            }
        }
    }
}

impl<T: ScanElement> LanePredicate for CompiledPredicate<T> {
    fn element_size(&self) -> usize {
        T::SIZE
    }

    fn requires_previous(&self) -> bool {
        self.requires_previous
    }

    #[inline]
    fn matches(&self, current: &[u8], previous: &[u8]) -> bool {
        let cur = T::read(current, self.byte_order);
        let prev = if self.requires_previous {
            T::read(previous, self.byte_order)
        } else {
            T::zero()
        };
        self.matches_node(&self.root, cur, prev)
    }

    #[inline]
    fn compare(&self, current: &Chunk, previous: &Chunk) -> LaneMask {
        self.compare_node(&self.root, current, previous)
    }
}

/// A compiled predicate for one of the scannable element types
#[derive(Debug, Clone, PartialEq)]
pub enum ScanPredicate {
    I8(CompiledPredicate<i8>),
    I16(CompiledPredicate<i16>),
    I32(CompiledPredicate<i32>),
    I64(CompiledPredicate<i64>),
    U8(CompiledPredicate<u8>),
    U16(CompiledPredicate<u16>),
    U32(CompiledPredicate<u32>),
    U64(CompiledPredicate<u64>),
    F32(CompiledPredicate<f32>),
    F64(CompiledPredicate<f64>),
}

/// Runs `$body` with `$p` bound to the typed predicate inside a
/// [`ScanPredicate`], instantiating the body once per element type
#[macro_export]
macro_rules! with_predicate {
    ($predicate:expr, |$p:ident| $body:expr) => {
        match $predicate {
            $crate::memory::scanner::ScanPredicate::I8($p) => $body,
            $crate::memory::scanner::ScanPredicate::I16($p) => $body,
            $crate::memory::scanner::ScanPredicate::I32($p) => $body,
            $crate::memory::scanner::ScanPredicate::I64($p) => $body,
            $crate::memory::scanner::ScanPredicate::U8($p) => $body,
            $crate::memory::scanner::ScanPredicate::U16($p) => $body,
            $crate::memory::scanner::ScanPredicate::U32($p) => $body,
            $crate::memory::scanner::ScanPredicate::U64($p) => $body,
            $crate::memory::scanner::ScanPredicate::F32($p) => $body,
            $crate::memory::scanner::ScanPredicate::F64($p) => $body,
        }
    };
}

impl ScanPredicate {
    /// Compiles a constraint tree for `data_type`.
    ///
    /// Fails with `MalformedConstraint` for incomplete trees and
    /// `UnsupportedType` for non-numeric types or scan values.
    pub fn compile(constraint: &Constraint, data_type: DataType) -> MemoryResult<Self> {
        constraint.validate()?;
        let order = data_type.byte_order;
        let predicate = match data_type.value_type {
            ValueType::I8 => ScanPredicate::I8(CompiledPredicate::compile(constraint, order)?),
            ValueType::I16 => ScanPredicate::I16(CompiledPredicate::compile(constraint, order)?),
            ValueType::I32 => ScanPredicate::I32(CompiledPredicate::compile(constraint, order)?),
            ValueType::I64 => ScanPredicate::I64(CompiledPredicate::compile(constraint, order)?),
            ValueType::U8 => ScanPredicate::U8(CompiledPredicate::compile(constraint, order)?),
            ValueType::U16 => ScanPredicate::U16(CompiledPredicate::compile(constraint, order)?),
            ValueType::U32 => ScanPredicate::U32(CompiledPredicate::compile(constraint, order)?),
            ValueType::U64 => ScanPredicate::U64(CompiledPredicate::compile(constraint, order)?),
            ValueType::F32 => ScanPredicate::F32(CompiledPredicate::compile(constraint, order)?),
            ValueType::F64 => ScanPredicate::F64(CompiledPredicate::compile(constraint, order)?),
            other @ (ValueType::Bytes | ValueType::String) => {
                return Err(MemoryError::UnsupportedType(format!(
                    "{} cannot be compared by the scanner",
                    other
                )))
            }
        };
        Ok(predicate)
    }
}

impl LanePredicate for ScanPredicate {
    fn element_size(&self) -> usize {
        with_predicate!(self, |p| p.element_size())
    }

    fn requires_previous(&self) -> bool {
        with_predicate!(self, |p| p.requires_previous())
    }

    fn matches(&self, current: &[u8], previous: &[u8]) -> bool {
        with_predicate!(self, |p| p.matches(current, previous))
    }

    fn compare(&self, current: &Chunk, previous: &Chunk) -> LaneMask {
        with_predicate!(self, |p| p.compare(current, previous))
    }
}
