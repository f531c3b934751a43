//! Constraint trees describing what a scan pass keeps

use super::error::{MemoryError, MemoryResult};
use super::value::MemoryValue;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Leaf predicate applied to each element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Changed,
    Unchanged,
    Increased,
    Decreased,
    IncreasedByX,
    DecreasedByX,
}

impl ConstraintKind {
    /// Checks if this kind compares against previous values
    pub fn requires_previous(&self) -> bool {
        matches!(
            self,
            ConstraintKind::Changed
                | ConstraintKind::Unchanged
                | ConstraintKind::Increased
                | ConstraintKind::Decreased
                | ConstraintKind::IncreasedByX
                | ConstraintKind::DecreasedByX
        )
    }

    /// Checks if this kind needs a scan value
    pub fn requires_value(&self) -> bool {
        matches!(
            self,
            ConstraintKind::Equal
                | ConstraintKind::NotEqual
                | ConstraintKind::GreaterThan
                | ConstraintKind::GreaterThanOrEqual
                | ConstraintKind::LessThan
                | ConstraintKind::LessThanOrEqual
                | ConstraintKind::IncreasedByX
                | ConstraintKind::DecreasedByX
        )
    }
}

/// Accepts snake_case names, short forms (`eq`, `gt` ...) and operators.
/// Unknown names fail with `MalformedConstraint`, not `UnsupportedType`.
impl FromStr for ConstraintKind {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "equal" | "eq" | "==" => ConstraintKind::Equal,
            "not_equal" | "ne" | "!=" => ConstraintKind::NotEqual,
            "greater_than" | "gt" | ">" => ConstraintKind::GreaterThan,
            "greater_than_or_equal" | "ge" | ">=" => ConstraintKind::GreaterThanOrEqual,
            "less_than" | "lt" | "<" => ConstraintKind::LessThan,
            "less_than_or_equal" | "le" | "<=" => ConstraintKind::LessThanOrEqual,
            "changed" => ConstraintKind::Changed,
            "unchanged" => ConstraintKind::Unchanged,
            "increased" => ConstraintKind::Increased,
            "decreased" => ConstraintKind::Decreased,
            "increased_by_x" | "increased_by" => ConstraintKind::IncreasedByX,
            "decreased_by_x" | "decreased_by" => ConstraintKind::DecreasedByX,
            other => {
                return Err(MemoryError::MalformedConstraint(format!(
                    "unknown constraint kind '{}'",
                    other
                )))
            }
        };
        Ok(kind)
    }
}

/// Boolean combinator for two subtrees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalOp {
    And,
    Or,
    Xor,
}

/// A leaf of the constraint tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanConstraint {
    pub kind: ConstraintKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<MemoryValue>,
}

/// Immutable expression tree of scan predicates.
///
/// Operation children are optional so that trees arriving from an outer layer
/// can be represented before validation; a missing child fails compilation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Constraint {
    Scan(ScanConstraint),
    Operation {
        op: LogicalOp,
        left: Option<Box<Constraint>>,
        right: Option<Box<Constraint>>,
    },
}

impl Constraint {
    /// A leaf without a scan value
    pub fn leaf(kind: ConstraintKind) -> Self {
        Constraint::Scan(ScanConstraint { kind, value: None })
    }

    /// A leaf carrying a scan value
    pub fn with_value(kind: ConstraintKind, value: MemoryValue) -> Self {
        Constraint::Scan(ScanConstraint {
            kind,
            value: Some(value),
        })
    }

    pub fn and(self, other: Constraint) -> Self {
        Self::combine(LogicalOp::And, self, other)
    }

    pub fn or(self, other: Constraint) -> Self {
        Self::combine(LogicalOp::Or, self, other)
    }

    pub fn xor(self, other: Constraint) -> Self {
        Self::combine(LogicalOp::Xor, self, other)
    }

    fn combine(op: LogicalOp, left: Constraint, right: Constraint) -> Self {
        Constraint::Operation {
            op,
            left: Some(Box::new(left)),
            right: Some(Box::new(right)),
        }
    }

    /// Checks the tree shape: every operation has both children and every
    /// leaf that needs a value carries one.
    pub fn validate(&self) -> MemoryResult<()> {
        match self {
            Constraint::Scan(leaf) => {
                if leaf.kind.requires_value() && leaf.value.is_none() {
                    return Err(MemoryError::MalformedConstraint(format!(
                        "{:?} requires a scan value",
                        leaf.kind
                    )));
                }
                Ok(())
            }
            Constraint::Operation { op, left, right } => {
                let left = left.as_deref().ok_or_else(|| missing_child(*op, "left"))?;
                let right = right.as_deref().ok_or_else(|| missing_child(*op, "right"))?;
                left.validate()?;
                right.validate()
            }
        }
    }

    /// Whether any leaf compares against previous values
    pub fn requires_previous(&self) -> bool {
        match self {
            Constraint::Scan(leaf) => leaf.kind.requires_previous(),
            Constraint::Operation { left, right, .. } => {
                left.as_deref().is_some_and(Constraint::requires_previous)
                    || right.as_deref().is_some_and(Constraint::requires_previous)
            }
        }
    }

    /// Number of leaves in the tree
    pub fn leaf_count(&self) -> usize {
        match self {
            Constraint::Scan(_) => 1,
            Constraint::Operation { left, right, .. } => {
                left.as_deref().map_or(0, Constraint::leaf_count)
                    + right.as_deref().map_or(0, Constraint::leaf_count)
            }
        }
    }

    /// Parses a JSON-encoded constraint tree
    pub fn from_json(json: &str) -> MemoryResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

pub(crate) fn missing_child(op: LogicalOp, side: &str) -> MemoryError {
    MemoryError::MalformedConstraint(format!(
        "{:?} node is missing its {} operand",
        op, side
    ))
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Scan(ScanConstraint {
                kind,
                value: Some(v),
            }) => write!(f, "{:?}({})", kind, v),
            Constraint::Scan(ScanConstraint { kind, value: None }) => write!(f, "{:?}", kind),
            Constraint::Operation { op, left, right } => {
                write!(f, "(")?;
                match left {
                    Some(l) => write!(f, "{}", l)?,
                    None => write!(f, "?")?,
                }
                write!(f, " {:?} ", op)?;
                match right {
                    Some(r) => write!(f, "{}", r)?,
                    None => write!(f, "?")?,
                }
                write!(f, ")")
            }
        }
    }
}
