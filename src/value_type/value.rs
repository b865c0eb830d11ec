use std::fmt;
use std::sync::Arc;

use regex::Regex;

use super::CellRange;
use crate::ast::{ConstraintDefinition, TransformDefinition, ValuetypeAssignment};

/// Compiled regular expression compared by its source pattern.
#[derive(Debug, Clone)]
pub struct RegexValue(pub Regex);

impl RegexValue {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(Self)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl PartialEq for RegexValue {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

/// Concrete runtime value produced by evaluators and stored in table cells.
#[derive(Debug, Clone, PartialEq)]
pub enum InternalValue {
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    Text(String),
    Regex(RegexValue),
    CellRange(CellRange),
    Constraint(Arc<ConstraintDefinition>),
    ValuetypeAssignment(Arc<ValuetypeAssignment>),
    Transform(Arc<TransformDefinition>),
    Collection(Vec<InternalValue>),
}

impl InternalValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view of integers and decimals.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_collection(&self) -> Option<&[InternalValue]> {
        match self {
            Self::Collection(values) => Some(values),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer(_) | Self::Decimal(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Boolean(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Decimal(_) => "decimal",
            Self::Text(_) => "text",
            Self::Regex(_) => "regex",
            Self::CellRange(_) => "cell range",
            Self::Constraint(_) => "constraint",
            Self::ValuetypeAssignment(_) => "valuetype assignment",
            Self::Transform(_) => "transform",
            Self::Collection(_) => "collection",
        }
    }
}

impl fmt::Display for InternalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Decimal(d) => write!(f, "{}", d),
            Self::Text(s) => write!(f, "{}", s),
            Self::Regex(r) => write!(f, "/{}/", r.as_str()),
            Self::CellRange(range) => write!(f, "{}", range),
            Self::Constraint(c) => write!(f, "{}", c.name),
            Self::ValuetypeAssignment(a) => {
                write!(f, "\"{}\" oftype {}", a.name, a.value_type.name())
            }
            Self::Transform(t) => write!(f, "{}", t.name),
            Self::Collection(values) => {
                let items: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", items.join(", "))
            }
        }
    }
}

impl From<bool> for InternalValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for InternalValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for InternalValue {
    fn from(value: f64) -> Self {
        Self::Decimal(value)
    }
}

impl From<&str> for InternalValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for InternalValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl<T: Into<InternalValue>> From<Vec<T>> for InternalValue {
    fn from(values: Vec<T>) -> Self {
        Self::Collection(values.into_iter().map(Into::into).collect())
    }
}
