use lazy_static::lazy_static;
use regex::Regex;

use super::{InternalValue, RegexValue};

lazy_static! {
    static ref DECIMAL_REGEX: Regex =
        Regex::new(r"^[+-]?([0-9]*[,.])?[0-9]+([eE][+-]?\d+)?$").unwrap();
    static ref INTEGER_REGEX: Regex = Regex::new(r"^[+-]?[0-9]+$").unwrap();
    static ref TRUE_REGEX: Regex = Regex::new(r"(?i)^true$").unwrap();
    static ref FALSE_REGEX: Regex = Regex::new(r"(?i)^false$").unwrap();
}

/// Closed set of built-in value types.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString, strum::EnumIter,
)]
pub enum PrimitiveValueType {
    #[strum(serialize = "boolean")]
    Boolean,
    #[strum(serialize = "integer")]
    Integer,
    #[strum(serialize = "decimal")]
    Decimal,
    #[strum(serialize = "text")]
    Text,
    #[strum(serialize = "Regex")]
    Regex,
    #[strum(serialize = "CellRange")]
    CellRange,
    #[strum(serialize = "Constraint")]
    Constraint,
    #[strum(serialize = "ValuetypeAssignment")]
    ValuetypeAssignment,
    #[strum(serialize = "Transform")]
    Transform,
}

impl PrimitiveValueType {
    pub fn is_referenceable_by_user(&self) -> bool {
        matches!(
            self,
            Self::Boolean | Self::Integer | Self::Decimal | Self::Text
        )
    }

    pub fn is_allowed_as_runtime_parameter(&self) -> bool {
        matches!(
            self,
            Self::Boolean | Self::Integer | Self::Decimal | Self::Text | Self::Regex
        )
    }

    pub fn is_convertible_to(&self, target: &PrimitiveValueType) -> bool {
        self == target || (*self == Self::Integer && *target == Self::Decimal)
    }

    pub fn is_internal_value_representation(&self, value: &InternalValue) -> bool {
        match (self, value) {
            (Self::Boolean, InternalValue::Boolean(_)) => true,
            (Self::Integer, InternalValue::Integer(_)) => true,
            (Self::Decimal, InternalValue::Decimal(d)) => d.is_finite(),
            (Self::Text, InternalValue::Text(_)) => true,
            (Self::Regex, InternalValue::Regex(_)) => true,
            (Self::CellRange, InternalValue::CellRange(_)) => true,
            (Self::Constraint, InternalValue::Constraint(_)) => true,
            (Self::ValuetypeAssignment, InternalValue::ValuetypeAssignment(_)) => true,
            (Self::Transform, InternalValue::Transform(_)) => true,
            _ => false,
        }
    }

    /// Parses external literal text. `None` marks malformed input.
    pub fn from_string(&self, s: &str) -> Option<InternalValue> {
        match self {
            Self::Boolean => parse_boolean(s).map(InternalValue::Boolean),
            Self::Integer => parse_integer(s).map(InternalValue::Integer),
            Self::Decimal => parse_decimal(s).map(InternalValue::Decimal),
            Self::Text => Some(InternalValue::Text(s.to_string())),
            Self::Regex => RegexValue::new(s).ok().map(InternalValue::Regex),
            Self::CellRange => s.parse().ok().map(InternalValue::CellRange),
            Self::Constraint | Self::ValuetypeAssignment | Self::Transform => None,
        }
    }

    /// Lossless numeric coercion into this type's representation.
    pub fn normalize(&self, value: InternalValue) -> InternalValue {
        match (self, value) {
            (Self::Decimal, InternalValue::Integer(i)) => InternalValue::Decimal(i as f64),
            (Self::Integer, InternalValue::Decimal(d))
                if d.is_finite() && d.fract() == 0.0 && d.abs() < i64::MAX as f64 =>
            {
                InternalValue::Integer(d as i64)
            }
            (_, value) => value,
        }
    }
}

pub fn parse_boolean(s: &str) -> Option<bool> {
    if TRUE_REGEX.is_match(s) {
        Some(true)
    } else if FALSE_REGEX.is_match(s) {
        Some(false)
    } else {
        None
    }
}

pub fn parse_integer(s: &str) -> Option<i64> {
    if !INTEGER_REGEX.is_match(s) {
        return None;
    }
    s.trim_start_matches('+').parse().ok()
}

/// Accepts `,` as decimal separator.
pub fn parse_decimal(s: &str) -> Option<f64> {
    if !DECIMAL_REGEX.is_match(s) {
        return None;
    }
    s.replacen(',', ".", 1)
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite())
}
