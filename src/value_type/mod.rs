//! Runtime value types.
//!
//! Primitive types are plain enum discriminants, so two `integer` types are
//! always equal without any registry lookup. Atomic types are interned behind
//! an `Arc` and compared by identity.

mod atomic;
mod cell_range;
mod primitive;
mod provider;
mod value;

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

pub use atomic::{AtomicTypeDeclaration, AtomicTypeRegistry, AtomicValueType};
pub use cell_range::{CellIndex, CellRange};
pub use primitive::{parse_boolean, parse_decimal, parse_integer, PrimitiveValueType};
pub use provider::{Backend, ValueTypeProvider};
pub use value::{InternalValue, RegexValue};

use crate::ast::ConstraintDefinition;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValueTypeError {
    #[error("Unknown value type: {0}")]
    UnknownType(String),
    #[error("Value type {name} extends unknown supertype {supertype}")]
    UnknownSupertype { name: String, supertype: String },
    #[error("Cycle in supertype chain of {0}")]
    SupertypeCycle(String),
    #[error("Value type {0} is already defined")]
    DuplicateType(String),
    #[error("Value type {0} cannot be referenced by users")]
    NotReferenceable(String),
    #[error("Invalid cell range: {0}")]
    InvalidCellRange(String),
    #[error("Value type {0} has no columnar representation")]
    NoColumnarRepresentation(String),
    #[error("Unsupported columnar data type: {0}")]
    UnsupportedDataType(String),
}

pub type ValueTypeResult<T> = Result<T, ValueTypeError>;

#[derive(Debug, Clone)]
pub enum ValueType {
    Primitive(PrimitiveValueType),
    Atomic(Arc<AtomicValueType>),
    Collection(Arc<ValueType>),
    /// Type of `[]`; convertible to every collection type.
    EmptyCollection,
}

impl PartialEq for ValueType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Primitive(a), Self::Primitive(b)) => a == b,
            (Self::Atomic(a), Self::Atomic(b)) => Arc::ptr_eq(a, b),
            (Self::Collection(a), Self::Collection(b)) => a == b,
            (Self::EmptyCollection, Self::EmptyCollection) => true,
            _ => false,
        }
    }
}

impl Eq for ValueType {}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl From<PrimitiveValueType> for ValueType {
    fn from(primitive: PrimitiveValueType) -> Self {
        Self::Primitive(primitive)
    }
}

/// Exhaustive dispatch over value types.
pub trait ValueTypeVisitor {
    type Output;

    fn visit_primitive(&mut self, primitive: PrimitiveValueType) -> Self::Output;
    fn visit_atomic(&mut self, atomic: &AtomicValueType) -> Self::Output;
    fn visit_collection(&mut self, element: Option<&ValueType>) -> Self::Output;
}

impl ValueType {
    pub const BOOLEAN: ValueType = ValueType::Primitive(PrimitiveValueType::Boolean);
    pub const INTEGER: ValueType = ValueType::Primitive(PrimitiveValueType::Integer);
    pub const DECIMAL: ValueType = ValueType::Primitive(PrimitiveValueType::Decimal);
    pub const TEXT: ValueType = ValueType::Primitive(PrimitiveValueType::Text);
    pub const REGEX: ValueType = ValueType::Primitive(PrimitiveValueType::Regex);
    pub const CELL_RANGE: ValueType = ValueType::Primitive(PrimitiveValueType::CellRange);
    pub const CONSTRAINT: ValueType = ValueType::Primitive(PrimitiveValueType::Constraint);
    pub const VALUETYPE_ASSIGNMENT: ValueType =
        ValueType::Primitive(PrimitiveValueType::ValuetypeAssignment);
    pub const TRANSFORM: ValueType = ValueType::Primitive(PrimitiveValueType::Transform);

    pub fn collection_of(element: ValueType) -> Self {
        Self::Collection(Arc::new(element))
    }

    pub fn accept_visitor<V: ValueTypeVisitor>(&self, visitor: &mut V) -> V::Output {
        match self {
            Self::Primitive(primitive) => visitor.visit_primitive(*primitive),
            Self::Atomic(atomic) => visitor.visit_atomic(atomic),
            Self::Collection(element) => visitor.visit_collection(Some(element)),
            Self::EmptyCollection => visitor.visit_collection(None),
        }
    }

    pub fn name(&self) -> String {
        match self {
            Self::Primitive(primitive) => primitive.to_string(),
            Self::Atomic(atomic) => atomic.name.clone(),
            Self::Collection(element) => format!("Collection<{}>", element.name()),
            Self::EmptyCollection => "Collection<>".to_string(),
        }
    }

    /// Primitive types and collections never have a supertype.
    pub fn supertype(&self) -> Option<ValueType> {
        match self {
            Self::Atomic(atomic) => Some(atomic.supertype.clone()),
            _ => None,
        }
    }

    /// Strict subtype relation along the supertype chain.
    pub fn is_subtype_of(&self, other: &ValueType) -> bool {
        let mut current = self.supertype();
        while let Some(supertype) = current {
            if &supertype == other {
                return true;
            }
            current = supertype.supertype();
        }
        false
    }

    /// The primitive at the root of the supertype chain.
    pub fn primitive(&self) -> Option<PrimitiveValueType> {
        match self {
            Self::Primitive(primitive) => Some(*primitive),
            Self::Atomic(atomic) => atomic.supertype.primitive(),
            Self::Collection(_) | Self::EmptyCollection => None,
        }
    }

    pub fn is_convertible_to(&self, target: &ValueType) -> bool {
        if self == target {
            return true;
        }
        match (self, target) {
            (Self::Primitive(a), Self::Primitive(b)) => a.is_convertible_to(b),
            (Self::Atomic(atomic), _) => atomic.supertype.is_convertible_to(target),
            (Self::EmptyCollection, Self::Collection(_)) => true,
            (Self::Collection(a), Self::Collection(b)) => a.is_convertible_to(b),
            _ => false,
        }
    }

    pub fn is_referenceable_by_user(&self) -> bool {
        match self {
            Self::Primitive(primitive) => primitive.is_referenceable_by_user(),
            Self::Atomic(_) => true,
            Self::Collection(_) | Self::EmptyCollection => false,
        }
    }

    pub fn is_allowed_as_runtime_parameter(&self) -> bool {
        match self {
            Self::Primitive(primitive) => primitive.is_allowed_as_runtime_parameter(),
            Self::Atomic(atomic) => atomic.supertype.is_allowed_as_runtime_parameter(),
            Self::Collection(_) | Self::EmptyCollection => false,
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, Self::Collection(_) | Self::EmptyCollection)
    }

    pub fn element_type(&self) -> Option<&ValueType> {
        match self {
            Self::Collection(element) => Some(element),
            _ => None,
        }
    }

    /// Checks the representation only. Constraints of atomic types need an
    /// execution context and are checked in `execution::constraint`.
    pub fn is_internal_value_representation(&self, value: &InternalValue) -> bool {
        match self {
            Self::Primitive(primitive) => primitive.is_internal_value_representation(value),
            Self::Atomic(atomic) => atomic.supertype.is_internal_value_representation(value),
            Self::Collection(element) => match value {
                InternalValue::Collection(values) => values
                    .iter()
                    .all(|v| element.is_internal_value_representation(v)),
                _ => false,
            },
            Self::EmptyCollection => {
                matches!(value, InternalValue::Collection(values) if values.is_empty())
            }
        }
    }

    pub fn from_string(&self, s: &str) -> Option<InternalValue> {
        match self {
            Self::Primitive(primitive) => primitive.from_string(s),
            Self::Atomic(atomic) => atomic.supertype.from_string(s),
            Self::Collection(_) | Self::EmptyCollection => None,
        }
    }

    /// Applies lossless numeric coercions so the value matches this type's
    /// representation (element-wise for collections).
    pub fn normalize(&self, value: InternalValue) -> InternalValue {
        match (self, value) {
            (Self::Collection(element), InternalValue::Collection(values)) => {
                InternalValue::Collection(
                    values.into_iter().map(|v| element.normalize(v)).collect(),
                )
            }
            (other, value) => match other.primitive() {
                Some(primitive) => primitive.normalize(value),
                None => value,
            },
        }
    }

    /// Constraints of this type and all atomic supertypes, innermost first.
    pub fn constraint_chain(&self) -> Vec<Arc<ConstraintDefinition>> {
        let mut constraints = Vec::new();
        let mut current = Some(self.clone());
        while let Some(value_type) = current {
            if let Self::Atomic(atomic) = &value_type {
                constraints.extend(atomic.constraints.iter().cloned());
            }
            current = value_type.supertype();
        }
        constraints
    }
}
