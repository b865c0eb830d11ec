use arrow::datatypes::DataType;
use serde::{Deserialize, Serialize};

use super::{
    AtomicValueType, PrimitiveValueType, ValueType, ValueTypeError, ValueTypeResult,
    ValueTypeVisitor,
};

/// Physical table backend selected for a run.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Array,
    Columnar,
}

/// Per-backend factory for value types. Both backends hand out the same
/// primitive types; the columnar one additionally maps them onto Arrow types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueTypeProvider {
    backend: Backend,
}

impl ValueTypeProvider {
    pub const fn new(backend: Backend) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn primitive(&self, primitive: PrimitiveValueType) -> ValueType {
        ValueType::Primitive(primitive)
    }

    pub fn primitives(&self) -> Vec<ValueType> {
        use strum::IntoEnumIterator;
        PrimitiveValueType::iter().map(ValueType::Primitive).collect()
    }

    pub fn empty_collection(&self) -> ValueType {
        ValueType::EmptyCollection
    }

    pub fn create_collection_value_type_of(&self, element: ValueType) -> ValueType {
        ValueType::collection_of(element)
    }

    pub fn arrow_type_of(&self, value_type: &ValueType) -> ValueTypeResult<DataType> {
        value_type.accept_visitor(&mut ArrowTypeVisitor)
    }

    /// Like [`Self::arrow_type_of`], but falls back to `Utf8` with an error log.
    pub fn arrow_type_or_text(&self, value_type: &ValueType) -> DataType {
        self.arrow_type_of(value_type).unwrap_or_else(|e| {
            tracing::error!("{}; storing as Utf8", e);
            DataType::Utf8
        })
    }

    pub fn value_type_of_arrow(&self, data_type: &DataType) -> ValueTypeResult<ValueType> {
        match data_type {
            DataType::Boolean => Ok(ValueType::BOOLEAN),
            DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32 => Ok(ValueType::INTEGER),
            DataType::Float32 | DataType::Float64 => Ok(ValueType::DECIMAL),
            DataType::Utf8 | DataType::LargeUtf8 => Ok(ValueType::TEXT),
            other => Err(ValueTypeError::UnsupportedDataType(other.to_string())),
        }
    }
}

struct ArrowTypeVisitor;

impl ValueTypeVisitor for ArrowTypeVisitor {
    type Output = ValueTypeResult<DataType>;

    fn visit_primitive(&mut self, primitive: PrimitiveValueType) -> Self::Output {
        match primitive {
            PrimitiveValueType::Boolean => Ok(DataType::Boolean),
            PrimitiveValueType::Integer => Ok(DataType::Int64),
            PrimitiveValueType::Decimal => Ok(DataType::Float64),
            PrimitiveValueType::Text => Ok(DataType::Utf8),
            other => Err(ValueTypeError::NoColumnarRepresentation(other.to_string())),
        }
    }

    fn visit_atomic(&mut self, atomic: &AtomicValueType) -> Self::Output {
        atomic.supertype.accept_visitor(self)
    }

    fn visit_collection(&mut self, element: Option<&ValueType>) -> Self::Output {
        let name = match element {
            Some(element) => format!("Collection<{}>", element.name()),
            None => "Collection<>".to_string(),
        };
        Err(ValueTypeError::NoColumnarRepresentation(name))
    }
}
