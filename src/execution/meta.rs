use crate::table::IoType;
use crate::value_type::{InternalValue, ValueType};

/// Declared type and optional default of one property.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertySpec {
    pub value_type: ValueType,
    pub default: Option<InternalValue>,
}

impl PropertySpec {
    pub fn required(value_type: ValueType) -> Self {
        Self {
            value_type,
            default: None,
        }
    }

    /// # Panics
    ///
    /// Panics when `default` is not a valid `value_type` value.
    pub fn with_default(value_type: ValueType, default: impl Into<InternalValue>) -> Self {
        let default = value_type.normalize(default.into());
        assert!(
            value_type.is_internal_value_representation(&default),
            "Default value {} is not a valid {}",
            default,
            value_type.name()
        );
        Self {
            value_type,
            default: Some(default),
        }
    }
}

fn find<'a>(properties: &'a [(String, PropertySpec)], name: &str) -> Option<&'a PropertySpec> {
    properties
        .iter()
        .find(|(property, _)| property == name)
        .map(|(_, spec)| spec)
}

/// Static description of a block type.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockMeta {
    pub block_type: String,
    pub input: IoType,
    pub output: IoType,
    properties: Vec<(String, PropertySpec)>,
}

impl BlockMeta {
    pub fn new(block_type: impl Into<String>, input: IoType, output: IoType) -> Self {
        Self {
            block_type: block_type.into(),
            input,
            output,
            properties: Vec::new(),
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, spec: PropertySpec) -> Self {
        self.properties.push((name.into(), spec));
        self
    }

    pub fn property(&self, name: &str) -> Option<&PropertySpec> {
        find(&self.properties, name)
    }
}

/// Static description of a typed constraint.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintMeta {
    pub constraint_type: String,
    /// Value type the constraint can be attached to.
    pub compatible_value_type: ValueType,
    properties: Vec<(String, PropertySpec)>,
}

impl ConstraintMeta {
    pub fn new(constraint_type: impl Into<String>, compatible_value_type: ValueType) -> Self {
        Self {
            constraint_type: constraint_type.into(),
            compatible_value_type,
            properties: Vec::new(),
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, spec: PropertySpec) -> Self {
        self.properties.push((name.into(), spec));
        self
    }

    pub fn property(&self, name: &str) -> Option<&PropertySpec> {
        find(&self.properties, name)
    }
}
