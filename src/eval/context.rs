use std::collections::HashMap;
use std::sync::Arc;

use crate::value_type::{InternalValue, ValueType};

use super::column_expr::ColumnExpr;
use super::operator::{OperatorRegistry, SymbolicValue};

#[derive(Debug, Clone, PartialEq, strum::Display)]
pub enum ScopeError {
    VariableNotFound(String),
}

/// Free-variable bindings visible to one expression evaluation.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    variables: HashMap<String, SymbolicValue>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, name: &str) -> Result<&SymbolicValue, ScopeError> {
        self.variables
            .get(name)
            .ok_or_else(|| ScopeError::VariableNotFound(name.to_string()))
    }

    pub fn insert(&mut self, name: String, value: SymbolicValue) -> Option<SymbolicValue> {
        self.variables.insert(name, value)
    }

    pub fn remove(&mut self, name: &str) -> Option<SymbolicValue> {
        self.variables.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

/// Everything an expression may read while it is evaluated: the variable
/// scope, runtime parameters and the operator registry.
///
/// Bindings are set by the caller (once per row, or once per transform port)
/// and must be removed again afterwards; [`EvaluationContext::with_bindings`]
/// does both around a closure.
#[derive(Debug, Clone, Default)]
pub struct EvaluationContext {
    scope: Scope,
    runtime_parameters: Arc<HashMap<String, String>>,
    operator_registry: OperatorRegistry,
}

impl EvaluationContext {
    pub fn new(runtime_parameters: Arc<HashMap<String, String>>) -> Self {
        Self {
            scope: Scope::new(),
            runtime_parameters,
            operator_registry: OperatorRegistry::new(),
        }
    }

    pub fn operator_registry(&self) -> &OperatorRegistry {
        &self.operator_registry
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn set_value(&mut self, name: impl Into<String>, value: InternalValue) {
        self.scope.insert(name.into(), SymbolicValue::Scalar(value));
    }

    pub fn set_column(&mut self, name: impl Into<String>, column: ColumnExpr) {
        self.scope.insert(name.into(), SymbolicValue::Column(column));
    }

    pub fn delete_value(&mut self, name: &str) {
        self.scope.remove(name);
    }

    pub fn value_for(&self, name: &str) -> Result<&SymbolicValue, ScopeError> {
        self.scope.lookup(name)
    }

    /// Binds `bindings`, runs `f`, and removes the bindings again.
    pub fn with_bindings<T>(
        &mut self,
        bindings: Vec<(String, SymbolicValue)>,
        f: impl FnOnce(&Self) -> T,
    ) -> T {
        let names: Vec<String> = bindings.iter().map(|(name, _)| name.clone()).collect();
        for (name, value) in bindings {
            self.scope.insert(name, value);
        }
        let result = f(self);
        for name in &names {
            self.scope.remove(name);
        }
        result
    }

    /// Parses the raw runtime parameter with `value_type`. `None` when the
    /// parameter is missing or malformed.
    pub fn value_for_runtime_parameter(
        &self,
        name: &str,
        value_type: &ValueType,
    ) -> Option<InternalValue> {
        let raw = self.runtime_parameters.get(name)?;
        value_type.from_string(raw)
    }

    pub fn has_runtime_parameter(&self, name: &str) -> bool {
        self.runtime_parameters.contains_key(name)
    }
}
