use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::Arc;

use super::{PrimitiveValueType, ValueType, ValueTypeError, ValueTypeResult};
use crate::ast::ConstraintDefinition;

/// User-declared refinement of a primitive type
/// (`valuetype Percent oftype decimal { constraints: [ZeroToOne]; }`).
#[derive(Debug)]
pub struct AtomicValueType {
    pub name: String,
    pub supertype: ValueType,
    pub constraints: Vec<Arc<ConstraintDefinition>>,
}

impl AtomicValueType {
    pub fn new(
        name: impl Into<String>,
        supertype: ValueType,
        constraints: Vec<Arc<ConstraintDefinition>>,
    ) -> Self {
        Self {
            name: name.into(),
            supertype,
            constraints,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AtomicTypeDeclaration {
    pub name: String,
    pub supertype: String,
    pub constraints: Vec<Arc<ConstraintDefinition>>,
}

impl AtomicTypeDeclaration {
    pub fn new(name: impl Into<String>, supertype: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            supertype: supertype.into(),
            constraints: Vec::new(),
        }
    }

    pub fn with_constraint(mut self, constraint: ConstraintDefinition) -> Self {
        self.constraints.push(Arc::new(constraint));
        self
    }
}

/// Resolves atomic-type declarations into interned types. Each declared name
/// maps to exactly one `Arc`, so identity comparison stays meaningful.
#[derive(Debug, Default)]
pub struct AtomicTypeRegistry {
    declarations: HashMap<String, AtomicTypeDeclaration>,
    resolved: HashMap<String, ValueType>,
}

impl AtomicTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, declaration: AtomicTypeDeclaration) -> ValueTypeResult<()> {
        if self.declarations.contains_key(&declaration.name)
            || PrimitiveValueType::from_str(&declaration.name).is_ok()
        {
            return Err(ValueTypeError::DuplicateType(declaration.name));
        }
        self.declarations
            .insert(declaration.name.clone(), declaration);
        Ok(())
    }

    /// Looks up a user-referenceable type by name, resolving atomic
    /// declarations on first use.
    pub fn resolve(&mut self, name: &str) -> ValueTypeResult<ValueType> {
        let mut visiting = HashSet::new();
        self.resolve_inner(name, &mut visiting)
    }

    /// Resolves every declaration, surfacing unknown supertypes and cycles.
    pub fn resolve_all(&mut self) -> ValueTypeResult<Vec<ValueType>> {
        let mut names: Vec<String> = self.declarations.keys().cloned().collect();
        names.sort();
        names.iter().map(|name| self.resolve(name)).collect()
    }

    fn resolve_inner(
        &mut self,
        name: &str,
        visiting: &mut HashSet<String>,
    ) -> ValueTypeResult<ValueType> {
        if let Ok(primitive) = PrimitiveValueType::from_str(name) {
            if primitive.is_referenceable_by_user() {
                return Ok(ValueType::Primitive(primitive));
            }
            return Err(ValueTypeError::NotReferenceable(name.to_string()));
        }
        if let Some(resolved) = self.resolved.get(name) {
            return Ok(resolved.clone());
        }
        let declaration = self
            .declarations
            .get(name)
            .cloned()
            .ok_or_else(|| ValueTypeError::UnknownType(name.to_string()))?;
        if !visiting.insert(name.to_string()) {
            return Err(ValueTypeError::SupertypeCycle(name.to_string()));
        }
        let supertype = self
            .resolve_inner(&declaration.supertype, visiting)
            .map_err(|e| match e {
                ValueTypeError::UnknownType(supertype) => ValueTypeError::UnknownSupertype {
                    name: declaration.name.clone(),
                    supertype,
                },
                other => other,
            })?;
        visiting.remove(name);

        let value_type = ValueType::Atomic(Arc::new(AtomicValueType::new(
            declaration.name.clone(),
            supertype,
            declaration.constraints.clone(),
        )));
        self.resolved.insert(name.to_string(), value_type.clone());
        Ok(value_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolves_chain_and_interns() {
        let mut registry = AtomicTypeRegistry::new();
        registry
            .declare(AtomicTypeDeclaration::new("Percent", "decimal"))
            .unwrap();
        registry
            .declare(AtomicTypeDeclaration::new("SmallPercent", "Percent"))
            .unwrap();

        let small = registry.resolve("SmallPercent").unwrap();
        let percent = registry.resolve("Percent").unwrap();
        assert!(small.is_subtype_of(&percent));
        assert!(small.is_subtype_of(&ValueType::DECIMAL));
        assert_eq!(registry.resolve("Percent").unwrap(), percent);
        assert_eq!(small.supertype(), Some(percent));
    }

    #[test]
    fn test_rejects_unknown_supertype() {
        let mut registry = AtomicTypeRegistry::new();
        registry
            .declare(AtomicTypeDeclaration::new("Broken", "Missing"))
            .unwrap();
        assert!(matches!(
            registry.resolve("Broken"),
            Err(ValueTypeError::UnknownSupertype { .. })
        ));
    }

    #[test]
    fn test_rejects_cycles() {
        let mut registry = AtomicTypeRegistry::new();
        registry
            .declare(AtomicTypeDeclaration::new("A", "B"))
            .unwrap();
        registry
            .declare(AtomicTypeDeclaration::new("B", "A"))
            .unwrap();
        assert!(matches!(
            registry.resolve_all(),
            Err(ValueTypeError::SupertypeCycle(_))
        ));
    }

    #[test]
    fn test_rejects_shadowing_primitive() {
        let mut registry = AtomicTypeRegistry::new();
        assert!(registry
            .declare(AtomicTypeDeclaration::new("text", "text"))
            .is_err());
        assert!(matches!(
            registry.resolve("Regex"),
            Err(ValueTypeError::NotReferenceable(_))
        ));
    }
}
