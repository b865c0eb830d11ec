use std::sync::Arc;

use crate::ast::{ConstraintBody, ConstraintDefinition};
use crate::diagnostic::Diagnostics;
use crate::eval::SymbolicValue;
use crate::value_type::{InternalValue, ValueType};

use super::{ConstraintMeta, ExecutionContext, PropertySpec, StackNode};

/// Checks values against one typed constraint. Properties are read through
/// the context, whose current node is the constraint definition.
pub trait ConstraintExecutor: Send + Sync {
    fn meta(&self) -> &ConstraintMeta;

    fn is_valid(&self, value: &InternalValue, context: &ExecutionContext) -> bool;
}

/// Whether `value` represents `value_type` and satisfies every constraint
/// along its supertype chain.
pub fn is_valid_value(value: &InternalValue, value_type: &ValueType, context: &ExecutionContext) -> bool {
    value_type.is_internal_value_representation(value)
        && value_type
            .constraint_chain()
            .iter()
            .all(|constraint| satisfies(value, constraint, context))
}

fn satisfies(
    value: &InternalValue,
    constraint: &Arc<ConstraintDefinition>,
    context: &ExecutionContext,
) -> bool {
    let context = context.enter_node(StackNode::Constraint(constraint.clone()));
    match &constraint.body {
        ConstraintBody::Expression(expression) => {
            let mut evaluation = context.evaluation_context();
            let mut diagnostics = Diagnostics::new();
            let result = evaluation.with_bindings(
                vec![("value".to_string(), SymbolicValue::Scalar(value.clone()))],
                |scope| context.evaluator().evaluate(expression, scope, &mut diagnostics),
            );
            for diagnostic in diagnostics.iter() {
                context.logger().log_debug(diagnostic.to_string());
            }
            matches!(result, Some(InternalValue::Boolean(true)))
        }
        ConstraintBody::Typed {
            constraint_type, ..
        } => match context.registry().constraint(constraint_type) {
            Some(executor) => executor.is_valid(value, &context),
            None => {
                context
                    .logger()
                    .log_err(format!("Unknown constraint type `{}`", constraint_type));
                false
            }
        },
    }
}

/// Reads a constraint property, logging and treating failures as a violation.
fn property(context: &ExecutionContext, name: &str, value_type: &ValueType) -> Option<InternalValue> {
    context
        .get_property_value(name, value_type)
        .map_err(|e| context.logger().log_err(e.to_string()))
        .ok()
}

fn text_list() -> ValueType {
    ValueType::collection_of(ValueType::TEXT)
}

pub struct AllowlistConstraintExecutor {
    meta: ConstraintMeta,
}

impl AllowlistConstraintExecutor {
    pub fn new() -> Self {
        Self {
            meta: ConstraintMeta::new("AllowlistConstraint", ValueType::TEXT)
                .with_property("allowlist", PropertySpec::required(text_list())),
        }
    }
}

impl Default for AllowlistConstraintExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstraintExecutor for AllowlistConstraintExecutor {
    fn meta(&self) -> &ConstraintMeta {
        &self.meta
    }

    fn is_valid(&self, value: &InternalValue, context: &ExecutionContext) -> bool {
        let Some(allowlist) = property(context, "allowlist", &text_list()) else {
            return false;
        };
        allowlist
            .as_collection()
            .is_some_and(|allowed| allowed.contains(value))
    }
}

pub struct DenylistConstraintExecutor {
    meta: ConstraintMeta,
}

impl DenylistConstraintExecutor {
    pub fn new() -> Self {
        Self {
            meta: ConstraintMeta::new("DenylistConstraint", ValueType::TEXT)
                .with_property("denylist", PropertySpec::required(text_list())),
        }
    }
}

impl Default for DenylistConstraintExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstraintExecutor for DenylistConstraintExecutor {
    fn meta(&self) -> &ConstraintMeta {
        &self.meta
    }

    fn is_valid(&self, value: &InternalValue, context: &ExecutionContext) -> bool {
        let Some(denylist) = property(context, "denylist", &text_list()) else {
            return false;
        };
        denylist
            .as_collection()
            .is_some_and(|denied| !denied.contains(value))
    }
}

pub struct RegexConstraintExecutor {
    meta: ConstraintMeta,
}

impl RegexConstraintExecutor {
    pub fn new() -> Self {
        Self {
            meta: ConstraintMeta::new("RegexConstraint", ValueType::TEXT)
                .with_property("regex", PropertySpec::required(ValueType::REGEX)),
        }
    }
}

impl Default for RegexConstraintExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstraintExecutor for RegexConstraintExecutor {
    fn meta(&self) -> &ConstraintMeta {
        &self.meta
    }

    fn is_valid(&self, value: &InternalValue, context: &ExecutionContext) -> bool {
        let Some(InternalValue::Regex(regex)) = property(context, "regex", &ValueType::REGEX)
        else {
            return false;
        };
        value.as_str().is_some_and(|text| regex.0.is_match(text))
    }
}

/// Numeric bounds; unset bounds are the extreme finite decimals.
pub struct RangeConstraintExecutor {
    meta: ConstraintMeta,
}

impl RangeConstraintExecutor {
    pub fn new() -> Self {
        Self {
            meta: ConstraintMeta::new("RangeConstraint", ValueType::DECIMAL)
                .with_property(
                    "lowerBound",
                    PropertySpec::with_default(ValueType::DECIMAL, f64::MIN),
                )
                .with_property(
                    "lowerBoundInclusive",
                    PropertySpec::with_default(ValueType::BOOLEAN, true),
                )
                .with_property(
                    "upperBound",
                    PropertySpec::with_default(ValueType::DECIMAL, f64::MAX),
                )
                .with_property(
                    "upperBoundInclusive",
                    PropertySpec::with_default(ValueType::BOOLEAN, true),
                ),
        }
    }
}

impl Default for RangeConstraintExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstraintExecutor for RangeConstraintExecutor {
    fn meta(&self) -> &ConstraintMeta {
        &self.meta
    }

    fn is_valid(&self, value: &InternalValue, context: &ExecutionContext) -> bool {
        let Some(number) = value.as_f64() else {
            return false;
        };
        let bound = |name: &str| property(context, name, &ValueType::DECIMAL)?.as_f64();
        let flag = |name: &str| property(context, name, &ValueType::BOOLEAN)?.as_bool();
        let (Some(lower), Some(lower_inclusive), Some(upper), Some(upper_inclusive)) = (
            bound("lowerBound"),
            flag("lowerBoundInclusive"),
            bound("upperBound"),
            flag("upperBoundInclusive"),
        ) else {
            return false;
        };
        let above = if lower_inclusive {
            number >= lower
        } else {
            number > lower
        };
        let below = if upper_inclusive {
            number <= upper
        } else {
            number < upper
        };
        above && below
    }
}

/// Bounds on the number of characters of a text.
pub struct LengthConstraintExecutor {
    meta: ConstraintMeta,
}

impl LengthConstraintExecutor {
    pub fn new() -> Self {
        Self {
            meta: ConstraintMeta::new("LengthConstraint", ValueType::TEXT)
                .with_property("minLength", PropertySpec::with_default(ValueType::INTEGER, 0i64))
                .with_property(
                    "maxLength",
                    PropertySpec::with_default(ValueType::INTEGER, i64::MAX),
                ),
        }
    }
}

impl Default for LengthConstraintExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstraintExecutor for LengthConstraintExecutor {
    fn meta(&self) -> &ConstraintMeta {
        &self.meta
    }

    fn is_valid(&self, value: &InternalValue, context: &ExecutionContext) -> bool {
        let Some(text) = value.as_str() else {
            return false;
        };
        let length = |name: &str| property(context, name, &ValueType::INTEGER)?.as_i64();
        let (Some(min), Some(max)) = (length("minLength"), length("maxLength")) else {
            return false;
        };
        let count = text.chars().count() as i64;
        (min..=max).contains(&count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOperator, Expression, PipelineDefinition};
    use crate::config::RunConfig;
    use crate::execution::ExecutorRegistry;
    use crate::value_type::AtomicValueType;

    fn context() -> ExecutionContext {
        ExecutionContext::new(
            Arc::new(PipelineDefinition::new("Constraints")),
            Arc::new(RunConfig::default()),
            Arc::new(ExecutorRegistry::with_standard_executors()),
        )
    }

    fn atomic(supertype: ValueType, constraints: Vec<ConstraintDefinition>) -> ValueType {
        ValueType::Atomic(Arc::new(AtomicValueType::new(
            "Constrained",
            supertype,
            constraints.into_iter().map(Arc::new).collect(),
        )))
    }

    #[test]
    fn test_expression_constraint_binds_value() {
        let positive = ConstraintDefinition::expression(
            "Positive",
            Expression::binary(
                BinaryOperator::GreaterThan,
                Expression::variable("value"),
                Expression::integer(0),
            ),
        );
        let value_type = atomic(ValueType::INTEGER, vec![positive]);
        let context = context();
        assert!(is_valid_value(&InternalValue::Integer(3), &value_type, &context));
        assert!(!is_valid_value(&InternalValue::Integer(-3), &value_type, &context));
        assert!(!is_valid_value(&InternalValue::text("3"), &value_type, &context));
    }

    #[test]
    fn test_allowlist_and_denylist() {
        let list = || Expression::collection(vec![Expression::text("DE"), Expression::text("FR")]);
        let allow = atomic(
            ValueType::TEXT,
            vec![ConstraintDefinition::typed(
                "Countries",
                "AllowlistConstraint",
                vec![("allowlist", list())],
            )],
        );
        let deny = atomic(
            ValueType::TEXT,
            vec![ConstraintDefinition::typed(
                "NotCountries",
                "DenylistConstraint",
                vec![("denylist", list())],
            )],
        );
        let context = context();
        assert!(is_valid_value(&"DE".into(), &allow, &context));
        assert!(!is_valid_value(&"IT".into(), &allow, &context));
        assert!(!is_valid_value(&"DE".into(), &deny, &context));
        assert!(is_valid_value(&"IT".into(), &deny, &context));
    }

    #[test]
    fn test_regex_constraint() {
        let value_type = atomic(
            ValueType::TEXT,
            vec![ConstraintDefinition::typed(
                "Plate",
                "RegexConstraint",
                vec![("regex", Expression::regex("^[A-Z]{2}-[0-9]+$"))],
            )],
        );
        let context = context();
        assert!(is_valid_value(&"AB-123".into(), &value_type, &context));
        assert!(!is_valid_value(&"ab-123".into(), &value_type, &context));
    }

    #[test]
    fn test_range_constraint_uses_defaults() {
        let value_type = atomic(
            ValueType::DECIMAL,
            vec![ConstraintDefinition::typed(
                "Percent",
                "RangeConstraint",
                vec![
                    ("lowerBound", Expression::integer(0)),
                    ("upperBound", Expression::integer(100)),
                    ("upperBoundInclusive", Expression::boolean(false)),
                ],
            )],
        );
        let context = context();
        assert!(is_valid_value(&InternalValue::Decimal(0.0), &value_type, &context));
        assert!(is_valid_value(&InternalValue::Decimal(99.5), &value_type, &context));
        assert!(!is_valid_value(&InternalValue::Decimal(100.0), &value_type, &context));
        assert!(!is_valid_value(&InternalValue::Decimal(-0.1), &value_type, &context));
    }

    #[test]
    fn test_length_constraint() {
        let value_type = atomic(
            ValueType::TEXT,
            vec![ConstraintDefinition::typed(
                "Short",
                "LengthConstraint",
                vec![("maxLength", Expression::integer(3))],
            )],
        );
        let context = context();
        assert!(is_valid_value(&"".into(), &value_type, &context));
        assert!(is_valid_value(&"äöü".into(), &value_type, &context));
        assert!(!is_valid_value(&"abcd".into(), &value_type, &context));
    }

    #[test]
    fn test_constraints_of_supertypes_apply() {
        let positive = ConstraintDefinition::expression(
            "Positive",
            Expression::binary(
                BinaryOperator::GreaterThan,
                Expression::variable("value"),
                Expression::integer(0),
            ),
        );
        let small = ConstraintDefinition::expression(
            "Small",
            Expression::binary(
                BinaryOperator::LessThan,
                Expression::variable("value"),
                Expression::integer(10),
            ),
        );
        let base = atomic(ValueType::INTEGER, vec![positive]);
        let derived = ValueType::Atomic(Arc::new(AtomicValueType::new(
            "SmallPositive",
            base,
            vec![Arc::new(small)],
        )));
        let context = context();
        assert!(is_valid_value(&InternalValue::Integer(5), &derived, &context));
        assert!(!is_valid_value(&InternalValue::Integer(0), &derived, &context));
        assert!(!is_valid_value(&InternalValue::Integer(12), &derived, &context));
    }
}
