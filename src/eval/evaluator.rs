use crate::ast::{Expression, ExpressionKind, PropertyAssignment, PropertyValue, ValueLiteral};
use crate::diagnostic::{DiagnosticCode, Diagnostics};
use crate::value_type::{InternalValue, RegexValue, ValueType};

use super::context::EvaluationContext;
use super::operator::{anchor, SymbolicValue};

/// `Lazy` skips operands whose value cannot change the result; `Exhaustive`
/// evaluates everything so validation surfaces every diagnostic at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum EvaluationStrategy {
    #[default]
    Lazy,
    Exhaustive,
}

/// Tree-walking interpreter over [`Expression`] nodes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpressionEvaluator {
    strategy: EvaluationStrategy,
}

impl ExpressionEvaluator {
    pub fn new(strategy: EvaluationStrategy) -> Self {
        Self { strategy }
    }

    pub fn lazy() -> Self {
        Self::new(EvaluationStrategy::Lazy)
    }

    pub fn exhaustive() -> Self {
        Self::new(EvaluationStrategy::Exhaustive)
    }

    pub fn strategy(&self) -> EvaluationStrategy {
        self.strategy
    }

    fn is_lazy(&self) -> bool {
        self.strategy == EvaluationStrategy::Lazy
    }

    /// Eager evaluation. `None` means the expression could not be evaluated;
    /// the reason, if any, is in `diagnostics`.
    pub fn evaluate(
        &self,
        expression: &Expression,
        context: &EvaluationContext,
        diagnostics: &mut Diagnostics,
    ) -> Option<InternalValue> {
        match &expression.kind {
            ExpressionKind::Literal(literal) => {
                self.evaluate_literal(literal, expression, context, diagnostics)
            }
            ExpressionKind::FreeVariable(name) => match context.value_for(name) {
                Ok(SymbolicValue::Scalar(value)) => Some(value.clone()),
                Ok(SymbolicValue::Column(_)) => {
                    diagnostics.error(
                        DiagnosticCode::TypeMismatch,
                        format!("Variable `{}` is bound to a column", name),
                        anchor(expression),
                    );
                    None
                }
                Err(_) => {
                    diagnostics.error(
                        DiagnosticCode::MissingVariable,
                        format!("Variable `{}` is not defined", name),
                        anchor(expression),
                    );
                    None
                }
            },
            ExpressionKind::Unary { operator, operand } => {
                let evaluator = context.operator_registry().unary(*operator);
                let operand = self.evaluate(operand, context, diagnostics)?;
                evaluator.evaluate(&operand, expression, diagnostics)
            }
            ExpressionKind::Binary {
                operator,
                left,
                right,
            } => {
                let evaluator = context.operator_registry().binary(*operator);
                let left = self.evaluate(left, context, diagnostics);
                if self.is_lazy() {
                    let left = left.as_ref()?;
                    if let Some(result) = evaluator.short_circuit(left) {
                        return Some(result);
                    }
                }
                let right = self.evaluate(right, context, diagnostics);
                evaluator.evaluate(&left?, &right?, expression, diagnostics)
            }
            ExpressionKind::Ternary {
                operator,
                first,
                second,
                third,
            } => {
                let evaluator = context.operator_registry().ternary(*operator);
                let first = self.evaluate(first, context, diagnostics);
                if self.is_lazy() && first.is_none() {
                    return None;
                }
                let second = self.evaluate(second, context, diagnostics);
                let third = self.evaluate(third, context, diagnostics);
                evaluator.evaluate(&first?, &second?, &third?, expression, diagnostics)
            }
        }
    }

    fn evaluate_literal(
        &self,
        literal: &ValueLiteral,
        expression: &Expression,
        context: &EvaluationContext,
        diagnostics: &mut Diagnostics,
    ) -> Option<InternalValue> {
        match literal {
            ValueLiteral::Boolean(b) => Some(InternalValue::Boolean(*b)),
            ValueLiteral::Integer(i) => Some(InternalValue::Integer(*i)),
            ValueLiteral::Decimal(d) => Some(InternalValue::Decimal(*d)),
            ValueLiteral::Text(s) => Some(InternalValue::Text(s.clone())),
            ValueLiteral::Regex(pattern) => match RegexValue::new(pattern) {
                Ok(regex) => Some(InternalValue::Regex(regex)),
                Err(e) => {
                    diagnostics.error(
                        DiagnosticCode::InvalidLiteral,
                        format!("Invalid regular expression /{}/: {}", pattern, e),
                        anchor(expression),
                    );
                    None
                }
            },
            ValueLiteral::CellRange(range) => Some(InternalValue::CellRange(*range)),
            ValueLiteral::Collection(values) => {
                let evaluated: Vec<Option<InternalValue>> = values
                    .iter()
                    .map(|v| self.evaluate(v, context, diagnostics))
                    .collect();
                evaluated
                    .into_iter()
                    .collect::<Option<Vec<_>>>()
                    .map(InternalValue::Collection)
            }
            ValueLiteral::ValuetypeAssignment(assignment) => {
                Some(InternalValue::ValuetypeAssignment(assignment.clone()))
            }
            ValueLiteral::Constraint(constraint) => {
                Some(InternalValue::Constraint(constraint.clone()))
            }
            ValueLiteral::Transform(transform) => {
                Some(InternalValue::Transform(transform.clone()))
            }
        }
    }

    /// Evaluation over scalars and column handles. Sub-trees without column
    /// handles are evaluated eagerly by the operators themselves.
    pub fn symbolic_evaluate(
        &self,
        expression: &Expression,
        context: &EvaluationContext,
        diagnostics: &mut Diagnostics,
    ) -> Option<SymbolicValue> {
        match &expression.kind {
            ExpressionKind::Literal(_) => self
                .evaluate(expression, context, diagnostics)
                .map(SymbolicValue::Scalar),
            ExpressionKind::FreeVariable(name) => match context.value_for(name) {
                Ok(value) => Some(value.clone()),
                Err(_) => {
                    diagnostics.error(
                        DiagnosticCode::MissingVariable,
                        format!("Variable `{}` is not defined", name),
                        anchor(expression),
                    );
                    None
                }
            },
            ExpressionKind::Unary { operator, operand } => {
                let evaluator = context.operator_registry().unary(*operator);
                let operand = self.symbolic_evaluate(operand, context, diagnostics)?;
                evaluator.symbolic_evaluate(operand, expression, diagnostics)
            }
            ExpressionKind::Binary {
                operator,
                left,
                right,
            } => {
                let evaluator = context.operator_registry().binary(*operator);
                let left = self.symbolic_evaluate(left, context, diagnostics);
                if self.is_lazy() {
                    let left = left.as_ref()?;
                    if let Some(result) = left
                        .as_scalar()
                        .and_then(|value| evaluator.short_circuit(value))
                    {
                        return Some(SymbolicValue::Scalar(result));
                    }
                }
                let right = self.symbolic_evaluate(right, context, diagnostics);
                evaluator.symbolic_evaluate(left?, right?, expression, diagnostics)
            }
            ExpressionKind::Ternary {
                operator,
                first,
                second,
                third,
            } => {
                let evaluator = context.operator_registry().ternary(*operator);
                let first = self.symbolic_evaluate(first, context, diagnostics);
                if self.is_lazy() && first.is_none() {
                    return None;
                }
                let second = self.symbolic_evaluate(second, context, diagnostics);
                let third = self.symbolic_evaluate(third, context, diagnostics);
                evaluator.symbolic_evaluate(first?, second?, third?, expression, diagnostics)
            }
        }
    }

    /// Resolves a property assignment against its declared type. The result
    /// is normalised into `value_type`'s representation.
    ///
    /// # Panics
    ///
    /// Panics when a successfully evaluated value does not satisfy
    /// `value_type`; upstream type checking guarantees this never happens for
    /// well-formed programs.
    pub fn evaluate_property_value(
        &self,
        property: &PropertyAssignment,
        context: &EvaluationContext,
        value_type: &ValueType,
        diagnostics: &mut Diagnostics,
    ) -> Option<InternalValue> {
        let result = match &property.value {
            PropertyValue::RuntimeParameter(name) => {
                context.value_for_runtime_parameter(name, value_type)
            }
            PropertyValue::Expression(expression) => self
                .evaluate(expression, context, diagnostics)
                .map(|value| value_type.normalize(value)),
        };
        if let Some(value) = &result {
            assert!(
                value_type.is_internal_value_representation(value),
                "Evaluation result {} of property `{}` is not valid: Neither absent, nor of type {}",
                value,
                property.name,
                value_type.name()
            );
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOperator, TernaryOperator, UnaryOperator};
    use crate::eval::column_expr::{ColumnBinaryOp, ColumnExpr};

    fn div_by_zero() -> Expression {
        Expression::binary(
            BinaryOperator::Divide,
            Expression::integer(1),
            Expression::integer(0),
        )
    }

    fn guarded(operator: BinaryOperator, left: bool) -> Expression {
        Expression::binary(
            operator,
            Expression::boolean(left),
            Expression::binary(BinaryOperator::Equal, div_by_zero(), Expression::integer(1)),
        )
    }

    #[test]
    fn test_lazy_and_skips_right_operand() {
        let context = EvaluationContext::default();
        let mut diagnostics = Diagnostics::new();
        let result = ExpressionEvaluator::lazy().evaluate(
            &guarded(BinaryOperator::And, false),
            &context,
            &mut diagnostics,
        );
        assert_eq!(result, Some(InternalValue::Boolean(false)));
        assert!(diagnostics.is_empty());

        let result = ExpressionEvaluator::lazy().evaluate(
            &guarded(BinaryOperator::Or, true),
            &context,
            &mut diagnostics,
        );
        assert_eq!(result, Some(InternalValue::Boolean(true)));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_exhaustive_surfaces_inner_diagnostic() {
        let context = EvaluationContext::default();
        let mut diagnostics = Diagnostics::new();
        let result = ExpressionEvaluator::exhaustive().evaluate(
            &guarded(BinaryOperator::And, false),
            &context,
            &mut diagnostics,
        );
        assert_eq!(result, None);
        assert!(diagnostics.has_code(DiagnosticCode::Arithmetic));
    }

    #[test]
    fn test_absent_operand_propagates() {
        let context = EvaluationContext::default();
        let mut diagnostics = Diagnostics::new();
        let expr = Expression::binary(
            BinaryOperator::Add,
            div_by_zero(),
            Expression::variable("missing"),
        );
        assert_eq!(
            ExpressionEvaluator::lazy().evaluate(&expr, &context, &mut diagnostics),
            None
        );
        assert_eq!(diagnostics.len(), 1);

        diagnostics.clear();
        assert_eq!(
            ExpressionEvaluator::exhaustive().evaluate(&expr, &context, &mut diagnostics),
            None
        );
        assert!(diagnostics.has_code(DiagnosticCode::MissingVariable));
        assert!(diagnostics.has_code(DiagnosticCode::Arithmetic));
    }

    #[test]
    fn test_collection_and_ternary_literals() {
        let context = EvaluationContext::default();
        let mut diagnostics = Diagnostics::new();
        let collection = Expression::collection(vec![
            Expression::integer(1),
            Expression::unary(UnaryOperator::Minus, Expression::integer(2)),
        ]);
        assert_eq!(
            ExpressionEvaluator::lazy().evaluate(&collection, &context, &mut diagnostics),
            Some(vec![1i64, -2].into())
        );

        let replace = Expression::ternary(
            TernaryOperator::Replace,
            Expression::text("2024-01-02"),
            Expression::regex("-"),
            Expression::text("/"),
        );
        assert_eq!(
            ExpressionEvaluator::lazy().evaluate(&replace, &context, &mut diagnostics),
            Some(InternalValue::text("2024/01/02"))
        );
    }

    #[test]
    fn test_symbolic_keeps_scalar_subtrees_eager() {
        let mut context = EvaluationContext::default();
        context.set_column("x", ColumnExpr::column("price"));
        let mut diagnostics = Diagnostics::new();
        let expr = Expression::binary(
            BinaryOperator::Multiply,
            Expression::variable("x"),
            Expression::binary(
                BinaryOperator::Add,
                Expression::integer(1),
                Expression::integer(1),
            ),
        );
        let result = ExpressionEvaluator::lazy().symbolic_evaluate(&expr, &context, &mut diagnostics);
        assert_eq!(
            result,
            Some(SymbolicValue::Column(ColumnExpr::binary(
                ColumnBinaryOp::Multiply,
                ColumnExpr::column("price"),
                ColumnExpr::literal(InternalValue::Integer(2)),
            )))
        );
    }

    #[test]
    fn test_property_value_is_normalised() {
        let context = EvaluationContext::default();
        let mut diagnostics = Diagnostics::new();
        let property = PropertyAssignment::new(
            "ratio",
            PropertyValue::Expression(Expression::integer(3)),
        );
        assert_eq!(
            ExpressionEvaluator::lazy().evaluate_property_value(
                &property,
                &context,
                &ValueType::DECIMAL,
                &mut diagnostics
            ),
            Some(InternalValue::Decimal(3.0))
        );
    }

    #[test]
    #[should_panic(expected = "is not valid")]
    fn test_property_value_type_violation_is_fatal() {
        let context = EvaluationContext::default();
        let mut diagnostics = Diagnostics::new();
        let property =
            PropertyAssignment::new("name", PropertyValue::Expression(Expression::integer(3)));
        ExpressionEvaluator::lazy().evaluate_property_value(
            &property,
            &context,
            &ValueType::TEXT,
            &mut diagnostics,
        );
    }
}
