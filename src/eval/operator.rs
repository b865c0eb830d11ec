//! Operator evaluator traits and the registry mapping operator symbols to
//! their evaluators.
//!
//! Every evaluator implements an eager `evaluate` over resolved scalar values
//! and a `symbolic_evaluate` that also accepts column handles. The default
//! symbolic implementation falls back to `evaluate` when every operand is a
//! scalar and reports the operator as unsupported otherwise.

use crate::ast::{BinaryOperator, Expression, TernaryOperator, UnaryOperator};
use crate::diagnostic::{DiagnosticAnchor, DiagnosticCode, Diagnostics};
use crate::value_type::InternalValue;

use super::column_expr::ColumnExpr;
use super::operators::{arithmetic, collection, comparison, logic, parse, text};

/// Operand or result of symbolic evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolicValue {
    Scalar(InternalValue),
    Column(ColumnExpr),
}

impl SymbolicValue {
    pub fn as_scalar(&self) -> Option<&InternalValue> {
        match self {
            Self::Scalar(value) => Some(value),
            Self::Column(_) => None,
        }
    }

    /// Column handles pass through; scalars become literals.
    pub fn into_column_expr(self) -> ColumnExpr {
        match self {
            Self::Scalar(value) => ColumnExpr::literal(value),
            Self::Column(expr) => expr,
        }
    }
}

impl From<InternalValue> for SymbolicValue {
    fn from(value: InternalValue) -> Self {
        Self::Scalar(value)
    }
}

impl From<ColumnExpr> for SymbolicValue {
    fn from(expr: ColumnExpr) -> Self {
        Self::Column(expr)
    }
}

pub(crate) fn anchor(expression: &Expression) -> DiagnosticAnchor {
    DiagnosticAnchor::new(expression.describe(), expression.location.clone())
}

pub(crate) fn report_unsupported(
    operator: impl std::fmt::Display,
    expression: &Expression,
    diagnostics: &mut Diagnostics,
) {
    diagnostics.error(
        DiagnosticCode::Unsupported,
        format!("`{}` is not supported yet.", operator),
        anchor(expression),
    );
}

pub(crate) fn report_type_mismatch(
    operator: impl std::fmt::Display,
    operands: &[&InternalValue],
    expression: &Expression,
    diagnostics: &mut Diagnostics,
) {
    let kinds: Vec<&str> = operands.iter().map(|v| v.kind()).collect();
    diagnostics.error(
        DiagnosticCode::TypeMismatch,
        format!(
            "Operator `{}` cannot be applied to {}",
            operator,
            kinds.join(", ")
        ),
        anchor(expression),
    );
}

pub trait UnaryOperatorEvaluator: Send + Sync {
    fn operator(&self) -> UnaryOperator;

    fn evaluate(
        &self,
        operand: &InternalValue,
        expression: &Expression,
        diagnostics: &mut Diagnostics,
    ) -> Option<InternalValue>;

    fn symbolic_evaluate(
        &self,
        operand: SymbolicValue,
        expression: &Expression,
        diagnostics: &mut Diagnostics,
    ) -> Option<SymbolicValue> {
        match operand {
            SymbolicValue::Scalar(value) => self
                .evaluate(&value, expression, diagnostics)
                .map(SymbolicValue::Scalar),
            SymbolicValue::Column(_) => {
                report_unsupported(self.operator(), expression, diagnostics);
                None
            }
        }
    }
}

pub trait BinaryOperatorEvaluator: Send + Sync {
    fn operator(&self) -> BinaryOperator;

    /// Result determined by the left operand alone, if any. Only consulted
    /// under the lazy strategy.
    fn short_circuit(&self, _left: &InternalValue) -> Option<InternalValue> {
        None
    }

    fn evaluate(
        &self,
        left: &InternalValue,
        right: &InternalValue,
        expression: &Expression,
        diagnostics: &mut Diagnostics,
    ) -> Option<InternalValue>;

    fn symbolic_evaluate(
        &self,
        left: SymbolicValue,
        right: SymbolicValue,
        expression: &Expression,
        diagnostics: &mut Diagnostics,
    ) -> Option<SymbolicValue> {
        match (left, right) {
            (SymbolicValue::Scalar(left), SymbolicValue::Scalar(right)) => self
                .evaluate(&left, &right, expression, diagnostics)
                .map(SymbolicValue::Scalar),
            _ => {
                report_unsupported(self.operator(), expression, diagnostics);
                None
            }
        }
    }
}

pub trait TernaryOperatorEvaluator: Send + Sync {
    fn operator(&self) -> TernaryOperator;

    fn evaluate(
        &self,
        first: &InternalValue,
        second: &InternalValue,
        third: &InternalValue,
        expression: &Expression,
        diagnostics: &mut Diagnostics,
    ) -> Option<InternalValue>;

    fn symbolic_evaluate(
        &self,
        first: SymbolicValue,
        second: SymbolicValue,
        third: SymbolicValue,
        expression: &Expression,
        diagnostics: &mut Diagnostics,
    ) -> Option<SymbolicValue> {
        match (first, second, third) {
            (SymbolicValue::Scalar(a), SymbolicValue::Scalar(b), SymbolicValue::Scalar(c)) => self
                .evaluate(&a, &b, &c, expression, diagnostics)
                .map(SymbolicValue::Scalar),
            _ => {
                report_unsupported(self.operator(), expression, diagnostics);
                None
            }
        }
    }
}

/// Exhaustive operator dispatch. Adding an operator symbol without an
/// evaluator is a compile error.
#[derive(Debug, Default, Clone, Copy)]
pub struct OperatorRegistry;

impl OperatorRegistry {
    pub fn new() -> Self {
        Self
    }

    pub fn unary(&self, operator: UnaryOperator) -> &'static dyn UnaryOperatorEvaluator {
        match operator {
            UnaryOperator::Not => &logic::NotOperator,
            UnaryOperator::Plus => &arithmetic::PlusOperator,
            UnaryOperator::Minus => &arithmetic::MinusOperator,
            UnaryOperator::Sqrt => &arithmetic::SqrtOperator,
            UnaryOperator::Floor => &arithmetic::FloorOperator,
            UnaryOperator::Ceil => &arithmetic::CeilOperator,
            UnaryOperator::Round => &arithmetic::RoundOperator,
            UnaryOperator::Lowercase => &text::LowercaseOperator,
            UnaryOperator::Uppercase => &text::UppercaseOperator,
            UnaryOperator::AsText => &parse::AsTextOperator,
            UnaryOperator::AsDecimal => &parse::AsDecimalOperator,
            UnaryOperator::AsInteger => &parse::AsIntegerOperator,
            UnaryOperator::AsBoolean => &parse::AsBooleanOperator,
        }
    }

    pub fn binary(&self, operator: BinaryOperator) -> &'static dyn BinaryOperatorEvaluator {
        match operator {
            BinaryOperator::Pow => &arithmetic::PowOperator,
            BinaryOperator::Root => &arithmetic::RootOperator,
            BinaryOperator::Multiply => &arithmetic::MultiplicationOperator,
            BinaryOperator::Divide => &arithmetic::DivisionOperator,
            BinaryOperator::Modulo => &arithmetic::ModuloOperator,
            BinaryOperator::Add => &arithmetic::AdditionOperator,
            BinaryOperator::Subtract => &arithmetic::SubtractionOperator,
            BinaryOperator::Matches => &text::MatchesOperator,
            BinaryOperator::In => &collection::InOperator,
            BinaryOperator::LessThan => &comparison::LESS_THAN,
            BinaryOperator::LessThanEqual => &comparison::LESS_THAN_EQUAL,
            BinaryOperator::GreaterThan => &comparison::GREATER_THAN,
            BinaryOperator::GreaterThanEqual => &comparison::GREATER_THAN_EQUAL,
            BinaryOperator::Equal => &comparison::EQUALITY,
            BinaryOperator::NotEqual => &comparison::INEQUALITY,
            BinaryOperator::Xor => &logic::XorOperator,
            BinaryOperator::And => &logic::AndOperator,
            BinaryOperator::Or => &logic::OrOperator,
        }
    }

    pub fn ternary(&self, operator: TernaryOperator) -> &'static dyn TernaryOperatorEvaluator {
        match operator {
            TernaryOperator::Replace => &text::ReplaceOperator,
        }
    }
}
