//! Concrete operator evaluators, grouped by operand family.

pub mod arithmetic;
pub mod collection;
pub mod comparison;
pub mod logic;
pub mod parse;
pub mod text;

use crate::ast::Expression;
use crate::diagnostic::{DiagnosticCode, Diagnostics};
use crate::value_type::InternalValue;

use super::column_expr::{ColumnBinaryOp, ColumnExpr, ColumnUnaryOp};
use super::operator::{
    anchor, report_type_mismatch, BinaryOperatorEvaluator, SymbolicValue, UnaryOperatorEvaluator,
};

pub(crate) fn arithmetic_error(
    message: &str,
    expression: &Expression,
    diagnostics: &mut Diagnostics,
) -> Option<InternalValue> {
    diagnostics.error(DiagnosticCode::Arithmetic, message, anchor(expression));
    None
}

/// Builds a column expression when any operand is a column handle, after
/// checking that scalar operands fit `scalar_ok`. Pure scalar calls fall back
/// to eager evaluation.
pub(crate) fn symbolic_binary<E: BinaryOperatorEvaluator + ?Sized>(
    evaluator: &E,
    op: ColumnBinaryOp,
    left: SymbolicValue,
    right: SymbolicValue,
    expression: &Expression,
    diagnostics: &mut Diagnostics,
    scalar_ok: fn(&InternalValue) -> bool,
) -> Option<SymbolicValue> {
    if let (SymbolicValue::Scalar(l), SymbolicValue::Scalar(r)) = (&left, &right) {
        return evaluator
            .evaluate(l, r, expression, diagnostics)
            .map(SymbolicValue::Scalar);
    }
    for scalar in [left.as_scalar(), right.as_scalar()].into_iter().flatten() {
        if !scalar_ok(scalar) {
            report_type_mismatch(evaluator.operator(), &[scalar], expression, diagnostics);
            return None;
        }
    }
    Some(SymbolicValue::Column(ColumnExpr::binary(
        op,
        left.into_column_expr(),
        right.into_column_expr(),
    )))
}

pub(crate) fn symbolic_unary<E: UnaryOperatorEvaluator + ?Sized>(
    evaluator: &E,
    op: ColumnUnaryOp,
    operand: SymbolicValue,
    expression: &Expression,
    diagnostics: &mut Diagnostics,
) -> Option<SymbolicValue> {
    match operand {
        SymbolicValue::Scalar(value) => evaluator
            .evaluate(&value, expression, diagnostics)
            .map(SymbolicValue::Scalar),
        SymbolicValue::Column(expr) => Some(SymbolicValue::Column(ColumnExpr::unary(op, expr))),
    }
}

pub(crate) fn is_numeric(value: &InternalValue) -> bool {
    value.is_numeric()
}

pub(crate) fn is_boolean(value: &InternalValue) -> bool {
    matches!(value, InternalValue::Boolean(_))
}

pub(crate) fn is_comparable(value: &InternalValue) -> bool {
    matches!(
        value,
        InternalValue::Boolean(_)
            | InternalValue::Integer(_)
            | InternalValue::Decimal(_)
            | InternalValue::Text(_)
    )
}
