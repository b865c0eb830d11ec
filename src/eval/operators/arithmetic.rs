use crate::ast::{BinaryOperator, Expression, UnaryOperator};
use crate::diagnostic::Diagnostics;
use crate::eval::column_expr::{
    float_to_integer, round_half_up, ColumnBinaryOp, ColumnExpr, ColumnUnaryOp,
};
use crate::eval::operator::{
    report_type_mismatch, report_unsupported, BinaryOperatorEvaluator, SymbolicValue,
    UnaryOperatorEvaluator,
};
use crate::value_type::InternalValue;

use super::{arithmetic_error, is_numeric, symbolic_binary, symbolic_unary};

const UNKNOWN_ARITHMETIC_ERROR: &str = "Unknown arithmetic error";

fn finite_decimal(
    value: f64,
    expression: &Expression,
    diagnostics: &mut Diagnostics,
) -> Option<InternalValue> {
    if value.is_finite() {
        Some(InternalValue::Decimal(value))
    } else {
        arithmetic_error(UNKNOWN_ARITHMETIC_ERROR, expression, diagnostics)
    }
}

fn to_integer(value: f64) -> Option<InternalValue> {
    float_to_integer(value).map(InternalValue::Integer)
}

pub struct PlusOperator;

impl UnaryOperatorEvaluator for PlusOperator {
    fn operator(&self) -> UnaryOperator {
        UnaryOperator::Plus
    }

    fn evaluate(
        &self,
        operand: &InternalValue,
        expression: &Expression,
        diagnostics: &mut Diagnostics,
    ) -> Option<InternalValue> {
        if !is_numeric(operand) {
            report_type_mismatch(self.operator(), &[operand], expression, diagnostics);
            return None;
        }
        Some(operand.clone())
    }

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
            column => Some(column),
        }
    }
}

pub struct MinusOperator;

impl UnaryOperatorEvaluator for MinusOperator {
    fn operator(&self) -> UnaryOperator {
        UnaryOperator::Minus
    }

    fn evaluate(
        &self,
        operand: &InternalValue,
        expression: &Expression,
        diagnostics: &mut Diagnostics,
    ) -> Option<InternalValue> {
        match operand {
            InternalValue::Integer(i) => match i.checked_neg() {
                Some(negated) => Some(InternalValue::Integer(negated)),
                None => arithmetic_error(UNKNOWN_ARITHMETIC_ERROR, expression, diagnostics),
            },
            InternalValue::Decimal(d) => Some(InternalValue::Decimal(-d)),
            other => {
                report_type_mismatch(self.operator(), &[other], expression, diagnostics);
                None
            }
        }
    }

    fn symbolic_evaluate(
        &self,
        operand: SymbolicValue,
        expression: &Expression,
        diagnostics: &mut Diagnostics,
    ) -> Option<SymbolicValue> {
        symbolic_unary(self, ColumnUnaryOp::Negate, operand, expression, diagnostics)
    }
}

pub struct SqrtOperator;

impl UnaryOperatorEvaluator for SqrtOperator {
    fn operator(&self) -> UnaryOperator {
        UnaryOperator::Sqrt
    }

    fn evaluate(
        &self,
        operand: &InternalValue,
        expression: &Expression,
        diagnostics: &mut Diagnostics,
    ) -> Option<InternalValue> {
        let Some(value) = operand.as_f64() else {
            report_type_mismatch(self.operator(), &[operand], expression, diagnostics);
            return None;
        };
        if value < 0.0 {
            return arithmetic_error(
                "Arithmetic error: square root of negative number",
                expression,
                diagnostics,
            );
        }
        finite_decimal(value.sqrt(), expression, diagnostics)
    }

    fn symbolic_evaluate(
        &self,
        operand: SymbolicValue,
        expression: &Expression,
        diagnostics: &mut Diagnostics,
    ) -> Option<SymbolicValue> {
        symbolic_unary(self, ColumnUnaryOp::Sqrt, operand, expression, diagnostics)
    }
}

/// Shared body of `floor`, `ceil` and `round`: integers pass through,
/// decimals are rounded into integers.
fn rounding(
    operator: UnaryOperator,
    operand: &InternalValue,
    expression: &Expression,
    diagnostics: &mut Diagnostics,
    round: fn(f64) -> f64,
) -> Option<InternalValue> {
    match operand {
        InternalValue::Integer(_) => Some(operand.clone()),
        InternalValue::Decimal(d) => match to_integer(round(*d)) {
            Some(value) => Some(value),
            None => arithmetic_error(UNKNOWN_ARITHMETIC_ERROR, expression, diagnostics),
        },
        other => {
            report_type_mismatch(operator, &[other], expression, diagnostics);
            None
        }
    }
}

pub struct FloorOperator;

impl UnaryOperatorEvaluator for FloorOperator {
    fn operator(&self) -> UnaryOperator {
        UnaryOperator::Floor
    }

    fn evaluate(
        &self,
        operand: &InternalValue,
        expression: &Expression,
        diagnostics: &mut Diagnostics,
    ) -> Option<InternalValue> {
        rounding(self.operator(), operand, expression, diagnostics, f64::floor)
    }

    fn symbolic_evaluate(
        &self,
        operand: SymbolicValue,
        expression: &Expression,
        diagnostics: &mut Diagnostics,
    ) -> Option<SymbolicValue> {
        symbolic_unary(self, ColumnUnaryOp::Floor, operand, expression, diagnostics)
    }
}

pub struct CeilOperator;

impl UnaryOperatorEvaluator for CeilOperator {
    fn operator(&self) -> UnaryOperator {
        UnaryOperator::Ceil
    }

    fn evaluate(
        &self,
        operand: &InternalValue,
        expression: &Expression,
        diagnostics: &mut Diagnostics,
    ) -> Option<InternalValue> {
        rounding(self.operator(), operand, expression, diagnostics, f64::ceil)
    }

    fn symbolic_evaluate(
        &self,
        operand: SymbolicValue,
        expression: &Expression,
        diagnostics: &mut Diagnostics,
    ) -> Option<SymbolicValue> {
        symbolic_unary(self, ColumnUnaryOp::Ceil, operand, expression, diagnostics)
    }
}

pub struct RoundOperator;

impl UnaryOperatorEvaluator for RoundOperator {
    fn operator(&self) -> UnaryOperator {
        UnaryOperator::Round
    }

    fn evaluate(
        &self,
        operand: &InternalValue,
        expression: &Expression,
        diagnostics: &mut Diagnostics,
    ) -> Option<InternalValue> {
        rounding(self.operator(), operand, expression, diagnostics, round_half_up)
    }

    fn symbolic_evaluate(
        &self,
        operand: SymbolicValue,
        expression: &Expression,
        diagnostics: &mut Diagnostics,
    ) -> Option<SymbolicValue> {
        symbolic_unary(self, ColumnUnaryOp::Round, operand, expression, diagnostics)
    }
}

/// `+`, `-` and `*` stay integral when both operands are integers.
fn integral_or_decimal(
    operator: BinaryOperator,
    left: &InternalValue,
    right: &InternalValue,
    expression: &Expression,
    diagnostics: &mut Diagnostics,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Option<InternalValue> {
    match (left, right) {
        (InternalValue::Integer(a), InternalValue::Integer(b)) => match int_op(*a, *b) {
            Some(value) => Some(InternalValue::Integer(value)),
            None => arithmetic_error(UNKNOWN_ARITHMETIC_ERROR, expression, diagnostics),
        },
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => finite_decimal(float_op(a, b), expression, diagnostics),
            _ => {
                report_type_mismatch(operator, &[left, right], expression, diagnostics);
                None
            }
        },
    }
}

pub struct AdditionOperator;

impl BinaryOperatorEvaluator for AdditionOperator {
    fn operator(&self) -> BinaryOperator {
        BinaryOperator::Add
    }

    fn evaluate(
        &self,
        left: &InternalValue,
        right: &InternalValue,
        expression: &Expression,
        diagnostics: &mut Diagnostics,
    ) -> Option<InternalValue> {
        integral_or_decimal(
            self.operator(),
            left,
            right,
            expression,
            diagnostics,
            i64::checked_add,
            |a, b| a + b,
        )
    }

    fn symbolic_evaluate(
        &self,
        left: SymbolicValue,
        right: SymbolicValue,
        expression: &Expression,
        diagnostics: &mut Diagnostics,
    ) -> Option<SymbolicValue> {
        symbolic_binary(
            self,
            ColumnBinaryOp::Add,
            left,
            right,
            expression,
            diagnostics,
            is_numeric,
        )
    }
}

pub struct SubtractionOperator;

impl BinaryOperatorEvaluator for SubtractionOperator {
    fn operator(&self) -> BinaryOperator {
        BinaryOperator::Subtract
    }

    fn evaluate(
        &self,
        left: &InternalValue,
        right: &InternalValue,
        expression: &Expression,
        diagnostics: &mut Diagnostics,
    ) -> Option<InternalValue> {
        integral_or_decimal(
            self.operator(),
            left,
            right,
            expression,
            diagnostics,
            i64::checked_sub,
            |a, b| a - b,
        )
    }

    fn symbolic_evaluate(
        &self,
        left: SymbolicValue,
        right: SymbolicValue,
        expression: &Expression,
        diagnostics: &mut Diagnostics,
    ) -> Option<SymbolicValue> {
        symbolic_binary(
            self,
            ColumnBinaryOp::Subtract,
            left,
            right,
            expression,
            diagnostics,
            is_numeric,
        )
    }
}

pub struct MultiplicationOperator;

impl BinaryOperatorEvaluator for MultiplicationOperator {
    fn operator(&self) -> BinaryOperator {
        BinaryOperator::Multiply
    }

    fn evaluate(
        &self,
        left: &InternalValue,
        right: &InternalValue,
        expression: &Expression,
        diagnostics: &mut Diagnostics,
    ) -> Option<InternalValue> {
        integral_or_decimal(
            self.operator(),
            left,
            right,
            expression,
            diagnostics,
            i64::checked_mul,
            |a, b| a * b,
        )
    }

    fn symbolic_evaluate(
        &self,
        left: SymbolicValue,
        right: SymbolicValue,
        expression: &Expression,
        diagnostics: &mut Diagnostics,
    ) -> Option<SymbolicValue> {
        symbolic_binary(
            self,
            ColumnBinaryOp::Multiply,
            left,
            right,
            expression,
            diagnostics,
            is_numeric,
        )
    }
}

fn numeric_operands(
    operator: BinaryOperator,
    left: &InternalValue,
    right: &InternalValue,
    expression: &Expression,
    diagnostics: &mut Diagnostics,
) -> Option<(f64, f64)> {
    match (left.as_f64(), right.as_f64()) {
        (Some(a), Some(b)) => Some((a, b)),
        _ => {
            report_type_mismatch(operator, &[left, right], expression, diagnostics);
            None
        }
    }
}

pub struct DivisionOperator;

impl BinaryOperatorEvaluator for DivisionOperator {
    fn operator(&self) -> BinaryOperator {
        BinaryOperator::Divide
    }

    fn evaluate(
        &self,
        left: &InternalValue,
        right: &InternalValue,
        expression: &Expression,
        diagnostics: &mut Diagnostics,
    ) -> Option<InternalValue> {
        let (a, b) = numeric_operands(self.operator(), left, right, expression, diagnostics)?;
        if b == 0.0 {
            return arithmetic_error("Arithmetic error: division by zero", expression, diagnostics);
        }
        finite_decimal(a / b, expression, diagnostics)
    }

    fn symbolic_evaluate(
        &self,
        left: SymbolicValue,
        right: SymbolicValue,
        expression: &Expression,
        diagnostics: &mut Diagnostics,
    ) -> Option<SymbolicValue> {
        symbolic_binary(
            self,
            ColumnBinaryOp::Divide,
            left,
            right,
            expression,
            diagnostics,
            is_numeric,
        )
    }
}

pub struct ModuloOperator;

impl BinaryOperatorEvaluator for ModuloOperator {
    fn operator(&self) -> BinaryOperator {
        BinaryOperator::Modulo
    }

    fn evaluate(
        &self,
        left: &InternalValue,
        right: &InternalValue,
        expression: &Expression,
        diagnostics: &mut Diagnostics,
    ) -> Option<InternalValue> {
        let (a, b) = numeric_operands(self.operator(), left, right, expression, diagnostics)?;
        if b == 0.0 {
            return arithmetic_error("Arithmetic error: modulo by zero", expression, diagnostics);
        }
        match (left, right) {
            (InternalValue::Integer(a), InternalValue::Integer(b)) => match a.checked_rem(*b) {
                Some(value) => Some(InternalValue::Integer(value)),
                None => arithmetic_error(UNKNOWN_ARITHMETIC_ERROR, expression, diagnostics),
            },
            _ => finite_decimal(a % b, expression, diagnostics),
        }
    }

    fn symbolic_evaluate(
        &self,
        left: SymbolicValue,
        right: SymbolicValue,
        expression: &Expression,
        diagnostics: &mut Diagnostics,
    ) -> Option<SymbolicValue> {
        symbolic_binary(
            self,
            ColumnBinaryOp::Modulo,
            left,
            right,
            expression,
            diagnostics,
            is_numeric,
        )
    }
}

/// `pow` and `root` only vectorise over the base; a column exponent is a
/// capability gap.
fn symbolic_exponent<E: BinaryOperatorEvaluator + ?Sized>(
    evaluator: &E,
    op: ColumnBinaryOp,
    left: SymbolicValue,
    right: SymbolicValue,
    expression: &Expression,
    diagnostics: &mut Diagnostics,
) -> Option<SymbolicValue> {
    match (left, right) {
        (SymbolicValue::Scalar(l), SymbolicValue::Scalar(r)) => evaluator
            .evaluate(&l, &r, expression, diagnostics)
            .map(SymbolicValue::Scalar),
        (SymbolicValue::Column(base), SymbolicValue::Scalar(exponent)) => {
            if !is_numeric(&exponent) {
                report_type_mismatch(evaluator.operator(), &[&exponent], expression, diagnostics);
                return None;
            }
            if op == ColumnBinaryOp::Root && exponent.as_f64() == Some(0.0) {
                return arithmetic_error("Arithmetic error: root of degree zero", expression, diagnostics)
                    .map(SymbolicValue::Scalar);
            }
            Some(SymbolicValue::Column(ColumnExpr::binary(
                op,
                base,
                ColumnExpr::literal(exponent),
            )))
        }
        _ => {
            report_unsupported(evaluator.operator(), expression, diagnostics);
            None
        }
    }
}

pub struct PowOperator;

impl BinaryOperatorEvaluator for PowOperator {
    fn operator(&self) -> BinaryOperator {
        BinaryOperator::Pow
    }

    fn evaluate(
        &self,
        left: &InternalValue,
        right: &InternalValue,
        expression: &Expression,
        diagnostics: &mut Diagnostics,
    ) -> Option<InternalValue> {
        let (base, exponent) =
            numeric_operands(self.operator(), left, right, expression, diagnostics)?;
        let result = base.powf(exponent);
        if !result.is_finite() {
            let message = if base == 0.0 && exponent < 0.0 {
                "Arithmetic error: zero raised to a negative number"
            } else {
                UNKNOWN_ARITHMETIC_ERROR
            };
            return arithmetic_error(message, expression, diagnostics);
        }
        Some(InternalValue::Decimal(result))
    }

    fn symbolic_evaluate(
        &self,
        left: SymbolicValue,
        right: SymbolicValue,
        expression: &Expression,
        diagnostics: &mut Diagnostics,
    ) -> Option<SymbolicValue> {
        symbolic_exponent(self, ColumnBinaryOp::Pow, left, right, expression, diagnostics)
    }
}

pub struct RootOperator;

impl BinaryOperatorEvaluator for RootOperator {
    fn operator(&self) -> BinaryOperator {
        BinaryOperator::Root
    }

    fn evaluate(
        &self,
        left: &InternalValue,
        right: &InternalValue,
        expression: &Expression,
        diagnostics: &mut Diagnostics,
    ) -> Option<InternalValue> {
        let (radicand, degree) =
            numeric_operands(self.operator(), left, right, expression, diagnostics)?;
        if degree == 0.0 {
            return arithmetic_error("Arithmetic error: root of degree zero", expression, diagnostics);
        }
        let result = radicand.powf(1.0 / degree);
        if !result.is_finite() {
            let message = if radicand == 0.0 && degree < 0.0 {
                "Arithmetic error: root of zero with negative degree"
            } else if radicand < 0.0 {
                "Arithmetic error: root of negative number"
            } else {
                UNKNOWN_ARITHMETIC_ERROR
            };
            return arithmetic_error(message, expression, diagnostics);
        }
        Some(InternalValue::Decimal(result))
    }

    fn symbolic_evaluate(
        &self,
        left: SymbolicValue,
        right: SymbolicValue,
        expression: &Expression,
        diagnostics: &mut Diagnostics,
    ) -> Option<SymbolicValue> {
        symbolic_exponent(self, ColumnBinaryOp::Root, left, right, expression, diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::DiagnosticCode;

    fn expr() -> Expression {
        Expression::variable("x")
    }

    fn messages(diagnostics: &Diagnostics) -> Vec<String> {
        diagnostics.iter().map(|d| d.message.clone()).collect()
    }

    #[test]
    fn test_division_by_zero() {
        let mut diagnostics = Diagnostics::new();
        let result = DivisionOperator.evaluate(
            &InternalValue::Integer(7),
            &InternalValue::Integer(0),
            &expr(),
            &mut diagnostics,
        );
        assert_eq!(result, None);
        assert_eq!(messages(&diagnostics), vec!["Arithmetic error: division by zero"]);
        assert!(diagnostics.has_code(DiagnosticCode::Arithmetic));
    }

    #[test]
    fn test_integer_arithmetic_stays_integral() {
        let mut diagnostics = Diagnostics::new();
        let sum = AdditionOperator.evaluate(
            &InternalValue::Integer(2),
            &InternalValue::Integer(3),
            &expr(),
            &mut diagnostics,
        );
        assert_eq!(sum, Some(InternalValue::Integer(5)));
        let mixed = MultiplicationOperator.evaluate(
            &InternalValue::Integer(2),
            &InternalValue::Decimal(1.5),
            &expr(),
            &mut diagnostics,
        );
        assert_eq!(mixed, Some(InternalValue::Decimal(3.0)));
        let rem = ModuloOperator.evaluate(
            &InternalValue::Integer(-7),
            &InternalValue::Integer(3),
            &expr(),
            &mut diagnostics,
        );
        assert_eq!(rem, Some(InternalValue::Integer(-1)));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_overflow_is_reported() {
        let mut diagnostics = Diagnostics::new();
        let result = AdditionOperator.evaluate(
            &InternalValue::Integer(i64::MAX),
            &InternalValue::Integer(1),
            &expr(),
            &mut diagnostics,
        );
        assert_eq!(result, None);
        assert_eq!(messages(&diagnostics), vec!["Unknown arithmetic error"]);
    }

    #[test]
    fn test_pow_and_root_domain_errors() {
        let mut diagnostics = Diagnostics::new();
        assert_eq!(
            PowOperator.evaluate(
                &InternalValue::Integer(0),
                &InternalValue::Integer(-2),
                &expr(),
                &mut diagnostics
            ),
            None
        );
        assert_eq!(
            RootOperator.evaluate(
                &InternalValue::Integer(1),
                &InternalValue::Integer(0),
                &expr(),
                &mut diagnostics
            ),
            None
        );
        assert_eq!(
            RootOperator.evaluate(
                &InternalValue::Integer(0),
                &InternalValue::Integer(-2),
                &expr(),
                &mut diagnostics
            ),
            None
        );
        assert_eq!(
            RootOperator.evaluate(
                &InternalValue::Integer(-8),
                &InternalValue::Integer(2),
                &expr(),
                &mut diagnostics
            ),
            None
        );
        assert_eq!(
            messages(&diagnostics),
            vec![
                "Arithmetic error: zero raised to a negative number",
                "Arithmetic error: root of degree zero",
                "Arithmetic error: root of zero with negative degree",
                "Arithmetic error: root of negative number",
            ]
        );
        assert_eq!(
            RootOperator.evaluate(
                &InternalValue::Integer(27),
                &InternalValue::Integer(3),
                &expr(),
                &mut diagnostics
            )
            .and_then(|v| v.as_f64())
            .map(|v| (v - 3.0).abs() < 1e-9),
            Some(true)
        );
    }

    #[test]
    fn test_rounding_family() {
        let mut diagnostics = Diagnostics::new();
        let round = |v: f64, d: &mut Diagnostics| {
            RoundOperator.evaluate(&InternalValue::Decimal(v), &expr(), d)
        };
        assert_eq!(round(2.5, &mut diagnostics), Some(InternalValue::Integer(3)));
        assert_eq!(round(-2.5, &mut diagnostics), Some(InternalValue::Integer(-2)));
        assert_eq!(
            FloorOperator.evaluate(&InternalValue::Decimal(-1.2), &expr(), &mut diagnostics),
            Some(InternalValue::Integer(-2))
        );
        assert_eq!(
            CeilOperator.evaluate(&InternalValue::Integer(4), &expr(), &mut diagnostics),
            Some(InternalValue::Integer(4))
        );
        assert_eq!(
            SqrtOperator.evaluate(&InternalValue::Integer(-4), &expr(), &mut diagnostics),
            None
        );
    }

    #[test]
    fn test_symbolic_builds_column_expression() {
        let mut diagnostics = Diagnostics::new();
        let result = AdditionOperator.symbolic_evaluate(
            SymbolicValue::Column(ColumnExpr::column("a")),
            SymbolicValue::Scalar(InternalValue::Integer(1)),
            &expr(),
            &mut diagnostics,
        );
        assert_eq!(
            result,
            Some(SymbolicValue::Column(ColumnExpr::binary(
                ColumnBinaryOp::Add,
                ColumnExpr::column("a"),
                ColumnExpr::literal(InternalValue::Integer(1)),
            )))
        );

        let unsupported = PowOperator.symbolic_evaluate(
            SymbolicValue::Scalar(InternalValue::Integer(2)),
            SymbolicValue::Column(ColumnExpr::column("a")),
            &expr(),
            &mut diagnostics,
        );
        assert_eq!(unsupported, None);
        assert!(diagnostics.has_code(DiagnosticCode::Unsupported));
    }
}
