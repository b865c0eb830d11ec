use crate::ast::{BinaryOperator, Expression, UnaryOperator};
use crate::diagnostic::Diagnostics;
use crate::eval::column_expr::{ColumnBinaryOp, ColumnUnaryOp};
use crate::eval::operator::{
    report_type_mismatch, BinaryOperatorEvaluator, SymbolicValue, UnaryOperatorEvaluator,
};
use crate::value_type::InternalValue;

use super::{is_boolean, symbolic_binary, symbolic_unary};

pub struct NotOperator;

impl UnaryOperatorEvaluator for NotOperator {
    fn operator(&self) -> UnaryOperator {
        UnaryOperator::Not
    }

    fn evaluate(
        &self,
        operand: &InternalValue,
        expression: &Expression,
        diagnostics: &mut Diagnostics,
    ) -> Option<InternalValue> {
        match operand {
            InternalValue::Boolean(b) => Some(InternalValue::Boolean(!b)),
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
        symbolic_unary(self, ColumnUnaryOp::Not, operand, expression, diagnostics)
    }
}

fn booleans(
    operator: BinaryOperator,
    left: &InternalValue,
    right: &InternalValue,
    expression: &Expression,
    diagnostics: &mut Diagnostics,
) -> Option<(bool, bool)> {
    match (left, right) {
        (InternalValue::Boolean(a), InternalValue::Boolean(b)) => Some((*a, *b)),
        _ => {
            report_type_mismatch(operator, &[left, right], expression, diagnostics);
            None
        }
    }
}

pub struct AndOperator;

impl BinaryOperatorEvaluator for AndOperator {
    fn operator(&self) -> BinaryOperator {
        BinaryOperator::And
    }

    fn short_circuit(&self, left: &InternalValue) -> Option<InternalValue> {
        match left {
            InternalValue::Boolean(false) => Some(InternalValue::Boolean(false)),
            _ => None,
        }
    }

    fn evaluate(
        &self,
        left: &InternalValue,
        right: &InternalValue,
        expression: &Expression,
        diagnostics: &mut Diagnostics,
    ) -> Option<InternalValue> {
        let (a, b) = booleans(self.operator(), left, right, expression, diagnostics)?;
        Some(InternalValue::Boolean(a && b))
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
            ColumnBinaryOp::And,
            left,
            right,
            expression,
            diagnostics,
            is_boolean,
        )
    }
}

pub struct OrOperator;

impl BinaryOperatorEvaluator for OrOperator {
    fn operator(&self) -> BinaryOperator {
        BinaryOperator::Or
    }

    fn short_circuit(&self, left: &InternalValue) -> Option<InternalValue> {
        match left {
            InternalValue::Boolean(true) => Some(InternalValue::Boolean(true)),
            _ => None,
        }
    }

    fn evaluate(
        &self,
        left: &InternalValue,
        right: &InternalValue,
        expression: &Expression,
        diagnostics: &mut Diagnostics,
    ) -> Option<InternalValue> {
        let (a, b) = booleans(self.operator(), left, right, expression, diagnostics)?;
        Some(InternalValue::Boolean(a || b))
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
            ColumnBinaryOp::Or,
            left,
            right,
            expression,
            diagnostics,
            is_boolean,
        )
    }
}

pub struct XorOperator;

impl BinaryOperatorEvaluator for XorOperator {
    fn operator(&self) -> BinaryOperator {
        BinaryOperator::Xor
    }

    fn evaluate(
        &self,
        left: &InternalValue,
        right: &InternalValue,
        expression: &Expression,
        diagnostics: &mut Diagnostics,
    ) -> Option<InternalValue> {
        let (a, b) = booleans(self.operator(), left, right, expression, diagnostics)?;
        Some(InternalValue::Boolean(a ^ b))
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
            ColumnBinaryOp::Xor,
            left,
            right,
            expression,
            diagnostics,
            is_boolean,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_circuit_values() {
        assert_eq!(
            AndOperator.short_circuit(&false.into()),
            Some(InternalValue::Boolean(false))
        );
        assert_eq!(AndOperator.short_circuit(&true.into()), None);
        assert_eq!(
            OrOperator.short_circuit(&true.into()),
            Some(InternalValue::Boolean(true))
        );
        assert_eq!(XorOperator.short_circuit(&true.into()), None);
    }

    #[test]
    fn test_truth_tables() {
        let mut diagnostics = Diagnostics::new();
        let expr = Expression::variable("x");
        for (a, b) in [(false, false), (false, true), (true, false), (true, true)] {
            let (l, r) = (InternalValue::Boolean(a), InternalValue::Boolean(b));
            assert_eq!(
                AndOperator.evaluate(&l, &r, &expr, &mut diagnostics),
                Some(InternalValue::Boolean(a && b))
            );
            assert_eq!(
                OrOperator.evaluate(&l, &r, &expr, &mut diagnostics),
                Some(InternalValue::Boolean(a || b))
            );
            assert_eq!(
                XorOperator.evaluate(&l, &r, &expr, &mut diagnostics),
                Some(InternalValue::Boolean(a ^ b))
            );
        }
        assert!(diagnostics.is_empty());
        assert_eq!(
            NotOperator.evaluate(&InternalValue::Integer(1), &expr, &mut diagnostics),
            None
        );
        assert!(diagnostics.has_errors());
    }
}
