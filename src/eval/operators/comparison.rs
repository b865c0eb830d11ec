use std::cmp::Ordering;

use crate::ast::{BinaryOperator, Expression};
use crate::diagnostic::Diagnostics;
use crate::eval::column_expr::ColumnBinaryOp;
use crate::eval::operator::{report_type_mismatch, BinaryOperatorEvaluator, SymbolicValue};
use crate::value_type::InternalValue;

use super::{is_comparable, symbolic_binary};

/// Orders two scalars of compatible kinds. Integers and decimals compare
/// numerically with each other.
pub(crate) fn compare_values(left: &InternalValue, right: &InternalValue) -> Option<Ordering> {
    match (left, right) {
        (InternalValue::Integer(a), InternalValue::Integer(b)) => Some(a.cmp(b)),
        (InternalValue::Text(a), InternalValue::Text(b)) => Some(a.cmp(b)),
        (InternalValue::Boolean(a), InternalValue::Boolean(b)) => Some(a.cmp(b)),
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        },
    }
}

pub(crate) fn values_equal(left: &InternalValue, right: &InternalValue) -> bool {
    compare_values(left, right) == Some(Ordering::Equal)
}

/// One evaluator type for all six comparison symbols; each registry entry
/// fixes the symbol and its accepted orderings.
pub struct ComparisonOperator {
    operator: BinaryOperator,
    column_op: ColumnBinaryOp,
    accepts: fn(Ordering) -> bool,
}

pub const LESS_THAN: ComparisonOperator = ComparisonOperator {
    operator: BinaryOperator::LessThan,
    column_op: ColumnBinaryOp::LessThan,
    accepts: Ordering::is_lt,
};

pub const LESS_THAN_EQUAL: ComparisonOperator = ComparisonOperator {
    operator: BinaryOperator::LessThanEqual,
    column_op: ColumnBinaryOp::LessThanEqual,
    accepts: Ordering::is_le,
};

pub const GREATER_THAN: ComparisonOperator = ComparisonOperator {
    operator: BinaryOperator::GreaterThan,
    column_op: ColumnBinaryOp::GreaterThan,
    accepts: Ordering::is_gt,
};

pub const GREATER_THAN_EQUAL: ComparisonOperator = ComparisonOperator {
    operator: BinaryOperator::GreaterThanEqual,
    column_op: ColumnBinaryOp::GreaterThanEqual,
    accepts: Ordering::is_ge,
};

pub const EQUALITY: ComparisonOperator = ComparisonOperator {
    operator: BinaryOperator::Equal,
    column_op: ColumnBinaryOp::Equal,
    accepts: Ordering::is_eq,
};

pub const INEQUALITY: ComparisonOperator = ComparisonOperator {
    operator: BinaryOperator::NotEqual,
    column_op: ColumnBinaryOp::NotEqual,
    accepts: Ordering::is_ne,
};

impl BinaryOperatorEvaluator for ComparisonOperator {
    fn operator(&self) -> BinaryOperator {
        self.operator
    }

    fn evaluate(
        &self,
        left: &InternalValue,
        right: &InternalValue,
        expression: &Expression,
        diagnostics: &mut Diagnostics,
    ) -> Option<InternalValue> {
        match compare_values(left, right) {
            Some(ordering) => Some(InternalValue::Boolean((self.accepts)(ordering))),
            None => {
                report_type_mismatch(self.operator, &[left, right], expression, diagnostics);
                None
            }
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
            self.column_op,
            left,
            right,
            expression,
            diagnostics,
            is_comparable,
        )
    }
}
