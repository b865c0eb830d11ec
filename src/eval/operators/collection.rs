use crate::ast::{BinaryOperator, Expression};
use crate::diagnostic::Diagnostics;
use crate::eval::operator::{report_type_mismatch, BinaryOperatorEvaluator};
use crate::value_type::InternalValue;

use super::comparison::values_equal;

/// `needle in [a, b, c]` for text and numeric needles.
pub struct InOperator;

impl BinaryOperatorEvaluator for InOperator {
    fn operator(&self) -> BinaryOperator {
        BinaryOperator::In
    }

    fn evaluate(
        &self,
        left: &InternalValue,
        right: &InternalValue,
        expression: &Expression,
        diagnostics: &mut Diagnostics,
    ) -> Option<InternalValue> {
        let needle_ok = matches!(
            left,
            InternalValue::Text(_) | InternalValue::Integer(_) | InternalValue::Decimal(_)
        );
        match right {
            InternalValue::Collection(haystack) if needle_ok => Some(InternalValue::Boolean(
                haystack.iter().any(|candidate| values_equal(left, candidate)),
            )),
            _ => {
                report_type_mismatch(self.operator(), &[left, right], expression, diagnostics);
                None
            }
        }
    }
}
