use crate::ast::{BinaryOperator, Expression, TernaryOperator, UnaryOperator};
use crate::diagnostic::Diagnostics;
use crate::eval::column_expr::ColumnUnaryOp;
use crate::eval::operator::{
    report_type_mismatch, BinaryOperatorEvaluator, SymbolicValue, TernaryOperatorEvaluator,
    UnaryOperatorEvaluator,
};
use crate::value_type::InternalValue;

use super::symbolic_unary;

pub struct LowercaseOperator;

impl UnaryOperatorEvaluator for LowercaseOperator {
    fn operator(&self) -> UnaryOperator {
        UnaryOperator::Lowercase
    }

    fn evaluate(
        &self,
        operand: &InternalValue,
        expression: &Expression,
        diagnostics: &mut Diagnostics,
    ) -> Option<InternalValue> {
        match operand {
            InternalValue::Text(s) => Some(InternalValue::Text(s.to_lowercase())),
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
        symbolic_unary(self, ColumnUnaryOp::Lowercase, operand, expression, diagnostics)
    }
}

pub struct UppercaseOperator;

impl UnaryOperatorEvaluator for UppercaseOperator {
    fn operator(&self) -> UnaryOperator {
        UnaryOperator::Uppercase
    }

    fn evaluate(
        &self,
        operand: &InternalValue,
        expression: &Expression,
        diagnostics: &mut Diagnostics,
    ) -> Option<InternalValue> {
        match operand {
            InternalValue::Text(s) => Some(InternalValue::Text(s.to_uppercase())),
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
        symbolic_unary(self, ColumnUnaryOp::Uppercase, operand, expression, diagnostics)
    }
}

pub struct MatchesOperator;

impl BinaryOperatorEvaluator for MatchesOperator {
    fn operator(&self) -> BinaryOperator {
        BinaryOperator::Matches
    }

    fn evaluate(
        &self,
        left: &InternalValue,
        right: &InternalValue,
        expression: &Expression,
        diagnostics: &mut Diagnostics,
    ) -> Option<InternalValue> {
        match (left, right) {
            (InternalValue::Text(text), InternalValue::Regex(regex)) => {
                Some(InternalValue::Boolean(regex.0.is_match(text)))
            }
            _ => {
                report_type_mismatch(self.operator(), &[left, right], expression, diagnostics);
                None
            }
        }
    }
}

/// `replace(text, regex, replacement)`, replacing every match.
pub struct ReplaceOperator;

impl TernaryOperatorEvaluator for ReplaceOperator {
    fn operator(&self) -> TernaryOperator {
        TernaryOperator::Replace
    }

    fn evaluate(
        &self,
        first: &InternalValue,
        second: &InternalValue,
        third: &InternalValue,
        expression: &Expression,
        diagnostics: &mut Diagnostics,
    ) -> Option<InternalValue> {
        match (first, second, third) {
            (
                InternalValue::Text(text),
                InternalValue::Regex(regex),
                InternalValue::Text(replacement),
            ) => Some(InternalValue::Text(
                regex.0.replace_all(text, replacement.as_str()).into_owned(),
            )),
            _ => {
                report_type_mismatch(
                    self.operator(),
                    &[first, second, third],
                    expression,
                    diagnostics,
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::DiagnosticCode;
    use crate::eval::column_expr::ColumnExpr;
    use crate::value_type::RegexValue;

    fn regex(pattern: &str) -> InternalValue {
        InternalValue::Regex(RegexValue::new(pattern).unwrap())
    }

    #[test]
    fn test_case_mapping() {
        let mut diagnostics = Diagnostics::new();
        let expr = Expression::variable("x");
        assert_eq!(
            UppercaseOperator.evaluate(&"Straße".into(), &expr, &mut diagnostics),
            Some(InternalValue::text("STRASSE"))
        );
        assert_eq!(
            LowercaseOperator.evaluate(&"ÄB".into(), &expr, &mut diagnostics),
            Some(InternalValue::text("äb"))
        );
    }

    #[test]
    fn test_matches_and_replace() {
        let mut diagnostics = Diagnostics::new();
        let expr = Expression::variable("x");
        assert_eq!(
            MatchesOperator.evaluate(&"DE-123".into(), &regex(r"^[A-Z]{2}-\d+$"), &expr, &mut diagnostics),
            Some(InternalValue::Boolean(true))
        );
        assert_eq!(
            ReplaceOperator.evaluate(
                &"a-b-c".into(),
                &regex("-"),
                &"+".into(),
                &expr,
                &mut diagnostics
            ),
            Some(InternalValue::text("a+b+c"))
        );
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_matches_on_column_is_unsupported() {
        let mut diagnostics = Diagnostics::new();
        let result = MatchesOperator.symbolic_evaluate(
            SymbolicValue::Column(ColumnExpr::column("name")),
            SymbolicValue::Scalar(regex("a")),
            &Expression::variable("x"),
            &mut diagnostics,
        );
        assert_eq!(result, None);
        assert!(diagnostics.has_code(DiagnosticCode::Unsupported));
        assert_eq!(
            diagnostics.iter().next().map(|d| d.message.as_str()),
            Some("`matches` is not supported yet.")
        );
    }
}
