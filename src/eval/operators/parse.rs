use crate::ast::{Expression, UnaryOperator};
use crate::diagnostic::{DiagnosticCode, Diagnostics};
use crate::eval::operator::{anchor, report_type_mismatch, UnaryOperatorEvaluator};
use crate::value_type::{InternalValue, PrimitiveValueType};

/// Parses a text operand with the target primitive's `from_string`.
fn parse_text(
    operator: UnaryOperator,
    target: PrimitiveValueType,
    article: &str,
    operand: &InternalValue,
    expression: &Expression,
    diagnostics: &mut Diagnostics,
) -> Option<InternalValue> {
    let InternalValue::Text(text) = operand else {
        report_type_mismatch(operator, &[operand], expression, diagnostics);
        return None;
    };
    let parsed = target.from_string(text);
    if parsed.is_none() {
        diagnostics.error(
            DiagnosticCode::InvalidLiteral,
            format!("Could not parse \"{}\" into {} {}", text, article, target),
            anchor(expression),
        );
    }
    parsed
}

pub struct AsTextOperator;

impl UnaryOperatorEvaluator for AsTextOperator {
    fn operator(&self) -> UnaryOperator {
        UnaryOperator::AsText
    }

    fn evaluate(
        &self,
        operand: &InternalValue,
        expression: &Expression,
        diagnostics: &mut Diagnostics,
    ) -> Option<InternalValue> {
        match operand {
            InternalValue::Boolean(_)
            | InternalValue::Integer(_)
            | InternalValue::Decimal(_)
            | InternalValue::Text(_) => Some(InternalValue::Text(operand.to_string())),
            other => {
                report_type_mismatch(self.operator(), &[other], expression, diagnostics);
                None
            }
        }
    }
}

pub struct AsDecimalOperator;

impl UnaryOperatorEvaluator for AsDecimalOperator {
    fn operator(&self) -> UnaryOperator {
        UnaryOperator::AsDecimal
    }

    fn evaluate(
        &self,
        operand: &InternalValue,
        expression: &Expression,
        diagnostics: &mut Diagnostics,
    ) -> Option<InternalValue> {
        parse_text(
            self.operator(),
            PrimitiveValueType::Decimal,
            "a",
            operand,
            expression,
            diagnostics,
        )
    }
}

pub struct AsIntegerOperator;

impl UnaryOperatorEvaluator for AsIntegerOperator {
    fn operator(&self) -> UnaryOperator {
        UnaryOperator::AsInteger
    }

    fn evaluate(
        &self,
        operand: &InternalValue,
        expression: &Expression,
        diagnostics: &mut Diagnostics,
    ) -> Option<InternalValue> {
        parse_text(
            self.operator(),
            PrimitiveValueType::Integer,
            "an",
            operand,
            expression,
            diagnostics,
        )
    }
}

pub struct AsBooleanOperator;

impl UnaryOperatorEvaluator for AsBooleanOperator {
    fn operator(&self) -> UnaryOperator {
        UnaryOperator::AsBoolean
    }

    fn evaluate(
        &self,
        operand: &InternalValue,
        expression: &Expression,
        diagnostics: &mut Diagnostics,
    ) -> Option<InternalValue> {
        parse_text(
            self.operator(),
            PrimitiveValueType::Boolean,
            "a",
            operand,
            expression,
            diagnostics,
        )
    }
}
