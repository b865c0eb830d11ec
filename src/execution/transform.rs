use std::sync::Arc;

use arrow::array::{new_null_array, Array, ArrayRef, BooleanArray, Float64Array};
use arrow::compute::cast;
use arrow::datatypes::DataType;

use crate::ast::{TransformDefinition, TransformPortDefinition};
use crate::diagnostic::{DiagnosticCode, Diagnostics};
use crate::eval::{ColumnExpr, SymbolicValue};
use crate::table::columnar::cell_value;
use crate::table::{ArrayTable, ColumnarTable, Table, TableError, Tabular};
use crate::value_type::{InternalValue, ValueType};

use super::{is_valid_value, ExecutionContext, ExecutionError, ExecutionResult, StackNode};

/// Values produced by a transform, one per surviving row.
#[derive(Debug, Clone)]
pub enum TransformOutput {
    /// Valid values in row order, plus the rows that produced none.
    Array {
        values: Vec<InternalValue>,
        rows_to_drop: Vec<usize>,
    },
    /// A full-length column and the mask of rows to keep.
    Columnar { values: ArrayRef, keep: BooleanArray },
}

/// Applies a transform definition to whole table columns.
pub struct TransformExecutor {
    transform: Arc<TransformDefinition>,
}

impl TransformExecutor {
    pub fn new(transform: Arc<TransformDefinition>) -> Self {
        Self { transform }
    }

    pub fn input_details(&self) -> Vec<&TransformPortDefinition> {
        self.transform.inputs().collect()
    }

    pub fn output_details(&self) -> ExecutionResult<&TransformPortDefinition> {
        self.transform.output().ok_or_else(|| {
            ExecutionError::block(
                format!("Transform `{}` has no output port", self.transform.name),
                StackNode::Transform(self.transform.clone()).anchor(),
            )
        })
    }

    /// Evaluates the output assignment over `table`, binding the i-th input
    /// port to the i-th entry of `input_columns`.
    pub fn execute(
        &self,
        table: &Table,
        input_columns: &[String],
        context: &ExecutionContext,
    ) -> ExecutionResult<TransformOutput> {
        let context = context.enter_node(StackNode::Transform(self.transform.clone()));
        let inputs = self.input_details();
        assert_eq!(
            inputs.len(),
            input_columns.len(),
            "Transform `{}` needs one column per input port",
            self.transform.name
        );
        let output_type = self.output_details()?.value_type.clone();
        match table {
            Table::Array(table) => {
                self.execute_rows(table, &inputs, input_columns, &output_type, &context)
            }
            Table::Columnar(table) => {
                self.execute_columns(table, &inputs, input_columns, &output_type, &context)
            }
        }
    }

    fn execute_rows(
        &self,
        table: &ArrayTable,
        inputs: &[&TransformPortDefinition],
        input_columns: &[String],
        output_type: &ValueType,
        context: &ExecutionContext,
    ) -> ExecutionResult<TransformOutput> {
        let columns = input_columns
            .iter()
            .map(|name| {
                table
                    .get_column(name)
                    .ok_or_else(|| ExecutionError::Table(TableError::UnknownColumn(name.clone())))
            })
            .collect::<ExecutionResult<Vec<_>>>()?;
        let logger = context.logger();
        let expression = &self.transform.output_assignment.expression;
        let mut evaluation = context.evaluation_context();
        let mut values = Vec::with_capacity(table.num_rows());
        let mut rows_to_drop = Vec::new();

        for row in 0..table.num_rows() {
            let bindings = inputs
                .iter()
                .zip(&columns)
                .filter_map(|(port, column)| {
                    let value = column.nth(row)?.clone();
                    Some((
                        port.name.clone(),
                        SymbolicValue::Scalar(port.value_type.normalize(value)),
                    ))
                })
                .collect();
            let mut diagnostics = Diagnostics::new();
            let value = evaluation.with_bindings(bindings, |scope| {
                context.evaluator().evaluate(expression, scope, &mut diagnostics)
            });
            for diagnostic in diagnostics.iter() {
                logger.log_debug(diagnostic.to_string());
            }

            match value.map(|value| output_type.normalize(value)) {
                None => {
                    logger.log_debug(format!(
                        "Dropping row {}: Could not evaluate transform expression",
                        row + 1
                    ));
                    rows_to_drop.push(row);
                }
                Some(value) if !is_valid_value(&value, output_type, context) => {
                    logger.log_debug(format!(
                        "Invalid value in row {}: \"{}\" does not match the type {}",
                        row + 1,
                        value,
                        output_type.name()
                    ));
                    rows_to_drop.push(row);
                }
                Some(value) => values.push(value),
            }
        }
        Ok(TransformOutput::Array {
            values,
            rows_to_drop,
        })
    }

    fn execute_columns(
        &self,
        table: &ColumnarTable,
        inputs: &[&TransformPortDefinition],
        input_columns: &[String],
        output_type: &ValueType,
        context: &ExecutionContext,
    ) -> ExecutionResult<TransformOutput> {
        let provider = context.value_type_provider();
        let logger = context.logger();
        let batch = table.record_batch();
        let num_rows = batch.num_rows();

        let mut bindings = Vec::with_capacity(inputs.len());
        for (port, name) in inputs.iter().zip(input_columns) {
            let column = table.get_column(name).ok_or_else(|| {
                ExecutionError::Table(TableError::UnknownColumn(name.clone()))
            })?;
            let port_type = provider.arrow_type_or_text(&port.value_type);
            let mut expr = ColumnExpr::column(name.clone());
            if column.data_type() != &port_type {
                expr = expr.cast(port_type);
            }
            bindings.push((port.name.clone(), SymbolicValue::Column(expr)));
        }

        let expression = &self.transform.output_assignment.expression;
        let mut evaluation = context.evaluation_context();
        let mut diagnostics = Diagnostics::new();
        let result = evaluation.with_bindings(bindings, |scope| {
            context
                .evaluator()
                .symbolic_evaluate(expression, scope, &mut diagnostics)
        });
        for diagnostic in diagnostics.iter() {
            logger.log_debug(diagnostic.to_string());
        }

        let target = provider.arrow_type_or_text(output_type);
        let raw = match result {
            Some(value) => {
                logger.log_debug(format!("Evaluating {}", value.clone().into_column_expr()));
                value.into_column_expr().evaluate_to_array(batch)?
            }
            None if diagnostics.has_code(DiagnosticCode::Unsupported) => {
                let message = diagnostics
                    .iter()
                    .map(|diagnostic| diagnostic.message.clone())
                    .collect::<Vec<_>>()
                    .join("; ");
                return Err(ExecutionError::block(
                    message,
                    StackNode::Transform(self.transform.clone()).anchor(),
                ));
            }
            None => {
                logger.log_debug(format!(
                    "Dropping all {} row(s): Could not evaluate transform expression",
                    num_rows
                ));
                new_null_array(&target, num_rows)
            }
        };

        let values = if raw.data_type() == &target {
            raw.clone()
        } else {
            cast(&raw, &target).map_err(TableError::from)?
        };
        let keep = self.keep_mask(&raw, &values, output_type, context);
        Ok(TransformOutput::Columnar { values, keep })
    }

    /// Rows are kept when the result is present, finite, survives the cast
    /// to the output type without losing a fraction, and satisfies the
    /// output type's constraints.
    fn keep_mask(
        &self,
        raw: &ArrayRef,
        values: &ArrayRef,
        output_type: &ValueType,
        context: &ExecutionContext,
    ) -> BooleanArray {
        let floats = raw.as_any().downcast_ref::<Float64Array>();
        let truncating = values.data_type() == &DataType::Int64;
        let constraints = !output_type.constraint_chain().is_empty();
        (0..values.len())
            .map(|row| {
                if values.is_null(row) {
                    return Some(false);
                }
                if let Some(floats) = floats {
                    let x = floats.value(row);
                    if !x.is_finite() || (truncating && x.fract() != 0.0) {
                        return Some(false);
                    }
                }
                if constraints {
                    let valid = cell_value(values.as_ref(), row)
                        .is_some_and(|value| is_valid_value(&value, output_type, context));
                    return Some(valid);
                }
                Some(true)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOperator, Expression, PipelineDefinition, UnaryOperator};
    use crate::config::RunConfig;
    use crate::execution::ExecutorRegistry;
    use crate::table::{ArrayColumn, TableFactory};
    use crate::value_type::Backend;

    fn context(backend: Backend) -> ExecutionContext {
        let config = RunConfig {
            backend,
            ..RunConfig::default()
        };
        ExecutionContext::new(
            Arc::new(PipelineDefinition::new("Transforms")),
            Arc::new(config),
            Arc::new(ExecutorRegistry::with_standard_executors()),
        )
    }

    fn table(backend: Backend) -> Table {
        TableFactory::new(backend)
            .from_columns(vec![
                ArrayColumn::from_values("a", ValueType::INTEGER, [10i64, 7, 0].map(Into::into))
                    .unwrap(),
                ArrayColumn::from_values("b", ValueType::INTEGER, [2i64, 0, 5].map(Into::into))
                    .unwrap(),
            ])
            .unwrap()
    }

    fn divide(output: ValueType) -> TransformExecutor {
        TransformExecutor::new(Arc::new(TransformDefinition::new(
            "Ratio",
            vec![
                TransformPortDefinition::from("x", ValueType::DECIMAL),
                TransformPortDefinition::from("y", ValueType::DECIMAL),
                TransformPortDefinition::to("ratio", output),
            ],
            "ratio",
            Expression::binary(
                BinaryOperator::Divide,
                Expression::variable("x"),
                Expression::variable("y"),
            ),
        )))
    }

    fn columns() -> Vec<String> {
        vec!["a".to_string(), "b".to_string()]
    }

    #[test]
    fn test_array_backend_drops_failing_rows() {
        let context = context(Backend::Array);
        let output = divide(ValueType::DECIMAL)
            .execute(&table(Backend::Array), &columns(), &context)
            .unwrap();
        let TransformOutput::Array {
            values,
            rows_to_drop,
        } = output
        else {
            panic!("expected array output");
        };
        assert_eq!(values, vec![InternalValue::Decimal(5.0), InternalValue::Decimal(0.0)]);
        assert_eq!(rows_to_drop, vec![1]);
    }

    #[test]
    fn test_columnar_backend_masks_non_finite_rows() {
        let context = context(Backend::Columnar);
        let output = divide(ValueType::DECIMAL)
            .execute(&table(Backend::Columnar), &columns(), &context)
            .unwrap();
        let TransformOutput::Columnar { values, keep } = output else {
            panic!("expected columnar output");
        };
        assert_eq!(keep, BooleanArray::from(vec![true, false, true]));
        assert_eq!(cell_value(values.as_ref(), 0), Some(InternalValue::Decimal(5.0)));
    }

    #[test]
    fn test_integer_output_drops_fractions_on_both_backends() {
        for backend in [Backend::Array, Backend::Columnar] {
            let context = context(backend);
            let output = divide(ValueType::INTEGER)
                .execute(
                    &TableFactory::new(backend)
                        .from_columns(vec![
                            ArrayColumn::from_values("a", ValueType::INTEGER, [9i64, 7].map(Into::into))
                                .unwrap(),
                            ArrayColumn::from_values("b", ValueType::INTEGER, [3i64, 2].map(Into::into))
                                .unwrap(),
                        ])
                        .unwrap(),
                    &columns(),
                    &context,
                )
                .unwrap();
            match output {
                TransformOutput::Array {
                    values,
                    rows_to_drop,
                } => {
                    assert_eq!(values, vec![InternalValue::Integer(3)]);
                    assert_eq!(rows_to_drop, vec![1]);
                }
                TransformOutput::Columnar { values, keep } => {
                    assert_eq!(keep, BooleanArray::from(vec![true, false]));
                    assert_eq!(cell_value(values.as_ref(), 0), Some(InternalValue::Integer(3)));
                }
            }
        }
    }

    #[test]
    fn test_unsupported_columnar_operator_fails() {
        let context = context(Backend::Columnar);
        let executor = TransformExecutor::new(Arc::new(TransformDefinition::new(
            "Parse",
            vec![
                TransformPortDefinition::from("raw", ValueType::TEXT),
                TransformPortDefinition::to("parsed", ValueType::INTEGER),
            ],
            "parsed",
            Expression::unary(UnaryOperator::AsInteger, Expression::variable("raw")),
        )));
        let table = TableFactory::new(Backend::Columnar)
            .from_columns(vec![ArrayColumn::from_values(
                "raw",
                ValueType::TEXT,
                ["1".into()],
            )
            .unwrap()])
            .unwrap();
        let error = executor
            .execute(&table, &["raw".to_string()], &context)
            .unwrap_err();
        assert!(error.to_string().contains("not supported"), "{}", error);
    }
}
