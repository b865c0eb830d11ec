use std::sync::Arc;

use arrow::compute::filter;
use async_trait::async_trait;

use crate::ast::TransformDefinition;
use crate::execution::{
    BlockExecutor, BlockMeta, ExecutionContext, ExecutionError, ExecutionResult, PropertySpec,
    TransformExecutor, TransformOutput,
};
use crate::table::{
    ArrayColumn, Column, ColumnarColumn, IoType, IoValue, Table, TableError, Tabular,
};
use crate::value_type::{Backend, InternalValue, ValueType};

/// `Table -> Table`: writes the result of a transform into an output column.
pub struct TableTransformerExecutor {
    meta: BlockMeta,
}

impl TableTransformerExecutor {
    pub const BLOCK_TYPE: &'static str = "TableTransformer";

    pub fn new() -> Self {
        Self {
            meta: BlockMeta::new(Self::BLOCK_TYPE, IoType::Table, IoType::Table)
                .with_property(
                    "inputColumns",
                    PropertySpec::required(ValueType::collection_of(ValueType::TEXT)),
                )
                .with_property("outputColumn", PropertySpec::required(ValueType::TEXT))
                .with_property("use", PropertySpec::required(ValueType::TRANSFORM)),
        }
    }

    fn check_input_columns_exist(
        input_columns: &[String],
        table: &Table,
        context: &ExecutionContext,
    ) -> ExecutionResult<()> {
        match input_columns
            .iter()
            .enumerate()
            .find(|(_, name)| !table.has_column(name))
        {
            Some((index, name)) => Err(ExecutionError::block(
                format!(
                    "The specified input column \"{}\" does not exist in the given table",
                    name
                ),
                context.property_anchor("inputColumns").with_index(index),
            )),
            None => Ok(()),
        }
    }

    fn check_input_column_types(
        input_columns: &[String],
        table: &Table,
        executor: &TransformExecutor,
        context: &ExecutionContext,
    ) -> ExecutionResult<()> {
        let ports = executor.input_details();
        if ports.len() != input_columns.len() {
            return Err(ExecutionError::block(
                format!(
                    "Expected {} input column(s) for the transform but {} were given",
                    ports.len(),
                    input_columns.len()
                ),
                context.property_anchor("inputColumns"),
            ));
        }
        for (name, port) in input_columns.iter().zip(ports) {
            let Some(column_type) = table.column_value_type(name) else {
                continue;
            };
            if !column_type.is_convertible_to(&port.value_type) {
                return Err(ExecutionError::block(
                    format!(
                        "Type {} of column \"{}\" is not convertible to type {}",
                        column_type.name(),
                        name,
                        port.value_type.name()
                    ),
                    context.property_anchor("use"),
                ));
            }
        }
        Ok(())
    }

    fn log_column_overwrite_status(
        table: &Table,
        output_column: &str,
        output_type: &ValueType,
        context: &ExecutionContext,
    ) {
        let Some(current_type) = table.column_value_type(output_column) else {
            return;
        };
        let logger = context.logger();
        logger.log_info(format!("Column \"{}\" will be overwritten", output_column));
        if &current_type != output_type {
            logger.log_info(format!(
                "Column \"{}\" will change its type from {} to {}",
                output_column,
                current_type.name(),
                output_type.name()
            ));
        }
    }

    fn transform(context: &ExecutionContext) -> ExecutionResult<Arc<TransformDefinition>> {
        match context.get_property_value("use", &ValueType::TRANSFORM)? {
            InternalValue::Transform(transform) => Ok(transform),
            other => panic!("Property `use` evaluated to {} instead of a transform", other),
        }
    }
}

impl Default for TableTransformerExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlockExecutor for TableTransformerExecutor {
    fn meta(&self) -> &BlockMeta {
        &self.meta
    }

    #[tracing::instrument(skip_all, level = "debug")]
    async fn execute(
        &self,
        input: IoValue,
        context: &ExecutionContext,
    ) -> ExecutionResult<IoValue> {
        let received = input.io_type();
        let IoValue::Table(table) = input else {
            return Err(ExecutionError::block(
                format!("Expected a table as input but received {}", received),
                context.anchor(),
            ));
        };
        let input_columns: Vec<String> = context
            .get_property_value(
                "inputColumns",
                &ValueType::collection_of(ValueType::TEXT),
            )?
            .as_collection()
            .unwrap_or_default()
            .iter()
            .filter_map(|value| value.as_str().map(str::to_string))
            .collect();
        let output_column = context
            .get_property_value("outputColumn", &ValueType::TEXT)?
            .as_str()
            .unwrap_or_default()
            .to_string();

        Self::check_input_columns_exist(&input_columns, &table, context)?;
        let executor = TransformExecutor::new(Self::transform(context)?);
        Self::check_input_column_types(&input_columns, &table, &executor, context)?;
        let output_type = executor.output_details()?.value_type.clone();
        Self::log_column_overwrite_status(&table, &output_column, &output_type, context);

        let output = executor.execute(&table, &input_columns, context)?;
        let (table, column) = match (table, output) {
            (
                mut table,
                TransformOutput::Array {
                    values,
                    rows_to_drop,
                },
            ) => {
                table.drop_rows(&rows_to_drop)?;
                let column = ArrayColumn::from_values(output_column, output_type, values)?;
                (table, Column::Array(column))
            }
            (Table::Columnar(table), TransformOutput::Columnar { values, keep }) => {
                let values = filter(&values, &keep).map_err(TableError::from)?;
                let table = Table::Columnar(table.filter(&keep)?);
                (table, Column::Columnar(ColumnarColumn::new(output_column, values)))
            }
            (table, TransformOutput::Columnar { .. }) => {
                return Err(TableError::BackendMismatch {
                    table: table.backend(),
                    column: Backend::Columnar,
                }
                .into());
            }
        };
        Ok(IoValue::Table(table.with_column(column)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{
        BinaryOperator, BlockDefinition, Expression, PipelineDefinition, TransformPortDefinition,
    };
    use crate::config::RunConfig;
    use crate::execution::{ExecutorRegistry, StackNode};
    use crate::table::TableFactory;
    use pretty_assertions::assert_eq;

    fn celsius_to_fahrenheit() -> TransformDefinition {
        TransformDefinition::new(
            "CelsiusToFahrenheit",
            vec![
                TransformPortDefinition::from("celsius", ValueType::DECIMAL),
                TransformPortDefinition::to("fahrenheit", ValueType::DECIMAL),
            ],
            "fahrenheit",
            Expression::binary(
                BinaryOperator::Add,
                Expression::binary(
                    BinaryOperator::Multiply,
                    Expression::variable("celsius"),
                    Expression::decimal(1.8),
                ),
                Expression::integer(32),
            ),
        )
    }

    fn transformer(inputs: &[&str], output: &str, transform: TransformDefinition) -> BlockDefinition {
        BlockDefinition::new("Transformer", "TableTransformer")
            .with_property(
                "inputColumns",
                Expression::collection(inputs.iter().map(|name| Expression::text(*name)).collect()),
            )
            .with_property("outputColumn", Expression::text(output))
            .with_property("use", Expression::transform(transform))
    }

    fn temperatures(backend: Backend) -> Table {
        TableFactory::new(backend)
            .from_columns(vec![
                ArrayColumn::from_values(
                    "city",
                    ValueType::TEXT,
                    ["Oslo", "Lima", "Pune"].map(InternalValue::text),
                )
                .unwrap(),
                ArrayColumn::from_values("temp", ValueType::INTEGER, [0i64, 20, 100].map(Into::into))
                    .unwrap(),
            ])
            .unwrap()
    }

    async fn run(block: BlockDefinition, table: Table) -> ExecutionResult<Table> {
        let config = RunConfig {
            backend: table.backend(),
            ..RunConfig::default()
        };
        let context = ExecutionContext::new(
            Arc::new(PipelineDefinition::new("Weather")),
            Arc::new(config),
            Arc::new(ExecutorRegistry::with_standard_executors()),
        )
        .enter_node(StackNode::Block(Arc::new(block)));
        match TableTransformerExecutor::new()
            .execute(IoValue::Table(table), &context)
            .await?
        {
            IoValue::Table(table) => Ok(table),
            other => panic!("expected a table, got {}", other),
        }
    }

    #[tokio::test]
    async fn test_adds_output_column_on_both_backends() {
        for backend in [Backend::Array, Backend::Columnar] {
            let table = run(
                transformer(&["temp"], "fahrenheit", celsius_to_fahrenheit()),
                temperatures(backend),
            )
            .await
            .unwrap();
            assert_eq!(table.column_names(), vec!["city", "temp", "fahrenheit"]);
            assert_eq!(table.cell(1, 2), Some(InternalValue::Decimal(68.0)));
            assert_eq!(table.cell(2, 2), Some(InternalValue::Decimal(212.0)));
        }
    }

    #[tokio::test]
    async fn test_overwrites_existing_column_in_place() {
        for backend in [Backend::Array, Backend::Columnar] {
            let table = run(
                transformer(&["temp"], "temp", celsius_to_fahrenheit()),
                temperatures(backend),
            )
            .await
            .unwrap();
            assert_eq!(table.column_names(), vec!["city", "temp"]);
            assert_eq!(table.column_value_type("temp"), Some(ValueType::DECIMAL));
            assert_eq!(table.cell(0, 1), Some(InternalValue::Decimal(32.0)));
        }
    }

    #[tokio::test]
    async fn test_failing_rows_are_dropped_from_every_column() {
        let inverse = TransformDefinition::new(
            "Inverse",
            vec![
                TransformPortDefinition::from("x", ValueType::DECIMAL),
                TransformPortDefinition::to("inverse", ValueType::DECIMAL),
            ],
            "inverse",
            Expression::binary(
                BinaryOperator::Divide,
                Expression::integer(1),
                Expression::variable("x"),
            ),
        );
        for backend in [Backend::Array, Backend::Columnar] {
            let table = run(transformer(&["temp"], "inverse", inverse.clone()), temperatures(backend))
                .await
                .unwrap();
            assert_eq!(table.num_rows(), 2, "{:?}", backend);
            assert_eq!(table.cell(0, 0), Some(InternalValue::text("Lima")));
            assert_eq!(table.cell(1, 2), Some(InternalValue::Decimal(0.01)));
        }
    }

    #[tokio::test]
    async fn test_missing_input_column_is_anchored_at_its_index() {
        let error = run(
            transformer(&["temp", "humidity"], "out", celsius_to_fahrenheit()),
            temperatures(Backend::Array),
        )
        .await
        .unwrap_err();
        assert!(error.to_string().starts_with(
            "The specified input column \"humidity\" does not exist in the given table"
        ));
        let anchor = error.anchor().unwrap();
        assert_eq!(anchor.property.as_deref(), Some("inputColumns"));
        assert_eq!(anchor.index, Some(1));
    }

    #[tokio::test]
    async fn test_input_type_must_be_convertible() {
        let error = run(
            transformer(&["city"], "out", celsius_to_fahrenheit()),
            temperatures(Backend::Columnar),
        )
        .await
        .unwrap_err();
        assert!(error
            .to_string()
            .starts_with("Type text of column \"city\" is not convertible to type decimal"));
        assert_eq!(error.anchor().unwrap().property.as_deref(), Some("use"));
    }
}
