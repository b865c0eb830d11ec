use std::sync::Arc;

use async_trait::async_trait;

use crate::ast::ValuetypeAssignment;
use crate::execution::{
    is_valid_value, BlockExecutor, BlockMeta, ExecutionContext, ExecutionError, ExecutionResult,
    Logger, PropertySpec,
};
use crate::table::{ArrayColumn, IoType, IoValue, Sheet, Table, Tabular};
use crate::value_type::{CellIndex, InternalValue, ValueType};

/// A declared column and where its values come from in the sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinitionEntry {
    pub sheet_column_index: usize,
    pub column_name: String,
    pub value_type: ValueType,
}

impl ColumnDefinitionEntry {
    fn new(sheet_column_index: usize, definition: &ValuetypeAssignment) -> Self {
        Self {
            sheet_column_index,
            column_name: definition.name.clone(),
            value_type: definition.value_type.clone(),
        }
    }
}

/// `Sheet -> Table`: parses every cell with its column's value type.
pub struct TableInterpreterExecutor {
    meta: BlockMeta,
}

impl TableInterpreterExecutor {
    pub const BLOCK_TYPE: &'static str = "TableInterpreter";

    pub fn new() -> Self {
        Self {
            meta: BlockMeta::new(Self::BLOCK_TYPE, IoType::Sheet, IoType::Table)
                .with_property(
                    "header",
                    PropertySpec::with_default(ValueType::BOOLEAN, true),
                )
                .with_property(
                    "columns",
                    PropertySpec::required(ValueType::collection_of(
                        ValueType::VALUETYPE_ASSIGNMENT,
                    )),
                ),
        }
    }

    /// Sheet columns are taken in declaration order.
    pub fn entries_without_header(
        definitions: &[Arc<ValuetypeAssignment>],
    ) -> Vec<ColumnDefinitionEntry> {
        definitions
            .iter()
            .enumerate()
            .map(|(index, definition)| ColumnDefinitionEntry::new(index, definition))
            .collect()
    }

    /// Sheet columns are matched by header name; declarations without a
    /// matching header are omitted.
    pub fn entries_from_header(
        definitions: &[Arc<ValuetypeAssignment>],
        header_row: &[String],
        logger: &Logger,
    ) -> Vec<ColumnDefinitionEntry> {
        logger.log_debug("Matching header with provided column names");
        definitions
            .iter()
            .filter_map(|definition| {
                match header_row.iter().position(|name| name == &definition.name) {
                    Some(index) => Some(ColumnDefinitionEntry::new(index, definition)),
                    None => {
                        logger.log_debug(format!(
                            "Omitting column \"{}\" as the name was not found in the header",
                            definition.name
                        ));
                        None
                    }
                }
            })
            .collect()
    }

    fn column_definitions(value: &InternalValue) -> Vec<Arc<ValuetypeAssignment>> {
        value
            .as_collection()
            .unwrap_or_default()
            .iter()
            .filter_map(|value| match value {
                InternalValue::ValuetypeAssignment(definition) => Some(definition.clone()),
                _ => None,
            })
            .collect()
    }

    fn parse_and_validate(
        value: &str,
        value_type: &ValueType,
        context: &ExecutionContext,
    ) -> Option<InternalValue> {
        let parsed = value_type.from_string(value)?;
        is_valid_value(&parsed, value_type, context).then_some(parsed)
    }

    /// Parsed values of one sheet row in entry order, `None` when any cell is
    /// invalid. Every invalid cell is logged.
    fn parse_row(
        row: &[String],
        row_index: usize,
        entries: &[ColumnDefinitionEntry],
        context: &ExecutionContext,
    ) -> Option<Vec<InternalValue>> {
        let logger = context.logger();
        let mut values = Vec::with_capacity(entries.len());
        let mut valid = true;
        for entry in entries {
            let raw = row
                .get(entry.sheet_column_index)
                .map(String::as_str)
                .unwrap_or_default();
            match Self::parse_and_validate(raw, &entry.value_type, context) {
                Some(value) => values.push(value),
                None => {
                    logger.log_debug(format!(
                        "Invalid value at cell {}: \"{}\" does not match the type {}",
                        CellIndex::new(entry.sheet_column_index, row_index),
                        raw,
                        entry.value_type.name()
                    ));
                    valid = false;
                }
            }
        }
        valid.then_some(values)
    }

    fn construct_table(
        sheet: &Sheet,
        header: bool,
        entries: &[ColumnDefinitionEntry],
        context: &ExecutionContext,
    ) -> ExecutionResult<Table> {
        let logger = context.logger();
        let mut columns: Vec<ArrayColumn> = entries
            .iter()
            .map(|entry| ArrayColumn::new(entry.column_name.clone(), entry.value_type.clone()))
            .collect();

        for (row_index, row) in sheet.rows().iter().enumerate() {
            if header && row_index == 0 {
                continue;
            }
            match Self::parse_row(row, row_index, entries, context) {
                Some(values) => {
                    for (column, value) in columns.iter_mut().zip(values) {
                        column.push(value)?;
                    }
                }
                None => logger.log_debug(format!("Omitting row {}", row_index + 1)),
            }
        }
        Ok(context.table_factory().from_columns(columns)?)
    }
}

impl Default for TableInterpreterExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlockExecutor for TableInterpreterExecutor {
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
        let IoValue::Sheet(sheet) = input else {
            return Err(ExecutionError::block(
                format!("Expected a sheet as input but received {}", received),
                context.anchor(),
            ));
        };
        let logger = context.logger();
        let header = context
            .get_property_value("header", &ValueType::BOOLEAN)?
            .as_bool()
            .unwrap_or(true);
        let definitions = Self::column_definitions(&context.get_property_value(
            "columns",
            &ValueType::collection_of(ValueType::VALUETYPE_ASSIGNMENT),
        )?);

        let entries = if header {
            let Some(header_row) = sheet.header_row() else {
                return Err(ExecutionError::block(
                    "The input sheet is empty and thus has no header",
                    context.property_anchor("header"),
                ));
            };
            Self::entries_from_header(&definitions, header_row, &logger)
        } else {
            if sheet.number_of_columns() < definitions.len() {
                return Err(ExecutionError::block(
                    format!(
                        "There are {} column definitions but the input sheet only has {} columns",
                        definitions.len(),
                        sheet.number_of_columns()
                    ),
                    context.property_anchor("columns"),
                ));
            }
            Self::entries_without_header(&definitions)
        };

        let rows = sheet.number_of_rows().saturating_sub(usize::from(header));
        logger.log_debug(format!(
            "Validating {} row(s) according to the column types",
            rows
        ));
        let table = Self::construct_table(&sheet, header, &entries, context)?;
        logger.log_debug(format!(
            "Validation completed, the resulting table has {} row(s) and {} column(s)",
            table.num_rows(),
            table.num_columns()
        ));
        Ok(IoValue::Table(table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{
        BlockDefinition, ConstraintDefinition, Expression, PipelineDefinition,
    };
    use crate::config::RunConfig;
    use crate::execution::{ExecutorRegistry, StackNode};
    use crate::value_type::{AtomicValueType, Backend};
    use pretty_assertions::assert_eq;

    fn sheet(rows: &[&[&str]]) -> Sheet {
        Sheet::from_rows(
            rows.iter()
                .map(|row| row.iter().map(|cell| cell.to_string()).collect::<Vec<String>>())
                .collect::<Vec<Vec<String>>>(),
        )
    }

    fn context(block: BlockDefinition, backend: Backend) -> ExecutionContext {
        let block = Arc::new(block);
        let config = RunConfig {
            backend,
            ..RunConfig::default()
        };
        ExecutionContext::new(
            Arc::new(PipelineDefinition::new("Interpreting")),
            Arc::new(config),
            Arc::new(ExecutorRegistry::with_standard_executors()),
        )
        .enter_node(StackNode::Block(block))
    }

    fn interpreter(columns: Vec<Expression>) -> BlockDefinition {
        BlockDefinition::new("Interpreter", "TableInterpreter")
            .with_property("columns", Expression::collection(columns))
    }

    async fn run(block: BlockDefinition, backend: Backend, input: Sheet) -> ExecutionResult<Table> {
        let context = context(block, backend);
        match TableInterpreterExecutor::new()
            .execute(IoValue::Sheet(input), &context)
            .await?
        {
            IoValue::Table(table) => Ok(table),
            other => panic!("expected a table, got {}", other),
        }
    }

    #[tokio::test]
    async fn test_header_matching_and_row_dropping() {
        let input = sheet(&[
            &["name", "unused", "age"],
            &["Ann", "x", "30"],
            &["Bo", "y", "old"],
            &["Cy", "z", "41"],
        ]);
        let block = interpreter(vec![
            Expression::column("name", ValueType::TEXT),
            Expression::column("age", ValueType::INTEGER),
            Expression::column("missing", ValueType::TEXT),
        ]);
        for backend in [Backend::Array, Backend::Columnar] {
            let table = run(block.clone(), backend, input.clone()).await.unwrap();
            assert_eq!(table.backend(), backend);
            assert_eq!(table.column_names(), vec!["name", "age"]);
            assert_eq!(table.num_rows(), 2);
            assert_eq!(table.cell(1, 1), Some(InternalValue::Integer(41)));
        }
    }

    #[tokio::test]
    async fn test_without_header_uses_positions() {
        let block = interpreter(vec![Expression::column("value", ValueType::DECIMAL)])
            .with_property("header", Expression::boolean(false));
        let table = run(block, Backend::Array, sheet(&[&["1,5"], &["2"]]))
            .await
            .unwrap();
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.cell(0, 0), Some(InternalValue::Decimal(1.5)));
        assert_eq!(table.cell(1, 0), Some(InternalValue::Decimal(2.0)));
    }

    #[tokio::test]
    async fn test_empty_sheet_with_header_fails_at_header() {
        let error = run(interpreter(vec![]), Backend::Array, Sheet::default())
            .await
            .unwrap_err();
        assert!(error
            .to_string()
            .starts_with("The input sheet is empty and thus has no header"));
        assert_eq!(error.anchor().unwrap().property.as_deref(), Some("header"));
    }

    #[tokio::test]
    async fn test_too_few_sheet_columns() {
        let block = interpreter(vec![
            Expression::column("a", ValueType::TEXT),
            Expression::column("b", ValueType::TEXT),
        ])
        .with_property("header", Expression::boolean(false));
        let error = run(block, Backend::Columnar, sheet(&[&["only"]]))
            .await
            .unwrap_err();
        assert!(error
            .to_string()
            .starts_with("There are 2 column definitions but the input sheet only has 1 columns"));
        assert_eq!(error.anchor().unwrap().property.as_deref(), Some("columns"));
    }

    #[tokio::test]
    async fn test_constraints_drop_rows_on_both_backends() {
        let positive = ValueType::Atomic(Arc::new(AtomicValueType::new(
            "Positive",
            ValueType::INTEGER,
            vec![Arc::new(ConstraintDefinition::expression(
                "IsPositive",
                Expression::binary(
                    crate::ast::BinaryOperator::GreaterThan,
                    Expression::variable("value"),
                    Expression::integer(0),
                ),
            ))],
        )));
        let block = interpreter(vec![Expression::column("n", positive)]);
        let input = sheet(&[&["n"], &["3"], &["-1"], &["0"], &["8"]]);
        for backend in [Backend::Array, Backend::Columnar] {
            let table = run(block.clone(), backend, input.clone()).await.unwrap();
            assert_eq!(table.num_rows(), 2, "{:?}", backend);
            assert_eq!(table.cell(1, 0), Some(InternalValue::Integer(8)));
        }
    }
}
