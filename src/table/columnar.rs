use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray,
};
use arrow::compute::{cast, filter_record_batch};
use arrow::datatypes::{DataType, Field, FieldRef, Schema};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};

use crate::value_type::{Backend, InternalValue, ValueType, ValueTypeProvider};

use super::{ArrayColumn, TableError, TableResult, Tabular};

const PROVIDER: ValueTypeProvider = ValueTypeProvider::new(Backend::Columnar);

/// A column of a [`ColumnarTable`]: an Arrow field and its array. The value
/// type is derived from the Arrow data type.
#[derive(Debug, Clone)]
pub struct ColumnarColumn {
    field: FieldRef,
    array: ArrayRef,
}

impl ColumnarColumn {
    pub fn new(name: impl Into<String>, array: ArrayRef) -> Self {
        let field = Field::new(name, array.data_type().clone(), true);
        Self {
            field: Arc::new(field),
            array,
        }
    }

    /// Builds an Arrow array of `value_type`'s mapped type from `values`.
    pub fn from_values(
        name: impl Into<String>,
        value_type: &ValueType,
        values: &[Option<InternalValue>],
    ) -> Self {
        let array = build_array(&PROVIDER.arrow_type_or_text(value_type), values);
        Self::new(name, array)
    }

    pub fn name(&self) -> &str {
        self.field.name()
    }

    pub fn array(&self) -> &ArrayRef {
        &self.array
    }

    pub fn data_type(&self) -> &DataType {
        self.array.data_type()
    }

    pub fn value_type(&self) -> ValueType {
        PROVIDER
            .value_type_of_arrow(self.array.data_type())
            .unwrap_or_else(|e| {
                tracing::error!("{}; reading column `{}` as text", e, self.name());
                ValueType::TEXT
            })
    }

    pub fn len(&self) -> usize {
        self.array.len()
    }

    pub fn is_empty(&self) -> bool {
        self.array.is_empty()
    }

    pub fn null_count(&self) -> usize {
        self.array.null_count()
    }

    pub fn nth(&self, index: usize) -> Option<InternalValue> {
        cell_value(self.array.as_ref(), index)
    }
}

fn build_array(data_type: &DataType, values: &[Option<InternalValue>]) -> ArrayRef {
    match data_type {
        DataType::Boolean => Arc::new(
            values
                .iter()
                .map(|v| v.as_ref().and_then(InternalValue::as_bool))
                .collect::<BooleanArray>(),
        ),
        DataType::Int64 => Arc::new(
            values
                .iter()
                .map(|v| v.as_ref().and_then(InternalValue::as_i64))
                .collect::<Int64Array>(),
        ),
        DataType::Float64 => Arc::new(
            values
                .iter()
                .map(|v| v.as_ref().and_then(InternalValue::as_f64))
                .collect::<Float64Array>(),
        ),
        _ => Arc::new(
            values
                .iter()
                .map(|v| v.as_ref().map(ToString::to_string))
                .collect::<StringArray>(),
        ),
    }
}

/// Reads one cell. Types outside the four mapped ones are cast to the
/// mapped type first.
pub(crate) fn cell_value(array: &dyn Array, index: usize) -> Option<InternalValue> {
    if index >= array.len() || array.is_null(index) {
        return None;
    }
    let any = array.as_any();
    match array.data_type() {
        DataType::Boolean => any
            .downcast_ref::<BooleanArray>()
            .map(|a| InternalValue::Boolean(a.value(index))),
        DataType::Int64 => any
            .downcast_ref::<Int64Array>()
            .map(|a| InternalValue::Integer(a.value(index))),
        DataType::Float64 => any
            .downcast_ref::<Float64Array>()
            .map(|a| InternalValue::Decimal(a.value(index))),
        DataType::Utf8 => any
            .downcast_ref::<StringArray>()
            .map(|a| InternalValue::Text(a.value(index).to_string())),
        other => {
            let target = PROVIDER
                .value_type_of_arrow(other)
                .and_then(|value_type| PROVIDER.arrow_type_of(&value_type))
                .ok()?;
            let single = cast(&array.slice(index, 1), &target).ok()?;
            cell_value(single.as_ref(), 0)
        }
    }
}

/// Columnar table over an Arrow `RecordBatch`. Updates build a new batch;
/// cloning shares the immutable buffers.
#[derive(Debug, Clone)]
pub struct ColumnarTable {
    batch: RecordBatch,
}

impl ColumnarTable {
    pub fn empty() -> Self {
        Self {
            batch: RecordBatch::new_empty(Arc::new(Schema::empty())),
        }
    }

    pub fn from_batch(batch: RecordBatch) -> Self {
        Self { batch }
    }

    pub fn from_columns(columns: Vec<ColumnarColumn>) -> TableResult<Self> {
        let Some(first) = columns.first() else {
            return Ok(Self::empty());
        };
        let num_rows = first.len();
        if let Some(column) = columns.iter().find(|c| c.len() != num_rows) {
            return Err(TableError::ColumnLength {
                column: column.name().to_string(),
                expected: num_rows,
                actual: column.len(),
            });
        }
        let (fields, arrays): (Vec<FieldRef>, Vec<ArrayRef>) =
            columns.into_iter().map(|c| (c.field, c.array)).unzip();
        let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?;
        Ok(Self { batch })
    }

    pub fn from_array_columns(columns: &[ArrayColumn]) -> TableResult<Self> {
        Self::from_columns(
            columns
                .iter()
                .map(|column| {
                    let values: Vec<Option<InternalValue>> =
                        column.values().iter().cloned().map(Some).collect();
                    ColumnarColumn::from_values(column.name(), column.value_type(), &values)
                })
                .collect(),
        )
    }

    pub fn backend(&self) -> Backend {
        Backend::Columnar
    }

    pub fn record_batch(&self) -> &RecordBatch {
        &self.batch
    }

    pub fn get_column(&self, name: &str) -> Option<ColumnarColumn> {
        let index = self.batch.schema().index_of(name).ok()?;
        Some(self.column_at(index))
    }

    fn column_at(&self, index: usize) -> ColumnarColumn {
        ColumnarColumn {
            field: self.batch.schema().fields()[index].clone(),
            array: self.batch.column(index).clone(),
        }
    }

    pub fn columns(&self) -> Vec<ColumnarColumn> {
        (0..self.batch.num_columns()).map(|i| self.column_at(i)).collect()
    }

    /// New table with `column` appended, or replacing a same-named column at
    /// its position.
    pub fn with_column(&self, column: ColumnarColumn) -> TableResult<Self> {
        let mut columns = self.columns();
        let replacing = columns.iter().position(|c| c.name() == column.name());
        let sole_column = columns.is_empty() || (columns.len() == 1 && replacing.is_some());
        if !sole_column && column.len() != self.batch.num_rows() {
            return Err(TableError::ColumnLength {
                column: column.name().to_string(),
                expected: self.batch.num_rows(),
                actual: column.len(),
            });
        }
        match replacing {
            Some(index) => columns[index] = column,
            None => columns.push(column),
        }
        Self::from_columns(columns)
    }

    /// Keeps the rows where `mask` is true.
    pub fn filter(&self, mask: &BooleanArray) -> TableResult<Self> {
        if self.batch.num_columns() == 0 {
            let kept = mask.true_count();
            let options = RecordBatchOptions::new().with_row_count(Some(kept));
            let batch =
                RecordBatch::try_new_with_options(self.batch.schema(), vec![], &options)?;
            return Ok(Self { batch });
        }
        Ok(Self {
            batch: filter_record_batch(&self.batch, mask)?,
        })
    }

    /// Drops every listed row. Order and duplicates in `rows` do not matter.
    pub fn drop_rows(&mut self, rows: &[usize]) -> TableResult<()> {
        let num_rows = self.batch.num_rows();
        let mut keep = vec![true; num_rows];
        for &row in rows {
            let slot = keep.get_mut(row).ok_or(TableError::RowOutOfBounds {
                row,
                rows: num_rows,
            })?;
            *slot = false;
        }
        *self = self.filter(&BooleanArray::from(keep))?;
        Ok(())
    }
}

impl Tabular for ColumnarTable {
    fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    fn num_columns(&self) -> usize {
        self.batch.num_columns()
    }

    fn column_names(&self) -> Vec<String> {
        self.batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect()
    }

    fn column_value_type(&self, name: &str) -> Option<ValueType> {
        self.get_column(name).map(|c| c.value_type())
    }

    fn cell(&self, row: usize, column: usize) -> Option<InternalValue> {
        if column >= self.batch.num_columns() {
            return None;
        }
        cell_value(self.batch.column(column).as_ref(), row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Int32Array;

    fn abc() -> ColumnarTable {
        ColumnarTable::from_array_columns(&[
            ArrayColumn::from_values("a", ValueType::INTEGER, [1i64, 2, 3].map(Into::into))
                .unwrap(),
            ArrayColumn::from_values("b", ValueType::TEXT, ["x", "y", "z"].map(Into::into))
                .unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn test_drop_rows() {
        let mut table = abc();
        table.drop_rows(&[2, 0]).unwrap();
        assert_eq!(table.num_rows(), 1);
        assert_eq!(
            table.row(0),
            vec![Some(InternalValue::Integer(2)), Some(InternalValue::text("y"))]
        );
        assert!(matches!(
            table.drop_rows(&[5]),
            Err(TableError::RowOutOfBounds { row: 5, rows: 1 })
        ));
    }

    #[test]
    fn test_with_column_is_functional() {
        let table = abc();
        let flags = ColumnarColumn::from_values(
            "c",
            &ValueType::BOOLEAN,
            &[Some(true.into()), None, Some(false.into())],
        );
        let wider = table.with_column(flags).unwrap();
        assert_eq!(table.num_columns(), 2);
        assert_eq!(wider.column_names(), vec!["a", "b", "c"]);
        assert_eq!(wider.cell(1, 2), None);
        assert_eq!(wider.get_column("c").unwrap().null_count(), 1);

        let short = ColumnarColumn::from_values("d", &ValueType::TEXT, &[Some("q".into())]);
        assert!(matches!(
            table.with_column(short),
            Err(TableError::ColumnLength { expected: 3, actual: 1, .. })
        ));
    }

    #[test]
    fn test_types_come_from_arrow() {
        let table = abc();
        assert_eq!(table.column_value_type("a"), Some(ValueType::INTEGER));
        assert_eq!(table.column_value_type("b"), Some(ValueType::TEXT));

        let narrow = ColumnarColumn::new("n", Arc::new(Int32Array::from(vec![7, 8, 9])));
        let table = table.with_column(narrow).unwrap();
        assert_eq!(table.column_value_type("n"), Some(ValueType::INTEGER));
        assert_eq!(table.cell(1, 2), Some(InternalValue::Integer(8)));
    }

    #[test]
    fn test_empty_table_adopts_first_column_length() {
        let table = ColumnarTable::empty();
        assert_eq!(table.num_rows(), 0);
        let column = ColumnarColumn::from_values(
            "x",
            &ValueType::DECIMAL,
            &[Some(1.5.into()), Some(2i64.into())],
        );
        let table = table.with_column(column).unwrap();
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.cell(1, 0), Some(InternalValue::Decimal(2.0)));
    }
}
