use crate::value_type::{Backend, InternalValue, ValueType};

use super::{TableError, TableResult, TableRow, Tabular};

/// A named column backed by a `Vec`. Every stored value is a valid
/// representation of `value_type`.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayColumn {
    name: String,
    value_type: ValueType,
    values: Vec<InternalValue>,
}

impl ArrayColumn {
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            values: Vec::new(),
        }
    }

    /// Builds a column from `values`, normalising each one.
    pub fn from_values(
        name: impl Into<String>,
        value_type: ValueType,
        values: impl IntoIterator<Item = InternalValue>,
    ) -> TableResult<Self> {
        let mut column = Self::new(name, value_type);
        for value in values {
            column.push(value)?;
        }
        Ok(column)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn value_type(&self) -> &ValueType {
        &self.value_type
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[InternalValue] {
        &self.values
    }

    pub fn nth(&self, index: usize) -> Option<&InternalValue> {
        self.values.get(index)
    }

    /// Normalises `value` for this column's type and appends it.
    pub fn push(&mut self, value: InternalValue) -> TableResult<()> {
        let value = self.value_type.normalize(value);
        if !self.value_type.is_internal_value_representation(&value) {
            return Err(TableError::InvalidValue {
                column: self.name.clone(),
                value_type: self.value_type.name(),
                value: value.to_string(),
            });
        }
        self.values.push(value);
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Option<InternalValue> {
        (index < self.values.len()).then(|| self.values.remove(index))
    }
}

/// Row-oriented in-process table. Columns keep insertion order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ArrayTable {
    num_rows: usize,
    columns: Vec<ArrayColumn>,
}

impl ArrayTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_columns(columns: Vec<ArrayColumn>) -> TableResult<Self> {
        let mut table = Self::new();
        for column in columns {
            table.add_column(column)?;
        }
        Ok(table)
    }

    pub fn backend(&self) -> Backend {
        Backend::Array
    }

    pub fn columns(&self) -> &[ArrayColumn] {
        &self.columns
    }

    pub fn get_column(&self, name: &str) -> Option<&ArrayColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Adds `column`, replacing a same-named column at its position. The first
    /// column of an empty table sets the row count.
    pub fn add_column(&mut self, column: ArrayColumn) -> TableResult<()> {
        let replacing = self.position(&column.name);
        let sole_column = self.columns.is_empty()
            || (self.columns.len() == 1 && replacing.is_some());
        if sole_column {
            self.num_rows = column.len();
        } else if column.len() != self.num_rows {
            let actual = column.len();
            return Err(TableError::ColumnLength {
                column: column.name,
                expected: self.num_rows,
                actual,
            });
        }
        match replacing {
            Some(index) => self.columns[index] = column,
            None => self.columns.push(column),
        }
        Ok(())
    }

    /// Copy of this table with `column` added or replaced.
    pub fn with_column(&self, column: ArrayColumn) -> TableResult<Self> {
        let mut table = self.clone();
        table.add_column(column)?;
        Ok(table)
    }

    /// Appends one row. The row must hold exactly one valid value per column;
    /// on failure the table is left unchanged. Rows are ignored while the
    /// table has no columns.
    pub fn add_row(&mut self, row: TableRow) -> TableResult<()> {
        if self.columns.is_empty() {
            return Ok(());
        }
        if row.len() != self.columns.len() {
            return Err(TableError::RowDimension {
                expected: self.columns.len(),
                actual: row.len(),
            });
        }
        let mut cells = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            let value = row
                .get(&column.name)
                .ok_or_else(|| TableError::MissingCell(column.name.clone()))?;
            let value = column.value_type.normalize(value.clone());
            if !column.value_type.is_internal_value_representation(&value) {
                return Err(TableError::InvalidValue {
                    column: column.name.clone(),
                    value_type: column.value_type.name(),
                    value: value.to_string(),
                });
            }
            cells.push(value);
        }
        for (column, value) in self.columns.iter_mut().zip(cells) {
            column.values.push(value);
        }
        self.num_rows += 1;
        Ok(())
    }

    pub fn drop_row(&mut self, row: usize) -> TableResult<()> {
        if row >= self.num_rows {
            return Err(TableError::RowOutOfBounds {
                row,
                rows: self.num_rows,
            });
        }
        for column in &mut self.columns {
            column.values.remove(row);
        }
        self.num_rows -= 1;
        Ok(())
    }

    /// Drops every listed row. Order and duplicates in `rows` do not matter.
    pub fn drop_rows(&mut self, rows: &[usize]) -> TableResult<()> {
        let mut rows = rows.to_vec();
        rows.sort_unstable_by(|a, b| b.cmp(a));
        rows.dedup();
        if let Some(&highest) = rows.first() {
            if highest >= self.num_rows {
                return Err(TableError::RowOutOfBounds {
                    row: highest,
                    rows: self.num_rows,
                });
            }
        }
        for row in rows {
            self.drop_row(row)?;
        }
        Ok(())
    }

    pub fn get_row(&self, row: usize) -> TableResult<TableRow> {
        if row >= self.num_rows {
            return Err(TableError::RowOutOfBounds {
                row,
                rows: self.num_rows,
            });
        }
        Ok(self
            .columns
            .iter()
            .map(|c| (c.name.clone(), c.values[row].clone()))
            .collect())
    }
}

impl Tabular for ArrayTable {
    fn num_rows(&self) -> usize {
        self.num_rows
    }

    fn num_columns(&self) -> usize {
        self.columns.len()
    }

    fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    fn column_value_type(&self, name: &str) -> Option<ValueType> {
        self.get_column(name).map(|c| c.value_type.clone())
    }

    fn cell(&self, row: usize, column: usize) -> Option<InternalValue> {
        self.columns.get(column)?.values.get(row).cloned()
    }

    fn has_column(&self, name: &str) -> bool {
        self.position(name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::value_type::AtomicValueType;

    fn abc() -> ArrayTable {
        ArrayTable::from_columns(vec![
            ArrayColumn::from_values("a", ValueType::INTEGER, [1i64, 2, 3].map(Into::into))
                .unwrap(),
            ArrayColumn::from_values("b", ValueType::TEXT, ["x", "y", "z"].map(Into::into))
                .unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn test_drop_rows_in_any_order() {
        let mut table = abc();
        table.drop_rows(&[0, 2]).unwrap();
        assert_eq!(table.num_rows(), 1);
        assert_eq!(table.get_column("a").unwrap().values(), &[InternalValue::Integer(2)]);
        assert_eq!(table.get_column("b").unwrap().values(), &[InternalValue::text("y")]);

        let mut table = abc();
        table.drop_rows(&[2, 0, 2]).unwrap();
        assert_eq!(table.get_row(0).unwrap()["b"], InternalValue::text("y"));
    }

    #[test]
    fn test_drop_rows_out_of_bounds_leaves_table_intact() {
        let mut table = abc();
        assert!(matches!(
            table.drop_rows(&[1, 3]),
            Err(TableError::RowOutOfBounds { row: 3, rows: 3 })
        ));
        assert_eq!(table.num_rows(), 3);
    }

    #[test]
    fn test_add_row_checks_dimension_and_types() {
        let mut table = abc();
        let mut row = TableRow::new();
        row.insert("a".to_string(), InternalValue::Integer(4));
        assert!(matches!(
            table.add_row(row.clone()),
            Err(TableError::RowDimension { expected: 2, actual: 1 })
        ));
        row.insert("b".to_string(), InternalValue::Integer(5));
        assert!(matches!(table.add_row(row.clone()), Err(TableError::InvalidValue { .. })));
        assert_eq!(table.num_rows(), 3);
        assert_eq!(table.get_column("a").unwrap().len(), 3);

        row.insert("b".to_string(), InternalValue::text("w"));
        table.add_row(row).unwrap();
        assert_eq!(table.num_rows(), 4);
        assert_eq!(table.cell(3, 1), Some(InternalValue::text("w")));
    }

    #[test]
    fn test_add_row_without_columns_is_ignored() {
        let mut table = ArrayTable::new();
        let mut row = TableRow::new();
        row.insert("a".to_string(), InternalValue::Integer(1));
        table.add_row(row).unwrap();
        assert_eq!(table.num_rows(), 0);
    }

    #[test]
    fn test_push_normalises_values() {
        let mut column = ArrayColumn::new("d", ValueType::DECIMAL);
        column.push(InternalValue::Integer(2)).unwrap();
        assert_eq!(column.values(), &[InternalValue::Decimal(2.0)]);

        let mut column = ArrayColumn::new("i", ValueType::INTEGER);
        column.push(InternalValue::Decimal(3.0)).unwrap();
        assert!(column.push(InternalValue::Decimal(3.5)).is_err());
        assert_eq!(column.values(), &[InternalValue::Integer(3)]);
    }

    #[test]
    fn test_add_column_replaces_in_place_and_checks_length() {
        let mut table = abc();
        let replacement =
            ArrayColumn::from_values("a", ValueType::DECIMAL, [1.5f64, 2.5, 3.5].map(Into::into))
                .unwrap();
        table.add_column(replacement).unwrap();
        assert_eq!(table.column_names(), vec!["a", "b"]);
        assert_eq!(table.column_value_type("a"), Some(ValueType::DECIMAL));

        let short = ArrayColumn::from_values("c", ValueType::TEXT, ["q".into()]).unwrap();
        match table.add_column(short) {
            Err(TableError::ColumnLength {
                column,
                expected,
                actual,
            }) => assert_eq!((column.as_str(), expected, actual), ("c", 3, 1)),
            other => panic!("expected a length error, got {:?}", other),
        }
    }

    #[test]
    fn test_with_column_leaves_original_untouched() {
        let table = abc();
        let flags =
            ArrayColumn::from_values("c", ValueType::BOOLEAN, [true, false, true].map(Into::into))
                .unwrap();
        let wider = table.with_column(flags).unwrap();
        assert_eq!(wider.num_columns(), 3);
        assert_eq!(table.num_columns(), 2);
    }

    #[test]
    fn test_clone_copies_values_and_keeps_type_identity() {
        let percent = ValueType::Atomic(Arc::new(AtomicValueType::new(
            "Percent",
            ValueType::DECIMAL,
            vec![],
        )));
        let mut table = ArrayTable::from_columns(vec![ArrayColumn::from_values(
            "p",
            percent.clone(),
            [0.5f64.into()],
        )
        .unwrap()])
        .unwrap();
        let copy = table.clone();
        table.drop_row(0).unwrap();
        assert_eq!(copy.num_rows(), 1);
        assert_eq!(copy.column_value_type("p"), Some(percent));
        assert_eq!(copy.clone(), copy);
    }
}
