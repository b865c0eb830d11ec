//! Tables
//!
//! A rectangular dataset of named, typed columns with two physical backends:
//!
//! - [`ArrayTable`]: every column is an in-process `Vec` of values. Mutated in
//!   place; cloning copies every value.
//! - [`ColumnarTable`]: an Arrow `RecordBatch`. Updates produce a new batch;
//!   column types are derived from the Arrow data types.
//!
//! Both implement [`Tabular`], the row/cell view that the SQL statement
//! generators and the debug printer are written against, so the same table
//! yields the same statements on either backend. Callers hold a [`Table`] and
//! either match on it or go through a [`TableVisitor`].

pub mod array;
pub mod columnar;
pub mod io;
pub mod sql;

use std::collections::HashMap;

use arrow::error::ArrowError;
use thiserror::Error;

use crate::value_type::{Backend, InternalValue, ValueType, ValueTypeError};

pub use array::{ArrayColumn, ArrayTable};
pub use columnar::{ColumnarColumn, ColumnarTable};
pub use io::{FileValue, IoType, IoValue, Sheet};
pub use sql::generate_drop_table_statement;

#[derive(Error, Debug)]
pub enum TableError {
    #[error("Column `{column}` has {actual} values, expected {expected}")]
    ColumnLength {
        column: String,
        expected: usize,
        actual: usize,
    },
    #[error("Row has {actual} values, table has {expected} columns")]
    RowDimension { expected: usize, actual: usize },
    #[error("Row is missing a value for column `{0}`")]
    MissingCell(String),
    #[error("Unknown column `{0}`")]
    UnknownColumn(String),
    #[error("Row {row} is out of bounds for a table with {rows} rows")]
    RowOutOfBounds { row: usize, rows: usize },
    #[error("Value {value} is not a valid {value_type} for column `{column}`")]
    InvalidValue {
        column: String,
        value_type: String,
        value: String,
    },
    #[error("Column `{column}` of type {value_type} has no SQL representation")]
    NoSqlRepresentation { column: String, value_type: String },
    #[error("Cannot combine a {table} table with a {column} column")]
    BackendMismatch { table: Backend, column: Backend },
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),
    #[error("Value type error: {0}")]
    ValueType(#[from] ValueTypeError),
}

pub type TableResult<T> = Result<T, TableError>;

/// One row keyed by column name.
pub type TableRow = HashMap<String, InternalValue>;

/// Read access shared by both backends.
pub trait Tabular {
    fn num_rows(&self) -> usize;

    fn num_columns(&self) -> usize;

    /// Column names in insertion order.
    fn column_names(&self) -> Vec<String>;

    fn column_value_type(&self, name: &str) -> Option<ValueType>;

    /// Value at `row` of the column at position `column`; `None` for nulls
    /// and out-of-range positions.
    fn cell(&self, row: usize, column: usize) -> Option<InternalValue>;

    fn has_column(&self, name: &str) -> bool {
        self.column_names().iter().any(|c| c == name)
    }

    fn column_value_types(&self) -> Vec<(String, ValueType)> {
        self.column_names()
            .into_iter()
            .filter_map(|name| {
                let value_type = self.column_value_type(&name)?;
                Some((name, value_type))
            })
            .collect()
    }

    fn row(&self, row: usize) -> Vec<Option<InternalValue>> {
        (0..self.num_columns()).map(|c| self.cell(row, c)).collect()
    }

    fn generate_create_table_statement(&self, table_name: &str) -> TableResult<String> {
        sql::generate_create_table_statement(self, table_name)
    }

    fn generate_insert_values_statement(&self, table_name: &str) -> TableResult<String> {
        sql::generate_insert_values_statement(self, table_name)
    }
}

pub trait TableVisitor {
    type Output;

    fn visit_array_table(&mut self, table: &ArrayTable) -> Self::Output;
    fn visit_columnar_table(&mut self, table: &ColumnarTable) -> Self::Output;
}

/// Borrowed view of one column.
#[derive(Debug, Clone)]
pub enum TableColumn<'a> {
    Array(&'a ArrayColumn),
    Columnar(ColumnarColumn),
}

impl TableColumn<'_> {
    pub fn name(&self) -> &str {
        match self {
            Self::Array(column) => column.name(),
            Self::Columnar(column) => column.name(),
        }
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Array(column) => column.value_type().clone(),
            Self::Columnar(column) => column.value_type(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Array(column) => column.len(),
            Self::Columnar(column) => column.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn nth(&self, index: usize) -> Option<InternalValue> {
        match self {
            Self::Array(column) => column.nth(index).cloned(),
            Self::Columnar(column) => column.nth(index),
        }
    }

    pub fn values(&self) -> Vec<Option<InternalValue>> {
        (0..self.len()).map(|i| self.nth(i)).collect()
    }
}

/// An owned column, backend-specific.
#[derive(Debug, Clone)]
pub enum Column {
    Array(ArrayColumn),
    Columnar(ColumnarColumn),
}

impl Column {
    pub fn backend(&self) -> Backend {
        match self {
            Self::Array(_) => Backend::Array,
            Self::Columnar(_) => Backend::Columnar,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Table {
    Array(ArrayTable),
    Columnar(ColumnarTable),
}

impl Table {
    pub fn backend(&self) -> Backend {
        match self {
            Self::Array(_) => Backend::Array,
            Self::Columnar(_) => Backend::Columnar,
        }
    }

    pub fn accept_visitor<V: TableVisitor>(&self, visitor: &mut V) -> V::Output {
        match self {
            Self::Array(table) => visitor.visit_array_table(table),
            Self::Columnar(table) => visitor.visit_columnar_table(table),
        }
    }

    pub fn get_column(&self, name: &str) -> Option<TableColumn<'_>> {
        match self {
            Self::Array(table) => table.get_column(name).map(TableColumn::Array),
            Self::Columnar(table) => table.get_column(name).map(TableColumn::Columnar),
        }
    }

    /// Returns a table with `column` added, replacing a same-named column in
    /// place.
    pub fn with_column(&self, column: Column) -> TableResult<Table> {
        match (self, column) {
            (Self::Array(table), Column::Array(column)) => {
                table.with_column(column).map(Table::Array)
            }
            (Self::Columnar(table), Column::Columnar(column)) => {
                table.with_column(column).map(Table::Columnar)
            }
            (table, column) => Err(TableError::BackendMismatch {
                table: table.backend(),
                column: column.backend(),
            }),
        }
    }

    pub fn drop_rows(&mut self, rows: &[usize]) -> TableResult<()> {
        match self {
            Self::Array(table) => table.drop_rows(rows),
            Self::Columnar(table) => table.drop_rows(rows),
        }
    }

    fn tabular(&self) -> &dyn Tabular {
        match self {
            Self::Array(table) => table,
            Self::Columnar(table) => table,
        }
    }
}

impl Tabular for Table {
    fn num_rows(&self) -> usize {
        self.tabular().num_rows()
    }

    fn num_columns(&self) -> usize {
        self.tabular().num_columns()
    }

    fn column_names(&self) -> Vec<String> {
        self.tabular().column_names()
    }

    fn column_value_type(&self, name: &str) -> Option<ValueType> {
        self.tabular().column_value_type(name)
    }

    fn cell(&self, row: usize, column: usize) -> Option<InternalValue> {
        self.tabular().cell(row, column)
    }
}

/// Builds tables for the active backend from row-wise parsed columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TableFactory {
    backend: Backend,
}

impl TableFactory {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn empty(&self) -> Table {
        match self.backend {
            Backend::Array => Table::Array(ArrayTable::new()),
            Backend::Columnar => Table::Columnar(ColumnarTable::empty()),
        }
    }

    /// All columns must have the same length.
    pub fn from_columns(&self, columns: Vec<ArrayColumn>) -> TableResult<Table> {
        match self.backend {
            Backend::Array => ArrayTable::from_columns(columns).map(Table::Array),
            Backend::Columnar => ColumnarTable::from_array_columns(&columns).map(Table::Columnar),
        }
    }
}
