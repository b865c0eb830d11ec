//! Standard Table Blocks
//!
//! Block executors that ship with the runtime and need no connector:
//!
//! - [`TableInterpreterExecutor`] turns a [`Sheet`](crate::table::Sheet) of
//!   raw strings into a typed table, dropping rows that do not parse.
//! - [`TableTransformerExecutor`] applies a transform to table columns and
//!   writes the result into an output column.
//!
//! Both build tables for the backend selected by the run configuration.

pub mod table_interpreter;
pub mod table_transformer;

pub use table_interpreter::{ColumnDefinitionEntry, TableInterpreterExecutor};
pub use table_transformer::TableTransformerExecutor;
