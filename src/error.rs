use thiserror::Error;

use crate::config::ConfigError;
use crate::eval::ColumnExprError;
use crate::execution::ExecutionError;
use crate::table::TableError;
use crate::value_type::ValueTypeError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Value type error: {0}")]
    ValueType(#[from] ValueTypeError),
    #[error("Table error: {0}")]
    Table(#[from] TableError),
    #[error("Column expression error: {0}")]
    ColumnExpr(#[from] ColumnExprError),
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    // task join failures and other broken invariants
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type InternalResult<T> = Result<T, Error>;

impl Error {
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Error::Internal(message.into())
    }
}
