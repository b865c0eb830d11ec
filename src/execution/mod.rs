//! Pipeline Execution
//!
//! # Core Components
//!
//! ## Execution Context
//! One per pipeline run. Tracks the AST node currently being executed as a
//! persistent stack: entering a node returns a child context, and the parent
//! is untouched, so leaving a node is simply dropping the child. Resolves
//! block and constraint properties through the expression evaluator, falling
//! back to the declared defaults.
//!
//! ## Block Executors
//! [`BlockExecutor`] implementations consume one [`IoValue`](crate::table::IoValue)
//! and produce another. They are looked up by block type in the
//! [`ExecutorRegistry`], which also holds the typed constraint executors.
//!
//! ## Runner
//! Orders the blocks of a pipeline topologically, checks that connected
//! blocks agree on their I/O types and runs them one after another, stopping
//! at the first failure.

pub mod block;
pub mod constraint;
pub mod context;
pub mod debug;
pub mod logger;
pub mod meta;
pub mod runner;
pub mod transform;

use thiserror::Error;

use crate::diagnostic::DiagnosticAnchor;
use crate::eval::ColumnExprError;
use crate::table::{IoType, TableError};

pub use block::{BlockExecutor, ExecutorRegistry};
pub use constraint::{is_valid_value, ConstraintExecutor};
pub use context::{ExecutionContext, StackNode};
pub use debug::{DebugGranularity, DebugTargets};
pub use logger::Logger;
pub use meta::{BlockMeta, ConstraintMeta, PropertySpec};
pub use runner::{run_pipeline, ExitCode};
pub use transform::{TransformExecutor, TransformOutput};

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("{message} ({anchor})")]
    Block {
        message: String,
        anchor: DiagnosticAnchor,
    },
    #[error("Unknown block type `{block_type}` used by block `{block}`")]
    UnknownBlockType { block: String, block_type: String },
    #[error("Pipe references unknown block `{0}`")]
    UnknownBlock(String),
    #[error("Block `{block}` has {count} inputs, at most one is allowed")]
    MultipleInputs { block: String, count: usize },
    #[error("Pipeline `{0}` contains a cycle")]
    Cycle(String),
    #[error("Block `{to}` expects {expected} input but `{from}` produces {actual}")]
    IoMismatch {
        from: String,
        to: String,
        expected: IoType,
        actual: IoType,
    },
    #[error("Table error: {0}")]
    Table(#[from] TableError),
    #[error("Column expression error: {0}")]
    ColumnExpr(#[from] ColumnExprError),
}

pub type ExecutionResult<T> = Result<T, ExecutionError>;

impl ExecutionError {
    pub fn block(message: impl Into<String>, anchor: DiagnosticAnchor) -> Self {
        Self::Block {
            message: message.into(),
            anchor,
        }
    }

    pub fn anchor(&self) -> Option<&DiagnosticAnchor> {
        match self {
            Self::Block { anchor, .. } => Some(anchor),
            _ => None,
        }
    }
}
