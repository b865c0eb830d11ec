//! # pipewright: Runtime for a Declarative Data Pipeline Language
//!
//! pipewright executes pipelines of blocks connected by pipes. Blocks are
//! configured through typed properties whose values are expressions; tables
//! flow from block to block and are reshaped by transforms.
//!
//! ## Technical Foundations
//!
//! ### 1. Value Types
//! Every value carries a value type ([`value_type`]): primitives, atomic
//! types refining a supertype with constraints, and collections. Raw sheet
//! cells and runtime parameters are parsed with the type they are read as.
//!
//! ### 2. Expression Evaluation
//! The [`eval`] module evaluates operator expressions either eagerly, one row
//! at a time, or symbolically over whole columns. Domain errors (division by
//! zero, malformed literals) produce no value plus a diagnostic
//! ([`diagnostic`]); they never panic.
//!
//! ### 3. Dual Table Backend
//! Tables ([`table`]) come in an array-backed flavour that stores one value
//! per cell and a columnar flavour backed by Arrow record batches. Both
//! produce the same rows for the same pipeline.
//!
//! ### 4. Execution
//! The [`execution`] module tracks the AST node being executed, resolves
//! properties and constraints, and runs block executors in pipe order. The
//! standard table blocks live in [`blocks`].
//!
//! ## Processing Pipeline
//!
//! ```text
//! Model → Interpreter → (per pipeline) Runner → Block Executor → Table
//!                                       ↑
//!                 ExecutionContext → Expression Evaluator → ValueType
//! ```
//!
//! Parsing and type checking of source programs happen outside this crate;
//! the [`ast`] types describe the resolved program it consumes.

pub mod ast;
pub mod blocks;
pub mod config;
pub mod diagnostic;
pub mod error;
pub mod eval;
pub mod execution;
pub mod interpreter;
pub mod logging;
pub mod table;
pub mod value_type;

// Re-exports
pub use config::RunConfig;
pub use error::*;
pub use execution::{ExecutionContext, ExecutorRegistry, ExitCode};
pub use interpreter::Interpreter;
pub use table::{IoValue, Table};
pub use value_type::{Backend, InternalValue, ValueType};

#[cfg(test)]
mod tests {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    #[ctor::ctor]
    fn init_tests() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}
