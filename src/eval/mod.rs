//! Expression Evaluation
//!
//! Interprets typed expression trees handed over by the parser.
//!
//! # Core Components
//!
//! ## Expression Evaluator
//! Walks an [`Expression`](crate::ast::Expression), dispatching literals,
//! free-variable references and operator applications. Supports a lazy
//! (short-circuiting) and an exhaustive strategy.
//!
//! ## Operator Registry
//! One evaluator per operator symbol, each with an eager `evaluate` and a
//! `symbolic_evaluate` that accepts column handles.
//!
//! ## Column Expressions
//! Symbolic results over columns are [`ColumnExpr`] trees evaluated later
//! against an Arrow `RecordBatch`.
//!
//! ## Evaluation Context
//! Variable scope, runtime parameters and the operator registry.

pub mod column_expr;
pub mod context;
pub mod evaluator;
pub mod operator;
pub mod operators;

pub use column_expr::{ColumnBinaryOp, ColumnExpr, ColumnExprError, ColumnUnaryOp, ColumnValue};
pub use context::{EvaluationContext, Scope, ScopeError};
pub use evaluator::{EvaluationStrategy, ExpressionEvaluator};
pub use operator::{
    BinaryOperatorEvaluator, OperatorRegistry, SymbolicValue, TernaryOperatorEvaluator,
    UnaryOperatorEvaluator,
};
