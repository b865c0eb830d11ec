use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::blocks::{TableInterpreterExecutor, TableTransformerExecutor};
use crate::table::IoValue;

use super::constraint::{
    AllowlistConstraintExecutor, ConstraintExecutor, DenylistConstraintExecutor,
    LengthConstraintExecutor, RangeConstraintExecutor, RegexConstraintExecutor,
};
use super::{BlockMeta, ExecutionContext, ExecutionResult};

/// Executes one block type.
///
/// The runner hands over the output of the preceding block (or
/// [`IoValue::None`] for blocks without input) together with a context whose
/// current node is the block being executed.
#[async_trait]
pub trait BlockExecutor: Send + Sync {
    fn meta(&self) -> &BlockMeta;

    fn block_type(&self) -> &str {
        &self.meta().block_type
    }

    async fn execute(&self, input: IoValue, context: &ExecutionContext)
        -> ExecutionResult<IoValue>;
}

/// Block and constraint executors by type name.
#[derive(Default, Clone)]
pub struct ExecutorRegistry {
    blocks: HashMap<String, Arc<dyn BlockExecutor>>,
    constraints: HashMap<String, Arc<dyn ConstraintExecutor>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The in-core table blocks and typed constraints.
    pub fn with_standard_executors() -> Self {
        let mut registry = Self::new();
        registry.register_block(Arc::new(TableInterpreterExecutor::new()));
        registry.register_block(Arc::new(TableTransformerExecutor::new()));
        registry.register_constraint(Arc::new(AllowlistConstraintExecutor::new()));
        registry.register_constraint(Arc::new(DenylistConstraintExecutor::new()));
        registry.register_constraint(Arc::new(RegexConstraintExecutor::new()));
        registry.register_constraint(Arc::new(RangeConstraintExecutor::new()));
        registry.register_constraint(Arc::new(LengthConstraintExecutor::new()));
        registry
    }

    /// Registers `executor`, replacing any executor of the same block type.
    pub fn register_block(&mut self, executor: Arc<dyn BlockExecutor>) {
        self.blocks.insert(executor.block_type().to_string(), executor);
    }

    pub fn register_constraint(&mut self, executor: Arc<dyn ConstraintExecutor>) {
        self.constraints
            .insert(executor.meta().constraint_type.clone(), executor);
    }

    pub fn block(&self, block_type: &str) -> Option<&Arc<dyn BlockExecutor>> {
        self.blocks.get(block_type)
    }

    pub fn constraint(&self, constraint_type: &str) -> Option<&Arc<dyn ConstraintExecutor>> {
        self.constraints.get(constraint_type)
    }
}

impl fmt::Debug for ExecutorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut blocks: Vec<&String> = self.blocks.keys().collect();
        let mut constraints: Vec<&String> = self.constraints.keys().collect();
        blocks.sort();
        constraints.sort();
        f.debug_struct("ExecutorRegistry")
            .field("blocks", &blocks)
            .field("constraints", &constraints)
            .finish()
    }
}
