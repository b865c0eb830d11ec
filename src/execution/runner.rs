use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::Utc;

use crate::ast::{BlockDefinition, PipelineDefinition};
use crate::table::{IoType, IoValue};

use super::{ExecutionContext, ExecutionError, ExecutionResult, ExecutorRegistry, StackNode};

/// Outcome of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExitCode {
    #[default]
    Success,
    Failure,
}

impl ExitCode {
    /// `Failure` as soon as either side failed.
    pub fn combine(self, other: ExitCode) -> ExitCode {
        match (self, other) {
            (Self::Success, Self::Success) => Self::Success,
            _ => Self::Failure,
        }
    }

    pub fn is_success(self) -> bool {
        self == Self::Success
    }

    /// Process exit status.
    pub fn code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
        }
    }
}

impl FromIterator<ExitCode> for ExitCode {
    fn from_iter<I: IntoIterator<Item = ExitCode>>(iter: I) -> Self {
        iter.into_iter().fold(Self::Success, Self::combine)
    }
}

/// Blocks of `pipeline` in execution order, each with its parent block.
///
/// Blocks without incoming pipes come first, in declaration order; ties
/// further down keep declaration order as well.
pub(crate) fn execution_order(
    pipeline: &PipelineDefinition,
) -> ExecutionResult<Vec<(Arc<BlockDefinition>, Option<String>)>> {
    let position: HashMap<&str, usize> = pipeline
        .blocks
        .iter()
        .enumerate()
        .map(|(index, block)| (block.name.as_str(), index))
        .collect();

    let mut parents: Vec<Option<usize>> = vec![None; pipeline.blocks.len()];
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); pipeline.blocks.len()];
    let mut in_degree = vec![0usize; pipeline.blocks.len()];
    for pipe in &pipeline.pipes {
        let from = *position
            .get(pipe.from.as_str())
            .ok_or_else(|| ExecutionError::UnknownBlock(pipe.from.clone()))?;
        let to = *position
            .get(pipe.to.as_str())
            .ok_or_else(|| ExecutionError::UnknownBlock(pipe.to.clone()))?;
        in_degree[to] += 1;
        if in_degree[to] > 1 {
            let count = pipeline.pipes.iter().filter(|p| p.to == pipe.to).count();
            return Err(ExecutionError::MultipleInputs {
                block: pipe.to.clone(),
                count,
            });
        }
        parents[to] = Some(from);
        children[from].push(to);
    }

    let mut ready: VecDeque<usize> = (0..pipeline.blocks.len())
        .filter(|&index| in_degree[index] == 0)
        .collect();
    let mut order = Vec::with_capacity(pipeline.blocks.len());
    while let Some(index) = ready.pop_front() {
        order.push(index);
        for &child in &children[index] {
            in_degree[child] -= 1;
            if in_degree[child] == 0 {
                ready.push_back(child);
            }
        }
    }
    if order.len() < pipeline.blocks.len() {
        return Err(ExecutionError::Cycle(pipeline.name.clone()));
    }

    Ok(order
        .into_iter()
        .map(|index| {
            let parent = parents[index].map(|parent| pipeline.blocks[parent].name.clone());
            (pipeline.blocks[index].clone(), parent)
        })
        .collect())
}

/// Every block type is registered and every pipe connects matching I/O types.
pub(crate) fn check_pipeline(
    pipeline: &PipelineDefinition,
    registry: &ExecutorRegistry,
) -> ExecutionResult<()> {
    let io_of = |block: &BlockDefinition| {
        registry
            .block(&block.block_type)
            .map(|executor| (executor.meta().input, executor.meta().output))
            .ok_or_else(|| ExecutionError::UnknownBlockType {
                block: block.name.clone(),
                block_type: block.block_type.clone(),
            })
    };
    for block in &pipeline.blocks {
        io_of(block)?;
    }
    for pipe in &pipeline.pipes {
        let (Some(from), Some(to)) = (pipeline.block(&pipe.from), pipeline.block(&pipe.to)) else {
            continue;
        };
        let (_, produced) = io_of(from)?;
        let (expected, _) = io_of(to)?;
        if produced != expected {
            return Err(ExecutionError::IoMismatch {
                from: pipe.from.clone(),
                to: pipe.to.clone(),
                expected,
                actual: produced,
            });
        }
    }
    Ok(())
}

fn log_overview(pipeline: &PipelineDefinition, context: &ExecutionContext) {
    let mut lines = vec!["Overview:".to_string()];
    let parameters = &context.config().runtime_parameters;
    if !parameters.is_empty() {
        let mut keys: Vec<&String> = parameters.keys().collect();
        keys.sort();
        lines.push(format!("\tRuntime Parameters ({}):", keys.len()));
        for key in keys {
            lines.push(format!("\t\t{}: {}", key, parameters[key]));
        }
    }
    lines.push(format!(
        "\tBlocks ({} blocks with {} pipes):",
        pipeline.blocks.len(),
        pipeline.pipes.len()
    ));
    for block in &pipeline.blocks {
        lines.push(format!("\t -> {} ({})", block.name, block.block_type));
    }
    context.logger().log_info(lines.join("\n"));
}

/// Runs every block of the context's pipeline, stopping at the first failure.
///
/// Source blocks receive [`IoValue::None`]; every other block receives its
/// own copy of its parent's output.
#[tracing::instrument(skip(context), fields(pipeline = %context.pipeline().name), level = "debug")]
pub async fn run_pipeline(context: &ExecutionContext) -> ExitCode {
    let pipeline = context.pipeline().clone();
    let logger = context.logger();
    log_overview(&pipeline, context);
    let started = Utc::now();

    let exit_code = match execute_blocks(&pipeline, context).await {
        Ok(()) => ExitCode::Success,
        Err(error) => {
            let anchor = error.anchor().cloned().unwrap_or_else(|| context.anchor());
            logger.log_err_at(error.to_string(), &anchor);
            ExitCode::Failure
        }
    };

    let elapsed = Utc::now() - started;
    logger.log_info(format!(
        "Execution duration: {} ms.",
        elapsed.num_milliseconds()
    ));
    exit_code
}

/// Block outputs waiting for their children. An output is released as soon
/// as its last child has taken it; the last child receives it without a copy.
struct PendingOutputs {
    outputs: HashMap<String, IoValue>,
    consumers: HashMap<String, usize>,
}

impl PendingOutputs {
    fn new(order: &[(Arc<BlockDefinition>, Option<String>)]) -> Self {
        let mut consumers = HashMap::new();
        for parent in order.iter().filter_map(|(_, parent)| parent.as_ref()) {
            *consumers.entry(parent.clone()).or_insert(0) += 1;
        }
        Self {
            outputs: HashMap::new(),
            consumers,
        }
    }

    /// Outputs nobody consumes are dropped right away.
    fn store(&mut self, block: &str, output: IoValue) {
        if self.consumers.get(block).is_some_and(|count| *count > 0) {
            self.outputs.insert(block.to_string(), output);
        }
    }

    fn take(&mut self, parent: &str) -> IoValue {
        let remaining = match self.consumers.get_mut(parent) {
            Some(count) => {
                *count = count.saturating_sub(1);
                *count
            }
            None => 0,
        };
        if remaining == 0 {
            self.outputs.remove(parent).unwrap_or(IoValue::None)
        } else {
            self.outputs.get(parent).cloned().unwrap_or(IoValue::None)
        }
    }

    fn len(&self) -> usize {
        self.outputs.len()
    }
}

async fn execute_blocks(
    pipeline: &PipelineDefinition,
    context: &ExecutionContext,
) -> ExecutionResult<()> {
    let order = execution_order(pipeline)?;
    check_pipeline(pipeline, context.registry())?;

    let mut outputs = PendingOutputs::new(&order);
    for (block, parent) in order {
        let executor = context
            .registry()
            .block(&block.block_type)
            .cloned()
            .ok_or_else(|| ExecutionError::UnknownBlockType {
                block: block.name.clone(),
                block_type: block.block_type.clone(),
            })?;
        let input = match &parent {
            Some(parent) => outputs.take(parent),
            None => IoValue::None,
        };
        let expected = executor.meta().input;
        if input.io_type() != expected && expected != IoType::None {
            return Err(ExecutionError::block(
                format!(
                    "Block `{}` expects {} input but received {}",
                    block.name,
                    expected,
                    input.io_type()
                ),
                StackNode::Block(block.clone()).anchor(),
            ));
        }

        let block_context = context.enter_node(StackNode::Block(block.clone()));
        let output = executor.execute(input, &block_context).await?;
        block_context.log_debug_output(&block.name, &output);
        outputs.store(&block.name, output);
    }
    debug_assert_eq!(outputs.len(), 0, "Block outputs outlived their consumers");
    Ok(())
}
