//! Entry point for running a whole program.
//!
//! Every pipeline of a [`Model`] runs in its own tokio task with its own
//! [`ExecutionContext`]; the overall exit code is a failure as soon as one
//! pipeline fails.

use std::sync::Arc;

use futures::future::join_all;
use tracing::Instrument;
use uuid::Uuid;

use crate::ast::{Model, PipelineDefinition};
use crate::config::RunConfig;
use crate::execution::{run_pipeline, ExecutionContext, ExecutorRegistry, ExitCode};

#[derive(Debug, Clone)]
pub struct Interpreter {
    config: Arc<RunConfig>,
    registry: Arc<ExecutorRegistry>,
}

impl Interpreter {
    /// Interpreter with the standard table blocks and constraints.
    pub fn new(config: RunConfig) -> Self {
        Self::with_registry(config, ExecutorRegistry::with_standard_executors())
    }

    pub fn with_registry(config: RunConfig, registry: ExecutorRegistry) -> Self {
        Self {
            config: Arc::new(config),
            registry: Arc::new(registry),
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn registry(&self) -> &ExecutorRegistry {
        &self.registry
    }

    fn context_for(&self, pipeline: Arc<PipelineDefinition>) -> ExecutionContext {
        ExecutionContext::new(pipeline, self.config.clone(), self.registry.clone())
    }

    pub async fn run(&self, model: &Model) -> ExitCode {
        let runs = model.pipelines.iter().map(|pipeline| {
            let span = tracing::info_span!(
                "pipeline",
                pipeline = %pipeline.name,
                run_id = %Uuid::new_v4()
            );
            let context = self.context_for(pipeline.clone());
            tokio::spawn(async move { run_pipeline(&context).await }.instrument(span))
        });

        join_all(runs)
            .await
            .into_iter()
            .map(|result| match result {
                Ok(exit_code) => exit_code,
                Err(e) => {
                    tracing::error!("Pipeline task failed: {}", e);
                    ExitCode::Failure
                }
            })
            .collect()
    }

    /// Runs a single pipeline on the current task.
    pub async fn run_pipeline(&self, pipeline: PipelineDefinition) -> ExitCode {
        let context = self.context_for(Arc::new(pipeline));
        run_pipeline(&context).await
    }
}
