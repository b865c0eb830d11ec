use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::ast::{
    BlockDefinition, ConstraintBody, ConstraintDefinition, PipelineDefinition,
    PropertyAssignment, PropertyValue, TransformDefinition,
};
use crate::config::RunConfig;
use crate::diagnostic::{DiagnosticAnchor, Diagnostics, Location};
use crate::eval::{EvaluationContext, ExpressionEvaluator};
use crate::table::{IoValue, TableFactory};
use crate::value_type::{Backend, InternalValue, ValueType, ValueTypeProvider};

use super::debug::TableDebugPrinter;
use super::{ExecutionError, ExecutionResult, ExecutorRegistry, Logger, PropertySpec};

/// An AST node on the execution stack.
#[derive(Debug, Clone, PartialEq)]
pub enum StackNode {
    Block(Arc<BlockDefinition>),
    Constraint(Arc<ConstraintDefinition>),
    Transform(Arc<TransformDefinition>),
}

impl StackNode {
    pub fn name(&self) -> &str {
        match self {
            Self::Block(block) => &block.name,
            Self::Constraint(constraint) => &constraint.name,
            Self::Transform(transform) => &transform.name,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Block(_) => "block",
            Self::Constraint(_) => "constraint",
            Self::Transform(_) => "transform",
        }
    }

    pub fn location(&self) -> &Location {
        match self {
            Self::Block(block) => &block.location,
            Self::Constraint(constraint) => &constraint.location,
            Self::Transform(transform) => &transform.location,
        }
    }

    pub fn property(&self, name: &str) -> Option<&PropertyAssignment> {
        match self {
            Self::Block(block) => block.property(name),
            Self::Constraint(constraint) => constraint.property(name),
            Self::Transform(_) => None,
        }
    }

    pub fn anchor(&self) -> DiagnosticAnchor {
        DiagnosticAnchor::new(
            format!("{} {}", self.kind(), self.name()),
            self.location().clone(),
        )
    }
}

impl fmt::Display for StackNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} `{}`", self.kind(), self.name())
    }
}

#[derive(Debug)]
struct Frame {
    node: StackNode,
    parent: Option<Arc<Frame>>,
    depth: usize,
}

/// Per-pipeline execution state.
///
/// Cloning is cheap. [`ExecutionContext::enter_node`] returns a child context
/// with `node` on top of the stack; the receiver keeps its own position, so
/// the parent position is restored as soon as the child goes out of scope.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pipeline: Arc<PipelineDefinition>,
    stack: Option<Arc<Frame>>,
    config: Arc<RunConfig>,
    runtime_parameters: Arc<HashMap<String, String>>,
    registry: Arc<ExecutorRegistry>,
    evaluator: ExpressionEvaluator,
}

impl ExecutionContext {
    pub fn new(
        pipeline: Arc<PipelineDefinition>,
        config: Arc<RunConfig>,
        registry: Arc<ExecutorRegistry>,
    ) -> Self {
        let runtime_parameters = Arc::new(config.runtime_parameters.clone());
        Self {
            pipeline,
            stack: None,
            config,
            runtime_parameters,
            registry,
            evaluator: ExpressionEvaluator::lazy(),
        }
    }

    pub fn enter_node(&self, node: StackNode) -> Self {
        let depth = self.depth() + 1;
        Self {
            stack: Some(Arc::new(Frame {
                node,
                parent: self.stack.clone(),
                depth,
            })),
            ..self.clone()
        }
    }

    pub fn current_node(&self) -> Option<&StackNode> {
        self.stack.as_deref().map(|frame| &frame.node)
    }

    /// Nodes from the top of the stack down to the bottom.
    pub fn nodes(&self) -> impl Iterator<Item = &StackNode> {
        std::iter::successors(self.stack.as_deref(), |frame| frame.parent.as_deref())
            .map(|frame| &frame.node)
    }

    pub fn depth(&self) -> usize {
        self.stack.as_ref().map_or(0, |frame| frame.depth)
    }

    pub fn pipeline(&self) -> &Arc<PipelineDefinition> {
        &self.pipeline
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn registry(&self) -> &ExecutorRegistry {
        &self.registry
    }

    pub fn evaluator(&self) -> &ExpressionEvaluator {
        &self.evaluator
    }

    pub fn backend(&self) -> Backend {
        self.config.backend
    }

    pub fn value_type_provider(&self) -> ValueTypeProvider {
        ValueTypeProvider::new(self.config.backend)
    }

    pub fn table_factory(&self) -> TableFactory {
        TableFactory::new(self.config.backend)
    }

    /// Fresh evaluation scope that sees this run's runtime parameters.
    pub fn evaluation_context(&self) -> EvaluationContext {
        EvaluationContext::new(self.runtime_parameters.clone())
    }

    pub fn logger(&self) -> Logger {
        let context = match self.current_node() {
            Some(node) => node.name().to_string(),
            None => self.pipeline.name.clone(),
        };
        Logger::new(context, self.depth())
    }

    /// Anchor of the current node, or of the pipeline on an empty stack.
    pub fn anchor(&self) -> DiagnosticAnchor {
        match self.current_node() {
            Some(node) => node.anchor(),
            None => DiagnosticAnchor::new(
                format!("pipeline {}", self.pipeline.name),
                self.pipeline.location.clone(),
            ),
        }
    }

    /// Anchor of property `name` of the current node.
    pub fn property_anchor(&self, name: &str) -> DiagnosticAnchor {
        let mut anchor = self.anchor().with_property(name);
        if let Some(property) = self.current_node().and_then(|node| node.property(name)) {
            anchor.location = property.location.clone();
        }
        anchor
    }

    fn property_spec(&self, node: &StackNode, name: &str) -> Option<PropertySpec> {
        match node {
            StackNode::Block(block) => self
                .registry
                .block(&block.block_type)
                .and_then(|executor| executor.meta().property(name).cloned()),
            StackNode::Constraint(constraint) => match &constraint.body {
                ConstraintBody::Typed {
                    constraint_type, ..
                } => self
                    .registry
                    .constraint(constraint_type)
                    .and_then(|executor| executor.meta().property(name).cloned()),
                ConstraintBody::Expression(_) => None,
            },
            StackNode::Transform(_) => None,
        }
    }

    /// Value of property `name` of the current node as `value_type`.
    ///
    /// An assigned property is evaluated; failing to evaluate it (a missing
    /// runtime parameter, a domain error) is an execution error anchored at
    /// the property. An absent property yields the declared default.
    ///
    /// # Panics
    ///
    /// Panics on an empty stack, when an absent property has no default, or
    /// when a value does not satisfy `value_type`. Type checking rules these
    /// out before execution.
    pub fn get_property_value(
        &self,
        name: &str,
        value_type: &ValueType,
    ) -> ExecutionResult<InternalValue> {
        let node = self
            .current_node()
            .unwrap_or_else(|| panic!("Property `{}` requested outside of any node", name));

        let Some(property) = node.property(name) else {
            let default = self
                .property_spec(node, name)
                .and_then(|spec| spec.default)
                .map(|default| value_type.normalize(default))
                .unwrap_or_else(|| {
                    panic!("Property `{}` of {} has neither a value nor a default", name, node)
                });
            assert!(
                value_type.is_internal_value_representation(&default),
                "Default value {} of property `{}` is not a valid {}",
                default,
                name,
                value_type.name()
            );
            return Ok(default);
        };

        let mut diagnostics = Diagnostics::new();
        let value = self.evaluator.evaluate_property_value(
            property,
            &self.evaluation_context(),
            value_type,
            &mut diagnostics,
        );
        value.ok_or_else(|| {
            let message = match &property.value {
                PropertyValue::RuntimeParameter(parameter) => format!(
                    "Runtime parameter `{}` is missing or is not a valid {}",
                    parameter,
                    value_type.name()
                ),
                PropertyValue::Expression(_) if !diagnostics.is_empty() => diagnostics
                    .iter()
                    .map(|diagnostic| diagnostic.message.clone())
                    .collect::<Vec<_>>()
                    .join("; "),
                PropertyValue::Expression(_) => {
                    format!("Could not evaluate property `{}`", name)
                }
            };
            ExecutionError::block(message, self.property_anchor(name))
        })
    }

    pub fn is_debug_target(&self, block: &str) -> bool {
        self.config.debug && self.config.debug_targets.includes(block)
    }

    /// Logs a block result according to the debug configuration.
    pub fn log_debug_output(&self, block: &str, output: &IoValue) {
        if !self.is_debug_target(block) {
            return;
        }
        let logger = self.logger();
        match output {
            IoValue::Table(table) => {
                if let Some(mut printer) =
                    TableDebugPrinter::new(self.config.debug_granularity, self.config.peek_rows)
                {
                    TableDebugPrinter::log(&table.accept_visitor(&mut printer), &logger);
                }
            }
            other => logger.log_debug(format!("Output: {}", other)),
        }
    }
}
