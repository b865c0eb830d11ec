use crate::diagnostic::DiagnosticAnchor;

/// Structured logger bound to one position of the execution stack.
///
/// Every event carries the logging context (the block, constraint or
/// transform being executed, the pipeline when nothing is) and the nesting
/// depth as `tracing` fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Logger {
    context: String,
    depth: usize,
}

impl Logger {
    pub fn new(context: impl Into<String>, depth: usize) -> Self {
        Self {
            context: context.into(),
            depth,
        }
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn log_debug(&self, message: impl AsRef<str>) {
        tracing::debug!(context = %self.context, depth = self.depth, "{}", message.as_ref());
    }

    pub fn log_info(&self, message: impl AsRef<str>) {
        tracing::info!(context = %self.context, depth = self.depth, "{}", message.as_ref());
    }

    pub fn log_warn(&self, message: impl AsRef<str>) {
        tracing::warn!(context = %self.context, depth = self.depth, "{}", message.as_ref());
    }

    pub fn log_err(&self, message: impl AsRef<str>) {
        tracing::error!(context = %self.context, depth = self.depth, "{}", message.as_ref());
    }

    /// Error event pointing at an AST node.
    pub fn log_err_at(&self, message: impl AsRef<str>, anchor: &DiagnosticAnchor) {
        tracing::error!(
            context = %self.context,
            depth = self.depth,
            anchor = %anchor,
            "{}",
            message.as_ref()
        );
    }
}
