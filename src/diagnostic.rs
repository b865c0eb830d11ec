use std::fmt;

use serde::{Deserialize, Serialize};

/// Location information for error reporting
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
    pub file: String,
}

impl Location {
    pub fn new(file: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            line,
            column,
            file: file.into(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, strum::Display,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
    Hint,
}

/// Lets a front end tell capability gaps apart from data problems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum DiagnosticCode {
    Arithmetic,
    Unsupported,
    TypeMismatch,
    InvalidLiteral,
    MissingVariable,
    Other,
}

/// The AST position a diagnostic points at, optionally narrowed to a property
/// and an element index inside that property.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticAnchor {
    pub node: String,
    pub location: Location,
    pub property: Option<String>,
    pub index: Option<usize>,
}

impl DiagnosticAnchor {
    pub fn new(node: impl Into<String>, location: Location) -> Self {
        Self {
            node: node.into(),
            location,
            property: None,
            index: None,
        }
    }

    pub fn with_property(mut self, property: impl Into<String>) -> Self {
        self.property = Some(property.into());
        self
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }
}

impl fmt::Display for DiagnosticAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.node, self.location)?;
        if let Some(property) = &self.property {
            write!(f, ", property `{}`", property)?;
        }
        if let Some(index) = self.index {
            write!(f, "[{}]", index)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: DiagnosticCode,
    pub message: String,
    pub anchor: DiagnosticAnchor,
}

impl Diagnostic {
    pub fn error(code: DiagnosticCode, message: impl Into<String>, anchor: DiagnosticAnchor) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            anchor,
        }
    }

    pub fn warning(
        code: DiagnosticCode,
        message: impl Into<String>,
        anchor: DiagnosticAnchor,
    ) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
            anchor,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}]: {} at {}",
            self.severity, self.code, self.message, self.anchor
        )
    }
}

/// Accumulating diagnostic sink handed to every evaluation call.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accept(&mut self, diagnostic: Diagnostic) {
        tracing::debug!(
            severity = %diagnostic.severity,
            code = %diagnostic.code,
            "{}",
            diagnostic.message
        );
        self.entries.push(diagnostic);
    }

    pub fn error(&mut self, code: DiagnosticCode, message: impl Into<String>, anchor: DiagnosticAnchor) {
        self.accept(Diagnostic::error(code, message, anchor));
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries
            .iter()
            .filter(|d| d.severity == Severity::Error)
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn has_code(&self, code: DiagnosticCode) -> bool {
        self.entries.iter().any(|d| d.code == code)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
