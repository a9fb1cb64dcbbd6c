//! Diagnostic types reported while transpiling and running cells.

use crate::span::Span;
use serde::{Deserialize, Serialize};

/// Severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Informational; the cell still runs
    Hint,
    Warning,
    /// The cell cannot run
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Hint => "hint",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Stable diagnostic codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCode {
    // Parse errors (P001-P099)
    /// The cell is not valid JavaScript
    ParseError,
    /// The cell closes the block it is wrapped in
    WrapperEscape,

    // Hints (H001-H099)
    /// An expression sits where `await` is not allowed and is left as-is
    NotAwaited,

    // Evaluation (E001-E099)
    /// The cell threw or an awaited value rejected
    EvaluationError,

    // Internal errors (I001-I099)
    InternalError,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ParseError => "P001",
            Self::WrapperEscape => "P002",
            Self::NotAwaited => "H001",
            Self::EvaluationError => "E001",
            Self::InternalError => "I001",
        }
    }

    pub fn default_severity(&self) -> Severity {
        match self {
            Self::ParseError
            | Self::WrapperEscape
            | Self::EvaluationError
            | Self::InternalError => Severity::Error,
            Self::NotAwaited => Severity::Hint,
        }
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single diagnostic anchored at a span of a cell.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub severity: Severity,
    /// Short single-line message
    pub message: String,
    /// Optional help line
    pub help: Option<String>,
    pub span: Span,
}

impl Diagnostic {
    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> DiagnosticBuilder {
        DiagnosticBuilder::new(code, Severity::Error, message)
    }

    pub fn hint(code: DiagnosticCode, message: impl Into<String>) -> DiagnosticBuilder {
        DiagnosticBuilder::new(code, Severity::Hint, message)
    }

    /// Create a diagnostic with the code's default severity.
    pub fn new(code: DiagnosticCode, message: impl Into<String>) -> DiagnosticBuilder {
        DiagnosticBuilder::new(code, code.default_severity(), message)
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn is_hint(&self) -> bool {
        self.severity == Severity::Hint
    }
}

/// Builder for constructing diagnostics fluently.
pub struct DiagnosticBuilder {
    inner: Diagnostic,
}

impl DiagnosticBuilder {
    pub fn new(code: DiagnosticCode, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            inner: Diagnostic {
                code,
                severity,
                message: message.into(),
                help: None,
                span: Span::DUMMY,
            },
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.inner.span = span;
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.inner.help = Some(help.into());
        self
    }

    pub fn build(self) -> Diagnostic {
        self.inner
    }
}

/// Collection of diagnostics produced by one pass.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    pub items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.items.extend(diagnostics);
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.is_error())
    }

    pub fn error_count(&self) -> usize {
        self.items.iter().filter(|d| d.is_error()).count()
    }

    pub fn hint_count(&self) -> usize {
        self.items.iter().filter(|d| d.is_hint()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_severity() {
        let diag = Diagnostic::new(DiagnosticCode::NotAwaited, "left as-is").build();
        assert!(diag.is_hint());
        assert!(!diag.is_error());

        let diag = Diagnostic::new(DiagnosticCode::WrapperEscape, "escaped").build();
        assert!(diag.is_error());
    }

    #[test]
    fn test_counts() {
        let mut diags = Diagnostics::new();
        diags.push(Diagnostic::error(DiagnosticCode::ParseError, "bad").build());
        diags.push(Diagnostic::hint(DiagnosticCode::NotAwaited, "meh").build());
        diags.push(Diagnostic::hint(DiagnosticCode::NotAwaited, "meh").build());

        assert!(diags.has_errors());
        assert_eq!(diags.error_count(), 1);
        assert_eq!(diags.hint_count(), 2);
        assert_eq!(diags.len(), 3);
    }
}
