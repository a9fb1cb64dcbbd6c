use nasync_diagnostics::{Diagnostic, DiagnosticCode, Span};
use thiserror::Error;

/// Why a cell could not be transformed. No partial output is produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    /// The cell is not valid JavaScript, or it closes its wrapper early.
    #[error("{message} ({line}:{column})")]
    Syntax {
        code: DiagnosticCode,
        message: String,
        /// Location inside the cell
        span: Span,
        line: u32,
        column: u32,
    },
}

impl TransformError {
    pub fn message(&self) -> &str {
        match self {
            TransformError::Syntax { message, .. } => message,
        }
    }

    /// 1-based line and column inside the cell.
    pub fn position(&self) -> (u32, u32) {
        match self {
            TransformError::Syntax { line, column, .. } => (*line, *column),
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            TransformError::Syntax {
                code,
                message,
                span,
                ..
            } => {
                let builder = Diagnostic::error(*code, message.clone()).with_span(*span);
                match code {
                    DiagnosticCode::WrapperEscape => builder
                        .with_help("a cell runs inside `(async () => { ... })()`; balance its braces")
                        .build(),
                    _ => builder.build(),
                }
            }
        }
    }
}
