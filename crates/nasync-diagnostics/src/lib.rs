//! Diagnostic infrastructure for nasync cells.
//!
//! Cells are small, so this crate stays small too:
//! - Byte spans into a cell's source, resolved to line/column through a [`SourceCache`]
//! - Diagnostics with stable codes (`P001`, `H001`, ...)
//! - Terminal, JSON and one-line emitters
//!
//! # Example
//!
//! ```
//! use nasync_diagnostics::{
//!     Diagnostic, DiagnosticCode, DiagnosticEmitter, SourceCache, Span, SimpleEmitter,
//! };
//!
//! let mut cache = SourceCache::new();
//! let file_id = cache.add_cell("cell[1]", "let x = ;".to_string());
//!
//! let diag = Diagnostic::error(DiagnosticCode::ParseError, "Expression expected")
//!     .with_span(Span::new(file_id, 8, 9))
//!     .build();
//!
//! let mut out = Vec::new();
//! SimpleEmitter::new(&mut out).emit(&diag, &cache).unwrap();
//! assert_eq!(
//!     String::from_utf8(out).unwrap(),
//!     "cell[1]:1:9: error: Expression expected [P001]\n"
//! );
//! ```

pub mod diagnostic;
pub mod emitter;
pub mod source_cache;
pub mod span;

pub use diagnostic::{Diagnostic, DiagnosticBuilder, DiagnosticCode, Diagnostics, Severity};
pub use emitter::{DiagnosticEmitter, JsonEmitter, SimpleEmitter, TerminalEmitter};
pub use source_cache::{SourceCache, SourceFile};
pub use span::{FileId, Location, Span};
