//! Diagnostic emitters for different output formats.

use crate::diagnostic::{Diagnostic, Diagnostics, Severity};
use crate::source_cache::SourceCache;
use std::io::Write;

/// Trait for emitting diagnostics in various formats.
pub trait DiagnosticEmitter {
    fn emit(&mut self, diagnostic: &Diagnostic, cache: &SourceCache) -> std::io::Result<()>;

    fn emit_all(&mut self, diagnostics: &Diagnostics, cache: &SourceCache) -> std::io::Result<()> {
        for diag in diagnostics.iter() {
            self.emit(diag, cache)?;
        }
        Ok(())
    }
}

/// Terminal output with an optional colour and a code snippet.
pub struct TerminalEmitter<W: Write> {
    writer: W,
    colored: bool,
}

impl<W: Write> TerminalEmitter<W> {
    pub fn new(writer: W, colored: bool) -> Self {
        Self { writer, colored }
    }

    fn severity_color(&self, severity: Severity) -> &'static str {
        if !self.colored {
            return "";
        }
        match severity {
            Severity::Error => "\x1b[31m",
            Severity::Warning => "\x1b[33m",
            Severity::Hint => "\x1b[34m",
        }
    }

    fn paint(&self, code: &'static str) -> &'static str {
        if self.colored {
            code
        } else {
            ""
        }
    }
}

impl<W: Write> DiagnosticEmitter for TerminalEmitter<W> {
    fn emit(&mut self, diagnostic: &Diagnostic, cache: &SourceCache) -> std::io::Result<()> {
        let color = self.severity_color(diagnostic.severity);
        let reset = self.paint("\x1b[0m");
        let bold = self.paint("\x1b[1m");
        let cyan = self.paint("\x1b[36m");

        // error[P001]: message
        writeln!(
            self.writer,
            "{}{}{}[{}]{}: {}",
            bold,
            color,
            diagnostic.severity.as_str(),
            diagnostic.code.as_str(),
            reset,
            diagnostic.message
        )?;

        if let Some(loc) = cache.location(diagnostic.span) {
            writeln!(self.writer, "  {}-->{} {}", cyan, reset, loc)?;

            if let Some(file) = cache.get_file(diagnostic.span.file_id) {
                let (line_num, start_col) = file.line_column(diagnostic.span.start);
                if let Some(line_text) = file.line_text(line_num) {
                    let line_str = line_num.to_string();
                    let padding = " ".repeat(line_str.len());

                    writeln!(self.writer, "{} {}|{}", padding, cyan, reset)?;
                    writeln!(self.writer, "{}{} |{} {}", cyan, line_str, reset, line_text)?;

                    let underline_padding = " ".repeat((start_col - 1) as usize);
                    let max_underline = line_text.len().saturating_sub((start_col - 1) as usize);
                    let underline_len = (diagnostic.span.len().max(1) as usize)
                        .min(max_underline)
                        .max(1);

                    writeln!(
                        self.writer,
                        "{} {}|{} {}{}{}{}",
                        padding,
                        cyan,
                        reset,
                        underline_padding,
                        color,
                        "^".repeat(underline_len),
                        reset
                    )?;
                }
            }
        }

        if let Some(ref help) = diagnostic.help {
            writeln!(self.writer, "  {}= help:{} {}", cyan, reset, help)?;
        }

        writeln!(self.writer)?;
        Ok(())
    }
}

/// One JSON object per line, for tooling.
pub struct JsonEmitter<W: Write> {
    writer: W,
}

impl<W: Write> JsonEmitter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> DiagnosticEmitter for JsonEmitter<W> {
    fn emit(&mut self, diagnostic: &Diagnostic, cache: &SourceCache) -> std::io::Result<()> {
        let loc = cache.location(diagnostic.span);

        let json = serde_json::json!({
            "code": diagnostic.code.as_str(),
            "severity": diagnostic.severity.as_str(),
            "message": diagnostic.message,
            "location": loc.map(|l| serde_json::json!({
                "cell": l.file,
                "line": l.line,
                "column": l.column,
            })),
            "help": diagnostic.help,
        });

        serde_json::to_writer(&mut self.writer, &json)?;
        writeln!(self.writer)?;
        Ok(())
    }
}

/// `cell:line:col: severity: message [code]`
pub struct SimpleEmitter<W: Write> {
    writer: W,
}

impl<W: Write> SimpleEmitter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> DiagnosticEmitter for SimpleEmitter<W> {
    fn emit(&mut self, diagnostic: &Diagnostic, cache: &SourceCache) -> std::io::Result<()> {
        match cache.location(diagnostic.span) {
            Some(loc) => writeln!(
                self.writer,
                "{}: {}: {} [{}]",
                loc,
                diagnostic.severity.as_str(),
                diagnostic.message,
                diagnostic.code.as_str()
            ),
            None => writeln!(
                self.writer,
                "{}: {} [{}]",
                diagnostic.severity.as_str(),
                diagnostic.message,
                diagnostic.code.as_str()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DiagnosticCode, Span};

    fn sample() -> (SourceCache, Diagnostic) {
        let mut cache = SourceCache::new();
        let id = cache.add_cell("cell[1]", "let a = 1\nlet = 2".to_string());
        let diag = Diagnostic::error(DiagnosticCode::ParseError, "Unexpected token `=`")
            .with_span(Span::new(id, 14, 15))
            .with_help("expected an identifier")
            .build();
        (cache, diag)
    }

    #[test]
    fn test_terminal_snippet() {
        let (cache, diag) = sample();
        let mut out = Vec::new();
        TerminalEmitter::new(&mut out, false).emit(&diag, &cache).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("error[P001]: Unexpected token `=`\n"));
        assert!(text.contains("--> cell[1]:2:5"));
        assert!(text.contains("2 | let = 2"));
        assert!(text.contains("    ^"));
        assert!(text.contains("= help: expected an identifier"));
        assert!(!text.contains('\x1b'));
    }

    #[test]
    fn test_json_line() {
        let (cache, diag) = sample();
        let mut out = Vec::new();
        JsonEmitter::new(&mut out).emit(&diag, &cache).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();

        assert_eq!(value["code"], "P001");
        assert_eq!(value["severity"], "error");
        assert_eq!(value["location"]["line"], 2);
        assert_eq!(value["location"]["column"], 5);
    }

    #[test]
    fn test_simple_without_location() {
        let cache = SourceCache::new();
        let diag = Diagnostic::error(DiagnosticCode::InternalError, "boom").build();
        let mut out = Vec::new();
        SimpleEmitter::new(&mut out).emit(&diag, &cache).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "error: boom [I001]\n");
    }
}
