//! JavaScript parser wrapper using SWC
//!
//! Cells are parsed as classic scripts (not modules): they end up inside a
//! function body, where `import`/`export` declarations are meaningless.

use swc_common::{input::StringInput, sync::Lrc, FileName, SourceMap};
use swc_ecma_ast::{EsVersion, Script};
use swc_ecma_parser::{lexer::Lexer, Parser, Syntax};

// Re-export AST types for consumers that walk the tree
pub use swc_ecma_ast;

// Re-export Spanned trait for getting spans from AST nodes
pub use swc_common::Spanned;

/// A parsed script together with the byte position its source starts at.
///
/// SWC numbers positions globally across a `SourceMap`, starting at 1, so
/// AST spans must be rebased before they can index into the source text.
#[derive(Debug)]
pub struct ParsedScript {
    pub script: Script,
    base: u32,
}

impl ParsedScript {
    /// Byte offsets `[start, end)` of an AST span inside the parsed text.
    pub fn offsets(&self, span: swc_common::Span) -> (u32, u32) {
        (
            span.lo.0.saturating_sub(self.base),
            span.hi.0.saturating_sub(self.base),
        )
    }

    /// Offset of the position SWC assigned to the first byte of the text.
    pub fn base(&self) -> u32 {
        self.base
    }
}

/// A syntax error, located by byte offsets into the parsed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    pub message: String,
    pub start: u32,
    pub end: u32,
}

impl std::fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (at byte {})", self.message, self.start)
    }
}

impl std::error::Error for ParseFailure {}

/// Parse JavaScript source code as a script.
///
/// Errors the parser recovered from are reported as failures as well: the
/// runtime would reject the same text when compiling it.
pub fn parse_script(source: &str, filename: &str) -> Result<ParsedScript, ParseFailure> {
    let source_map: Lrc<SourceMap> = Default::default();
    let source_file = source_map.new_source_file(
        Lrc::new(FileName::Custom(filename.to_string())),
        source.to_string(),
    );
    let base = source_file.start_pos.0;

    let lexer = Lexer::new(
        Syntax::Es(Default::default()),
        EsVersion::EsNext,
        StringInput::from(&*source_file),
        None,
    );

    let mut parser = Parser::new_from(lexer);

    let failure = |span: swc_common::Span, message: String| ParseFailure {
        message,
        start: span.lo.0.saturating_sub(base),
        end: span.hi.0.saturating_sub(base),
    };

    let script = parser
        .parse_script()
        .map_err(|e| failure(e.span(), e.kind().msg().to_string()))?;

    if let Some(error) = parser.take_errors().into_iter().next() {
        log::debug!("recovered parse error in {}: {:?}", filename, error);
        return Err(failure(error.span(), error.kind().msg().to_string()));
    }

    Ok(ParsedScript { script, base })
}

#[cfg(test)]
mod tests {
    use super::*;
    use swc_ecma_ast as ast;

    #[test]
    fn test_parse_statements() {
        let parsed = parse_script("let x = 1;\nx + 1", "cell.js").unwrap();
        assert_eq!(parsed.script.body.len(), 2);
    }

    #[test]
    fn test_offsets_are_rebased() {
        let source = "let answer = 42";
        let parsed = parse_script(source, "cell.js").unwrap();

        let ast::Stmt::Decl(ast::Decl::Var(var)) = &parsed.script.body[0] else {
            panic!("expected a variable declaration");
        };
        let init = var.decls[0].init.as_ref().unwrap();
        let (start, end) = parsed.offsets(init.span());

        assert_eq!(&source[start as usize..end as usize], "42");
    }

    #[test]
    fn test_top_level_await_in_async_arrow() {
        let parsed = parse_script("(async () => { await 1 })()", "cell.js");
        assert!(parsed.is_ok());
    }

    #[test]
    fn test_parse_error_location() {
        let source = "let x = ;";
        let err = parse_script(source, "cell.js").unwrap_err();

        assert!(!err.message.is_empty());
        assert!(err.start >= 4 && err.start <= source.len() as u32);
    }
}
