//! The synthetic async wrapper around a cell.

use crate::rewrite::followed_by_semicolon;
use nasync_parser::ParsedScript;
use swc_ecma_ast as ast;

pub const WRAP_PREFIX: &str = "(async () => {";
pub const WRAP_SUFFIX: &str = "\n})()";

/// A cell as it is handed to the parser.
#[derive(Debug, Clone)]
pub(crate) struct Prepared {
    pub text: String,
    /// Offset of the first cell byte inside `text`
    pub shift: u32,
}

impl Prepared {
    /// Wrap the cell, optionally parenthesizing it first.
    pub fn wrapped(source: &str, parenthesize: bool) -> Self {
        let mut text = String::with_capacity(source.len() + WRAP_PREFIX.len() + WRAP_SUFFIX.len() + 2);
        text.push_str(WRAP_PREFIX);
        if parenthesize {
            text.push('(');
        }
        text.push_str(source);
        if parenthesize {
            text.push(')');
        }
        text.push_str(WRAP_SUFFIX);

        Self {
            text,
            shift: WRAP_PREFIX.len() as u32 + parenthesize as u32,
        }
    }

    /// Use output of an earlier pass as is.
    pub fn as_is(source: &str) -> Self {
        Self {
            text: source.to_string(),
            shift: 0,
        }
    }

    /// Map an offset in `text` back into the cell, clamped to the cell.
    pub fn cell_offset(&self, offset: u32, cell_len: usize) -> u32 {
        offset.saturating_sub(self.shift).min(cell_len as u32)
    }
}

/// `{ ... }` at the start of a cell is an object literal, not a block.
pub(crate) fn looks_like_object(source: &str) -> bool {
    let trimmed = source.trim();
    trimmed.starts_with('{') && trimmed.ends_with('}')
}

pub(crate) fn looks_wrapped(source: &str) -> bool {
    source.trim_start().starts_with(WRAP_PREFIX) && source.trim_end().ends_with(WRAP_SUFFIX)
}

/// Transformed cells never end in an expression statement left open: a
/// trailing expression is either returned or closed by `;`. A wrapper-shaped
/// cell that does is the author's own code.
pub(crate) fn ends_like_output(block: &ast::BlockStmt, parsed: &ParsedScript, text: &str) -> bool {
    match block.stmts.last() {
        Some(ast::Stmt::Expr(stmt)) => {
            let (_, hi) = parsed.offsets(swc_common::Spanned::span(&*stmt.expr));
            followed_by_semicolon(text, hi as usize)
        }
        _ => true,
    }
}

/// The cell escaped its wrapper: the script is not a single call of a
/// parameterless async arrow.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Escaped {
    /// Where the script stops looking like the wrapper
    pub at: swc_common::BytePos,
}

/// Find the body of the wrapper arrow.
pub(crate) fn top_block(script: &ast::Script) -> Result<&ast::BlockStmt, Escaped> {
    use swc_common::Spanned;

    let escaped = |at| Err(Escaped { at });

    let first = match script.body.as_slice() {
        [only] => only,
        [first, second, ..] => return escaped(first.span().hi.max(second.span().lo)),
        [] => return escaped(script.span.lo),
    };

    let ast::Stmt::Expr(stmt) = first else {
        return escaped(first.span().lo);
    };
    let ast::Expr::Call(call) = stmt.expr.as_ref() else {
        return escaped(stmt.span.lo);
    };
    if !call.args.is_empty() {
        return escaped(call.args[0].expr.span().lo);
    }
    let ast::Callee::Expr(callee) = &call.callee else {
        return escaped(call.span.lo);
    };
    let ast::Expr::Paren(paren) = callee.as_ref() else {
        return escaped(callee.span().lo);
    };
    let ast::Expr::Arrow(arrow) = paren.expr.as_ref() else {
        return escaped(paren.span.lo);
    };
    if !arrow.is_async || !arrow.params.is_empty() {
        return escaped(arrow.span.lo);
    }

    match arrow.body.as_ref() {
        ast::BlockStmtOrExpr::BlockStmt(block) => Ok(block),
        ast::BlockStmtOrExpr::Expr(expr) => escaped(expr.span().lo),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nasync_parser::parse_script;

    #[test]
    fn test_wrapped_shape() {
        let prepared = Prepared::wrapped("1 + 1", false);
        assert_eq!(prepared.text, "(async () => {1 + 1\n})()");
        assert_eq!(prepared.shift, 14);
        assert_eq!(prepared.cell_offset(14, 5), 0);
        assert_eq!(prepared.cell_offset(100, 5), 5);
    }

    #[test]
    fn test_parenthesized_shift() {
        let prepared = Prepared::wrapped("{a: 1}", true);
        assert_eq!(prepared.text, "(async () => {({a: 1})\n})()");
        assert_eq!(prepared.cell_offset(15, 6), 0);
    }

    #[test]
    fn test_object_detection() {
        assert!(looks_like_object("  {a: 1}\n"));
        assert!(!looks_like_object("{a: 1};"));
        assert!(!looks_like_object("x = {}"));
    }

    #[test]
    fn test_locates_block() {
        let prepared = Prepared::wrapped("let a = 1\na", false);
        let parsed = parse_script(&prepared.text, "cell").unwrap();
        let block = top_block(&parsed.script).unwrap();
        assert_eq!(block.stmts.len(), 2);
    }

    #[test]
    fn test_wrapper_detection_needs_exact_suffix() {
        assert!(looks_wrapped("(async () => {return {cellReturnValue: 1}\n})()"));
        assert!(!looks_wrapped("(async () => { 1 })()"));
    }

    #[test]
    fn test_open_trailing_expression_is_not_output() {
        for (text, expected) in [
            ("(async () => {\n foo()\n})()", false),
            ("(async () => {\n foo();\n})()", true),
            ("(async () => {return {cellReturnValue: 1}\n})()", true),
        ] {
            let parsed = parse_script(text, "cell").unwrap();
            let block = top_block(&parsed.script).unwrap();
            assert_eq!(ends_like_output(block, &parsed, text), expected, "{:?}", text);
        }
    }

    #[test]
    fn test_early_close_escapes() {
        let prepared = Prepared::wrapped("1 })(); (() => {", false);
        let parsed = parse_script(&prepared.text, "cell").unwrap();
        assert!(top_block(&parsed.script).is_err());
    }
}
