//! Auto-await transformer for notebook cells
//!
//! A cell is wrapped in an immediately invoked async arrow. Inside it, every
//! expression that could evaluate to a pending promise is awaited, every
//! nested function becomes async, and the final expression (unless it ends
//! with `;`) is returned as `{cellReturnValue: <expr>}`.
//!
//! ```
//! let code = nasync_transform::transform("foo()").unwrap();
//! assert_eq!(code, "(async () => {return {cellReturnValue: await (await foo)()}\n})()");
//! ```
//!
//! The output keeps every line of the cell on the same line number.

mod edit;
mod error;
mod rewrite;
mod wrap;

pub use error::TransformError;
pub use rewrite::Blocker;
pub use wrap::{WRAP_PREFIX, WRAP_SUFFIX};

use nasync_diagnostics::{Diagnostic, DiagnosticCode, Diagnostics, FileId, SourceCache, Span};
use nasync_parser::{parse_script, ParseFailure, ParsedScript};
use rewrite::Rewriter;
use wrap::Prepared;

/// The result of transforming one cell.
#[derive(Debug, Clone)]
pub struct Transpiled {
    pub code: String,
    /// Whether the cell hands a value back through its return record
    pub returns_value: bool,
    /// Hints about expressions that could not be awaited
    pub diagnostics: Diagnostics,
    pub file_id: FileId,
}

/// Transform a cell into auto-awaiting code.
pub fn transform(source: &str) -> Result<String, TransformError> {
    let mut cache = SourceCache::new();
    transform_cell(source, "cell", &mut cache).map(|transpiled| transpiled.code)
}

/// Transform a cell, registering it in `cache` so errors and hints can be
/// rendered against its source.
pub fn transform_cell(
    source: &str,
    name: &str,
    cache: &mut SourceCache,
) -> Result<Transpiled, TransformError> {
    let file_id = cache.add_cell(name, source.to_string());
    let cell_len = source.len();

    let (prepared, parsed) = prepare(source, name)
        .map_err(|(prepared, failure)| syntax_error(&prepared, failure, file_id, cell_len, cache))?;
    let top = wrap::top_block(&parsed.script).map_err(|escaped| {
        let failure = Failure::Escaped(escaped.at.0.saturating_sub(parsed.base()));
        syntax_error(&prepared, failure, file_id, cell_len, cache)
    })?;

    let rewrite = Rewriter::new(&prepared.text, &parsed).run(top);

    let mut diagnostics = Diagnostics::new();
    for hint in &rewrite.hints {
        let span = Span::new(
            file_id,
            prepared.cell_offset(hint.lo, cell_len),
            prepared.cell_offset(hint.hi, cell_len),
        );
        diagnostics.push(
            Diagnostic::hint(
                DiagnosticCode::NotAwaited,
                format!("expressions inside {} are left unawaited", hint.blocker.describe()),
            )
            .with_span(span)
            .with_help("`await` is not allowed here; move asynchronous work into a method")
            .build(),
        );
    }

    let code = rewrite.edits.apply(&prepared.text);
    log::debug!("{}: transpiled {} bytes into {} bytes", name, cell_len, code.len());

    Ok(Transpiled {
        code,
        returns_value: rewrite.returns_value,
        diagnostics,
        file_id,
    })
}

#[derive(Debug)]
enum Failure {
    Parse(ParseFailure),
    /// Offset in the prepared text where the wrapper was broken
    Escaped(u32),
}

/// Parse the prepared text and check that the wrapper is intact.
fn parse_prepared(prepared: &Prepared, name: &str) -> Result<ParsedScript, Failure> {
    let parsed = parse_script(&prepared.text, name).map_err(Failure::Parse)?;
    if let Err(escaped) = wrap::top_block(&parsed.script) {
        return Err(Failure::Escaped(escaped.at.0.saturating_sub(parsed.base())));
    }
    Ok(parsed)
}

/// Pick the text to parse: earlier output as is, an object literal in
/// parentheses, or the plain cell.
fn prepare(source: &str, name: &str) -> Result<(Prepared, ParsedScript), (Prepared, Failure)> {
    if wrap::looks_wrapped(source) {
        let prepared = Prepared::as_is(source);
        match parse_prepared(&prepared, name) {
            Ok(parsed) if is_output(&parsed, &prepared.text) => return Ok((prepared, parsed)),
            Ok(_) => log::debug!("{}: async wrapper written by the author, wrapping it", name),
            Err(failure) => log::debug!("{}: not a wrapped cell ({:?})", name, failure),
        }
    }

    if wrap::looks_like_object(source) {
        let prepared = Prepared::wrapped(source, true);
        match parse_prepared(&prepared, name) {
            Ok(parsed) => return Ok((prepared, parsed)),
            Err(_) => log::debug!("{}: braces do not form an object literal, parsing as a block", name),
        }
    }

    let prepared = Prepared::wrapped(source, false);
    match parse_prepared(&prepared, name) {
        Ok(parsed) => Ok((prepared, parsed)),
        Err(failure) => Err((prepared, failure)),
    }
}

fn is_output(parsed: &ParsedScript, text: &str) -> bool {
    wrap::top_block(&parsed.script)
        .map(|block| wrap::ends_like_output(block, parsed, text))
        .unwrap_or(false)
}

fn syntax_error(
    prepared: &Prepared,
    failure: Failure,
    file_id: FileId,
    cell_len: usize,
    cache: &SourceCache,
) -> TransformError {
    let (code, message, start, end) = match failure {
        Failure::Parse(failure) => (
            DiagnosticCode::ParseError,
            failure.message,
            failure.start,
            failure.end,
        ),
        Failure::Escaped(at) => (
            DiagnosticCode::WrapperEscape,
            "cell closes its async wrapper early".to_string(),
            at,
            at,
        ),
    };

    let start = prepared.cell_offset(start, cell_len);
    let end = prepared.cell_offset(end, cell_len).max(start);
    let (line, column) = cache
        .get_file(file_id)
        .map(|file| file.line_column(start))
        .unwrap_or((1, 1));

    TransformError::Syntax {
        code,
        message,
        span: Span::new(file_id, start, end),
        line,
        column,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrapped(body: &str) -> String {
        format!("{}{}{}", WRAP_PREFIX, body, WRAP_SUFFIX)
    }

    #[test]
    fn test_trailing_literal_is_returned() {
        assert_eq!(transform("42").unwrap(), wrapped("return {cellReturnValue: 42}"));
    }

    #[test]
    fn test_semicolon_suppresses_result() {
        assert_eq!(transform("42;").unwrap(), wrapped("42;"));
    }

    #[test]
    fn test_trailing_call_is_awaited() {
        assert_eq!(
            transform("foo()").unwrap(),
            wrapped("return {cellReturnValue: await (await foo)()}")
        );
    }

    #[test]
    fn test_trailing_member_and_assignment() {
        assert_eq!(
            transform("a.b").unwrap(),
            wrapped("return {cellReturnValue: (await a).b}")
        );
        assert_eq!(
            transform("x = 1").unwrap(),
            wrapped("return {cellReturnValue: await (x = 1)}")
        );
    }

    #[test]
    fn test_object_literal_is_returned() {
        assert_eq!(
            transform("{a: 1, b}").unwrap(),
            wrapped("return {cellReturnValue: ({a: 1, b: await b})}")
        );
    }

    #[test]
    fn test_braced_block_is_not_an_object() {
        let code = transform("{ 1 }").unwrap();
        assert_eq!(code, wrapped("{ 1 }"));
    }

    #[test]
    fn test_declarations_then_result() {
        assert_eq!(
            transform("const a = foo()\na").unwrap(),
            wrapped("const a = await (await foo)()\nreturn {cellReturnValue: await a}")
        );
    }

    #[test]
    fn test_exclusions_are_left_alone() {
        let source = "const f = async () => 1;\nlet s = `t${y}`;\nlet o = {k: v};\nx = y;\nawait z;\na.b.c;";
        assert_eq!(
            transform(source).unwrap(),
            wrapped(
                "const f = async () => 1;\nlet s = `t${await y}`;\nlet o = {k: await v};\nawait (x = y);\nawait z;\n(await a).b.c;"
            )
        );
    }

    #[test]
    fn test_statement_starting_with_paren_gets_semicolon() {
        assert_eq!(
            transform("let a = 1\nfoo.bar\n0;").unwrap(),
            wrapped("let a = 1\n;(await foo).bar\n0;")
        );
    }

    #[test]
    fn test_rewrite_happens_once() {
        let code = transform("if (x) {\n  1\n}\n2").unwrap();
        assert_eq!(
            code,
            wrapped("if (await x) {\n  1\n}\nreturn {cellReturnValue: 2}")
        );
        assert_eq!(code.matches("cellReturnValue").count(), 1);
    }

    #[test]
    fn test_operators_and_optional_chains() {
        assert_eq!(
            transform("a + b * c;").unwrap(),
            wrapped("await ((await a) + (await ((await b) * (await c))));")
        );
        assert_eq!(
            transform("obj?.a.b()").unwrap(),
            wrapped("return {cellReturnValue: await (await obj)?.a.b()}")
        );
        assert_eq!(
            transform("typeof nope").unwrap(),
            wrapped("return {cellReturnValue: await typeof nope}")
        );
        assert_eq!(transform("i++;").unwrap(), wrapped("await i++;"));
        assert_eq!(transform("delete o.k;").unwrap(), wrapped("await delete (await o).k;"));
    }

    #[test]
    fn test_functions_become_async() {
        let source = "function f() { return g() }\nconst h = x => x\nclass A { m() {} *gen() {} }";
        let code = transform(source).unwrap();

        assert!(code.contains("async function f() { return await (await g)() }"));
        assert!(code.contains("const h = async x => await x"));
        assert!(code.contains("class A { async m() {} async *gen() {} }"));
    }

    #[test]
    fn test_illegal_await_positions_produce_hints() {
        let source = "class A {\n  get p() { return q() }\n  constructor() { this.v = r() }\n  static x = foo();\n  static { bar() }\n}";
        let mut cache = SourceCache::new();
        let transpiled = transform_cell(source, "cell[1]", &mut cache).unwrap();

        assert!(transpiled.code.contains("get p() { return q() }"));
        assert!(transpiled.code.contains("constructor() { this.v = r() }"));
        assert!(transpiled.code.contains("static x = foo();"));
        assert!(transpiled.code.contains("static { bar() }"));
        assert_eq!(transpiled.diagnostics.hint_count(), 4);
        assert!(!transpiled.diagnostics.has_errors());

        let first = transpiled.diagnostics.iter().next().unwrap();
        assert_eq!(first.code, DiagnosticCode::NotAwaited);
        assert_eq!(cache.location(first.span).unwrap().line, 2);
    }

    #[test]
    fn test_nested_function_in_constructor_is_async() {
        let code = transform("class A { constructor() { this.f = () => g() } }").unwrap();
        assert!(code.contains("this.f = async () => await (await g)()"));
    }

    #[test]
    fn test_line_numbers_are_preserved() {
        let source = "let a = 1\n\nfoo(a)\n// done\nbar()";
        let code = transform(source).unwrap();
        let lines: Vec<&str> = code.lines().collect();

        assert_eq!(lines.len(), source.lines().count() + 1);
        assert_eq!(lines[1], "");
        assert_eq!(lines[2], "await (await foo)(await a)");
        assert_eq!(lines[3], "// done");
        assert_eq!(lines[4], "return {cellReturnValue: await (await bar)()}");
    }

    #[test]
    fn test_returns_value_flag() {
        let mut cache = SourceCache::new();
        assert!(transform_cell("42", "a", &mut cache).unwrap().returns_value);
        assert!(!transform_cell("42;", "b", &mut cache).unwrap().returns_value);
        assert!(transform_cell("return 5", "c", &mut cache).unwrap().returns_value);
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_syntax_error_position() {
        let err = transform("a\nb c").unwrap_err();
        let TransformError::Syntax { code, line, .. } = &err;
        assert_eq!(*code, DiagnosticCode::ParseError);
        assert_eq!(*line, 2);
        assert!(!err.message().is_empty());
        assert!(err.to_diagnostic().is_error());
    }

    #[test]
    fn test_closing_the_wrapper_is_rejected() {
        let err = transform("1 })(); (() => {").unwrap_err();
        let TransformError::Syntax { code, .. } = &err;
        assert_eq!(*code, DiagnosticCode::WrapperEscape);
        assert_eq!(err.position().0, 1);
    }

    #[test]
    fn test_author_async_wrapper_is_wrapped_again() {
        let code = transform("(async () => {\n foo()\n})()").unwrap();
        assert!(code.starts_with("(async () => {return {cellReturnValue: "));
        assert!(code.contains("await (await foo)()"));
        assert_eq!(code.lines().count(), 4);
    }

    #[test]
    fn test_transform_is_idempotent() {
        let samples = [
            "42",
            "42;",
            "foo()",
            "a.b",
            "{a: 1, b}",
            "let a = 1\nfoo.bar\n0;",
            "x = y",
            "function f() { return g() }",
            "obj?.a.b()",
            "typeof nope",
            "i++",
            "class A extends B { m() { return this.n() } }",
            "for (const x of xs) { log(x) }\nreturn done",
        ];

        for sample in samples {
            let once = transform(sample).unwrap();
            let twice = transform(&once).unwrap();
            assert_eq!(once, twice, "not idempotent for {:?}", sample);
        }
    }
}
