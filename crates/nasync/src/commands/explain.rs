//! Explain command - describes diagnostic codes

use anyhow::{anyhow, Result};
use clap::Args;

use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct ExplainArgs {
    /// Diagnostic code to explain (e.g., P001, H001)
    pub code: String,
}

struct Explanation {
    code: &'static str,
    title: &'static str,
    description: &'static str,
    example: Option<&'static str>,
    suggestion: Option<&'static str>,
    related: &'static [&'static str],
}

const EXPLANATIONS: &[Explanation] = &[
    Explanation {
        code: "P001",
        title: "Parse Error",
        description: "The cell is not valid JavaScript. Cells are parsed as the body of an async arrow function, so `await` is always allowed but `import` and `export` are not.",
        example: Some("let = ;"),
        suggestion: Some("Fix the syntax error at the reported line and column."),
        related: &["P002"],
    },
    Explanation {
        code: "P002",
        title: "Cell Escapes Its Wrapper",
        description: "Every cell runs inside `(async () => { ... })()`. A cell with an unmatched `}` closes that function early and the rest of the cell would run outside it.",
        example: Some("}); (async () => {"),
        suggestion: Some("Balance the braces in the cell."),
        related: &["P001"],
    },
    Explanation {
        code: "H001",
        title: "Expression Left Unawaited",
        description: "`await` is not allowed in constructors, getters, setters, class field initializers, static blocks or parameter defaults. Expressions there run as written and any promise they produce stays a promise.",
        example: Some("class Store {\n  constructor() { this.data = fetch(url) }  // data is a promise\n}"),
        suggestion: Some("Move the asynchronous work into a regular method and call it after construction."),
        related: &[],
    },
    Explanation {
        code: "E001",
        title: "Evaluation Error",
        description: "The cell threw, or awaited a promise that rejected. The thrown value is shown as the cell's output and later cells keep running only with --keep-going.",
        example: Some("JSON.parse(\"{\")"),
        suggestion: Some("Read the message and stack printed for the cell."),
        related: &[],
    },
    Explanation {
        code: "I001",
        title: "Internal Error",
        description: "The JavaScript runtime could not be started or the cell result could not be read back.",
        example: None,
        suggestion: Some("Rerun with -vv for debug logs and report the output."),
        related: &[],
    },
];

fn lookup(code: &str) -> Result<&'static Explanation> {
    let code = code.to_uppercase();
    EXPLANATIONS
        .iter()
        .find(|e| e.code == code)
        .ok_or_else(|| anyhow!("Unknown diagnostic code: {}", code))
}

pub fn run(args: ExplainArgs, format: OutputFormat, use_color: bool) -> Result<()> {
    let explanation = lookup(&args.code)?;
    let code = explanation.code;

    match format {
        OutputFormat::Text => {
            if use_color {
                println!(
                    "\n{}: {}\n{}",
                    console::style(code).bold().cyan(),
                    console::style(explanation.title).bold(),
                    "=".repeat(code.len() + explanation.title.len() + 2)
                );
            } else {
                println!(
                    "\n{}: {}\n{}",
                    code,
                    explanation.title,
                    "=".repeat(code.len() + explanation.title.len() + 2)
                );
            }

            println!("\n{}\n", explanation.description);

            if let Some(example) = explanation.example {
                if use_color {
                    println!("{}:", console::style("Example").bold());
                } else {
                    println!("Example:");
                }
                for line in example.lines() {
                    println!("  {}", line);
                }
                println!();
            }

            if let Some(suggestion) = explanation.suggestion {
                if use_color {
                    println!("{}:", console::style("Suggestion").bold().green());
                } else {
                    println!("Suggestion:");
                }
                println!("  {}\n", suggestion);
            }

            if !explanation.related.is_empty() {
                if use_color {
                    println!(
                        "{}: {}",
                        console::style("Related").dim(),
                        explanation.related.join(", ")
                    );
                } else {
                    println!("Related: {}", explanation.related.join(", "));
                }
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "code": explanation.code,
                "title": explanation.title,
                "description": explanation.description,
                "example": explanation.example,
                "suggestion": explanation.suggestion,
                "related": explanation.related,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nasync_diagnostics::DiagnosticCode;

    #[test]
    fn test_every_code_is_explained() {
        for code in [
            DiagnosticCode::ParseError,
            DiagnosticCode::WrapperEscape,
            DiagnosticCode::NotAwaited,
            DiagnosticCode::EvaluationError,
            DiagnosticCode::InternalError,
        ] {
            assert!(lookup(code.as_str()).is_ok(), "{} has no explanation", code);
        }
    }

    #[test]
    fn test_lookup_ignores_case() {
        assert_eq!(lookup("h001").unwrap().title, "Expression Left Unawaited");
        assert!(lookup("X999").is_err());
    }
}
