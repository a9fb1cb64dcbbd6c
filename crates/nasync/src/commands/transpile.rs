//! Transpile command - prints the auto-awaiting form of a cell

use anyhow::{anyhow, Result};
use clap::Args;
use nasync_diagnostics::{DiagnosticEmitter, Diagnostics, JsonEmitter, SourceCache, TerminalEmitter};
use std::path::PathBuf;

use super::read_source;
use crate::cell::markdown_preview;
use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct TranspileArgs {
    /// Cell file to transpile (`-` reads stdin)
    #[arg(default_value = "-")]
    pub input: PathBuf,

    /// Print the code as a markdown javascript block
    #[arg(long)]
    pub markdown: bool,

    /// Hide hints about expressions left unawaited
    #[arg(long)]
    pub no_hints: bool,
}

pub fn run(args: TranspileArgs, format: OutputFormat, use_color: bool) -> Result<()> {
    let (name, source) = read_source(&args.input)?;
    let mut cache = SourceCache::new();

    let result = nasync_transform::transform_cell(&source, &name, &mut cache);
    let mut diagnostics = Diagnostics::new();
    let transpiled = match result {
        Ok(transpiled) => {
            if !args.no_hints {
                diagnostics.extend(transpiled.diagnostics.items.iter().cloned());
            }
            Some(transpiled)
        }
        Err(err) => {
            diagnostics.push(err.to_diagnostic());
            None
        }
    };

    match format {
        OutputFormat::Text => {
            let stderr = std::io::stderr();
            let mut emitter = TerminalEmitter::new(stderr.lock(), use_color);
            emitter.emit_all(&diagnostics, &cache)?;

            if let Some(ref transpiled) = transpiled {
                if args.markdown {
                    println!("{}", markdown_preview(&transpiled.code));
                } else {
                    println!("{}", transpiled.code);
                }
            }
        }
        OutputFormat::Json => {
            let mut emitter = JsonEmitter::new(std::io::stdout().lock());
            emitter.emit_all(&diagnostics, &cache)?;

            if let Some(ref transpiled) = transpiled {
                let output = serde_json::json!({
                    "file": name,
                    "code": transpiled.code,
                    "returns_value": transpiled.returns_value,
                    "hints": transpiled.diagnostics.hint_count(),
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
        }
    }

    match transpiled {
        Some(_) => Ok(()),
        None => Err(anyhow!("Transpilation of {} failed", name)),
    }
}
