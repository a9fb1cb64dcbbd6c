//! Run command - executes a file of cells in one shared runtime

use anyhow::{anyhow, Result};
use clap::Args;
use nasync_diagnostics::{DiagnosticEmitter, Diagnostics, JsonEmitter, TerminalEmitter};
use nasync_jsruntime::ResultEnvelope;
use std::path::PathBuf;

use super::read_source;
use crate::cell::{CellError, CellRunner, PrettyJsonRenderer, RunOptions};
use crate::config::Config;
use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// File of cells to run (`-` reads stdin)
    #[arg(default_value = "-")]
    pub input: PathBuf,

    /// Show each cell's transpiled code
    #[arg(long)]
    pub show_transpiled: bool,

    /// Line separating cells (overrides the configuration file)
    #[arg(long)]
    pub separator: Option<String>,

    /// Print `undefined` results
    #[arg(long)]
    pub print_undefined: bool,

    /// Keep running the remaining cells after a failure
    #[arg(long)]
    pub keep_going: bool,
}

/// One cell of a multi-cell file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellSource {
    /// 1-based cell number
    pub index: usize,
    /// 1-based line of the cell's first line in the file
    pub first_line: usize,
    pub text: String,
}

/// Split `source` on lines equal to `separator` (surrounding whitespace
/// ignored). Blank cells are dropped.
pub fn split_cells(source: &str, separator: &str) -> Vec<CellSource> {
    let separator = separator.trim();
    let mut cells = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut first_line = 1;

    let mut flush = |lines: &mut Vec<&str>, first_line: usize| {
        let text = lines.join("\n");
        lines.clear();
        if !text.trim().is_empty() {
            cells.push(CellSource {
                index: cells.len() + 1,
                first_line,
                text,
            });
        }
    };

    for (number, line) in source.lines().enumerate() {
        if !separator.is_empty() && line.trim() == separator {
            flush(&mut current, first_line);
            first_line = number + 2;
        } else {
            current.push(line);
        }
    }
    flush(&mut current, first_line);
    cells
}

/// Build a runner from configuration, with command-line flags taking
/// precedence.
pub(crate) fn runner_for(
    config: &Config,
    show_transpiled: bool,
    print_undefined: bool,
    format: OutputFormat,
) -> CellRunner {
    let options = RunOptions {
        show_transpiled: show_transpiled || config.run.show_transpiled,
        print_undefined: print_undefined || config.run.print_undefined,
    };
    match format {
        OutputFormat::Text => CellRunner::with_renderer(options, Box::new(PrettyJsonRenderer)),
        OutputFormat::Json => CellRunner::new(options),
    }
}

/// Print what the runner recorded for its latest run.
pub(crate) fn report(
    runner: &CellRunner,
    name: &str,
    result: &Result<ResultEnvelope, CellError>,
    format: OutputFormat,
    use_color: bool,
) -> Result<()> {
    let output = runner.output();
    if !runner.tracker().is_current(output.run_id) {
        log::debug!("{}: dropping output of stale run {}", name, output.run_id);
        return Ok(());
    }
    let mut diagnostics = Diagnostics::new();
    diagnostics.extend(output.hints.items.iter().cloned());

    match format {
        OutputFormat::Text => {
            if let Err(CellError::Syntax(err)) = result {
                diagnostics.push(err.to_diagnostic());
            } else {
                output.render(&mut std::io::stdout().lock(), use_color)?;
            }
            let stderr = std::io::stderr();
            let mut emitter = TerminalEmitter::new(stderr.lock(), use_color);
            emitter.emit_all(&diagnostics, runner.source_cache())?;
        }
        OutputFormat::Json => {
            if let Err(err) = result {
                diagnostics.push(err.to_diagnostic());
            }
            let mut emitter = JsonEmitter::new(std::io::stdout().lock());
            emitter.emit_all(&diagnostics, runner.source_cache())?;

            let envelope = result.as_ref().ok();
            let report = serde_json::json!({
                "cell": name,
                "run_id": output.run_id,
                "running": runner.tracker().is_running(),
                "error": result.is_err(),
                "value": envelope.map(|envelope| &envelope.value),
                "source_code": envelope.map(|envelope| envelope.source_code.as_str()),
                "preview": output.preview,
                "output": output.entries,
                "rich": output.rich,
            });
            println!("{}", serde_json::to_string(&report)?);
        }
    }
    Ok(())
}

pub fn run(
    args: RunArgs,
    config: Config,
    format: OutputFormat,
    use_color: bool,
    quiet: bool,
) -> Result<()> {
    let (name, source) = read_source(&args.input)?;
    let separator = args
        .separator
        .clone()
        .unwrap_or_else(|| config.run.cell_separator.clone());
    let cells = split_cells(&source, &separator);
    log::info!("{}: {} cell(s)", name, cells.len());

    let mut runner = runner_for(&config, args.show_transpiled, args.print_undefined, format);
    let mut failed = 0;

    for cell in &cells {
        let cell_name = format!("{}#{}", name, cell.index);
        if format == OutputFormat::Text && !quiet && cells.len() > 1 {
            println!(
                "{}",
                console::style(format!("[{}] line {}", cell.index, cell.first_line))
                    .dim()
                    .force_styling(use_color)
            );
        }

        let result = runner.run(&cell_name, &cell.text);
        report(&runner, &cell_name, &result, format, use_color)?;

        if result.is_err() {
            failed += 1;
            if !args.keep_going {
                break;
            }
        }
    }

    if failed > 0 {
        if format == OutputFormat::Text {
            eprintln!(
                "{}: {} of {} cell(s) failed",
                console::style("Run failed").red().bold().force_styling(use_color),
                failed,
                cells.len()
            );
        }
        return Err(anyhow!("{} cell(s) failed", failed));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_cell_without_separator() {
        let cells = split_cells("const a = 1\na + 1\n", "// %%");
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].text, "const a = 1\na + 1");
        assert_eq!(cells[0].first_line, 1);
    }

    #[test]
    fn test_split_on_separator_lines() {
        let source = "1 + 1\n// %%\nconsole.log('a')\n  // %%  \n\n// %%\n$_";
        let cells = split_cells(source, "// %%");

        assert_eq!(
            cells,
            vec![
                CellSource {
                    index: 1,
                    first_line: 1,
                    text: "1 + 1".into()
                },
                CellSource {
                    index: 2,
                    first_line: 3,
                    text: "console.log('a')".into()
                },
                CellSource {
                    index: 3,
                    first_line: 7,
                    text: "$_".into()
                },
            ]
        );
    }

    #[test]
    fn test_separator_inside_a_line_does_not_split() {
        let cells = split_cells("x // %% y\n", "// %%");
        assert_eq!(cells.len(), 1);
    }

    #[test]
    fn test_flags_and_config_combine() {
        let mut config = Config::default();
        config.run.print_undefined = true;
        let mut runner = runner_for(&config, true, false, OutputFormat::Json);

        runner.run("cell", "void 0").unwrap();
        assert!(runner.output().preview.is_some());
        assert_eq!(runner.output().entries[0].data, vec!["undefined"]);
    }

    #[test]
    fn test_cells_share_last_result() {
        let mut runner = runner_for(&Config::default(), false, false, OutputFormat::Json);
        let cells = split_cells("Promise.resolve(20)\n// %%\n$_ + 22", "// %%");

        runner.run("a", &cells[0].text).unwrap();
        let envelope = runner.run("b", &cells[1].text).unwrap();
        assert_eq!(envelope.value, nasync_jsruntime::CellValue::Number(42.0));
    }
}
