//! Running one cell end to end
//!
//! [`CellRunner`] is the consumer side of the pipeline: it transpiles a cell,
//! executes it, and records what a notebook would show for it as a list of
//! [`OutputEntry`]s. Failures are recorded first and then handed back to the
//! caller as a [`CellError`].

use nasync_diagnostics::{Diagnostic, DiagnosticCode, Diagnostics, SourceCache};
use nasync_jsruntime::{CellValue, ConsoleLevel, ConsoleLine, ResultEnvelope, ThrownValue};
use nasync_transform::TransformError;
use serde::Serialize;
use std::io::{self, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CellError {
    #[error(transparent)]
    Syntax(#[from] TransformError),

    #[error(transparent)]
    Evaluation(ThrownValue),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl CellError {
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            CellError::Syntax(err) => err.to_diagnostic(),
            CellError::Evaluation(thrown) => {
                Diagnostic::error(DiagnosticCode::EvaluationError, thrown.to_string()).build()
            }
            CellError::Internal(err) => {
                Diagnostic::error(DiagnosticCode::InternalError, format!("{:#}", err)).build()
            }
        }
    }
}

/// Tracks which run of a cell is the latest one.
#[derive(Debug, Default)]
pub struct RunTracker {
    last_run_id: u64,
    running: bool,
}

impl RunTracker {
    pub fn start(&mut self) -> u64 {
        self.last_run_id += 1;
        self.running = true;
        self.last_run_id
    }

    pub fn is_current(&self, run_id: u64) -> bool {
        run_id == self.last_run_id
    }

    /// Only the latest run clears the running flag.
    pub fn finish(&mut self, run_id: u64) {
        if self.is_current(run_id) {
            self.running = false;
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMethod {
    Log,
    Info,
    Warn,
    Error,
    Debug,
    Result,
}

impl From<ConsoleLevel> for OutputMethod {
    fn from(level: ConsoleLevel) -> Self {
        match level {
            ConsoleLevel::Log => OutputMethod::Log,
            ConsoleLevel::Info => OutputMethod::Info,
            ConsoleLevel::Warn => OutputMethod::Warn,
            ConsoleLevel::Error => OutputMethod::Error,
            ConsoleLevel::Debug => OutputMethod::Debug,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputEntry {
    pub method: OutputMethod,
    pub data: Vec<String>,
}

impl OutputEntry {
    pub fn result(value: &CellValue) -> Self {
        Self {
            method: OutputMethod::Result,
            data: vec![value.to_string()],
        }
    }

    fn console(line: ConsoleLine) -> Self {
        Self {
            method: line.level.into(),
            data: vec![line.text],
        }
    }
}

/// An error entry: the message, then the stack without its leading copy of
/// the message. Values without a stack are shown as they are.
pub fn error_entry(thrown: &ThrownValue) -> OutputEntry {
    let message = thrown.to_string();
    let data = match thrown.stack() {
        Some(stack) => {
            let stack = stack.strip_prefix(message.as_str()).unwrap_or(stack);
            vec![message, stack.to_string()]
        }
        None => vec![message],
    };
    OutputEntry {
        method: OutputMethod::Error,
        data,
    }
}

/// Display-only markdown for the transpiled code.
pub fn markdown_preview(code: &str) -> String {
    format!("```javascript\n{}\n```", code)
}

/// Gets the first look at a cell's value. Returning text takes over the
/// display and no `result` entry is recorded.
pub trait RichRenderer {
    fn try_render(&mut self, value: &CellValue) -> Option<String>;
}

/// Leaves every value to the plain `result` entry.
#[derive(Debug, Default)]
pub struct PlainRenderer;

impl RichRenderer for PlainRenderer {
    fn try_render(&mut self, _value: &CellValue) -> Option<String> {
        None
    }
}

/// Pretty-prints objects and arrays that span more than one field.
#[derive(Debug, Default)]
pub struct PrettyJsonRenderer;

impl RichRenderer for PrettyJsonRenderer {
    fn try_render(&mut self, value: &CellValue) -> Option<String> {
        let CellValue::Json(json) = value else {
            return None;
        };
        let fields = match json {
            serde_json::Value::Object(map) => map.len(),
            serde_json::Value::Array(items) => items.len(),
            _ => 0,
        };
        if fields < 2 {
            return None;
        }
        serde_json::to_string_pretty(json).ok()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub show_transpiled: bool,
    pub print_undefined: bool,
}

/// Everything recorded for the latest run.
#[derive(Debug, Clone, Default)]
pub struct CellOutput {
    pub run_id: u64,
    pub preview: Option<String>,
    pub entries: Vec<OutputEntry>,
    pub rich: Option<String>,
    pub hints: Diagnostics,
}

impl CellOutput {
    pub fn render<W: Write>(&self, writer: &mut W, use_color: bool) -> io::Result<()> {
        if let Some(ref preview) = self.preview {
            writeln!(writer, "{}", console::style(preview).dim().force_styling(use_color))?;
        }
        for entry in &self.entries {
            render_entry(writer, entry, use_color)?;
        }
        if let Some(ref rich) = self.rich {
            writeln!(writer, "{}", rich)?;
        }
        Ok(())
    }
}

fn render_entry<W: Write>(writer: &mut W, entry: &OutputEntry, use_color: bool) -> io::Result<()> {
    let text = entry.data.join("");
    let styled = match entry.method {
        OutputMethod::Error => console::style(text).red(),
        OutputMethod::Warn => console::style(text).yellow(),
        OutputMethod::Debug => console::style(text).dim(),
        OutputMethod::Result => console::style(text).cyan(),
        OutputMethod::Log | OutputMethod::Info => console::style(text),
    };
    writeln!(writer, "{}", styled.force_styling(use_color))
}

pub struct CellRunner {
    tracker: RunTracker,
    renderer: Box<dyn RichRenderer>,
    options: RunOptions,
    cache: SourceCache,
    output: CellOutput,
}

impl CellRunner {
    pub fn new(options: RunOptions) -> Self {
        Self::with_renderer(options, Box::new(PlainRenderer))
    }

    pub fn with_renderer(options: RunOptions, renderer: Box<dyn RichRenderer>) -> Self {
        Self {
            tracker: RunTracker::default(),
            renderer,
            options,
            cache: SourceCache::new(),
            output: CellOutput::default(),
        }
    }

    /// Output of the latest run, including failed ones.
    pub fn output(&self) -> &CellOutput {
        &self.output
    }

    /// Sources of every cell run so far, for rendering diagnostics.
    pub fn source_cache(&self) -> &SourceCache {
        &self.cache
    }

    pub fn tracker(&self) -> &RunTracker {
        &self.tracker
    }

    pub fn run(&mut self, name: &str, source: &str) -> Result<ResultEnvelope, CellError> {
        let run_id = self.tracker.start();
        self.output = CellOutput {
            run_id,
            ..CellOutput::default()
        };

        let result = self.run_inner(name, source);
        if let Err(ref err) = result {
            if !matches!(err, CellError::Evaluation(_)) {
                self.output.entries.push(OutputEntry {
                    method: OutputMethod::Error,
                    data: vec![err.to_string()],
                });
            }
            log::debug!("{}: run {} failed: {}", name, run_id, err);
        }

        self.tracker.finish(run_id);
        result
    }

    fn run_inner(&mut self, name: &str, source: &str) -> Result<ResultEnvelope, CellError> {
        let transpiled = nasync_transform::transform_cell(source, name, &mut self.cache)?;
        self.output.hints = transpiled.diagnostics;
        if self.options.show_transpiled {
            self.output.preview = Some(markdown_preview(&transpiled.code));
        }

        let envelope = nasync_jsruntime::execute_blocking(&transpiled.code)?;
        for line in nasync_jsruntime::take_console()? {
            self.output.entries.push(OutputEntry::console(line));
        }

        let value = &envelope.value;
        if let Some(rich) = self.renderer.try_render(value) {
            self.output.rich = Some(rich);
        } else if let Some(thrown) = envelope.thrown() {
            self.output.entries.push(error_entry(thrown));
        } else if !value.is_undefined() || self.options.print_undefined {
            self.output.entries.push(OutputEntry::result(value));
        }

        match envelope.thrown() {
            Some(thrown) => Err(CellError::Evaluation(thrown.clone())),
            None => Ok(envelope),
        }
    }
}
