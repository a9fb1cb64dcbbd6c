//! Native ops backing the cell `console`
//!
//! Cells print through `console.*`; the bootstrap routes every call to
//! `op_nasync_print`, which records the line for the cell runner.

use deno_core::{extension, op2, OpState};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleLevel {
    Log,
    Info,
    Warn,
    Error,
    Debug,
}

impl ConsoleLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsoleLevel::Log => "log",
            ConsoleLevel::Info => "info",
            ConsoleLevel::Warn => "warn",
            ConsoleLevel::Error => "error",
            ConsoleLevel::Debug => "debug",
        }
    }

    fn parse(level: &str) -> Self {
        match level {
            "info" => ConsoleLevel::Info,
            "warn" => ConsoleLevel::Warn,
            "error" => ConsoleLevel::Error,
            "debug" => ConsoleLevel::Debug,
            _ => ConsoleLevel::Log,
        }
    }
}

impl fmt::Display for ConsoleLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `console.*` call made by a cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsoleLine {
    pub level: ConsoleLevel,
    pub text: String,
}

/// Lines printed since the last drain.
#[derive(Debug, Default)]
pub struct ConsoleCapture {
    lines: Vec<ConsoleLine>,
}

impl ConsoleCapture {
    pub fn take(&mut self) -> Vec<ConsoleLine> {
        std::mem::take(&mut self.lines)
    }
}

#[op2(fast)]
fn op_nasync_print(state: &mut OpState, #[string] level: String, #[string] text: String) {
    let level = ConsoleLevel::parse(&level);
    log::info!("[JS {}] {}", level, text);
    state
        .borrow_mut::<ConsoleCapture>()
        .lines
        .push(ConsoleLine { level, text });
}

extension!(
    nasync_console,
    ops = [op_nasync_print],
    state = |state| {
        state.put(ConsoleCapture::default());
    },
);

/// Installs `console` on the global object. Arguments are joined with
/// spaces; objects are shown as JSON when they survive `JSON.stringify`.
pub(crate) const CONSOLE_JS: &str = r#"
  const show = (value) => {
    if (typeof value === "string") return value;
    if (value instanceof Error) return value.stack ?? String(value);
    if (typeof value === "object" && value !== null) {
      try {
        const json = JSON.stringify(value);
        if (json !== undefined) return json;
      } catch (_) {}
    }
    return String(value);
  };
  const printer = (level) => (...args) =>
    Deno.core.ops.op_nasync_print(level, args.map(show).join(" "));
  globalThis.console = {
    log: printer("log"),
    info: printer("info"),
    warn: printer("warn"),
    error: printer("error"),
    debug: printer("debug"),
  };
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parsing() {
        assert_eq!(ConsoleLevel::parse("warn"), ConsoleLevel::Warn);
        assert_eq!(ConsoleLevel::parse("trace"), ConsoleLevel::Log);
        assert_eq!(ConsoleLevel::Debug.to_string(), "debug");
    }

    #[test]
    fn test_capture_drains() {
        let mut capture = ConsoleCapture::default();
        capture.lines.push(ConsoleLine {
            level: ConsoleLevel::Info,
            text: "hi".into(),
        });

        assert_eq!(capture.take().len(), 1);
        assert!(capture.take().is_empty());
    }
}
