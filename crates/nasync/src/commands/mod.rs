//! CLI command implementations

pub mod explain;
pub mod repl;
pub mod run;
pub mod transpile;

use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;

/// Read a source file, or stdin for `-`. Returns the display name and text.
pub fn read_source(path: &Path) -> Result<(String, String)> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read stdin")?;
        return Ok(("<stdin>".to_string(), text));
    }

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok((path.display().to_string(), text))
}
