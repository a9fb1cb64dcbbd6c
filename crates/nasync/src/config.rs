//! `nasync.toml` loading

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const CONFIG_FILE: &str = "nasync.toml";
pub const DEFAULT_CELL_SEPARATOR: &str = "// %%";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub run: RunConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Show the transpiled code before each cell's output
    pub show_transpiled: bool,
    /// Line marking the start of a new cell in `nasync run` input
    pub cell_separator: String,
    /// Print `undefined` results instead of hiding them
    pub print_undefined: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            show_transpiled: false,
            cell_separator: DEFAULT_CELL_SEPARATOR.to_string(),
            print_undefined: false,
        }
    }
}

impl Config {
    /// Load `path`, or `./nasync.toml` if it exists, or the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(CONFIG_FILE).exists() => Self::from_file(Path::new(CONFIG_FILE)),
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config = Self::parse(&text).with_context(|| format!("invalid {}", path.display()))?;
        log::debug!("loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}
