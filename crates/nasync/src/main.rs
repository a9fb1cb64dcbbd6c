//! nasync - auto-awaiting JavaScript cells
//!
//! CLI driver for transpiling and running notebook-style JavaScript cells.

mod cell;
mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Auto-awaiting JavaScript cells
#[derive(Parser, Debug)]
#[command(name = "nasync")]
#[command(author, version, about = "Run JavaScript cells that await everything for you")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Configuration file (defaults to ./nasync.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the auto-awaiting form of a cell
    Transpile(commands::transpile::TranspileArgs),

    /// Run a file of cells
    Run(commands::run::RunArgs),

    /// Read and run cells interactively
    Repl(commands::repl::ReplArgs),

    /// Explain a diagnostic code
    Explain(commands::explain::ExplainArgs),
}

fn log_filter(verbose: u8, quiet: bool) -> &'static str {
    match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        _ => "trace",
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(log_filter(cli.verbose, cli.quiet)),
    )
    .init();

    // Determine if colors should be used
    let use_color = !cli.no_color && !cli.quiet && atty::is(atty::Stream::Stdout);

    let Some(command) = cli.command else {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        cmd.print_help()?;
        println!();
        return Ok(());
    };

    match command {
        Commands::Transpile(args) => commands::transpile::run(args, cli.format, use_color),
        Commands::Run(args) => {
            let config = config::Config::load(cli.config.as_deref())?;
            commands::run::run(args, config, cli.format, use_color, cli.quiet)
        }
        Commands::Repl(args) => {
            let config = config::Config::load(cli.config.as_deref())?;
            commands::repl::run(args, config, cli.format, use_color)
        }
        Commands::Explain(args) => commands::explain::run(args, cli.format, use_color),
    }
}
