//! Repl command - reads cells from stdin and runs them as they complete

use anyhow::Result;
use clap::Args;
use std::io::{self, BufRead, Write};

use super::run::{report, runner_for};
use crate::config::Config;
use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct ReplArgs {
    /// Show each cell's transpiled code
    #[arg(long)]
    pub show_transpiled: bool,

    /// Print `undefined` results
    #[arg(long)]
    pub print_undefined: bool,
}

const HELP: &str = "\
.help    show this message
.reset   start over with a fresh runtime
.exit    quit
A cell runs once its brackets are balanced; an empty line runs it as is.";

/// Whether `text` has no open brackets, strings or block comments left.
fn is_complete(text: &str) -> bool {
    let mut depth: i32 = 0;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            '"' | '\'' | '`' => {
                let mut closed = false;
                while let Some(next) = chars.next() {
                    if next == '\\' {
                        chars.next();
                    } else if next == c {
                        closed = true;
                        break;
                    } else if next == '\n' && c != '`' {
                        break;
                    }
                }
                if !closed && c == '`' {
                    return false;
                }
            }
            '/' if chars.peek() == Some(&'/') => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut closed = false;
                let mut star = false;
                for next in chars.by_ref() {
                    if star && next == '/' {
                        closed = true;
                        break;
                    }
                    star = next == '*';
                }
                if !closed {
                    return false;
                }
            }
            _ => {}
        }
    }

    depth <= 0
}

fn prompt(text: &str, interactive: bool) -> io::Result<()> {
    if interactive {
        let mut stdout = io::stdout().lock();
        write!(stdout, "{}", text)?;
        stdout.flush()?;
    }
    Ok(())
}

pub fn run(args: ReplArgs, config: Config, format: OutputFormat, use_color: bool) -> Result<()> {
    let mut runner = runner_for(&config, args.show_transpiled, args.print_undefined, format);
    let interactive = atty::is(atty::Stream::Stdin) && format == OutputFormat::Text;
    let mut buffer = String::new();
    let mut count = 0;

    prompt("> ", interactive)?;
    for line in io::stdin().lock().lines() {
        let line = line?;

        if buffer.is_empty() {
            match line.trim() {
                "" => {
                    prompt("> ", interactive)?;
                    continue;
                }
                ".exit" => break,
                ".help" => {
                    println!("{}", HELP);
                    prompt("> ", interactive)?;
                    continue;
                }
                ".reset" => {
                    nasync_jsruntime::reset_executor();
                    nasync_jsruntime::ResultSlot::global().reset();
                    log::info!("runtime reset");
                    prompt("> ", interactive)?;
                    continue;
                }
                _ => {}
            }
        }

        buffer.push_str(&line);
        buffer.push('\n');
        if !line.trim().is_empty() && !is_complete(&buffer) {
            prompt("... ", interactive)?;
            continue;
        }

        count += 1;
        let name = format!("<repl>#{}", count);
        let source = std::mem::take(&mut buffer);
        let result = runner.run(&name, source.trim_end());
        report(&runner, &name, &result, format, use_color)?;
        prompt("> ", interactive)?;
    }

    if !buffer.trim().is_empty() {
        count += 1;
        let name = format!("<repl>#{}", count);
        let result = runner.run(&name, buffer.trim_end());
        report(&runner, &name, &result, format, use_color)?;
    }
    if interactive {
        println!();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balanced_input_is_complete() {
        assert!(is_complete("1 + 1\n"));
        assert!(is_complete("function f() { return [1, 2] }\n"));
        assert!(is_complete("const s = '{'\n"));
        assert!(is_complete("x // (\n"));
    }

    #[test]
    fn test_open_input_is_incomplete() {
        assert!(!is_complete("function f() {\n"));
        assert!(!is_complete("foo(1,\n"));
        assert!(!is_complete("const t = `line\n"));
        assert!(!is_complete("/* note\n"));
    }

    #[test]
    fn test_comments_and_escapes() {
        assert!(is_complete("/* { */ 1\n"));
        assert!(is_complete("'it\\'s'\n"));
        assert!(!is_complete("\"}\" + {\n"));
    }
}
