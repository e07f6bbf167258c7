//! Output formatting for the CLI.
//!
//! Text goes to stdout with colored markers, JSON documents go to stdout as
//! pretty-printed objects, and diagnostics go to stderr.

use colored::Colorize;
use serde::Serialize;

use crate::{Context, OutputFormat};

/// Print a result document when JSON output is selected.
pub fn json<T: Serialize>(value: &T, ctx: &Context) -> anyhow::Result<()> {
    if ctx.quiet || ctx.format != OutputFormat::Json {
        return Ok(());
    }
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a block of text output (reports, tables).
pub fn text(block: impl std::fmt::Display, ctx: &Context) {
    if ctx.quiet || ctx.format != OutputFormat::Text {
        return;
    }
    print!("{block}");
}

/// Print a success message.
pub fn success(msg: &str, ctx: &Context) {
    if ctx.quiet || ctx.format != OutputFormat::Text {
        return;
    }
    println!("{} {}", "✓".green().bold(), msg);
}

/// Print an informational line.
pub fn info(msg: &str, ctx: &Context) {
    if ctx.quiet || ctx.format != OutputFormat::Text {
        return;
    }
    println!("{}", msg);
}

/// Print a warning. Warnings are shown in both formats since they go to stderr.
pub fn warning(msg: &str, ctx: &Context) {
    if ctx.quiet {
        return;
    }
    eprintln!("{} {}", "⚠".yellow().bold(), msg);
}

/// Print a fatal error with its cause chain.
pub fn error(err: &anyhow::Error) {
    eprintln!("{} {}", "✗".red().bold(), err);
    for cause in err.chain().skip(1) {
        eprintln!("  {} {}", "caused by:".dimmed(), cause);
    }
}
