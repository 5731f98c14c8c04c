//! Terminal output for `terra`
//!
//! Tokens and JSON go to stdout untouched so they can be captured with
//! `$(terra token)`. Problems go to stderr.

use crate::error::Result;
use console::style;
use serde::Serialize;
use std::fmt::Display;
use std::path::Path;

/// Pretty-printed JSON on stdout
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn success(message: impl Display) {
    println!("{} {message}", style("✓").green().bold());
}

pub fn note(message: impl Display) {
    println!("{} {message}", style("•").cyan());
}

pub fn problem(message: impl Display) {
    eprintln!("{} {}", style("!").yellow().bold(), style(message).yellow());
}

/// Show `path` with `~` in place of the home directory
pub fn display_path(path: &Path) -> String {
    etcetera::home_dir()
        .ok()
        .and_then(|home| {
            path.strip_prefix(home)
                .ok()
                .map(|rest| format!("~/{}", rest.display()))
        })
        .unwrap_or_else(|| path.display().to_string())
}
