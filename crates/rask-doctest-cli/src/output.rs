// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Coloured summary lines on stderr.
//!
//! Respects NO_COLOR and FORCE_COLOR.

use colored::{ColoredString, Colorize};

use rask_doctest::Report;

/// Initialize color support based on environment.
/// Call once at startup.
pub fn init() {
    if std::env::var_os("NO_COLOR").is_some() {
        colored::control::set_override(false);
    } else if std::env::var_os("FORCE_COLOR").is_some() {
        colored::control::set_override(true);
    }
}

pub fn error_label() -> ColoredString {
    "error".red().bold()
}

pub fn note_label() -> ColoredString {
    "note".cyan()
}

pub fn status_pass() -> ColoredString {
    "✓".green()
}

pub fn status_fail() -> ColoredString {
    "✗".red()
}

pub fn file_path(path: &str) -> ColoredString {
    path.underline()
}

/// One line for the verdict, plus a note when the workspace was kept.
pub fn summary(report: &Report) -> String {
    let mut line = match report.fail_reason() {
        None => format!(
            "{} {} {}",
            status_pass(),
            file_path(&report.file),
            format!("{} passed", report.operation).green()
        ),
        Some(reason) => format!(
            "{} {} {}: {}",
            status_fail(),
            file_path(&report.file),
            format!("{} failed", report.operation).red().bold(),
            reason
        ),
    };
    if let Some(path) = &report.workspace {
        line.push_str(&format!(
            "\n{}: workspace kept at {}",
            note_label(),
            file_path(&path.display().to_string())
        ));
    }
    line
}
