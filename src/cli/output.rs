//! Shared CLI output helpers.
//!
//! Color scheme (console handles NO_COLOR/terminal detection):
//! - Green: success
//! - Red: errors
//! - Yellow: warnings
//! - Cyan: identifiers, hints
//! - Dimmed: secondary info

use console::style;
use std::fmt::Display;

const RULE_WIDTH: usize = 56;

/// Print a success message with checkmark.
///
/// Example: `✓ rotation complete`
pub fn success(msg: &str) {
    println!("{} {}", style("✓").green(), msg);
}

/// Print an error message to stderr.
pub fn error(msg: &str) {
    eprintln!("{} {}", style("✗").red(), msg);
}

/// Print a warning message.
pub fn warn(msg: &str) {
    println!("{} {}", style("⚠").yellow(), msg);
}

/// Print a hint message.
///
/// Example: `→ run keyturn init first`
pub fn hint(msg: &str) {
    println!("{} {}", style("→").cyan(), style(msg).cyan());
}

/// Print a key-value pair (label dimmed, value bold).
pub fn kv(label: &str, value: impl Display) {
    println!("  {}  {}", style(label).dim(), style(value).bold());
}

/// Print a dimmed/secondary message.
pub fn dimmed(msg: &str) {
    println!("{}", style(msg).dim());
}

/// Print a section header with a separator line.
pub fn section(title: &str) {
    println!();
    println!("{}", style(title).bold());
    println!("{}", style("─".repeat(RULE_WIDTH)).dim());
}
