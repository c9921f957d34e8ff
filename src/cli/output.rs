//! Shared CLI output helpers.
//!
//! Color scheme (respects NO_COLOR):
//! - Green: success, good signatures
//! - Red: errors, bad signatures
//! - Yellow: warnings
//! - Cyan: paths, fingerprints, hints
//! - Bold: headers, important values
//! - Dimmed: secondary info
//!
//! Command data (plaintext, signed text, JSON) goes to stdout through
//! [`data`] and [`raw`]. Everything a human reads about that data goes to
//! stderr, so the stdout of `sign` and `verify` stays pipeable.

use std::fmt::Display;
use std::io::{self, Write};

use console::{style, StyledObject};

const RULE_WIDTH: usize = 56;

/// Check if color output is disabled via NO_COLOR env var.
fn colors_enabled() -> bool {
    std::env::var_os("NO_COLOR").is_none()
}

fn styled<D>(val: D) -> StyledObject<D> {
    let s = style(val).for_stderr();
    if colors_enabled() {
        s
    } else {
        s.force_styling(false)
    }
}

/// Print a success message with checkmark (green).
///
/// Example: `✓ encrypted notes.txt.gpg`
pub fn success(msg: &str) {
    eprintln!("{} {}", styled("✓").green(), msg);
}

/// Print an error message to stderr (red).
///
/// Example: `✗ file not found`
pub fn error(msg: &str) {
    eprintln!("{} {}", styled("✗").red(), msg);
}

/// Print a warning message (yellow).
pub fn warn(msg: &str) {
    eprintln!("{} {}", styled("⚠").yellow(), msg);
}

/// Print a hint message (cyan).
///
/// Example: `→ install GnuPG 2.2 or newer`
pub fn hint(msg: &str) {
    eprintln!("{} {}", styled("→").cyan(), styled(msg).cyan());
}

/// Print a bold section header.
pub fn header(title: &str) {
    eprintln!("{}", styled(title).bold());
}

/// Print a key-value pair (label dimmed, value bold).
///
/// Example: `  version:  2.4.5`
pub fn kv(label: &str, value: impl Display) {
    eprintln!("  {}  {}", styled(label).dim(), styled(value).bold());
}

/// Print a list item with bullet.
pub fn list_item(item: impl Display) {
    eprintln!("  • {}", item);
}

/// Print a horizontal rule separator.
pub fn rule() {
    eprintln!("{}", styled("─".repeat(RULE_WIDTH)).dim());
}

/// Print a dimmed/secondary message.
pub fn dimmed(msg: &str) {
    eprintln!("{}", styled(msg).dim());
}

/// Print an empty line.
pub fn blank() {
    eprintln!();
}

/// Format a path in cyan.
pub fn path(p: impl AsRef<std::path::Path>) -> String {
    styled(p.as_ref().display().to_string()).cyan().to_string()
}

/// Format a fingerprint or key id in cyan.
pub fn key(k: &str) -> String {
    styled(k).cyan().to_string()
}

/// Format a count in bold.
pub fn count(n: usize) -> String {
    styled(n).bold().to_string()
}

/// Format a verdict: green when good, red otherwise.
pub fn verdict(good: bool, label: &str) -> String {
    if good {
        styled(label).green().to_string()
    } else {
        styled(label).red().to_string()
    }
}

/// Print a line of command output to stdout.
pub fn data(line: &str) {
    println!("{}", line);
}

/// Write bytes to stdout unchanged.
pub fn raw(bytes: &[u8]) -> io::Result<()> {
    let mut out = io::stdout().lock();
    out.write_all(bytes)?;
    out.flush()
}

/// Print a section header with a separator line.
pub fn section(title: &str) {
    blank();
    header(title);
    rule();
}
