//! Small shared helpers for human console output.

use std::io::{self, Write};

/// Shared width for console separators.
pub const RULE_WIDTH: usize = 48;

/// Write a horizontal separator.
pub fn rule(w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "{:-<width$}", "", width = RULE_WIDTH)
}

/// Write a section heading followed by a separator.
pub fn section(w: &mut dyn Write, heading: &str) -> io::Result<()> {
    writeln!(w, "{heading}")?;
    rule(w)
}

/// Render a left-aligned key/value line.
pub fn kv(w: &mut dyn Write, key: &str, value: impl AsRef<str>) -> io::Result<()> {
    writeln!(w, "  {:<12} {}", format!("{key}:"), value.as_ref())
}
