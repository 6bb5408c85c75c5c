//! Statement numbering for source fixtures.
//!
//! Prefixes every assignment, call, `while` and `if` header with a running
//! `<k>. ` so fixture authors can refer to statements by number.

use anyhow::{Context, Result};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static STATEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:call\s+\w+\s*;|\w+\s*=.*;|while\s+\w+\s*\{|if\s+\w+\s*then\s*\{)")
        .expect("statement pattern is valid")
});

/// Numbers the statement lines of `text`, leaving every other line untouched.
pub fn number_statements(text: &str) -> String {
    let mut count = 0usize;
    let mut out = String::with_capacity(text.len() + text.len() / 8);
    for line in text.split_inclusive('\n') {
        if STATEMENT.is_match(line) {
            count += 1;
            out.push_str(&format!("{count}. "));
        }
        out.push_str(line);
    }
    out
}

/// `dir/source1.txt` -> `dir/source1numbered.txt`
pub fn numbered_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match input.extension() {
        Some(ext) => format!("{stem}numbered.{}", ext.to_string_lossy()),
        None => format!("{stem}numbered"),
    };
    input.with_file_name(name)
}

/// Writes the numbered copy of `input` next to it and returns its path.
pub fn number_file(input: &Path) -> Result<PathBuf> {
    let text = fs::read_to_string(input)
        .with_context(|| format!("cannot read {}", input.display()))?;
    let output = numbered_path(input);
    fs::write(&output, number_statements(&text))
        .with_context(|| format!("cannot write {}", output.display()))?;
    Ok(output)
}
