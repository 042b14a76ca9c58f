use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use qmpar_core::Subject;

/// Parse a subjects file: one `<name> [guess_file]` per line.
/// Blank lines and `#` comments are skipped.
pub fn parse(content: &str) -> Result<Vec<Subject>> {
    let mut subjects = Vec::new();
    let mut seen = HashSet::new();
    for (lineno, line) in content.lines().enumerate() {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let mut fields = line.split_whitespace();
        let Some(name) = fields.next() else {
            continue;
        };
        if !seen.insert(name) {
            bail!("line {}: duplicate subject `{}`", lineno + 1, name);
        }
        let mut subject = Subject::new(name);
        if let Some(guess) = fields.next() {
            subject.guess_files.push(PathBuf::from(guess));
        }
        if fields.next().is_some() {
            bail!("line {}: expected `<name> [guess_file]`", lineno + 1);
        }
        subjects.push(subject);
    }
    Ok(subjects)
}

pub fn load(path: &Path) -> Result<Vec<Subject>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read subjects: {}", path.display()))?;
    parse(&content).with_context(|| format!("failed to parse subjects: {}", path.display()))
}
