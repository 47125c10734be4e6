//! `.env`-style overlay files: reading without touching the process
//! environment, and in-place editing for `shipwright dotenv set/unset`.

use std::path::Path;

use crate::error::{Error, Result};
use crate::utils::io;

/// One `KEY=VALUE` entry in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: String,
    pub value: String,
}

/// Parse overlay content. Comments, blank lines, quoting, `export ` prefixes
/// and `=` inside values are handled by `dotenvy`. Values are literal:
/// `$NAME` is never substituted.
pub fn parse(content: &str) -> Result<Vec<Entry>> {
    parse_from(content, "overlay")
}

/// Read an overlay file. `Ok(None)` when the file does not exist.
pub fn read(path: &Path) -> Result<Option<Vec<Entry>>> {
    let Some(content) = io::read_file_optional(path, "read overlay")? else {
        return Ok(None);
    };
    parse_from(&content, &path.display().to_string()).map(Some)
}

fn parse_from(content: &str, origin: &str) -> Result<Vec<Entry>> {
    let literal = escape_substitutions(content);
    collect(dotenvy::from_read_iter(literal.as_bytes()), origin)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Scan {
    Unquoted,
    Single,
    Double,
    Comment,
}

/// `dotenvy` expands `$NAME` outside single quotes from the runner's own
/// environment. Escape every such `$` so it reads back as itself.
fn escape_substitutions(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut state = Scan::Unquoted;
    let mut escaped = false;
    let mut after_space = true;

    for c in content.chars() {
        if escaped {
            escaped = false;
            after_space = c == '\n';
            out.push(c);
            continue;
        }

        match state {
            Scan::Comment => {
                if c == '\n' {
                    state = Scan::Unquoted;
                }
            }
            Scan::Single => {
                if c == '\'' {
                    state = Scan::Unquoted;
                }
            }
            Scan::Double => match c {
                '\\' => escaped = true,
                '"' => state = Scan::Unquoted,
                '$' => out.push('\\'),
                _ => {}
            },
            Scan::Unquoted => match c {
                '#' if after_space => state = Scan::Comment,
                '\\' => escaped = true,
                '\'' => state = Scan::Single,
                '"' => state = Scan::Double,
                '$' => out.push('\\'),
                _ => {}
            },
        }

        after_space = (state == Scan::Unquoted && c.is_whitespace()) || c == '\n';
        out.push(c);
    }
    out
}

fn collect<I>(iter: I, origin: &str) -> Result<Vec<Entry>>
where
    I: Iterator<Item = dotenvy::Result<(String, String)>>,
{
    iter.map(|item| {
        item.map(|(key, value)| Entry { key, value }).map_err(|e| {
            Error::config_invalid_value(origin.to_string(), None, format!("parse error: {}", e))
        })
    })
    .collect()
}

/// Quote a value for writing back to an overlay file. Quoted values are
/// single-quoted runs joined by `\'` and `\n`, which read back literally.
pub fn quote_value(value: &str) -> String {
    let needs_quotes = value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '#' | '"' | '\'' | '$' | '\\' | '`'));
    if !needs_quotes {
        return value.to_string();
    }

    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for c in value.chars() {
        match c {
            '\'' => quoted.push_str("'\\''"),
            '\n' => quoted.push_str("'\\n'"),
            _ => quoted.push(c),
        }
    }
    quoted.push('\'');
    quoted
}

fn line_key(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    if trimmed.starts_with('#') {
        return None;
    }
    let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
    let (key, _) = trimmed.split_once('=')?;
    let key = key.trim();
    (!key.is_empty()).then_some(key)
}

/// Set `key` in overlay content, replacing the first existing assignment in
/// place (later duplicates are dropped) or appending. Other lines are kept.
pub fn set_key(content: &str, key: &str, value: &str) -> String {
    let assignment = format!("{}={}", key, quote_value(value));
    let mut replaced = false;
    let mut lines: Vec<String> = Vec::new();

    for line in content.lines() {
        if line_key(line) == Some(key) {
            if !replaced {
                lines.push(assignment.clone());
                replaced = true;
            }
            continue;
        }
        lines.push(line.to_string());
    }

    if !replaced {
        lines.push(assignment);
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Remove every assignment of `key`. Returns the new content and whether
/// anything was removed.
pub fn unset_key(content: &str, key: &str) -> (String, bool) {
    let mut removed = false;
    let kept: Vec<&str> = content
        .lines()
        .filter(|line| {
            let matches = line_key(line) == Some(key);
            removed |= matches;
            !matches
        })
        .collect();

    let mut out = kept.join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    (out, removed)
}

/// Apply [`set_key`] to a file, creating it when missing.
pub fn set_in_file(path: &Path, key: &str, value: &str) -> Result<()> {
    let content = io::read_file_optional(path, "read overlay")?.unwrap_or_default();
    io::write_file_atomic(path, &set_key(&content, key, value), "write overlay")
}

/// Apply [`unset_key`] to a file. Missing file counts as nothing removed.
pub fn unset_in_file(path: &Path, key: &str) -> Result<bool> {
    let Some(content) = io::read_file_optional(path, "read overlay")? else {
        return Ok(false);
    };
    let (updated, removed) = unset_key(&content, key);
    if removed {
        io::write_file_atomic(path, &updated, "write overlay")?;
    }
    Ok(removed)
}
