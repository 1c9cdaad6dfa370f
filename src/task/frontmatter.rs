//! Minimal YAML-style frontmatter: `---`-delimited key/value block at the
//! top of a markdown file, followed by a free-form body (§6).
//!
//! Supported value syntax is intentionally narrow: ints/floats, `true`/
//! `false`, quoted strings (single or double), bare strings, and inline
//! bracketed arrays (`[a, b, c]`) whose items may themselves be quoted.
//! Nested maps and multi-line values are out of scope. Grounded on the
//! teacher's format-sniffing style in `config/io.rs` (inspect the raw text,
//! then hand off to a small dedicated parser) — no YAML crate appears
//! anywhere in the retrieved pack, so this scanner is hand-rolled rather
//! than delegated.

use crate::error::{Error, Result};

const DELIMITER: &str = "---";

/// One frontmatter value. Numbers, booleans, arrays, and null are emitted
/// unquoted on writeback; strings are always requoted (§9 "Frontmatter
/// writeback").
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Array(Vec<String>),
    Null,
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    fn render(&self) -> String {
        match self {
            Value::String(s) => format!("\"{}\"", escape(s)),
            Value::Int(n) => n.to_string(),
            Value::Float(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null => "null".to_string(),
            Value::Array(items) => {
                let rendered = items
                    .iter()
                    .map(|item| format!("\"{}\"", escape(item)))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("[{rendered}]")
            }
        }
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// An ordered frontmatter block. Order is significant on writeback (§9:
/// "preserves key order by iterating the parsed-in map").
#[derive(Debug, Clone, Default)]
pub struct Frontmatter {
    entries: Vec<(String, Value)>,
}

impl Frontmatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Inserts a new key at the end, or updates an existing one in place
    /// (preserving its original position).
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::from(DELIMITER);
        out.push('\n');
        for (key, value) in &self.entries {
            out.push_str(key);
            out.push_str(": ");
            out.push_str(&value.render());
            out.push('\n');
        }
        out.push_str(DELIMITER);
        out.push('\n');
        out
    }
}

/// Splits `source` into a parsed frontmatter block and the remaining body.
pub fn parse(source: &str) -> Result<(Frontmatter, String)> {
    let mut lines = source.lines();
    let first = lines.next().unwrap_or("").trim();
    if first != DELIMITER {
        return Err(Error::Frontmatter("document does not start with a frontmatter block".into()));
    }

    let mut frontmatter = Frontmatter::new();
    let mut closed = false;
    let mut consumed = DELIMITER.len() + 1;

    for line in lines.by_ref() {
        consumed += line.len() + 1;
        if line.trim() == DELIMITER {
            closed = true;
            break;
        }
        if line.trim().is_empty() {
            continue;
        }
        let (key, value) = parse_line(line)?;
        frontmatter.set(key, value);
    }

    if !closed {
        return Err(Error::Frontmatter("frontmatter block is never closed".into()));
    }

    let body = source.get(consumed.min(source.len())..).unwrap_or("");
    let body = body.strip_prefix('\n').unwrap_or(body);
    Ok((frontmatter, body.to_string()))
}

fn parse_line(line: &str) -> Result<(String, Value)> {
    let (key, raw) = line
        .split_once(':')
        .ok_or_else(|| Error::Frontmatter(format!("malformed frontmatter line: {line:?}")))?;
    let key = key.trim().to_string();
    let raw = raw.trim();
    Ok((key, parse_value(raw)))
}

fn parse_value(raw: &str) -> Value {
    if raw == "true" {
        return Value::Bool(true);
    }
    if raw == "false" {
        return Value::Bool(false);
    }
    if raw == "null" || raw.is_empty() {
        return Value::Null;
    }
    if let Some(inner) = raw.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        return Value::Array(split_array_items(inner).into_iter().map(unquote).collect());
    }
    if let Some(quoted) = strip_quotes(raw) {
        return Value::String(quoted);
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Value::Int(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return Value::Float(f);
    }
    Value::String(raw.to_string())
}

/// Splits `[a, "b, c", d]`'s inner text on top-level commas, respecting
/// quoted items that may themselves contain commas.
fn split_array_items(inner: &str) -> Vec<String> {
    if inner.trim().is_empty() {
        return Vec::new();
    }
    let mut items = Vec::new();
    let mut current = String::new();
    let mut in_quotes: Option<char> = None;
    for ch in inner.chars() {
        match in_quotes {
            Some(q) if ch == q => {
                in_quotes = None;
                current.push(ch);
            }
            Some(_) => current.push(ch),
            None if ch == '"' || ch == '\'' => {
                in_quotes = Some(ch);
                current.push(ch);
            }
            None if ch == ',' => {
                items.push(current.trim().to_string());
                current = String::new();
            }
            None => current.push(ch),
        }
    }
    if !current.trim().is_empty() {
        items.push(current.trim().to_string());
    }
    items
}

fn unquote(raw: String) -> String {
    strip_quotes(&raw).unwrap_or(raw)
}

fn strip_quotes(raw: &str) -> Option<String> {
    let bytes = raw.as_bytes();
    if bytes.len() >= 2 && (raw.starts_with('"') && raw.ends_with('"') || raw.starts_with('\'') && raw.ends_with('\'')) {
        let inner = &raw[1..raw.len() - 1];
        Some(inner.replace("\\\"", "\"").replace("\\\\", "\\"))
    } else {
        None
    }
}
