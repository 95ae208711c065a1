//! Minimal `key=value` configuration files read through the VFS.
//!
//! ### Format
//! - Lines are separated by any run of `\r` / `\n`.
//! - Blank lines and lines starting with `#` or `;` are skipped.
//! - `[section]` opens a section; following keys are stored as `section/key`.
//!   The name is trimmed; `[]` goes back to bare keys.
//! - `key = value` is split at the first `=`, both sides trimmed.
//! - `true` / `false` (any case) become booleans, everything else a string.
//! - Anything else is ignored.

use std::collections::HashMap;
use std::fmt;

use log::debug;

use crate::manager::Vfs;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Bool(bool),
    Str(String),
}

impl Value {
    fn parse(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("true") {
            Value::Bool(true)
        } else if raw.eq_ignore_ascii_case("false") {
            Value::Bool(false)
        } else {
            Value::Str(raw.to_string())
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Str(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            Value::Bool(_) => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Str(s) => f.write_str(s),
        }
    }
}

/// Lookup table built once from a config document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IniReader {
    values: HashMap<String, Value>,
}

impl IniReader {
    /// Reads `path` through `vfs`. A missing or empty file gives an empty table.
    pub fn open(vfs: &Vfs, path: &str) -> Self {
        let bytes = vfs.read_file(path);
        let reader = Self::parse(&String::from_utf8_lossy(&bytes));
        debug!("{} key(s) read from {path}", reader.len());
        reader
    }

    pub fn parse(text: &str) -> Self {
        let mut values = HashMap::new();
        let mut section: Option<&str> = None;

        for line in text.split(['\r', '\n']).map(str::trim) {
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if line.len() >= 2 && line.starts_with('[') && line.ends_with(']') {
                let name = line[1..line.len() - 1].trim();
                section = (!name.is_empty()).then_some(name);
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let key = match section {
                Some(section) => format!("{section}/{key}"),
                None => key.to_string(),
            };
            values.insert(key, Value::parse(value.trim()));
        }

        Self { values }
    }

    /// Value stored under the composite key, or `default`.
    pub fn value(&self, key: &str, default: impl Into<Value>) -> Value {
        self.values.get(key).cloned().unwrap_or_else(|| default.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
