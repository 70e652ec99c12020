// Credentials record: line-oriented `key = "value"` parser that round-trips byte-for-byte.

use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("credentials field `{0}` is missing")]
    MissingField(String),

    #[error("credentials fields are missing or empty: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("value for `{key}` cannot be stored in a quoted string: {reason}")]
    InvalidValue { key: String, reason: &'static str },

    #[error("value for `{0}` uses a backslash escape, which is not supported")]
    EscapedValue(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Assignment {
    key: String,
    /// Byte range of the text between the quotes.
    value: Range<usize>,
}

/// A parsed credentials file.
///
/// Only `name = "value"` lines are interpreted; everything else (comments,
/// blank lines, table headers, unquoted values) is carried through untouched
/// so that `render()` reproduces the input text exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialsRecord {
    text: String,
    assignments: Vec<Assignment>,
}

fn assignment_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"^[ \t]*([A-Za-z0-9_-]+)[ \t]*=[ \t]*"([^"\r\n]*)""#)
            .expect("assignment pattern should compile")
    })
}

impl CredentialsRecord {
    pub fn parse(text: &str) -> Self {
        Self { text: text.to_string(), assignments: scan_assignments(text) }
    }

    /// Value of the first assignment for `key`. Later duplicates are ignored.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.find(key).map(|assignment| &self.text[assignment.value.clone()])
    }

    pub fn contains(&self, key: &str) -> bool {
        self.find(key).is_some()
    }

    /// Keys in file order, duplicates included.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.assignments.iter().map(|assignment| assignment.key.as_str())
    }

    /// Replace the value of the first assignment for `key`, leaving every other
    /// byte of the file as it was.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), RecordError> {
        validate_value(key, value)?;
        let span = self
            .find(key)
            .map(|assignment| assignment.value.clone())
            .ok_or_else(|| RecordError::MissingField(key.to_string()))?;

        self.text.replace_range(span, value);
        self.assignments = scan_assignments(&self.text);
        Ok(())
    }

    pub fn render(&self) -> &str {
        &self.text
    }

    fn find(&self, key: &str) -> Option<&Assignment> {
        self.assignments.iter().find(|assignment| assignment.key == key)
    }
}

fn scan_assignments(text: &str) -> Vec<Assignment> {
    let pattern = assignment_pattern();
    let mut assignments = Vec::new();
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        if let Some(captures) = pattern.captures(line) {
            if let (Some(key), Some(value)) = (captures.get(1), captures.get(2)) {
                assignments.push(Assignment {
                    key: key.as_str().to_string(),
                    value: offset + value.start()..offset + value.end(),
                });
            }
        }
        offset += line.len();
    }

    assignments
}

fn validate_value(key: &str, value: &str) -> Result<(), RecordError> {
    let reason = if value.contains('"') {
        Some("contains a double quote")
    } else if value.contains('\\') {
        Some("contains a backslash")
    } else if value.contains(['\n', '\r']) {
        Some("contains a line break")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(RecordError::InvalidValue { key: key.to_string(), reason }),
        None => Ok(()),
    }
}
