// Parsing of `influx auth list` output, tabular or `--json`.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tab stop used by the `influx` table writer.
const TAB_WIDTH: usize = 8;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ListingError {
    #[error("token listing is not valid JSON: {0}")]
    Json(String),
}

/// One authorization as reported by `influx auth list --json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenEntry {
    pub token: String,
    #[serde(rename = "userName", alias = "user")]
    pub user: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ListingRow {
    /// Whitespace-separated fields of a table row with no header to locate columns.
    Fields(Vec<String>),
    Entry(TokenEntry),
}

impl ListingRow {
    fn token_for(&self, user: &str) -> Option<&str> {
        match self {
            // Without a header the user name column is unknown. The token sits
            // directly before it, and a free-text description can precede the
            // token, so the rightmost match is taken.
            Self::Fields(fields) => fields
                .windows(2)
                .rposition(|pair| pair[1] == user)
                .map(|index| fields[index].as_str()),
            Self::Entry(entry) => (entry.user == user).then_some(entry.token.as_str()),
        }
    }
}

/// Character spans of the `Token` and `User Name` columns, taken from the header.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TableLayout {
    token: Range<usize>,
    user: Range<usize>,
}

impl TableLayout {
    fn from_header(line: &str) -> Option<Self> {
        if !line.trim_start().starts_with("ID") {
            return None;
        }
        Some(Self { token: column_span(line, "Token")?, user: column_span(line, "User Name")? })
    }

    fn entry(&self, line: &str) -> Option<TokenEntry> {
        let token = cell(line, &self.token);
        let user = cell(line, &self.user);
        if token.is_empty() || user.is_empty() {
            return None;
        }
        Some(TokenEntry { token, user })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenListing {
    rows: Vec<ListingRow>,
}

impl TokenListing {
    /// Parse either the JSON array form or the human table form.
    pub fn parse(output: &str) -> Result<Self, ListingError> {
        let trimmed = output.trim_start();
        if trimmed.starts_with('[') {
            Self::parse_json(trimmed)
        } else {
            Ok(Self::parse_table(output))
        }
    }

    /// Parse the table form. When the header row is present, cells are read
    /// from the header's column positions, so a description that equals a
    /// user name is never mistaken for the user column.
    pub fn parse_table(output: &str) -> Self {
        let lines: Vec<String> =
            output.lines().map(expand_tabs).filter(|line| !line.trim().is_empty()).collect();

        let header = lines.iter().enumerate().find_map(|(index, line)| {
            TableLayout::from_header(line).map(|layout| (index, layout))
        });

        let rows = match header {
            Some((index, layout)) => lines[index + 1..]
                .iter()
                .filter_map(|line| layout.entry(line))
                .map(ListingRow::Entry)
                .collect(),
            None => lines
                .iter()
                .map(|line| line.split_whitespace().map(str::to_string).collect::<Vec<_>>())
                .filter(|fields| !is_header(fields))
                .map(ListingRow::Fields)
                .collect(),
        };
        Self { rows }
    }

    pub fn parse_json(output: &str) -> Result<Self, ListingError> {
        let entries: Vec<TokenEntry> =
            serde_json::from_str(output).map_err(|error| ListingError::Json(error.to_string()))?;
        Ok(Self { rows: entries.into_iter().map(ListingRow::Entry).collect() })
    }

    /// Every token issued to exactly `user`, in listing order.
    pub fn tokens_for_user<'a>(&'a self, user: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.rows.iter().filter_map(move |row| row.token_for(user))
    }

    pub fn token_for_user(&self, user: &str) -> Option<&str> {
        self.rows.iter().find_map(|row| row.token_for(user))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn is_header(fields: &[String]) -> bool {
    fields.first().is_some_and(|first| first == "ID")
        && fields.iter().any(|field| field == "Token")
}

/// Replace tabs with spaces up to the next tab stop.
fn expand_tabs(line: &str) -> String {
    let mut expanded = String::with_capacity(line.len());
    let mut width = 0;
    for ch in line.chars() {
        if ch == '\t' {
            let pad = TAB_WIDTH - width % TAB_WIDTH;
            expanded.extend(std::iter::repeat(' ').take(pad));
            width += pad;
        } else {
            expanded.push(ch);
            width += 1;
        }
    }
    expanded
}

/// Span from the start of `label` to the start of the next column, or to the
/// end of the line for the last column.
fn column_span(header: &str, label: &str) -> Option<Range<usize>> {
    let start = header.char_indices().position(|(offset, _)| header[offset..].starts_with(label))?;
    let after = start + label.chars().count();
    let end = header
        .chars()
        .skip(after)
        .position(|ch| ch != ' ')
        .map_or(usize::MAX, |offset| after + offset);
    Some(start..end)
}

fn cell(line: &str, span: &Range<usize>) -> String {
    line.chars()
        .skip(span.start)
        .take(span.end - span.start)
        .collect::<String>()
        .trim()
        .to_string()
}
