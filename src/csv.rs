//! Minimal CSV support: RFC 4180-style quoting for reports and a reader for
//! small header-led input files.

use std::{collections::HashMap, path::Path};

use anyhow::{Context, Result};

/// Quotes `value` only when it contains a comma, quote or newline.
pub fn escape_csv(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// A header row plus data rows, rendered with `\n` separators and no
/// trailing newline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CsvTable {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn render(&self) -> String {
        std::iter::once(&self.headers)
            .chain(self.rows.iter())
            .map(|row| render_line(row))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub async fn write_to(&self, path: &Path) -> Result<()> {
        tokio::fs::write(path, self.render())
            .await
            .with_context(|| format!("Failed to write CSV to {}", path.display()))
    }
}

fn render_line(fields: &[String]) -> String {
    fields
        .iter()
        .map(|f| escape_csv(f))
        .collect::<Vec<_>>()
        .join(",")
}

/// Splits CSV text into records, honouring quoted fields with embedded
/// commas, doubled quotes and newlines. Blank lines are dropped.
pub fn parse_rows(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                other => field.push(other),
            }
            continue;
        }

        match c {
            '"' => in_quotes = true,
            ',' => row.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                row.push(std::mem::take(&mut field));
                push_row(&mut rows, std::mem::take(&mut row));
            }
            other => field.push(other),
        }
    }

    row.push(field);
    push_row(&mut rows, row);
    rows
}

fn push_row(rows: &mut Vec<Vec<String>>, row: Vec<String>) {
    let blank = row.iter().all(|f| f.trim().is_empty());
    if !blank {
        rows.push(row);
    }
}

/// Parses CSV with a header line into one map per record, keyed by the
/// trimmed header names. Missing trailing fields are empty strings.
pub fn parse_records(text: &str) -> Vec<HashMap<String, String>> {
    let mut rows = parse_rows(text).into_iter();
    let Some(headers) = rows.next() else {
        return Vec::new();
    };
    let headers: Vec<String> = headers.iter().map(|h| h.trim().to_string()).collect();

    rows.map(|row| {
        headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                let value = row.get(i).map(|v| v.trim().to_string()).unwrap_or_default();
                (header.clone(), value)
            })
            .collect()
    })
    .collect()
}
