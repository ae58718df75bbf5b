//! CSV parsing for bulk book imports.
//!
//! Expected layout: a header line, then one book per line with exactly six
//! columns: `Title,Author(s),Genre,ISBN,PublicationDate,TotalCopies`.
//! Several authors are separated by `;` inside the author column.
//!
//! Fields are split on every comma; quoted fields are not supported, so a
//! title containing a comma is reported as a malformed row.

use crate::config::Genre;
use crate::error::{ParseError, Result};
use crate::library::CandidateRecord;
use std::path::Path;

/// Columns in a data row.
pub const EXPECTED_COLUMNS: usize = 6;

/// Parse CSV text into candidate records.
///
/// Rows are numbered from 1 starting after the header. Blank lines are
/// skipped but still count towards the numbering so errors point at the
/// right line. The first invalid row rejects the whole file.
pub fn parse_csv(text: &str) -> std::result::Result<Vec<CandidateRecord>, ParseError> {
    let mut records = Vec::new();

    for (index, line) in text.lines().skip(1).enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        records.push(parse_row(index + 1, line)?);
    }

    if records.is_empty() {
        return Err(ParseError::EmptyFile);
    }

    tracing::debug!(rows = records.len(), "Parsed CSV");
    Ok(records)
}

/// Read and parse a CSV file.
pub fn parse_csv_file(path: &Path) -> Result<Vec<CandidateRecord>> {
    let text = std::fs::read_to_string(path)?;
    Ok(parse_csv(&text)?)
}

fn parse_row(row: usize, line: &str) -> std::result::Result<CandidateRecord, ParseError> {
    let columns: Vec<&str> = line.split(',').map(str::trim).collect();
    if columns.len() != EXPECTED_COLUMNS {
        return Err(ParseError::MalformedRow {
            row,
            expected: EXPECTED_COLUMNS,
            actual: columns.len(),
        });
    }

    let title = required(row, "title", columns[0])?;
    let authors = split_authors(columns[1]);
    if authors.is_empty() {
        return Err(ParseError::MissingField {
            row,
            field: "author",
        });
    }

    let genre = Genre::parse(columns[2]).ok_or_else(|| ParseError::InvalidGenre {
        row,
        value: columns[2].to_string(),
    })?;
    let isbn = required(row, "isbn", columns[3])?;
    let total_copies = parse_copies(row, columns[5])?;

    Ok(CandidateRecord::new(
        title,
        authors,
        genre,
        isbn,
        columns[4],
        total_copies,
    ))
}

fn required<'a>(
    row: usize,
    field: &'static str,
    value: &'a str,
) -> std::result::Result<&'a str, ParseError> {
    if value.is_empty() {
        Err(ParseError::MissingField { row, field })
    } else {
        Ok(value)
    }
}

/// Split an author column on `;`, dropping blank names.
pub fn split_authors(value: &str) -> Vec<String> {
    value
        .split(';')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(String::from)
        .collect()
}

pub(crate) fn parse_copies(row: usize, value: &str) -> std::result::Result<u32, ParseError> {
    match value.trim().parse::<u32>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(ParseError::InvalidCopies {
            row,
            value: value.to_string(),
        }),
    }
}
