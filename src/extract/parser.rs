//! OCR text parser
//!
//! Line and column splitting for recognized text. Never fails: garbage in
//! produces fewer (or emptier) records, not errors.

use std::sync::OnceLock;

use regex::Regex;

use super::types::BookRecord;

/// Lines with this many characters or fewer are dropped as OCR noise
pub const MIN_LINE_CHARS: usize = 2;

/// Column separator between title, author and publisher
const FIELD_SEPARATOR: char = '/';

fn wide_gap() -> &'static Regex {
    static WIDE_GAP: OnceLock<Regex> = OnceLock::new();
    WIDE_GAP.get_or_init(|| Regex::new(r"\s{2,}").expect("static regex is valid"))
}

/// Parse raw OCR text into book records, one per non-trivial line
pub fn parse_ocr_text(text: &str) -> Vec<BookRecord> {
    text.split('\n')
        .map(str::trim)
        .filter(|line| line.chars().count() > MIN_LINE_CHARS)
        .map(parse_line)
        .collect()
}

/// Collapse runs of two or more whitespace characters into one space
pub fn normalize_line(line: &str) -> String {
    wide_gap().replace_all(line, " ").into_owned()
}

/// Parse a single trimmed line
///
/// Only the first three slash-separated parts are used. An empty first
/// part falls back to the whole normalized line.
pub fn parse_line(line: &str) -> BookRecord {
    let normalized = normalize_line(line);
    let mut parts = normalized.split(FIELD_SEPARATOR).map(str::trim);

    let title = match parts.next() {
        Some(title) if !title.is_empty() => title.to_string(),
        _ => normalized.clone(),
    };
    let author = parts.next().unwrap_or_default().to_string();
    let publisher = parts.next().unwrap_or_default().to_string();

    BookRecord {
        title,
        author,
        publisher,
    }
}
