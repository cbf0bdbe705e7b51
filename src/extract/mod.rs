//! Book record extraction
//!
//! Turns raw OCR text into structured book records.
//!
//! # Heuristic
//!
//! OCR output of a bookshelf or a cover is assumed to put one book per
//! line, with title, author and publisher separated by slashes:
//!
//! ```text
//! Title A / Author A / Pub A
//! ```
//!
//! Wide whitespace gaps (how OCR tends to render column separation) are
//! collapsed to a single space before splitting. Short lines are treated as
//! noise and dropped.
//!
//! # Usage
//!
//! ```ignore
//! use shelfscan_server::extract::parse_ocr_text;
//!
//! let books = parse_ocr_text("Title A / Author A / Pub A\nxy");
//! assert_eq!(books.len(), 1);
//! assert_eq!(books[0].author, "Author A");
//! ```

mod parser;
mod types;

pub use parser::{normalize_line, parse_line, parse_ocr_text, MIN_LINE_CHARS};
pub use types::BookRecord;
