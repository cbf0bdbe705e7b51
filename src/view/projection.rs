//! View projection
//!
//! Pure functions from state to view models. Nothing here touches the
//! stores, so it can be tested without a running server.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::extract::BookRecord;
use crate::session::UploadSession;

/// Download name of the JSON export
pub const EXPORT_FILE_NAME: &str = "books.json";

pub const UNKNOWN_TITLE: &str = "(unknown title)";
pub const NOT_DETECTED: &str = "not detected";
pub const EMPTY_TITLE: &str = "No results yet";
pub const EMPTY_HINT: &str = "Upload an image to see the books found in it.";

/// One result card
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookCard {
    /// 1-based position
    pub index: usize,
    pub title: String,
    pub author: String,
    pub publisher: String,
}

/// Card list with its count label
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardsView {
    pub result_count: String,
    pub cards: Vec<BookCard>,
}

/// One row of the session history
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRow {
    pub id: Uuid,
    pub lfl_number: String,
    pub image_name: String,
    pub uploaded_at: DateTime<Utc>,
    pub status_label: &'static str,
    pub book_count: usize,
}

fn or_fallback(value: &str, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

/// Count label, e.g. "3 books"
pub fn result_count(count: usize) -> String {
    match count {
        1 => "1 book".to_string(),
        n => format!("{} books", n),
    }
}

/// Project records into cards with display fallbacks
pub fn cards_view(books: &[BookRecord]) -> CardsView {
    let cards = books
        .iter()
        .enumerate()
        .map(|(i, book)| BookCard {
            index: i + 1,
            title: or_fallback(&book.title, UNKNOWN_TITLE),
            author: or_fallback(&book.author, NOT_DETECTED),
            publisher: or_fallback(&book.publisher, NOT_DETECTED),
        })
        .collect();

    CardsView {
        result_count: result_count(books.len()),
        cards,
    }
}

/// Render the card list as an HTML fragment
///
/// All OCR text is escaped.
pub fn render_cards_html(view: &CardsView) -> String {
    if view.cards.is_empty() {
        return format!(
            "<div class=\"card\"><p class=\"card-title\">{}</p><p class=\"card-meta\">{}</p></div>\n",
            EMPTY_TITLE, EMPTY_HINT
        );
    }

    let mut html = String::new();
    for card in &view.cards {
        html.push_str(&format!(
            "<div class=\"card\">\
             <p class=\"card-title\">{}. {}</p>\
             <p class=\"card-meta\">Author: {}</p>\
             <p class=\"card-meta\">Publisher: {}</p>\
             </div>\n",
            card.index,
            html_escape::encode_text(&card.title),
            html_escape::encode_text(&card.author),
            html_escape::encode_text(&card.publisher),
        ));
    }
    html
}

/// Project sessions into history rows, newest last
pub fn history_view(sessions: &[UploadSession]) -> Vec<HistoryRow> {
    sessions
        .iter()
        .map(|session| HistoryRow {
            id: session.id,
            lfl_number: session.lfl_number.clone(),
            image_name: session.image_name.clone(),
            uploaded_at: session.uploaded_at,
            status_label: session.status_label.label(),
            book_count: session.books.len(),
        })
        .collect()
}

/// Pretty JSON with 2-space indentation
pub fn export_json<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}
