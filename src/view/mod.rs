//! View Module
//!
//! What clients render: the progress indicator, result cards, session
//! history and the `books.json` export, plus a revision counter that tells
//! them when to re-render.

mod indicator;
mod notifier;
mod projection;

pub use indicator::{
    percent_complete, ProgressIndicator, StatusView, PROGRESS_DONE, PROGRESS_RETRY,
    STATUS_DONE, STATUS_FAILED, STATUS_IDLE, STATUS_RECOGNIZING, STATUS_STARTED,
};
pub use notifier::ViewNotifier;
pub use projection::{
    cards_view, export_json, history_view, render_cards_html, result_count, BookCard,
    CardsView, HistoryRow, EMPTY_HINT, EMPTY_TITLE, EXPORT_FILE_NAME, NOT_DETECTED,
    UNKNOWN_TITLE,
};
