//! Shelfscan Server Library
//!
//! Bookshelf OCR: photos in, book records out.
//! The server binary is in main.rs.
//!
//! # Modules
//!
//! - `extract`: Splits OCR text into title / author / publisher records
//! - `ocr`: OCR engine providers and the progress event stream
//! - `registration`: LFL number registration and email code verification
//! - `session`: Upload sessions and the sequential OCR pipeline
//! - `storage`: Key-value blob stores
//! - `view`: View models, export and change notification

pub mod config;
pub mod error;
pub mod extract;
pub mod ocr;
pub mod registration;
pub mod routes;
pub mod session;
pub mod state;
pub mod storage;
pub mod view;

pub use routes::router;
pub use state::AppState;
