//! Upload Session Module
//!
//! Sessions track one uploaded image each, from acceptance through OCR:
//!
//! ```text
//! waiting -> processing -> done | failed
//! ```
//!
//! The history is append-only for the lifetime of the server process.

pub mod pipeline;
pub mod preview;
pub mod store;
pub mod types;

pub use pipeline::OcrPipeline;
pub use preview::{Preview, PreviewCache};
pub use store::SessionStore;
pub use types::*;
