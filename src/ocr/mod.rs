//! OCR Module
//!
//! Bridges external OCR engines that read book spines and covers.
//!
//! Supports multiple backends:
//! - Tesseract (local CLI, requires installation)
//! - Ollama vision models (local LLM)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use futures::StreamExt;
//! use shelfscan_server::ocr::{OcrEvent, OcrService, OcrServiceConfig};
//!
//! let service = OcrService::new(OcrServiceConfig::default());
//! let mut job = service.start(image_bytes, Some("jpn+eng".to_string()));
//!
//! while let Some(event) = job.next().await {
//!     match event {
//!         OcrEvent::Progress(p) => println!("{}: {}%", p.status, p.percent()),
//!         OcrEvent::Finished(result) => println!("{:?}", result.map(|r| r.text)),
//!     }
//! }
//! ```

mod provider;
mod service;
mod types;

pub use provider::{OcrProviderTrait, OllamaProvider, ProgressSink, TesseractProvider};
pub use service::{OcrJob, OcrService, OcrServiceConfig};
pub use types::{OcrError, OcrEvent, OcrProgress, OcrProvider, OcrResult, RECOGNIZING_TEXT};

#[cfg(test)]
pub(crate) use provider::ScriptedProvider;
