//! LFL Registration Module
//!
//! Facility identifiers (LFL numbers) claimed through an email code
//! challenge. Verified numbers are persisted in a blob store; one of them
//! can be active, and new OCR sessions are tagged with it.

pub mod store;
pub mod types;
pub mod verification;

pub use store::RegistrationStore;
pub use types::*;
pub use verification::RegistrationService;
