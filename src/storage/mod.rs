//! Storage module
//!
//! Key-value blob stores backing the registration state.

mod blob;

pub use blob::{BlobStore, FileBlobStore, MemoryBlobStore, StoreError};
