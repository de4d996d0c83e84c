//! # ClientDesk Storage
//!
//! Origin-scoped key/value storage for client session state.
//!
//! Provides the backend trait, its error type and an in-memory backend.
//! Durable backends live in their own crates.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod backend;
pub mod error;
pub mod memory;

pub use backend::StorageBackend;
pub use error::StorageError;
pub use memory::MemoryBackend;
