// Bookfair - Rust Implementation
// REST backend for a book fair event website

#![warn(rust_2018_idioms)]

pub mod catalog;
pub mod config;
pub mod export;
pub mod media;
pub mod metrics;
pub mod model;
pub mod notify;
pub mod sequence;
pub mod server;
pub mod storage;

// Re-exports for convenience
pub use catalog::Catalog;
pub use config::AppConfig;
pub use sequence::{Compaction, Renumbering, Table};
pub use storage::{MemoryStore, Order, Record, RecordStore};

/// Bookfair error types
pub mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum Error {
        #[error("Not found: {0}")]
        NotFound(String),

        #[error("Conflict: {0}")]
        Conflict(String),

        /// A renumbering pass stopped partway. The table is left with gaps
        /// and must be repaired explicitly.
        #[error(
            "Partial compaction of '{table}': {completed} of {total} renumbering writes applied: {cause}"
        )]
        PartialCompaction {
            table: String,
            completed: usize,
            total: usize,
            cause: Box<Error>,
        },

        #[error("Invalid argument: {0}")]
        InvalidArgument(String),

        #[error("Payload too large: {0}")]
        PayloadTooLarge(String),

        #[error("Unauthorized: {0}")]
        Unauthorized(String),

        #[error("Forbidden: {0}")]
        Forbidden(String),

        #[error("Storage error: {0}")]
        Storage(String),

        #[error("Media error: {0}")]
        Media(String),

        #[error("Notification error: {0}")]
        Notification(String),

        #[error("Configuration error: {0}")]
        Config(String),

        #[error("Serialization error: {0}")]
        SerializationError(String),

        #[error("Internal error: {0}")]
        Internal(String),
    }

    pub type Result<T> = std::result::Result<T, Error>;
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
