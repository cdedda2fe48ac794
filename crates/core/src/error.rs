//! Error types shared across the ICS toolkit.
//!
//! Uses `thiserror` for ergonomic error definitions. Parsing and
//! validation never fail with an `Error`: structural problems are reported
//! as data (parse errors and violations). These variants cover getting a
//! document in and a report out.

use std::path::PathBuf;
use thiserror::Error;

/// The top-level error type for ICS toolkit operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Input errors ---
    #[error("Input error: {message}")]
    Input { message: String },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;
