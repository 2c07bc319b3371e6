//! Error types for the OrbitKV client
//!
//! Provides a unified error type for all operations.
//!
//! Application-level failures carry the engine's status code verbatim;
//! callers distinguish outcomes by that code's identity. Protocol-invariant
//! violations (handle mismatch, out-of-band status codes) are not errors at
//! all: they halt, because they can only mean a corrupted exchange.

use thiserror::Error;

use crate::status::Status;

/// Result type alias using OrbitError
pub type Result<T> = std::result::Result<T, OrbitError>;

/// Unified error type for OrbitKV client operations
#[derive(Debug, Error)]
pub enum OrbitError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Operation Outcomes
    // -------------------------------------------------------------------------
    /// The engine completed the operation with a non-success status.
    #[error("operation failed: {0}")]
    Op(Status),

    // -------------------------------------------------------------------------
    // Codec Errors
    // -------------------------------------------------------------------------
    #[error("attribute codec error: {0}")]
    Codec(String),

    // -------------------------------------------------------------------------
    // Request Validation
    // -------------------------------------------------------------------------
    /// A structural update was issued with zero attributes. The engine
    /// requires at least one attribute per update, so this is rejected
    /// before anything is submitted.
    #[error("{0} requires at least one attribute")]
    EmptyAttrs(&'static str),
}

impl OrbitError {
    /// The status carried by an [`OrbitError::Op`], if that is what this is.
    pub fn status(&self) -> Option<Status> {
        match self {
            OrbitError::Op(status) => Some(*status),
            _ => None,
        }
    }
}
