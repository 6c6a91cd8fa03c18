//! Error types for the batch multiplexer.
//!
//! This module defines the central `Error` enum for defects in the response
//! machinery itself. These are distinct from per-item handler failures, which
//! are expected, caught, and reported in-band as `Failure` records (see
//! [`crate::NormalizedError`]): an `Error` here terminates the response
//! stream, a per-item failure never does.
//!
//! ## Error Cases
//! - `Serialize`: A settled record could not be encoded as a JSON line.
//! - `Compress`: The streaming deflate encoder rejected its input.
//! - `InvalidBatch`: The batch was rejected before any item was dispatched.

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the batch multiplexer.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A record could not be serialized for the wire.
    #[error("record serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The streaming compressor failed mid-response.
    #[error("record compression failed: {0}")]
    Compress(#[from] std::io::Error),

    /// The batch request was malformed or exceeded bounds.
    #[error("invalid batch: {reason}")]
    InvalidBatch { reason: String },
}
