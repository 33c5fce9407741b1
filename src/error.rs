//! Error types for compressed bitmap operations.

use thiserror::Error;

/// Error variants for bitmap construction, mutation and decoding.
#[derive(Debug, Error)]
pub enum Error {
    /// A value or index lies outside the 32-bit universe `[0, 2^32)`.
    #[error("value out of range: {0} does not fit in the 32-bit universe")]
    ValueOutOfRange(u64),

    /// A range was given with its end before its start.
    #[error("invalid range: end {end} is before start {start}")]
    InvalidRange {
        /// Inclusive start of the rejected range.
        start: u64,
        /// Exclusive end of the rejected range.
        end: u64,
    },

    /// A stride of zero was requested.
    #[error("invalid step: stride must be at least 1")]
    InvalidStep,

    /// A serialized buffer is truncated or internally inconsistent.
    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),

    /// An I/O error occurred during serialization.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized Result type for bitmap operations.
pub type Result<T> = std::result::Result<T, Error>;
