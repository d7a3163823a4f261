//! Error types for the ntd-reader system.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the ntd-reader system.
#[derive(Error, Debug)]
pub enum Error {
    /// A read needed more bytes than the buffer has left.
    #[error("Truncated input at offset {offset}: needed {needed} bytes, {remaining} remaining")]
    TruncatedInput {
        offset: usize,
        needed: usize,
        remaining: usize,
    },

    /// A flag group holds a bit pattern the format does not define.
    #[error("Unrecognized {field} flag {flags:#05b} at offset {offset}")]
    UnrecognizedFlag {
        field: &'static str,
        flags: u8,
        offset: usize,
    },

    /// Archive file does not exist.
    #[error("Source not found: {}", path.display())]
    SourceNotFound { path: PathBuf },

    /// Header values that cannot drive a decode.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// Timestamp left the representable calendar range.
    #[error("Timestamp out of range: {ticks} ticks")]
    TimestampOutOfRange { ticks: i64 },

    /// Price arithmetic left the representable range.
    #[error("Price overflow: {0}")]
    PriceOverflow(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a truncated input error.
    pub fn truncated(offset: usize, needed: usize, remaining: usize) -> Self {
        Error::TruncatedInput {
            offset,
            needed,
            remaining,
        }
    }

    /// Create an unrecognized flag error.
    pub fn unrecognized_flag(field: &'static str, flags: u8, offset: usize) -> Self {
        Error::UnrecognizedFlag {
            field,
            flags,
            offset,
        }
    }

    /// Create a source not found error.
    pub fn source_not_found(path: impl Into<PathBuf>) -> Self {
        Error::SourceNotFound { path: path.into() }
    }

    /// Create an invalid header error.
    pub fn invalid_header(msg: impl Into<String>) -> Self {
        Error::InvalidHeader(msg.into())
    }

    /// Create a price overflow error.
    pub fn price_overflow(msg: impl Into<String>) -> Self {
        Error::PriceOverflow(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Whether this error came from a malformed buffer rather than the environment.
    pub fn is_corrupt_input(&self) -> bool {
        matches!(
            self,
            Error::TruncatedInput { .. }
                | Error::UnrecognizedFlag { .. }
                | Error::InvalidHeader(_)
                | Error::TimestampOutOfRange { .. }
                | Error::PriceOverflow(_)
        )
    }
}
