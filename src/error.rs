//! Error types for the Floodgate library.

use thiserror::Error;

/// Main error type for Floodgate operations.
///
/// A `try_admit` returning `false` is a normal result value, not an error;
/// only terminal conditions surface here.
#[derive(Error, Debug)]
pub enum FloodgateError {
    /// An `acquire` call was cancelled before admission was granted.
    #[error("admission wait cancelled")]
    Cancelled,

    /// The requested credits can never accrue under the current
    /// configuration (zero refill rate, or cost above the burst capacity).
    #[error("credits will never become available under the current configuration")]
    Unbounded,

    /// Construction or reconfiguration with out-of-range parameters.
    /// Rejected before any limiter state is touched.
    #[error("invalid limiter configuration: capacity={capacity}, rate={rate}")]
    InvalidConfiguration { capacity: f64, rate: f64 },

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Floodgate operations.
pub type Result<T> = std::result::Result<T, FloodgateError>;
