//! Error types for link and scheduler operations.

use thiserror::Error;

/// Unified result type for link operations.
pub type LinkResult<T> = Result<T, LinkError>;

/// Errors surfaced by link transports and the command scheduler.
#[derive(Error, Debug, Clone)]
pub enum LinkError {
    /// No device is connected.
    #[error("no device is connected")]
    NotConnected,

    /// Encoded payload exceeds the per-write frame limit.
    #[error("payload is {len} bytes, frame limit is {max}")]
    PayloadTooLarge { len: usize, max: usize },

    /// The link accepted the frame but the underlying write failed.
    #[error("link write failed: {0}")]
    WriteFailed(String),

    /// The link or scheduler task has shut down.
    #[error("link is closed")]
    Closed,
}

impl LinkError {
    pub fn write_failed(reason: impl Into<String>) -> Self {
        LinkError::WriteFailed(reason.into())
    }
}
