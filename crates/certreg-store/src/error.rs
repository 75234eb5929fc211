use certreg_core::ContentRef;
use thiserror::Error;

/// Errors raised by content store backends.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The request itself was malformed (for example an empty payload).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The provider could not be reached or refused the request.
    #[error("content store unavailable: {0}")]
    Unavailable(String),

    /// Stored or returned bytes do not match their content address.
    #[error("integrity violation for {content_ref}: {detail}")]
    Integrity {
        content_ref: ContentRef,
        detail: String,
    },

    /// Local filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
