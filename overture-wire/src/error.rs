//! Wire-layer errors.

use thiserror::Error;

/// Errors surfaced by the wire layer.
#[derive(Error, Debug)]
pub enum WireError {
    /// The frame buffer grew past its limit without a frame boundary.
    #[error("frame buffer overflow")]
    BufferOverflow,

    /// A recognized event carried JSON that does not parse.
    ///
    /// Terminal for the whole stream.
    #[error("malformed payload for event '{event}': {source}")]
    MalformedPayload {
        /// The event tag.
        event: String,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// I/O failure on the underlying byte stream.
    #[error("stream I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for wire operations.
pub type WireResult<T> = std::result::Result<T, WireError>;
