//! Structured low-level failure kinds.
//!
//! These are the signals a transport (or the stream-driving loop) can raise.
//! They are classified exactly once into a [`overture_core::ChatResponse`]
//! by [`crate::classify::classify_failure`]; the orchestrator never retries
//! them itself.

use std::time::Duration;

use thiserror::Error;

/// A structured failure from the transport or stream loop.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchFailure {
    /// The request was aborted (cancellation token or transport abort).
    #[error("request aborted")]
    Aborted,

    /// The stream closed before completing.
    #[error("stream closed prematurely")]
    PrematureClose,

    /// Too many requests.
    #[error("rate limited")]
    RateLimited {
        /// Server-suggested wait.
        retry_after: Option<Duration>,
    },

    /// Usage quota exhausted.
    #[error("quota exceeded: {reason}")]
    QuotaExceeded {
        /// Raw reason.
        reason: String,
    },

    /// The request was judged off topic.
    #[error("request off topic")]
    OffTopic,

    /// Malformed request, expired/invalid credentials, or unsupported client.
    #[error("bad request: {reason}")]
    BadRequest {
        /// Raw reason.
        reason: String,
    },

    /// The prompt itself was rejected.
    #[error("prompt filtered: {reason}")]
    PromptFiltered {
        /// Raw reason.
        reason: String,
    },

    /// The agent requires re-authorization.
    #[error("agent unauthorized")]
    AgentUnauthorized {
        /// Re-authorization URL.
        auth_url: String,
    },

    /// A dependency of the agent failed.
    #[error("agent dependency failed: {reason}")]
    AgentFailedDependency {
        /// Raw reason.
        reason: String,
    },

    /// The extension is temporarily blocked.
    #[error("extension blocked for {retry_after:?}")]
    ExtensionBlocked {
        /// How long to wait.
        retry_after: Duration,
        /// Link with more information.
        learn_more: String,
    },

    /// Model or endpoint not found.
    #[error("not found: {reason}")]
    NotFound {
        /// Raw reason.
        reason: String,
    },

    /// The server rejected the supplied conversation marker.
    #[error("invalid stateful marker")]
    InvalidStatefulMarker,

    /// Network-level failure (reset, timeout, protocol error).
    #[error("network error: {reason}")]
    NetworkError {
        /// Raw reason.
        reason: String,
    },

    /// Anything the client does not recognize.
    #[error("{0}")]
    Other(String),
}

impl FetchFailure {
    /// Whether this failure is an explicit cancellation signal.
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Aborted | Self::PrematureClose)
    }
}
