//! The closed outcome taxonomy for a fetch.
//!
//! Exactly one [`ChatResponse`] variant is produced per logical fetch
//! attempt. A retry produces a new attempt with its own outcome; only the
//! final attempt's outcome is surfaced to the original caller.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::delta::StreamingError;
use crate::usage::TokenUsage;

/// Outcome of one fetch attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatResponse {
    /// One or more usable completions.
    Success {
        /// Client-assigned request id.
        request_id: String,
        /// Text of each accepted completion.
        texts: Vec<String>,
        /// Usage counters, present when exactly one completion was accepted.
        #[serde(skip_serializing_if = "Option::is_none")]
        usage: Option<TokenUsage>,
        /// Server-assigned request id, when available.
        #[serde(skip_serializing_if = "Option::is_none")]
        server_request_id: Option<String>,
    },

    /// The output token cap was hit; the truncated text is returned.
    Length {
        /// Client-assigned request id.
        request_id: String,
        /// Truncated completion text.
        truncated_text: String,
        /// Human-readable reason.
        reason: String,
    },

    /// Generated content tripped the content policy.
    Filtered {
        /// Client-assigned request id.
        request_id: String,
        /// Filter category, when the server named one.
        #[serde(skip_serializing_if = "Option::is_none")]
        category: Option<String>,
        /// Human-readable reason.
        reason: String,
    },

    /// Content filter tripped and the retry-after-filter policy applies.
    ///
    /// Intermediate outcome: the orchestrator converts it into one bounded
    /// retry and never surfaces it from a retry attempt.
    FilteredRetry {
        /// Client-assigned request id.
        request_id: String,
        /// Text generated before the filter tripped, for retry context.
        filtered_text: String,
        /// Filter category, when the server named one.
        #[serde(skip_serializing_if = "Option::is_none")]
        category: Option<String>,
        /// Human-readable reason.
        reason: String,
    },

    /// Too many requests.
    RateLimited {
        /// Client-assigned request id.
        request_id: String,
        /// Server-suggested wait before retrying.
        #[serde(skip_serializing_if = "Option::is_none")]
        retry_after: Option<Duration>,
        /// Human-readable reason.
        reason: String,
    },

    /// Usage quota exhausted.
    QuotaExceeded {
        /// Client-assigned request id.
        request_id: String,
        /// Human-readable reason.
        reason: String,
    },

    /// The request was judged off topic.
    OffTopic {
        /// Client-assigned request id.
        request_id: String,
        /// Human-readable reason.
        reason: String,
    },

    /// Malformed request, expired/invalid credentials, or unsupported client.
    BadRequest {
        /// Client-assigned request id.
        request_id: String,
        /// Human-readable reason.
        reason: String,
    },

    /// The prompt itself was rejected.
    PromptFiltered {
        /// Client-assigned request id.
        request_id: String,
        /// Human-readable reason.
        reason: String,
    },

    /// The agent requires re-authorization.
    AgentUnauthorized {
        /// Client-assigned request id.
        request_id: String,
        /// URL the user must visit to re-authorize.
        auth_url: String,
        /// Human-readable reason.
        reason: String,
    },

    /// A dependency of the agent failed.
    AgentFailedDependency {
        /// Client-assigned request id.
        request_id: String,
        /// Human-readable reason.
        reason: String,
    },

    /// The extension is temporarily blocked.
    ExtensionBlocked {
        /// Client-assigned request id.
        request_id: String,
        /// How long to wait before retrying.
        retry_after: Duration,
        /// Link with more information.
        learn_more: String,
        /// Human-readable reason.
        reason: String,
    },

    /// Model or endpoint not found.
    NotFound {
        /// Client-assigned request id.
        request_id: String,
        /// Human-readable reason.
        reason: String,
    },

    /// The server rejected the supplied conversation marker.
    ///
    /// Triggers the one-shot stale-marker retry one layer up.
    InvalidStatefulMarker {
        /// Client-assigned request id.
        request_id: String,
        /// Human-readable reason.
        reason: String,
    },

    /// Network-level failure.
    NetworkError {
        /// Client-assigned request id.
        request_id: String,
        /// Human-readable reason.
        reason: String,
    },

    /// The fetch was cancelled.
    Canceled {
        /// Client-assigned request id.
        request_id: String,
        /// Cancellation reason.
        reason: String,
    },

    /// The stream finished in a state the client does not recognize.
    Unknown {
        /// Client-assigned request id.
        request_id: String,
        /// Human-readable reason.
        reason: String,
    },

    /// Catch-all failure; the raw reason is preserved for diagnostics.
    Failed {
        /// Client-assigned request id.
        request_id: String,
        /// Raw failure reason.
        reason: String,
        /// Stream-reported error, when one was seen.
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<StreamingError>,
    },
}

impl ChatResponse {
    /// The client-assigned request id carried by every outcome.
    #[must_use]
    pub fn request_id(&self) -> &str {
        match self {
            Self::Success { request_id, .. }
            | Self::Length { request_id, .. }
            | Self::Filtered { request_id, .. }
            | Self::FilteredRetry { request_id, .. }
            | Self::RateLimited { request_id, .. }
            | Self::QuotaExceeded { request_id, .. }
            | Self::OffTopic { request_id, .. }
            | Self::BadRequest { request_id, .. }
            | Self::PromptFiltered { request_id, .. }
            | Self::AgentUnauthorized { request_id, .. }
            | Self::AgentFailedDependency { request_id, .. }
            | Self::ExtensionBlocked { request_id, .. }
            | Self::NotFound { request_id, .. }
            | Self::InvalidStatefulMarker { request_id, .. }
            | Self::NetworkError { request_id, .. }
            | Self::Canceled { request_id, .. }
            | Self::Unknown { request_id, .. }
            | Self::Failed { request_id, .. } => request_id,
        }
    }

    /// The human-readable reason for non-success outcomes.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Length { reason, .. }
            | Self::Filtered { reason, .. }
            | Self::FilteredRetry { reason, .. }
            | Self::RateLimited { reason, .. }
            | Self::QuotaExceeded { reason, .. }
            | Self::OffTopic { reason, .. }
            | Self::BadRequest { reason, .. }
            | Self::PromptFiltered { reason, .. }
            | Self::AgentUnauthorized { reason, .. }
            | Self::AgentFailedDependency { reason, .. }
            | Self::ExtensionBlocked { reason, .. }
            | Self::NotFound { reason, .. }
            | Self::InvalidStatefulMarker { reason, .. }
            | Self::NetworkError { reason, .. }
            | Self::Canceled { reason, .. }
            | Self::Unknown { reason, .. }
            | Self::Failed { reason, .. } => Some(reason),
        }
    }

    /// Whether this is a success outcome.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The first accepted completion text, if successful.
    #[must_use]
    pub fn first_text(&self) -> Option<&str> {
        match self {
            Self::Success { texts, .. } => texts.first().map(String::as_str),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_on_every_variant() {
        let response = ChatResponse::Canceled {
            request_id: "req_1".into(),
            reason: "aborted".into(),
        };
        assert_eq!(response.request_id(), "req_1");
        assert_eq!(response.reason(), Some("aborted"));
        assert!(!response.is_success());
    }

    #[test]
    fn test_success_text_access() {
        let response = ChatResponse::Success {
            request_id: "req_2".into(),
            texts: vec!["hello".into()],
            usage: Some(TokenUsage::with_tokens(3, 1)),
            server_request_id: None,
        };
        assert!(response.is_success());
        assert_eq!(response.first_text(), Some("hello"));
        assert_eq!(response.reason(), None);
    }
}
