//! Terminal completion types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::delta::StreamingError;
use crate::message::ChatMessage;
use crate::usage::TokenUsage;

/// Why the model stopped generating for one choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural end of response.
    Stop,
    /// Output token cap reached.
    Length,
    /// Model wants to call tools.
    ToolCalls,
    /// Model wants to call a single function (legacy shape).
    FunctionCall,
    /// Generated content was filtered.
    ContentFilter,
    /// The server reported an error mid-generation.
    ServerError,
    /// The client trimmed the response itself.
    ClientTrimmed,
}

impl FinishReason {
    /// Whether this reason counts as a usable, successful finish.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            Self::Stop | Self::ClientTrimmed | Self::ToolCalls | Self::FunctionCall
        )
    }
}

/// The terminal aggregate for one streamed choice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletion {
    /// The assembled assistant message.
    pub message: ChatMessage,
    /// Why generation stopped.
    pub finish_reason: FinishReason,
    /// Token usage, when the server reported it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    /// Client-assigned request id.
    pub request_id: String,
    /// Server-assigned request id, when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_request_id: Option<String>,
    /// Content-filter category, when `finish_reason` is `ContentFilter`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_reason: Option<String>,
    /// Stream-reported error, when `finish_reason` is `ServerError`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<StreamingError>,
    /// When the completion was assembled.
    pub timestamp: DateTime<Utc>,
}

impl ChatCompletion {
    /// Create a completion for an assembled message.
    #[must_use]
    pub fn new(message: ChatMessage, finish_reason: FinishReason, request_id: impl Into<String>) -> Self {
        Self {
            message,
            finish_reason,
            usage: None,
            request_id: request_id.into(),
            server_request_id: None,
            filter_reason: None,
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// Set the usage counters.
    #[must_use]
    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Set the server-assigned request id.
    #[must_use]
    pub fn with_server_request_id(mut self, id: impl Into<String>) -> Self {
        self.server_request_id = Some(id.into());
        self
    }

    /// Set the content-filter category.
    #[must_use]
    pub fn with_filter_reason(mut self, reason: impl Into<String>) -> Self {
        self.filter_reason = Some(reason.into());
        self
    }

    /// Set the stream-reported error.
    #[must_use]
    pub fn with_error(mut self, error: StreamingError) -> Self {
        self.error = Some(error);
        self
    }

    /// Concatenated text of the assembled message.
    #[must_use]
    pub fn text(&self) -> String {
        self.message.text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_reasons() {
        assert!(FinishReason::Stop.is_success());
        assert!(FinishReason::ClientTrimmed.is_success());
        assert!(FinishReason::ToolCalls.is_success());
        assert!(FinishReason::FunctionCall.is_success());
        assert!(!FinishReason::ContentFilter.is_success());
        assert!(!FinishReason::Length.is_success());
        assert!(!FinishReason::ServerError.is_success());
    }

    #[test]
    fn test_completion_text() {
        let completion = ChatCompletion::new(
            ChatMessage::assistant("done"),
            FinishReason::Stop,
            "req_1",
        );
        assert_eq!(completion.text(), "done");
    }
}
