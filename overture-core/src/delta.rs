//! Incremental streaming units.
//!
//! A [`ResponseDelta`] is one unit handed to the caller's streaming callback.
//! `text` is always present (possibly empty); at most one of the optional
//! payloads is semantically meaningful per delta.

use serde::{Deserialize, Serialize};

use crate::message::{ConversationMarker, ToolCall};

/// Log probability for one token, located within a single delta's text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenLogProb {
    /// The token text.
    pub token: String,
    /// Natural-log probability.
    pub logprob: f64,
    /// Byte range `[start, end)` of the token's first occurrence within the
    /// delta's UTF-8 bytes. Tokens may legitimately repeat inside one delta;
    /// only the first match is located.
    pub span: [u32; 2],
}

/// A tool call opening: the name is known, the id is not yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallBegin {
    /// Function name.
    pub name: String,
}

/// An incremental fragment of a tool call's arguments.
///
/// Not produced by every protocol variant; the variant handled by the stream
/// processor delivers arguments atomically on the done frame instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallDelta {
    /// Call correlation id.
    pub id: String,
    /// Fragment to append to the arguments text.
    pub arguments_fragment: String,
}

/// A fragment of reasoning ("thinking") text for one reasoning item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThinkingDelta {
    /// Reasoning item id.
    pub id: String,
    /// Accumulated reasoning text so far for this item.
    pub text: String,
    /// Whether this item's reasoning is complete.
    pub done: bool,
}

/// A non-terminal error reported inside the stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamingError {
    /// Agent that reported the error, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    /// Provider error code, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Human-readable message.
    pub message: String,
}

/// One incremental unit of a streaming response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseDelta {
    /// Text fragment to append (possibly empty).
    pub text: String,
    /// Log probabilities for the tokens of this delta.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logprobs: Option<Vec<TokenLogProb>>,
    /// A tool call opened.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_begin: Option<ToolCallBegin>,
    /// A tool call argument fragment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_delta: Option<ToolCallDelta>,
    /// A tool call finalized, arguments complete.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_done: Option<ToolCall>,
    /// Reasoning text fragment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking: Option<ThinkingDelta>,
    /// Errors reported inside the stream.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<StreamingError>>,
    /// New conversation marker assigned by the server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_marker: Option<ConversationMarker>,
}

impl ResponseDelta {
    /// A text-only delta.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// A text delta with logprobs.
    #[must_use]
    pub fn text_with_logprobs(text: impl Into<String>, logprobs: Vec<TokenLogProb>) -> Self {
        Self {
            text: text.into(),
            logprobs: Some(logprobs),
            ..Self::default()
        }
    }

    /// A zero-text delta announcing an opened tool call.
    #[must_use]
    pub fn tool_call_begin(name: impl Into<String>) -> Self {
        Self {
            tool_call_begin: Some(ToolCallBegin { name: name.into() }),
            ..Self::default()
        }
    }

    /// A zero-text delta finalizing a tool call.
    #[must_use]
    pub fn tool_call_done(call: ToolCall) -> Self {
        Self {
            tool_call_done: Some(call),
            ..Self::default()
        }
    }

    /// A zero-text reasoning delta.
    #[must_use]
    pub fn thinking(id: impl Into<String>, text: impl Into<String>, done: bool) -> Self {
        Self {
            thinking: Some(ThinkingDelta {
                id: id.into(),
                text: text.into(),
                done,
            }),
            ..Self::default()
        }
    }

    /// A zero-text delta carrying a stream-reported error.
    #[must_use]
    pub fn error(error: StreamingError) -> Self {
        Self {
            errors: Some(vec![error]),
            ..Self::default()
        }
    }

    /// A zero-text delta carrying the server-assigned conversation marker.
    #[must_use]
    pub fn marker(marker: ConversationMarker) -> Self {
        Self {
            conversation_marker: Some(marker),
            ..Self::default()
        }
    }
}
