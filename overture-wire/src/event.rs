//! The sealed union of recognized wire events.
//!
//! Each frame's `event:` tag is matched exactly once here. Unknown tags map
//! to [`WireEvent::Ignored`] so new server-side event kinds do not break the
//! client; malformed JSON inside a recognized event is terminal for the
//! stream.

use serde::Deserialize;

use crate::error::{WireError, WireResult};
use crate::frame::Frame;

/// Raw log probability entry as sent on the wire.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawLogProb {
    /// Token text.
    pub token: String,
    /// Natural-log probability.
    pub logprob: f64,
}

/// Payload of a text delta event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OutputTextDelta {
    /// Text fragment.
    pub delta: String,
    /// Log probabilities for the fragment's tokens.
    #[serde(default)]
    pub logprobs: Vec<RawLogProb>,
}

/// One content part inside a completed message item.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputContent {
    /// Final answer text.
    OutputText {
        /// The text.
        text: String,
    },
    /// A generated image.
    OutputImage {
        /// Image URL (typically a data URL).
        url: String,
    },
    /// Content kind this client does not handle.
    #[serde(other)]
    Unknown,
}

/// One output item, streamed via `added`/`done` or listed on completion.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputItem {
    /// A function/tool call.
    FunctionCall {
        /// Server item id.
        #[serde(default)]
        id: Option<String>,
        /// Call correlation id.
        #[serde(default)]
        call_id: Option<String>,
        /// Function name.
        name: String,
        /// Complete arguments text (present on the done frame).
        #[serde(default)]
        arguments: String,
    },
    /// An assistant message.
    Message {
        /// Ordered content parts.
        #[serde(default)]
        content: Vec<OutputContent>,
    },
    /// A reasoning item.
    Reasoning {
        /// Server item id.
        #[serde(default)]
        id: Option<String>,
    },
    /// Item kind this client does not handle.
    #[serde(other)]
    Unknown,
}

impl OutputItem {
    /// The call-correlation id of a function call, preferring `call_id`.
    #[must_use]
    pub fn call_id(&self) -> Option<&str> {
        match self {
            Self::FunctionCall { id, call_id, .. } => {
                call_id.as_deref().or(id.as_deref())
            }
            _ => None,
        }
    }
}

/// Envelope carrying one output item.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ItemEnvelope {
    /// The item.
    pub item: OutputItem,
}

/// Payload of a reasoning text delta.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReasoningTextDelta {
    /// Reasoning item id.
    pub item_id: String,
    /// Text fragment.
    pub delta: String,
}

/// A completed reasoning summary part.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReasoningPartDone {
    /// Reasoning item id; doubles as the call-correlation key.
    pub item_id: String,
    /// Index of the summary part.
    #[serde(default)]
    pub summary_index: u32,
    /// The completed part.
    pub part: ReasoningPart,
}

/// Body of a completed reasoning part.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReasoningPart {
    /// Completed reasoning text.
    #[serde(default)]
    pub text: String,
}

/// Usage counters as sent on the wire.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct RawUsage {
    /// Prompt tokens.
    #[serde(default)]
    pub input_tokens: u64,
    /// Completion tokens.
    #[serde(default)]
    pub output_tokens: u64,
    /// Total tokens.
    #[serde(default)]
    pub total_tokens: u64,
    /// Prompt token details.
    #[serde(default)]
    pub input_tokens_details: Option<InputTokenDetails>,
    /// Completion token details.
    #[serde(default)]
    pub output_tokens_details: Option<OutputTokenDetails>,
}

/// Prompt-side token details.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct InputTokenDetails {
    /// Tokens served from cache.
    #[serde(default)]
    pub cached_tokens: u64,
}

/// Completion-side token details.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct OutputTokenDetails {
    /// Tokens spent on reasoning.
    #[serde(default)]
    pub reasoning_tokens: u64,
}

/// Why a response ended incomplete.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct IncompleteDetails {
    /// Server-named reason, e.g. `max_output_tokens` or `content_filter`.
    #[serde(default)]
    pub reason: String,
}

/// Terminal error info attached to a failed response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResponseError {
    /// Provider error code.
    #[serde(default)]
    pub code: Option<String>,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
}

/// The terminal response object.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CompletedResponse {
    /// Server-assigned turn id; becomes the new conversation marker.
    pub id: String,
    /// Final output items in server-provided order.
    #[serde(default)]
    pub output: Vec<OutputItem>,
    /// Usage counters.
    #[serde(default)]
    pub usage: Option<RawUsage>,
    /// Present when the response ended incomplete.
    #[serde(default)]
    pub incomplete_details: Option<IncompleteDetails>,
    /// Present when the response failed server-side.
    #[serde(default)]
    pub error: Option<ResponseError>,
}

/// Envelope of the completed event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CompletedEnvelope {
    /// The terminal response.
    pub response: CompletedResponse,
}

/// Error payload; tolerates both flat and `{"error": {...}}` shapes.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ErrorPayload {
    /// Agent that reported the error.
    #[serde(default)]
    pub agent: Option<String>,
    /// Provider error code.
    #[serde(default)]
    pub code: Option<String>,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    error: Option<Box<ErrorPayload>>,
}

impl ErrorPayload {
    /// Unwrap a nested `error` object if the flat fields are empty.
    #[must_use]
    pub fn flatten(self) -> Self {
        match self.error {
            Some(inner) if self.message.is_empty() => inner.flatten(),
            _ => Self {
                error: None,
                ..self
            },
        }
    }
}

/// A recognized wire event, matched exactly once per frame.
#[derive(Debug, Clone, PartialEq)]
pub enum WireEvent {
    /// `response.output_text.delta`
    OutputTextDelta(OutputTextDelta),
    /// `response.output_item.added`
    OutputItemAdded(OutputItem),
    /// `response.output_item.done`
    OutputItemDone(OutputItem),
    /// `response.reasoning_summary_text.delta`
    ReasoningTextDelta(ReasoningTextDelta),
    /// `response.reasoning_summary_part.done`
    ReasoningPartDone(ReasoningPartDone),
    /// `response.completed`
    Completed(CompletedResponse),
    /// `response.incomplete`
    Incomplete(CompletedResponse),
    /// `response.failed`
    Failed(CompletedResponse),
    /// `error`
    Error(ErrorPayload),
    /// Any tag this client does not recognize.
    Ignored,
}

impl WireEvent {
    /// Parse one frame into a wire event.
    ///
    /// Unknown event tags produce [`WireEvent::Ignored`]; malformed JSON in a
    /// recognized event is a [`WireError::MalformedPayload`].
    pub fn from_frame(frame: &Frame) -> WireResult<Self> {
        fn parse<'de, T: Deserialize<'de>>(event: &str, data: &'de str) -> WireResult<T> {
            serde_json::from_str(data).map_err(|source| WireError::MalformedPayload {
                event: event.to_string(),
                source,
            })
        }

        let Some(event) = frame.event.as_deref() else {
            return Ok(Self::Ignored);
        };

        match event {
            "response.output_text.delta" => {
                Ok(Self::OutputTextDelta(parse(event, &frame.data)?))
            }
            "response.output_item.added" => {
                let envelope: ItemEnvelope = parse(event, &frame.data)?;
                Ok(Self::OutputItemAdded(envelope.item))
            }
            "response.output_item.done" => {
                let envelope: ItemEnvelope = parse(event, &frame.data)?;
                Ok(Self::OutputItemDone(envelope.item))
            }
            "response.reasoning_summary_text.delta" => {
                Ok(Self::ReasoningTextDelta(parse(event, &frame.data)?))
            }
            "response.reasoning_summary_part.done" => {
                Ok(Self::ReasoningPartDone(parse(event, &frame.data)?))
            }
            "response.completed" => {
                let envelope: CompletedEnvelope = parse(event, &frame.data)?;
                Ok(Self::Completed(envelope.response))
            }
            "response.incomplete" => {
                let envelope: CompletedEnvelope = parse(event, &frame.data)?;
                Ok(Self::Incomplete(envelope.response))
            }
            "response.failed" => {
                let envelope: CompletedEnvelope = parse(event, &frame.data)?;
                Ok(Self::Failed(envelope.response))
            }
            "error" => {
                let payload: ErrorPayload = parse(event, &frame.data)?;
                Ok(Self::Error(payload.flatten()))
            }
            _ => Ok(Self::Ignored),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_text_delta_event() {
        let frame = Frame::new(
            "response.output_text.delta",
            r#"{"delta":"Hello","logprobs":[{"token":"Hello","logprob":-0.1}]}"#,
        );
        let event = WireEvent::from_frame(&frame).unwrap();
        let WireEvent::OutputTextDelta(delta) = event else {
            panic!("expected text delta, got {event:?}");
        };
        assert_eq!(delta.delta, "Hello");
        assert_eq!(delta.logprobs.len(), 1);
    }

    #[test]
    fn test_function_call_item() {
        let frame = Frame::new(
            "response.output_item.done",
            r#"{"item":{"type":"function_call","id":"item_1","call_id":"call_9","name":"search","arguments":"{\"q\":\"rust\"}"}}"#,
        );
        let event = WireEvent::from_frame(&frame).unwrap();
        let WireEvent::OutputItemDone(item) = event else {
            panic!("expected item done");
        };
        assert_eq!(item.call_id(), Some("call_9"));
    }

    #[test]
    fn test_unknown_event_is_ignored() {
        let frame = Frame::new("response.shiny.new_thing", r#"{"whatever":true}"#);
        assert_eq!(WireEvent::from_frame(&frame).unwrap(), WireEvent::Ignored);
    }

    #[test]
    fn test_unknown_item_kind_tolerated() {
        let frame = Frame::new(
            "response.output_item.added",
            r#"{"item":{"type":"web_search_call","status":"searching"}}"#,
        );
        let event = WireEvent::from_frame(&frame).unwrap();
        assert_eq!(event, WireEvent::OutputItemAdded(OutputItem::Unknown));
    }

    #[test]
    fn test_malformed_payload_is_terminal() {
        let frame = Frame::new("response.output_text.delta", "{not json");
        let err = WireEvent::from_frame(&frame).unwrap_err();
        assert!(matches!(err, WireError::MalformedPayload { .. }));
    }

    #[test]
    fn test_nested_error_payload_flattened() {
        let frame = Frame::new(
            "error",
            r#"{"error":{"code":"overloaded","message":"try again"}}"#,
        );
        let WireEvent::Error(payload) = WireEvent::from_frame(&frame).unwrap() else {
            panic!("expected error event");
        };
        assert_eq!(payload.code.as_deref(), Some("overloaded"));
        assert_eq!(payload.message, "try again");
    }

    #[test]
    fn test_completed_event() {
        let frame = Frame::new(
            "response.completed",
            r#"{"response":{"id":"resp_42","output":[{"type":"message","content":[{"type":"output_text","text":"done"}]}],"usage":{"input_tokens":10,"output_tokens":4,"total_tokens":14,"input_tokens_details":{"cached_tokens":8},"output_tokens_details":{"reasoning_tokens":2}}}}"#,
        );
        let WireEvent::Completed(response) = WireEvent::from_frame(&frame).unwrap() else {
            panic!("expected completed event");
        };
        assert_eq!(response.id, "resp_42");
        assert_eq!(response.output.len(), 1);
        let usage = response.usage.unwrap();
        assert_eq!(usage.input_tokens_details.unwrap().cached_tokens, 8);
    }
}
