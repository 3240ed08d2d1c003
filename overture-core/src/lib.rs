//! # overture-core
//!
//! Core types for the overture chat-completion client:
//!
//! - **Messages**: chat history, content parts, tool calls, conversation markers
//! - **Deltas**: the incremental units emitted while a response streams
//! - **Completions**: the terminal aggregate for one streamed choice
//! - **Outcomes**: the closed `ChatResponse` taxonomy every fetch resolves to
//! - **Usage**: token accounting attached to completions
//! - **Settings**: per-request generation overrides

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod completion;
pub mod delta;
pub mod identifier;
pub mod message;
pub mod outcome;
pub mod settings;
pub mod usage;

pub use completion::{ChatCompletion, FinishReason};
pub use delta::{ResponseDelta, StreamingError, ThinkingDelta, TokenLogProb, ToolCallBegin, ToolCallDelta};
pub use identifier::{generate_request_id, now_utc};
pub use message::{
    ChatMessage, ContentPart, ConversationMarker, ImageDetail, OpaquePart, Role, ToolCall, ToolSpec,
};
pub use outcome::ChatResponse;
pub use settings::FetchSettings;
pub use usage::TokenUsage;

/// Prelude module for common imports.
pub mod prelude {
    pub use crate::completion::{ChatCompletion, FinishReason};
    pub use crate::delta::{ResponseDelta, TokenLogProb};
    pub use crate::message::{
        ChatMessage, ContentPart, ConversationMarker, Role, ToolCall, ToolSpec,
    };
    pub use crate::outcome::ChatResponse;
    pub use crate::settings::FetchSettings;
    pub use crate::usage::TokenUsage;
}
