//! Chat message and content part types.
//!
//! Messages are owned by the caller for the duration of one request and are
//! never mutated after being handed to the next pipeline stage; extension is
//! always copy-on-extend.

use serde::{Deserialize, Serialize};

/// The author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// System / developer instructions.
    System,
    /// End-user input.
    User,
    /// Model output.
    Assistant,
    /// Tool result fed back to the model.
    Tool,
}

/// A server-issued continuation token embedded in an assistant message.
///
/// The marker lets the server recall prior turns without the client
/// resending them. It is only meaningful for the model that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMarker {
    /// Model that issued the marker.
    pub model_id: String,
    /// Opaque continuation token.
    pub marker: String,
}

impl ConversationMarker {
    /// Create a new marker.
    pub fn new(model_id: impl Into<String>, marker: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            marker: marker.into(),
        }
    }
}

/// Opaque content attached to a message by a prior turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpaquePart {
    /// Raw opaque value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    /// Conversation marker, if this part carries one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_marker: Option<ConversationMarker>,
}

impl OpaquePart {
    /// Opaque part carrying a conversation marker.
    #[must_use]
    pub fn marker(marker: ConversationMarker) -> Self {
        Self {
            value: None,
            conversation_marker: Some(marker),
        }
    }

    /// Opaque part wrapping an arbitrary value.
    #[must_use]
    pub fn value(value: serde_json::Value) -> Self {
        Self {
            value: Some(value),
            conversation_marker: None,
        }
    }
}

/// Level of detail for image content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageDetail {
    /// Provider decides.
    #[default]
    Auto,
    /// Low resolution.
    Low,
    /// High resolution.
    High,
}

/// One ordered piece of message content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Plain text.
    Text {
        /// The text.
        text: String,
    },
    /// Image reference.
    Image {
        /// Image URL (may be a data URL).
        url: String,
        /// Requested detail level.
        #[serde(default)]
        detail: ImageDetail,
    },
    /// Prompt-cache breakpoint hint.
    CacheBreakpoint,
    /// Opaque payload, possibly carrying a [`ConversationMarker`].
    Opaque(OpaquePart),
}

impl ContentPart {
    /// Text part.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Image part with default detail.
    pub fn image(url: impl Into<String>) -> Self {
        Self::Image {
            url: url.into(),
            detail: ImageDetail::default(),
        }
    }

    /// The text content, if this is a text part.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }

    /// The conversation marker, if this part carries one.
    #[must_use]
    pub fn conversation_marker(&self) -> Option<&ConversationMarker> {
        match self {
            Self::Opaque(part) => part.conversation_marker.as_ref(),
            _ => None,
        }
    }
}

/// A tool invocation requested by the model.
///
/// `arguments` is assembled incrementally during streaming and is guaranteed
/// to be valid JSON only once the call is done.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Call correlation id.
    pub id: String,
    /// Function name.
    pub name: String,
    /// Arguments as a JSON string.
    pub arguments: String,
}

impl ToolCall {
    /// Create a completed tool call.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

/// A tool declared by the caller for the model to use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Function name. Must match `^[a-zA-Z0-9_-]+$`.
    pub name: String,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON schema for the arguments.
    pub parameters: serde_json::Value,
}

impl ToolSpec {
    /// Create a tool declaration.
    pub fn new(name: impl Into<String>, parameters: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            description: None,
            parameters,
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// One message in a chat history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who authored the message.
    pub role: Role,
    /// Ordered content parts.
    pub content: Vec<ContentPart>,
    /// Tool calls issued by an assistant message.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// For tool messages, the call this result answers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    /// Create a message with the given role and parts.
    #[must_use]
    pub fn new(role: Role, content: Vec<ContentPart>) -> Self {
        Self {
            role,
            content,
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// A system message with plain text.
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, vec![ContentPart::text(text)])
    }

    /// A user message with plain text.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, vec![ContentPart::text(text)])
    }

    /// An assistant message with plain text.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, vec![ContentPart::text(text)])
    }

    /// A tool-result message answering `tool_call_id`.
    pub fn tool(tool_call_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: vec![ContentPart::text(text)],
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    /// Attach tool calls (assistant messages only by convention).
    #[must_use]
    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCall>) -> Self {
        self.tool_calls = tool_calls;
        self
    }

    /// Return a copy with an extra content part appended.
    #[must_use]
    pub fn with_part(&self, part: ContentPart) -> Self {
        let mut copy = self.clone();
        copy.content.push(part);
        copy
    }

    /// Concatenated text of all text parts.
    #[must_use]
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(ContentPart::as_text)
            .collect()
    }

    /// The conversation marker carried by this message, if any.
    #[must_use]
    pub fn conversation_marker(&self) -> Option<&ConversationMarker> {
        self.content
            .iter()
            .find_map(ContentPart::conversation_marker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_text_helpers() {
        let msg = ChatMessage::user("hello");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.text(), "hello");
    }

    #[test]
    fn test_with_part_is_copy_on_extend() {
        let original = ChatMessage::assistant("a");
        let extended = original.with_part(ContentPart::text("b"));
        assert_eq!(original.content.len(), 1);
        assert_eq!(extended.text(), "ab");
    }

    #[test]
    fn test_marker_lookup() {
        let marker = ConversationMarker::new("model-x", "resp_123");
        let msg = ChatMessage::assistant("hi").with_part(ContentPart::Opaque(OpaquePart::marker(
            marker.clone(),
        )));
        assert_eq!(msg.conversation_marker(), Some(&marker));
        assert_eq!(ChatMessage::user("plain").conversation_marker(), None);
    }

    #[test]
    fn test_content_part_serde_tagging() {
        let json = serde_json::to_value(ContentPart::text("x")).unwrap();
        assert_eq!(json["type"], "text");
        let json = serde_json::to_value(ContentPart::CacheBreakpoint).unwrap();
        assert_eq!(json["type"], "cache_breakpoint");
    }
}
