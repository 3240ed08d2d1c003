//! Conversation marker resolution.
//!
//! Decides whether a prior "continue this server-side conversation" marker
//! applies to a request, and which message slice to send when it does.

use overture_core::{ChatMessage, ConversationMarker, Role};

/// A resolved marker anchor in the message history.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerAnchor {
    /// The marker to send as the continuation token.
    pub marker: ConversationMarker,
    /// Index of the anchoring assistant message; only messages *after* this
    /// index are sent with the request.
    pub index: usize,
}

/// Find the marker anchor for `model_id`, scanning from the most recent
/// message backward. A marker tagged for a different model never matches.
#[must_use]
pub fn resolve_marker(model_id: &str, messages: &[ChatMessage]) -> Option<MarkerAnchor> {
    messages
        .iter()
        .enumerate()
        .rev()
        .filter(|(_, message)| message.role == Role::Assistant)
        .find_map(|(index, message)| {
            message
                .conversation_marker()
                .filter(|marker| marker.model_id == model_id)
                .map(|marker| MarkerAnchor {
                    marker: marker.clone(),
                    index,
                })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use overture_core::{ContentPart, OpaquePart};

    fn marked_assistant(text: &str, model_id: &str, marker: &str) -> ChatMessage {
        ChatMessage::assistant(text).with_part(ContentPart::Opaque(OpaquePart::marker(
            ConversationMarker::new(model_id, marker),
        )))
    }

    #[test]
    fn test_matching_model_anchors_most_recent() {
        let messages = vec![
            ChatMessage::user("one"),
            marked_assistant("reply one", "model-x", "resp_1"),
            ChatMessage::user("two"),
            marked_assistant("reply two", "model-x", "resp_2"),
            ChatMessage::user("three"),
        ];

        let anchor = resolve_marker("model-x", &messages).unwrap();
        assert_eq!(anchor.index, 3);
        assert_eq!(anchor.marker.marker, "resp_2");
        // The request body would carry only messages after the anchor.
        assert_eq!(messages[anchor.index + 1..].len(), 1);
    }

    #[test]
    fn test_other_model_marker_ignored() {
        let messages = vec![
            ChatMessage::user("one"),
            marked_assistant("reply", "model-x", "resp_1"),
            ChatMessage::user("two"),
        ];
        assert_eq!(resolve_marker("model-y", &messages), None);
    }

    #[test]
    fn test_unmarked_history_has_no_anchor() {
        let messages = vec![
            ChatMessage::user("one"),
            ChatMessage::assistant("plain reply"),
        ];
        assert_eq!(resolve_marker("model-x", &messages), None);
    }

    #[test]
    fn test_marker_on_user_message_never_matches() {
        // Markers are only meaningful on assistant messages.
        let odd = ChatMessage::user("odd").with_part(ContentPart::Opaque(OpaquePart::marker(
            ConversationMarker::new("model-x", "resp_9"),
        )));
        assert_eq!(resolve_marker("model-x", &[odd]), None);
    }
}
