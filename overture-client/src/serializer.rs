//! Endpoint-specific request body serialization.
//!
//! The orchestrator hands the resolved message slice to an injected
//! serializer; the default one targets the event-streamed responses
//! endpoint this client speaks.

use std::sync::Arc;

use overture_core::{ChatMessage, ContentPart, FetchSettings, Role, ToolSpec};
use overture_wire::ReasoningStore;
use serde_json::{json, Value};

/// Everything the serializer needs for one request body.
#[derive(Clone, Copy)]
pub struct RequestContext<'a> {
    /// Target model id.
    pub model_id: &'a str,
    /// Message slice to send (already truncated at the marker anchor).
    pub messages: &'a [ChatMessage],
    /// Per-request overrides.
    pub settings: &'a FetchSettings,
    /// Declared tools.
    pub tools: &'a [ToolSpec],
    /// Continuation token, when a marker anchor applied.
    pub marker: Option<&'a str>,
}

/// Builds the endpoint-specific JSON body.
pub trait EndpointSerializer: Send + Sync {
    /// Serialize one request.
    fn serialize(&self, ctx: &RequestContext<'_>) -> Value;
}

/// Serializer for the streamed responses endpoint.
pub struct ResponsesSerializer {
    reasoning: Option<Arc<dyn ReasoningStore>>,
}

impl ResponsesSerializer {
    /// Create a serializer without reasoning re-attachment.
    #[must_use]
    pub fn new() -> Self {
        Self { reasoning: None }
    }

    /// Re-attach stored reasoning summaries to assistant tool calls.
    #[must_use]
    pub fn with_reasoning(mut self, store: Arc<dyn ReasoningStore>) -> Self {
        self.reasoning = Some(store);
        self
    }

    fn serialize_message(&self, message: &ChatMessage, input: &mut Vec<Value>) {
        match message.role {
            Role::Tool => {
                input.push(json!({
                    "type": "function_call_output",
                    "call_id": message.tool_call_id.clone().unwrap_or_default(),
                    "output": message.text(),
                }));
            }
            role => {
                let content = serialize_content(role, &message.content);
                if !content.is_empty() {
                    input.push(json!({
                        "role": role_str(role),
                        "content": content,
                    }));
                }
                for call in &message.tool_calls {
                    let mut item = json!({
                        "type": "function_call",
                        "call_id": call.id,
                        "name": call.name,
                        "arguments": call.arguments,
                    });
                    if let Some(store) = &self.reasoning {
                        if let Some(summary) = store.get(&call.id) {
                            item["reasoning"] = Value::String(summary);
                        }
                    }
                    input.push(item);
                }
            }
        }
    }
}

impl Default for ResponsesSerializer {
    fn default() -> Self {
        Self::new()
    }
}

impl EndpointSerializer for ResponsesSerializer {
    fn serialize(&self, ctx: &RequestContext<'_>) -> Value {
        let mut input = Vec::new();
        for message in ctx.messages {
            self.serialize_message(message, &mut input);
        }

        let mut body = json!({
            "model": ctx.model_id,
            "input": input,
            "stream": true,
        });

        if let Some(marker) = ctx.marker {
            body["previous_response_id"] = Value::String(marker.to_string());
        }
        if let Some(max_tokens) = ctx.settings.max_tokens {
            body["max_output_tokens"] = json!(max_tokens);
        }
        if let Some(temperature) = ctx.settings.temperature {
            body["temperature"] = json!(temperature);
        }
        if let Some(top_p) = ctx.settings.top_p {
            body["top_p"] = json!(top_p);
        }
        if let Some(n) = ctx.settings.n {
            body["n"] = json!(n);
        }
        if let Some(logprobs) = ctx.settings.logprobs {
            body["logprobs"] = json!(logprobs);
        }
        if !ctx.tools.is_empty() {
            let tools: Vec<Value> = ctx
                .tools
                .iter()
                .map(|tool| {
                    json!({
                        "type": "function",
                        "name": tool.name,
                        "description": tool.description,
                        "parameters": tool.parameters,
                    })
                })
                .collect();
            body["tools"] = Value::Array(tools);
        }

        body
    }
}

fn role_str(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    }
}

fn serialize_content(role: Role, parts: &[ContentPart]) -> Vec<Value> {
    let text_type = match role {
        Role::Assistant => "output_text",
        _ => "input_text",
    };

    parts
        .iter()
        .filter_map(|part| match part {
            ContentPart::Text { text } => Some(json!({ "type": text_type, "text": text })),
            ContentPart::Image { url, detail } => Some(json!({
                "type": "input_image",
                "image_url": url,
                "detail": detail,
            })),
            // Markers travel via previous_response_id, not the body.
            ContentPart::CacheBreakpoint | ContentPart::Opaque(_) => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use overture_core::ToolCall;
    use pretty_assertions::assert_eq;
    use overture_wire::InMemoryReasoningStore;

    fn ctx<'a>(
        messages: &'a [ChatMessage],
        settings: &'a FetchSettings,
        tools: &'a [ToolSpec],
        marker: Option<&'a str>,
    ) -> RequestContext<'a> {
        RequestContext {
            model_id: "model-x",
            messages,
            settings,
            tools,
            marker,
        }
    }

    #[test]
    fn test_basic_body() {
        let messages = vec![ChatMessage::system("be brief"), ChatMessage::user("hi")];
        let settings = FetchSettings::new().max_tokens(128).temperature(0.1);
        let body = ResponsesSerializer::new().serialize(&ctx(&messages, &settings, &[], None));

        assert_eq!(body["model"], "model-x");
        assert_eq!(body["stream"], true);
        assert_eq!(body["max_output_tokens"], 128);
        assert_eq!(body["input"].as_array().unwrap().len(), 2);
        assert!(body.get("previous_response_id").is_none());
    }

    #[test]
    fn test_marker_becomes_previous_response_id() {
        let messages = vec![ChatMessage::user("continue")];
        let settings = FetchSettings::new();
        let body =
            ResponsesSerializer::new().serialize(&ctx(&messages, &settings, &[], Some("resp_7")));
        assert_eq!(body["previous_response_id"], "resp_7");
    }

    #[test]
    fn test_tool_messages_become_function_call_output() {
        let messages = vec![ChatMessage::tool("call_1", "{\"answer\":42}")];
        let settings = FetchSettings::new();
        let body = ResponsesSerializer::new().serialize(&ctx(&messages, &settings, &[], None));
        let item = &body["input"][0];
        assert_eq!(item["type"], "function_call_output");
        assert_eq!(item["call_id"], "call_1");
    }

    #[test]
    fn test_reasoning_reattached_to_tool_calls() {
        let store = InMemoryReasoningStore::shared();
        store.put("call_1", "thought it through".into());

        let messages = vec![ChatMessage::assistant("").with_tool_calls(vec![ToolCall::new(
            "call_1", "search", "{}",
        )])];
        let settings = FetchSettings::new();
        let body = ResponsesSerializer::new()
            .with_reasoning(store)
            .serialize(&ctx(&messages, &settings, &[], None));

        let call = body["input"]
            .as_array()
            .unwrap()
            .iter()
            .find(|item| item["type"] == "function_call")
            .unwrap();
        assert_eq!(call["reasoning"], "thought it through");
    }
}
