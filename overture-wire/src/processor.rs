//! The per-request stream processor.
//!
//! A single-threaded, cooperative state machine: one instance per in-flight
//! request, consuming [`WireEvent`]s in arrival order and emitting normalized
//! [`ResponseDelta`]s plus one terminal [`ChatCompletion`]. Deltas are
//! emitted strictly in frame-arrival order; accumulated text only ever
//! appends.

use std::collections::HashMap;
use std::sync::Arc;

use overture_core::{
    ChatCompletion, ChatMessage, ContentPart, ConversationMarker, FinishReason, ResponseDelta,
    Role, StreamingError, TokenLogProb, TokenUsage, ToolCall,
};

use crate::event::{
    CompletedResponse, ErrorPayload, OutputContent, OutputItem, OutputTextDelta, RawLogProb,
    RawUsage, ReasoningPartDone, ReasoningTextDelta, WireEvent,
};
use crate::store::ReasoningStore;

/// Result of processing one wire event.
#[derive(Debug)]
pub enum Step {
    /// A delta to hand to the streaming callback.
    Delta(ResponseDelta),
    /// The stream completed.
    Completed {
        /// Final delta carrying the new conversation marker.
        delta: ResponseDelta,
        /// Terminal aggregate for this choice.
        completion: Box<ChatCompletion>,
    },
    /// Nothing to emit (unhandled or unknown event).
    Skip,
}

/// Per-request state machine over wire events.
pub struct StreamProcessor {
    model_id: String,
    request_id: String,
    server_request_id: Option<String>,
    accumulated: String,
    reasoning: HashMap<String, String>,
    store: Arc<dyn ReasoningStore>,
    saw_text: bool,
}

impl StreamProcessor {
    /// Create a processor for one request.
    pub fn new(
        model_id: impl Into<String>,
        request_id: impl Into<String>,
        store: Arc<dyn ReasoningStore>,
    ) -> Self {
        Self {
            model_id: model_id.into(),
            request_id: request_id.into(),
            server_request_id: None,
            accumulated: String::new(),
            reasoning: HashMap::new(),
            store,
            saw_text: false,
        }
    }

    /// Attach the server-assigned request id from the transport headers.
    #[must_use]
    pub fn with_server_request_id(mut self, id: impl Into<String>) -> Self {
        self.server_request_id = Some(id.into());
        self
    }

    /// Text accumulated so far.
    #[must_use]
    pub fn accumulated_text(&self) -> &str {
        &self.accumulated
    }

    /// Whether any text delta has been emitted.
    #[must_use]
    pub fn has_emitted_text(&self) -> bool {
        self.saw_text
    }

    /// Consume one wire event.
    pub fn process(&mut self, event: WireEvent) -> Step {
        match event {
            WireEvent::OutputTextDelta(delta) => self.on_text_delta(delta),
            WireEvent::OutputItemAdded(item) => self.on_item_added(&item),
            WireEvent::OutputItemDone(item) => self.on_item_done(item),
            WireEvent::ReasoningTextDelta(delta) => self.on_reasoning_delta(delta),
            WireEvent::ReasoningPartDone(done) => self.on_reasoning_done(done),
            WireEvent::Completed(response) => {
                self.finalize(response, FinishReason::Stop, None, None)
            }
            WireEvent::Incomplete(response) => self.on_incomplete(response),
            WireEvent::Failed(response) => self.on_failed(response),
            WireEvent::Error(payload) => self.on_error(payload),
            WireEvent::Ignored => Step::Skip,
        }
    }

    fn on_text_delta(&mut self, delta: OutputTextDelta) -> Step {
        self.accumulated.push_str(&delta.delta);
        self.saw_text = true;

        let logprobs = locate_logprobs(&delta.delta, &delta.logprobs);
        let out = if logprobs.is_empty() {
            ResponseDelta::text(delta.delta)
        } else {
            ResponseDelta::text_with_logprobs(delta.delta, logprobs)
        };
        Step::Delta(out)
    }

    fn on_item_added(&mut self, item: &OutputItem) -> Step {
        match item {
            // The added frame carries the name only; no id yet.
            OutputItem::FunctionCall { name, .. } => {
                Step::Delta(ResponseDelta::tool_call_begin(name.clone()))
            }
            _ => Step::Skip,
        }
    }

    fn on_item_done(&mut self, item: OutputItem) -> Step {
        match item {
            OutputItem::FunctionCall {
                id,
                call_id,
                name,
                arguments,
            } => {
                // Arguments are taken atomically from the done frame, not
                // accumulated from earlier deltas in this protocol variant.
                let call_id = call_id.or(id).unwrap_or_default();
                Step::Delta(ResponseDelta::tool_call_done(ToolCall::new(
                    call_id, name, arguments,
                )))
            }
            _ => Step::Skip,
        }
    }

    fn on_reasoning_delta(&mut self, delta: ReasoningTextDelta) -> Step {
        let buffer = self.reasoning.entry(delta.item_id.clone()).or_default();
        buffer.push_str(&delta.delta);
        Step::Delta(ResponseDelta::thinking(delta.item_id, buffer.clone(), false))
    }

    fn on_reasoning_done(&mut self, done: ReasoningPartDone) -> Step {
        let text = if done.part.text.is_empty() {
            self.reasoning.remove(&done.item_id).unwrap_or_default()
        } else {
            self.reasoning.remove(&done.item_id);
            done.part.text
        };

        self.store.put(&done.item_id, text.clone());
        Step::Delta(ResponseDelta::thinking(done.item_id, text, true))
    }

    fn on_incomplete(&mut self, response: CompletedResponse) -> Step {
        let reason = response
            .incomplete_details
            .clone()
            .unwrap_or_default()
            .reason;
        let (finish, filter) = match reason.as_str() {
            "content_filter" => (FinishReason::ContentFilter, Some(reason)),
            _ => (FinishReason::Length, None),
        };
        self.finalize(response, finish, filter, None)
    }

    fn on_failed(&mut self, response: CompletedResponse) -> Step {
        let error = response.error.clone().map(|e| StreamingError {
            agent: None,
            code: e.code,
            message: e.message,
        });
        self.finalize(response, FinishReason::ServerError, None, error)
    }

    fn finalize(
        &mut self,
        response: CompletedResponse,
        finish_reason: FinishReason,
        filter_reason: Option<String>,
        error: Option<StreamingError>,
    ) -> Step {
        let marker = ConversationMarker::new(self.model_id.clone(), response.id.clone());

        let mut parts = Vec::new();
        let mut tool_calls = Vec::new();
        for item in &response.output {
            match item {
                OutputItem::Message { content } => {
                    for part in content {
                        match part {
                            OutputContent::OutputText { text } => {
                                parts.push(ContentPart::text(text.clone()));
                            }
                            OutputContent::OutputImage { url } => {
                                parts.push(ContentPart::image(url.clone()));
                            }
                            OutputContent::Unknown => {}
                        }
                    }
                }
                OutputItem::FunctionCall {
                    name, arguments, ..
                } => {
                    let call_id = item.call_id().unwrap_or_default().to_string();
                    tool_calls.push(ToolCall::new(call_id, name.clone(), arguments.clone()));
                }
                OutputItem::Reasoning { .. } | OutputItem::Unknown => {}
            }
        }

        // Truncated and failed responses may omit the partial text from
        // `output`; fall back to what already streamed.
        if parts.is_empty() && !self.accumulated.is_empty() {
            parts.push(ContentPart::text(self.accumulated.clone()));
        }

        let message = ChatMessage::new(Role::Assistant, parts).with_tool_calls(tool_calls);
        let mut completion = ChatCompletion::new(message, finish_reason, &self.request_id);
        if let Some(usage) = response.usage {
            completion = completion.with_usage(convert_usage(&usage));
        }
        completion.filter_reason = filter_reason;
        completion.error = error;
        completion.server_request_id = self
            .server_request_id
            .clone()
            .or_else(|| Some(response.id.clone()));

        Step::Completed {
            delta: ResponseDelta::marker(marker),
            completion: Box::new(completion),
        }
    }

    fn on_error(&mut self, payload: ErrorPayload) -> Step {
        // Does not terminate the stream; termination is the transport's call.
        tracing::warn!(
            code = payload.code.as_deref().unwrap_or(""),
            message = %payload.message,
            "stream reported an error frame"
        );
        Step::Delta(ResponseDelta::error(StreamingError {
            agent: payload.agent,
            code: payload.code,
            message: payload.message,
        }))
    }
}

/// Resolve each token's byte-offset span within a single delta's text.
///
/// Only the first occurrence is located; tokens the delta does not contain
/// are dropped. Repeated tokens within one delta all map to the first match,
/// an accepted approximation of this protocol.
fn locate_logprobs(delta: &str, raw: &[RawLogProb]) -> Vec<TokenLogProb> {
    raw.iter()
        .filter(|lp| !lp.token.is_empty())
        .filter_map(|lp| {
            delta.find(&lp.token).map(|start| TokenLogProb {
                token: lp.token.clone(),
                logprob: lp.logprob,
                span: [start as u32, (start + lp.token.len()) as u32],
            })
        })
        .collect()
}

fn convert_usage(raw: &RawUsage) -> TokenUsage {
    TokenUsage {
        prompt_tokens: raw.input_tokens,
        completion_tokens: raw.output_tokens,
        total_tokens: raw.total_tokens,
        cached_tokens: raw
            .input_tokens_details
            .as_ref()
            .map_or(0, |d| d.cached_tokens),
        reasoning_tokens: raw
            .output_tokens_details
            .as_ref()
            .map_or(0, |d| d.reasoning_tokens),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;
    use crate::store::InMemoryReasoningStore;

    fn processor(store: &Arc<InMemoryReasoningStore>) -> StreamProcessor {
        StreamProcessor::new("model-x", "req_test", store.clone() as Arc<dyn ReasoningStore>)
    }

    fn event(tag: &str, data: &str) -> WireEvent {
        WireEvent::from_frame(&Frame::new(tag, data)).unwrap()
    }

    #[test]
    fn test_text_accumulation_is_ordered_concat() {
        let store = InMemoryReasoningStore::shared();
        let mut processor = processor(&store);

        let fragments = ["Hel", "lo, ", "wor", "ld"];
        for fragment in fragments {
            let step = processor.process(event(
                "response.output_text.delta",
                &format!(r#"{{"delta":"{fragment}"}}"#),
            ));
            let Step::Delta(delta) = step else {
                panic!("expected delta");
            };
            assert_eq!(delta.text, fragment);
        }
        assert_eq!(processor.accumulated_text(), "Hello, world");
        assert!(processor.has_emitted_text());
    }

    #[test]
    fn test_logprob_span_first_occurrence() {
        let store = InMemoryReasoningStore::shared();
        let mut processor = processor(&store);

        // "the" first occurs at byte offset 10.
        let step = processor.process(event(
            "response.output_text.delta",
            r#"{"delta":"what does the the mean","logprobs":[{"token":"the","logprob":-0.5}]}"#,
        ));
        let Step::Delta(delta) = step else {
            panic!("expected delta");
        };
        let logprobs = delta.logprobs.unwrap();
        assert_eq!(logprobs[0].span, [10, 13]);
    }

    #[test]
    fn test_logprob_token_absent_is_dropped() {
        let spans = locate_logprobs("abc", &[RawLogProb {
            token: "zzz".into(),
            logprob: -1.0,
        }]);
        assert!(spans.is_empty());
    }

    #[test]
    fn test_tool_call_added_then_done() {
        let store = InMemoryReasoningStore::shared();
        let mut processor = processor(&store);

        let step = processor.process(event(
            "response.output_item.added",
            r#"{"item":{"type":"function_call","name":"search"}}"#,
        ));
        let Step::Delta(delta) = step else {
            panic!("expected delta");
        };
        assert_eq!(delta.tool_call_begin.unwrap().name, "search");
        assert!(delta.tool_call_done.is_none());

        let step = processor.process(event(
            "response.output_item.done",
            r#"{"item":{"type":"function_call","call_id":"call_1","name":"search","arguments":"{\"q\":\"rust\"}"}}"#,
        ));
        let Step::Delta(delta) = step else {
            panic!("expected delta");
        };
        let done = delta.tool_call_done.unwrap();
        assert_eq!(done.id, "call_1");
        // Arguments come atomically from the done frame.
        assert_eq!(done.arguments, r#"{"q":"rust"}"#);
    }

    #[test]
    fn test_reasoning_buffers_keyed_by_item_id() {
        let store = InMemoryReasoningStore::shared();
        let mut processor = processor(&store);

        // Interleave two reasoning items; buffers must not collide.
        processor.process(event(
            "response.reasoning_summary_text.delta",
            r#"{"item_id":"rs_a","delta":"first "}"#,
        ));
        processor.process(event(
            "response.reasoning_summary_text.delta",
            r#"{"item_id":"rs_b","delta":"second"}"#,
        ));
        let step = processor.process(event(
            "response.reasoning_summary_text.delta",
            r#"{"item_id":"rs_a","delta":"thought"}"#,
        ));
        let Step::Delta(delta) = step else {
            panic!("expected delta");
        };
        let thinking = delta.thinking.unwrap();
        assert_eq!(thinking.id, "rs_a");
        assert_eq!(thinking.text, "first thought");
        assert!(!thinking.done);
        assert!(delta.text.is_empty());
    }

    #[test]
    fn test_reasoning_part_done_persists_to_store() {
        let store = InMemoryReasoningStore::shared();
        let mut processor = processor(&store);

        processor.process(event(
            "response.reasoning_summary_text.delta",
            r#"{"item_id":"rs_1","delta":"partial"}"#,
        ));
        let step = processor.process(event(
            "response.reasoning_summary_part.done",
            r#"{"item_id":"rs_1","summary_index":0,"part":{"text":"full summary"}}"#,
        ));
        let Step::Delta(delta) = step else {
            panic!("expected delta");
        };
        let thinking = delta.thinking.unwrap();
        assert!(thinking.done);
        assert_eq!(thinking.text, "full summary");
        assert_eq!(store.get("rs_1").as_deref(), Some("full summary"));
    }

    #[test]
    fn test_completed_emits_marker_and_completion() {
        let store = InMemoryReasoningStore::shared();
        let mut processor = processor(&store);

        processor.process(event(
            "response.output_text.delta",
            r#"{"delta":"answer"}"#,
        ));
        let step = processor.process(event(
            "response.completed",
            r#"{"response":{"id":"resp_9","output":[{"type":"message","content":[{"type":"output_text","text":"answer"},{"type":"output_image","url":"data:image/png;base64,AA=="}]},{"type":"function_call","call_id":"call_2","name":"lookup","arguments":"{}"}],"usage":{"input_tokens":12,"output_tokens":3,"total_tokens":15,"output_tokens_details":{"reasoning_tokens":1}}}}"#,
        ));
        let Step::Completed { delta, completion } = step else {
            panic!("expected completion");
        };

        let marker = delta.conversation_marker.unwrap();
        assert_eq!(marker.model_id, "model-x");
        assert_eq!(marker.marker, "resp_9");

        assert_eq!(completion.finish_reason, FinishReason::Stop);
        assert_eq!(completion.message.text(), "answer");
        assert_eq!(completion.message.content.len(), 2);
        assert_eq!(completion.message.tool_calls.len(), 1);
        assert_eq!(completion.request_id, "req_test");
        assert_eq!(completion.server_request_id.as_deref(), Some("resp_9"));
        let usage = completion.usage.unwrap();
        assert_eq!(usage.prompt_tokens, 12);
        assert_eq!(usage.reasoning_tokens, 1);
    }

    #[test]
    fn test_incomplete_max_tokens_finishes_as_length() {
        let store = InMemoryReasoningStore::shared();
        let mut processor = processor(&store);

        processor.process(event(
            "response.output_text.delta",
            r#"{"delta":"partial out"}"#,
        ));
        let step = processor.process(event(
            "response.incomplete",
            r#"{"response":{"id":"resp_t","output":[],"incomplete_details":{"reason":"max_output_tokens"}}}"#,
        ));
        let Step::Completed { completion, .. } = step else {
            panic!("expected completion");
        };
        assert_eq!(completion.finish_reason, FinishReason::Length);
        // Partial text survives even when output is empty.
        assert_eq!(completion.text(), "partial out");
    }

    #[test]
    fn test_incomplete_content_filter_carries_category() {
        let store = InMemoryReasoningStore::shared();
        let mut processor = processor(&store);

        let step = processor.process(event(
            "response.incomplete",
            r#"{"response":{"id":"resp_f","output":[],"incomplete_details":{"reason":"content_filter"}}}"#,
        ));
        let Step::Completed { completion, .. } = step else {
            panic!("expected completion");
        };
        assert_eq!(completion.finish_reason, FinishReason::ContentFilter);
        assert_eq!(completion.filter_reason.as_deref(), Some("content_filter"));
    }

    #[test]
    fn test_failed_response_carries_error() {
        let store = InMemoryReasoningStore::shared();
        let mut processor = processor(&store);

        let step = processor.process(event(
            "response.failed",
            r#"{"response":{"id":"resp_e","output":[],"error":{"code":"server_error","message":"backend exploded"}}}"#,
        ));
        let Step::Completed { completion, .. } = step else {
            panic!("expected completion");
        };
        assert_eq!(completion.finish_reason, FinishReason::ServerError);
        let error = completion.error.unwrap();
        assert_eq!(error.code.as_deref(), Some("server_error"));
        assert_eq!(error.message, "backend exploded");
    }

    #[test]
    fn test_error_frame_does_not_terminate() {
        let store = InMemoryReasoningStore::shared();
        let mut processor = processor(&store);

        let step = processor.process(event(
            "error",
            r#"{"agent":"search-agent","code":"failed_dependency","message":"upstream down"}"#,
        ));
        let Step::Delta(delta) = step else {
            panic!("expected delta");
        };
        let errors = delta.errors.unwrap();
        assert_eq!(errors[0].code.as_deref(), Some("failed_dependency"));

        // The processor still accepts frames afterwards.
        let step = processor.process(event("response.output_text.delta", r#"{"delta":"x"}"#));
        assert!(matches!(step, Step::Delta(_)));
    }

    #[test]
    fn test_unknown_event_skipped() {
        let store = InMemoryReasoningStore::shared();
        let mut processor = processor(&store);
        let step = processor.process(WireEvent::Ignored);
        assert!(matches!(step, Step::Skip));
    }
}
