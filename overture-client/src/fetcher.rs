//! The request orchestrator.
//!
//! [`ChatFetcher`] owns one logical fetch end to end: validate, resolve the
//! conversation marker, serialize, drive the byte stream through the frame
//! parser and stream processor, classify the outcome, and apply the two
//! bounded one-shot retries (content filter, stale marker). Each attempt
//! produces exactly one [`ChatResponse`]; retries are new attempts with
//! fresh request ids.

use std::sync::{Arc, OnceLock};
use std::time::Instant;

use futures::future::BoxFuture;
use futures::StreamExt;
use overture_core::{generate_request_id, ChatCompletion, ChatMessage, ChatResponse, FinishReason};
use overture_wire::{
    Frame, FrameParser, InMemoryReasoningStore, ReasoningStore, Step, StreamProcessor, WireEvent,
};
use regex::Regex;
use tokio_util::sync::CancellationToken;

use crate::classify::classify_failure;
use crate::failure::FetchFailure;
use crate::marker::resolve_marker;
use crate::options::FetchOptions;
use crate::repetition::{is_repetitive, RepetitionConfig};
use crate::serializer::{EndpointSerializer, RequestContext};
use crate::telemetry::{NoopTelemetry, TelemetryEvent, TelemetrySink};
use crate::tokenizer::{ApproxTokenizer, Tokenizer};
use crate::transport::Transport;

/// Orchestrator policy knobs.
#[derive(Debug, Clone, Copy)]
pub struct FetcherConfig {
    /// Maximum number of declared tools per request.
    pub max_tools: usize,
    /// Whether a content-filtered response triggers the one bounded retry.
    pub filter_retry_enabled: bool,
    /// Repetition heuristic thresholds.
    pub repetition: RepetitionConfig,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            max_tools: 128,
            filter_retry_enabled: true,
            repetition: RepetitionConfig::default(),
        }
    }
}

/// The request orchestrator.
pub struct ChatFetcher {
    transport: Arc<dyn Transport>,
    serializer: Arc<dyn EndpointSerializer>,
    tokenizer: Arc<dyn Tokenizer>,
    reasoning: Arc<dyn ReasoningStore>,
    telemetry: Arc<dyn TelemetrySink>,
    config: FetcherConfig,
}

impl ChatFetcher {
    /// Create a fetcher over a transport and endpoint serializer.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, serializer: Arc<dyn EndpointSerializer>) -> Self {
        Self {
            transport,
            serializer,
            tokenizer: Arc::new(ApproxTokenizer),
            reasoning: InMemoryReasoningStore::shared(),
            telemetry: Arc::new(NoopTelemetry),
            config: FetcherConfig::default(),
        }
    }

    /// Replace the telemetry tokenizer.
    #[must_use]
    pub fn with_tokenizer(mut self, tokenizer: Arc<dyn Tokenizer>) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    /// Replace the reasoning store the stream processor persists into.
    #[must_use]
    pub fn with_reasoning_store(mut self, store: Arc<dyn ReasoningStore>) -> Self {
        self.reasoning = store;
        self
    }

    /// Attach a telemetry sink.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Override the policy knobs.
    #[must_use]
    pub fn with_config(mut self, config: FetcherConfig) -> Self {
        self.config = config;
        self
    }

    /// Fetch a single completion; `n` is forced to 1.
    pub async fn fetch_one(
        &self,
        mut opts: FetchOptions,
        cancel: &CancellationToken,
    ) -> ChatResponse {
        opts.settings.n = Some(1);
        let mut response = self.fetch_many(opts, cancel).await;
        if let ChatResponse::Success { texts, .. } = &mut response {
            texts.truncate(1);
        }
        response
    }

    /// Fetch completions, applying the bounded content-filter retry.
    pub async fn fetch_many(
        &self,
        opts: FetchOptions,
        cancel: &CancellationToken,
    ) -> ChatResponse {
        self.fetch_many_boxed(opts, cancel).await
    }

    /// Fetch, retrying once without the conversation marker if the server
    /// rejects it. A rejection on the marker-free retry is surfaced as is.
    pub async fn fetch_with_marker_recovery(
        &self,
        opts: FetchOptions,
        cancel: &CancellationToken,
    ) -> ChatResponse {
        let first = self.fetch_many(opts.clone(), cancel).await;
        if matches!(first, ChatResponse::InvalidStatefulMarker { .. })
            && !opts.ignore_stateful_marker
        {
            tracing::warn!(
                request_id = first.request_id(),
                "conversation marker rejected; retrying with full history"
            );
            return self.fetch_many(opts.ignore_stateful_marker(true), cancel).await;
        }
        first
    }

    // Recursion (the filter retry) needs the indirection.
    fn fetch_many_boxed<'a>(
        &'a self,
        opts: FetchOptions,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, ChatResponse> {
        Box::pin(async move {
            match self.fetch_attempt(&opts, cancel).await {
                ChatResponse::FilteredRetry {
                    request_id,
                    filtered_text,
                    category,
                    reason,
                } => {
                    tracing::info!(
                        request_id = %request_id,
                        "completion filtered; retrying once with a compliance nudge"
                    );
                    let mut retry = opts;
                    retry.is_filter_retry = true;
                    retry.messages.push(filter_retry_nudge(&filtered_text));

                    let retried = self.fetch_many_boxed(retry, cancel).await;
                    if retried.is_success() {
                        retried
                    } else {
                        ChatResponse::Filtered {
                            request_id,
                            category,
                            reason,
                        }
                    }
                }
                outcome => outcome,
            }
        })
    }

    /// One attempt: validate, resolve, serialize, stream, classify.
    async fn fetch_attempt(
        &self,
        opts: &FetchOptions,
        cancel: &CancellationToken,
    ) -> ChatResponse {
        let request_id = generate_request_id();

        if let Err(reason) = validate(opts, &self.config) {
            return ChatResponse::BadRequest { request_id, reason };
        }

        let anchor = if opts.ignore_stateful_marker {
            None
        } else {
            resolve_marker(&opts.model_id, &opts.messages)
        };
        let (messages, marker) = match &anchor {
            Some(anchor) => (
                &opts.messages[anchor.index + 1..],
                Some(anchor.marker.marker.as_str()),
            ),
            None => (&opts.messages[..], None),
        };

        let prompt_tokens: usize = messages
            .iter()
            .map(|message| self.tokenizer.count_tokens(&message.text()))
            .sum();
        self.telemetry.emit(TelemetryEvent::new(
            "prompt_tokens",
            &request_id,
            prompt_tokens as f64,
        ));

        let body = self.serializer.serialize(&RequestContext {
            model_id: &opts.model_id,
            messages,
            settings: &opts.settings,
            tools: &opts.tools,
            marker,
        });

        match self.run_stream(body, &request_id, opts, cancel).await {
            Ok(completions) => self.classify_completions(completions, opts, request_id),
            Err(failure) => classify_failure(&failure, &request_id, cancel),
        }
    }

    /// Drive the response byte stream to its end, collecting completions.
    async fn run_stream(
        &self,
        body: serde_json::Value,
        request_id: &str,
        opts: &FetchOptions,
        cancel: &CancellationToken,
    ) -> Result<Vec<ChatCompletion>, FetchFailure> {
        let response = self.transport.send(body, request_id, cancel).await?;

        let mut processor =
            StreamProcessor::new(&opts.model_id, request_id, self.reasoning.clone());
        if let Some(id) = response.server_request_id {
            processor = processor.with_server_request_id(id);
        }

        let mut stream = response.stream;
        let mut parser = FrameParser::new();
        let mut stats = StreamStats::new();
        let mut completions = Vec::new();

        loop {
            let chunk = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(FetchFailure::Aborted),
                chunk = stream.next() => chunk,
            };
            let Some(chunk) = chunk else { break };
            let chunk = chunk?;

            let frames = parser
                .feed_bytes(&chunk)
                .map_err(|e| FetchFailure::Other(e.to_string()))?;
            for frame in frames {
                self.apply_frame(&frame, &mut processor, opts, &mut stats, &mut completions)?;
            }
        }
        for frame in parser.finish() {
            self.apply_frame(&frame, &mut processor, opts, &mut stats, &mut completions)?;
        }

        self.telemetry.emit(TelemetryEvent::new(
            "tokens_so_far",
            request_id,
            stats.tokens_so_far as f64,
        ));
        if let Some(elapsed) = stats.first_token {
            self.telemetry.emit(TelemetryEvent::new(
                "time_to_first_token_ms",
                request_id,
                elapsed.as_secs_f64() * 1000.0,
            ));
        }

        Ok(completions)
    }

    fn apply_frame(
        &self,
        frame: &Frame,
        processor: &mut StreamProcessor,
        opts: &FetchOptions,
        stats: &mut StreamStats,
        completions: &mut Vec<ChatCompletion>,
    ) -> Result<(), FetchFailure> {
        let event =
            WireEvent::from_frame(frame).map_err(|e| FetchFailure::Other(e.to_string()))?;

        match processor.process(event) {
            Step::Delta(delta) => {
                if !delta.text.is_empty() {
                    if stats.first_token.is_none() {
                        stats.first_token = Some(stats.started.elapsed());
                    }
                    stats.tokens_so_far += self.tokenizer.count_tokens(&delta.text);
                }
                if let Some(callback) = &opts.on_delta {
                    callback(processor.accumulated_text(), 0, &delta);
                }
            }
            Step::Completed { delta, completion } => {
                if let Some(callback) = &opts.on_delta {
                    callback(processor.accumulated_text(), 0, &delta);
                }
                completions.push(*completion);
            }
            Step::Skip => {}
        }
        Ok(())
    }

    /// Classify a cleanly finished stream into its outcome.
    fn classify_completions(
        &self,
        completions: Vec<ChatCompletion>,
        opts: &FetchOptions,
        request_id: String,
    ) -> ChatResponse {
        if completions.is_empty() {
            return ChatResponse::Unknown {
                request_id,
                reason: "stream ended without a completed response".into(),
            };
        }

        let mut kept: Vec<&ChatCompletion> = completions
            .iter()
            .filter(|completion| !is_repetitive(&completion.text(), &self.config.repetition))
            .collect();
        if kept.is_empty() {
            // A signal, not a rejection: if everything trips the heuristic,
            // surface the originals rather than nothing.
            tracing::warn!(
                request_id = %request_id,
                "every completion looked repetitive; keeping them all"
            );
            kept = completions.iter().collect();
        }

        let successes: Vec<&ChatCompletion> = kept
            .iter()
            .copied()
            .filter(|completion| completion.finish_reason.is_success())
            .collect();
        if !successes.is_empty() {
            let usage = if successes.len() == 1 {
                successes[0].usage
            } else {
                None
            };
            return ChatResponse::Success {
                request_id,
                texts: successes.iter().map(|c| c.text()).collect(),
                usage,
                server_request_id: successes[0].server_request_id.clone(),
            };
        }

        let best = kept[0];
        match best.finish_reason {
            FinishReason::ContentFilter => {
                let category = best.filter_reason.clone();
                let reason = "completion withheld by the content filter".to_string();
                if self.config.filter_retry_enabled && !opts.is_filter_retry {
                    ChatResponse::FilteredRetry {
                        request_id,
                        filtered_text: best.text(),
                        category,
                        reason,
                    }
                } else {
                    ChatResponse::Filtered {
                        request_id,
                        category,
                        reason,
                    }
                }
            }
            FinishReason::Length => ChatResponse::Length {
                request_id,
                truncated_text: best.text(),
                reason: "output token cap reached".into(),
            },
            FinishReason::ServerError => ChatResponse::Failed {
                request_id,
                reason: best
                    .error
                    .as_ref()
                    .map_or_else(|| "server reported a failed response".into(), |e| {
                        e.message.clone()
                    }),
                error: best.error.clone(),
            },
            reason => ChatResponse::Unknown {
                request_id,
                reason: format!("unhandled finish reason: {reason:?}"),
            },
        }
    }
}

struct StreamStats {
    started: Instant,
    first_token: Option<std::time::Duration>,
    tokens_so_far: usize,
}

impl StreamStats {
    fn new() -> Self {
        Self {
            started: Instant::now(),
            first_token: None,
            tokens_so_far: 0,
        }
    }
}

/// The one retry message after a content filter, carrying the withheld text
/// so the model has the context it was generating.
fn filter_retry_nudge(filtered_text: &str) -> ChatMessage {
    let mut text = String::from(
        "The previous answer was withheld by the content filter. \
         Please answer again, rephrased to comply with the content policy.",
    );
    if !filtered_text.is_empty() {
        text.push_str("\n\nThe withheld answer began:\n");
        text.push_str(filtered_text);
    }
    ChatMessage::user(text)
}

fn tool_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new("^[a-zA-Z0-9_-]+$").expect("pattern is valid"))
}

/// Reject malformed requests before any I/O happens.
fn validate(opts: &FetchOptions, config: &FetcherConfig) -> Result<(), String> {
    if opts.messages.is_empty() {
        return Err("message history is empty".into());
    }
    if opts.settings.max_tokens == Some(0) {
        return Err("max_tokens must be at least 1".into());
    }
    if opts.tools.len() > config.max_tools {
        return Err(format!(
            "too many tools: {} declared, limit is {}",
            opts.tools.len(),
            config.max_tools
        ));
    }
    for tool in &opts.tools {
        if !tool_name_pattern().is_match(&tool.name) {
            return Err(format!("invalid tool name: {:?}", tool.name));
        }
    }
    Ok(())
}
