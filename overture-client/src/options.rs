//! Per-fetch options.

use std::fmt;
use std::sync::Arc;

use overture_core::{ChatMessage, FetchSettings, ResponseDelta, ToolSpec};

/// Streaming callback: `(accumulated_text_so_far, choice_index, delta)`.
pub type DeltaCallback = Arc<dyn Fn(&str, usize, &ResponseDelta) + Send + Sync>;

/// Options for one logical fetch.
#[derive(Clone)]
pub struct FetchOptions {
    /// Target model id.
    pub model_id: String,
    /// Message history, owned by the caller for the duration of the request.
    pub messages: Vec<ChatMessage>,
    /// Per-request overrides.
    pub settings: FetchSettings,
    /// Declared tools.
    pub tools: Vec<ToolSpec>,
    /// Opt out of conversation-marker continuation for this fetch.
    pub ignore_stateful_marker: bool,
    /// Streaming callback invoked once per emitted delta.
    pub on_delta: Option<DeltaCallback>,
    /// Set on the one bounded content-filter retry attempt.
    pub(crate) is_filter_retry: bool,
}

impl FetchOptions {
    /// Options for a model and message history.
    #[must_use]
    pub fn new(model_id: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model_id: model_id.into(),
            messages,
            settings: FetchSettings::default(),
            tools: Vec::new(),
            ignore_stateful_marker: false,
            on_delta: None,
            is_filter_retry: false,
        }
    }

    /// Set the request settings.
    #[must_use]
    pub fn with_settings(mut self, settings: FetchSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Declare tools.
    #[must_use]
    pub fn with_tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.tools = tools;
        self
    }

    /// Opt out of marker continuation.
    #[must_use]
    pub fn ignore_stateful_marker(mut self, ignore: bool) -> Self {
        self.ignore_stateful_marker = ignore;
        self
    }

    /// Set the streaming callback.
    #[must_use]
    pub fn on_delta(mut self, callback: DeltaCallback) -> Self {
        self.on_delta = Some(callback);
        self
    }
}

impl fmt::Debug for FetchOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchOptions")
            .field("model_id", &self.model_id)
            .field("messages", &self.messages.len())
            .field("tools", &self.tools.len())
            .field("ignore_stateful_marker", &self.ignore_stateful_marker)
            .field("is_filter_retry", &self.is_filter_retry)
            .field("has_on_delta", &self.on_delta.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let opts = FetchOptions::new("model-x", vec![ChatMessage::user("hi")]);
        assert!(!opts.ignore_stateful_marker);
        assert!(!opts.is_filter_retry);
        assert!(opts.on_delta.is_none());
    }
}
