//! Token counting capability (observability only).

/// Counts prompt tokens for telemetry. Carries no correctness obligation.
pub trait Tokenizer: Send + Sync {
    /// Approximate token count for `text`.
    fn count_tokens(&self, text: &str) -> usize;
}

/// Rough character-based approximation (~4 bytes per token).
#[derive(Debug, Clone, Copy, Default)]
pub struct ApproxTokenizer;

impl Tokenizer for ApproxTokenizer {
    fn count_tokens(&self, text: &str) -> usize {
        text.len().div_ceil(4)
    }
}
