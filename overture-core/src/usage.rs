//! Token usage accounting.

use serde::{Deserialize, Serialize};

/// Token counters reported with a completed response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens in the prompt.
    pub prompt_tokens: u64,
    /// Tokens generated in the completion.
    pub completion_tokens: u64,
    /// Prompt plus completion.
    pub total_tokens: u64,
    /// Prompt tokens served from cache.
    #[serde(default)]
    pub cached_tokens: u64,
    /// Tokens spent on reasoning before the answer.
    #[serde(default)]
    pub reasoning_tokens: u64,
}

impl TokenUsage {
    /// Create an empty usage record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Usage with prompt and completion counts; total derived.
    #[must_use]
    pub fn with_tokens(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
            ..Self::default()
        }
    }

    /// Set cached token count.
    #[must_use]
    pub fn cached(mut self, tokens: u64) -> Self {
        self.cached_tokens = tokens;
        self
    }

    /// Set reasoning token count.
    #[must_use]
    pub fn reasoning(mut self, tokens: u64) -> Self {
        self.reasoning_tokens = tokens;
        self
    }

    /// Merge another record into this one.
    pub fn merge(&mut self, other: &TokenUsage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
        self.cached_tokens += other.cached_tokens;
        self.reasoning_tokens += other.reasoning_tokens;
    }

    /// Whether no counter has been set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl std::ops::Add for TokenUsage {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self::Output {
        self.merge(&rhs);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_tokens_derives_total() {
        let usage = TokenUsage::with_tokens(100, 50);
        assert_eq!(usage.total_tokens, 150);
    }

    #[test]
    fn test_merge() {
        let mut a = TokenUsage::with_tokens(10, 5).cached(3);
        a.merge(&TokenUsage::with_tokens(20, 10).reasoning(7));
        assert_eq!(a.prompt_tokens, 30);
        assert_eq!(a.completion_tokens, 15);
        assert_eq!(a.cached_tokens, 3);
        assert_eq!(a.reasoning_tokens, 7);
    }
}
