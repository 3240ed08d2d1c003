//! Repetition heuristic.
//!
//! Detects completions that degenerated into repeating the same line or
//! token. Used as a filter signal when selecting successful completions; it
//! never hard-rejects a response on its own.

/// Thresholds for the repetition heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepetitionConfig {
    /// A trailing run of this many identical non-empty lines is pathological.
    pub max_line_repeats: usize,
    /// A trailing run of this many identical tokens is pathological.
    pub max_token_repeats: usize,
}

impl Default for RepetitionConfig {
    fn default() -> Self {
        Self {
            max_line_repeats: 10,
            max_token_repeats: 50,
        }
    }
}

/// Whether `text` ends in a pathologically repetitive run.
#[must_use]
pub fn is_repetitive(text: &str, config: &RepetitionConfig) -> bool {
    trailing_repeats(text.lines().filter(|line| !line.trim().is_empty())) >= config.max_line_repeats
        || trailing_repeats(text.split_whitespace()) >= config.max_token_repeats
}

/// Length of the run of identical items at the end of the iterator.
fn trailing_repeats<'a>(items: impl Iterator<Item = &'a str>) -> usize {
    let items: Vec<&str> = items.collect();
    let Some(last) = items.last() else {
        return 0;
    };
    items.iter().rev().take_while(|item| *item == last).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_text_passes() {
        let config = RepetitionConfig::default();
        assert!(!is_repetitive("a perfectly ordinary completion", &config));
        assert!(!is_repetitive("", &config));
    }

    #[test]
    fn test_repeated_lines_detected() {
        let config = RepetitionConfig::default();
        let text = "intro\n".to_string() + &"same line\n".repeat(10);
        assert!(is_repetitive(&text, &config));

        let below = "intro\n".to_string() + &"same line\n".repeat(9);
        assert!(!is_repetitive(&below, &config));
    }

    #[test]
    fn test_repeated_tokens_detected() {
        let config = RepetitionConfig {
            max_line_repeats: 10,
            max_token_repeats: 5,
        };
        assert!(is_repetitive("stuck stuck stuck stuck stuck", &config));
        assert!(!is_repetitive("stuck stuck stuck stuck fine", &config));
    }

    #[test]
    fn test_blank_lines_do_not_count_as_repeats() {
        let config = RepetitionConfig {
            max_line_repeats: 3,
            max_token_repeats: 50,
        };
        assert!(!is_repetitive("a\n\n\n\nb", &config));
    }
}
