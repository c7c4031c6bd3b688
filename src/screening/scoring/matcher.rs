/// Pluggable semantic-match strategy between an answer and its ideal
/// answer. Implementations must be deterministic for identical input so
/// scoring stays reproducible; `None` means the pair cannot be evaluated
/// (as opposed to a zero-strength match).
pub trait AnswerMatcher: Send + Sync {
    fn match_strength(&self, answer: &str, ideal: &str) -> Option<f32>;
}

pub(crate) fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_ascii_lowercase())
        .collect()
}

/// Strict normalized equality. Useful for choice and scale questions where
/// the ideal answer is literal.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExactMatcher;

impl AnswerMatcher for ExactMatcher {
    fn match_strength(&self, answer: &str, ideal: &str) -> Option<f32> {
        if ideal.trim().is_empty() {
            return None;
        }
        let matched = tokens(answer) == tokens(ideal);
        Some(if matched { 1.0 } else { 0.0 })
    }
}

/// Token-overlap match: the share of the ideal answer's distinct tokens
/// that appear in the candidate answer. The default strategy.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordMatcher;

impl AnswerMatcher for KeywordMatcher {
    fn match_strength(&self, answer: &str, ideal: &str) -> Option<f32> {
        let mut ideal_tokens = tokens(ideal);
        ideal_tokens.sort();
        ideal_tokens.dedup();
        if ideal_tokens.is_empty() {
            return None;
        }

        let answer_tokens = tokens(answer);
        let hits = ideal_tokens
            .iter()
            .filter(|token| answer_tokens.contains(token))
            .count();
        Some(hits as f32 / ideal_tokens.len() as f32)
    }
}
