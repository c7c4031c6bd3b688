use serde::{Deserialize, Serialize};

/// Scoring weights and per-type depth expectations. All dials are
/// externally tunable; the defaults are the documented baseline, not a
/// hidden formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Sub-score weights; normalized at use so partial tuning stays safe.
    pub accuracy_weight: f32,
    pub depth_weight: f32,
    pub cultural_weight: f32,
    /// Word counts at which an answer earns full depth credit.
    pub open_text_expected_words: usize,
    pub scale_expected_words: usize,
    /// Multiple-choice answers carry no elaboration; depth is this fixed
    /// baseline.
    pub choice_depth_baseline: u8,
    /// Recommendation cut lines on the total score.
    pub advance_threshold: u8,
    pub screen_threshold: u8,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            accuracy_weight: 1.0,
            depth_weight: 1.0,
            cultural_weight: 1.0,
            open_text_expected_words: 40,
            scale_expected_words: 8,
            choice_depth_baseline: 60,
            advance_threshold: 85,
            screen_threshold: 60,
        }
    }
}
