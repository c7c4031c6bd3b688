mod config;
mod matcher;

pub use config::ScoringConfig;
pub use matcher::{AnswerMatcher, ExactMatcher, KeywordMatcher};

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::domain::{
    Candidate, JobProfile, Question, QuestionKind, Recommendation, ScreeningSession,
};

/// Raised when no answer in the session can be evaluated (for example when
/// every ideal-answer reference is missing). The session stays completed
/// and unscored so a later sweep can retry; the engine never defaults to a
/// zero score.
#[derive(Debug, thiserror::Error)]
#[error("scoring unavailable: {0}")]
pub struct ScoringUnavailable(pub String);

/// Engine output before risk classification attaches the risk flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreCard {
    pub total: u8,
    pub accuracy: u8,
    pub depth: u8,
    pub cultural: u8,
    pub skill_gap: Vec<String>,
    pub recommendation: Recommendation,
}

const CULTURAL_NEUTRAL: f32 = 50.0;
const POSITIVE_STEP: f32 = 5.0;
const POSITIVE_CAP: f32 = 40.0;
const RED_FLAG_STEP: f32 = 10.0;
const RED_FLAG_CAP: f32 = 40.0;

/// Keyword rubric applied to answers on cultural-tagged questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CulturalRubric {
    pub positive_signals: Vec<String>,
    pub red_flags: Vec<String>,
}

impl Default for CulturalRubric {
    fn default() -> Self {
        Self {
            positive_signals: [
                "team",
                "collaborate",
                "learn",
                "grow",
                "ownership",
                "initiative",
                "achieve",
                "improve",
                "impact",
                "contribute",
                "passionate",
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
            red_flags: [
                "impossible",
                "blame",
                "refuse",
                "not my job",
                "management is bad",
                "just a job",
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
        }
    }
}

impl CulturalRubric {
    /// Tone score in [0,100]: neutral base, bumped per distinct positive
    /// signal and docked per distinct red flag, both capped.
    fn tone_score(&self, text: &str) -> f32 {
        let haystack = text.to_ascii_lowercase();
        let positives = self
            .positive_signals
            .iter()
            .filter(|signal| haystack.contains(signal.as_str()))
            .count() as f32;
        let flags = self
            .red_flags
            .iter()
            .filter(|flag| haystack.contains(flag.as_str()))
            .count() as f32;

        let score = CULTURAL_NEUTRAL + (positives * POSITIVE_STEP).min(POSITIVE_CAP)
            - (flags * RED_FLAG_STEP).min(RED_FLAG_CAP);
        score.clamp(0.0, 100.0)
    }
}

/// Turns a completed session's question/ideal-answer/answer triples into
/// dimension scores, a total, and a skill-gap list. Deterministic for
/// identical input: the matcher is required to be, and everything else is
/// plain arithmetic.
pub struct ScoringEngine {
    config: ScoringConfig,
    matcher: Arc<dyn AnswerMatcher>,
    rubric: CulturalRubric,
}

impl ScoringEngine {
    pub fn new(config: ScoringConfig) -> Self {
        Self::with_matcher(config, Arc::new(KeywordMatcher))
    }

    pub fn with_matcher(config: ScoringConfig, matcher: Arc<dyn AnswerMatcher>) -> Self {
        Self {
            config,
            matcher,
            rubric: CulturalRubric::default(),
        }
    }

    pub fn with_rubric(mut self, rubric: CulturalRubric) -> Self {
        self.rubric = rubric;
        self
    }

    pub fn score(
        &self,
        session: &ScreeningSession,
        job: &JobProfile,
        candidate: &Candidate,
    ) -> Result<ScoreCard, ScoringUnavailable> {
        let accuracy = self.accuracy(session)?;
        let depth = self.depth(session);
        let cultural = self.cultural(session);
        let total = self.total(accuracy, depth, cultural);

        Ok(ScoreCard {
            total,
            accuracy: accuracy.round() as u8,
            depth: depth.round() as u8,
            cultural: cultural.round() as u8,
            skill_gap: skill_gap(&job.required_skills, &candidate.skills),
            recommendation: self.recommendation(total),
        })
    }

    /// Mean matcher strength over the evaluable pairs, 0-100. Fails when
    /// nothing is evaluable.
    fn accuracy(&self, session: &ScreeningSession) -> Result<f32, ScoringUnavailable> {
        let mut strengths = Vec::with_capacity(session.questions.len());
        for question in &session.questions {
            let answer = match session.answer(&question.id) {
                Some(answer) => answer,
                None => continue,
            };
            let strength = question
                .ideal_answer
                .as_deref()
                .and_then(|ideal| self.matcher.match_strength(&answer.text, ideal));
            if let Some(strength) = strength {
                strengths.push(strength.clamp(0.0, 1.0));
            }
        }

        if strengths.is_empty() {
            return Err(ScoringUnavailable(format!(
                "no evaluable answers in session {}",
                session.id.0
            )));
        }
        Ok(strengths.iter().sum::<f32>() / strengths.len() as f32 * 100.0)
    }

    /// Elaboration relative to a type-specific expectation, averaged over
    /// the question set.
    fn depth(&self, session: &ScreeningSession) -> f32 {
        if session.questions.is_empty() {
            return 0.0;
        }

        let sum: f32 = session
            .questions
            .iter()
            .map(|question| {
                let words = session
                    .answer(&question.id)
                    .map(|answer| word_count(&answer.text))
                    .unwrap_or(0);
                self.depth_for(question.kind, words)
            })
            .sum();
        sum / session.questions.len() as f32
    }

    fn depth_for(&self, kind: QuestionKind, words: usize) -> f32 {
        let expectation = match kind {
            QuestionKind::MultipleChoice => return f32::from(self.config.choice_depth_baseline),
            QuestionKind::OpenText => self.config.open_text_expected_words,
            QuestionKind::Scale => self.config.scale_expected_words,
        };
        if expectation == 0 {
            return 100.0;
        }
        (words as f32 / expectation as f32).min(1.0) * 100.0
    }

    /// Rubric tone over the answers to cultural-tagged questions; neutral
    /// default when the session has none.
    fn cultural(&self, session: &ScreeningSession) -> f32 {
        let tagged: Vec<&Question> = session
            .questions
            .iter()
            .filter(|question| question.cultural)
            .collect();
        if tagged.is_empty() {
            return CULTURAL_NEUTRAL;
        }

        let combined = tagged
            .iter()
            .filter_map(|question| session.answer(&question.id))
            .map(|answer| answer.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        self.rubric.tone_score(&combined)
    }

    fn total(&self, accuracy: f32, depth: f32, cultural: f32) -> u8 {
        let weight_sum =
            self.config.accuracy_weight + self.config.depth_weight + self.config.cultural_weight;
        if weight_sum <= 0.0 {
            return 0;
        }
        let total = (accuracy * self.config.accuracy_weight
            + depth * self.config.depth_weight
            + cultural * self.config.cultural_weight)
            / weight_sum;
        total.clamp(0.0, 100.0).round() as u8
    }

    fn recommendation(&self, total: u8) -> Recommendation {
        if total >= self.config.advance_threshold {
            Recommendation::Advance
        } else if total >= self.config.screen_threshold {
            Recommendation::Screen
        } else {
            Recommendation::Reject
        }
    }
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Required skills absent from the candidate's declared set,
/// order-preserving and deduplicated (case-insensitive).
pub fn skill_gap(required: &[String], declared: &[String]) -> Vec<String> {
    let declared: Vec<String> = declared
        .iter()
        .map(|skill| skill.trim().to_ascii_lowercase())
        .collect();

    let mut seen = Vec::new();
    let mut gap = Vec::new();
    for skill in required {
        let normalized = skill.trim().to_ascii_lowercase();
        if normalized.is_empty() || seen.contains(&normalized) {
            continue;
        }
        seen.push(normalized.clone());
        if !declared.contains(&normalized) {
            gap.push(skill.trim().to_string());
        }
    }
    gap
}
