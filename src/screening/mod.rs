//! Candidate-screening pipeline: session lifecycle, scoring, risk
//! classification, follow-up reminders, and context compaction.

pub mod domain;
pub mod memory;
pub mod reminders;
pub mod repository;
pub mod risk;
pub mod router;
pub mod scoring;
pub mod service;
pub mod session;
pub mod store;

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};

pub use domain::{
    Answer, Candidate, CandidateAssessment, CandidateId, ContextEntry, DomainColor, JobId,
    JobProfile, MemorySnapshot, Question, QuestionId, QuestionKind, Recommendation, Reminder,
    ReminderId, ReminderStatus, RiskFlags, Score, ScreeningSession, SessionId, SessionStatus,
};
pub use memory::{CompactionConfig, DensityRanker, EntryRanker, MemoryCompactor};
pub use reminders::{LogNotifier, ReminderConfig, ReminderScheduler, SweepReport};
pub use repository::{
    CandidateStatusView, JobDirectory, NotifyError, ReminderNotifier, ReminderView,
    RepositoryError, ScoreView, ScreeningRepository, SessionView,
};
pub use risk::{classify, domain_color, RiskConfig, RiskThresholds, RiskWeights};
pub use router::screening_router;
pub use scoring::{
    AnswerMatcher, ExactMatcher, KeywordMatcher, ScoreCard, ScoringConfig, ScoringEngine,
    ScoringUnavailable,
};
pub use service::{FinalizeOutcome, RescoreReport, ScreeningError, ScreeningService};
pub use session::{SessionConfig, SessionError, SessionManager};
pub use store::MemoryStore;

/// Top-level tunables for the whole pipeline; every threshold from the
/// component configs is reachable here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreeningConfig {
    pub session_ttl_days: i64,
    pub scoring: ScoringConfig,
    pub risk: RiskConfig,
    pub reminder: ReminderConfig,
    pub compaction: CompactionConfig,
}

impl Default for ScreeningConfig {
    fn default() -> Self {
        Self {
            session_ttl_days: 7,
            scoring: ScoringConfig::default(),
            risk: RiskConfig::default(),
            reminder: ReminderConfig::default(),
            compaction: CompactionConfig::default(),
        }
    }
}
