use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{
    Candidate, CandidateAssessment, CandidateId, ContextEntry, JobId, JobProfile, MemorySnapshot,
    Reminder, ReminderId, ReminderStatus, RiskFlags, Score, ScreeningSession, SessionId,
};

/// Durable-store abstraction for every record the pipeline owns. The core
/// enforces the domain invariants; the store only has to honor the version
/// checks on the two records that concurrent writers can race on (sessions
/// and candidate aggregates).
pub trait ScreeningRepository: Send + Sync {
    fn upsert_candidate(&self, candidate: Candidate) -> Result<Candidate, RepositoryError>;
    fn candidate(&self, id: &CandidateId) -> Result<Option<Candidate>, RepositoryError>;
    /// Compare-and-set on the candidate aggregate; fails with
    /// `VersionConflict` when another session's classification won the race.
    fn update_candidate_assessment(
        &self,
        id: &CandidateId,
        expected_version: u64,
        assessment: CandidateAssessment,
    ) -> Result<(), RepositoryError>;

    fn insert_session(&self, session: ScreeningSession) -> Result<(), RepositoryError>;
    fn session(&self, id: &SessionId) -> Result<Option<ScreeningSession>, RepositoryError>;
    /// Compare-and-set session update; the stored version must still equal
    /// `expected_version` and is bumped on success.
    fn update_session(
        &self,
        session: ScreeningSession,
        expected_version: u64,
    ) -> Result<(), RepositoryError>;
    fn sessions_for_candidate(
        &self,
        id: &CandidateId,
    ) -> Result<Vec<ScreeningSession>, RepositoryError>;
    /// Completed sessions with no score row yet, for scoring retry sweeps.
    fn completed_unscored_sessions(&self) -> Result<Vec<ScreeningSession>, RepositoryError>;

    /// Exactly-once per session: a second insert for the same session id is
    /// a `Conflict`.
    fn insert_score(&self, score: Score) -> Result<(), RepositoryError>;
    fn score_for_session(&self, id: &SessionId) -> Result<Option<Score>, RepositoryError>;
    fn scores_for_candidate(&self, id: &CandidateId) -> Result<Vec<Score>, RepositoryError>;

    fn insert_reminder(&self, reminder: Reminder) -> Result<(), RepositoryError>;
    fn reminder(&self, id: &ReminderId) -> Result<Option<Reminder>, RepositoryError>;
    fn update_reminder(&self, reminder: Reminder) -> Result<(), RepositoryError>;
    /// Status-guarded reminder write for the delivery path: commits only
    /// while the stored status still matches `expected_status` and reports
    /// whether the write landed. A concurrent dismissal wins.
    fn update_reminder_guarded(
        &self,
        reminder: Reminder,
        expected_status: ReminderStatus,
    ) -> Result<bool, RepositoryError>;
    fn reminders_for_candidate(&self, id: &CandidateId) -> Result<Vec<Reminder>, RepositoryError>;
    /// Pending or sent reminder currently occupying the candidate's
    /// follow-up slot, if any.
    fn live_reminder_for(&self, id: &CandidateId) -> Result<Option<Reminder>, RepositoryError>;
    /// Pending reminders whose follow-up date has arrived.
    fn due_reminders(&self, now: DateTime<Utc>) -> Result<Vec<Reminder>, RepositoryError>;

    fn append_context(&self, session_key: &str, entry: ContextEntry)
        -> Result<(), RepositoryError>;
    fn context(&self, session_key: &str) -> Result<Vec<ContextEntry>, RepositoryError>;
    /// Swap the stored context for the retained set. The context list is
    /// append-only between compactions, so `expected_len` acts as its
    /// version: a mismatch means entries arrived since the read and the
    /// swap fails with `VersionConflict`.
    fn replace_context(
        &self,
        session_key: &str,
        expected_len: usize,
        entries: Vec<ContextEntry>,
    ) -> Result<(), RepositoryError>;
    fn context_keys(&self) -> Result<Vec<String>, RepositoryError>;
    fn upsert_snapshot(&self, snapshot: MemorySnapshot) -> Result<(), RepositoryError>;
    fn snapshot(&self, session_key: &str) -> Result<Option<MemorySnapshot>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("record changed concurrently")]
    VersionConflict,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Job/requirements lookup collaborator used by session creation and
/// scoring.
pub trait JobDirectory: Send + Sync {
    fn job(&self, id: &JobId) -> Result<Option<JobProfile>, RepositoryError>;
    fn upsert_job(&self, job: JobProfile) -> Result<(), RepositoryError>;
}

/// Outbound notification collaborator. Implementations own their delivery
/// channel and timeout; a timeout surfaces as a failure subject to retry.
pub trait ReminderNotifier: Send + Sync {
    fn deliver(&self, reminder: &Reminder, candidate: &Candidate) -> Result<(), NotifyError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
    #[error("notification delivery timed out")]
    Timeout,
}

/// Sanitized session representation for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: SessionId,
    pub candidate_id: CandidateId,
    pub job_id: JobId,
    pub status: &'static str,
    pub screening_url: String,
    pub expires_at: DateTime<Utc>,
    pub answered: usize,
    pub total_questions: usize,
}

impl SessionView {
    pub fn from_session(session: &ScreeningSession, now: DateTime<Utc>) -> Self {
        Self {
            session_id: session.id.clone(),
            candidate_id: session.candidate_id.clone(),
            job_id: session.job_id.clone(),
            status: session.status_label(now),
            screening_url: session.screening_url.clone(),
            expires_at: session.expires_at,
            answered: session.answers.len(),
            total_questions: session.questions.len(),
        }
    }
}

/// Score row projected for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreView {
    pub session_id: SessionId,
    pub total: u8,
    pub accuracy: u8,
    pub depth: u8,
    pub cultural: u8,
    pub skill_gap: Vec<String>,
    pub risk_flags: RiskFlags,
    pub recommendation: &'static str,
}

impl ScoreView {
    pub fn from_score(score: &Score) -> Self {
        Self {
            session_id: score.session_id.clone(),
            total: score.total,
            accuracy: score.accuracy,
            depth: score.depth,
            cultural: score.cultural,
            skill_gap: score.skill_gap.clone(),
            risk_flags: score.risk_flags,
            recommendation: score.recommendation.label(),
        }
    }
}

/// Reminder projection, including the delivery-exhaustion flag surfaced to
/// the recruiter dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct ReminderView {
    pub reminder_id: ReminderId,
    pub status: &'static str,
    pub follow_up_date: DateTime<Utc>,
    pub trigger_score: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recruiter_note: Option<String>,
    pub delivery_failed: bool,
}

impl ReminderView {
    pub fn from_reminder(reminder: &Reminder, max_delivery_attempts: u32) -> Self {
        Self {
            reminder_id: reminder.id.clone(),
            status: reminder.status.label(),
            follow_up_date: reminder.follow_up_date,
            trigger_score: reminder.trigger_score,
            recruiter_note: reminder.recruiter_note.clone(),
            delivery_failed: reminder.status == ReminderStatus::Pending
                && reminder.delivery_attempts >= max_delivery_attempts,
        }
    }
}

/// Aggregate candidate status for `getCandidateStatus`.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateStatusView {
    pub candidate_id: CandidateId,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_score: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risks: Option<RiskFlags>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_color: Option<&'static str>,
    pub sessions: Vec<SessionView>,
    pub scores: Vec<ScoreView>,
    pub reminders: Vec<ReminderView>,
}
