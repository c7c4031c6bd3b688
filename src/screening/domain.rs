use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for candidates tracked by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateId(pub String);

/// Identifier wrapper for the job a screening targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

/// Identifier wrapper for screening sessions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

/// Identifier wrapper for questions inside a session's question set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuestionId(pub String);

/// Identifier wrapper for recruiter follow-up reminders.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReminderId(pub String);

/// Candidate master record. Identity fields come from external intake;
/// the assessment block is written only by the risk classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub current_title: Option<String>,
    pub skills: Vec<String>,
    pub resume_text: String,
    pub salary_ask: Option<f64>,
    pub email_verified: bool,
    pub assessment: Option<CandidateAssessment>,
    pub version: u64,
}

/// Aggregate scores and classification for a candidate. Kept as one block so
/// the domain color can never go stale relative to the risks it was derived
/// from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateAssessment {
    pub overall_score: u8,
    pub risks: RiskFlags,
    pub domain_color: DomainColor,
}

/// Structured retention/salary/cultural risk record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskFlags {
    pub retention: f32,
    pub salary: f32,
    pub cultural: f32,
}

impl RiskFlags {
    pub fn any_at_or_above(&self, threshold: f32) -> bool {
        self.retention >= threshold || self.salary >= threshold || self.cultural >= threshold
    }

    pub fn all_below(&self, threshold: f32) -> bool {
        self.retention < threshold && self.salary < threshold && self.cultural < threshold
    }
}

/// Three-level composite risk classification shown on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainColor {
    Green,
    Yellow,
    Red,
}

impl DomainColor {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Red => "red",
        }
    }
}

/// Question shape inside a session's question set. Immutable once the
/// session starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub prompt: String,
    pub kind: QuestionKind,
    /// Present only for choice kinds.
    #[serde(default)]
    pub options: Vec<String>,
    /// Reference answer the scoring engine matches against.
    pub ideal_answer: Option<String>,
    /// Marks the question as part of the cultural-fit rubric.
    #[serde(default)]
    pub cultural: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    OpenText,
    MultipleChoice,
    Scale,
}

impl QuestionKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::OpenText => "open_text",
            Self::MultipleChoice => "multiple_choice",
            Self::Scale => "scale",
        }
    }
}

/// Candidate response to a question. Append-only; a resubmission for the
/// same question replaces the earlier row rather than editing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub question_id: QuestionId,
    pub text: String,
    pub submitted_at: DateTime<Utc>,
}

/// Stored screening-session lifecycle states. Expiry is derived at read
/// time and is deliberately not a stored status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Pending,
    InProgress,
    Completed,
}

impl SessionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }
}

/// One screening request for a candidate against a job, with its ordered
/// question set and collected answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreeningSession {
    pub id: SessionId,
    pub candidate_id: CandidateId,
    pub job_id: JobId,
    pub questions: Vec<Question>,
    pub answers: Vec<Answer>,
    pub status: SessionStatus,
    pub screening_url: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub version: u64,
}

impl ScreeningSession {
    /// Derived expiry: applies whenever the deadline has passed and the
    /// session has not reached its terminal state.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status != SessionStatus::Completed && now > self.expires_at
    }

    pub fn question(&self, id: &QuestionId) -> Option<&Question> {
        self.questions.iter().find(|question| &question.id == id)
    }

    pub fn answer(&self, id: &QuestionId) -> Option<&Answer> {
        self.answers.iter().find(|answer| &answer.question_id == id)
    }

    /// Question ids with no recorded answer, in question-set order.
    pub fn missing_answers(&self) -> Vec<QuestionId> {
        self.questions
            .iter()
            .filter(|question| self.answer(&question.id).is_none())
            .map(|question| question.id.clone())
            .collect()
    }

    /// Effective state label for views, folding derived expiry in.
    pub fn status_label(&self, now: DateTime<Utc>) -> &'static str {
        if self.is_expired(now) {
            "expired"
        } else {
            self.status.label()
        }
    }
}

/// Job requirements resolved through the external lookup collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobProfile {
    pub id: JobId,
    pub title: String,
    pub description: String,
    pub required_skills: Vec<String>,
    pub market_salary: Option<f64>,
}

/// Hiring recommendation derived from the total score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Advance,
    Screen,
    Reject,
}

impl Recommendation {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Advance => "advance",
            Self::Screen => "screen",
            Self::Reject => "reject",
        }
    }
}

/// Persisted score row. Created exactly once per completed session and
/// immutable thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub session_id: SessionId,
    pub candidate_id: CandidateId,
    pub total: u8,
    pub accuracy: u8,
    pub depth: u8,
    pub cultural: u8,
    pub skill_gap: Vec<String>,
    pub risk_flags: RiskFlags,
    pub recommendation: Recommendation,
    pub interview_guide_url: Option<String>,
    pub scored_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderStatus {
    Pending,
    Sent,
    Dismissed,
}

impl ReminderStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Dismissed => "dismissed",
        }
    }

    /// Pending and sent reminders still occupy the candidate's follow-up
    /// slot; only dismissal frees it.
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Pending | Self::Sent)
    }
}

/// Recruiter follow-up reminder created when a risk dimension crosses its
/// threshold. `trigger_score` is frozen at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: ReminderId,
    pub candidate_id: CandidateId,
    pub follow_up_date: DateTime<Utc>,
    pub status: ReminderStatus,
    pub recruiter_note: Option<String>,
    pub trigger_score: u8,
    pub created_at: DateTime<Utc>,
    pub delivery_attempts: u32,
}

/// One unit of accumulated session context fed to the compactor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextEntry {
    pub text: String,
    /// Salient entries survive compaction verbatim; ephemeral ones are
    /// subject to recency-based eviction.
    pub salient: bool,
    pub recorded_at: DateTime<Utc>,
}

/// Bounded condensation of a session's accumulated context. At most one
/// snapshot exists per session key; compaction overwrites it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySnapshot {
    pub session_key: String,
    pub summary: String,
    pub compacted_context: Vec<ContextEntry>,
    pub words_before: usize,
    pub words_after: usize,
    pub compression_ratio: f32,
    pub compacted_at: DateTime<Utc>,
}
