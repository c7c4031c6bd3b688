use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use super::domain::{
    Answer, CandidateId, JobId, Question, QuestionId, ScreeningSession, SessionId, SessionStatus,
};
use super::repository::{JobDirectory, RepositoryError, ScreeningRepository};

/// How often a compare-and-set update is replayed against a concurrent
/// writer before the conflict is surfaced.
const CAS_RETRY_LIMIT: u32 = 4;

static SESSION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_session_id() -> SessionId {
    let id = SESSION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    SessionId(format!("sess-{id:06}"))
}

/// State-machine violations and request inconsistencies raised by session
/// operations. Every rejection leaves the session untouched.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("session has expired")]
    SessionExpired,
    #[error("session is closed to further answers")]
    SessionClosed,
    #[error("question {} is not part of this session", .0 .0)]
    UnknownQuestion(QuestionId),
    #[error("answers missing for {} question(s)", .0.len())]
    IncompleteAnswers(Vec<QuestionId>),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Tunables for session creation.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub ttl_days: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { ttl_days: 7 }
    }
}

/// Owns the `pending -> in_progress -> completed` lifecycle. Expiry is an
/// orthogonal derived state checked on every mutation, including again at
/// commit time when a compare-and-set round trips.
pub struct SessionManager<R, J> {
    repository: Arc<R>,
    jobs: Arc<J>,
    config: SessionConfig,
}

impl<R, J> SessionManager<R, J>
where
    R: ScreeningRepository,
    J: JobDirectory,
{
    pub fn new(repository: Arc<R>, jobs: Arc<J>, config: SessionConfig) -> Self {
        Self {
            repository,
            jobs,
            config,
        }
    }

    /// Create a session in `pending` with a fresh access URL and an expiry
    /// of `now + ttl`. Candidate and job references must resolve.
    pub fn create_session(
        &self,
        candidate_id: CandidateId,
        job_id: JobId,
        questions: Vec<Question>,
        now: DateTime<Utc>,
    ) -> Result<ScreeningSession, SessionError> {
        if questions.is_empty() {
            return Err(SessionError::InvalidInput(
                "question list must not be empty".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for question in &questions {
            if !seen.insert(question.id.clone()) {
                return Err(SessionError::InvalidInput(format!(
                    "duplicate question id {}",
                    question.id.0
                )));
            }
        }

        if self.repository.candidate(&candidate_id)?.is_none() {
            return Err(SessionError::InvalidInput(format!(
                "unknown candidate {}",
                candidate_id.0
            )));
        }
        if self.jobs.job(&job_id)?.is_none() {
            return Err(SessionError::InvalidInput(format!(
                "unknown job {}",
                job_id.0
            )));
        }

        let id = next_session_id();
        let session = ScreeningSession {
            screening_url: format!("/screen/{}", id.0),
            id: id.clone(),
            candidate_id,
            job_id,
            questions,
            answers: Vec::new(),
            status: SessionStatus::Pending,
            created_at: now,
            expires_at: now + Duration::days(self.config.ttl_days),
            submitted_at: None,
            version: 0,
        };

        self.repository.insert_session(session.clone())?;
        info!(session = %id.0, "screening session created");
        Ok(session)
    }

    /// Record an answer. The first answer moves the session to
    /// `in_progress`; a resubmission for the same question replaces the
    /// earlier answer. Expired and completed sessions reject the write.
    pub fn submit_answer(
        &self,
        session_id: &SessionId,
        question_id: &QuestionId,
        text: String,
        now: DateTime<Utc>,
    ) -> Result<ScreeningSession, SessionError> {
        let mut attempts = 0;
        loop {
            let mut session = self
                .repository
                .session(session_id)?
                .ok_or(RepositoryError::NotFound)?;

            if session.status == SessionStatus::Completed {
                return Err(SessionError::SessionClosed);
            }
            if session.is_expired(now) {
                return Err(SessionError::SessionExpired);
            }
            if session.question(question_id).is_none() {
                return Err(SessionError::UnknownQuestion(question_id.clone()));
            }

            let answer = Answer {
                question_id: question_id.clone(),
                text: text.clone(),
                submitted_at: now,
            };
            match session
                .answers
                .iter_mut()
                .find(|existing| &existing.question_id == question_id)
            {
                Some(existing) => *existing = answer,
                None => session.answers.push(answer),
            }
            if session.status == SessionStatus::Pending {
                session.status = SessionStatus::InProgress;
            }

            let expected = session.version;
            match self.repository.update_session(session.clone(), expected) {
                Ok(()) => {
                    session.version = expected + 1;
                    return Ok(session);
                }
                Err(RepositoryError::VersionConflict) if attempts < CAS_RETRY_LIMIT => {
                    attempts += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Transition to `completed` once every question has an answer. The
    /// retry loop re-reads the session, so expiry and completeness are
    /// re-validated against whatever a racing writer committed.
    pub fn finalize(
        &self,
        session_id: &SessionId,
        now: DateTime<Utc>,
    ) -> Result<ScreeningSession, SessionError> {
        let mut attempts = 0;
        loop {
            let mut session = self
                .repository
                .session(session_id)?
                .ok_or(RepositoryError::NotFound)?;

            if session.status == SessionStatus::Completed {
                return Err(SessionError::SessionClosed);
            }
            if session.is_expired(now) {
                return Err(SessionError::SessionExpired);
            }

            let missing = session.missing_answers();
            if !missing.is_empty() {
                return Err(SessionError::IncompleteAnswers(missing));
            }

            session.status = SessionStatus::Completed;
            session.submitted_at = Some(now);

            let expected = session.version;
            match self.repository.update_session(session.clone(), expected) {
                Ok(()) => {
                    session.version = expected + 1;
                    info!(session = %session.id.0, "screening session completed");
                    return Ok(session);
                }
                Err(RepositoryError::VersionConflict) if attempts < CAS_RETRY_LIMIT => {
                    attempts += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}
