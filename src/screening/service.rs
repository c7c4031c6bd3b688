use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::domain::{
    Candidate, CandidateAssessment, CandidateId, ContextEntry, JobId, MemorySnapshot, Question,
    QuestionId, Score, ScreeningSession, SessionId,
};
use super::memory::{CompactionReport, EntryRanker, MemoryCompactor};
use super::reminders::{ReminderScheduler, SweepReport};
use super::repository::{
    CandidateStatusView, JobDirectory, ReminderView, RepositoryError, ReminderNotifier,
    ScoreView, ScreeningRepository, SessionView,
};
use super::risk::{classify, RiskConfig};
use super::scoring::{AnswerMatcher, ScoringEngine, ScoringUnavailable};
use super::session::{SessionConfig, SessionError, SessionManager};
use super::ScreeningConfig;

/// How often the candidate-aggregate compare-and-set is replayed before
/// giving up on this classification pass (the next rescore sweep tries
/// again).
const AGGREGATE_CAS_RETRY_LIMIT: u32 = 4;

/// Error raised by the screening facade.
#[derive(Debug, thiserror::Error)]
pub enum ScreeningError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Scoring(#[from] ScoringUnavailable),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Result of `finalize_session`: the committed session plus the score when
/// the engine could evaluate it immediately. A `None` score means the
/// session is completed but unscored and queued for the rescore sweep.
#[derive(Debug, Serialize)]
pub struct FinalizeOutcome {
    pub session: SessionView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<ScoreView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_color: Option<&'static str>,
}

/// Outcome counts for one rescore sweep over completed-unscored sessions.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RescoreReport {
    pub scored: usize,
    pub unavailable: usize,
}

/// Facade composing the session state machine, scoring engine, risk
/// classifier, reminder scheduler, and memory compactor over one
/// repository.
pub struct ScreeningService<R, J, N> {
    repository: Arc<R>,
    jobs: Arc<J>,
    sessions: SessionManager<R, J>,
    scoring: ScoringEngine,
    risk: RiskConfig,
    reminders: ReminderScheduler<R, N>,
    compactor: MemoryCompactor<R>,
}

impl<R, J, N> ScreeningService<R, J, N>
where
    R: ScreeningRepository + 'static,
    J: JobDirectory + 'static,
    N: ReminderNotifier + 'static,
{
    pub fn new(repository: Arc<R>, jobs: Arc<J>, notifier: Arc<N>, config: ScreeningConfig) -> Self {
        let scoring = ScoringEngine::new(config.scoring.clone());
        Self::assemble(repository, jobs, notifier, config, scoring)
    }

    /// Swap in a different answer-matching strategy (e.g. exact matching
    /// for deterministic fixtures or an embedding-backed matcher).
    pub fn with_matcher(
        repository: Arc<R>,
        jobs: Arc<J>,
        notifier: Arc<N>,
        config: ScreeningConfig,
        matcher: Arc<dyn AnswerMatcher>,
    ) -> Self {
        let scoring = ScoringEngine::with_matcher(config.scoring.clone(), matcher);
        Self::assemble(repository, jobs, notifier, config, scoring)
    }

    fn assemble(
        repository: Arc<R>,
        jobs: Arc<J>,
        notifier: Arc<N>,
        config: ScreeningConfig,
        scoring: ScoringEngine,
    ) -> Self {
        let sessions = SessionManager::new(
            repository.clone(),
            jobs.clone(),
            SessionConfig {
                ttl_days: config.session_ttl_days,
            },
        );
        let reminders =
            ReminderScheduler::new(repository.clone(), notifier, config.reminder);
        let compactor = MemoryCompactor::new(repository.clone(), config.compaction);

        Self {
            repository,
            jobs,
            sessions,
            scoring,
            risk: config.risk,
            reminders,
            compactor,
        }
    }

    /// Swap in a different context-ranking strategy for the compactor.
    pub fn with_ranker(mut self, ranker: Arc<dyn EntryRanker>) -> Self {
        let config = *self.compactor.config();
        self.compactor = MemoryCompactor::with_ranker(self.repository.clone(), ranker, config);
        self
    }

    /// External CRUD intake for candidate identity fields. The stored
    /// assessment block is preserved on update.
    pub fn upsert_candidate(&self, candidate: Candidate) -> Result<Candidate, ScreeningError> {
        Ok(self.repository.upsert_candidate(candidate)?)
    }

    pub fn upsert_job(&self, job: super::domain::JobProfile) -> Result<(), ScreeningError> {
        Ok(self.jobs.upsert_job(job)?)
    }

    pub fn create_session(
        &self,
        candidate_id: CandidateId,
        job_id: JobId,
        questions: Vec<Question>,
        now: DateTime<Utc>,
    ) -> Result<ScreeningSession, ScreeningError> {
        Ok(self
            .sessions
            .create_session(candidate_id, job_id, questions, now)?)
    }

    pub fn submit_answer(
        &self,
        session_id: &SessionId,
        question_id: &QuestionId,
        text: String,
        now: DateTime<Utc>,
    ) -> Result<ScreeningSession, ScreeningError> {
        Ok(self.sessions.submit_answer(session_id, question_id, text, now)?)
    }

    /// Commit completion, then run the scoring/classification/reminder
    /// chain. A scoring failure is recorded and left for the rescore
    /// sweep; the completed transition itself never rolls back.
    pub fn finalize_session(
        &self,
        session_id: &SessionId,
        now: DateTime<Utc>,
    ) -> Result<FinalizeOutcome, ScreeningError> {
        let session = self.sessions.finalize(session_id, now)?;

        match self.score_session(&session, now) {
            Ok(score) => Ok(FinalizeOutcome {
                session: SessionView::from_session(&session, now),
                domain_color: Some(
                    self.candidate_color(&session.candidate_id)?
                        .unwrap_or("yellow"),
                ),
                score: Some(ScoreView::from_score(&score)),
            }),
            Err(ScreeningError::Scoring(err)) => {
                warn!(session = %session.id.0, error = %err, "scoring deferred to rescore sweep");
                Ok(FinalizeOutcome {
                    session: SessionView::from_session(&session, now),
                    score: None,
                    domain_color: None,
                })
            }
            Err(err) => Err(err),
        }
    }

    fn candidate_color(&self, id: &CandidateId) -> Result<Option<&'static str>, ScreeningError> {
        Ok(self
            .repository
            .candidate(id)?
            .and_then(|candidate| candidate.assessment)
            .map(|assessment| assessment.domain_color.label()))
    }

    /// Score one completed session: engine -> classifier -> candidate
    /// aggregate (compare-and-set) -> reminder trigger. The score row is
    /// inserted exactly once; a conflict means another worker already
    /// scored this session and the stored row wins.
    fn score_session(
        &self,
        session: &ScreeningSession,
        now: DateTime<Utc>,
    ) -> Result<Score, ScreeningError> {
        let candidate = self
            .repository
            .candidate(&session.candidate_id)?
            .ok_or(RepositoryError::NotFound)?;
        let job = self
            .jobs
            .job(&session.job_id)?
            .ok_or(RepositoryError::NotFound)?;

        let card = self.scoring.score(session, &job, &candidate)?;
        let (risks, color) = classify(&card, &candidate, job.market_salary, &self.risk);

        let score = Score {
            session_id: session.id.clone(),
            candidate_id: candidate.id.clone(),
            total: card.total,
            accuracy: card.accuracy,
            depth: card.depth,
            cultural: card.cultural,
            skill_gap: card.skill_gap.clone(),
            risk_flags: risks,
            recommendation: card.recommendation,
            interview_guide_url: None,
            scored_at: now,
        };

        match self.repository.insert_score(score.clone()) {
            Ok(()) => {}
            Err(RepositoryError::Conflict) => {
                if let Some(existing) = self.repository.score_for_session(&session.id)? {
                    return Ok(existing);
                }
                return Err(RepositoryError::Conflict.into());
            }
            Err(err) => return Err(err.into()),
        }
        info!(
            session = %session.id.0,
            candidate = %candidate.id.0,
            total = score.total,
            color = color.label(),
            "session scored"
        );

        let assessment = CandidateAssessment {
            overall_score: card.total,
            risks,
            domain_color: color,
        };
        let candidate = self.commit_assessment(&candidate.id, assessment.clone())?;
        self.reminders.on_assessment(&candidate, &assessment, now)?;

        Ok(score)
    }

    /// Last-write-wins across sessions for one candidate, without losing a
    /// concurrent writer's update: re-read and replay on version conflict.
    fn commit_assessment(
        &self,
        id: &CandidateId,
        assessment: CandidateAssessment,
    ) -> Result<Candidate, ScreeningError> {
        let mut attempts = 0;
        loop {
            let candidate = self
                .repository
                .candidate(id)?
                .ok_or(RepositoryError::NotFound)?;
            match self.repository.update_candidate_assessment(
                id,
                candidate.version,
                assessment.clone(),
            ) {
                Ok(()) => {
                    let mut updated = candidate;
                    updated.assessment = Some(assessment);
                    updated.version += 1;
                    return Ok(updated);
                }
                Err(RepositoryError::VersionConflict) if attempts < AGGREGATE_CAS_RETRY_LIMIT => {
                    attempts += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Retry scoring for sessions that completed while the engine was
    /// unavailable.
    pub fn rescore_sweep(&self, now: DateTime<Utc>) -> Result<RescoreReport, ScreeningError> {
        let mut report = RescoreReport::default();
        for session in self.repository.completed_unscored_sessions()? {
            match self.score_session(&session, now) {
                Ok(_) => report.scored += 1,
                Err(ScreeningError::Scoring(err)) => {
                    warn!(session = %session.id.0, error = %err, "rescore still unavailable");
                    report.unavailable += 1;
                }
                Err(err) => return Err(err),
            }
        }
        Ok(report)
    }

    pub fn candidate_status(
        &self,
        id: &CandidateId,
        now: DateTime<Utc>,
    ) -> Result<CandidateStatusView, ScreeningError> {
        let candidate = self
            .repository
            .candidate(id)?
            .ok_or(RepositoryError::NotFound)?;

        let sessions = self
            .repository
            .sessions_for_candidate(id)?
            .iter()
            .map(|session| SessionView::from_session(session, now))
            .collect();
        let scores = self
            .repository
            .scores_for_candidate(id)?
            .iter()
            .map(ScoreView::from_score)
            .collect();
        let max_attempts = self.reminders.config().max_delivery_attempts;
        let reminders = self
            .repository
            .reminders_for_candidate(id)?
            .iter()
            .map(|reminder| ReminderView::from_reminder(reminder, max_attempts))
            .collect();

        Ok(CandidateStatusView {
            candidate_id: candidate.id,
            name: candidate.name,
            email: candidate.email,
            overall_score: candidate
                .assessment
                .as_ref()
                .map(|assessment| assessment.overall_score),
            risks: candidate.assessment.as_ref().map(|assessment| assessment.risks),
            domain_color: candidate
                .assessment
                .as_ref()
                .map(|assessment| assessment.domain_color.label()),
            sessions,
            scores,
            reminders,
        })
    }

    pub fn dismiss_reminder(
        &self,
        id: &super::domain::ReminderId,
    ) -> Result<ReminderView, ScreeningError> {
        let reminder = self.reminders.dismiss(id)?;
        Ok(ReminderView::from_reminder(
            &reminder,
            self.reminders.config().max_delivery_attempts,
        ))
    }

    pub fn reminder_sweep(&self, now: DateTime<Utc>) -> Result<SweepReport, ScreeningError> {
        Ok(self.reminders.sweep(now)?)
    }

    /// Append one context entry and compact immediately if the stored
    /// context crossed a threshold.
    pub fn record_context(
        &self,
        session_key: &str,
        entry: ContextEntry,
        now: DateTime<Utc>,
    ) -> Result<Option<MemorySnapshot>, ScreeningError> {
        self.repository.append_context(session_key, entry)?;
        Ok(self.compactor.compact_if_needed(session_key, now)?)
    }

    /// On-demand compaction, unconditionally.
    pub fn compact_session(
        &self,
        session_key: &str,
        now: DateTime<Utc>,
    ) -> Result<MemorySnapshot, ScreeningError> {
        Ok(self.compactor.compact(session_key, now)?)
    }

    pub fn compaction_sweep(&self, now: DateTime<Utc>) -> Result<CompactionReport, ScreeningError> {
        Ok(self.compactor.sweep(now)?)
    }

    pub fn snapshot(&self, session_key: &str) -> Result<Option<MemorySnapshot>, ScreeningError> {
        Ok(self.repository.snapshot(session_key)?)
    }
}
