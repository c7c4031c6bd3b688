use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use super::domain::{
    Candidate, CandidateAssessment, CandidateId, ContextEntry, JobId, JobProfile, MemorySnapshot,
    Reminder, ReminderId, ReminderStatus, Score, ScreeningSession, SessionId, SessionStatus,
};
use super::repository::{JobDirectory, RepositoryError, ScreeningRepository};

/// Mutex-guarded in-memory store backing the binary's demo/serve modes and
/// the test suite. The per-map locks give the single-writer-per-record
/// discipline the repository contract asks for; the version checks reject
/// lost updates across lock acquisitions.
#[derive(Default)]
pub struct MemoryStore {
    candidates: Mutex<HashMap<CandidateId, Candidate>>,
    sessions: Mutex<HashMap<SessionId, ScreeningSession>>,
    scores: Mutex<HashMap<SessionId, Score>>,
    reminders: Mutex<HashMap<ReminderId, Reminder>>,
    jobs: Mutex<HashMap<JobId, JobProfile>>,
    contexts: Mutex<HashMap<String, Vec<ContextEntry>>>,
    snapshots: Mutex<HashMap<String, MemorySnapshot>>,
}

impl ScreeningRepository for MemoryStore {
    fn upsert_candidate(&self, mut candidate: Candidate) -> Result<Candidate, RepositoryError> {
        let mut guard = self.candidates.lock().expect("candidate mutex poisoned");
        if let Some(existing) = guard.get(&candidate.id) {
            // Intake only replaces identity fields; the assessment block
            // stays under the classifier's control.
            candidate.assessment = existing.assessment.clone();
            candidate.version = existing.version + 1;
        } else {
            // First insert carries identity fields only.
            candidate.assessment = None;
            candidate.version = 0;
        }
        guard.insert(candidate.id.clone(), candidate.clone());
        Ok(candidate)
    }

    fn candidate(&self, id: &CandidateId) -> Result<Option<Candidate>, RepositoryError> {
        let guard = self.candidates.lock().expect("candidate mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn update_candidate_assessment(
        &self,
        id: &CandidateId,
        expected_version: u64,
        assessment: CandidateAssessment,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.candidates.lock().expect("candidate mutex poisoned");
        let candidate = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        if candidate.version != expected_version {
            return Err(RepositoryError::VersionConflict);
        }
        candidate.assessment = Some(assessment);
        candidate.version += 1;
        Ok(())
    }

    fn insert_session(&self, session: ScreeningSession) -> Result<(), RepositoryError> {
        let mut guard = self.sessions.lock().expect("session mutex poisoned");
        if guard.contains_key(&session.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(session.id.clone(), session);
        Ok(())
    }

    fn session(&self, id: &SessionId) -> Result<Option<ScreeningSession>, RepositoryError> {
        let guard = self.sessions.lock().expect("session mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn update_session(
        &self,
        mut session: ScreeningSession,
        expected_version: u64,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.sessions.lock().expect("session mutex poisoned");
        let stored = guard.get_mut(&session.id).ok_or(RepositoryError::NotFound)?;
        if stored.version != expected_version {
            return Err(RepositoryError::VersionConflict);
        }
        session.version = expected_version + 1;
        *stored = session;
        Ok(())
    }

    fn sessions_for_candidate(
        &self,
        id: &CandidateId,
    ) -> Result<Vec<ScreeningSession>, RepositoryError> {
        let guard = self.sessions.lock().expect("session mutex poisoned");
        let mut sessions: Vec<ScreeningSession> = guard
            .values()
            .filter(|session| &session.candidate_id == id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(sessions)
    }

    fn completed_unscored_sessions(&self) -> Result<Vec<ScreeningSession>, RepositoryError> {
        let sessions = self.sessions.lock().expect("session mutex poisoned");
        let scores = self.scores.lock().expect("score mutex poisoned");
        let mut unscored: Vec<ScreeningSession> = sessions
            .values()
            .filter(|session| {
                session.status == SessionStatus::Completed && !scores.contains_key(&session.id)
            })
            .cloned()
            .collect();
        unscored.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(unscored)
    }

    fn insert_score(&self, score: Score) -> Result<(), RepositoryError> {
        let mut guard = self.scores.lock().expect("score mutex poisoned");
        if guard.contains_key(&score.session_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(score.session_id.clone(), score);
        Ok(())
    }

    fn score_for_session(&self, id: &SessionId) -> Result<Option<Score>, RepositoryError> {
        let guard = self.scores.lock().expect("score mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn scores_for_candidate(&self, id: &CandidateId) -> Result<Vec<Score>, RepositoryError> {
        let guard = self.scores.lock().expect("score mutex poisoned");
        let mut scores: Vec<Score> = guard
            .values()
            .filter(|score| &score.candidate_id == id)
            .cloned()
            .collect();
        scores.sort_by(|a, b| a.scored_at.cmp(&b.scored_at));
        Ok(scores)
    }

    fn insert_reminder(&self, reminder: Reminder) -> Result<(), RepositoryError> {
        let mut guard = self.reminders.lock().expect("reminder mutex poisoned");
        if guard.contains_key(&reminder.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(reminder.id.clone(), reminder);
        Ok(())
    }

    fn reminder(&self, id: &ReminderId) -> Result<Option<Reminder>, RepositoryError> {
        let guard = self.reminders.lock().expect("reminder mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn update_reminder(&self, reminder: Reminder) -> Result<(), RepositoryError> {
        let mut guard = self.reminders.lock().expect("reminder mutex poisoned");
        if !guard.contains_key(&reminder.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(reminder.id.clone(), reminder);
        Ok(())
    }

    fn update_reminder_guarded(
        &self,
        reminder: Reminder,
        expected_status: ReminderStatus,
    ) -> Result<bool, RepositoryError> {
        let mut guard = self.reminders.lock().expect("reminder mutex poisoned");
        let stored = guard.get_mut(&reminder.id).ok_or(RepositoryError::NotFound)?;
        if stored.status != expected_status {
            return Ok(false);
        }
        *stored = reminder;
        Ok(true)
    }

    fn reminders_for_candidate(&self, id: &CandidateId) -> Result<Vec<Reminder>, RepositoryError> {
        let guard = self.reminders.lock().expect("reminder mutex poisoned");
        let mut reminders: Vec<Reminder> = guard
            .values()
            .filter(|reminder| &reminder.candidate_id == id)
            .cloned()
            .collect();
        reminders.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(reminders)
    }

    fn live_reminder_for(&self, id: &CandidateId) -> Result<Option<Reminder>, RepositoryError> {
        let guard = self.reminders.lock().expect("reminder mutex poisoned");
        Ok(guard
            .values()
            .filter(|reminder| &reminder.candidate_id == id && reminder.status.is_live())
            .min_by(|a, b| a.created_at.cmp(&b.created_at))
            .cloned())
    }

    fn due_reminders(&self, now: DateTime<Utc>) -> Result<Vec<Reminder>, RepositoryError> {
        let guard = self.reminders.lock().expect("reminder mutex poisoned");
        let mut due: Vec<Reminder> = guard
            .values()
            .filter(|reminder| {
                reminder.status == ReminderStatus::Pending && reminder.follow_up_date <= now
            })
            .cloned()
            .collect();
        due.sort_by(|a, b| a.follow_up_date.cmp(&b.follow_up_date));
        Ok(due)
    }

    fn append_context(
        &self,
        session_key: &str,
        entry: ContextEntry,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.contexts.lock().expect("context mutex poisoned");
        guard.entry(session_key.to_string()).or_default().push(entry);
        Ok(())
    }

    fn context(&self, session_key: &str) -> Result<Vec<ContextEntry>, RepositoryError> {
        let guard = self.contexts.lock().expect("context mutex poisoned");
        Ok(guard.get(session_key).cloned().unwrap_or_default())
    }

    fn replace_context(
        &self,
        session_key: &str,
        expected_len: usize,
        entries: Vec<ContextEntry>,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.contexts.lock().expect("context mutex poisoned");
        let stored = guard.entry(session_key.to_string()).or_default();
        if stored.len() != expected_len {
            return Err(RepositoryError::VersionConflict);
        }
        *stored = entries;
        Ok(())
    }

    fn context_keys(&self) -> Result<Vec<String>, RepositoryError> {
        let guard = self.contexts.lock().expect("context mutex poisoned");
        let mut keys: Vec<String> = guard.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    fn upsert_snapshot(&self, snapshot: MemorySnapshot) -> Result<(), RepositoryError> {
        let mut guard = self.snapshots.lock().expect("snapshot mutex poisoned");
        guard.insert(snapshot.session_key.clone(), snapshot);
        Ok(())
    }

    fn snapshot(&self, session_key: &str) -> Result<Option<MemorySnapshot>, RepositoryError> {
        let guard = self.snapshots.lock().expect("snapshot mutex poisoned");
        Ok(guard.get(session_key).cloned())
    }
}

impl JobDirectory for MemoryStore {
    fn job(&self, id: &JobId) -> Result<Option<JobProfile>, RepositoryError> {
        let guard = self.jobs.lock().expect("job mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn upsert_job(&self, job: JobProfile) -> Result<(), RepositoryError> {
        let mut guard = self.jobs.lock().expect("job mutex poisoned");
        guard.insert(job.id.clone(), job);
        Ok(())
    }
}
