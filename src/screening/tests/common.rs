use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::screening::domain::{
    Answer, Candidate, CandidateAssessment, CandidateId, ContextEntry, JobId, JobProfile,
    Question, QuestionId, QuestionKind, Reminder, RiskFlags, ScreeningSession, SessionId,
    SessionStatus,
};
use crate::screening::repository::{NotifyError, ReminderNotifier};
use crate::screening::store::MemoryStore;
use crate::screening::{screening_router, ScreeningConfig, ScreeningService};

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn screening_config() -> ScreeningConfig {
    let mut config = ScreeningConfig::default();
    // Short answers should still earn full depth credit in fixtures.
    config.scoring.open_text_expected_words = 10;
    config
}

pub(super) fn candidate(suffix: &str) -> Candidate {
    Candidate {
        id: CandidateId(format!("cand-{suffix}")),
        name: "Riley Chen".to_string(),
        email: format!("{suffix}@example.com"),
        phone: Some("515-555-0139".to_string()),
        current_title: Some("Software Engineer".to_string()),
        skills: vec!["rust".to_string(), "postgres".to_string()],
        resume_text: "Five years building data services".to_string(),
        salary_ask: Some(145_000.0),
        email_verified: true,
        assessment: None,
        version: 0,
    }
}

pub(super) fn job() -> JobProfile {
    JobProfile {
        id: JobId("job-backend".to_string()),
        title: "Backend Engineer".to_string(),
        description: "Own the ingestion pipeline".to_string(),
        required_skills: vec![
            "rust".to_string(),
            "postgres".to_string(),
            "kubernetes".to_string(),
        ],
        market_salary: Some(140_000.0),
    }
}

pub(super) fn questions() -> Vec<Question> {
    vec![
        Question {
            id: QuestionId("q1".to_string()),
            prompt: "How do you keep a queue consumer idempotent?".to_string(),
            kind: QuestionKind::OpenText,
            options: Vec::new(),
            ideal_answer: Some("dedupe idempotency retries".to_string()),
            cultural: false,
        },
        Question {
            id: QuestionId("q2".to_string()),
            prompt: "What keeps you motivated day to day?".to_string(),
            kind: QuestionKind::OpenText,
            options: Vec::new(),
            ideal_answer: None,
            cultural: true,
        },
    ]
}

pub(super) fn strong_technical_answer() -> String {
    "We dedupe with idempotency keys so retries collapse into one effect downstream".to_string()
}

pub(super) fn strong_cultural_answer() -> String {
    "I collaborate with the team, love to learn and grow, and take ownership to improve our impact"
        .to_string()
}

pub(super) fn weak_technical_answer() -> String {
    "no idea".to_string()
}

pub(super) fn weak_cultural_answer() -> String {
    "This is just a job, management is bad and I refuse to blame myself".to_string()
}

/// Hand-built completed session for exercising the scoring engine without
/// the state machine.
pub(super) fn completed_session(
    questions: Vec<Question>,
    answers: Vec<(&str, String)>,
) -> ScreeningSession {
    let submitted = now();
    ScreeningSession {
        id: SessionId("sess-fixture".to_string()),
        candidate_id: CandidateId("cand-fixture".to_string()),
        job_id: JobId("job-backend".to_string()),
        questions,
        answers: answers
            .into_iter()
            .map(|(question_id, text)| Answer {
                question_id: QuestionId(question_id.to_string()),
                text,
                submitted_at: submitted,
            })
            .collect(),
        status: SessionStatus::Completed,
        screening_url: "/screen/sess-fixture".to_string(),
        created_at: submitted,
        expires_at: submitted + chrono::Duration::days(7),
        submitted_at: Some(submitted),
        version: 1,
    }
}

pub(super) fn assessment(overall: u8, retention: f32, salary: f32, cultural: f32) -> CandidateAssessment {
    let risks = RiskFlags {
        retention,
        salary,
        cultural,
    };
    CandidateAssessment {
        overall_score: overall,
        risks,
        domain_color: crate::screening::risk::domain_color(
            overall,
            &risks,
            &crate::screening::risk::RiskThresholds::default(),
        ),
    }
}

pub(super) fn context_entry(text: &str, salient: bool, recorded_at: DateTime<Utc>) -> ContextEntry {
    ContextEntry {
        text: text.to_string(),
        salient,
        recorded_at,
    }
}

/// Notifier that records deliveries for assertions.
#[derive(Default)]
pub(super) struct MemoryNotifier {
    deliveries: Mutex<Vec<(String, String)>>,
}

impl MemoryNotifier {
    pub(super) fn deliveries(&self) -> Vec<(String, String)> {
        self.deliveries.lock().expect("notifier mutex poisoned").clone()
    }
}

impl ReminderNotifier for MemoryNotifier {
    fn deliver(&self, reminder: &Reminder, candidate: &Candidate) -> Result<(), NotifyError> {
        self.deliveries
            .lock()
            .expect("notifier mutex poisoned")
            .push((reminder.id.0.clone(), candidate.email.clone()));
        Ok(())
    }
}

/// Notifier whose transport is permanently down.
pub(super) struct FailingNotifier;

impl ReminderNotifier for FailingNotifier {
    fn deliver(&self, _reminder: &Reminder, _candidate: &Candidate) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("smtp offline".to_string()))
    }
}

pub(super) type TestService = ScreeningService<MemoryStore, MemoryStore, MemoryNotifier>;

pub(super) fn build_service() -> (Arc<TestService>, Arc<MemoryStore>, Arc<MemoryNotifier>) {
    let store = Arc::new(MemoryStore::default());
    let notifier = Arc::new(MemoryNotifier::default());
    let service = Arc::new(ScreeningService::new(
        store.clone(),
        store.clone(),
        notifier.clone(),
        screening_config(),
    ));
    (service, store, notifier)
}

/// Service seeded with the standard candidate and job.
pub(super) fn seeded_service(
    suffix: &str,
) -> (Arc<TestService>, Arc<MemoryStore>, Arc<MemoryNotifier>) {
    let (service, store, notifier) = build_service();
    service.upsert_candidate(candidate(suffix)).expect("candidate stored");
    service.upsert_job(job()).expect("job stored");
    (service, store, notifier)
}

pub(super) fn screening_router_with_service(service: Arc<TestService>) -> axum::Router {
    screening_router(service)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
