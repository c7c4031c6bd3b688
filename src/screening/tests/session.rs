use std::sync::Arc;

use chrono::Duration;

use super::common::*;
use crate::screening::domain::{CandidateId, JobId, QuestionId, SessionStatus};
use crate::screening::repository::{JobDirectory, ScreeningRepository};
use crate::screening::session::{SessionConfig, SessionError, SessionManager};
use crate::screening::store::MemoryStore;

fn manager() -> (SessionManager<MemoryStore, MemoryStore>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::default());
    store.upsert_candidate(candidate("session")).expect("candidate stored");
    store.upsert_job(job()).expect("job stored");
    let manager = SessionManager::new(store.clone(), store.clone(), SessionConfig::default());
    (manager, store)
}

fn candidate_id() -> CandidateId {
    CandidateId("cand-session".to_string())
}

#[test]
fn create_session_starts_pending_with_url_and_expiry() {
    let (manager, _) = manager();
    let session = manager
        .create_session(candidate_id(), JobId("job-backend".to_string()), questions(), now())
        .expect("session created");

    assert_eq!(session.status, SessionStatus::Pending);
    assert_eq!(session.screening_url, format!("/screen/{}", session.id.0));
    assert_eq!(session.expires_at, now() + Duration::days(7));
    assert!(session.answers.is_empty());
    assert_eq!(session.version, 0);
}

#[test]
fn create_session_rejects_empty_question_list() {
    let (manager, _) = manager();
    let result = manager.create_session(
        candidate_id(),
        JobId("job-backend".to_string()),
        Vec::new(),
        now(),
    );
    assert!(matches!(result, Err(SessionError::InvalidInput(_))));
}

#[test]
fn create_session_rejects_duplicate_question_ids() {
    let (manager, _) = manager();
    let mut set = questions();
    set.push(set[0].clone());
    let result = manager.create_session(
        candidate_id(),
        JobId("job-backend".to_string()),
        set,
        now(),
    );
    assert!(matches!(result, Err(SessionError::InvalidInput(_))));
}

#[test]
fn create_session_rejects_unknown_candidate_and_job() {
    let (manager, _) = manager();
    let unknown_candidate = manager.create_session(
        CandidateId("cand-ghost".to_string()),
        JobId("job-backend".to_string()),
        questions(),
        now(),
    );
    assert!(matches!(unknown_candidate, Err(SessionError::InvalidInput(_))));

    let unknown_job = manager.create_session(
        candidate_id(),
        JobId("job-ghost".to_string()),
        questions(),
        now(),
    );
    assert!(matches!(unknown_job, Err(SessionError::InvalidInput(_))));
}

#[test]
fn first_answer_moves_session_in_progress() {
    let (manager, _) = manager();
    let session = manager
        .create_session(candidate_id(), JobId("job-backend".to_string()), questions(), now())
        .expect("session created");

    let updated = manager
        .submit_answer(&session.id, &QuestionId("q1".to_string()), strong_technical_answer(), now())
        .expect("answer recorded");

    assert_eq!(updated.status, SessionStatus::InProgress);
    assert_eq!(updated.answers.len(), 1);
    assert_eq!(updated.version, 1);
}

#[test]
fn resubmission_replaces_earlier_answer() {
    let (manager, _) = manager();
    let session = manager
        .create_session(candidate_id(), JobId("job-backend".to_string()), questions(), now())
        .expect("session created");

    manager
        .submit_answer(&session.id, &QuestionId("q1".to_string()), "first draft".to_string(), now())
        .expect("answer recorded");
    let updated = manager
        .submit_answer(&session.id, &QuestionId("q1".to_string()), "second draft".to_string(), now())
        .expect("answer replaced");

    assert_eq!(updated.answers.len(), 1);
    assert_eq!(updated.answers[0].text, "second draft");
}

#[test]
fn unknown_question_is_rejected() {
    let (manager, _) = manager();
    let session = manager
        .create_session(candidate_id(), JobId("job-backend".to_string()), questions(), now())
        .expect("session created");

    let result = manager.submit_answer(
        &session.id,
        &QuestionId("q-ghost".to_string()),
        "text".to_string(),
        now(),
    );
    assert!(matches!(result, Err(SessionError::UnknownQuestion(id)) if id.0 == "q-ghost"));
}

#[test]
fn expired_session_rejects_answers_without_mutation() {
    let (manager, store) = manager();
    let session = manager
        .create_session(candidate_id(), JobId("job-backend".to_string()), questions(), now())
        .expect("session created");

    let late = now() + Duration::days(8);
    let result = manager.submit_answer(
        &session.id,
        &QuestionId("q1".to_string()),
        strong_technical_answer(),
        late,
    );
    assert!(matches!(result, Err(SessionError::SessionExpired)));

    let stored = store.session(&session.id).expect("lookup").expect("present");
    assert!(stored.answers.is_empty());
    assert_eq!(stored.status, SessionStatus::Pending);
    assert_eq!(stored.status_label(late), "expired");
}

#[test]
fn finalize_rejects_missing_answers_in_question_order() {
    let (manager, _) = manager();
    let session = manager
        .create_session(candidate_id(), JobId("job-backend".to_string()), questions(), now())
        .expect("session created");
    manager
        .submit_answer(&session.id, &QuestionId("q2".to_string()), strong_cultural_answer(), now())
        .expect("answer recorded");

    match manager.finalize(&session.id, now()) {
        Err(SessionError::IncompleteAnswers(missing)) => {
            assert_eq!(missing, vec![QuestionId("q1".to_string())]);
        }
        other => panic!("expected incomplete answers, got {other:?}"),
    }
}

#[test]
fn finalize_completes_and_stamps_submission_time() {
    let (manager, store) = manager();
    let session = manager
        .create_session(candidate_id(), JobId("job-backend".to_string()), questions(), now())
        .expect("session created");
    manager
        .submit_answer(&session.id, &QuestionId("q1".to_string()), strong_technical_answer(), now())
        .expect("answer recorded");
    manager
        .submit_answer(&session.id, &QuestionId("q2".to_string()), strong_cultural_answer(), now())
        .expect("answer recorded");

    let finalized = manager.finalize(&session.id, now()).expect("finalized");
    assert_eq!(finalized.status, SessionStatus::Completed);
    assert_eq!(finalized.submitted_at, Some(now()));

    let stored = store.session(&session.id).expect("lookup").expect("present");
    assert_eq!(stored.status, SessionStatus::Completed);
}

#[test]
fn completed_session_is_closed_to_further_writes() {
    let (manager, _) = manager();
    let session = manager
        .create_session(candidate_id(), JobId("job-backend".to_string()), questions(), now())
        .expect("session created");
    manager
        .submit_answer(&session.id, &QuestionId("q1".to_string()), strong_technical_answer(), now())
        .expect("answer recorded");
    manager
        .submit_answer(&session.id, &QuestionId("q2".to_string()), strong_cultural_answer(), now())
        .expect("answer recorded");
    manager.finalize(&session.id, now()).expect("finalized");

    let resubmit = manager.submit_answer(
        &session.id,
        &QuestionId("q1".to_string()),
        "late edit".to_string(),
        now(),
    );
    assert!(matches!(resubmit, Err(SessionError::SessionClosed)));

    let refinalize = manager.finalize(&session.id, now());
    assert!(matches!(refinalize, Err(SessionError::SessionClosed)));
}

#[test]
fn finalize_rejects_expired_session() {
    let (manager, _) = manager();
    let session = manager
        .create_session(candidate_id(), JobId("job-backend".to_string()), questions(), now())
        .expect("session created");
    manager
        .submit_answer(&session.id, &QuestionId("q1".to_string()), strong_technical_answer(), now())
        .expect("answer recorded");
    manager
        .submit_answer(&session.id, &QuestionId("q2".to_string()), strong_cultural_answer(), now())
        .expect("answer recorded");

    let result = manager.finalize(&session.id, now() + Duration::days(8));
    assert!(matches!(result, Err(SessionError::SessionExpired)));
}

#[test]
fn completed_session_never_reads_as_expired() {
    let (manager, _) = manager();
    let session = manager
        .create_session(candidate_id(), JobId("job-backend".to_string()), questions(), now())
        .expect("session created");
    manager
        .submit_answer(&session.id, &QuestionId("q1".to_string()), strong_technical_answer(), now())
        .expect("answer recorded");
    manager
        .submit_answer(&session.id, &QuestionId("q2".to_string()), strong_cultural_answer(), now())
        .expect("answer recorded");
    let finalized = manager.finalize(&session.id, now()).expect("finalized");

    assert_eq!(finalized.status_label(now() + Duration::days(30)), "completed");
}
