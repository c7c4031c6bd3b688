use chrono::Duration;

use super::common::*;
use crate::screening::domain::{
    CandidateId, DomainColor, JobId, QuestionId, Recommendation, ReminderStatus, SessionStatus,
};
use crate::screening::repository::ScreeningRepository;
use crate::screening::service::ScreeningError;

fn answer_all_strong(service: &TestService, session_id: &crate::screening::domain::SessionId) {
    service
        .submit_answer(session_id, &QuestionId("q1".to_string()), strong_technical_answer(), now())
        .expect("answer recorded");
    service
        .submit_answer(session_id, &QuestionId("q2".to_string()), strong_cultural_answer(), now())
        .expect("answer recorded");
}

#[test]
fn strong_finalize_scores_and_classifies_green() {
    let (service, store, _) = seeded_service("alice");
    let session = service
        .create_session(
            CandidateId("cand-alice".to_string()),
            JobId("job-backend".to_string()),
            questions(),
            now(),
        )
        .expect("session created");
    answer_all_strong(&service, &session.id);

    let outcome = service.finalize_session(&session.id, now()).expect("finalized");

    assert_eq!(outcome.session.status, "completed");
    let score = outcome.score.expect("scored inline");
    assert_eq!(score.total, 95);
    assert_eq!(score.recommendation, "advance");
    assert_eq!(score.skill_gap, vec!["kubernetes".to_string()]);
    assert_eq!(outcome.domain_color, Some("green"));

    let candidate = store
        .candidate(&CandidateId("cand-alice".to_string()))
        .expect("lookup")
        .expect("present");
    let assessment = candidate.assessment.expect("assessment committed");
    assert_eq!(assessment.overall_score, 95);
    assert_eq!(assessment.domain_color, DomainColor::Green);

    // Low risks schedule no follow-up.
    let reminders = store
        .reminders_for_candidate(&candidate.id)
        .expect("lookup");
    assert!(reminders.is_empty());
}

#[test]
fn weak_finalize_goes_red_and_schedules_follow_up() {
    let (service, store, _) = seeded_service("bob");
    let mut weak = candidate("bob");
    weak.salary_ask = Some(190_000.0);
    service.upsert_candidate(weak).expect("candidate updated");

    let session = service
        .create_session(
            CandidateId("cand-bob".to_string()),
            JobId("job-backend".to_string()),
            questions(),
            now(),
        )
        .expect("session created");
    service
        .submit_answer(&session.id, &QuestionId("q1".to_string()), weak_technical_answer(), now())
        .expect("answer recorded");
    service
        .submit_answer(&session.id, &QuestionId("q2".to_string()), weak_cultural_answer(), now())
        .expect("answer recorded");

    let outcome = service.finalize_session(&session.id, now()).expect("finalized");

    let score = outcome.score.expect("scored inline");
    assert_eq!(score.total, 23);
    assert_eq!(score.recommendation, "reject");
    assert_eq!(outcome.domain_color, Some("red"));
    assert_eq!(score.risk_flags.retention, 75.0);

    let reminders = store
        .reminders_for_candidate(&CandidateId("cand-bob".to_string()))
        .expect("lookup");
    assert_eq!(reminders.len(), 1);
    assert_eq!(reminders[0].status, ReminderStatus::Pending);
    assert_eq!(reminders[0].trigger_score, 23);
    assert_eq!(reminders[0].follow_up_date, now() + Duration::days(3));
}

#[test]
fn session_is_scored_exactly_once() {
    let (service, store, _) = seeded_service("carol");
    let session = service
        .create_session(
            CandidateId("cand-carol".to_string()),
            JobId("job-backend".to_string()),
            questions(),
            now(),
        )
        .expect("session created");
    answer_all_strong(&service, &session.id);
    service.finalize_session(&session.id, now()).expect("finalized");

    // A later sweep finds nothing left to score.
    let report = service.rescore_sweep(now()).expect("sweep runs");
    assert_eq!(report.scored, 0);

    let scores = store
        .scores_for_candidate(&CandidateId("cand-carol".to_string()))
        .expect("lookup");
    assert_eq!(scores.len(), 1);
}

#[test]
fn scoring_failure_defers_to_rescore_sweep() {
    let (service, store, _) = seeded_service("dave");
    // No question carries an ideal answer, so nothing is evaluable.
    let unevaluable = vec![crate::screening::domain::Question {
        id: QuestionId("q2".to_string()),
        prompt: "What keeps you motivated?".to_string(),
        kind: crate::screening::domain::QuestionKind::OpenText,
        options: Vec::new(),
        ideal_answer: None,
        cultural: true,
    }];
    let session = service
        .create_session(
            CandidateId("cand-dave".to_string()),
            JobId("job-backend".to_string()),
            unevaluable,
            now(),
        )
        .expect("session created");
    service
        .submit_answer(&session.id, &QuestionId("q2".to_string()), strong_cultural_answer(), now())
        .expect("answer recorded");

    let outcome = service.finalize_session(&session.id, now()).expect("finalized");

    // Completion commits even though scoring is unavailable.
    assert!(outcome.score.is_none());
    let stored = store.session(&session.id).expect("lookup").expect("present");
    assert_eq!(stored.status, SessionStatus::Completed);

    let pending = store.completed_unscored_sessions().expect("lookup");
    assert_eq!(pending.len(), 1);

    let report = service.rescore_sweep(now()).expect("sweep runs");
    assert_eq!(report.unavailable, 1);
    assert_eq!(report.scored, 0);
}

#[test]
fn candidate_status_aggregates_everything() {
    let (service, _, _) = seeded_service("erin");
    let mut risky = candidate("erin");
    risky.salary_ask = Some(190_000.0);
    service.upsert_candidate(risky).expect("candidate updated");

    let session = service
        .create_session(
            CandidateId("cand-erin".to_string()),
            JobId("job-backend".to_string()),
            questions(),
            now(),
        )
        .expect("session created");
    service
        .submit_answer(&session.id, &QuestionId("q1".to_string()), weak_technical_answer(), now())
        .expect("answer recorded");
    service
        .submit_answer(&session.id, &QuestionId("q2".to_string()), weak_cultural_answer(), now())
        .expect("answer recorded");
    service.finalize_session(&session.id, now()).expect("finalized");

    let status = service
        .candidate_status(&CandidateId("cand-erin".to_string()), now())
        .expect("status");

    assert_eq!(status.sessions.len(), 1);
    assert_eq!(status.sessions[0].status, "completed");
    assert_eq!(status.scores.len(), 1);
    assert_eq!(status.reminders.len(), 1);
    assert_eq!(status.overall_score, Some(23));
    assert_eq!(status.domain_color, Some("red"));
    assert!(!status.reminders[0].delivery_failed);
}

#[test]
fn unknown_candidate_status_is_not_found() {
    let (service, _, _) = build_service();
    let result = service.candidate_status(&CandidateId("cand-ghost".to_string()), now());
    assert!(matches!(result, Err(ScreeningError::Repository(_))));
}

#[test]
fn upsert_preserves_committed_assessment() {
    let (service, store, _) = seeded_service("fred");
    let session = service
        .create_session(
            CandidateId("cand-fred".to_string()),
            JobId("job-backend".to_string()),
            questions(),
            now(),
        )
        .expect("session created");
    answer_all_strong(&service, &session.id);
    service.finalize_session(&session.id, now()).expect("finalized");

    let mut updated = candidate("fred");
    updated.phone = Some("515-555-0000".to_string());
    service.upsert_candidate(updated).expect("candidate updated");

    let stored = store
        .candidate(&CandidateId("cand-fred".to_string()))
        .expect("lookup")
        .expect("present");
    assert_eq!(stored.phone, Some("515-555-0000".to_string()));
    assert!(stored.assessment.is_some());
}

#[test]
fn record_context_compacts_once_over_threshold() {
    let (service, _, _) = seeded_service("gail");
    let old = now() - Duration::hours(2);

    for turn in 0..50 {
        let snapshot = service
            .record_context(
                "sess-ctx",
                context_entry(&format!("chatter {turn}"), false, old),
                old,
            )
            .expect("recorded");
        assert!(snapshot.is_none());
    }

    // Entry 51 crosses the count threshold.
    let snapshot = service
        .record_context("sess-ctx", context_entry("one more", false, now()), now())
        .expect("recorded")
        .expect("compacted");
    assert!(snapshot.compacted_context.len() < 51);
    assert_eq!(
        service.snapshot("sess-ctx").expect("lookup"),
        Some(snapshot)
    );
}

#[test]
fn reminder_sweep_delivers_through_the_service() {
    let (service, _, notifier) = seeded_service("hank");
    let mut risky = candidate("hank");
    risky.salary_ask = Some(190_000.0);
    service.upsert_candidate(risky).expect("candidate updated");

    let session = service
        .create_session(
            CandidateId("cand-hank".to_string()),
            JobId("job-backend".to_string()),
            questions(),
            now(),
        )
        .expect("session created");
    service
        .submit_answer(&session.id, &QuestionId("q1".to_string()), weak_technical_answer(), now())
        .expect("answer recorded");
    service
        .submit_answer(&session.id, &QuestionId("q2".to_string()), weak_cultural_answer(), now())
        .expect("answer recorded");
    service.finalize_session(&session.id, now()).expect("finalized");

    let report = service
        .reminder_sweep(now() + Duration::days(3))
        .expect("sweep runs");
    assert_eq!(report.delivered, 1);
    assert_eq!(notifier.deliveries().len(), 1);

    let status = service
        .candidate_status(&CandidateId("cand-hank".to_string()), now())
        .expect("status");
    assert_eq!(status.reminders[0].status, "sent");

    // Recruiter closes the loop.
    let reminder_id = status.reminders[0].reminder_id.clone();
    let dismissed = service.dismiss_reminder(&reminder_id).expect("dismissed");
    assert_eq!(dismissed.status, "dismissed");
}

#[test]
fn recommendation_labels_round_trip() {
    assert_eq!(Recommendation::Advance.label(), "advance");
    assert_eq!(Recommendation::Screen.label(), "screen");
    assert_eq!(Recommendation::Reject.label(), "reject");
}
