use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::domain::{
    Candidate, CandidateId, ContextEntry, JobId, JobProfile, Question, QuestionId, ReminderId,
    SessionId,
};
use super::repository::{JobDirectory, ReminderNotifier, RepositoryError, ScreeningRepository};
use super::service::{ScreeningError, ScreeningService};
use super::session::SessionError;
use super::SessionView;

/// Router builder exposing the screening pipeline over HTTP.
pub fn screening_router<R, J, N>(service: Arc<ScreeningService<R, J, N>>) -> Router
where
    R: ScreeningRepository + 'static,
    J: JobDirectory + 'static,
    N: ReminderNotifier + 'static,
{
    Router::new()
        .route(
            "/api/v1/screening/candidates",
            post(upsert_candidate_handler::<R, J, N>),
        )
        .route(
            "/api/v1/screening/candidates/:candidate_id",
            get(candidate_status_handler::<R, J, N>),
        )
        .route("/api/v1/screening/jobs", post(upsert_job_handler::<R, J, N>))
        .route(
            "/api/v1/screening/sessions",
            post(create_session_handler::<R, J, N>),
        )
        .route(
            "/api/v1/screening/sessions/:session_id/answers",
            post(submit_answer_handler::<R, J, N>),
        )
        .route(
            "/api/v1/screening/sessions/:session_id/finalize",
            post(finalize_handler::<R, J, N>),
        )
        .route(
            "/api/v1/screening/sessions/:session_id/context",
            post(record_context_handler::<R, J, N>),
        )
        .route(
            "/api/v1/screening/sessions/:session_id/compact",
            post(compact_handler::<R, J, N>),
        )
        .route(
            "/api/v1/screening/reminders/:reminder_id/dismiss",
            post(dismiss_reminder_handler::<R, J, N>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateSessionRequest {
    pub candidate_id: CandidateId,
    pub job_id: JobId,
    pub questions: Vec<Question>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitAnswerRequest {
    pub question_id: QuestionId,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RecordContextRequest {
    pub text: String,
    #[serde(default)]
    pub salient: bool,
}

fn error_response(error: ScreeningError) -> Response {
    let status = match &error {
        ScreeningError::Session(SessionError::InvalidInput(_))
        | ScreeningError::Session(SessionError::UnknownQuestion(_))
        | ScreeningError::Session(SessionError::IncompleteAnswers(_)) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ScreeningError::Session(SessionError::SessionExpired) => StatusCode::GONE,
        ScreeningError::Session(SessionError::SessionClosed) => StatusCode::CONFLICT,
        ScreeningError::Session(SessionError::Repository(err)) => repository_status(err),
        ScreeningError::Repository(err) => repository_status(err),
        ScreeningError::Scoring(_) => StatusCode::SERVICE_UNAVAILABLE,
    };

    let mut payload = json!({ "error": error.to_string() });
    if let ScreeningError::Session(SessionError::IncompleteAnswers(missing)) = &error {
        payload["missing_question_ids"] = json!(missing
            .iter()
            .map(|id| id.0.clone())
            .collect::<Vec<_>>());
    }

    (status, axum::Json(payload)).into_response()
}

fn repository_status(error: &RepositoryError) -> StatusCode {
    match error {
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Conflict | RepositoryError::VersionConflict => StatusCode::CONFLICT,
        RepositoryError::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(crate) async fn upsert_candidate_handler<R, J, N>(
    State(service): State<Arc<ScreeningService<R, J, N>>>,
    axum::Json(candidate): axum::Json<Candidate>,
) -> Response
where
    R: ScreeningRepository + 'static,
    J: JobDirectory + 'static,
    N: ReminderNotifier + 'static,
{
    match service.upsert_candidate(candidate) {
        Ok(stored) => (StatusCode::OK, axum::Json(stored)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn upsert_job_handler<R, J, N>(
    State(service): State<Arc<ScreeningService<R, J, N>>>,
    axum::Json(job): axum::Json<JobProfile>,
) -> Response
where
    R: ScreeningRepository + 'static,
    J: JobDirectory + 'static,
    N: ReminderNotifier + 'static,
{
    match service.upsert_job(job) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn create_session_handler<R, J, N>(
    State(service): State<Arc<ScreeningService<R, J, N>>>,
    axum::Json(request): axum::Json<CreateSessionRequest>,
) -> Response
where
    R: ScreeningRepository + 'static,
    J: JobDirectory + 'static,
    N: ReminderNotifier + 'static,
{
    let now = Utc::now();
    match service.create_session(request.candidate_id, request.job_id, request.questions, now) {
        Ok(session) => (
            StatusCode::CREATED,
            axum::Json(SessionView::from_session(&session, now)),
        )
            .into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn submit_answer_handler<R, J, N>(
    State(service): State<Arc<ScreeningService<R, J, N>>>,
    Path(session_id): Path<String>,
    axum::Json(request): axum::Json<SubmitAnswerRequest>,
) -> Response
where
    R: ScreeningRepository + 'static,
    J: JobDirectory + 'static,
    N: ReminderNotifier + 'static,
{
    let now = Utc::now();
    match service.submit_answer(
        &SessionId(session_id),
        &request.question_id,
        request.text,
        now,
    ) {
        Ok(session) => (
            StatusCode::OK,
            axum::Json(SessionView::from_session(&session, now)),
        )
            .into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn finalize_handler<R, J, N>(
    State(service): State<Arc<ScreeningService<R, J, N>>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: ScreeningRepository + 'static,
    J: JobDirectory + 'static,
    N: ReminderNotifier + 'static,
{
    match service.finalize_session(&SessionId(session_id), Utc::now()) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn candidate_status_handler<R, J, N>(
    State(service): State<Arc<ScreeningService<R, J, N>>>,
    Path(candidate_id): Path<String>,
) -> Response
where
    R: ScreeningRepository + 'static,
    J: JobDirectory + 'static,
    N: ReminderNotifier + 'static,
{
    match service.candidate_status(&CandidateId(candidate_id), Utc::now()) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn dismiss_reminder_handler<R, J, N>(
    State(service): State<Arc<ScreeningService<R, J, N>>>,
    Path(reminder_id): Path<String>,
) -> Response
where
    R: ScreeningRepository + 'static,
    J: JobDirectory + 'static,
    N: ReminderNotifier + 'static,
{
    match service.dismiss_reminder(&ReminderId(reminder_id)) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn record_context_handler<R, J, N>(
    State(service): State<Arc<ScreeningService<R, J, N>>>,
    Path(session_id): Path<String>,
    axum::Json(request): axum::Json<RecordContextRequest>,
) -> Response
where
    R: ScreeningRepository + 'static,
    J: JobDirectory + 'static,
    N: ReminderNotifier + 'static,
{
    let now = Utc::now();
    let entry = ContextEntry {
        text: request.text,
        salient: request.salient,
        recorded_at: now,
    };
    match service.record_context(&session_id, entry, now) {
        Ok(Some(snapshot)) => (StatusCode::OK, axum::Json(snapshot)).into_response(),
        Ok(None) => StatusCode::ACCEPTED.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn compact_handler<R, J, N>(
    State(service): State<Arc<ScreeningService<R, J, N>>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: ScreeningRepository + 'static,
    J: JobDirectory + 'static,
    N: ReminderNotifier + 'static,
{
    match service.compact_session(&session_id, Utc::now()) {
        Ok(snapshot) => (StatusCode::OK, axum::Json(snapshot)).into_response(),
        Err(error) => error_response(error),
    }
}
