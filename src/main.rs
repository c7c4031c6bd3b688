use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusHandle;
use nexus_screening::config::AppConfig;
use nexus_screening::error::AppError;
use nexus_screening::screening::{
    screening_router, Candidate, CandidateId, ContextEntry, JobId, JobProfile, LogNotifier,
    MemoryStore, Question, QuestionId, QuestionKind, ScreeningConfig, ScreeningService,
};
use nexus_screening::telemetry;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

type Service = ScreeningService<MemoryStore, MemoryStore, LogNotifier>;

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
}

#[derive(Parser, Debug)]
#[command(
    name = "Nexus Screening",
    about = "Run the candidate screening service from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Walk one candidate through a scripted screening and print the results
    Demo,
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Demo => run_demo(),
    }
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let service = build_service(config.screening.clone());
    spawn_sweeps(service.clone(), &config);

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
    };

    let app = Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
        .merge(screening_router(service))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "candidate screening service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

fn build_service(config: ScreeningConfig) -> Arc<Service> {
    let store = Arc::new(MemoryStore::default());
    Arc::new(ScreeningService::new(
        store.clone(),
        store,
        Arc::new(LogNotifier),
        config,
    ))
}

/// Background timers: reminder delivery, context compaction, and scoring
/// retry, each on its own cadence.
fn spawn_sweeps(service: Arc<Service>, config: &AppConfig) {
    let cadence = config.sweep;

    let reminders = service.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(cadence.reminder_secs));
        loop {
            ticker.tick().await;
            match reminders.reminder_sweep(Utc::now()) {
                Ok(report) if report.delivered + report.failed + report.exhausted > 0 => {
                    info!(
                        delivered = report.delivered,
                        failed = report.failed,
                        exhausted = report.exhausted,
                        "reminder sweep finished"
                    );
                }
                Ok(_) => {}
                Err(err) => warn!(error = %err, "reminder sweep failed"),
            }
        }
    });

    let compaction = service.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(cadence.compaction_secs));
        loop {
            ticker.tick().await;
            match compaction.compaction_sweep(Utc::now()) {
                Ok(report) if report.compacted > 0 => {
                    info!(compacted = report.compacted, "compaction sweep finished");
                }
                Ok(_) => {}
                Err(err) => warn!(error = %err, "compaction sweep failed"),
            }
        }
    });

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(cadence.rescore_secs));
        loop {
            ticker.tick().await;
            match service.rescore_sweep(Utc::now()) {
                Ok(report) if report.scored > 0 => {
                    info!(scored = report.scored, "rescore sweep finished");
                }
                Ok(_) => {}
                Err(err) => warn!(error = %err, "rescore sweep failed"),
            }
        }
    });
}

fn run_demo() -> Result<(), AppError> {
    let service = build_service(ScreeningConfig::default());
    let now = Utc::now();

    service
        .upsert_job(JobProfile {
            id: JobId("job-backend".to_string()),
            title: "Backend Engineer".to_string(),
            description: "Own the ingestion pipeline".to_string(),
            required_skills: vec![
                "rust".to_string(),
                "postgres".to_string(),
                "kubernetes".to_string(),
            ],
            market_salary: Some(140_000.0),
        })
        .map_err(demo_error)?;

    service
        .upsert_candidate(Candidate {
            id: CandidateId("cand-demo".to_string()),
            name: "Jordan Alvarez".to_string(),
            email: "jordan@example.com".to_string(),
            phone: None,
            current_title: Some("Software Engineer".to_string()),
            skills: vec!["rust".to_string(), "postgres".to_string()],
            resume_text: "Five years building data services".to_string(),
            salary_ask: Some(150_000.0),
            email_verified: true,
            assessment: None,
            version: 0,
        })
        .map_err(demo_error)?;

    let questions = vec![
        Question {
            id: QuestionId("q1".to_string()),
            prompt: "How do you keep a queue consumer idempotent?".to_string(),
            kind: QuestionKind::OpenText,
            options: Vec::new(),
            ideal_answer: Some("dedupe keys idempotency tokens retries".to_string()),
            cultural: false,
        },
        Question {
            id: QuestionId("q2".to_string()),
            prompt: "Describe a time you disagreed with a teammate.".to_string(),
            kind: QuestionKind::OpenText,
            options: Vec::new(),
            ideal_answer: None,
            cultural: true,
        },
    ];

    let session = service
        .create_session(
            CandidateId("cand-demo".to_string()),
            JobId("job-backend".to_string()),
            questions,
            now,
        )
        .map_err(demo_error)?;
    let session_id = session.id.clone();
    println!("session created: {}", session.screening_url);

    service
        .submit_answer(
            &session_id,
            &QuestionId("q1".to_string()),
            "I key every message with a dedupe token so retries collapse into one \
             effect, and keep idempotency checks in the consumer itself."
                .to_string(),
            now,
        )
        .map_err(demo_error)?;
    service
        .submit_answer(
            &session_id,
            &QuestionId("q2".to_string()),
            "We disagreed on schema ownership, so I set up a short session to \
             collaborate on the tradeoffs and we shipped a shared design."
                .to_string(),
            now,
        )
        .map_err(demo_error)?;

    let outcome = service.finalize_session(&session_id, now).map_err(demo_error)?;
    println!(
        "finalize outcome:\n{}",
        serde_json::to_string_pretty(&outcome).map_err(demo_json_error)?
    );

    for turn in 0..3 {
        service
            .record_context(
                &session_id.0,
                ContextEntry {
                    text: format!("candidate clarified deployment history, turn {turn}"),
                    salient: turn == 0,
                    recorded_at: now,
                },
                now,
            )
            .map_err(demo_error)?;
    }
    let snapshot = service.compact_session(&session_id.0, now).map_err(demo_error)?;
    println!(
        "memory snapshot:\n{}",
        serde_json::to_string_pretty(&snapshot).map_err(demo_json_error)?
    );

    let status = service
        .candidate_status(&CandidateId("cand-demo".to_string()), now)
        .map_err(demo_error)?;
    println!(
        "candidate status:\n{}",
        serde_json::to_string_pretty(&status).map_err(demo_json_error)?
    );

    Ok(())
}

fn demo_error(err: nexus_screening::screening::ScreeningError) -> AppError {
    AppError::Io(std::io::Error::new(std::io::ErrorKind::Other, err.to_string()))
}

fn demo_json_error(err: serde_json::Error) -> AppError {
    AppError::Io(std::io::Error::new(std::io::ErrorKind::Other, err.to_string()))
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
