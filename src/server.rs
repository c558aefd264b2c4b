use crate::data::Snapshot;
use crate::error::SolverError;
use crate::feasibility::FeasibilityResult;
use crate::pipeline::{GenerationOutcome, GenerationParams, Timetabler};
use crate::quality::QualityWeights;
use axum::http::StatusCode;
use axum::{Json, Router, routing::post};
use log::{error, info};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;

type ApiError = (StatusCode, Json<Value>);

fn default_exact_budget_ms() -> u64 {
    30_000
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub snapshot: Snapshot,
    #[serde(default)]
    pub params: GenerationParams,
    #[serde(default)]
    pub weights: QualityWeights,
    #[serde(default)]
    pub exact_fallback: bool,
    #[serde(default = "default_exact_budget_ms")]
    pub exact_budget_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Heuristic,
    Exact,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub source: Source,
    #[serde(flatten)]
    pub outcome: GenerationOutcome,
}

fn rejected(err: SolverError) -> ApiError {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({ "error": err.to_string() })),
    )
}

fn internal(message: String) -> ApiError {
    error!("{}", message);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": message })),
    )
}

async fn feasibility_handler(
    Json(snapshot): Json<Snapshot>,
) -> Result<Json<FeasibilityResult>, ApiError> {
    let timetabler = Timetabler::new(snapshot).map_err(rejected)?;
    let result = tokio::task::spawn_blocking(move || timetabler.analyze_feasibility())
        .await
        .map_err(|e| internal(format!("feasibility task failed: {e}")))?;
    Ok(Json(result))
}

async fn generate_handler(
    Json(request): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let timetabler =
        Timetabler::with_weights(request.snapshot, request.weights).map_err(rejected)?;
    let params = request.params;
    let exact_fallback = request.exact_fallback;
    let budget = Duration::from_millis(request.exact_budget_ms);

    let response = tokio::task::spawn_blocking(move || {
        let outcome = timetabler.generate(&params);
        // an aborted run has no validation; the exact model would fail the same way
        if outcome.success || !exact_fallback || outcome.validation.is_none() {
            return GenerateResponse {
                source: Source::Heuristic,
                outcome,
            };
        }
        exact_attempt(&timetabler, outcome, budget)
    })
    .await
    .map_err(|e| internal(format!("generation task failed: {e}")))?;
    Ok(Json(response))
}

#[cfg(feature = "exact")]
fn exact_attempt(
    timetabler: &Timetabler,
    heuristic: GenerationOutcome,
    budget: Duration,
) -> GenerateResponse {
    info!("Heuristic run failed, trying the exact model");
    let exact = timetabler.solve_exact(&crate::exact::HighsExactSolver::default(), budget);
    if exact.success {
        GenerateResponse {
            source: Source::Exact,
            outcome: exact,
        }
    } else {
        GenerateResponse {
            source: Source::Heuristic,
            outcome: heuristic,
        }
    }
}

#[cfg(not(feature = "exact"))]
fn exact_attempt(
    _timetabler: &Timetabler,
    heuristic: GenerationOutcome,
    _budget: Duration,
) -> GenerateResponse {
    log::warn!("Exact fallback requested but this build has no exact solver");
    GenerateResponse {
        source: Source::Heuristic,
        outcome: heuristic,
    }
}

pub fn router() -> Router {
    Router::new()
        .route("/v1/timetable/feasibility", post(feasibility_handler))
        .route("/v1/timetable/generate", post(generate_handler))
}

pub async fn run_server(addr: &str) -> Result<(), SolverError> {
    let server_error = |e: std::io::Error| SolverError::Server {
        addr: addr.to_string(),
        message: e.to_string(),
    };
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(server_error)?;
    info!(
        "Server running at http://{}",
        listener.local_addr().map_err(server_error)?
    );
    axum::serve(listener, router()).await.map_err(server_error)
}
