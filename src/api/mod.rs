use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::{Json, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::catalog::Catalog;
use crate::core::{
    SimulationKind, SimulationOutcome, SimulationParameters, ValidationError, compute_simulation,
};
use crate::progression::{
    CompletionEvent, LevelProgress, ProgressionError, ProgressionEvent, ProgressionState,
    apply_completion,
};

type SharedCatalog = Arc<Catalog>;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, PartialEq)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

impl From<ProgressionError> for ApiError {
    fn from(err: ProgressionError) -> Self {
        let status = match err {
            ProgressionError::InvalidScore(_) => StatusCode::BAD_REQUEST,
            ProgressionError::OutOfOrderEvent { .. } | ProgressionError::InvariantViolation(_) => {
                StatusCode::CONFLICT
            }
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        warn!(status = %self.status, error = %self.message, "request rejected");
        error_response(self.status, &self.message)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResponse {
    simulation: SimulationKind,
    /// Whole-number score to submit with the completion event.
    score: u8,
    result: SimulationOutcome,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompletePayload {
    /// Missing for a learner with no progress yet.
    #[serde(default)]
    state: Option<ProgressionState>,
    event: CompletionEvent,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompleteResponse {
    state: ProgressionState,
    level: LevelProgress,
    events: Vec<ProgressionEvent>,
}

pub fn router(catalog: SharedCatalog) -> Router {
    Router::new()
        .route("/api/catalog", get(catalog_handler))
        .route("/api/simulations", post(simulations_handler))
        .route("/api/progress/complete", post(complete_handler))
        .fallback(not_found_handler)
        .with_state(catalog)
}

pub async fn run_http_server(port: u16, catalog: Catalog) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = router(Arc::new(catalog));

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "finquest API listening");

    axum::serve(listener, app).await
}

async fn catalog_handler(State(catalog): State<SharedCatalog>) -> Response {
    json_response(StatusCode::OK, catalog.as_ref())
}

async fn simulations_handler(State(catalog): State<SharedCatalog>, body: String) -> Response {
    match simulate_from_json(&catalog, &body) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(err) => err.into_response(),
    }
}

async fn complete_handler(State(catalog): State<SharedCatalog>, body: String) -> Response {
    match complete_from_json(&catalog, &body) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(err) => err.into_response(),
    }
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

fn simulate_from_json(catalog: &Catalog, json: &str) -> Result<SimulateResponse, ApiError> {
    let parameters = serde_json::from_str::<SimulationParameters>(json)
        .map_err(|e| ApiError::bad_request(format!("Invalid simulation payload: {e}")))?;
    let result = compute_simulation(catalog, &parameters)?;
    Ok(SimulateResponse {
        simulation: parameters.kind(),
        score: result.completion_score(),
        result,
    })
}

fn complete_from_json(catalog: &Catalog, json: &str) -> Result<CompleteResponse, ApiError> {
    let payload = serde_json::from_str::<CompletePayload>(json)
        .map_err(|e| ApiError::bad_request(format!("Invalid completion payload: {e}")))?;
    let state = payload.state.unwrap_or_default();
    let (state, events) = apply_completion(catalog, &state, &payload.event)?;
    Ok(CompleteResponse {
        level: state.level_progress(catalog),
        state,
        events,
    })
}
