//! Axum JSON API over the lead service.
//!
//! Thin routing only: handlers deserialize the request, call one service
//! operation, and serialize the result. Store failures become a generic 500.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use samscout_leads::{service_from_env, LeadService};
use serde::Deserialize;
use tokio::net::TcpListener;

pub const CRATE_NAME: &str = "samscout-web";

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<LeadService>,
}

impl AppState {
    pub fn new(service: Arc<LeadService>) -> Self {
        Self { service }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProbeBody {
    lead_id: String,
}

#[derive(Debug, Deserialize)]
struct SearchBody {
    term: String,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/pack", get(pack_handler))
        .route("/probe", post(probe_handler))
        .route("/probe/verbose", post(probe_verbose_handler))
        .route("/search", post(search_handler))
        .route("/sam/test-live", get(test_live_handler))
        .route("/sam/nd-it", get(industry_handler))
        .route("/sam/import", post(import_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Bind from the environment, seed the store, and serve until shutdown.
pub async fn serve_from_env() -> anyhow::Result<()> {
    let port: u16 = std::env::var("SAMSCOUT_WEB_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let service = service_from_env().await?;
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    axum::serve(listener, app(AppState::new(service))).await?;
    Ok(())
}

async fn index_handler() -> Response {
    Json(serde_json::json!({
        "message": "SAM small-business lead acquisition API"
    }))
    .into_response()
}

async fn pack_handler(State(state): State<AppState>) -> Response {
    match state.service.pack_leads().await {
        Ok(pack) => Json(pack).into_response(),
        Err(err) => server_error(err),
    }
}

async fn probe_handler(State(state): State<AppState>, Json(body): Json<ProbeBody>) -> Response {
    match state.service.probe(&body.lead_id).await {
        Ok(result) => Json(result).into_response(),
        Err(err) => server_error(err),
    }
}

async fn probe_verbose_handler(
    State(state): State<AppState>,
    Json(body): Json<ProbeBody>,
) -> Response {
    match state.service.probe_verbose(&body.lead_id).await {
        Ok(result) => Json(result).into_response(),
        Err(err) => server_error(err),
    }
}

async fn search_handler(State(state): State<AppState>, Json(body): Json<SearchBody>) -> Response {
    match state.service.search_leads(&body.term).await {
        Ok(found) => Json(found).into_response(),
        Err(err) => server_error(err),
    }
}

async fn test_live_handler(State(state): State<AppState>) -> Response {
    Json(state.service.test_live_search().await).into_response()
}

async fn industry_handler(State(state): State<AppState>) -> Response {
    Json(state.service.industry_contracts().await).into_response()
}

async fn import_handler(State(state): State<AppState>) -> Response {
    match state.service.reconcile_from_registry().await {
        Ok(report) => Json(report).into_response(),
        Err(err) => server_error(err),
    }
}

async fn health_handler(State(state): State<AppState>) -> Response {
    Json(state.service.health().await).into_response()
}

fn server_error(err: anyhow::Error) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": err.to_string() })),
    )
        .into_response()
}
