use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tracing::{info, warn};

use super::breakdown::{breakdown_request, ServerError};
use super::models::{BreakdownRequest, ErrorResponse};
use super::state::ServerState;
use crate::analyzer::Analyzer;
use crate::breakdown::{BreakdownError, OrderedBreakdown};
use crate::providers::{self, OpenAI};
use crate::settings;

pub async fn run_server(settings: settings::Settings, addr: String) -> Result<()> {
    let gateway = OpenAI::from_settings(providers::resolve_key(), &settings);
    if !gateway.has_key() {
        warn!("OPENAI_API_KEY is not set; breakdown requests will fail until it is configured");
    }
    let state = Arc::new(ServerState {
        analyzer: Analyzer::new(Arc::new(gateway), settings),
    });
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind server address: {}", addr))?;
    info!("listening on {}", addr);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/grammar-breakdown", post(grammar_breakdown))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn grammar_breakdown(
    State(state): State<Arc<ServerState>>,
    payload: Result<Json<BreakdownRequest>, JsonRejection>,
) -> Result<Json<OrderedBreakdown>, (StatusCode, Json<ErrorResponse>)> {
    let result = match payload {
        Ok(Json(request)) => breakdown_request(state.as_ref(), request).await,
        Err(rejection) => {
            warn!("rejected request body: {}", rejection.body_text());
            Err(ServerError::from(BreakdownError::Validation))
        }
    };

    match result {
        Ok(breakdown) => Ok(Json(breakdown)),
        Err(err) => {
            let (status, body) = err.into_body();
            Err((status, Json(body)))
        }
    }
}
