//! HTTP surface of the stats gateway
//!
//! `GET /api/wakatime` forwards the upstream payload untouched,
//! `GET /api/stats` returns the aggregated report.

use anyhow::Context;
use axum::{
    extract::State,
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::{AppConfig, CredentialSource};
use crate::services::gateway::StatsGateway;
use crate::services::insights::{AchievementRules, StatsReport};
use crate::services::Aggregator;
use crate::types::GatewayError;

/// Shared, read-only request dependencies
pub struct AppState {
    pub gateway: StatsGateway,
    pub credentials: Arc<dyn CredentialSource>,
    pub achievements: AchievementRules,
}

/// Gateway failure rendered as `{error, details?, hint?}` with its status
pub struct ApiError(pub GatewayError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.0.body())).into_response()
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        ApiError(err)
    }
}

/// Routes accept every method so that non-GET requests get the JSON 405 body
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/wakatime", any(wakatime))
        .route("/api/stats", any(stats))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(config: &AppConfig, state: Arc<AppState>) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "wakastats listening");

    axum::serve(listener, router(state))
        .await
        .context("server error")?;
    Ok(())
}

async fn wakatime(State(state): State<Arc<AppState>>, method: Method) -> Response {
    match state.gateway.fetch(&method, state.credentials.as_ref()).await {
        Ok(payload) => (
            [(header::CONTENT_TYPE, "application/json")],
            payload.into_body(),
        )
            .into_response(),
        Err(err) => ApiError(err).into_response(),
    }
}

async fn stats(
    State(state): State<Arc<AppState>>,
    method: Method,
) -> Result<Json<StatsReport>, ApiError> {
    let payload = state
        .gateway
        .fetch(&method, state.credentials.as_ref())
        .await?;
    let week = payload.parse().map_err(|e| GatewayError::Transport {
        details: e.to_string(),
    })?;

    let totals = Aggregator::aggregate(&week);
    Ok(Json(StatsReport::build(&totals, &state.achievements)))
}
