//! HTTP surface of the weather gateway.
//!
//! # Endpoints
//! - `GET /` - welcome message
//! - `GET /health` - liveness probe
//! - `GET /weather/?location=<place>` - current weather for a place

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, warn};
use weather_gateway_core::{ErrorKind, FormattedResponse, WeatherError, WeatherResolver};

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub resolver: Arc<WeatherResolver>,
}

#[derive(Debug, Deserialize)]
pub struct WeatherParams {
    pub location: Option<String>,
}

/// Error body returned to HTTP clients: `{"detail": ..., "kind": ...}`.
#[derive(Debug)]
pub struct ApiError(pub WeatherError);

impl From<WeatherError> for ApiError {
    fn from(err: WeatherError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        match self.0.kind() {
            ErrorKind::Internal => error!(error = %self.0, "request failed"),
            ErrorKind::UpstreamUnavailable | ErrorKind::UpstreamError => {
                warn!(error = %self.0, "upstream failure")
            }
            _ => {}
        }

        let body = json!({ "detail": self.0.to_string(), "kind": self.0.kind().as_str() });
        (status, Json(body)).into_response()
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/weather", get(weather))
        .route("/weather/", get(weather))
        .with_state(state)
}

async fn root() -> impl IntoResponse {
    Json(json!({ "message": "Welcome to the Weather API" }))
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn weather(
    State(state): State<AppState>,
    Query(params): Query<WeatherParams>,
) -> Result<Json<FormattedResponse>, ApiError> {
    let location = params.location.ok_or_else(|| {
        WeatherError::InvalidInput("query parameter `location` is required".to_string())
    })?;

    let response = state.resolver.resolve(&location).await?;
    Ok(Json(response))
}
