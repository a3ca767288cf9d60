//! Minimal HTTP surface: a liveness probe and the detection submission
//! endpoint an external selcall detector posts a decoded code to.

use alarm_common::DispatchError;
use alarm_gateway::GatewaysManager;
use alarm_routing::ToneCode;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn build_router(manager: Arc<GatewaysManager>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/v1/detections", post(submit_detection))
        .layer(TraceLayer::new_for_http())
        .with_state(manager)
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug, Deserialize)]
struct DetectionRequest {
    code: String,
    event_time_utc: DateTime<Utc>,
    #[serde(default)]
    is_real_alarm: bool,
}

#[derive(Debug, Serialize)]
struct DetectionResponse {
    accepted: bool,
}

async fn submit_detection(
    State(manager): State<Arc<GatewaysManager>>,
    Json(request): Json<DetectionRequest>,
) -> Result<Json<DetectionResponse>, (StatusCode, String)> {
    let code = ToneCode::from_str(&request.code).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    manager
        .send(&code, request.event_time_utc, request.is_real_alarm, None)
        .map_err(|e| match e {
            DispatchError::Routing(_) => (StatusCode::NOT_FOUND, e.to_string()),
            DispatchError::UnknownGateway(_) => (StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
        })?;

    Ok(Json(DetectionResponse { accepted: true }))
}
