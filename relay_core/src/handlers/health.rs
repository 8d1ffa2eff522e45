//! Liveness probe

use axum::{response::IntoResponse, Json};
use tracing::debug;

pub async fn handle_health() -> impl IntoResponse {
    debug!("GET /health");

    Json(serde_json::json!({
        "status": "OK",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
