use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::AppState;

/// GET /health
///
/// Reports 503 while the document store is disconnected.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let connected = state.documents.is_connected().await;
    let (status, label) = if connected {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        status,
        Json(serde_json::json!({
            "status": label,
            "version": env!("CARGO_PKG_VERSION"),
            "store": if connected { "connected" } else { "disconnected" },
        })),
    )
}
