//! Format conversion handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};

use super::parse_uuid;
use crate::services::AvailableFormats;
use crate::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct ConvertRequest {
    /// Pandoc reader; inferred from the attached file's extension if absent.
    #[serde(default)]
    pub from: Option<String>,
    pub to: String,
}

/// POST /convert/:uuid
pub async fn convert_document(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    payload: Result<Json<ConvertRequest>, JsonRejection>,
) -> Result<Json<JsonValue>, ApiError> {
    let Json(request) = payload?;
    let id = parse_uuid(&raw_id)?;
    let output_path = state
        .converter
        .convert_document(id, request.from.as_deref(), &request.to)
        .await?;

    Ok(Json(json!({
        "message": "Conversion complete",
        "uuid": id,
        "output_path": output_path,
    })))
}

/// GET /convert/formats
pub async fn list_formats(
    State(state): State<AppState>,
) -> Result<Json<AvailableFormats>, ApiError> {
    Ok(Json(state.converter.available_formats().await?))
}
