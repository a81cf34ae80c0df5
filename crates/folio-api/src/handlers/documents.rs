//! Document CRUD and search handlers.
//!
//! Payloads are untyped JSON objects; the registered document factory picks
//! the variant from their `DocType` and merges the remaining fields.

use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use tracing::{debug, info, warn};
use uuid::Uuid;

use folio_core::{defaults, Document, Page, PageRequest};

use super::parse_uuid;
use crate::{ApiError, AppState};

/// Assign a fresh id and creation timestamp, then persist.
pub(crate) async fn insert_new(
    state: &AppState,
    mut doc: Box<dyn Document>,
) -> Result<Uuid, ApiError> {
    let id = Uuid::new_v4();
    let mut metadata = doc.metadata().clone();
    metadata.id = Some(id);
    metadata.touch();
    doc.set_metadata(metadata)?;

    state.documents.create(doc.as_ref()).await?;
    info!(
        subsystem = "api",
        op = "create",
        doc_id = %id,
        doc_type = %doc.doc_type(),
        "Document created"
    );
    Ok(id)
}

/// POST /data/create
pub async fn create_document(
    State(state): State<AppState>,
    payload: Result<Json<JsonValue>, JsonRejection>,
) -> Result<Json<JsonValue>, ApiError> {
    let Json(payload) = payload?;
    let doc = state.factory.decode(&payload)?;
    let id = insert_new(&state, doc).await?;

    Ok(Json(json!({
        "message": "Document inserted into DB",
        "UUID": id,
    })))
}

/// GET /data/read/:uuid
pub async fn read_document(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<JsonValue>, ApiError> {
    let id = parse_uuid(&raw_id)?;
    let raw = state.documents.read_raw(id).await?;

    Ok(Json(json!({
        "message": "document retrieved",
        "value": String::from_utf8_lossy(&raw),
    })))
}

/// PUT /data/update
///
/// The payload replaces the stored record wholesale; fields it omits are
/// reset.
pub async fn update_document(
    State(state): State<AppState>,
    payload: Result<Json<JsonValue>, JsonRejection>,
) -> Result<Json<JsonValue>, ApiError> {
    let Json(payload) = payload?;
    let id = payload
        .get("Uuid")
        .or_else(|| payload.get("uuid"))
        .and_then(JsonValue::as_str)
        .ok_or_else(|| ApiError::BadRequest("Missing or invalid Uuid".to_string()))
        .and_then(parse_uuid)?;

    let mut doc = state.factory.decode(&payload)?;
    let mut metadata = doc.metadata().clone();
    metadata.id = Some(id);
    metadata.touch();
    doc.set_metadata(metadata)?;

    state.documents.update(doc.as_ref()).await?;
    info!(subsystem = "api", op = "update", doc_id = %id, "Document updated");

    Ok(Json(json!({
        "message": "update successful",
        "value": id,
    })))
}

/// Query parameters for key/value search.
///
/// `page` and `limit` stay textual so malformed values get a specific
/// message instead of a generic query rejection.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub key: Option<String>,
    pub value: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl SearchQuery {
    fn page_request(&self) -> Result<PageRequest, ApiError> {
        let page = match non_empty(&self.page) {
            Some(raw) => raw
                .parse::<usize>()
                .ok()
                .filter(|p| *p >= 1)
                .ok_or_else(|| {
                    ApiError::BadRequest(
                        "Invalid page parameter. Must be a positive integer.".to_string(),
                    )
                })?,
            None => defaults::PAGE,
        };
        let limit = match non_empty(&self.limit) {
            Some(raw) => raw
                .parse::<usize>()
                .ok()
                .filter(|l| (1..=defaults::PAGE_LIMIT_MAX).contains(l))
                .ok_or_else(|| {
                    ApiError::BadRequest(format!(
                        "Invalid limit parameter. Must be between 1 and {}.",
                        defaults::PAGE_LIMIT_MAX
                    ))
                })?,
            None => defaults::PAGE_LIMIT,
        };
        Ok(PageRequest::new(page, limit)?)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// GET /data/search
pub async fn search_documents(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<JsonValue>, ApiError> {
    let key = non_empty(&query.key)
        .ok_or_else(|| ApiError::BadRequest("Missing key parameter".to_string()))?
        .to_string();
    let value = query.value.clone().unwrap_or_default();
    let request = query.page_request()?;

    let start = Instant::now();
    let hits = state.documents.search_by_key_value(&key, &value).await?;
    let page = Page::paginate(hits, request);
    debug!(
        subsystem = "api",
        op = "search",
        key = %key,
        result_count = page.total_count,
        duration_ms = start.elapsed().as_millis() as u64,
        "Search completed"
    );

    Ok(Json(json!({
        "message": "Search completed",
        "count": page.results.len(),
        "total_count": page.total_count,
        "page": page.page,
        "limit": page.limit,
        "total_pages": page.total_pages,
        "has_next": page.has_next,
        "has_prev": page.has_prev,
        "results": page.results,
    })))
}

#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    pub uuids: Vec<String>,
}

/// DELETE /data/delete
///
/// Each id is handled independently; one failure never aborts the batch.
/// Records with an attached file lose the file too.
pub async fn delete_documents(
    State(state): State<AppState>,
    payload: Result<Json<DeleteRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload
        .map_err(|_| ApiError::BadRequest("Missing or invalid 'uuids' parameter.".to_string()))?;
    if request.uuids.is_empty() {
        return Err(ApiError::BadRequest(
            "At least one UUID is required".to_string(),
        ));
    }

    let mut deleted = Vec::new();
    let mut errors = Vec::new();
    for raw_id in &request.uuids {
        match delete_one(&state, raw_id).await {
            Ok(()) => deleted.push(raw_id.clone()),
            Err(e) => {
                debug!(subsystem = "api", op = "delete", doc_id = %raw_id, error = %e, "Delete failed");
                errors.push(format!("{}: {}", raw_id, e));
            }
        }
    }

    let mut body = json!({
        "deleted_count": deleted.len(),
        "deleted_uuids": deleted,
    });
    if !errors.is_empty() {
        body["error_count"] = json!(errors.len());
        body["errors"] = json!(errors);
    }
    let status = if deleted.is_empty() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::OK
    };
    Ok((status, Json(body)).into_response())
}

async fn delete_one(state: &AppState, raw_id: &str) -> folio_core::Result<()> {
    let id = Uuid::parse_str(raw_id.trim())?;
    let metadata = state.documents.read_metadata(id).await?;
    if !metadata.path.is_empty() {
        if let Err(e) = state.files.delete_file(&metadata.path).await {
            warn!(
                subsystem = "api",
                op = "delete",
                doc_id = %id,
                path = %metadata.path,
                error = %e,
                "Attached file could not be removed"
            );
        }
    }
    state.documents.delete(id).await?;
    info!(subsystem = "api", op = "delete", doc_id = %id, "Document deleted");
    Ok(())
}
