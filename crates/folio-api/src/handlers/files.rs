//! File upload and download handlers.
//!
//! Both directions go through the transfer server rather than touching the
//! file store directly, so the REST layer and remote transfer clients share
//! one write path.

use std::io;
use std::path::Path as FsPath;

use axum::body::Body;
use axum::extract::{Multipart, Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::TryStreamExt;
use serde_json::{json, Value as JsonValue};
use tokio_util::io::StreamReader;
use tracing::{info, warn};
use uuid::Uuid;

use folio_core::Metadata;
use folio_transfer::{TransferClient, UploadResponse};

use super::documents::insert_new;
use super::parse_uuid;
use crate::{ApiError, AppState};

struct StoredUpload {
    path: String,
    original_filename: String,
    ack: UploadResponse,
}

#[derive(Default)]
struct UploadForm {
    metadata: Option<String>,
    stored: Option<StoredUpload>,
}

impl UploadForm {
    async fn receive(
        &mut self,
        transfer: &TransferClient,
        multipart: &mut Multipart,
    ) -> Result<(), ApiError> {
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().map(str::to_string);
            match name.as_deref() {
                Some("metadata") => self.metadata = Some(field.text().await?),
                Some("file") => {
                    if self.stored.is_some() {
                        return Err(ApiError::BadRequest(
                            "Only one file may be uploaded per request".to_string(),
                        ));
                    }
                    let original_filename = field.file_name().unwrap_or_default().to_string();
                    let path = unique_storage_name(&original_filename);

                    let reader = StreamReader::new(field.map_err(io::Error::other));
                    tokio::pin!(reader);
                    let ack = transfer.upload(&path, reader).await?;

                    self.stored = Some(StoredUpload {
                        path,
                        original_filename,
                        ack,
                    });
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// New uuid plus the original file's extension.
fn unique_storage_name(original: &str) -> String {
    let id = Uuid::new_v4();
    match extension_of(original) {
        Some(ext) => format!("{}.{}", id, ext),
        None => id.to_string(),
    }
}

fn extension_of(name: &str) -> Option<&str> {
    FsPath::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
}

/// Best-effort removal of a blob whose document could not be created.
async fn discard_blob(state: &AppState, path: &str) {
    if let Err(e) = state.files.delete_file(path).await {
        warn!(
            subsystem = "api",
            op = "upload",
            path = %path,
            error = %e,
            "Failed to remove orphaned upload"
        );
    }
}

/// Create a document for an uploaded file from its `metadata` form field.
async fn attach_document(
    state: &AppState,
    metadata_json: &str,
    upload: &StoredUpload,
) -> Result<Uuid, ApiError> {
    let mut payload: JsonValue = serde_json::from_str(metadata_json)
        .map_err(|e| ApiError::BadRequest(format!("Invalid metadata JSON: {}", e)))?;
    let map = payload
        .as_object_mut()
        .ok_or_else(|| ApiError::BadRequest("metadata must be a JSON object".to_string()))?;
    let has_title = ["Title", "title"]
        .iter()
        .any(|k| map.get(*k).and_then(JsonValue::as_str).is_some_and(|t| !t.is_empty()));
    if !has_title && !upload.original_filename.is_empty() {
        map.insert("Title".to_string(), json!(upload.original_filename));
    }

    let mut doc = state.factory.decode(&payload)?;
    let mut metadata = doc.metadata().clone();
    metadata.path = upload.path.clone();
    metadata.file_type = extension_of(&upload.original_filename)
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default();
    doc.set_metadata(metadata)?;

    insert_new(state, doc).await
}

/// POST /file/upload
///
/// Multipart form with a `file` part and an optional `metadata` part. With
/// metadata, a document pointing at the stored file is created too; if that
/// fails the stored file is removed again.
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<JsonValue>, ApiError> {
    let mut form = UploadForm::default();
    if let Err(e) = form.receive(&state.transfer, &mut multipart).await {
        if let Some(stored) = &form.stored {
            discard_blob(&state, &stored.path).await;
        }
        return Err(e);
    }

    let Some(upload) = form.stored else {
        return Err(ApiError::BadRequest(
            "Invalid file Upload: missing \"file\" field".to_string(),
        ));
    };
    info!(
        subsystem = "api",
        op = "upload",
        path = %upload.path,
        original_filename = %upload.original_filename,
        bytes = upload.ack.bytes_written,
        "File stored"
    );

    let mut body = json!({
        "message": upload.ack.message,
        "file_path": upload.path,
        "original_filename": upload.original_filename,
    });

    if let Some(metadata_json) = form.metadata.as_deref().filter(|m| !m.trim().is_empty()) {
        match attach_document(&state, metadata_json, &upload).await {
            Ok(id) => body["document_uuid"] = json!(id),
            Err(e) => {
                discard_blob(&state, &upload.path).await;
                return Err(e);
            }
        }
    }

    Ok(Json(body))
}

/// Name offered to the browser: the title (with the file's extension) when
/// set, otherwise the stored file name.
fn download_filename(metadata: &Metadata) -> String {
    let stored_name = FsPath::new(&metadata.path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(&metadata.path);

    let name = if metadata.title.is_empty() {
        stored_name.to_string()
    } else {
        match extension_of(stored_name) {
            Some(ext) if extension_of(&metadata.title).is_none() => {
                format!("{}.{}", metadata.title, ext)
            }
            _ => metadata.title.clone(),
        }
    };

    name.chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// GET /file/download/:uuid
pub async fn download_file(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_uuid(&raw_id)?;
    let metadata = state.documents.read_metadata(id).await?;
    if metadata.path.is_empty() {
        return Err(ApiError::NotFound(
            "File path not found in document metadata".to_string(),
        ));
    }

    let stream = state.transfer.download(&metadata.path).await?;
    info!(
        subsystem = "api",
        op = "download",
        doc_id = %id,
        path = %metadata.path,
        "Streaming file"
    );

    let headers = [
        (header::CONTENT_TYPE, "application/octet-stream".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", download_filename(&metadata)),
        ),
    ];
    Ok((headers, Body::from_stream(stream)).into_response())
}
