//! # folio-api
//!
//! HTTP surface for folio: document CRUD and search, file upload/download
//! through the transfer server, and pandoc-backed format conversion.

pub mod config;
pub mod error;
pub mod handlers;
pub mod services;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

use folio_core::{DocumentFactory, DocumentStore, FileStore};
use folio_transfer::TransferClient;

pub use config::Config;
pub use error::ApiError;
use handlers::{convert, documents, files, health};
use services::PandocConverter;

// =============================================================================
// REQUEST ID (UUIDv7)
// =============================================================================

/// Generates time-ordered UUIDv7 request correlation IDs.
#[derive(Clone, Default)]
pub struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub documents: Arc<dyn DocumentStore>,
    pub files: Arc<dyn FileStore>,
    pub factory: Arc<DocumentFactory>,
    /// Client for this process's own transfer server.
    pub transfer: TransferClient,
    pub converter: Arc<PandocConverter>,
}

impl AppState {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        files: Arc<dyn FileStore>,
        factory: DocumentFactory,
        transfer_addr: impl Into<String>,
        pandoc_path: impl Into<String>,
    ) -> Self {
        let converter = PandocConverter::new(pandoc_path, documents.clone(), files.clone());
        Self {
            documents,
            files,
            factory: Arc::new(factory),
            transfer: TransferClient::new(transfer_addr),
            converter: Arc::new(converter),
        }
    }
}

/// Build the HTTP router with its middleware stack.
pub fn build_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/data/create", post(documents::create_document))
        .route("/data/read/:uuid", get(documents::read_document))
        .route("/data/update", put(documents::update_document))
        .route("/data/search", get(documents::search_documents))
        .route("/data/delete", delete(documents::delete_documents))
        .route("/file/upload", post(files::upload_file))
        .route("/file/download/:uuid", get(files::download_file))
        .route("/convert/formats", get(convert::list_formats))
        .route("/convert/:uuid", post(convert::convert_document))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .with_state(state)
}
