//! folio-api - HTTP and transfer server for folio

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use folio_api::{build_router, AppState, Config};
use folio_core::{DocumentFactory, DocumentStore};
use folio_db::{FilesystemBackend, SqliteDocumentStore};
use folio_transfer::TransferServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with configurable output
    //
    // Environment variables:
    //   LOG_FORMAT  - "json" or "text" (default: "text")
    //   LOG_FILE    - path to log file (optional, enables file logging)
    //   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
    //   RUST_LOG    - standard env filter
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "folio_api=debug,folio_db=info,folio_transfer=info,tower_http=debug".into()
    });

    let registry = tracing_subscriber::registry().with(env_filter);

    let _file_guard = if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("folio-api.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false)); // no ANSI in files by default
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );

    let config = Config::from_env().context("invalid configuration")?;

    let documents = Arc::new(
        SqliteDocumentStore::open(&config.connect_params())
            .await
            .with_context(|| format!("failed to open store at {}", config.db_path.display()))?,
    );
    info!(
        subsystem = "database",
        path = %config.db_path.display(),
        "Document store opened"
    );

    let files = Arc::new(FilesystemBackend::new(&config.storage_path));
    files
        .validate()
        .await
        .with_context(|| format!("storage path {} is unusable", config.storage_path.display()))?;
    info!(
        subsystem = "storage",
        path = %config.storage_path.display(),
        "File storage ready"
    );

    // Transfer server runs alongside the REST server until shutdown.
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let transfer_listener = TcpListener::bind(config.transfer_addr())
        .await
        .with_context(|| format!("cannot bind transfer port {}", config.transfer_addr()))?;
    let transfer_server = Arc::new(TransferServer::new(files.clone()));
    let transfer_task = tokio::spawn(transfer_server.run(transfer_listener, async move {
        let _ = shutdown_rx.changed().await;
    }));

    let state = AppState::new(
        documents.clone(),
        files,
        DocumentFactory::with_builtin_types(),
        config.transfer_client_addr(),
        config.pandoc_path.clone(),
    );
    if !state.converter.is_available().await {
        tracing::warn!(
            pandoc = %config.pandoc_path,
            "pandoc not found, conversion endpoints will fail"
        );
    }
    let app = build_router(state, config.max_upload_bytes);

    let listener = TcpListener::bind(config.rest_addr())
        .await
        .with_context(|| format!("cannot bind REST port {}", config.rest_addr()))?;
    info!("Starting server on {}", config.rest_addr());
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    match transfer_task.await {
        Ok(Err(e)) => tracing::error!(error = %e, "Transfer server stopped with error"),
        Err(e) => tracing::error!(error = %e, "Transfer server task panicked"),
        Ok(Ok(())) => {}
    }
    documents.disconnect().await?;
    info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
