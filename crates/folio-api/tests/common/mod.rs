//! Shared harness for router tests.
//!
//! Each [`TestApp`] owns a scratch store, a transfer server and an HTTP
//! server, both on loopback ports, and a client pointed at the latter.

#![allow(dead_code)]

use std::sync::Arc;

use reqwest::header::HeaderMap;
use reqwest::multipart::{Form, Part};
use reqwest::{Method, StatusCode};
use serde_json::Value as JsonValue;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use folio_api::{build_router, AppState};
use folio_core::DocumentFactory;
use folio_db::test_fixtures::TestStore;
use folio_transfer::TransferServer;

pub struct TestApp {
    pub base_url: String,
    pub client: reqwest::Client,
    pub store: TestStore,
    _transfer_shutdown: oneshot::Sender<()>,
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl Reply {
    pub fn json(&self) -> JsonValue {
        serde_json::from_slice(&self.body).expect("response body is not JSON")
    }
}

impl TestApp {
    pub async fn new() -> Self {
        let store = TestStore::new().await;

        let transfer_listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind transfer port");
        let transfer_addr = transfer_listener.local_addr().unwrap().to_string();
        let (tx, rx) = oneshot::channel::<()>();
        let server = Arc::new(TransferServer::new(store.files.clone()));
        tokio::spawn(server.run(transfer_listener, async move {
            let _ = rx.await;
        }));

        let state = AppState::new(
            store.documents.clone(),
            store.files.clone(),
            DocumentFactory::with_builtin_types(),
            transfer_addr,
            "pandoc",
        );
        let router = build_router(state, 16 * 1024 * 1024);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind HTTP port");
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            store,
            _transfer_shutdown: tx,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn finish(response: reqwest::Response) -> Reply {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .expect("Failed to read body")
            .to_vec();
        Reply {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, path: &str) -> Reply {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("request failed");
        Self::finish(response).await
    }

    pub async fn send_json(&self, method: Method, path: &str, body: JsonValue) -> Reply {
        let response = self
            .client
            .request(method, self.url(path))
            .json(&body)
            .send()
            .await
            .expect("request failed");
        Self::finish(response).await
    }

    pub async fn send_raw(&self, method: Method, path: &str, content_type: &str, body: &str) -> Reply {
        let response = self
            .client
            .request(method, self.url(path))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body.to_string())
            .send()
            .await
            .expect("request failed");
        Self::finish(response).await
    }

    pub async fn upload(&self, form: Form) -> Reply {
        let response = self
            .client
            .post(self.url("/file/upload"))
            .multipart(form)
            .send()
            .await
            .expect("request failed");
        Self::finish(response).await
    }

    /// Create a document and return its id.
    pub async fn create(&self, payload: JsonValue) -> String {
        let reply = self.send_json(Method::POST, "/data/create", payload).await;
        assert_eq!(reply.status, StatusCode::OK, "create failed: {:?}", reply.json());
        reply.json()["UUID"].as_str().unwrap().to_string()
    }

    /// Stored metadata of a document, parsed from the read endpoint.
    pub async fn read_metadata(&self, id: &str) -> JsonValue {
        let reply = self.get(&format!("/data/read/{}", id)).await;
        assert_eq!(reply.status, StatusCode::OK);
        let raw = reply.json()["value"].as_str().unwrap().to_string();
        serde_json::from_str(&raw).unwrap()
    }

    /// Regular files currently in the file store, excluding dotfiles.
    pub fn stored_files(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(self.store.storage_root()) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|n| !n.starts_with('.'))
            .collect();
        names.sort();
        names
    }
}

/// A `file` form part.
pub fn file_part(filename: &str, data: &[u8]) -> Part {
    Part::bytes(data.to_vec()).file_name(filename.to_string())
}
