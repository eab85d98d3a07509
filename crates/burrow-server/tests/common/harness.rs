//! Test server harness for API integration tests.
//!
//! Provides a `TestServer` that runs a burrow server over a temporary store
//! on a random port, along with HTTP convenience methods.

#![allow(dead_code)]

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use burrow_core::StoreConfig;
use burrow_server::{ApiServer, AppState};
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use tempfile::TempDir;

/// Test server with HTTP client and automatic cleanup.
pub struct TestServer {
    server: ApiServer,
    client: Client,
    pub base_url: String,
    temp_dir: TempDir,
}

impl TestServer {
    /// Start a server over an empty temporary store.
    pub async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    /// Start a server after adjusting the default config.
    pub async fn start_with(adjust: impl FnOnce(&mut StoreConfig)) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut config = StoreConfig::new(temp_dir.path().join("store"));
        config.port = 0;
        adjust(&mut config);

        let state = AppState::from_config(&config).expect("Failed to open store");
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0);
        let server = ApiServer::start_with_state(state, addr)
            .await
            .expect("Failed to start API server");
        let base_url = server.url();

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        let test_server = Self {
            server,
            client,
            base_url,
            temp_dir,
        };
        test_server.wait_ready().await;
        test_server
    }

    async fn wait_ready(&self) {
        for _ in 0..50 {
            if let Ok(resp) = self.client.get(self.url("/folder-tree")).send().await {
                if resp.status().is_success() {
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        panic!("Server did not become ready in time");
    }

    /// Build a full URL from a path.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Absolute location of the store on disk.
    pub fn store(&self) -> PathBuf {
        self.temp_dir
            .path()
            .join("store")
            .canonicalize()
            .expect("store exists")
    }

    /// Write a file straight into the store.
    pub fn seed_file(&self, relative: &str, contents: &[u8]) {
        let path = self.store().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent");
        }
        std::fs::write(path, contents).expect("Failed to seed file");
    }

    /// Create a folder straight in the store.
    pub fn seed_folder(&self, relative: &str) {
        std::fs::create_dir_all(self.store().join(relative)).expect("Failed to seed folder");
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.store().join(relative).exists()
    }

    pub fn read(&self, relative: &str) -> Vec<u8> {
        std::fs::read(self.store().join(relative)).expect("Failed to read store file")
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    // ========== HTTP Convenience Methods ==========

    /// GET with query parameters.
    pub async fn get(&self, path: &str, query: &[(&str, &str)]) -> Response {
        self.client
            .get(self.url(path))
            .query(query)
            .send()
            .await
            .expect("GET request failed")
    }

    /// POST a JSON body.
    pub async fn post(&self, path: &str, body: Value) -> Response {
        self.client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .expect("POST request failed")
    }

    /// POST a JSON body and assert the expected status.
    pub async fn post_expect(&self, path: &str, body: Value, expected: StatusCode) -> Response {
        let resp = self.post(path, body).await;
        let status = resp.status();
        assert_eq!(status, expected, "POST {path} returned {status}");
        resp
    }

    /// Names in a listing, in server order.
    pub async fn list_names(&self, path: &str) -> Vec<String> {
        let resp = self.get("/files", &[("path", path)]).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let entries: Vec<Value> = resp.json().await.expect("listing is JSON");
        entries
            .iter()
            .map(|e| e["name"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    pub async fn stop(self) {
        self.server.stop().await;
    }
}

/// Message of a JSON error response.
pub async fn error_message(resp: Response) -> String {
    let body: Value = resp.json().await.expect("error body is JSON");
    body["message"].as_str().unwrap_or_default().to_string()
}

/// Write a scratch file outside the store.
pub fn local_file(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("Failed to write local file");
    path
}
