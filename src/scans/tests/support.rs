//! Shared fixtures for the scan service test suites

use crate::app::config::ServiceConfig;
use crate::client::api::InMemoryScanClient;
use crate::scans::api::{
    LaunchRequest, ScanService, ScanType, WebhookError, WebhookResult, WebhookTransport,
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

pub const WEBHOOK_URL: &str = "https://hooks.example.com/scans";
pub const PORTAL_URL: &str = "https://portal.example.com";

/// Webhook transport that keeps every posted body
pub struct RecordingTransport {
    status: u16,
    posts: Mutex<Vec<(String, serde_json::Value)>>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Self::responding(200)
    }

    pub fn responding(status: u16) -> Arc<Self> {
        Arc::new(Self {
            status,
            posts: Mutex::new(Vec::new()),
        })
    }

    pub fn posts(&self) -> Vec<(String, serde_json::Value)> {
        self.posts.lock().unwrap().clone()
    }
}

#[async_trait]
impl WebhookTransport for RecordingTransport {
    async fn post_json(&self, url: &str, body: String) -> WebhookResult<u16> {
        let value = serde_json::from_str(&body).map_err(|e| WebhookError::Serialize {
            message: e.to_string(),
        })?;
        self.posts.lock().unwrap().push((url.to_string(), value));
        Ok(self.status)
    }
}

/// Webhook transport that panics on use
pub struct PanickingTransport;

#[async_trait]
impl WebhookTransport for PanickingTransport {
    async fn post_json(&self, _url: &str, _body: String) -> WebhookResult<u16> {
        panic!("transport exploded");
    }
}

pub fn config(webhook_url: Option<&str>) -> ServiceConfig {
    ServiceConfig {
        webhook_url: webhook_url.map(str::to_string),
        portal_url: PORTAL_URL.to_string(),
        ..ServiceConfig::default()
    }
}

pub fn service(
    client: &Arc<InMemoryScanClient>,
    transport: Arc<dyn WebhookTransport>,
) -> ScanService {
    ScanService::with_transport(client.clone(), config(Some(WEBHOOK_URL)), transport)
}

pub fn launch_request(app_name: &str, project_name: &str, commit_id: &str) -> LaunchRequest {
    let archive = b"PK\x03\x04fake-archive".to_vec();
    LaunchRequest {
        app_name: app_name.to_string(),
        project_name: project_name.to_string(),
        branch: "main".to_string(),
        commit_id: commit_id.to_string(),
        scan_types: vec![ScanType::Sast, ScanType::Sca],
        is_fast_scan: false,
        preset: "K-Web".to_string(),
        tags: BTreeMap::new(),
        file_size: archive.len() as u64,
        file: Box::new(std::io::Cursor::new(archive)),
    }
}
