//! Common test utilities and helpers
//!
//! Fixtures shared by the integration suites: a webhook transport that
//! records what it was sent, service construction over the in-memory
//! platform, and a ready-made launch request.

#![allow(dead_code)]

use async_trait::async_trait;
use scanwrap::app::config::ServiceConfig;
use scanwrap::client::api::InMemoryScanClient;
use scanwrap::scans::api::{
    LaunchRequest, ScanService, ScanType, WebhookError, WebhookResult, WebhookTransport,
};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

pub const WEBHOOK_URL: &str = "https://hooks.example.com/ci";
pub const PORTAL_URL: &str = "https://portal.example.com";

#[derive(Default)]
pub struct CapturingTransport {
    bodies: Mutex<Vec<serde_json::Value>>,
}

impl CapturingTransport {
    pub fn bodies(&self) -> Vec<serde_json::Value> {
        self.bodies.lock().unwrap().clone()
    }
}

#[async_trait]
impl WebhookTransport for CapturingTransport {
    async fn post_json(&self, url: &str, body: String) -> WebhookResult<u16> {
        assert_eq!(url, WEBHOOK_URL);
        let value = serde_json::from_str(&body).map_err(|e| WebhookError::Serialize {
            message: e.to_string(),
        })?;
        self.bodies.lock().unwrap().push(value);
        Ok(204)
    }
}

pub fn service_with_webhook(
    client: &Arc<InMemoryScanClient>,
) -> (ScanService, Arc<CapturingTransport>) {
    let transport = Arc::new(CapturingTransport::default());
    let config = ServiceConfig {
        webhook_url: Some(WEBHOOK_URL.to_string()),
        portal_url: PORTAL_URL.to_string(),
        ..ServiceConfig::default()
    };
    let service = ScanService::with_transport(client.clone(), config, transport.clone());
    (service, transport)
}

pub fn launch_request(app_name: &str, project_name: &str, commit_id: &str) -> LaunchRequest {
    let archive = b"PK\x05\x06integration".to_vec();
    LaunchRequest {
        app_name: app_name.to_string(),
        project_name: project_name.to_string(),
        branch: "main".to_string(),
        commit_id: commit_id.to_string(),
        scan_types: vec![ScanType::Sast, ScanType::Sca],
        is_fast_scan: false,
        preset: "K-API".to_string(),
        tags: BTreeMap::new(),
        file_size: archive.len() as u64,
        file: Box::new(std::io::Cursor::new(archive)),
    }
}
