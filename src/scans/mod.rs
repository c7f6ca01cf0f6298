//! Scan Orchestration Core
//!
//! Turns a scan request into a delivered result against a remote scanning
//! platform reached through [`RemoteScanClient`](crate::client::traits::RemoteScanClient).
//!
//! # Architecture
//!
//! ```text
//! ScanService ──launch──▶ ScanLauncher ──▶ Configuration Merger
//!      │                       │
//!      │                       ▼ trigger
//!      │               CompletionTracker (one task per scan)
//!      │                       │ terminal scan
//!      │                       ▼
//!      │               WebhookDispatcher ──▶ WebhookTransport
//!      │                       │ payload
//!      └──read paths──▶ ResultCategorizer
//! ```
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use scanwrap::app::config::ServiceConfig;
//! use scanwrap::client::api::InMemoryScanClient;
//! use scanwrap::scans::api::{parse_scan_types, LaunchRequest, ScanService};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServiceConfig::load(None).await?;
//! let service = ScanService::new(Arc::new(InMemoryScanClient::new()), config)?;
//!
//! let archive = b"PK\x03\x04".to_vec();
//! let started = service
//!     .launch_scan(LaunchRequest {
//!         app_name: "app-X".to_string(),
//!         project_name: "proj-Y".to_string(),
//!         branch: "main".to_string(),
//!         commit_id: "c123".to_string(),
//!         scan_types: parse_scan_types("sast,sca")?,
//!         is_fast_scan: true,
//!         preset: "K-Web".to_string(),
//!         tags: Default::default(),
//!         file_size: archive.len() as u64,
//!         file: Box::new(std::io::Cursor::new(archive)),
//!     })
//!     .await?;
//! println!("{} {}", started.scan_id, started.status);
//!
//! let results = service.get_results("c123", None).await?;
//! println!("{} scans for the commit", results.total_scans);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod categorizer;
pub mod config_merge;
pub mod error;
pub mod launcher;
pub mod request;
pub mod service;
pub mod tracker;
pub mod types;
pub mod webhook;

#[cfg(test)]
mod tests;
