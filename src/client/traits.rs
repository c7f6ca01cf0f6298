//! Remote Scan Client trait
//!
//! The orchestration core talks to the scanning platform only through this
//! trait. Implementations own the wire protocol, authentication and any
//! per-call retries.

use crate::client::error::{ClientError, ClientResult};
use crate::client::types::{
    Application, ConfigurationSetting, Project, Scan, ScanConfiguration, ScanFilter, ScanResults,
};
use crate::core::poll::{poll_until, PollError, PollPolicy};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Source archive handed to [`RemoteScanClient::upload_stream_for_project`]
pub type UploadStream = Box<dyn tokio::io::AsyncRead + Send + Unpin>;

#[async_trait]
pub trait RemoteScanClient: Send + Sync {
    /// Look up an application by exact name
    async fn get_application_by_name(&self, name: &str) -> ClientResult<Option<Application>>;

    async fn create_application(&self, name: &str) -> ClientResult<Application>;

    /// Persist an application, including its project assignments
    async fn update_application(&self, application: &Application) -> ClientResult<()>;

    /// All projects matching a name, possibly more than one
    async fn get_projects_by_name(&self, name: &str) -> ClientResult<Vec<Project>>;

    async fn create_project(
        &self,
        name: &str,
        groups: &[String],
        tags: &BTreeMap<String, String>,
    ) -> ClientResult<Project>;

    async fn get_scan_by_id(&self, scan_id: &str) -> ClientResult<Scan>;

    /// Scans matching the filter, newest first
    async fn get_last_scans_filtered(&self, filter: &ScanFilter) -> ClientResult<Vec<Scan>>;

    /// Upload an archive of `size` bytes; returns the upload reference for the trigger
    async fn upload_stream_for_project(
        &self,
        project_id: &str,
        stream: UploadStream,
        size: u64,
    ) -> ClientResult<String>;

    /// Effective default scan settings for a project
    async fn get_scan_configuration_by_project(
        &self,
        project_id: &str,
    ) -> ClientResult<Vec<ConfigurationSetting>>;

    async fn update_project_configuration(
        &self,
        project_id: &str,
        settings: &[ConfigurationSetting],
    ) -> ClientResult<()>;

    async fn trigger_zip_scan(
        &self,
        project_id: &str,
        upload_url: &str,
        branch: &str,
        configurations: &[ScanConfiguration],
        tags: &BTreeMap<String, String>,
    ) -> ClientResult<Scan>;

    /// Policy used by the provided [`RemoteScanClient::poll_scan_to_terminal`]
    fn poll_policy(&self) -> PollPolicy {
        PollPolicy::default()
    }

    /// Wait until the scan reaches a terminal status
    ///
    /// The provided implementation re-reads the scan under [`Self::poll_policy`].
    async fn poll_scan_to_terminal(&self, scan: &Scan) -> ClientResult<Scan> {
        let policy = self.poll_policy();
        self.poll_scan_with_policy(scan, &policy).await
    }

    /// Wait until the scan reaches a terminal status under a caller's policy
    async fn poll_scan_with_policy(&self, scan: &Scan, policy: &PollPolicy) -> ClientResult<Scan> {
        if scan.status.is_terminal() {
            return Ok(scan.clone());
        }

        let scan_id: &str = &scan.scan_id;
        let operation = format!("scan {}", scan_id);

        poll_until(
            &operation,
            policy,
            move || self.get_scan_by_id(scan_id),
            |current: &Scan| current.status.is_terminal(),
        )
        .await
        .map_err(|err| match err {
            PollError::Probe(client_err) => client_err,
            PollError::Exhausted { attempts } => ClientError::PollExhausted {
                scan_id: scan_id.to_string(),
                attempts,
            },
        })
    }

    async fn get_all_scan_results(&self, scan_id: &str) -> ClientResult<ScanResults>;

    /// Settings the scan actually ran with
    async fn get_scan_configuration(
        &self,
        project_id: &str,
        scan_id: &str,
    ) -> ClientResult<Vec<ConfigurationSetting>>;

    /// True when the scan's results violate a configured policy
    async fn retrieve_policy_violation(&self, project_id: &str, scan_id: &str)
        -> ClientResult<bool>;

    async fn cancel_scan(&self, scan_id: &str) -> ClientResult<()>;
}
