//! Scan Service facade
//!
//! The operations the transport layer calls. Each one validates its inputs,
//! delegates to the launcher or the categorizer, and returns a value ready to
//! be serialized.

use crate::app::config::ServiceConfig;
use crate::client::traits::RemoteScanClient;
use crate::core::validation::require_non_empty;
use crate::scans::categorizer::ResultCategorizer;
use crate::scans::error::{ScanServiceError, ScanServiceResult};
use crate::scans::launcher::ScanLauncher;
use crate::scans::tracker::{CompletionTracker, TrackerOutcome};
use crate::scans::types::{
    AllScansResponse, AssignmentAck, CancelAck, LaunchRequest, ListScansRequest,
    ListScansResponse, ScanResultResponse, ScanStarted, SimpleScanStatus,
};
use crate::scans::webhook::{ReqwestTransport, WebhookDispatcher, WebhookResult, WebhookTransport};
use std::sync::Arc;

pub struct ScanService {
    config: ServiceConfig,
    client: Arc<dyn RemoteScanClient>,
    categorizer: ResultCategorizer,
    launcher: ScanLauncher,
    tracker: CompletionTracker,
}

impl ScanService {
    /// Service posting webhooks over HTTP
    pub fn new(client: Arc<dyn RemoteScanClient>, config: ServiceConfig) -> WebhookResult<Self> {
        let transport = ReqwestTransport::from_config(&config)?;
        Ok(Self::with_transport(client, config, Arc::new(transport)))
    }

    /// Service with a caller-supplied webhook transport
    pub fn with_transport(
        client: Arc<dyn RemoteScanClient>,
        config: ServiceConfig,
        transport: Arc<dyn WebhookTransport>,
    ) -> Self {
        let categorizer = ResultCategorizer::new(client.clone(), config.portal_base());
        let dispatcher =
            WebhookDispatcher::new(config.webhook_url.clone(), transport, categorizer.clone());
        match dispatcher.url() {
            Some(url) => log::info!("Finished scans will be reported to {}", url),
            None => log::warn!("No webhook URL configured, finished scans will not be reported"),
        }
        if let Some(policy) = &config.poll_policy {
            log::info!(
                "Polling scans every {:?}, at most {} times",
                policy.interval,
                policy.max_attempts
            );
        }

        let tracker = CompletionTracker::new(client.clone(), dispatcher)
            .with_poll_policy(config.poll_policy.clone());
        let launcher = ScanLauncher::new(client.clone(), tracker.clone());

        Self {
            config,
            client,
            categorizer,
            launcher,
            tracker,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Start a scan; the result is delivered later by webhook
    pub async fn launch_scan(&self, request: LaunchRequest) -> ScanServiceResult<ScanStarted> {
        let scan = self.launcher.launch(request).await?;
        Ok(ScanStarted::new(&scan))
    }

    /// Status of the newest scan for a commit
    pub async fn get_status(
        &self,
        commit_id: &str,
        project_name: Option<&str>,
    ) -> ScanServiceResult<SimpleScanStatus> {
        require_non_empty("commit_id", commit_id)?;
        self.categorizer
            .status_by_commit(commit_id, project_name)
            .await
    }

    /// Latest fast and full scan results for a commit
    pub async fn get_results(
        &self,
        commit_id: &str,
        project_name: Option<&str>,
    ) -> ScanServiceResult<AllScansResponse> {
        require_non_empty("commit_id", commit_id)?;
        self.categorizer
            .results_by_commit(commit_id, project_name)
            .await
    }

    /// Results of one completed scan
    pub async fn get_scan_result(&self, scan_id: &str) -> ScanServiceResult<ScanResultResponse> {
        require_non_empty("scan_id", scan_id)?;
        self.categorizer.get_scan_result(scan_id).await
    }

    /// One page of scans; a zero limit means the configured default
    pub async fn list_scans(
        &self,
        mut request: ListScansRequest,
    ) -> ScanServiceResult<ListScansResponse> {
        if request.limit == 0 {
            request.limit = self.config.default_list_limit;
        }
        self.categorizer.list_scans(&request).await
    }

    /// Cancel the newest scan for a commit
    ///
    /// A tracker already waiting on that scan keeps running and observes the
    /// cancelled status on its next poll.
    pub async fn cancel_scan(
        &self,
        commit_id: &str,
        project_name: Option<&str>,
    ) -> ScanServiceResult<CancelAck> {
        require_non_empty("commit_id", commit_id)?;
        let scan = self
            .categorizer
            .latest_for_commit(commit_id, project_name)
            .await?;

        self.client
            .cancel_scan(&scan.scan_id)
            .await
            .map_err(|e| ScanServiceError::upstream("failed to cancel scan", e))?;
        log::info!("Cancelled scan {} for commit {}", scan.scan_id, commit_id);

        Ok(CancelAck {
            commit_id: commit_id.to_string(),
            project_name: project_name
                .filter(|name| !name.trim().is_empty())
                .map(str::to_string),
            scan_id: scan.scan_id,
            status: "cancelled".to_string(),
            message: "SUCCESS".to_string(),
        })
    }

    pub async fn assign_project_to_app(
        &self,
        app_name: &str,
        project_name: &str,
    ) -> ScanServiceResult<AssignmentAck> {
        self.launcher
            .assign_project_to_app(app_name, project_name)
            .await
    }

    /// Preset names callers may choose from
    pub fn presets(&self) -> &[String] {
        &self.config.presets
    }

    /// Wait for the tracker of a scan started by this service
    pub async fn join_tracker(&self, scan_id: &str) -> Option<TrackerOutcome> {
        self.tracker.join(scan_id).await
    }

    pub fn active_trackers(&self) -> usize {
        self.tracker.active()
    }

    /// Drop finished trackers, returning their outcomes
    pub async fn reap_finished_trackers(&self) -> Vec<TrackerOutcome> {
        self.tracker.reap_finished().await
    }

    /// Wait for all running trackers before the process exits
    pub async fn shutdown(&self) -> Vec<TrackerOutcome> {
        self.tracker.shutdown().await
    }
}
