//! Result Categorizer
//!
//! Read paths over scans already known to the platform: the single-scan
//! projection, the latest fast/full pair for a commit, status lookups and
//! paged listings.

use crate::client::error::ClientError;
use crate::client::traits::RemoteScanClient;
use crate::client::types::{Project, Scan, ScanFilter, FAST_SCAN_MODE_KEY};
use crate::core::validation::parse_flag;
use crate::scans::error::{ScanServiceError, ScanServiceResult};
use crate::scans::types::{
    AllScansResponse, CategorizedScans, ListScansRequest, ListScansResponse, ResultSummary,
    ScanResultResponse, SimpleScanStatus,
};
use std::sync::Arc;

/// Builds result projections against a remote platform
#[derive(Clone)]
pub struct ResultCategorizer {
    client: Arc<dyn RemoteScanClient>,
    portal_url: String,
}

impl ResultCategorizer {
    pub fn new(client: Arc<dyn RemoteScanClient>, portal_url: &str) -> Self {
        Self {
            client,
            portal_url: portal_url.trim_end_matches('/').to_string(),
        }
    }

    /// Project a scan the caller already holds
    ///
    /// Completed scans get results, the fast-scan flag and the policy verdict;
    /// each of those fetches may fail on its own and only leaves a diagnostic
    /// behind. Other scans get a status message and nothing else.
    pub async fn project_scan(&self, scan: &Scan) -> ScanResultResponse {
        let mut response = ScanResultResponse::from_scan(scan, &self.portal_url);

        if !scan.status.is_completed() {
            response.status_message = Some(format!("Scan not completed (status: {})", scan.status));
            return response;
        }

        match self.client.get_all_scan_results(&scan.scan_id).await {
            Ok(results) => {
                log::debug!(
                    "Retrieved {} results for scan {}",
                    results.count(),
                    scan.scan_id
                );
                response.summary = ResultSummary {
                    total_results: results.count(),
                };
                response.results = Some(results);
            }
            Err(e) => {
                log::warn!("Failed to get results for scan {}: {}", scan.scan_id, e);
                response.error = Some(format!("Failed to get results: {}", e));
            }
        }

        response.is_fast_scan = self.is_fast_scan(scan).await;

        match self
            .client
            .retrieve_policy_violation(&scan.project_id, &scan.scan_id)
            .await
        {
            Ok(break_build) => response.break_build = break_build,
            Err(e) => {
                log::warn!(
                    "Policy violation info unavailable for scan {}, continuing without break-build status: {}",
                    scan.scan_id,
                    e
                );
                response.policy_warning = Some(format!("Policy violation info unavailable: {}", e));
                response.break_build = false;
            }
        }

        response
    }

    // Read back the fast-scan setting the scan ran with; any doubt means full
    async fn is_fast_scan(&self, scan: &Scan) -> bool {
        let settings = match self
            .client
            .get_scan_configuration(&scan.project_id, &scan.scan_id)
            .await
        {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!(
                    "Failed to get configuration for scan {}, assuming full scan: {}",
                    scan.scan_id,
                    e
                );
                return false;
            }
        };

        let Some(setting) = settings.iter().find(|s| s.key == FAST_SCAN_MODE_KEY) else {
            return false;
        };
        match parse_flag(&setting.value) {
            Ok(fast) => fast,
            Err(e) => {
                log::warn!(
                    "Unreadable {} on scan {}, assuming full scan: {}",
                    FAST_SCAN_MODE_KEY,
                    scan.scan_id,
                    e
                );
                false
            }
        }
    }

    /// Projection of a single completed scan
    pub async fn get_scan_result(&self, scan_id: &str) -> ScanServiceResult<ScanResultResponse> {
        let scan = self.client.get_scan_by_id(scan_id).await.map_err(|e| match e {
            ClientError::NotFound { .. } => {
                ScanServiceError::not_found(format!("scan '{}' not found", scan_id))
            }
            other => ScanServiceError::upstream(format!("failed to get scan {}", scan_id), other),
        })?;

        if !scan.status.is_completed() {
            return Err(ScanServiceError::ScanNotReady {
                scan_id: scan.scan_id,
                status: scan.status.to_string(),
            });
        }

        Ok(self.project_scan(&scan).await)
    }

    /// Latest fast and latest full scan for a commit
    pub async fn results_by_commit(
        &self,
        commit_id: &str,
        project_name: Option<&str>,
    ) -> ScanServiceResult<AllScansResponse> {
        let scans = self.scans_for_commit(commit_id, project_name).await?;

        let mut categorized = CategorizedScans::default();
        for scan in &scans {
            if categorized.is_full() {
                break;
            }
            log::debug!(
                "Processing scan {} with status {} for commit {}",
                scan.scan_id,
                scan.status,
                commit_id
            );

            let mut projection = self.project_scan(scan).await;
            projection.commit_id = commit_id.to_string();
            let slot = if projection.is_fast_scan {
                &mut categorized.fast
            } else {
                &mut categorized.full
            };
            if slot.is_none() {
                *slot = Some(projection);
            }
        }

        let response = AllScansResponse::new(commit_id, project_name, categorized);
        log::info!(
            "Categorized scans for commit {}: total {}, completed {}, break-build {}",
            commit_id,
            response.total_scans,
            response.summary.completed_scans,
            response.summary.break_build_count
        );
        Ok(response)
    }

    /// Status of the newest scan for a commit
    pub async fn status_by_commit(
        &self,
        commit_id: &str,
        project_name: Option<&str>,
    ) -> ScanServiceResult<SimpleScanStatus> {
        let scan = self.latest_for_commit(commit_id, project_name).await?;
        Ok(SimpleScanStatus {
            scan_id: scan.scan_id,
            status: scan.status.to_string(),
        })
    }

    /// Newest scan for a commit, optionally within one project
    pub async fn latest_for_commit(
        &self,
        commit_id: &str,
        project_name: Option<&str>,
    ) -> ScanServiceResult<Scan> {
        self.scans_for_commit(commit_id, project_name)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| no_scans_for_commit(commit_id, project_name))
    }

    /// Filtered scans paged on this side
    pub async fn list_scans(&self, request: &ListScansRequest) -> ScanServiceResult<ListScansResponse> {
        let mut filter = ScanFilter::default();
        if let Some(name) = non_blank(request.project_name.as_deref()) {
            let project = self.resolve_project(name).await?;
            log::debug!("Resolved project name '{}' to {}", name, project.project_id);
            filter = filter.with_project(&project.project_id);
        }
        if let Some(commit_id) = non_blank(request.commit_id.as_deref()) {
            filter = filter.with_tag(crate::client::types::COMMIT_ID_TAG, commit_id);
        }

        let scans = self
            .client
            .get_last_scans_filtered(&filter)
            .await
            .map_err(|e| ScanServiceError::upstream("failed to get filtered scans", e))?;
        log::debug!("Retrieved {} filtered scans", scans.len());

        Ok(ListScansResponse {
            total: scans.len(),
            scans: paginate(&scans, request.limit, request.offset),
            limit: request.limit,
            offset: request.offset,
        })
    }

    /// First project with the name; more than one match is ambiguous
    pub async fn resolve_project(&self, project_name: &str) -> ScanServiceResult<Project> {
        let projects = self
            .client
            .get_projects_by_name(project_name)
            .await
            .map_err(|e| {
                ScanServiceError::upstream(format!("failed to find project '{}'", project_name), e)
            })?;
        first_project(project_name, projects)
            .ok_or_else(|| ScanServiceError::not_found(format!("project '{}' not found", project_name)))
    }

    async fn scans_for_commit(
        &self,
        commit_id: &str,
        project_name: Option<&str>,
    ) -> ScanServiceResult<Vec<Scan>> {
        let mut filter = ScanFilter::for_commit(commit_id);
        match non_blank(project_name) {
            Some(name) => {
                let project = self.resolve_project(name).await?;
                log::debug!(
                    "Filtering by project '{}' ({}) and commit {}",
                    name,
                    project.project_id,
                    commit_id
                );
                filter = filter.with_project(&project.project_id);
            }
            None => log::debug!("Filtering by commit {} only", commit_id),
        }

        let scans = self
            .client
            .get_last_scans_filtered(&filter)
            .await
            .map_err(|e| ScanServiceError::upstream("failed to get scans", e))?;
        if scans.is_empty() {
            return Err(no_scans_for_commit(commit_id, project_name));
        }
        Ok(scans)
    }
}

/// First of the projects sharing a name; more than one is ambiguous
pub(crate) fn first_project(name: &str, projects: Vec<Project>) -> Option<Project> {
    if projects.len() > 1 {
        log::warn!(
            "{} projects are named '{}', using {}",
            projects.len(),
            name,
            projects[0].project_id
        );
    }
    projects.into_iter().next()
}

fn no_scans_for_commit(commit_id: &str, project_name: Option<&str>) -> ScanServiceError {
    match non_blank(project_name) {
        Some(name) => ScanServiceError::not_found(format!(
            "no scans found for commit_id: {} and project_name: {}",
            commit_id, name
        )),
        None => ScanServiceError::not_found(format!("no scans found for commit_id: {}", commit_id)),
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Slice `items[offset..offset + limit]`, clamped to the available items
pub fn paginate<T: Clone>(items: &[T], limit: usize, offset: usize) -> Vec<T> {
    let total = items.len();
    let start = offset.min(total);
    let end = offset.saturating_add(limit).min(total);
    items[start..end].to_vec()
}
