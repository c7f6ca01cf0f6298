//! Scan service request and response types
//!
//! The response shapes are serialized as-is by the transport layer, so their
//! JSON field names are part of the public contract.

use crate::client::traits::UploadStream;
use crate::client::types::{Scan, ScanResults};
use crate::scans::request::ScanType;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Everything needed to start a scan of an uploaded archive
pub struct LaunchRequest {
    pub app_name: String,
    pub project_name: String,
    pub branch: String,
    pub commit_id: String,
    pub scan_types: Vec<ScanType>,
    pub is_fast_scan: bool,
    pub preset: String,
    /// Caller tags; `commit_id` is always overwritten from [`Self::commit_id`]
    pub tags: BTreeMap<String, String>,
    pub file: UploadStream,
    pub file_size: u64,
}

impl fmt::Debug for LaunchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LaunchRequest")
            .field("app_name", &self.app_name)
            .field("project_name", &self.project_name)
            .field("branch", &self.branch)
            .field("commit_id", &self.commit_id)
            .field("scan_types", &self.scan_types)
            .field("is_fast_scan", &self.is_fast_scan)
            .field("preset", &self.preset)
            .field("tags", &self.tags)
            .field("file_size", &self.file_size)
            .finish_non_exhaustive()
    }
}

/// Immediate answer to a launch; completion is reported by webhook
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanStarted {
    pub scan_id: String,
    pub status: String,
    pub message: String,
}

impl ScanStarted {
    pub fn new(scan: &Scan) -> Self {
        Self {
            scan_id: scan.scan_id.clone(),
            status: "started".to_string(),
            message: "Scan started successfully".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultSummary {
    pub total_results: usize,
}

/// One scan together with its results and derived flags
///
/// The optional diagnostic fields record sub-fetches that failed while the
/// projection was built; the rest of the projection is still valid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanResultResponse {
    pub link: String,
    pub is_fast_scan: bool,
    #[serde(rename = "is_policy_blocked")]
    pub break_build: bool,
    pub scan_id: String,
    pub commit_id: String,
    pub project_id: String,
    pub branch: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
    pub tags: BTreeMap<String, String>,
    pub results: Option<ScanResults>,
    pub summary: ResultSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
}

impl ScanResultResponse {
    /// Scan metadata only, no results or flags yet
    pub fn from_scan(scan: &Scan, portal_url: &str) -> Self {
        Self {
            link: scan_link(portal_url, scan),
            is_fast_scan: false,
            break_build: false,
            scan_id: scan.scan_id.clone(),
            commit_id: scan.commit_id().unwrap_or_default().to_string(),
            project_id: scan.project_id.clone(),
            branch: scan.branch.clone(),
            status: scan.status.to_string(),
            created_at: scan.created_at.clone(),
            updated_at: scan.updated_at.clone(),
            tags: scan.tags.clone(),
            results: None,
            summary: ResultSummary::default(),
            policy_warning: None,
            error: None,
            status_message: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == crate::client::types::ScanStatus::Completed.as_str()
    }
}

/// Portal page for a scan
pub fn scan_link(portal_url: &str, scan: &Scan) -> String {
    format!(
        "{}/projects/{}/scans?branch={}&id={}",
        portal_url.trim_end_matches('/'),
        scan.project_id,
        scan.branch,
        scan.scan_id
    )
}

/// Latest fast and latest full scan of a commit
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategorizedScans {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fast: Option<ScanResultResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full: Option<ScanResultResponse>,
}

impl CategorizedScans {
    pub fn is_full(&self) -> bool {
        self.fast.is_some() && self.full.is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScanResultResponse> {
        self.fast.iter().chain(self.full.iter())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AllScansSummary {
    pub completed_scans: usize,
    pub break_build_count: usize,
}

/// Combined results for a commit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllScansResponse {
    pub commit_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    pub total_scans: usize,
    pub summary: AllScansSummary,
    pub scans: CategorizedScans,
}

impl AllScansResponse {
    /// Count the categorized scans; break-build only counts for completed ones
    pub fn new(commit_id: &str, project_name: Option<&str>, scans: CategorizedScans) -> Self {
        let mut summary = AllScansSummary::default();
        for scan in scans.iter().filter(|s| s.is_completed()) {
            summary.completed_scans += 1;
            if scan.break_build {
                summary.break_build_count += 1;
            }
        }

        Self {
            commit_id: commit_id.to_string(),
            project_name: project_name.map(str::to_string),
            total_scans: scans.iter().count(),
            summary,
            scans,
        }
    }
}

/// Filters and paging for scan listings
#[derive(Debug, Clone, PartialEq)]
pub struct ListScansRequest {
    pub project_name: Option<String>,
    pub commit_id: Option<String>,
    pub limit: usize,
    pub offset: usize,
}

impl Default for ListScansRequest {
    fn default() -> Self {
        Self {
            project_name: None,
            commit_id: None,
            limit: 20,
            offset: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListScansResponse {
    pub scans: Vec<Scan>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimpleScanStatus {
    pub scan_id: String,
    pub status: String,
}

/// Acknowledgement of a cancellation request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CancelAck {
    pub commit_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    pub scan_id: String,
    pub status: String,
    pub message: String,
}

/// Acknowledgement of a project-to-application assignment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssignmentAck {
    pub application_id: String,
    pub project_id: String,
    /// False when the project was already assigned
    pub newly_assigned: bool,
}
