//! Remote platform data model
//!
//! Shapes of the entities exchanged with the remote scanning platform. The
//! platform owns their lifecycle; this crate only reads them and asks for
//! changes through [`RemoteScanClient`](crate::client::traits::RemoteScanClient).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Tag every scan triggered through this crate carries
pub const COMMIT_ID_TAG: &str = "commit_id";

/// Configuration key that marks a scan as a fast scan
pub const FAST_SCAN_MODE_KEY: &str = "scan.config.sast.fastScanMode";

/// A logical grouping of projects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    #[serde(rename = "id")]
    pub application_id: String,
    pub name: String,
    #[serde(rename = "projectIds", default)]
    pub project_ids: Vec<String>,
}

impl Application {
    /// Attach a project; returns false when it was already assigned
    pub fn assign_project(&mut self, project: &Project) -> bool {
        if self.project_ids.iter().any(|id| id == &project.project_id) {
            return false;
        }
        self.project_ids.push(project.project_id.clone());
        true
    }
}

/// A scannable unit within an application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(rename = "id")]
    pub project_id: String,
    pub name: String,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// Scan lifecycle status as reported by the platform
///
/// The vocabulary belongs to the platform; unknown values are carried through
/// unchanged in [`ScanStatus::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ScanStatus {
    Queued,
    Running,
    Completed,
    Partial,
    Failed,
    Canceled,
    Other(String),
}

impl ScanStatus {
    /// No further transition happens after a terminal status
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ScanStatus::Completed | ScanStatus::Partial | ScanStatus::Failed | ScanStatus::Canceled
        )
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, ScanStatus::Completed)
    }

    pub fn as_str(&self) -> &str {
        match self {
            ScanStatus::Queued => "Queued",
            ScanStatus::Running => "Running",
            ScanStatus::Completed => "Completed",
            ScanStatus::Partial => "Partial",
            ScanStatus::Failed => "Failed",
            ScanStatus::Canceled => "Canceled",
            ScanStatus::Other(value) => value,
        }
    }
}

impl From<String> for ScanStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Queued" => ScanStatus::Queued,
            "Running" => ScanStatus::Running,
            "Completed" => ScanStatus::Completed,
            "Partial" => ScanStatus::Partial,
            "Failed" => ScanStatus::Failed,
            "Canceled" => ScanStatus::Canceled,
            _ => ScanStatus::Other(value),
        }
    }
}

impl From<ScanStatus> for String {
    fn from(status: ScanStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One execution of the platform's engines against an uploaded artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scan {
    #[serde(rename = "id")]
    pub scan_id: String,
    #[serde(rename = "projectId")]
    pub project_id: String,
    pub branch: String,
    pub status: ScanStatus,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(rename = "updatedAt")]
    pub updated_at: String,
}

impl Scan {
    pub fn commit_id(&self) -> Option<&str> {
        self.tags.get(COMMIT_ID_TAG).map(String::as_str)
    }
}

/// Filter for listing scans, newest first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanFilter {
    pub project_id: Option<String>,
    pub tags: Vec<(String, String)>,
}

impl ScanFilter {
    pub fn with_project(mut self, project_id: &str) -> Self {
        self.project_id = Some(project_id.to_string());
        self
    }

    pub fn with_tag(mut self, key: &str, value: &str) -> Self {
        self.tags.push((key.to_string(), value.to_string()));
        self
    }

    /// Filter on the commit tag
    pub fn for_commit(commit_id: &str) -> Self {
        Self::default().with_tag(COMMIT_ID_TAG, commit_id)
    }

    pub fn matches(&self, scan: &Scan) -> bool {
        if let Some(project_id) = &self.project_id {
            if &scan.project_id != project_id {
                return false;
            }
        }
        self.tags
            .iter()
            .all(|(key, value)| scan.tags.get(key) == Some(value))
    }
}

/// A persisted configuration setting (project or scan level)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationSetting {
    pub key: String,
    pub name: String,
    pub category: String,
    pub origin_level: String,
    pub value: String,
    pub value_type: String,
    pub value_type_params: String,
    pub allow_override: bool,
}

impl ConfigurationSetting {
    /// A plain string setting keyed `scan.config.<category>.<name>`
    pub fn new(category: &str, name: &str, value: &str) -> Self {
        Self {
            key: format!("scan.config.{}.{}", category, name),
            name: name.to_string(),
            category: category.to_string(),
            value: value.to_string(),
            value_type: "String".to_string(),
            allow_override: true,
            ..Self::default()
        }
    }

    /// Project-level SAST preset override
    pub fn project_preset(preset: &str) -> Self {
        Self {
            origin_level: "Project".to_string(),
            value_type: "RESTList".to_string(),
            value_type_params: r#"{"path":"/queries/presets","fieldMap":{"id":"id","value":"name","label":"name"}}"#
                .to_string(),
            ..Self::new("sast", "presetName", preset)
        }
    }
}

/// Final per-engine configuration handed to the scan trigger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfiguration {
    #[serde(rename = "type")]
    pub scan_type: String,
    #[serde(rename = "value")]
    pub values: BTreeMap<String, String>,
}

/// Findings of a finished scan, opaque to this crate
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScanResults {
    pub items: Vec<serde_json::Value>,
}

impl ScanResults {
    pub fn count(&self) -> usize {
        self.items.len()
    }
}
