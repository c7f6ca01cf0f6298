//! Configuration Merger
//!
//! Combines a project's default scan settings with what the caller asked for
//! into one [`ScanConfiguration`] per engine category. Values are typed while
//! the merge runs and rendered back to the platform's strings at the end.

use crate::client::traits::RemoteScanClient;
use crate::client::types::{ConfigurationSetting, ScanConfiguration};
use crate::scans::request::ScanType;
use std::collections::BTreeMap;
use std::fmt;

const SAST: &str = "sast";
const FAST_SCAN_MODE: &str = "fastScanMode";
const PRESET_NAME: &str = "presetName";
const MICROENGINE_SETTINGS: &[&str] = &["scorecard", "2ms"];

/// A setting value, boolean when the platform string is exactly one
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingValue {
    Flag(bool),
    Text(String),
}

impl SettingValue {
    /// Type a raw platform value
    ///
    /// Only the canonical `true` and `false` become flags, so every other
    /// spelling renders back byte for byte.
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "true" => SettingValue::Flag(true),
            "false" => SettingValue::Flag(false),
            other => SettingValue::Text(other.to_string()),
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Flag(flag) => write!(f, "{}", flag),
            SettingValue::Text(text) => f.write_str(text),
        }
    }
}

/// What the caller asked for on top of the project defaults
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeRequest<'a> {
    pub scan_types: &'a [ScanType],
    pub is_fast_scan: bool,
    pub preset: Option<&'a str>,
}

type CategoryMap = BTreeMap<String, BTreeMap<String, SettingValue>>;

/// Merge defaults with the request; pure and deterministic
///
/// Every requested category is present in the output, empty when neither the
/// defaults nor the overrides contribute to it. `sast` is added when a fast
/// scan or a preset needs it. Categories come out in name order.
pub fn merge_configurations(
    defaults: &[ConfigurationSetting],
    request: &MergeRequest<'_>,
) -> Vec<ScanConfiguration> {
    let mut categories: CategoryMap = request
        .scan_types
        .iter()
        .map(|scan_type| (scan_type.category(), BTreeMap::new()))
        .collect();

    for setting in defaults {
        if setting.value.is_empty() {
            continue;
        }
        if let Some(values) = categories.get_mut(&setting.category) {
            values.insert(setting.name.clone(), SettingValue::from_raw(&setting.value));
        }
    }

    if request.scan_types.contains(&ScanType::Microengines) {
        let engines = MICROENGINE_SETTINGS
            .iter()
            .map(|name| (name.to_string(), SettingValue::Flag(true)))
            .collect();
        categories.insert(ScanType::Microengines.category(), engines);
    }

    if request.is_fast_scan {
        categories
            .entry(SAST.to_string())
            .or_default()
            .insert(FAST_SCAN_MODE.to_string(), SettingValue::Flag(true));
    }

    if let Some(preset) = request.preset.filter(|p| !p.is_empty()) {
        categories
            .entry(SAST.to_string())
            .or_default()
            .insert(PRESET_NAME.to_string(), SettingValue::Text(preset.to_string()));
    }

    categories
        .into_iter()
        .map(|(scan_type, values)| ScanConfiguration {
            scan_type,
            values: values
                .into_iter()
                .map(|(name, value)| (name, value.to_string()))
                .collect(),
        })
        .collect()
}

/// Fetch the project defaults, merge, and persist a requested preset
///
/// A failure to fetch the defaults is returned. A failure to persist the
/// preset is only logged: the preset is in the merged set either way.
pub async fn merge_for_project(
    client: &dyn RemoteScanClient,
    project_id: &str,
    request: &MergeRequest<'_>,
) -> Result<Vec<ScanConfiguration>, crate::client::error::ClientError> {
    let defaults = client.get_scan_configuration_by_project(project_id).await?;
    log::info!(
        "Retrieved {} default configuration settings for project {}",
        defaults.len(),
        project_id
    );

    let merged = merge_configurations(&defaults, request);

    if let Some(preset) = request.preset.filter(|p| !p.is_empty()) {
        log::info!("Applying preset '{}' to project {}", preset, project_id);
        let setting = ConfigurationSetting::project_preset(preset);
        if let Err(e) = client
            .update_project_configuration(project_id, std::slice::from_ref(&setting))
            .await
        {
            log::warn!(
                "Failed to persist preset '{}' for project {}: {}",
                preset,
                project_id,
                e
            );
        }
    }

    match serde_json::to_string(&merged) {
        Ok(json) => log::debug!("Prepared {} scan configurations: {}", merged.len(), json),
        Err(_) => log::debug!("Prepared {} scan configurations", merged.len()),
    }
    Ok(merged)
}
