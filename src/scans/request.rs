//! Request value parsing
//!
//! Helpers the transport layer uses to turn loosely formatted request fields
//! (comma lists, `key:value` tag strings) into typed values before calling
//! the scan service.

use crate::scans::error::{ScanServiceError, ScanServiceResult};
use std::collections::BTreeMap;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

/// Engine category a scan can run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ScanType {
    Sast,
    Sca,
    Secrets,
    Kics,
    #[strum(to_string = "containers", serialize = "containersec", serialize = "container")]
    Containers,
    Apisec,
    Microengines,
}

impl ScanType {
    /// Configuration category name used by the platform
    pub fn category(&self) -> String {
        self.to_string()
    }

    /// Scan types used when a request names none
    pub fn defaults() -> Vec<ScanType> {
        vec![ScanType::Sast, ScanType::Sca]
    }

    fn valid_names() -> String {
        ScanType::iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Parse a comma-separated scan type list such as `"sast, sca"`
///
/// Spaces are ignored and repeated types collapse to one. An empty list means
/// the default `sast,sca`.
pub fn parse_scan_types(value: &str) -> ScanServiceResult<Vec<ScanType>> {
    let compact: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Ok(ScanType::defaults());
    }

    let mut scan_types = Vec::new();
    for name in compact.split(',') {
        let scan_type: ScanType = name.parse().map_err(|_| {
            ScanServiceError::invalid(format!(
                "invalid scan type: '{}'. Valid types: {}",
                name,
                ScanType::valid_names()
            ))
        })?;
        if !scan_types.contains(&scan_type) {
            scan_types.push(scan_type);
        }
    }
    Ok(scan_types)
}

/// Parse `key:value` pairs separated by commas
///
/// The value is everything after the first `:`, so values may themselves
/// contain colons. Blank pairs are skipped.
pub fn parse_tags(value: &str) -> ScanServiceResult<BTreeMap<String, String>> {
    let mut tags = BTreeMap::new();

    for pair in value.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (key, tag_value) = pair.split_once(':').ok_or_else(|| {
            ScanServiceError::invalid(format!(
                "invalid tag format: {}. Expected format: key:value",
                pair
            ))
        })?;

        let key = key.trim();
        if key.is_empty() {
            return Err(ScanServiceError::invalid(format!(
                "empty tag key in: {}",
                pair
            )));
        }
        tags.insert(key.to_string(), tag_value.trim().to_string());
    }

    Ok(tags)
}
