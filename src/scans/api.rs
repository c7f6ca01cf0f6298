//! Public API for the scan orchestration core
//!
//! External modules should import from here rather than directly from internal modules.

// Facade
pub use crate::scans::service::ScanService;

// Components
pub use crate::scans::categorizer::{paginate, ResultCategorizer};
pub use crate::scans::config_merge::{merge_configurations, MergeRequest, SettingValue};
pub use crate::scans::launcher::ScanLauncher;
pub use crate::scans::tracker::{CompletionTracker, TrackerOutcome};
pub use crate::scans::webhook::{
    Delivery, ReqwestTransport, WebhookDispatcher, WebhookError, WebhookResult, WebhookTransport,
};

// Request parsing
pub use crate::scans::request::{parse_scan_types, parse_tags, ScanType};

// Request and response types
pub use crate::scans::types::{
    scan_link, AllScansResponse, AllScansSummary, AssignmentAck, CancelAck, CategorizedScans,
    LaunchRequest, ListScansRequest, ListScansResponse, ResultSummary, ScanResultResponse,
    ScanStarted, SimpleScanStatus,
};

// Error handling
pub use crate::scans::error::{ScanServiceError, ScanServiceResult};
