//! Remote Client API
//!
//! Public surface for implementors and users of the remote client seam.

// The client trait and its upload stream type
pub use crate::client::traits::{RemoteScanClient, UploadStream};

// Error handling
pub use crate::client::error::{ClientError, ClientResult};

// Platform data model
pub use crate::client::types::{
    Application, ConfigurationSetting, Project, Scan, ScanConfiguration, ScanFilter, ScanResults,
    ScanStatus, COMMIT_ID_TAG, FAST_SCAN_MODE_KEY,
};

// In-memory platform
pub use crate::client::memory::{FailPoint, InMemoryScanClient, SeedScan};
