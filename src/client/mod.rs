//! Remote Scan Client
//!
//! The seam between the orchestration core and the remote scanning platform.
//! The platform's wire protocol lives behind [`RemoteScanClient`]; this module
//! only fixes the operations and data shapes the core relies on.
//!
//! [`memory::InMemoryScanClient`] is a scripted in-process platform used by
//! the test suites.

pub mod api;
pub mod error;
pub mod memory;
pub mod traits;
pub mod types;

pub use error::{ClientError, ClientResult};
pub use traits::{RemoteScanClient, UploadStream};
pub use types::{
    Application, ConfigurationSetting, Project, Scan, ScanConfiguration, ScanFilter, ScanResults,
    ScanStatus,
};
