//! Scan Service Error Types

use crate::client::error::ClientError;
use crate::core::validation::ValidationError;

/// Failures surfaced by the scan orchestration operations
#[derive(Debug, thiserror::Error)]
pub enum ScanServiceError {
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("{message}")]
    NotFound { message: String },

    #[error("{context}: {source}")]
    Upstream {
        context: String,
        #[source]
        source: ClientError,
    },

    #[error("Scan {scan_id} is not completed (status: {status})")]
    ScanNotReady { scan_id: String, status: String },
}

impl ScanServiceError {
    pub fn invalid(message: impl Into<String>) -> Self {
        ScanServiceError::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ScanServiceError::NotFound {
            message: message.into(),
        }
    }

    /// Wrap a remote failure with what was being attempted
    pub fn upstream(context: impl Into<String>, source: ClientError) -> Self {
        ScanServiceError::Upstream {
            context: context.into(),
            source,
        }
    }

    /// Status code hint for the transport layer
    pub fn http_status(&self) -> u16 {
        match self {
            ScanServiceError::InvalidRequest { .. } => 400,
            ScanServiceError::NotFound { .. } => 404,
            ScanServiceError::ScanNotReady { .. } => 409,
            ScanServiceError::Upstream { .. } => 502,
        }
    }
}

impl From<ValidationError> for ScanServiceError {
    fn from(err: ValidationError) -> Self {
        ScanServiceError::invalid(err.message())
    }
}

impl crate::core::error_handling::ContextualError for ScanServiceError {
    fn is_user_actionable(&self) -> bool {
        !matches!(self, ScanServiceError::Upstream { .. })
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            ScanServiceError::InvalidRequest { message } | ScanServiceError::NotFound { message } => {
                Some(message)
            }
            ScanServiceError::ScanNotReady { .. } => Some("scan has not completed yet, retry later"),
            ScanServiceError::Upstream { .. } => None,
        }
    }
}

/// Result type for scan service operations
pub type ScanServiceResult<T> = Result<T, ScanServiceError>;
