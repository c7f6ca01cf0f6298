//! Remote Client Error Types

/// Failures reported by a remote scan client
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClientError {
    #[error("{operation} failed: {message}")]
    Request { operation: String, message: String },

    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    #[error("Upload to project {project_id} failed: {message}")]
    Upload { project_id: String, message: String },

    #[error("Polling scan {scan_id} gave up after {attempts} attempts")]
    PollExhausted { scan_id: String, attempts: usize },
}

impl ClientError {
    pub fn request(operation: &str, message: impl Into<String>) -> Self {
        ClientError::Request {
            operation: operation.to_string(),
            message: message.into(),
        }
    }
}

impl crate::core::error_handling::ContextualError for ClientError {
    fn is_user_actionable(&self) -> bool {
        false // The remote platform is outside the caller's control
    }

    fn user_message(&self) -> Option<&str> {
        None
    }
}

/// Result type for remote client operations
pub type ClientResult<T> = Result<T, ClientError>;
