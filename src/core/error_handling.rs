//! Generic error handling utilities
//!
//! Shared by every module error so that callers (and the transport layer that
//! sits above this crate) can decide what to show and how to log it.

/// Errors that can tell caller mistakes apart from system failures
///
/// When `is_user_actionable()` returns `true`, `user_message()` must return
/// `Some(message)` with something the caller can act on. Otherwise it returns
/// `None` and only the operation context is surfaced.
pub trait ContextualError: std::error::Error {
    /// True for errors the caller can fix (missing fields, unknown names)
    fn is_user_actionable(&self) -> bool;

    /// The message to show the caller for user-actionable errors
    fn user_message(&self) -> Option<&str>;
}

/// Log an error with a detail level that depends on its kind
///
/// User-actionable errors are logged with their own message at `warn`; system
/// errors log the operation context at `error` and keep the detail at `debug`.
pub fn log_error_with_context<E: ContextualError + std::fmt::Display + std::fmt::Debug>(
    error: &E,
    operation_context: &str,
) {
    match error.user_message() {
        Some(user_msg) if error.is_user_actionable() => {
            log::warn!("{}: {}", operation_context, user_msg);
        }
        _ => {
            log::error!("{}: {}", operation_context, error);
        }
    }
    log::debug!("DEBUG_DETAILS: {:?}", error);
}
