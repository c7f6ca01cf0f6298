//! Application module
//!
//! Process-level concerns that sit around the orchestration core: loading
//! [`ServiceConfig`](config::ServiceConfig) and starting logging from it.

pub mod config;
