//! Test modules for the scan orchestration core
//!
//! Suites run against the in-memory platform and a recording webhook
//! transport; they are organized by component.

mod service;
mod support;
