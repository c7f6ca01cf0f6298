pub mod app;
pub mod client;
pub mod core;
pub mod scans;
