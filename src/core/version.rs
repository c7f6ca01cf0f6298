//! Build metadata shared across the crate.
//! Includes the generated version.rs from the build script as the single source of truth.

include!(concat!(env!("OUT_DIR"), "/version.rs"));

/// Crate version from Cargo metadata
pub fn crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Build time string from the build script (UTC)
pub fn build_time() -> &'static str {
    BUILD_TIME
}

/// Short git hash captured by the build script
pub fn git_hash() -> &'static str {
    GIT_HASH
}

/// Default User-Agent presented on outbound webhook deliveries
pub fn default_user_agent() -> String {
    format!("scanwrap/{} ({})", crate_version(), git_hash())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_user_agent_carries_version() {
        let agent = default_user_agent();
        assert!(agent.starts_with("scanwrap/"));
        assert!(agent.contains(crate_version()));
    }

    #[test]
    fn test_build_metadata_is_populated() {
        assert!(!build_time().is_empty());
        assert!(!git_hash().is_empty());
    }
}
