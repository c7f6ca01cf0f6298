//! Service configuration
//!
//! Settings come from three layers, later ones winning: built-in defaults, a
//! TOML file with kebab-case keys, then environment variables. The webhook
//! destination is normally supplied through `STATIC_WEBHOOK_URL`.

use crate::core::logging::{LOG_FORMATS, LOG_LEVELS};
use crate::core::poll::PollPolicy;
use crate::core::validation::validate_http_url;
use crate::core::version::default_user_agent;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_WEBHOOK_URL: &str = "STATIC_WEBHOOK_URL";
pub const ENV_PORTAL_URL: &str = "SCANWRAP_PORTAL_URL";
pub const ENV_LOG_LEVEL: &str = "SCANWRAP_LOG_LEVEL";

const DEFAULT_PORTAL_URL: &str = "https://sng.ast.checkmarx.net";
const DEFAULT_WEBHOOK_TIMEOUT_SECS: u64 = 30;
const DEFAULT_LIST_LIMIT: usize = 20;
const DEFAULT_PRESETS: &[&str] = &["K-Web", "K-API", "K-Mobile"];

/// Errors raised while loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("The specified configuration file does not exist: {path}")]
    NotFound { path: PathBuf },

    #[error("Error reading configuration file {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("Error parsing configuration: {message}")]
    Parse { message: String },

    #[error("Invalid value for '{key}': {message}")]
    Invalid { key: String, message: String },
}

impl ConfigError {
    fn invalid(key: &str, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

impl crate::core::error_handling::ContextualError for ConfigError {
    fn is_user_actionable(&self) -> bool {
        !matches!(self, ConfigError::Read { .. })
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            ConfigError::Invalid { message, .. } | ConfigError::Parse { message } => Some(message),
            ConfigError::NotFound { .. } => Some("configuration file does not exist"),
            ConfigError::Read { .. } => None,
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Runtime settings for the scan service
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    /// Destination for finished-scan payloads; no delivery when unset
    pub webhook_url: Option<String>,
    /// Base URL of the platform UI, used to build result links
    pub portal_url: String,
    pub webhook_timeout: Duration,
    pub user_agent: String,
    pub presets: Vec<String>,
    pub default_list_limit: usize,
    /// Overrides the remote client's own poll policy when set
    pub poll_policy: Option<PollPolicy>,
    pub log_level: Option<String>,
    pub log_format: Option<String>,
    pub log_file: Option<PathBuf>,
    pub color: Option<bool>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            portal_url: DEFAULT_PORTAL_URL.to_string(),
            webhook_timeout: Duration::from_secs(DEFAULT_WEBHOOK_TIMEOUT_SECS),
            user_agent: default_user_agent(),
            presets: DEFAULT_PRESETS.iter().map(|p| p.to_string()).collect(),
            default_list_limit: DEFAULT_LIST_LIMIT,
            poll_policy: None,
            log_level: None,
            log_format: None,
            log_file: None,
            color: None,
        }
    }
}

impl ServiceConfig {
    /// Load defaults, then the config file, then the process environment
    ///
    /// An explicitly named file must exist. Without one, the default path
    /// `<config dir>/Scanwrap/scanwrap.toml` is read when present.
    pub async fn load(config_file: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        let config_path = match config_file {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound { path });
                }
                Some(path)
            }
            None => Self::default_config_path().filter(|path| path.exists()),
        };

        if let Some(path) = config_path {
            log::debug!("Loading configuration from {}", path.display());
            let contents =
                tokio::fs::read_to_string(&path)
                    .await
                    .map_err(|e| ConfigError::Read {
                        path: path.clone(),
                        message: e.to_string(),
                    })?;
            config.apply_toml_str(&contents)?;
        }

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("Scanwrap").join("scanwrap.toml"))
    }

    pub fn apply_toml_str(&mut self, contents: &str) -> ConfigResult<()> {
        let table = toml::from_str::<toml::Table>(contents).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        self.apply_toml_values(&table)
    }

    /// Apply TOML configuration values
    pub fn apply_toml_values(&mut self, config: &toml::Table) -> ConfigResult<()> {
        if let Some(url) = string_value(config, "webhook-url")? {
            self.webhook_url = non_empty(url);
        }
        if let Some(url) = string_value(config, "portal-url")? {
            self.portal_url = url;
        }
        if let Some(secs) = positive_integer(config, "webhook-timeout-secs")? {
            self.webhook_timeout = Duration::from_secs(secs);
        }
        if let Some(agent) = string_value(config, "user-agent")? {
            self.user_agent = agent;
        }
        if let Some(value) = config.get("presets") {
            // Single string or array of strings
            let presets: Vec<String> = if let Some(preset) = value.as_str() {
                vec![preset.to_string()]
            } else if let Some(array) = value.as_array() {
                array
                    .iter()
                    .filter_map(|item| item.as_str())
                    .map(str::to_string)
                    .collect()
            } else {
                return Err(ConfigError::invalid(
                    "presets",
                    "expected a string or an array of strings",
                ));
            };
            self.presets = presets
                .into_iter()
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect();
        }
        if let Some(limit) = positive_integer(config, "default-list-limit")? {
            self.default_list_limit = limit as usize;
        }
        if let Some(secs) = positive_integer(config, "poll-interval-secs")? {
            self.poll_policy
                .get_or_insert_with(PollPolicy::default)
                .interval = Duration::from_secs(secs);
        }
        if let Some(attempts) = positive_integer(config, "poll-max-attempts")? {
            self.poll_policy
                .get_or_insert_with(PollPolicy::default)
                .max_attempts = attempts as usize;
        }
        if let Some(level) = string_value(config, "log-level")? {
            self.log_level = Some(level);
        }
        if let Some(format) = string_value(config, "log-format")? {
            self.log_format = Some(format);
        }
        if let Some(log_file) = string_value(config, "log-file")? {
            if log_file.eq_ignore_ascii_case("none") || log_file == "-" {
                self.log_file = None;
            } else {
                self.log_file = Some(PathBuf::from(log_file));
            }
        }
        if let Some(color) = config.get("color") {
            let color = color
                .as_bool()
                .ok_or_else(|| ConfigError::invalid("color", "expected true or false"))?;
            self.color = Some(color);
        }
        Ok(())
    }

    /// Apply environment overrides through `lookup`
    pub fn apply_env_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> ConfigResult<()> {
        if let Some(url) = lookup(ENV_WEBHOOK_URL) {
            self.webhook_url = non_empty(url);
        }
        if let Some(url) = lookup(ENV_PORTAL_URL).and_then(non_empty) {
            self.portal_url = url;
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL).and_then(non_empty) {
            self.log_level = Some(level);
        }
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(url) = &self.webhook_url {
            validate_http_url("webhook-url", url)
                .map_err(|e| ConfigError::invalid("webhook-url", e.message()))?;
        }
        validate_http_url("portal-url", &self.portal_url)
            .map_err(|e| ConfigError::invalid("portal-url", e.message()))?;
        if let Some(level) = &self.log_level {
            if !LOG_LEVELS.contains(&level.as_str()) {
                return Err(ConfigError::invalid(
                    "log-level",
                    format!("'{}' is not one of {}", level, LOG_LEVELS.join(", ")),
                ));
            }
        }
        if let Some(format) = &self.log_format {
            if !LOG_FORMATS.contains(&format.as_str()) {
                return Err(ConfigError::invalid(
                    "log-format",
                    format!("'{}' is not one of {}", format, LOG_FORMATS.join(", ")),
                ));
            }
        }
        Ok(())
    }

    /// Portal base URL without a trailing slash
    pub fn portal_base(&self) -> &str {
        self.portal_url.trim_end_matches('/')
    }

    /// Start logging as configured; colour defaults to whether stderr is a terminal
    pub fn init_logging(&self) -> Result<(), Box<dyn std::error::Error>> {
        let color = self
            .color
            .unwrap_or_else(|| std::io::IsTerminal::is_terminal(&std::io::stderr()));
        crate::core::logging::init_logging(
            self.log_level.as_deref(),
            self.log_format.as_deref(),
            self.log_file.as_deref().and_then(Path::to_str),
            color,
        )
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn string_value(config: &toml::Table, key: &str) -> ConfigResult<Option<String>> {
    match config.get(key) {
        None => Ok(None),
        Some(value) => value
            .as_str()
            .map(|s| Some(s.to_string()))
            .ok_or_else(|| ConfigError::invalid(key, "expected a string")),
    }
}

fn positive_integer(config: &toml::Table, key: &str) -> ConfigResult<Option<u64>> {
    match config.get(key) {
        None => Ok(None),
        Some(value) => match value.as_integer() {
            Some(n) if n > 0 => Ok(Some(n as u64)),
            _ => Err(ConfigError::invalid(key, "expected a positive integer")),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.webhook_url, None);
        assert_eq!(config.webhook_timeout, Duration::from_secs(30));
        assert_eq!(config.presets, vec!["K-Web", "K-API", "K-Mobile"]);
        assert_eq!(config.default_list_limit, 20);
        assert!(config.user_agent.starts_with("scanwrap/"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_apply_toml_values() {
        let mut config = ServiceConfig::default();
        config
            .apply_toml_str(
                r#"
                webhook-url = "https://hooks.example.com/scans"
                portal-url = "https://eu.ast.example.net/"
                webhook-timeout-secs = 10
                presets = ["K-Web", " ", "Custom"]
                default-list-limit = 50
                poll-interval-secs = 5
                poll-max-attempts = 12
                log-level = "debug"
                log-format = "json"
                log-file = "none"
                color = false
                "#,
            )
            .unwrap();

        assert_eq!(
            config.webhook_url.as_deref(),
            Some("https://hooks.example.com/scans")
        );
        assert_eq!(config.portal_base(), "https://eu.ast.example.net");
        assert_eq!(config.webhook_timeout, Duration::from_secs(10));
        assert_eq!(config.presets, vec!["K-Web", "Custom"]);
        assert_eq!(config.default_list_limit, 50);
        assert_eq!(
            config.poll_policy,
            Some(PollPolicy {
                interval: Duration::from_secs(5),
                max_attempts: 12
            })
        );
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.log_file, None);
        assert_eq!(config.color, Some(false));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_poll_settings_fill_from_defaults() {
        let mut config = ServiceConfig::default();
        assert_eq!(config.poll_policy, None);

        config.apply_toml_str("poll-max-attempts = 1").unwrap();
        assert_eq!(
            config.poll_policy,
            Some(PollPolicy {
                max_attempts: 1,
                ..PollPolicy::default()
            })
        );
    }

    #[test]
    fn test_single_preset_string() {
        let mut config = ServiceConfig::default();
        config.apply_toml_str(r#"presets = "K-API""#).unwrap();
        assert_eq!(config.presets, vec!["K-API"]);
    }

    #[test]
    fn test_rejects_wrong_types() {
        let mut config = ServiceConfig::default();
        let err = config
            .apply_toml_str("webhook-timeout-secs = 0")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "webhook-timeout-secs"));

        let err = config.apply_toml_str("color = \"yes\"").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));

        let err = config.apply_toml_str("not toml at all =").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = ServiceConfig::default();
        config.webhook_url = Some("ftp://hooks.example.com".to_string());
        assert!(config.validate().is_err());

        let mut config = ServiceConfig::default();
        config.log_level = Some("loud".to_string());
        assert!(config.validate().is_err());

        let mut config = ServiceConfig::default();
        config.log_format = Some("xml".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides_win() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_WEBHOOK_URL, "https://ci.example.com/hook"),
            (ENV_LOG_LEVEL, "warn"),
        ]);
        let mut config = ServiceConfig::default();
        config
            .apply_toml_str(r#"webhook-url = "https://file.example.com/hook""#)
            .unwrap();
        config
            .apply_env_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(
            config.webhook_url.as_deref(),
            Some("https://ci.example.com/hook")
        );
        assert_eq!(config.log_level.as_deref(), Some("warn"));
    }

    #[test]
    fn test_blank_env_webhook_clears_destination() {
        let mut config = ServiceConfig::default();
        config.webhook_url = Some("https://file.example.com/hook".to_string());
        config
            .apply_env_overrides(|key| (key == ENV_WEBHOOK_URL).then(|| "  ".to_string()))
            .unwrap();
        assert_eq!(config.webhook_url, None);
    }

    #[tokio::test]
    async fn test_load_missing_explicit_file_fails() {
        let result = ServiceConfig::load(Some(PathBuf::from("/non/existent/scanwrap.toml"))).await;
        assert!(matches!(result, Err(ConfigError::NotFound { .. })));
    }

    #[tokio::test]
    #[serial]
    async fn test_load_from_file_and_environment() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "webhook-url = \"https://file.example.com/hook\"").unwrap();
        writeln!(file, "log-format = \"ext\"").unwrap();

        std::env::set_var(ENV_PORTAL_URL, "https://portal.example.com");
        let result = ServiceConfig::load(Some(file.path().to_path_buf())).await;
        std::env::remove_var(ENV_PORTAL_URL);

        let config = result.unwrap();
        assert_eq!(config.portal_url, "https://portal.example.com");
        assert_eq!(config.log_format.as_deref(), Some("ext"));
        if std::env::var(ENV_WEBHOOK_URL).is_err() {
            assert_eq!(
                config.webhook_url.as_deref(),
                Some("https://file.example.com/hook")
            );
        }
    }
}
