use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RoutingError};
use crate::matching::RegexLimits;

/// Routing core configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Database configuration
    pub database: DatabaseConfig,

    /// Match evaluation bounds
    pub matching: MatchingConfig,

    /// Mailbox poll scheduling
    pub polling: PollingConfig,

    /// Logging configuration
    pub logging: LogSettings,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// sqlx connection URL, e.g. `sqlite://routing.db?mode=rwc` or `sqlite::memory:`
    pub database_url: String,

    /// Maximum pooled connections
    pub max_connections: u32,
}

/// Bounds applied to `Regex` match rules.
///
/// Exceeding any of them is treated like a malformed pattern: the rule does
/// not match.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Maximum compiled program size in bytes
    pub regex_size_limit: usize,

    /// Maximum lazy DFA cache size in bytes
    pub regex_dfa_size_limit: usize,

    /// Fields longer than this (in bytes) are not searched
    pub max_regex_input_len: usize,
}

/// Mailbox poll scheduling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// How often the scheduler re-checks which mailboxes are due (seconds)
    pub tick_interval_secs: u64,

    /// Poll interval given to new mailboxes that do not specify one (minutes)
    pub default_interval_minutes: u32,
}

/// Logging configuration as it appears in the config file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Level name: trace, debug, info, warn or error
    pub level: String,

    /// Emit JSON lines instead of human readable output
    pub json: bool,
}

impl RoutingConfig {
    /// Load configuration from a TOML file. Missing sections use defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| RoutingError::config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)
            .map_err(|e| RoutingError::config(format!("invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration for consistency
    pub fn validate(&self) -> Result<()> {
        if self.database.database_url.trim().is_empty() {
            return Err(RoutingError::config("database_url cannot be empty"));
        }
        if self.database.max_connections == 0 {
            return Err(RoutingError::config("max_connections must be greater than 0"));
        }
        if self.matching.regex_size_limit == 0 || self.matching.regex_dfa_size_limit == 0 {
            return Err(RoutingError::config("regex size limits must be greater than 0"));
        }
        if self.matching.max_regex_input_len == 0 {
            return Err(RoutingError::config("max_regex_input_len must be greater than 0"));
        }
        if self.polling.tick_interval_secs == 0 {
            return Err(RoutingError::config("tick_interval_secs must be greater than 0"));
        }
        if self.polling.default_interval_minutes == 0 {
            return Err(RoutingError::config("default_interval_minutes must be greater than 0"));
        }
        crate::logging::parse_log_level(&self.logging.level)?;
        Ok(())
    }
}

impl MatchingConfig {
    /// Regex limits derived from this configuration
    pub fn regex_limits(&self) -> RegexLimits {
        RegexLimits {
            size_limit: self.regex_size_limit,
            dfa_size_limit: self.regex_dfa_size_limit,
            max_input_len: self.max_regex_input_len,
        }
    }
}

impl PollingConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://routing.db?mode=rwc".to_string(),
            max_connections: 5,
        }
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        let limits = RegexLimits::default();
        Self {
            regex_size_limit: limits.size_limit,
            regex_dfa_size_limit: limits.dfa_size_limit,
            max_regex_input_len: limits.max_input_len,
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: 60,
            default_interval_minutes: 5,
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = RoutingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.polling.tick_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = RoutingConfig::from_toml_str(
            r#"
            [database]
            database_url = "sqlite::memory:"

            [matching]
            max_regex_input_len = 1024
            "#,
        )
        .unwrap();

        assert_eq!(config.database.database_url, "sqlite::memory:");
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.matching.max_regex_input_len, 1024);
        assert_eq!(config.matching.regex_limits().max_input_len, 1024);
        assert_eq!(config.polling.default_interval_minutes, 5);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = RoutingConfig::from_toml_str("[polling]\ntick_interval_secs = 0\n").unwrap_err();
        assert!(matches!(err, RoutingError::Config(_)));

        let err = RoutingConfig::from_toml_str("[logging]\nlevel = \"loud\"\n").unwrap_err();
        assert!(matches!(err, RoutingError::Config(_)));

        let err = RoutingConfig::from_toml_str("[database\n").unwrap_err();
        assert!(matches!(err, RoutingError::Config(_)));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("routing.toml");
        std::fs::write(&path, "[polling]\ndefault_interval_minutes = 15\n").unwrap();

        let config = RoutingConfig::from_file(&path).unwrap();
        assert_eq!(config.polling.default_interval_minutes, 15);

        let missing = RoutingConfig::from_file(dir.path().join("missing.toml"));
        assert!(matches!(missing, Err(RoutingError::Config(_))));
    }
}
