//! # Process Configuration
//!
//! One JSON configuration file with defaulted sections. Every knob has a
//! default so an absent file boots a development instance; `validate()`
//! rejects configurations the runtime could not honor.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::broadcast::BroadcastConfig;
use crate::http_server::HttpServerConfig;
use crate::rules::RuleSources;

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub rules: RulesConfig,

    #[serde(default)]
    pub http: HttpServerConfig,

    #[serde(default)]
    pub broadcast: BroadcastConfig,

    #[serde(default)]
    pub actions: ActionLogConfig,
}

/// Rule engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Directories scanned non-recursively for rule resources
    #[serde(default = "default_rules_dirs")]
    pub dirs: Vec<PathBuf>,

    /// Explicit rule resource paths loaded after the directories
    #[serde(default)]
    pub files: Vec<PathBuf>,

    /// Upper bound on forward-chaining passes per evaluation
    #[serde(default = "default_max_cycles")]
    pub max_cycles: u32,

    /// Name stamped on every loaded KnowledgeBase
    #[serde(default = "default_knowledge_base")]
    pub knowledge_base: String,
}

fn default_rules_dirs() -> Vec<PathBuf> {
    vec![PathBuf::from("./rules")]
}

fn default_max_cycles() -> u32 {
    100
}

fn default_knowledge_base() -> String {
    "battlefield".to_string()
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            dirs: default_rules_dirs(),
            files: Vec::new(),
            max_cycles: default_max_cycles(),
            knowledge_base: default_knowledge_base(),
        }
    }
}

impl RulesConfig {
    pub fn sources(&self) -> RuleSources {
        RuleSources {
            dirs: self.dirs.clone(),
            files: self.files.clone(),
        }
    }
}

/// Action history configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLogConfig {
    /// Ring bound for the action history; 0 keeps everything
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_history_limit() -> usize {
    1024
}

impl Default for ActionLogConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
        }
    }
}

impl Config {
    /// Load configuration from file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;

        let config: Config = serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load the file when present, otherwise boot with defaults.
    pub fn load_or_default(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            info!(path = %path.display(), "config file not found, using defaults");
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.rules.dirs.is_empty() && self.rules.files.is_empty() {
            return Err(ConfigError::Invalid(
                "no rule sources configured".to_string(),
            ));
        }
        if self.rules.max_cycles == 0 {
            return Err(ConfigError::Invalid(
                "rules.max_cycles must be at least 1".to_string(),
            ));
        }
        if self.broadcast.connection_queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "broadcast.connection_queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.broadcast.relay_queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "broadcast.relay_queue_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.rules.max_cycles, 100);
        assert_eq!(config.actions.history_limit, 1024);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("skywarden.json");
        fs::write(
            &path,
            r#"{
                "rules": { "dirs": ["./my-rules"], "max_cycles": 25 },
                "http": { "port": 9000 }
            }"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.rules.dirs, vec![PathBuf::from("./my-rules")]);
        assert_eq!(config.rules.max_cycles, 25);
        assert_eq!(config.rules.knowledge_base, "battlefield");
        assert_eq!(config.http.port, 9000);
        assert_eq!(config.broadcast.bind_addr, "0.0.0.0:9001");
    }

    #[test]
    fn test_zero_max_cycles_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("skywarden.json");
        fs::write(&path, r#"{"rules": {"max_cycles": 0}}"#).unwrap();

        assert!(matches!(
            Config::load(&path),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_or_default(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config.http.port, 8080);
    }

    #[test]
    fn test_malformed_file_names_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("skywarden.json");
        fs::write(&path, "{ nope").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("skywarden.json"));
    }
}
