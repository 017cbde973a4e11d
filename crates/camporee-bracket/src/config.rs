//! Configuration loading for a Camporee scoring station.
//!
//! The configuration lives in `camporee-config.yaml` next to the binary.
//! Every field is optional; a missing file means "all defaults". A few
//! deployment-specific values may be overridden from the environment.

use std::path::{Path, PathBuf};

use camporee_types::JudgeInfo;
use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level station configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CamporeeConfig {
    /// Where bracket documents, the queue and the roster live.
    #[serde(default)]
    pub storage: StorageConfig,

    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerSettings,

    /// Log level and format.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Identity stamped on every score packet from this station.
    #[serde(default)]
    pub judge: JudgeInfo,
}

impl CamporeeConfig {
    /// Load configuration from a YAML file, then apply env overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Load from `path` if it exists, otherwise start from defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file exists but cannot be parsed.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Parse configuration from a YAML string, then apply env overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Override fields from `CAMPOREE_DATA_DIR`, `CAMPOREE_ROSTER` and
    /// `CAMPOREE_PORT` when set. An unparseable port is ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("CAMPOREE_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("CAMPOREE_ROSTER") {
            self.storage.roster_path = PathBuf::from(val);
        }
        if let Some(port) = std::env::var("CAMPOREE_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.server.port = port;
        }
    }

    /// The judge identity, or `None` when nothing is filled in.
    pub fn judge_identity(&self) -> Option<JudgeInfo> {
        (!self.judge.is_empty()).then(|| self.judge.clone())
    }
}

/// Storage locations.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageConfig {
    /// Directory holding `brackets/` and `queue.json`.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Roster file: a JSON array of entities.
    #[serde(default = "default_roster_path")]
    pub roster_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            roster_path: default_roster_path(),
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSettings {
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_roster_path() -> PathBuf {
    PathBuf::from("data/roster.json")
}

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = CamporeeConfig::default();
        assert_eq!(config.storage.data_dir, PathBuf::from("data"));
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
        assert!(config.judge_identity().is_none());
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
storage:
  data_dir: "/var/lib/camporee"
  roster_path: "/etc/camporee/roster.json"

server:
  host: "127.0.0.1"
  port: 8088

logging:
  level: "debug"
  json: true

judge:
  name: "Pat Smith"
  email: "pat@example.org"
  unit: "Troop 55"
"#;
        let config: CamporeeConfig = serde_yml::from_str(yaml).unwrap_or_default();
        assert_eq!(config.storage.data_dir, PathBuf::from("/var/lib/camporee"));
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8088);
        assert!(config.logging.json);
        assert_eq!(
            config.judge_identity().map(|j| j.unit),
            Some(String::from("Troop 55"))
        );
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let config: CamporeeConfig =
            serde_yml::from_str("logging:\n  level: warn\n").unwrap_or_default();
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.storage.roster_path, PathBuf::from("data/roster.json"));
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        let result = CamporeeConfig::parse("server: [unclosed");
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let result = CamporeeConfig::from_file(Path::new("/nonexistent/camporee-config.yaml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
