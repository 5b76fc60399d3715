//! Configuration management for wmipf
//!
//! Every setting has a built-in default, so the tool runs without a config
//! file. A TOML file and `WMIPF_SECTION__KEY` environment variables can
//! override the defaults.

use crate::error::{Result, WmipfError};
use crate::window::DEFAULT_WINDOW_DEPTH;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod validator;

pub use validator::ConfigValidator;

/// Schema version understood by this build
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
}

/// Scanner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Units joined into one window
    pub window_depth: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            window_depth: DEFAULT_WINDOW_DEPTH,
        }
    }
}

/// How binding ids are compared against the benign allow-list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BenignMatch {
    /// Binding id equals an allow-list entry
    Exact,
    /// Binding id contains an allow-list entry anywhere
    Contains,
}

impl std::str::FromStr for BenignMatch {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "exact" => Ok(Self::Exact),
            "contains" => Ok(Self::Contains),
            other => Err(format!("expected 'exact' or 'contains', got '{}'", other)),
        }
    }
}

/// Report configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Binding ids shipped by Windows or common software
    pub benign_bindings: Vec<String>,
    pub benign_match: BenignMatch,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            benign_bindings: vec![
                "BVTConsumer-BVTFilter".to_string(),
                "SCM Event Log Consumer-SCM Event Log Filter".to_string(),
            ],
            benign_match: BenignMatch::Exact,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(WmipfError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| WmipfError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides();

        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| WmipfError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Apply environment variable overrides
    /// Environment variables in format: WMIPF_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(std::env::vars());
    }

    /// Apply overrides from arbitrary key/value pairs (`WMIPF_` prefix required)
    pub fn apply_overrides(&mut self, vars: impl IntoIterator<Item = (String, String)>) {
        for (key, value) in vars {
            if let Some(config_key) = key.strip_prefix("WMIPF_") {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "SCAN__WINDOW_DEPTH" => {
                self.scan.window_depth =
                    value.parse().map_err(|_| WmipfError::InvalidConfigValue {
                        path: path.to_string(),
                        message: format!("Cannot parse '{}' as an integer", value),
                    })?;
            }
            "REPORT__BENIGN_MATCH" => {
                self.report.benign_match =
                    value
                        .parse()
                        .map_err(|message| WmipfError::InvalidConfigValue {
                            path: path.to_string(),
                            message,
                        })?;
            }
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| WmipfError::Config("Cannot determine config directory".to_string()))?;

        Ok(config_dir.join("wmipf").join("config.toml"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            meta: MetaConfig {
                schema_version: SCHEMA_VERSION.to_string(),
            },
            scan: ScanConfig::default(),
            report: ReportConfig::default(),
        }
    }
}
