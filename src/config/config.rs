//! TOML configuration parsing and management.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{RegError, RegResult};
use crate::executor::{DEFAULT_PROGRAM, DEFAULT_SHELL};
use crate::options::{ClientOptions, Format, View, VALUES_KEY};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub defaults: DefaultsConfig,
    pub execution: ExecutionConfig,
    pub logging: LoggingConfig,
}

/// Client wide option defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub lowercase: bool,
    pub format: Format,
    /// Registry view in bits, 32 or 64.
    pub view: Option<u64>,
    pub values_key: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            lowercase: true,
            format: Format::Simple,
            view: None,
            values_key: VALUES_KEY.to_string(),
        }
    }
}

/// Process execution configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub program: String,
    pub shell: String,
    pub timeout_seconds: Option<u64>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            shell: DEFAULT_SHELL.to_string(),
            timeout_seconds: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Markdown command log, disabled when absent.
    pub log_file: Option<PathBuf>,
    pub log_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_file: None,
            log_level: "INFO".to_string(),
        }
    }
}

impl Configuration {
    /// Client defaults described by the `[defaults]` table.
    pub fn client_options(&self) -> RegResult<ClientOptions> {
        let view = match self.defaults.view {
            None => None,
            Some(bits) => Some(View::from_bits(bits).ok_or_else(|| {
                RegError::config(format!("Invalid view: {}, use 32 or 64", bits))
            })?),
        };
        Ok(ClientOptions {
            lowercase: self.defaults.lowercase,
            format: self.defaults.format,
            view,
            values_key: self.defaults.values_key.clone(),
        })
    }
}

/// Loads and manages TOML configuration.
#[derive(Debug)]
pub struct ConfigurationLoader {
    pub config_path: PathBuf,
    pub config: Configuration,
}

impl ConfigurationLoader {
    /// Initialize configuration loader.
    ///
    /// # Arguments
    /// * `config_path` - Path to TOML config file. If None or missing, uses default config.
    pub fn new(config_path: Option<&Path>) -> Result<Self> {
        let config_path = config_path
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("config/regkit.toml"));

        let config = if config_path.exists() {
            Self::load_config(&config_path)?
        } else {
            Configuration::default()
        };

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Create a configuration loader from a pre-parsed Configuration.
    pub fn from_config(config: Configuration) -> Self {
        Self {
            config_path: PathBuf::from("config/regkit.toml"),
            config,
        }
    }

    /// Load configuration from TOML file.
    fn load_config(path: &Path) -> Result<Configuration> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path.display()))
    }

    /// Client defaults of the loaded configuration.
    pub fn client_options(&self) -> RegResult<ClientOptions> {
        self.config.client_options()
    }

    /// Get configuration value by dot-notation key.
    pub fn get_string(&self, key: &str) -> Option<String> {
        match key {
            "defaults.format" => Some(
                match self.config.defaults.format {
                    Format::Simple => "simple",
                    Format::Complex => "complex",
                }
                .to_string(),
            ),
            "defaults.values_key" => Some(self.config.defaults.values_key.clone()),
            "execution.program" => Some(self.config.execution.program.clone()),
            "execution.shell" => Some(self.config.execution.shell.clone()),
            "logging.log_file" => self
                .config
                .logging
                .log_file
                .as_ref()
                .map(|p| p.to_string_lossy().to_string()),
            "logging.log_level" => Some(self.config.logging.log_level.clone()),
            _ => None,
        }
    }

    /// Get numeric configuration value.
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        match key {
            "defaults.view" => self.config.defaults.view,
            "execution.timeout_seconds" => self.config.execution.timeout_seconds,
            _ => None,
        }
    }

    /// Get boolean configuration value.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match key {
            "defaults.lowercase" => Some(self.config.defaults.lowercase),
            _ => None,
        }
    }
}
