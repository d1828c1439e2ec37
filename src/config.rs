//! Configuration file parsing for mutation testing

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::MutationError;
use crate::harness::DEFAULT_FAILURE_MARKER;

/// Top-level configuration structure
///
/// Every field has a default, so running without a config file is the same
/// as loading an empty one.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub settings: Settings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            settings: Settings::default(),
        }
    }
}

fn default_version() -> String {
    "1.0".to_string()
}

/// Global settings for mutation testing
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Timeout in seconds for each harness step; unset means wait forever
    #[serde(default)]
    pub timeout: Option<u64>,
    /// Prefix of the last output line that marks a test failure
    #[serde(default = "default_failure_marker")]
    pub failure_marker: String,
    /// Run the unmutated sources through the harness first
    #[serde(default = "default_baseline")]
    pub baseline: bool,
    #[serde(default)]
    pub harness: HarnessConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timeout: None,
            failure_marker: default_failure_marker(),
            baseline: default_baseline(),
            harness: HarnessConfig::default(),
        }
    }
}

impl Settings {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }
}

fn default_failure_marker() -> String {
    DEFAULT_FAILURE_MARKER.to_string()
}

fn default_baseline() -> bool {
    true
}

fn default_edition() -> String {
    "2021".to_string()
}

/// How the test suite is built and run
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum HarnessConfig {
    /// `rustc --test <first test file>`, then run the binary
    Rustc {
        #[serde(default = "default_edition")]
        edition: String,
    },
    /// Any command, run in the workspace
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

impl Default for HarnessConfig {
    fn default() -> Self {
        HarnessConfig::Rustc {
            edition: default_edition(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self, MutationError> {
        let content = std::fs::read_to_string(path).map_err(|e| MutationError::ConfigError {
            message: format!("Failed to read config file '{}': {}", path.display(), e),
        })?;

        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| MutationError::ConfigError {
                message: format!("Failed to parse config file '{}': {}", path.display(), e),
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make every trial meaningless
    pub fn validate(&self) -> Result<(), MutationError> {
        let settings = &self.settings;

        if settings.failure_marker.trim().is_empty() {
            return Err(MutationError::ConfigError {
                message: "failure_marker must not be empty".to_string(),
            });
        }

        if settings.timeout == Some(0) {
            return Err(MutationError::ConfigError {
                message: "timeout must be at least 1 second".to_string(),
            });
        }

        if let HarnessConfig::Command { program, .. } = &settings.harness {
            if program.trim().is_empty() {
                return Err(MutationError::ConfigError {
                    message: "harness program must not be empty".to_string(),
                });
            }
        }

        Ok(())
    }
}
