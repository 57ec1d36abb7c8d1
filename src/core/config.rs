//! Configuration management

use crate::core::error::{Error, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Global configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub runner: RunnerConfig,
    pub instrument: InstrumentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Interpreter used to execute instrumented programs
    pub program: String,
    /// Extra arguments placed before the script path
    pub args: Vec<String>,
    /// Wall-clock budget for one run (seconds)
    pub timeout_secs: u64,
    /// Where instrumented scripts are written (default: `<home>/scratch`)
    pub scratch_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentConfig {
    /// Emit the one-time variable location dump at program start
    pub emit_locations: bool,
    /// Fail `run` when the program printed no instrumentation at all
    pub require_instrumentation: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            runner: RunnerConfig::default(),
            instrument: InstrumentConfig::default(),
        }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            program: "node".to_string(),
            args: vec![],
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            scratch_dir: None,
        }
    }
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            emit_locations: true,
            require_instrumentation: true,
        }
    }
}

impl Config {
    /// Load configuration from default location
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit file, falling back to defaults when absent
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let home = Self::stepwise_home()?;
        Ok(home.join("config.toml"))
    }

    /// Get the stepwise home directory
    pub fn stepwise_home() -> Result<PathBuf> {
        // Check STEPWISE_HOME env var first
        if let Ok(home) = std::env::var("STEPWISE_HOME") {
            return Ok(PathBuf::from(home));
        }

        // Use XDG directories
        ProjectDirs::from("dev", "stepwise", "stepwise")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or_else(|| Error::ConfigError {
                message: "Could not determine stepwise home directory".to_string(),
            })
    }

    /// Directory for instrumented scripts handed to the runner
    pub fn scratch_dir(&self) -> Result<PathBuf> {
        match &self.runner.scratch_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(Self::stepwise_home()?.join("scratch")),
        }
    }

    /// Ensure the scratch directory exists and return it
    pub fn ensure_scratch_dir(&self) -> Result<PathBuf> {
        let dir = self.scratch_dir()?;
        if !dir.exists() {
            std::fs::create_dir_all(&dir)?;
        }
        Ok(dir)
    }
}

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
