//! Configuration Management
//!
//! Handles persistent configuration storage for tdfarm.

use crate::aws::auth;
use crate::sweep::{SweepOptions, DEFAULT_CONCURRENCY};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid AWS region: {0}")]
    InvalidRegion(String),

    #[error("No config directory available on this platform")]
    NoConfigDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Sweep defaults
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SweepConfig {
    /// Regions to sweep when none are given on the command line
    #[serde(default)]
    pub regions: Vec<String>,
    #[serde(default)]
    pub allow_failures: bool,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default)]
    pub name_prefix: Option<String>,
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            regions: Vec::new(),
            allow_failures: false,
            concurrency: DEFAULT_CONCURRENCY,
            name_prefix: None,
        }
    }
}

impl SweepConfig {
    pub fn to_options(&self) -> SweepOptions {
        SweepOptions {
            run: Vec::new(),
            allow_failures: self.allow_failures,
            concurrency: self.concurrency.max(1),
            name_prefix: self.name_prefix.clone(),
        }
    }
}

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Last used region
    #[serde(default)]
    pub region: Option<String>,
    /// Named AWS profile
    #[serde(default)]
    pub profile: Option<String>,
    /// Endpoint override (local emulators)
    #[serde(default)]
    pub endpoint_url: Option<String>,
    /// Attempts per remote call, including the first
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub sweep: SweepConfig,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("tdfarm").join("config.json"))
    }

    /// Load configuration from disk
    ///
    /// A missing or unreadable file yields the defaults.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        Self::load_from(&path).unwrap_or_else(|e| {
            tracing::warn!("Ignoring config at {:?}: {}", path, e);
            Self::default()
        })
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::config_path().ok_or(ConfigError::NoConfigDir)?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        // Create parent directory
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Get effective region (CLI > config > environment/AWS config > default)
    pub fn effective_region(&self, cli: Option<&str>) -> String {
        cli.map(str::to_string)
            .or_else(|| self.region.clone())
            .or_else(auth::get_default_region)
            .unwrap_or_else(|| auth::DEFAULT_REGION.to_string())
    }

    /// Get effective profile (CLI > config > AWS_PROFILE)
    pub fn effective_profile(&self, cli: Option<&str>) -> Option<String> {
        cli.map(str::to_string)
            .or_else(|| self.profile.clone())
            .or_else(auth::get_default_profile)
    }

    /// Regions a sweep covers when none are named explicitly
    /// (CLI region > configured sweep regions > effective region)
    pub fn sweep_regions(&self, cli: Option<&str>) -> Vec<String> {
        if let Some(region) = cli {
            return vec![region.to_string()];
        }
        if self.sweep.regions.is_empty() {
            vec![self.effective_region(cli)]
        } else {
            self.sweep.regions.clone()
        }
    }

    /// Set region without saving
    pub fn set_region(&mut self, region: &str) -> Result<(), ConfigError> {
        if !auth::validate_region(region) {
            return Err(ConfigError::InvalidRegion(region.to_string()));
        }
        self.region = Some(region.to_string());
        Ok(())
    }
}
