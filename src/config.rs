// src/config.rs

use crate::logging::{PROJECT_NAME, project_directory};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use strum::{Display, EnumString};
use tracing::{debug, info};
use url::Url;

pub const SETTINGS_FILE: &str = "settings.yaml";

/// Upper bound of the simulated per-tick progress step.
pub const MAX_TICK_INCREMENT: u8 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not parse settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid setting `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Which progress source drives scans.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ProgressMode {
    #[default]
    Simulated,
    Backend,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BackendSettings {
    pub url: String,
    pub timeout_ms: u64,
    /// Extra attempts after a transport error or 5xx. Zero means no retry.
    pub retries: u32,
    /// Delay before the first retry, doubled for each further attempt.
    pub backoff_ms: u64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:8000/fullscan".to_string(),
            timeout_ms: 30_000,
            retries: 0,
            backoff_ms: 500,
        }
    }
}

impl BackendSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn backoff_for(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.backoff_ms.saturating_mul(1u64 << attempt.min(16)))
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub progress_source: ProgressMode,
    pub tick_interval_ms: u64,
    pub max_increment: u8,
    pub backend: BackendSettings,
    pub export_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            progress_source: ProgressMode::Simulated,
            tick_interval_ms: 800,
            max_increment: MAX_TICK_INCREMENT,
            backend: BackendSettings::default(),
            export_dir: None,
        }
    }
}

impl Settings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Loads settings from an explicit path, the `<PROJECT>_CONFIG` path, or
    /// `settings.yaml` in the platform config dir, then applies env overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(format!("{}_CONFIG", PROJECT_NAME.as_str())).map(PathBuf::from));

        let mut settings = match explicit {
            Some(path) => Self::from_file(&path)?,
            None => match default_settings_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => {
                    debug!("No settings file found, using defaults.");
                    Self::default()
                }
            },
        };

        settings.apply_overrides(|key| std::env::var(format!("{}_{}", PROJECT_NAME.as_str(), key)).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_yaml(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "Loaded settings file.");
        Ok(settings)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
    }

    /// Applies `BACKEND_URL` and `PROGRESS` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("BACKEND_URL") {
            debug!(url = %url, "Backend URL overridden from environment.");
            self.backend.url = url;
        }
        if let Some(mode) = lookup("PROGRESS") {
            self.progress_source = mode.parse().map_err(|_| ConfigError::Invalid {
                key: "progress_source",
                reason: format!("unknown mode '{}', expected 'simulated' or 'backend'", mode),
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "tick_interval_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if !(1..=MAX_TICK_INCREMENT).contains(&self.max_increment) {
            return Err(ConfigError::Invalid {
                key: "max_increment",
                reason: format!("must be between 1 and {}", MAX_TICK_INCREMENT),
            });
        }
        if self.backend.timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "backend.timeout_ms",
                reason: "a deadline is required".to_string(),
            });
        }
        Url::parse(&self.backend.url).map_err(|e| ConfigError::Invalid {
            key: "backend.url",
            reason: e.to_string(),
        })?;
        Ok(())
    }
}

pub fn default_settings_path() -> Option<PathBuf> {
    project_directory().map(|dirs| dirs.config_dir().join(SETTINGS_FILE))
}
