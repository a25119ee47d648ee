use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid engine configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Package substrings identifying application frames.
    pub app_packages: Vec<String>,
    /// Maximum number of application frames kept per event.
    pub app_frame_limit: usize,
    /// Trailing window in which an identical event is suppressed.
    pub dedup_window_ms: u64,
    /// Remove ANSI colour codes before classifying a line.
    pub strip_ansi: bool,
}

impl EngineConfig {
    /// Load engine configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            app_packages: std::env::var("DETECTOR_APP_PACKAGES")
                .ok()
                .map(|s| parse_package_list(&s))
                .filter(|list| !list.is_empty())
                .unwrap_or(defaults.app_packages),
            app_frame_limit: std::env::var("DETECTOR_APP_FRAME_LIMIT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.app_frame_limit),
            dedup_window_ms: std::env::var("DETECTOR_DEDUP_WINDOW_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.dedup_window_ms),
            strip_ansi: std::env::var("DETECTOR_STRIP_ANSI")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.strip_ansi),
        }
    }

    /// Validate engine configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.app_packages.iter().all(|p| p.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "app_packages must contain at least one non-empty package".to_string(),
            ));
        }
        if self.app_frame_limit == 0 {
            return Err(ConfigError::Invalid("app_frame_limit must be > 0".to_string()));
        }
        if self.dedup_window_ms == 0 {
            return Err(ConfigError::Invalid("dedup_window_ms must be > 0".to_string()));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            app_packages: vec![
                "com.example".to_string(),
                "com.myapp".to_string(),
                "com.mycompany".to_string(),
            ],
            app_frame_limit: 5,
            dedup_window_ms: 2000,
            strip_ansi: true,
        }
    }
}

/// Split a comma-separated package list, dropping blanks.
pub fn parse_package_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}
