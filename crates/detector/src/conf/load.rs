//! Load — config loading from file and environment variables.

use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use engine::config::parse_package_list;
use engine::EngineConfig;

use super::model::{AnalyzerConfig, DetectorConfig, WatchConfig};

impl DetectorConfig {
    /// Load configuration from file or environment variables
    /// Priority: Environment Variables > Config File > Defaults
    pub fn load() -> Result<Self> {
        // .env is optional
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {}", path.display());
        }

        let config_path = std::env::var("DETECTOR_CONFIG_FILE")
            .unwrap_or_else(|_| "detector.toml".to_string());

        let mut config = if Path::new(&config_path).exists() {
            tracing::info!("Loading configuration from: {}", config_path);
            let mut config = Self::from_file(&config_path)?;
            config.apply_overrides(|name| std::env::var(name).ok());
            config
        } else {
            tracing::debug!("Config file not found at {}, using environment variables", config_path);
            Self::from_env()
        };

        // Blank keys count as absent
        if !config.analyzer.is_enabled() {
            config.analyzer.api_key = None;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: DetectorConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> Self {
        Self {
            engine: EngineConfig::from_env(),
            watch: WatchConfig::from_env(),
            analyzer: AnalyzerConfig::from_env(),
        }
    }

    /// Overwrite the values named by the variables `lookup` resolves.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(raw) = lookup("DETECTOR_APP_PACKAGES") {
            let packages = parse_package_list(&raw);
            if !packages.is_empty() {
                self.engine.app_packages = packages;
            }
        }
        if let Some(limit) = parsed(&lookup, "DETECTOR_APP_FRAME_LIMIT") {
            self.engine.app_frame_limit = limit;
        }
        if let Some(window) = parsed(&lookup, "DETECTOR_DEDUP_WINDOW_MS") {
            self.engine.dedup_window_ms = window;
        }
        if let Some(strip) = parsed(&lookup, "DETECTOR_STRIP_ANSI") {
            self.engine.strip_ansi = strip;
        }
        if let Some(wait) = parsed(&lookup, "DETECTOR_WAIT_INTERVAL_MS") {
            self.watch.wait_interval_ms = wait;
        }
        if let Some(poll) = parsed(&lookup, "DETECTOR_POLL_INTERVAL_MS") {
            self.watch.poll_interval_ms = poll;
        }
        if let Some(key) = lookup("ANTHROPIC_API_KEY") {
            self.analyzer.api_key = Some(key);
        }
        if let Some(model) = lookup("DETECTOR_ANALYZER_MODEL") {
            self.analyzer.model = model;
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.engine.validate()?;
        self.watch.validate().map_err(anyhow::Error::msg)?;
        self.analyzer.validate().map_err(anyhow::Error::msg)?;
        Ok(())
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    lookup(name).and_then(|s| s.trim().parse().ok())
}

impl WatchConfig {
    /// Load watch intervals from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            wait_interval_ms: std::env::var("DETECTOR_WAIT_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.wait_interval_ms),
            poll_interval_ms: std::env::var("DETECTOR_POLL_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.poll_interval_ms),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.wait_interval_ms == 0 {
            return Err("watch.wait_interval_ms must be > 0".to_string());
        }
        if self.poll_interval_ms == 0 {
            return Err("watch.poll_interval_ms must be > 0".to_string());
        }
        Ok(())
    }
}

impl AnalyzerConfig {
    /// Load analyzer settings from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: std::env::var("ANTHROPIC_API_KEY").ok(),
            model: std::env::var("DETECTOR_ANALYZER_MODEL").unwrap_or(defaults.model),
            ..defaults
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.endpoint.is_empty() {
            return Err("analyzer.endpoint must not be empty".to_string());
        }
        if self.max_tokens == 0 {
            return Err("analyzer.max_tokens must be > 0".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("analyzer.timeout_secs must be > 0".to_string());
        }
        Ok(())
    }
}
