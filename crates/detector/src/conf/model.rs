//! Model — DetectorConfig and related structs.

use engine::EngineConfig;
use serde::{Deserialize, Serialize};

pub const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub engine: EngineConfig,
    pub watch: WatchConfig,
    pub analyzer: AnalyzerConfig,
}

/// File tailing intervals.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// How often to check whether a missing file has appeared.
    pub wait_interval_ms: u64,
    /// How often to check the file length for appended bytes.
    pub poll_interval_ms: u64,
}

/// Secondary (language-model) analyzer settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub api_key: Option<String>,
    pub endpoint: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            wait_interval_ms: 500,
            poll_interval_ms: 500,
        }
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 1024,
            timeout_secs: 60,
        }
    }
}

impl AnalyzerConfig {
    /// The analyzer runs only when a non-empty key is configured.
    pub fn is_enabled(&self) -> bool {
        self.api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty())
    }
}

// Keep the key out of logs.
impl std::fmt::Debug for AnalyzerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyzerConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyzer_enabled_requires_key() {
        let mut config = AnalyzerConfig::default();
        assert!(!config.is_enabled());
        config.api_key = Some("   ".to_string());
        assert!(!config.is_enabled());
        config.api_key = Some("sk-test".to_string());
        assert!(config.is_enabled());
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = AnalyzerConfig {
            api_key: Some("sk-secret".to_string()),
            ..AnalyzerConfig::default()
        };
        let printed = format!("{:?}", config);
        assert!(!printed.contains("sk-secret"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn test_watch_defaults() {
        let watch = WatchConfig::default();
        assert_eq!(watch.wait_interval_ms, 500);
        assert_eq!(watch.poll_interval_ms, 500);
    }
}
