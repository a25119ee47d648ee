//! Claude — `SecondaryAnalyzer` backed by the Anthropic Messages API.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use engine::ErrorEvent;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{AiAnalysis, AnalyzerError, SecondaryAnalyzer};
use crate::conf::AnalyzerConfig;

const API_VERSION: &str = "2023-06-01";
const ANALYSIS_MARKER: &str = "[Analysis]";
const FIX_MARKER: &str = "[Suggested Fix]";
const PROMPT_STACK_LINES: usize = 15;

pub struct ClaudeAnalyzer {
    client: Option<reqwest::Client>,
    api_key: String,
    endpoint: String,
    model: String,
    max_tokens: u32,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [Message<'a>; 1],
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

impl ClaudeAnalyzer {
    /// Build the analyzer. Without a usable key (or HTTP client) it is
    /// disabled and every call yields `None`.
    pub fn new(config: &AnalyzerConfig) -> Self {
        let client = if config.is_enabled() {
            match reqwest::Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()
            {
                Ok(client) => Some(client),
                Err(e) => {
                    warn!("Failed to build HTTP client, secondary analysis disabled: {}", e);
                    None
                }
            }
        } else {
            None
        };

        Self {
            client,
            api_key: config.api_key.clone().unwrap_or_default(),
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        }
    }

    async fn request(
        &self,
        client: &reqwest::Client,
        event: &ErrorEvent,
    ) -> Result<AiAnalysis, AnalyzerError> {
        let prompt = build_prompt(event);
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: [Message {
                role: "user",
                content: &prompt,
            }],
        };

        let response = client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AnalyzerError::Status(response.status()));
        }

        let parsed: MessagesResponse = response.json().await?;
        let text = parsed
            .content
            .into_iter()
            .next()
            .and_then(|block| block.text)
            .filter(|text| !text.trim().is_empty())
            .ok_or(AnalyzerError::EmptyResponse)?;

        Ok(parse_response(&text))
    }
}

impl SecondaryAnalyzer for ClaudeAnalyzer {
    fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    fn analyze<'a>(
        &'a self,
        event: &'a ErrorEvent,
    ) -> Pin<Box<dyn Future<Output = Option<AiAnalysis>> + Send + 'a>> {
        Box::pin(async move {
            let client = self.client.as_ref()?;
            debug!(kind = %event.kind, model = %self.model, "analyzer: requesting analysis");
            match self.request(client, event).await {
                Ok(analysis) => Some(analysis),
                Err(e) => {
                    warn!(kind = %event.kind, "Secondary analysis failed: {}", e);
                    None
                }
            }
        })
    }
}

fn or_none(value: &str) -> &str {
    if value.is_empty() {
        "(none)"
    } else {
        value
    }
}

/// Prompt asking for `[Analysis]` and `[Suggested Fix]` sections.
pub fn build_prompt(event: &ErrorEvent) -> String {
    let app_trace = if event.app_stack_trace.is_empty() {
        "(none)".to_string()
    } else {
        event.app_stack_trace.join("\n  ")
    };
    let stack_trace = if event.stack_trace.is_empty() {
        "(none)".to_string()
    } else {
        event
            .stack_trace
            .iter()
            .take(PROMPT_STACK_LINES)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n  ")
    };
    let root_cause = event
        .root_cause
        .as_ref()
        .map(|cause| format!("Root cause: {} - {}\n", cause.kind, cause.message))
        .unwrap_or_default();

    format!(
        "You are an expert in diagnosing Spring Boot errors.\n\
         Analyse the error below and suggest a fix.\n\
         \n\
         Error type: {kind}\n\
         Error message: {message}\n\
         {root_cause}\
         \n\
         Application stack trace:\n  {app_trace}\n\
         \n\
         Full stack trace (top {limit} lines):\n  {stack_trace}\n\
         \n\
         Answer in exactly this format:\n\
         \n\
         {ANALYSIS_MARKER}\n\
         (the cause of the error and the context it occurred in)\n\
         \n\
         {FIX_MARKER}\n\
         (concrete code changes, step by step)",
        kind = event.kind,
        message = or_none(&event.message),
        limit = PROMPT_STACK_LINES,
    )
}

/// Split a reply into its sections; the whole reply is the analysis when the
/// analysis marker is missing.
pub fn parse_response(text: &str) -> AiAnalysis {
    let fix_at = text.find(FIX_MARKER);
    let analysis = match text.find(ANALYSIS_MARKER) {
        Some(start) => {
            let body_start = start + ANALYSIS_MARKER.len();
            let end = fix_at.filter(|&at| at >= body_start).unwrap_or(text.len());
            text[body_start..end].trim().to_string()
        }
        None => text.trim().to_string(),
    };
    let suggested_fix = fix_at
        .map(|at| text[at + FIX_MARKER.len()..].trim().to_string())
        .unwrap_or_default();

    AiAnalysis {
        analysis,
        suggested_fix,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use engine::{ErrorKind, Level, RootCause};

    fn event() -> ErrorEvent {
        ErrorEvent {
            timestamp: Utc::now(),
            kind: ErrorKind::from_name("RuntimeException"),
            full_type: "java.lang.RuntimeException".to_string(),
            message: "boom".to_string(),
            raw_line: "java.lang.RuntimeException: boom".to_string(),
            level: Level::Error,
            root_cause: Some(RootCause {
                kind: ErrorKind::from_name("IOException"),
                full_type: "java.io.IOException".to_string(),
                message: "disk full".to_string(),
            }),
            cause_chain: Vec::new(),
            stack_trace: (0..20).map(|i| format!("com.example.F.m{}(F.java:{})", i, i)).collect(),
            app_stack_trace: vec!["com.example.F.m0(F.java:0)".to_string()],
        }
    }

    #[test]
    fn test_prompt_contents() {
        let prompt = build_prompt(&event());
        assert!(prompt.contains("Error type: RuntimeException"));
        assert!(prompt.contains("Error message: boom"));
        assert!(prompt.contains("Root cause: IOException - disk full"));
        assert!(prompt.contains("F.m14("));
        assert!(!prompt.contains("F.m15("));
        assert!(prompt.contains(ANALYSIS_MARKER));
        assert!(prompt.contains(FIX_MARKER));
    }

    #[test]
    fn test_prompt_placeholders() {
        let mut e = event();
        e.message.clear();
        e.root_cause = None;
        e.stack_trace.clear();
        e.app_stack_trace.clear();
        let prompt = build_prompt(&e);
        assert!(prompt.contains("Error message: (none)"));
        assert!(!prompt.contains("Root cause:"));
        assert!(prompt.contains("Application stack trace:\n  (none)"));
    }

    #[test]
    fn test_parse_both_sections() {
        let parsed = parse_response(
            "[Analysis]\nThe disk filled up.\n\n[Suggested Fix]\n1. Free space\n2. Rotate logs\n",
        );
        assert_eq!(parsed.analysis, "The disk filled up.");
        assert_eq!(parsed.suggested_fix, "1. Free space\n2. Rotate logs");
    }

    #[test]
    fn test_parse_without_markers() {
        let parsed = parse_response("  Just some prose.  ");
        assert_eq!(parsed.analysis, "Just some prose.");
        assert_eq!(parsed.suggested_fix, "");
    }

    #[test]
    fn test_parse_analysis_only() {
        let parsed = parse_response("[Analysis] only this");
        assert_eq!(parsed.analysis, "only this");
        assert!(parsed.suggested_fix.is_empty());
    }

    #[test]
    fn test_disabled_without_key() {
        let analyzer = ClaudeAnalyzer::new(&AnalyzerConfig::default());
        assert!(!analyzer.is_enabled());
    }

    #[tokio::test]
    async fn test_disabled_returns_none() {
        let analyzer = ClaudeAnalyzer::new(&AnalyzerConfig::default());
        assert!(analyzer.analyze(&event()).await.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_fails_closed() {
        let config = AnalyzerConfig {
            api_key: Some("sk-test".to_string()),
            endpoint: "http://127.0.0.1:1/v1/messages".to_string(),
            timeout_secs: 2,
            ..AnalyzerConfig::default()
        };
        let analyzer = ClaudeAnalyzer::new(&config);
        assert!(analyzer.is_enabled());
        assert!(analyzer.analyze(&event()).await.is_none());
    }
}
