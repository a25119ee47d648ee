//! Analyzer — secondary analysis for events the rule table does not cover.
//!
//! Callers only see the [`SecondaryAnalyzer`] trait.
//! `claude.rs` provides the Messages API implementation.
//! `fake.rs` provides a test double.

pub mod claude;
pub mod fake;

use std::future::Future;
use std::pin::Pin;

use engine::ErrorEvent;
use thiserror::Error;

pub use claude::ClaudeAnalyzer;
pub use fake::FakeAnalyzer;

/// Free-form analysis returned by a secondary analyzer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiAnalysis {
    pub analysis: String,
    pub suggested_fix: String,
}

/// Failures inside an analyzer. Never crosses the trait boundary.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("Response contained no text")]
    EmptyResponse,
}

/// Async analysis seam.
///
/// Object-safe thanks to `Pin<Box<…>>` returns. Implementations fail closed:
/// every fault becomes `None`.
pub trait SecondaryAnalyzer: Send + Sync {
    fn is_enabled(&self) -> bool;

    fn analyze<'a>(
        &'a self,
        event: &'a ErrorEvent,
    ) -> Pin<Box<dyn Future<Output = Option<AiAnalysis>> + Send + 'a>>;
}
