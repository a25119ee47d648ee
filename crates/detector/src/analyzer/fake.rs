//! Fake — test double for secondary analysis.
//!
//! Returns a canned reply and records which event kinds it was asked about.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use engine::ErrorEvent;

use super::{AiAnalysis, SecondaryAnalyzer};

#[derive(Clone, Default)]
pub struct FakeAnalyzer {
    enabled: bool,
    reply: Option<AiAnalysis>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl FakeAnalyzer {
    /// An analyzer that reports itself disabled.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// An enabled analyzer answering every request with `reply`.
    pub fn replying(reply: Option<AiAnalysis>) -> Self {
        Self {
            enabled: true,
            reply,
            calls: Arc::default(),
        }
    }

    /// Kinds of the events analysed so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

impl SecondaryAnalyzer for FakeAnalyzer {
    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn analyze<'a>(
        &'a self,
        event: &'a ErrorEvent,
    ) -> Pin<Box<dyn Future<Output = Option<AiAnalysis>> + Send + 'a>> {
        Box::pin(async move {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(event.kind.to_string());
            }
            if self.enabled {
                self.reply.clone()
            } else {
                None
            }
        })
    }
}
