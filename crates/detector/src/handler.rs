//! Handler — consumes emitted events: count, classify, render, analyse.
//!
//! The engine callback only enqueues; all slow work (terminal output, the
//! secondary analyzer's network call) happens here, one event at a time.

use std::sync::Arc;

use engine::{Classification, Classifier, ErrorEvent};
use tokio::sync::mpsc;
use tracing::debug;

use crate::analyzer::SecondaryAnalyzer;
use crate::render::Renderer;

pub struct EventHandler {
    classifier: Classifier,
    analyzer: Arc<dyn SecondaryAnalyzer>,
    renderer: Renderer,
    count: u64,
}

impl EventHandler {
    pub fn new(analyzer: Arc<dyn SecondaryAnalyzer>, renderer: Renderer) -> Self {
        Self {
            classifier: Classifier::new(),
            analyzer,
            renderer,
            count: 0,
        }
    }

    /// Process one event. The analyzer is consulted only for events the rule
    /// table did not cover.
    pub async fn handle(&mut self, event: ErrorEvent) -> Classification {
        self.count += 1;

        let classification = self.classifier.classify(&event);
        self.renderer.print_event(&event, &classification);

        if !classification.matched && self.analyzer.is_enabled() {
            debug!(kind = %event.kind, "handler: no rule matched, asking secondary analyzer");
            if let Some(result) = self.analyzer.analyze(&event).await {
                self.renderer.print_ai_analysis(&result);
            }
        }

        classification
    }

    /// Drain the channel until every sender is gone; returns the event count.
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<ErrorEvent>) -> u64 {
        while let Some(event) = events.recv().await {
            self.handle(event).await;
        }
        self.count
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}
