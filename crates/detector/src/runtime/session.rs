//! Session — one engine wired to one event handler task.

use engine::{EngineConfig, ErrorEvent, LogEngine};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, warn};

use crate::handler::EventHandler;

pub struct Session {
    engine: LogEngine,
    handler: JoinHandle<u64>,
}

impl Session {
    /// Build the engine and spawn the handler it feeds.
    pub fn start(config: &EngineConfig, handler: EventHandler) -> Self {
        let (tx, rx) = mpsc::unbounded_channel::<ErrorEvent>();

        let mut engine = LogEngine::new(config);
        engine.on_event(move |event: ErrorEvent| {
            if tx.send(event).is_err() {
                warn!("Event handler has stopped, dropping event");
            }
        });

        Self {
            engine,
            handler: tokio::spawn(handler.run(rx)),
        }
    }

    pub fn engine(&mut self) -> &mut LogEngine {
        &mut self.engine
    }

    /// Flush the engine, close the channel and wait for the handler to drain.
    /// Returns the number of events handled.
    pub async fn finish(self) -> u64 {
        let Self { mut engine, handler } = self;
        engine.flush();
        drop(engine);

        match handler.await {
            Ok(count) => count,
            Err(e) => {
                error!("Event handler task failed: {}", e);
                0
            }
        }
    }
}
