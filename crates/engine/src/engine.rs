//! Engine — framing, reconstruction and dedup behind one feed/flush surface.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::ansi::strip_ansi_codes;
use crate::chunk::ChunkAssembler;
use crate::config::EngineConfig;
use crate::dedup::Deduplicator;
use crate::machine::{EngineState, ErrorAssembler};
use crate::model::ErrorEvent;

/// Observer receiving finalised, deduplicated events.
///
/// Called synchronously from `feed`/`feed_line`/`flush`; implementations must
/// not call back into the engine.
pub trait EventSink: Send {
    fn on_event(&mut self, event: ErrorEvent);
}

impl<F> EventSink for F
where
    F: FnMut(ErrorEvent) + Send,
{
    fn on_event(&mut self, event: ErrorEvent) {
        self(event)
    }
}

/// Time source for open timestamps and the dedup window.
pub trait Clock: Send {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Single-source log engine.
///
/// Owns the partial-line buffer, the open event and the last-emitted memo.
/// Every call runs to completion; nothing blocks or spawns.
pub struct LogEngine {
    assembler: ChunkAssembler,
    machine: ErrorAssembler,
    dedup: Deduplicator,
    sink: Option<Box<dyn EventSink>>,
    clock: Box<dyn Clock>,
    strip_ansi: bool,
    emitted: u64,
}

impl LogEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }

    pub fn with_clock(config: &EngineConfig, clock: impl Clock + 'static) -> Self {
        Self {
            assembler: ChunkAssembler::new(),
            machine: ErrorAssembler::new(config.app_packages.clone(), config.app_frame_limit),
            dedup: Deduplicator::new(Duration::from_millis(config.dedup_window_ms)),
            sink: None,
            clock: Box::new(clock),
            strip_ansi: config.strip_ansi,
            emitted: 0,
        }
    }

    /// Register the observer. Replaces any previously registered one.
    pub fn on_event(&mut self, sink: impl EventSink + 'static) {
        self.sink = Some(Box::new(sink));
    }

    /// Ingest a streamed text chunk.
    pub fn feed(&mut self, chunk: &str) {
        self.feed_bytes(chunk.as_bytes());
    }

    /// Ingest a streamed byte chunk; may split UTF-8 characters.
    pub fn feed_bytes(&mut self, chunk: &[u8]) {
        for line in self.assembler.feed_bytes(chunk) {
            self.process_line(&line);
        }
    }

    /// Ingest one already-delimited line.
    ///
    /// A partial line still buffered from `feed` is completed by `line`, so
    /// mixing the two calls keeps input order.
    pub fn feed_line(&mut self, line: &str) {
        if self.assembler.pending_len() > 0 {
            self.feed_bytes(line.as_bytes());
            self.feed_bytes(b"\n");
            return;
        }
        self.process_line(line.strip_suffix('\r').unwrap_or(line));
    }

    /// Process the retained partial line, then force-emit the open event.
    /// Safe to call repeatedly.
    pub fn flush(&mut self) {
        if let Some(rest) = self.assembler.flush() {
            self.process_line(&rest);
        }
        self.close_open_event();
    }

    /// Force-emit the open event but keep a partial line buffered for the
    /// next chunk. For sources that pause mid-stream, such as a polled file.
    pub fn close_open_event(&mut self) {
        if let Some(event) = self.machine.flush() {
            self.emit(event);
        }
    }

    /// Bytes held back waiting for a line terminator.
    pub fn pending_len(&self) -> usize {
        self.assembler.pending_len()
    }

    pub fn state(&self) -> EngineState {
        self.machine.state()
    }

    /// The event being collected, if any.
    pub fn open_event(&self) -> Option<&ErrorEvent> {
        self.machine.open_event()
    }

    /// Events forwarded to the observer so far.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Events dropped by the dedup window so far.
    pub fn suppressed(&self) -> u64 {
        self.dedup.suppressed()
    }

    fn process_line(&mut self, line: &str) {
        let now = self.clock.now();
        let closed = if self.strip_ansi {
            let clean = strip_ansi_codes(line);
            self.machine.process(&clean, now)
        } else {
            self.machine.process(line, now)
        };

        if let Some(event) = closed {
            self.emit(event);
        }
    }

    fn emit(&mut self, event: ErrorEvent) {
        let now = self.clock.now();
        if !self.dedup.should_emit(&event, now) {
            return;
        }
        self.emitted += 1;
        tracing::debug!(
            kind = %event.kind,
            frames = event.stack_trace.len(),
            "engine: emitting event"
        );
        match self.sink {
            Some(ref mut sink) => sink.on_event(event),
            None => tracing::trace!("engine: no observer registered, event dropped"),
        }
    }
}
