//! Deduplicator — suppresses a repeat of the last emitted event.
//!
//! Spring frequently logs one failure twice in quick succession (a dispatcher
//! record and the raw throw, or a retry). An event is dropped when its kind and
//! normalised message equal the last emitted ones and the previous emission is
//! younger than the window. The earlier record always wins: a later duplicate
//! with a fuller stack trace is dropped, not merged.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::model::{ErrorEvent, ErrorKind};
use crate::rules::normalize_message;

struct LastEmitted {
    kind: ErrorKind,
    message: String,
    at: DateTime<Utc>,
}

pub struct Deduplicator {
    window: Duration,
    last: Option<LastEmitted>,
    suppressed: u64,
}

impl Deduplicator {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last: None,
            suppressed: 0,
        }
    }

    /// Decide whether `event` is forwarded at instant `now`.
    ///
    /// Forwarded events replace the memo; suppressed ones leave it untouched,
    /// so the window keeps counting from the original emission.
    pub fn should_emit(&mut self, event: &ErrorEvent, now: DateTime<Utc>) -> bool {
        let message = normalize_message(&event.message);

        if let Some(ref last) = self.last {
            let within_window = (now - last.at)
                .to_std()
                .map(|elapsed| elapsed < self.window)
                // now is before the last emission: treat as inside the window
                .unwrap_or(true);

            if last.kind == event.kind && last.message == message && within_window {
                self.suppressed += 1;
                tracing::debug!(
                    kind = %event.kind,
                    suppressed = self.suppressed,
                    "dedup: duplicate inside window, dropping"
                );
                return false;
            }
        }

        self.last = Some(LastEmitted {
            kind: event.kind.clone(),
            message,
            at: now,
        });
        true
    }

    /// Number of events dropped so far.
    pub fn suppressed(&self) -> u64 {
        self.suppressed
    }
}
