//! Error reconstruction engine for streamed application logs.
//!
//! Raw text from a monitored process (or a growing log file) is framed into
//! lines, classified one line at a time, and stitched into discrete
//! [`ErrorEvent`] records that are handed to a single registered observer.
//!
//! # Architecture
//!
//! - `chunk.rs`: partial-chunk line framing
//! - `ansi.rs`: ANSI escape stripping for coloured console output
//! - `rules.rs`: ordered line-shape matchers (frames, causes, throws, log records)
//! - `machine.rs`: IDLE / COLLECTING state machine owning the open event
//! - `dedup.rs`: trailing-window suppression of repeated events
//! - `engine.rs`: glue for the observer, clock and feed/flush surface
//! - `classify.rs`: rule table mapping an event kind to analysis and fix text
//!
//! # Concurrency
//!
//! The engine is single-threaded and synchronous. Hosts feeding it from two
//! unsynchronised producers (stdout and stderr of one process) must serialise
//! calls themselves; the interleaving between producers is not deterministic
//! and can split one logical stack trace into two events.

mod ansi;
pub mod chunk;
pub mod classify;
pub mod config;
pub mod dedup;
pub mod engine;
pub mod machine;
pub mod model;
pub mod rules;

// Re-export commonly used types
pub use ansi::strip_ansi_codes;
pub use classify::{Classification, Classifier};
pub use config::{ConfigError, EngineConfig};
pub use engine::{Clock, EventSink, LogEngine, SystemClock};
pub use machine::EngineState;
pub use model::{ErrorEvent, ErrorKind, Level, RootCause};
