//! Monitor module — input sources feeding the engine.
//!
//! - `process.rs`: spawn a command and monitor its stdout/stderr
//! - `tail.rs`: follow a growing log file
//!
//! Both own the engine exclusively for the duration of a run; neither
//! returns until the source ends or the shutdown future resolves.

pub mod process;
pub mod tail;
