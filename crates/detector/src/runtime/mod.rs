//! Runtime module — logging init, session wiring and the top-level run loop.

pub mod boot;
pub mod session;
