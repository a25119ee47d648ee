// Module structure for the detector host tool.

// Core infrastructure
pub mod error;
pub mod conf;
pub mod runtime;

// Input sources
pub mod cli;
pub mod monitor;

// Event consumers
pub mod analyzer;
pub mod handler;
pub mod render;
