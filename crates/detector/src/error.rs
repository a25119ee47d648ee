use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("Command is empty")]
    EmptyCommand,

    #[error("Failed to start command '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),
}

pub type DetectorResult<T> = Result<T, DetectorError>;
