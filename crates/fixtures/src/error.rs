//! Fixture server errors

use thiserror::Error;

use driverkit_harness::HarnessError;

#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("Example page serving is disabled")]
    Disabled,

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] HarnessError),

    #[error("Server task failed: {0}")]
    Task(String),
}

pub type FixtureResult<T> = Result<T, FixtureError>;
