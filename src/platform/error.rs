//! Platform error types

use thiserror::Error;

use crate::util::config::ConfigError;

/// Errors reported by the platform.
///
/// Misuse of the API (negative sizes or delays, idle tasks) is not an error:
/// it panics.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// The OS refused to start a worker thread
    #[error("failed to spawn worker thread {index}: {source}")]
    WorkerSpawn {
        index: usize,
        #[source]
        source: std::io::Error,
    },

    /// Configuration could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for platform operations
pub type PlatformResult<T> = Result<T, PlatformError>;
