//! Error types for the watcher pipeline.

use std::path::PathBuf;
use thiserror::Error;

use crate::gpio::PinId;

/// Errors from watcher and registry operations.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("cannot watch pin {pin} at {path}: {source}")]
    ResourceUnavailable {
        pin: PinId,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("channel capacity must be at least 1")]
    ZeroCapacity,

    #[error("failed to start watcher thread for pin {pin}: {source}")]
    SpawnFailed {
        pin: PinId,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create shutdown signal: {source}")]
    StopSignal {
        #[source]
        source: std::io::Error,
    },

    #[error("registry is shut down")]
    ShutDown,
}

impl WatchError {
    /// Pin the error refers to, if any.
    pub fn pin(&self) -> Option<PinId> {
        match self {
            WatchError::ResourceUnavailable { pin, .. } | WatchError::SpawnFailed { pin, .. } => {
                Some(*pin)
            }
            _ => None,
        }
    }
}
