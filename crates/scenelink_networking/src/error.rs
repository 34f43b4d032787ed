//! # Networking Error Types

use std::path::PathBuf;

use scenelink_protocol::SyncError;
use thiserror::Error;

/// Transport failures.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Socket or stream I/O failed.
    #[error("transport I/O: {0}")]
    Io(#[from] std::io::Error),

    /// Frame exceeds what this transport can carry.
    #[error("frame of {size} bytes exceeds transport limit {limit}")]
    FrameTooLarge {
        /// Frame size.
        size: usize,
        /// Transport limit.
        limit: usize,
    },

    /// The other end is gone.
    #[error("peer disconnected")]
    Disconnected,
}

/// Configuration failures.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File could not be read.
    #[error("cannot read config {path}: {source}")]
    Read {
        /// Config path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Not valid TOML or wrong field types.
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// Values parsed but make no sense.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level networking error.
#[derive(Error, Debug)]
pub enum NetworkError {
    /// See [`TransportError`].
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// See [`ConfigError`].
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// See [`SyncError`].
    #[error(transparent)]
    Sync(#[from] SyncError),
}

/// Result type for networking operations.
pub type NetworkResult<T> = Result<T, NetworkError>;
