//! # Relay Error Types
//!
//! Failures of the server runtime: configuration, sockets and threads.
//!
//! Per-request failures are not errors here. A request either succeeds,
//! is dropped, or is answered with a protocol error code; see
//! [`crate::server::Rejection`].

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while configuring or running the relay.
#[derive(Error, Debug)]
pub enum RelayError {
    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The configuration file could not be read.
    #[error("cannot read config file {path}: {source}")]
    ConfigRead {
        /// File that was requested.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// The configuration file is not valid TOML for [`crate::RelayConfig`].
    #[error("cannot parse config file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Socket or thread failure.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for relay operations.
pub type RelayResult<T> = Result<T, RelayError>;
