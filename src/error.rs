//! Crate-wide error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced during startup and frame encoding
#[derive(Debug, Error)]
pub enum Error {
    /// Config file could not be read
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file could not be parsed
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: Box<toml::de::Error>,
    },

    /// Semantically invalid configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Preset id not present in the registry
    #[error("unknown preset: {0}")]
    UnknownPreset(String),

    /// Transport id not recognized
    #[error("unknown transport: {0}")]
    UnknownTransport(String),

    /// Frame length does not match the keyboard layout
    #[error("frame size {got} does not match key count {expected}")]
    FrameSizeMismatch { got: usize, expected: usize },

    /// Encoded report would not fit in the vendor packet
    #[error("encoded payload ({got} bytes) exceeds packet length {limit}")]
    PayloadExceedsPacket { got: usize, limit: usize },

    /// Transport refused the initial connection
    #[error("failed to connect transport")]
    TransportConnect,
}

pub type Result<T> = std::result::Result<T, Error>;
