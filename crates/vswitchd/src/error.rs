//! Error types for vswitchd

use thiserror::Error;
use vswitch_types::ParseError;

/// Switch data-plane errors
#[derive(Error, Debug)]
pub enum SwitchError {
    /// Frame shorter than the Ethernet header it claims to carry
    #[error("Malformed frame: {len} bytes is shorter than the {needed} byte header")]
    MalformedFrame { len: usize, needed: usize },

    /// VLAN configuration line violates the trunk/VLAN-id grammar
    #[error("Invalid port spec for '{port}': {reason}")]
    InvalidPortSpec { port: String, reason: String },

    /// Configuration names a port the transport does not have
    #[error("Unknown port: {0}")]
    UnknownPort(String),

    /// Daemon configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Link transport error
    #[error("Transport error: {0}")]
    Transport(String),

    /// Value parsing error
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SwitchError {
    /// Creates an invalid port spec error.
    pub fn invalid_port_spec(port: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidPortSpec {
            port: port.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type for vswitchd operations
pub type Result<T> = std::result::Result<T, SwitchError>;
