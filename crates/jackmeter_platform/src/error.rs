//! Platform Error Types

use thiserror::Error;

/// Errors from audio graph operations
#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Feature not available in this build: {0}")]
    FeatureNotAvailable(String),

    #[error("Could not create client '{name}': {reason}")]
    ClientOpenFailed { name: String, reason: String },

    #[error("Port not found: {0}")]
    PortNotFound(String),

    #[error("Sink not found: {0}")]
    SinkNotFound(usize),

    #[error("Failed to register port '{name}': {reason}")]
    PortRegistrationFailed { name: String, reason: String },

    #[error("Can't connect ports {source_port} -> {sink_port}: {reason}")]
    ConnectionFailed {
        source_port: String,
        sink_port: String,
        reason: String,
    },

    #[error("Activating client '{name}' failed: {reason}")]
    ActivationFailed { name: String, reason: String },

    #[error("Invalid graph state: {0}")]
    InvalidState(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
