//! Engine Error Types

use thiserror::Error;

/// Errors that can occur while setting up or running the meter engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Port not found: {0}")]
    PortNotFound(String),

    #[error("No ports selected")]
    NoPortsSelected,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Engine already running")]
    AlreadyRunning,

    #[error("Engine not running")]
    NotRunning,

    #[error("DSP error: {0}")]
    DspError(#[from] jackmeter_dsp::DspError),

    #[error("Platform error: {0}")]
    PlatformError(#[from] jackmeter_platform::PlatformError),
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
