//! DSP Error Types

use thiserror::Error;

/// Errors that can occur during processing or when reading processor state
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DspError {
    #[error("Spectrum data has not been initialized for '{0}'")]
    Uninitialized(String),

    #[error("Sample rate must be positive, got {0}")]
    InvalidSampleRate(u32),

    #[error("Processor '{name}' failed: {reason}")]
    ProcessingFailed { name: String, reason: String },
}
