//! Output backend error types

use thiserror::Error;

/// Failures opening or running the device output
///
/// `Clone` so the process-wide output can hand the same failure to every caller.
#[derive(Error, Debug, Clone)]
pub enum AudioError {
    #[error("No audio output devices found")]
    NoDevices,

    #[error("No default output device: {0}")]
    NoDefaultDevice(String),

    /// Configured device is not present on any host
    #[error("Output device {0} not found")]
    DeviceNotFound(String),

    /// Querying the device's supported stream configs failed
    #[error("Cannot query output configs: {0}")]
    ConfigError(String),

    #[error("Cannot open output stream: {0}")]
    StreamBuildError(String),

    #[error("Cannot start output stream: {0}")]
    StreamPlayError(String),

    /// Device sample format or layout the mixer cannot render into
    #[error("Mixer cannot render to {0}")]
    UnsupportedFormat(String),
}

/// Result type for audio output operations
pub type AudioResult<T> = Result<T, AudioError>;
