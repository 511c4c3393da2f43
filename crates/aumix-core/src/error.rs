//! Error types for decoding, resampling and playback control

use thiserror::Error;

/// Errors produced while reading PCM from a decoded source
#[derive(Error, Debug)]
pub enum SourceError {
    /// Underlying reader failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// WAV container could not be read
    #[error("WAV decode error: {0}")]
    Wav(#[from] hound::Error),

    /// Decoder-specific failure
    #[error("Decode error: {0}")]
    Decode(String),

    /// Stream layout this crate cannot represent
    #[error("Unsupported source format: {0}")]
    UnsupportedFormat(String),

    /// Source cannot seek back to its start
    #[error("Source does not support rewinding")]
    RewindUnsupported,

    /// Sinc kernel rejected a processing call
    #[error("Resampling failed: {0}")]
    Resample(#[from] rubato::ResampleError),
}

/// Result type for source reads
pub type SourceResult<T> = Result<T, SourceError>;

/// Errors produced while constructing a resampled stream
#[derive(Error, Debug)]
pub enum ResamplerError {
    /// Input or output rate is zero
    #[error("Invalid sample rate: input={input}Hz, output={output}Hz")]
    InvalidSampleRate { input: u32, output: u32 },

    /// Sinc kernel construction failed
    #[error("Failed to create resampler: {0}")]
    Construction(#[from] rubato::ResamplerConstructionError),
}

/// Errors returned by player control operations
#[derive(Error, Debug)]
pub enum PlayerError {
    /// `play()` without a source
    #[error("No source set on player")]
    NoSource,

    /// The mixer this player was created for has been dropped
    #[error("Mixer is no longer available")]
    MixerGone,

    /// Stream setup failed
    #[error(transparent)]
    Resampler(#[from] ResamplerError),
}

/// Result type for player control operations
pub type PlayerResult<T> = Result<T, PlayerError>;
