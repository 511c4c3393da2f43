//! aumix core - software audio mixing for many concurrent sound sources
//!
//! - [`convert`]: sample format and channel layout conversion
//! - [`source`]: decoded PCM sources (in-memory, WAV)
//! - [`resample`]: per-source conversion to the mixer's rate and layout
//! - [`player`]: play/pause/stop state machine per source
//! - [`mixer`]: sums all playing sources into one output buffer
//! - [`audio`]: cpal output backend and process-wide output

pub mod audio;
pub mod config;
pub mod convert;
pub mod error;
pub mod mixer;
pub mod player;
pub mod resample;
pub mod source;
pub mod types;

pub use error::{PlayerError, PlayerResult, ResamplerError, SourceError, SourceResult};
pub use mixer::{AudioMixer, SoundSource, SourceRead};
pub use player::{AudioPlayer, PlaybackStatus};
pub use source::{DecodedSource, PcmBufferSource, WavSource};
pub use types::*;
