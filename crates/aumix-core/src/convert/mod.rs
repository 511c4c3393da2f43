//! Stateless PCM conversion
//!
//! Pure functions used by the resampler and the mixer:
//!
//! - [`convert_samples`] - sample encoding conversion with clamping
//! - [`mix_channels`] - mono/stereo up/downmix on interleaved floats

mod channels;
mod sample;

pub use channels::mix_channels;
pub use sample::{convert_samples, decode_sample, decode_to_f32, encode_from_f32, encode_sample};
