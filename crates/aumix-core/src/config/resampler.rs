//! Resampler configuration
//!
//! Tuning for the windowed-sinc kernel used when a source's sample rate
//! differs from the mixer output rate.

use serde::{Deserialize, Serialize};

/// Sinc resampler settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResamplerConfig {
    /// Base number of source frames pulled per refill.
    /// The actual refill is `refill_base_frames * ceil(input_rate / output_rate)`.
    /// Default: 512
    pub refill_base_frames: usize,

    /// Output frames produced per kernel pass.
    /// Default: 512
    pub chunk_frames: usize,

    /// Length of the windowed sinc in taps.
    /// Default: 128
    pub sinc_len: usize,

    /// Cutoff relative to the lower Nyquist frequency (0.0 - 1.0).
    /// Default: 0.95
    pub f_cutoff: f32,

    /// Number of interpolated sinc tables between taps.
    /// Default: 128
    pub oversampling_factor: usize,
}

impl Default for ResamplerConfig {
    fn default() -> Self {
        Self {
            refill_base_frames: 512,
            chunk_frames: 512,
            sinc_len: 128,
            f_cutoff: 0.95,
            oversampling_factor: 128,
        }
    }
}

impl ResamplerConfig {
    /// Source frames read per refill for the given rate pair
    ///
    /// ```
    /// use aumix_core::config::ResamplerConfig;
    ///
    /// let config = ResamplerConfig::default();
    /// assert_eq!(config.refill_frames(44100, 48000), 512);
    /// assert_eq!(config.refill_frames(96000, 44100), 1536);
    /// ```
    pub fn refill_frames(&self, input_rate: u32, output_rate: u32) -> usize {
        let ratio = input_rate as f64 / output_rate as f64;
        self.refill_base_frames.max(1) * ratio.ceil().max(1.0) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refill_rounds_ratio_up() {
        let config = ResamplerConfig::default();
        assert_eq!(config.refill_frames(48000, 48000), 512);
        assert_eq!(config.refill_frames(48000, 44100), 1024);
        assert_eq!(config.refill_frames(8000, 48000), 512);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: ResamplerConfig = serde_yaml::from_str("sinc_len: 32").unwrap();
        assert_eq!(config.sinc_len, 32);
        assert_eq!(config.refill_base_frames, 512);
        assert_eq!(config.f_cutoff, 0.95);
    }
}
