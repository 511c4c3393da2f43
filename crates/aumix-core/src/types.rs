//! Common types for aumix
//!
//! PCM format descriptors shared by the converters, the resampler, decoded
//! sources and the mixer.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

/// Default output sample rate (Hz)
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Default output sample format for the platform
///
/// Mobile targets render 16-bit, desktop targets 24-bit packed.
#[cfg(any(target_os = "android", target_os = "ios"))]
pub const DEFAULT_SAMPLE_FORMAT: SampleFormat = SampleFormat::I16;
#[cfg(not(any(target_os = "android", target_os = "ios")))]
pub const DEFAULT_SAMPLE_FORMAT: SampleFormat = SampleFormat::I24;

/// Audio sample type used for all intermediate processing
pub type Sample = f32;

/// Encoding of a single PCM sample
///
/// Integer formats are signed and little-endian; `I24` is packed in three bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleFormat {
    I16,
    I24,
    I32,
    F32,
}

impl SampleFormat {
    /// All supported formats
    pub const ALL: [SampleFormat; 4] = [
        SampleFormat::I16,
        SampleFormat::I24,
        SampleFormat::I32,
        SampleFormat::F32,
    ];

    /// Width of one sample in bytes
    #[inline]
    pub const fn bytes_per_sample(self) -> usize {
        match self {
            SampleFormat::I16 => 2,
            SampleFormat::I24 => 3,
            SampleFormat::I32 => 4,
            SampleFormat::F32 => 4,
        }
    }

    /// Short display name
    pub fn name(&self) -> &'static str {
        match self {
            SampleFormat::I16 => "s16le",
            SampleFormat::I24 => "s24le",
            SampleFormat::I32 => "s32le",
            SampleFormat::F32 => "f32le",
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Channel layout of a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ChannelCount {
    Mono = 1,
    Stereo = 2,
}

impl ChannelCount {
    /// Number of interleaved channels
    #[inline]
    pub const fn count(self) -> usize {
        self as usize
    }

    /// Convert from a raw channel count
    pub fn from_count(count: usize) -> Option<Self> {
        match count {
            1 => Some(ChannelCount::Mono),
            2 => Some(ChannelCount::Stereo),
            _ => None,
        }
    }
}

/// Describes a PCM stream: channel layout, rate and sample encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AudioFormat {
    pub channel_count: ChannelCount,
    /// Frames per second, must be non-zero
    pub sample_rate: u32,
    pub sample_format: SampleFormat,
}

impl AudioFormat {
    pub const fn new(
        channel_count: ChannelCount,
        sample_rate: u32,
        sample_format: SampleFormat,
    ) -> Self {
        Self {
            channel_count,
            sample_rate,
            sample_format,
        }
    }

    /// Number of interleaved channels
    #[inline]
    pub fn channels(&self) -> usize {
        self.channel_count.count()
    }

    /// Width of one sample in bytes
    #[inline]
    pub fn bytes_per_sample(&self) -> usize {
        self.sample_format.bytes_per_sample()
    }

    /// Width of one interleaved frame in bytes
    #[inline]
    pub fn bytes_per_frame(&self) -> usize {
        self.bytes_per_sample() * self.channels()
    }

    /// Same channel layout and rate with a different sample encoding
    pub fn with_sample_format(self, sample_format: SampleFormat) -> Self {
        Self {
            sample_format,
            ..self
        }
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::new(ChannelCount::Stereo, DEFAULT_SAMPLE_RATE, DEFAULT_SAMPLE_FORMAT)
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}Hz {}ch",
            self.sample_format,
            self.sample_rate,
            self.channels()
        )
    }
}

/// Linear gain in `[0.0, 1.0]`, readable and writable from any thread
///
/// Stored as the bit pattern of an `f32`; all accesses are `Relaxed` since only
/// visibility of the latest value matters.
#[derive(Debug)]
pub struct AtomicVolume(AtomicU32);

impl AtomicVolume {
    pub fn new(volume: f32) -> Self {
        Self(AtomicU32::new(Self::sanitize(volume).to_bits()))
    }

    /// Current gain (lock-free)
    #[inline]
    pub fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    /// Set the gain, clamped to `[0.0, 1.0]` (NaN becomes silence)
    #[inline]
    pub fn set(&self, volume: f32) {
        self.0.store(Self::sanitize(volume).to_bits(), Ordering::Relaxed);
    }

    fn sanitize(volume: f32) -> f32 {
        if volume.is_nan() {
            0.0
        } else {
            volume.clamp(0.0, 1.0)
        }
    }
}

impl Default for AtomicVolume {
    fn default() -> Self {
        Self::new(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_per_sample() {
        assert_eq!(SampleFormat::I16.bytes_per_sample(), 2);
        assert_eq!(SampleFormat::I24.bytes_per_sample(), 3);
        assert_eq!(SampleFormat::I32.bytes_per_sample(), 4);
        assert_eq!(SampleFormat::F32.bytes_per_sample(), 4);
    }

    #[test]
    fn test_frame_size() {
        let format = AudioFormat::new(ChannelCount::Stereo, 48000, SampleFormat::I24);
        assert_eq!(format.bytes_per_frame(), 6);
        assert_eq!(format.with_sample_format(SampleFormat::F32).bytes_per_frame(), 8);
    }

    #[test]
    fn test_channel_count_from_raw() {
        assert_eq!(ChannelCount::from_count(1), Some(ChannelCount::Mono));
        assert_eq!(ChannelCount::from_count(2), Some(ChannelCount::Stereo));
        assert_eq!(ChannelCount::from_count(6), None);
    }

    #[test]
    fn test_volume_clamps() {
        let volume = AtomicVolume::default();
        assert_eq!(volume.get(), 1.0);

        volume.set(1.7);
        assert_eq!(volume.get(), 1.0);
        volume.set(-0.2);
        assert_eq!(volume.get(), 0.0);
        volume.set(f32::NAN);
        assert_eq!(volume.get(), 0.0);
        volume.set(0.25);
        assert_eq!(volume.get(), 0.25);
    }
}
