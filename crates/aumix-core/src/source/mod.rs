//! Decoded PCM sources
//!
//! A [`DecodedSource`] hands out raw interleaved PCM in its native format.
//! The player wraps it in a resampled stream that converts to the mixer's
//! output layout.
//!
//! Provided sources:
//! - [`PcmBufferSource`] - PCM held in memory (sound effects, generated tones)
//! - [`WavSource`] - WAV files via `hound`

mod wav;

pub use wav::WavSource;

use std::f32::consts::TAU;
use std::sync::Arc;

use crate::convert::encode_from_f32;
use crate::error::SourceResult;
use crate::types::AudioFormat;

/// Pull-based producer of raw PCM bytes
pub trait DecodedSource: Send {
    /// Fill `buf` with up to `buf.len()` bytes of interleaved PCM in
    /// [`info()`](Self::info) format. Returns the number of bytes written;
    /// `0` means end of stream.
    fn read(&mut self, buf: &mut [u8]) -> SourceResult<usize>;

    /// Format of the bytes produced by [`read`](Self::read)
    fn info(&self) -> AudioFormat;

    /// Seek back to the first frame
    fn rewind(&mut self) -> SourceResult<()>;
}

impl<S: DecodedSource + ?Sized> DecodedSource for Box<S> {
    fn read(&mut self, buf: &mut [u8]) -> SourceResult<usize> {
        (**self).read(buf)
    }

    fn info(&self) -> AudioFormat {
        (**self).info()
    }

    fn rewind(&mut self) -> SourceResult<()> {
        (**self).rewind()
    }
}

/// Read into `buf` until it is full or the source reports end of stream
pub fn read_fully<S: DecodedSource + ?Sized>(source: &mut S, buf: &mut [u8]) -> SourceResult<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = source.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// In-memory PCM source
///
/// The sample data is shared, so cloning is cheap and each clone keeps its own
/// read position.
#[derive(Debug, Clone)]
pub struct PcmBufferSource {
    format: AudioFormat,
    data: Arc<[u8]>,
    position: usize,
}

impl PcmBufferSource {
    /// Wrap raw interleaved PCM bytes; a trailing partial frame is ignored
    pub fn new(format: AudioFormat, data: impl Into<Arc<[u8]>>) -> Self {
        let mut data: Arc<[u8]> = data.into();
        let whole = data.len() - data.len() % format.bytes_per_frame();
        if whole != data.len() {
            data = Arc::from(&data[..whole]);
        }
        Self {
            format,
            data,
            position: 0,
        }
    }

    /// Encode interleaved float samples into `format`
    pub fn from_f32(format: AudioFormat, samples: &[f32]) -> Self {
        let mut data = vec![0u8; samples.len() * format.bytes_per_sample()];
        encode_from_f32(format.sample_format, samples, &mut data);
        Self::new(format, data)
    }

    /// Sine tone of `frequency` Hz lasting `seconds`, same signal on every channel
    pub fn sine(format: AudioFormat, frequency: f32, seconds: f32, amplitude: f32) -> Self {
        let frames = (seconds.max(0.0) * format.sample_rate as f32) as usize;
        let channels = format.channels();
        let step = TAU * frequency / format.sample_rate as f32;

        let mut samples = Vec::with_capacity(frames * channels);
        for frame in 0..frames {
            let value = (frame as f32 * step).sin() * amplitude;
            samples.extend(std::iter::repeat(value).take(channels));
        }
        Self::from_f32(format, &samples)
    }

    /// Total length in frames
    pub fn len_frames(&self) -> usize {
        self.data.len() / self.format.bytes_per_frame()
    }

    /// Frames already read
    pub fn position_frames(&self) -> usize {
        self.position / self.format.bytes_per_frame()
    }
}

impl DecodedSource for PcmBufferSource {
    fn read(&mut self, buf: &mut [u8]) -> SourceResult<usize> {
        let remaining = &self.data[self.position..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.position += n;
        Ok(n)
    }

    fn info(&self) -> AudioFormat {
        self.format
    }

    fn rewind(&mut self) -> SourceResult<()> {
        self.position = 0;
        Ok(())
    }
}
