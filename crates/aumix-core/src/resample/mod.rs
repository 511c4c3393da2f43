//! Resampled source stream
//!
//! Turns a [`DecodedSource`] in any format into interleaved `f32` at the
//! mixer's rate and channel layout, with the player's volume applied.
//!
//! # Pipeline
//!
//! ```text
//! DecodedSource ──bytes──► decode + gain ──► per-channel rings ──► sinc kernel ──► channel mix ──► f32 out
//!                                  │                                                   ▲
//!                                  └────────────── same rate: no kernel ───────────────┘
//! ```
//!
//! - Rings are refilled `refill_base_frames * ceil(in_rate / out_rate)` frames
//!   at a time, only when a channel runs dry.
//! - When a refill returns nothing, the kernel is fed silence for the rest of
//!   the pass and the stream is marked exhausted.
//! - A read returns `0` once the rings are empty and the last refill came back
//!   empty. Kernel output still queued at that point is dropped.

use std::collections::VecDeque;
use std::sync::Arc;

use rubato::{
    Resampler, SincFixedOut, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use crate::config::ResamplerConfig;
use crate::convert::{decode_to_f32, mix_channels};
use crate::error::{ResamplerError, SourceResult};
use crate::source::{read_fully, DecodedSource};
use crate::types::{AtomicVolume, AudioFormat, ChannelCount};

/// Source reader that decodes whole frames to float and applies gain
struct Upstream {
    source: Box<dyn DecodedSource>,
    format: AudioFormat,
    gain: Arc<AtomicVolume>,
    bytes: Vec<u8>,
    samples: Vec<f32>,
}

impl Upstream {
    /// Read up to `frames` frames into `self.samples`; returns frames read
    fn read_frames(&mut self, frames: usize) -> SourceResult<usize> {
        let bytes_per_frame = self.format.bytes_per_frame();
        self.bytes.resize(frames * bytes_per_frame, 0);

        let read = read_fully(self.source.as_mut(), &mut self.bytes)?;
        let frames = read / bytes_per_frame;
        let count = frames * self.format.channels();
        if self.samples.len() < count {
            self.samples.resize(count, 0.0);
        }

        let used = count * self.format.bytes_per_sample();
        decode_to_f32(self.format.sample_format, &self.bytes[..used], &mut self.samples[..count]);

        let gain = self.gain.get();
        if gain != 1.0 {
            for sample in &mut self.samples[..count] {
                *sample *= gain;
            }
        }

        Ok(frames)
    }
}

/// Windowed-sinc stage with per-channel input rings
struct SincStage {
    kernel: SincFixedOut<f32>,
    rings: Vec<VecDeque<f32>>,
    refill_frames: usize,
    exhausted: bool,
    kernel_in: Vec<Vec<f32>>,
    kernel_out: Vec<Vec<f32>>,
    pending: Vec<VecDeque<f32>>,
    interleaved: Vec<f32>,
}

impl SincStage {
    fn new(
        input_rate: u32,
        output_rate: u32,
        channels: usize,
        config: &ResamplerConfig,
    ) -> Result<Self, ResamplerError> {
        let params = SincInterpolationParameters {
            sinc_len: config.sinc_len,
            f_cutoff: config.f_cutoff,
            oversampling_factor: config.oversampling_factor,
            interpolation: SincInterpolationType::Linear,
            window: WindowFunction::BlackmanHarris2,
        };
        let kernel = SincFixedOut::<f32>::new(
            output_rate as f64 / input_rate as f64,
            1.0,
            params,
            config.chunk_frames.max(1),
            channels,
        )?;

        let refill_frames = config.refill_frames(input_rate, output_rate);
        let max_in = kernel.input_frames_max();
        let max_out = kernel.output_frames_max();

        Ok(Self {
            rings: (0..channels).map(|_| VecDeque::with_capacity(refill_frames * 2)).collect(),
            pending: (0..channels).map(|_| VecDeque::with_capacity(max_out * 2)).collect(),
            kernel_in: (0..channels).map(|_| Vec::with_capacity(max_in)).collect(),
            kernel_out: vec![vec![0.0; max_out]; channels],
            refill_frames,
            exhausted: false,
            interleaved: Vec::new(),
            kernel,
        })
    }

    fn read(
        &mut self,
        upstream: &mut Upstream,
        dst: &mut [f32],
        out_channels: usize,
    ) -> SourceResult<usize> {
        if self.exhausted && self.rings.iter().all(VecDeque::is_empty) {
            return Ok(0);
        }

        let frames = dst.len() / out_channels;
        let channels = self.rings.len();

        while self.pending[0].len() < frames {
            let need = self.kernel.input_frames_next();
            for channel in 0..channels {
                self.kernel_in[channel].resize(need, 0.0);
                self.pull(upstream, channel, need)?;
            }

            let (_, produced) =
                self.kernel
                    .process_into_buffer(&self.kernel_in, &mut self.kernel_out, None)?;
            for (queue, out) in self.pending.iter_mut().zip(&self.kernel_out) {
                queue.extend(&out[..produced]);
            }
        }

        self.interleaved.resize(frames * channels, 0.0);
        for frame in self.interleaved.chunks_exact_mut(channels) {
            for (sample, queue) in frame.iter_mut().zip(self.pending.iter_mut()) {
                *sample = queue.pop_front().unwrap_or(0.0);
            }
        }

        mix_channels(&self.interleaved, frames, channels, dst, out_channels);
        Ok(frames * out_channels)
    }

    /// Fill `kernel_in[channel][..frames]` from the channel's ring, refilling
    /// when it runs dry and padding with silence once the source is exhausted
    fn pull(&mut self, upstream: &mut Upstream, channel: usize, frames: usize) -> SourceResult<()> {
        let mut filled = 0;
        while filled < frames {
            if self.rings[channel].is_empty() {
                self.refill(upstream)?;
                if self.rings[channel].is_empty() {
                    self.kernel_in[channel][filled..frames].fill(0.0);
                    return Ok(());
                }
            }

            let ring = &mut self.rings[channel];
            let take = (frames - filled).min(ring.len());
            let dst = &mut self.kernel_in[channel][filled..filled + take];
            for (sample, value) in dst.iter_mut().zip(ring.drain(..take)) {
                *sample = value;
            }
            filled += take;
        }
        Ok(())
    }

    /// Read the next batch from the source and de-interleave it into the rings
    fn refill(&mut self, upstream: &mut Upstream) -> SourceResult<()> {
        let frames = upstream.read_frames(self.refill_frames)?;
        self.exhausted = frames == 0;

        let channels = self.rings.len();
        for frame in upstream.samples[..frames * channels].chunks_exact(channels) {
            for (ring, &sample) in self.rings.iter_mut().zip(frame) {
                ring.push_back(sample);
            }
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.kernel.reset();
        self.exhausted = false;
        for ring in self.rings.iter_mut().chain(self.pending.iter_mut()) {
            ring.clear();
        }
    }
}

/// Rate conversion prepared for one input format
///
/// Building the sinc kernel is the only fallible part of stream setup, so it
/// is split out: callers can create the converter before giving up ownership
/// of their source.
pub struct RateConverter {
    input_format: AudioFormat,
    output_rate: u32,
    sinc: Option<Box<SincStage>>,
}

impl RateConverter {
    /// Prepare conversion from `input_format` to `output_rate`
    ///
    /// The sinc kernel is only built when the rates differ.
    pub fn new(
        input_format: AudioFormat,
        output_rate: u32,
        config: &ResamplerConfig,
    ) -> Result<Self, ResamplerError> {
        if input_format.sample_rate == 0 || output_rate == 0 {
            return Err(ResamplerError::InvalidSampleRate {
                input: input_format.sample_rate,
                output: output_rate,
            });
        }

        let sinc = if input_format.sample_rate != output_rate {
            let stage = SincStage::new(
                input_format.sample_rate,
                output_rate,
                input_format.channels(),
                config,
            )?;
            log::debug!(
                "Resampling {} -> {}Hz, refill {} frames",
                input_format,
                output_rate,
                stage.refill_frames
            );
            Some(Box::new(stage))
        } else {
            None
        };

        Ok(Self {
            input_format,
            output_rate,
            sinc,
        })
    }

    /// Whether the sinc kernel is in use
    pub fn is_resampling(&self) -> bool {
        self.sinc.is_some()
    }

    /// Format this converter accepts
    pub fn input_format(&self) -> AudioFormat {
        self.input_format
    }
}

/// A decoded source converted to the mixer's output rate and layout
///
/// Output is interleaved `f32`; volume is read from the shared
/// [`AtomicVolume`] on every refill so changes apply without locking.
pub struct ResampledStream {
    upstream: Upstream,
    output_rate: u32,
    output_channels: usize,
    sinc: Option<Box<SincStage>>,
}

impl ResampledStream {
    /// Wrap `source`, building a converter for its format
    pub fn new(
        source: Box<dyn DecodedSource>,
        output_rate: u32,
        output_channels: ChannelCount,
        gain: Arc<AtomicVolume>,
        config: &ResamplerConfig,
    ) -> Result<Self, ResamplerError> {
        let converter = RateConverter::new(source.info(), output_rate, config)?;
        Ok(Self::with_converter(source, converter, output_channels, gain))
    }

    /// Wrap `source` with an already prepared converter
    ///
    /// The converter must have been built for `source.info()`.
    pub fn with_converter(
        source: Box<dyn DecodedSource>,
        converter: RateConverter,
        output_channels: ChannelCount,
        gain: Arc<AtomicVolume>,
    ) -> Self {
        let format = source.info();
        debug_assert_eq!(format, converter.input_format, "converter built for another format");

        let batch = converter
            .sinc
            .as_ref()
            .map(|stage| stage.refill_frames)
            .unwrap_or(ResamplerConfig::default().refill_base_frames);

        Self {
            upstream: Upstream {
                source,
                format,
                gain,
                bytes: Vec::with_capacity(batch * format.bytes_per_frame()),
                samples: Vec::with_capacity(batch * format.channels()),
            },
            output_rate: converter.output_rate,
            output_channels: output_channels.count(),
            sinc: converter.sinc,
        }
    }

    /// Fill `dst` with interleaved output samples
    ///
    /// `dst.len()` is rounded down to whole output frames. Returns the number
    /// of samples written; `0` means the source is finished. With resampling
    /// active every non-final read fills all whole frames.
    pub fn read(&mut self, dst: &mut [f32]) -> SourceResult<usize> {
        let out_channels = self.output_channels;
        let frames = dst.len() / out_channels;
        if frames == 0 {
            return Ok(0);
        }
        let dst = &mut dst[..frames * out_channels];

        match self.sinc.as_mut() {
            Some(stage) => stage.read(&mut self.upstream, dst, out_channels),
            None => {
                let read = self.upstream.read_frames(frames)?;
                if read > 0 {
                    mix_channels(
                        &self.upstream.samples,
                        read,
                        self.upstream.format.channels(),
                        dst,
                        out_channels,
                    );
                }
                Ok(read * out_channels)
            }
        }
    }

    /// Rewind the source and drop all buffered audio
    pub fn rewind(&mut self) -> SourceResult<()> {
        if let Some(stage) = self.sinc.as_mut() {
            stage.reset();
        }
        self.upstream.source.rewind()
    }

    /// Whether the sinc kernel is in use
    pub fn is_resampling(&self) -> bool {
        self.sinc.is_some()
    }

    /// Format of the wrapped source
    pub fn input_format(&self) -> AudioFormat {
        self.upstream.format
    }

    /// Output sample rate
    pub fn output_rate(&self) -> u32 {
        self.output_rate
    }

    /// Give back the wrapped source
    pub fn into_source(self) -> Box<dyn DecodedSource> {
        self.upstream.source
    }
}
