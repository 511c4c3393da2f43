//! cpal output stream driving an [`AudioMixer`]
//!
//! ```text
//! ┌──────────────────┐  add/remove   ┌──────────────┐  read_sound_data  ┌─────────────────┐
//! │  control thread  │──────────────►│  AudioMixer  │◄──────────────────│  cpal callback  │
//! │  (AudioPlayer)   │               │  (Arc)       │   bytes view of   │  (output thread)│
//! └──────────────────┘               └──────────────┘   device buffer   └─────────────────┘
//! ```
//!
//! The mixer renders straight into the device buffer: the typed cpal slice is
//! viewed as bytes with `bytemuck` and the mixer is created for the device's
//! own sample format, so no extra copy or conversion pass is needed.

use std::sync::Arc;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{SizedSample, Stream, StreamConfig, SupportedStreamConfig};

use super::config::AudioConfig;
use super::device::{default_device, find_device};
use super::error::{AudioError, AudioResult};
use crate::mixer::AudioMixer;
use crate::types::{AudioFormat, ChannelCount, SampleFormat};

/// Running output stream
///
/// Keeps the cpal stream alive. Drop this to stop audio.
pub struct AudioOutput {
    _stream: Stream,
    mixer: Arc<AudioMixer>,
    device_name: String,
    buffer_frames: Option<u32>,
}

impl AudioOutput {
    /// Mixer feeding this output
    pub fn mixer(&self) -> Arc<AudioMixer> {
        self.mixer.clone()
    }

    /// Format rendered to the device
    pub fn format(&self) -> AudioFormat {
        self.mixer.output_format()
    }

    /// Name of the output device
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Requested buffer size in frames (None = host default)
    pub fn buffer_frames(&self) -> Option<u32> {
        self.buffer_frames
    }

    /// One-way output latency in milliseconds, if the buffer size is fixed
    pub fn latency_ms(&self) -> Option<f32> {
        self.buffer_frames
            .map(|frames| frames as f32 / self.format().sample_rate as f32 * 1000.0)
    }
}

/// Open the configured device and start rendering a new mixer to it
pub fn start_output(config: &AudioConfig) -> AudioResult<AudioOutput> {
    let device = match &config.device {
        Some(id) => find_device(id)?,
        None => default_device()?,
    };
    let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
    log::info!("Using audio device: {}", device_name);

    let supported = select_output_config(&device, config)?;
    let format = mixer_format(&supported)?;
    let buffer_frames = config.buffer_size.as_frames();

    let stream_config = StreamConfig {
        channels: supported.channels(),
        sample_rate: supported.sample_rate(),
        buffer_size: match buffer_frames {
            Some(frames) => cpal::BufferSize::Fixed(frames),
            None => cpal::BufferSize::Default,
        },
    };

    log::info!(
        "Audio config: {}, buffer {}",
        format,
        buffer_frames.map_or("default".to_string(), |f| format!("{} frames", f))
    );

    let mixer = Arc::new(AudioMixer::new(format, config.resampler.clone()));
    let stream = match format.sample_format {
        SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, mixer.clone())?,
        SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, mixer.clone())?,
        SampleFormat::I32 => build_stream::<i32>(&device, &stream_config, mixer.clone())?,
        SampleFormat::I24 => {
            return Err(AudioError::UnsupportedFormat(format.sample_format.to_string()))
        }
    };
    stream
        .play()
        .map_err(|e| AudioError::StreamPlayError(e.to_string()))?;

    log::info!("Audio output started");

    Ok(AudioOutput {
        _stream: stream,
        mixer,
        device_name,
        buffer_frames,
    })
}

/// Pick a mono or stereo config in a format the mixer can render
///
/// Preference: requested channel count, then requested sample rate, then
/// `f32` over integer formats.
fn select_output_config(
    device: &cpal::Device,
    config: &AudioConfig,
) -> AudioResult<SupportedStreamConfig> {
    let target_rate = config.target_sample_rate();
    let target_channels = config.target_channels();

    let candidates: Vec<_> = device
        .supported_output_configs()
        .map_err(|e| AudioError::ConfigError(e.to_string()))?
        .filter(|c| c.channels() <= 2)
        .filter(|c| sample_format_of(c.sample_format()).is_some())
        .collect();

    let rank = |c: &cpal::SupportedStreamConfigRange| {
        let rate_ok = target_rate >= c.min_sample_rate().0 && target_rate <= c.max_sample_rate().0;
        (
            c.channels() == target_channels,
            rate_ok,
            c.sample_format() == cpal::SampleFormat::F32,
        )
    };

    let best = candidates
        .iter()
        .max_by_key(|&c| rank(c))
        .ok_or_else(|| {
            AudioError::ConfigError("No mono/stereo output config with a usable format".to_string())
        })?;

    if target_rate >= best.min_sample_rate().0 && target_rate <= best.max_sample_rate().0 {
        Ok(best.clone().with_sample_rate(cpal::SampleRate(target_rate)))
    } else {
        let fallback = best.max_sample_rate();
        log::warn!(
            "Audio device doesn't support {}Hz, using {}Hz (sources will be resampled)",
            target_rate,
            fallback.0
        );
        Ok(best.clone().with_sample_rate(fallback))
    }
}

fn sample_format_of(format: cpal::SampleFormat) -> Option<SampleFormat> {
    match format {
        cpal::SampleFormat::F32 => Some(SampleFormat::F32),
        cpal::SampleFormat::I16 => Some(SampleFormat::I16),
        cpal::SampleFormat::I32 => Some(SampleFormat::I32),
        _ => None,
    }
}

fn mixer_format(supported: &SupportedStreamConfig) -> AudioResult<AudioFormat> {
    let sample_format = sample_format_of(supported.sample_format())
        .ok_or_else(|| AudioError::UnsupportedFormat(format!("{:?}", supported.sample_format())))?;
    let channel_count = ChannelCount::from_count(supported.channels() as usize).ok_or_else(|| {
        AudioError::UnsupportedFormat(format!("{} channels", supported.channels()))
    })?;
    Ok(AudioFormat::new(
        channel_count,
        supported.sample_rate().0,
        sample_format,
    ))
}

/// Build a stream whose callback renders the mixer into `T` samples
fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mixer: Arc<AudioMixer>,
) -> AudioResult<Stream>
where
    T: SizedSample + bytemuck::Pod,
{
    device
        .build_output_stream(
            config,
            move |data: &mut [T], _info: &cpal::OutputCallbackInfo| {
                // Mixer output is little-endian, the native order of supported targets
                mixer.read_sound_data(bytemuck::cast_slice_mut(data));
            },
            move |err| {
                log::error!("Audio output stream error: {}", err);
            },
            None,
        )
        .map_err(|e| AudioError::StreamBuildError(e.to_string()))
}
