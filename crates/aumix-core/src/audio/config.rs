//! Output backend configuration
//!
//! Device selection, stream preferences and resampler tuning. Serialized as
//! YAML with [`crate::config::save_config`].

use serde::{Deserialize, Serialize};

use crate::config::ResamplerConfig;
use crate::types::DEFAULT_SAMPLE_RATE;

/// Buffer sizes outside this range are clamped (frames)
pub const MIN_BUFFER_FRAMES: u32 = 64;
pub const MAX_BUFFER_FRAMES: u32 = 8192;

/// Preferred buffer size for the output stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BufferSize {
    /// Let the host choose
    #[default]
    Default,
    /// Request a specific size in frames (the host may adjust it)
    Fixed(u32),
}

impl BufferSize {
    /// Requested size in frames, clamped to the supported range
    pub fn as_frames(&self) -> Option<u32> {
        match self {
            BufferSize::Default => None,
            BufferSize::Fixed(frames) => Some((*frames).clamp(MIN_BUFFER_FRAMES, MAX_BUFFER_FRAMES)),
        }
    }

    /// One-way latency in milliseconds at `sample_rate`, if known
    pub fn latency_ms(&self, sample_rate: u32) -> Option<f32> {
        self.as_frames()
            .map(|frames| frames as f32 / sample_rate as f32 * 1000.0)
    }
}

/// Audio device identifier
///
/// A device name plus, optionally, the host backend it belongs to (ALSA,
/// JACK, CoreAudio, ...). Without a host every host is searched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceId {
    /// Device name as reported by the system
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

impl DeviceId {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: None,
        }
    }

    pub fn with_host(name: &str, host: &str) -> Self {
        Self {
            name: name.to_string(),
            host: Some(host.to_string()),
        }
    }

    /// Label including the host, e.g. `[ALSA] default`
    pub fn display_label(&self) -> String {
        match &self.host {
            Some(host) => format!("[{}] {}", host, self.name),
            None => self.name.clone(),
        }
    }
}

/// Configuration for the audio output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Output device (None = system default)
    pub device: Option<DeviceId>,

    /// Preferred sample rate (None = 44100 Hz when supported)
    pub sample_rate: Option<u32>,

    /// Preferred channel count, 1 or 2 (None = stereo)
    pub channels: Option<u16>,

    /// Preferred buffer size
    pub buffer_size: BufferSize,

    /// Sinc resampler settings for sources at other rates
    pub resampler: ResamplerConfig,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: None,
            sample_rate: None,
            channels: None,
            buffer_size: BufferSize::default(),
            resampler: ResamplerConfig::default(),
        }
    }
}

impl AudioConfig {
    /// Sample rate to request from the device
    pub fn target_sample_rate(&self) -> u32 {
        self.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE)
    }

    /// Channel count to request from the device
    pub fn target_channels(&self) -> u16 {
        self.channels.unwrap_or(2).clamp(1, 2)
    }

    /// Set the output device
    pub fn with_device(mut self, device: DeviceId) -> Self {
        self.device = Some(device);
        self
    }

    /// Set the preferred sample rate
    pub fn with_sample_rate(mut self, rate: u32) -> Self {
        self.sample_rate = Some(rate);
        self
    }

    /// Set the preferred channel count
    pub fn with_channels(mut self, channels: u16) -> Self {
        self.channels = Some(channels);
        self
    }

    /// Set a fixed buffer size in frames
    pub fn with_buffer_frames(mut self, frames: u32) -> Self {
        self.buffer_size = BufferSize::Fixed(frames);
        self
    }

    /// Set the resampler tuning
    pub fn with_resampler(mut self, resampler: ResamplerConfig) -> Self {
        self.resampler = resampler;
        self
    }
}
