//! Platform audio output for aumix
//!
//! Renders an [`AudioMixer`](crate::mixer::AudioMixer) to a cpal output device
//! (ALSA/PulseAudio/JACK on Linux, WASAPI on Windows, CoreAudio on macOS,
//! AAudio on Android).
//!
//! # Architecture
//!
//! - **Control threads**: create players, call play/pause/stop
//! - **Output thread**: cpal callback calls `read_sound_data` into the device buffer
//! - **Atomics**: player status/volume/loop readable without locks
//!
//! Use [`start_output`] for an owned stream, or [`global_output`] to share one
//! stream across the whole process.

mod config;
mod device;
mod error;
mod global;
mod output;

pub use config::{AudioConfig, BufferSize, DeviceId, MAX_BUFFER_FRAMES, MIN_BUFFER_FRAMES};
pub use device::{default_device, find_device, output_devices, OutputDevice};
pub use error::{AudioError, AudioResult};
pub use global::{global_mixer, global_output, SharedOutput};
pub use output::{start_output, AudioOutput};
