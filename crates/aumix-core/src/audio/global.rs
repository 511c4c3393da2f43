//! Process-wide audio output
//!
//! Many small players (UI sounds, notifications) want to share one device
//! stream. The first call to [`global_output`] opens it on a dedicated
//! `audio-output` thread which then owns the cpal stream for the rest of the
//! process (cpal streams are not `Send` on every platform). Later calls get the
//! same mixer back.
//!
//! ```ignore
//! use aumix_core::audio::{global_output, AudioConfig};
//! use aumix_core::player::AudioPlayer;
//!
//! let output = global_output(&AudioConfig::default())?;
//! let player = AudioPlayer::with_source(&output.mixer, source);
//! player.play()?;
//! ```

use std::sync::mpsc;
use std::sync::{Arc, OnceLock};
use std::thread;

use super::config::AudioConfig;
use super::error::{AudioError, AudioResult};
use super::output::start_output;
use crate::mixer::AudioMixer;
use crate::types::AudioFormat;

/// Handle to the process-wide output
#[derive(Clone)]
pub struct SharedOutput {
    /// Mixer rendered by the output stream
    pub mixer: Arc<AudioMixer>,
    /// Name of the device in use
    pub device_name: String,
}

impl SharedOutput {
    /// Format rendered to the device
    pub fn format(&self) -> AudioFormat {
        self.mixer.output_format()
    }
}

static GLOBAL_OUTPUT: OnceLock<AudioResult<SharedOutput>> = OnceLock::new();

/// Start the output on its own thread and wait for the result
fn init_output(config: AudioConfig) -> AudioResult<SharedOutput> {
    let (tx, rx) = mpsc::channel();

    thread::Builder::new()
        .name("audio-output".to_string())
        .spawn(move || {
            let output = match start_output(&config) {
                Ok(output) => output,
                Err(e) => {
                    let _ = tx.send(Err(e));
                    return;
                }
            };

            let shared = SharedOutput {
                mixer: output.mixer(),
                device_name: output.device_name().to_string(),
            };
            if tx.send(Ok(shared)).is_err() {
                return;
            }

            log::info!("Audio output thread started");

            // The stream lives exactly as long as this thread
            let _output = output;
            loop {
                thread::park();
            }
        })
        .map_err(|e| AudioError::StreamBuildError(format!("Failed to spawn output thread: {}", e)))?;

    rx.recv()
        .map_err(|_| AudioError::StreamBuildError("Output thread exited".to_string()))?
}

/// Get the process-wide output, opening it with `config` on first use
///
/// `config` is ignored once the output exists. A failed first attempt is
/// remembered and returned to every later caller.
pub fn global_output(config: &AudioConfig) -> AudioResult<SharedOutput> {
    GLOBAL_OUTPUT
        .get_or_init(|| init_output(config.clone()))
        .clone()
}

/// The process-wide mixer, if the output was started successfully
pub fn global_mixer() -> Option<Arc<AudioMixer>> {
    GLOBAL_OUTPUT
        .get()
        .and_then(|output| output.as_ref().ok())
        .map(|output| output.mixer.clone())
}
