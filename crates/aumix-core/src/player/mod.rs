//! Audio player - per-source playback state machine
//!
//! An [`AudioPlayer`] owns one [`DecodedSource`] and feeds it to an
//! [`AudioMixer`] while playing.
//!
//! ```text
//!              play()                  pause()
//!   Stopped ──────────► Playing ◄──────────────► Paused
//!      ▲                  │         play()         │
//!      └──────────────────┴────────────────────────┘
//!             stop(), end of source, decode error
//! ```
//!
//! - `play()` builds the resampled stream on demand and registers with the mixer
//! - `pause()` unregisters but keeps the stream position
//! - `stop()` unregisters, releases the stream and rewinds the source
//! - Reaching the end (loop off) or a decode error stops the player from the
//!   output thread and sends one message on the [`finished`](AudioPlayer::finished)
//!   channel
//!
//! Status, loop flag and volume are atomics, readable from any thread without
//! locking.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crossbeam::channel::{self, Receiver, Sender};

use crate::error::{PlayerError, PlayerResult, SourceResult};
use crate::mixer::{AudioMixer, SoundSource, SourceRead};
use crate::resample::{RateConverter, ResampledStream};
use crate::source::DecodedSource;
use crate::types::AtomicVolume;

/// Playback status of a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum PlaybackStatus {
    #[default]
    Stopped = 0,
    Playing = 1,
    Paused = 2,
}

impl PlaybackStatus {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => PlaybackStatus::Playing,
            2 => PlaybackStatus::Paused,
            _ => PlaybackStatus::Stopped,
        }
    }
}

/// Lock-free player state
///
/// All operations use `Ordering::Relaxed`; they only need to be visible, not
/// ordered against other memory.
#[derive(Debug, Default)]
pub struct PlayerAtomics {
    status: AtomicU8,
    looping: AtomicBool,
    volume: Arc<AtomicVolume>,
}

impl PlayerAtomics {
    /// Current status (lock-free)
    #[inline]
    pub fn status(&self) -> PlaybackStatus {
        PlaybackStatus::from_u8(self.status.load(Ordering::Relaxed))
    }

    /// Check if playing (lock-free)
    #[inline]
    pub fn is_playing(&self) -> bool {
        self.status() == PlaybackStatus::Playing
    }

    /// Check if looping is enabled (lock-free)
    #[inline]
    pub fn is_looping(&self) -> bool {
        self.looping.load(Ordering::Relaxed)
    }

    /// Current volume in `[0.0, 1.0]` (lock-free)
    #[inline]
    pub fn volume(&self) -> f32 {
        self.volume.get()
    }

    fn set_status(&self, status: PlaybackStatus) {
        self.status.store(status as u8, Ordering::Relaxed);
    }
}

/// Where the player's source currently lives
enum Slot {
    Empty,
    /// Source set but no stream built (stopped)
    Idle(Box<dyn DecodedSource>),
    /// Stream built (playing or paused)
    Streaming(ResampledStream),
}

impl Slot {
    /// Release the stream and rewind its source
    fn park(&mut self) {
        *self = match std::mem::replace(self, Slot::Empty) {
            Slot::Streaming(stream) => {
                let mut source = stream.into_source();
                if let Err(e) = source.rewind() {
                    log::warn!("Failed to rewind source on stop: {}", e);
                }
                Slot::Idle(source)
            }
            other => other,
        };
    }
}

/// State shared between player handles and the mixer
struct PlayerShared {
    atomics: PlayerAtomics,
    /// Bumped by every `play()` and `stop()`
    session: AtomicU64,
    /// Session in which the stream last ended or failed
    ended_session: AtomicU64,
    slot: Mutex<Slot>,
    finished_tx: Sender<()>,
    finished_rx: Receiver<()>,
}

impl PlayerShared {
    fn lock_slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_session(&self) {
        self.session.fetch_add(1, Ordering::Relaxed);
    }

    fn mark_ended(&self) {
        self.ended_session
            .store(self.session.load(Ordering::Relaxed), Ordering::Relaxed);
    }
}

impl SoundSource for PlayerShared {
    fn read_samples(&self, dst: &mut [f32]) -> SourceRead {
        // Stopped or paused after the mixer took its snapshot
        if !self.atomics.is_playing() {
            return SourceRead::Samples(0);
        }

        match &mut *self.lock_slot() {
            Slot::Streaming(stream) => match stream.read(dst) {
                Ok(0) => {
                    self.mark_ended();
                    SourceRead::EndOfStream
                }
                Ok(n) => SourceRead::Samples(n),
                Err(e) => {
                    self.mark_ended();
                    SourceRead::Failed(e)
                }
            },
            Slot::Idle(_) | Slot::Empty => SourceRead::Samples(0),
        }
    }

    fn is_stale(&self) -> bool {
        self.ended_session.load(Ordering::Relaxed) != self.session.load(Ordering::Relaxed)
    }

    fn is_looping(&self) -> bool {
        self.atomics.is_looping()
    }

    fn rewind(&self) -> SourceResult<()> {
        match &mut *self.lock_slot() {
            Slot::Streaming(stream) => stream.rewind(),
            Slot::Idle(source) => source.rewind(),
            Slot::Empty => Ok(()),
        }
    }

    fn on_finished(&self) {
        {
            let mut slot = self.lock_slot();
            // Stopped or restarted since the stream ended
            if self.atomics.status() == PlaybackStatus::Stopped || self.is_stale() {
                return;
            }
            slot.park();
            self.atomics.set_status(PlaybackStatus::Stopped);
        }
        log::debug!("Player finished");
        // The receiver lives in the same struct, so this cannot fail
        let _ = self.finished_tx.send(());
    }
}

struct PlayerInner {
    shared: Arc<PlayerShared>,
    mixer: Weak<AudioMixer>,
}

impl PlayerInner {
    fn as_sound_source(&self) -> Arc<dyn SoundSource> {
        self.shared.clone()
    }

    fn unregister(&self) {
        if let Some(mixer) = self.mixer.upgrade() {
            mixer.remove_sound_source(&self.as_sound_source());
        }
    }
}

impl Drop for PlayerInner {
    fn drop(&mut self) {
        if self.shared.atomics.status() != PlaybackStatus::Stopped {
            self.unregister();
            self.shared.atomics.set_status(PlaybackStatus::Stopped);
        }
    }
}

/// Plays one decoded source through an [`AudioMixer`]
///
/// Cloning gives another handle to the same player. Dropping the last handle
/// stops playback.
#[derive(Clone)]
pub struct AudioPlayer {
    inner: Arc<PlayerInner>,
}

impl AudioPlayer {
    /// Create a stopped player without a source
    pub fn new(mixer: &Arc<AudioMixer>) -> Self {
        let (finished_tx, finished_rx) = channel::unbounded();
        let shared = Arc::new(PlayerShared {
            atomics: PlayerAtomics::default(),
            session: AtomicU64::new(0),
            ended_session: AtomicU64::new(0),
            slot: Mutex::new(Slot::Empty),
            finished_tx,
            finished_rx,
        });
        Self {
            inner: Arc::new(PlayerInner {
                shared,
                mixer: Arc::downgrade(mixer),
            }),
        }
    }

    /// Create a stopped player for `source`
    pub fn with_source(mixer: &Arc<AudioMixer>, source: impl DecodedSource + 'static) -> Self {
        let player = Self::new(mixer);
        player.set_source(Box::new(source));
        player
    }

    /// Start or resume playback
    ///
    /// Does nothing when already playing. Builds the resampled stream if the
    /// player was stopped.
    pub fn play(&self) -> PlayerResult<()> {
        let shared = &self.inner.shared;
        let mut slot = shared.lock_slot();
        if shared.atomics.is_playing() {
            return Ok(());
        }

        let mixer = self.inner.mixer.upgrade().ok_or(PlayerError::MixerGone)?;

        let next = match std::mem::replace(&mut *slot, Slot::Empty) {
            Slot::Empty => return Err(PlayerError::NoSource),
            Slot::Idle(source) => {
                let output = mixer.output_format();
                match RateConverter::new(source.info(), output.sample_rate, mixer.resampler_config())
                {
                    Ok(converter) => Slot::Streaming(ResampledStream::with_converter(
                        source,
                        converter,
                        output.channel_count,
                        shared.atomics.volume.clone(),
                    )),
                    Err(e) => {
                        *slot = Slot::Idle(source);
                        return Err(e.into());
                    }
                }
            }
            streaming => streaming,
        };
        *slot = next;

        shared.next_session();
        shared.atomics.set_status(PlaybackStatus::Playing);
        mixer.add_sound_source(self.inner.as_sound_source());
        Ok(())
    }

    /// Pause playback, keeping the position. Only acts while playing.
    pub fn pause(&self) {
        let shared = &self.inner.shared;
        let _slot = shared.lock_slot();
        if shared.atomics.is_playing() {
            self.inner.unregister();
            shared.atomics.set_status(PlaybackStatus::Paused);
        }
    }

    /// Stop playback and rewind. Does nothing when already stopped.
    pub fn stop(&self) {
        let shared = &self.inner.shared;
        let mut slot = shared.lock_slot();
        if shared.atomics.status() == PlaybackStatus::Stopped {
            return;
        }
        shared.next_session();
        self.inner.unregister();
        slot.park();
        shared.atomics.set_status(PlaybackStatus::Stopped);
    }

    /// Restart from the beginning
    pub fn rewind(&self) -> PlayerResult<()> {
        self.stop();
        self.play()
    }

    /// Replace the source, stopping playback first
    pub fn set_source(&self, source: Box<dyn DecodedSource>) {
        self.stop();
        log::debug!("Player source set: {}", source.info());
        *self.inner.shared.lock_slot() = Slot::Idle(source);
    }

    /// Remove the source, stopping playback first
    pub fn clear_source(&self) {
        self.stop();
        *self.inner.shared.lock_slot() = Slot::Empty;
    }

    /// Whether a source is set
    pub fn has_source(&self) -> bool {
        !matches!(*self.inner.shared.lock_slot(), Slot::Empty)
    }

    /// Loop the source instead of finishing at its end
    pub fn set_loop(&self, enabled: bool) {
        self.inner.shared.atomics.looping.store(enabled, Ordering::Relaxed);
    }

    /// Check if looping is enabled
    pub fn is_looping(&self) -> bool {
        self.inner.shared.atomics.is_looping()
    }

    /// Set the volume, clamped to `[0.0, 1.0]`; applies on the next refill
    pub fn set_volume(&self, volume: f32) {
        self.inner.shared.atomics.volume.set(volume);
    }

    /// Current volume
    pub fn volume(&self) -> f32 {
        self.inner.shared.atomics.volume()
    }

    /// Current playback status
    pub fn status(&self) -> PlaybackStatus {
        self.inner.shared.atomics.status()
    }

    /// Check if playing
    pub fn is_playing(&self) -> bool {
        self.inner.shared.atomics.is_playing()
    }

    /// Lock-free view of the player state
    pub fn atomics(&self) -> &PlayerAtomics {
        &self.inner.shared.atomics
    }

    /// Channel receiving one `()` each time playback ends on its own
    ///
    /// Sent when the source ran out with looping disabled, or failed to decode.
    /// Never sent for [`stop`](Self::stop).
    pub fn finished(&self) -> Receiver<()> {
        self.inner.shared.finished_rx.clone()
    }
}
