//! Audio mixer - sums every registered sound source into one output buffer
//!
//! The output callback calls [`AudioMixer::read_sound_data`] once per period.
//! Control threads register and unregister sources at any time.
//!
//! # Locking
//!
//! ```text
//! control thread ──add/remove──► sources: Mutex<Vec<Arc<dyn SoundSource>>>
//!                                         │ snapshot (Arc clones)
//! output callback ──────────────► cycle: Mutex<MixCycle> ──read──► each source
//! ```
//!
//! - The source list is only locked to snapshot it and to drop finished
//!   sources; sources are read without holding it.
//! - The cycle lock owns the float scratch buffers. Only one thread may mix
//!   at a time; a concurrent call trips a debug assertion.
//! - Finished notifications are delivered after the finished sources were
//!   removed and the list lock was released. A source restarted between its
//!   read and the removal reports itself stale and stays registered.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

use crate::config::ResamplerConfig;
use crate::convert::encode_from_f32;
use crate::error::{SourceError, SourceResult};
use crate::types::AudioFormat;

/// Outcome of reading one source for one mixing cycle
#[derive(Debug)]
pub enum SourceRead {
    /// `n` interleaved samples were written (may be `0` when the source has
    /// nothing to contribute this cycle, e.g. while paused)
    Samples(usize),
    /// The source has no more data
    EndOfStream,
    /// The source failed and must be dropped
    Failed(SourceError),
}

/// Something the mixer can pull float PCM from
///
/// Samples are interleaved `f32` in the mixer's output channel layout and rate.
pub trait SoundSource: Send + Sync {
    /// Fill up to `dst.len()` samples
    fn read_samples(&self, dst: &mut [f32]) -> SourceRead;

    /// Whether end of stream should rewind instead of finishing
    fn is_looping(&self) -> bool;

    /// Seek back to the start
    fn rewind(&self) -> SourceResult<()>;

    /// Whether the end or failure last reported by
    /// [`read_samples`](Self::read_samples) no longer applies, e.g. because
    /// the source was restarted in the meantime. Stale sources are kept.
    fn is_stale(&self) -> bool {
        false
    }

    /// Called once after the mixer dropped this source because it ended or failed
    fn on_finished(&self);
}

/// Per-cycle working state, owned by whichever thread is mixing
#[derive(Default)]
struct MixCycle {
    accumulator: Vec<f32>,
    scratch: Vec<f32>,
    snapshot: Vec<Arc<dyn SoundSource>>,
    finished: Vec<Arc<dyn SoundSource>>,
}

/// Software mixer producing PCM in a fixed output format
pub struct AudioMixer {
    output_format: AudioFormat,
    resampler_config: ResamplerConfig,
    sources: Mutex<Vec<Arc<dyn SoundSource>>>,
    cycle: Mutex<MixCycle>,
}

impl AudioMixer {
    /// Create a mixer rendering `output_format`
    pub fn new(output_format: AudioFormat, resampler_config: ResamplerConfig) -> Self {
        log::info!("Audio mixer created: {}", output_format);
        Self {
            output_format,
            resampler_config,
            sources: Mutex::new(Vec::new()),
            cycle: Mutex::new(MixCycle::default()),
        }
    }

    /// Format of the data written by [`read_sound_data`](Self::read_sound_data)
    pub fn output_format(&self) -> AudioFormat {
        self.output_format
    }

    /// Resampler settings for sources feeding this mixer
    pub fn resampler_config(&self) -> &ResamplerConfig {
        &self.resampler_config
    }

    /// Register a source; adding one that is already registered does nothing
    pub fn add_sound_source(&self, source: Arc<dyn SoundSource>) {
        let mut sources = self.lock_sources();
        if sources.iter().any(|s| same_source(s, &source)) {
            log::debug!("Sound source already registered");
            return;
        }
        sources.push(source);
    }

    /// Unregister a source by identity; returns whether it was registered
    ///
    /// A mixing cycle already in progress may still read it once.
    pub fn remove_sound_source(&self, source: &Arc<dyn SoundSource>) -> bool {
        let mut sources = self.lock_sources();
        let before = sources.len();
        sources.retain(|s| !same_source(s, source));
        sources.len() != before
    }

    /// Number of registered sources
    pub fn source_count(&self) -> usize {
        self.lock_sources().len()
    }

    /// Mix all sources into `dst` in the output format
    ///
    /// `dst` is always completely written: silence where no source contributed.
    /// Only whole output frames are mixed; trailing bytes stay zero.
    ///
    /// Returns the number of bytes the largest single contribution covered,
    /// `0` when no source produced anything. It is a progress hint; the
    /// buffer is valid regardless.
    pub fn read_sound_data(&self, dst: &mut [u8]) -> usize {
        dst.fill(0);

        let bytes_per_sample = self.output_format.bytes_per_sample();
        let channels = self.output_format.channels();
        let samples_requested = dst.len() / self.output_format.bytes_per_frame() * channels;
        if samples_requested == 0 {
            return 0;
        }

        let mut guard = self.lock_cycle();
        let cycle = &mut *guard;

        cycle.accumulator.clear();
        cycle.accumulator.resize(samples_requested, 0.0);
        cycle.scratch.resize(samples_requested, 0.0);

        cycle.snapshot.extend(self.lock_sources().iter().cloned());

        let mut max_samples = 0;
        for source in &cycle.snapshot {
            match pull_source(source.as_ref(), &mut cycle.scratch) {
                Some(n) => {
                    let n = n.min(samples_requested);
                    for (acc, sample) in cycle.accumulator.iter_mut().zip(&cycle.scratch[..n]) {
                        *acc += *sample;
                    }
                    max_samples = max_samples.max(n);
                }
                None => cycle.finished.push(source.clone()),
            }
        }
        cycle.snapshot.clear();

        if !cycle.finished.is_empty() {
            {
                // Checked under the list lock so a restart either lands before
                // this (stale, kept) or re-registers after it
                let mut sources = self.lock_sources();
                cycle.finished.retain(|f| !f.is_stale());
                sources.retain(|s| !cycle.finished.iter().any(|f| same_source(s, f)));
            }
            for source in cycle.finished.drain(..) {
                source.on_finished();
            }
        }

        for sample in &mut cycle.accumulator {
            *sample = sample.clamp(-1.0, 1.0);
        }
        encode_from_f32(self.output_format.sample_format, &cycle.accumulator, dst);

        max_samples * bytes_per_sample
    }

    fn lock_sources(&self) -> MutexGuard<'_, Vec<Arc<dyn SoundSource>>> {
        self.sources.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_cycle(&self) -> MutexGuard<'_, MixCycle> {
        match self.cycle.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                debug_assert!(false, "read_sound_data called from two threads at once");
                self.cycle.lock().unwrap_or_else(PoisonError::into_inner)
            }
        }
    }
}

impl Drop for AudioMixer {
    fn drop(&mut self) {
        // Exclusive access through &mut self; poisoning is irrelevant here
        self.sources
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// Read one source; `None` means it must be removed
fn pull_source(source: &dyn SoundSource, scratch: &mut [f32]) -> Option<usize> {
    match source.read_samples(scratch) {
        SourceRead::Samples(n) => Some(n),
        SourceRead::EndOfStream if source.is_looping() => {
            if let Err(e) = source.rewind() {
                log::warn!("Dropping looping source, rewind failed: {}", e);
                return None;
            }
            match source.read_samples(scratch) {
                SourceRead::Samples(n) => Some(n),
                // Empty even from the start: keep it, contribute nothing
                SourceRead::EndOfStream => Some(0),
                SourceRead::Failed(e) => {
                    log::warn!("Dropping sound source after rewind: {}", e);
                    None
                }
            }
        }
        SourceRead::EndOfStream => None,
        SourceRead::Failed(e) => {
            log::warn!("Dropping sound source: {}", e);
            None
        }
    }
}

/// Identity comparison ignoring vtable pointers
fn same_source(a: &Arc<dyn SoundSource>, b: &Arc<dyn SoundSource>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use crate::types::{ChannelCount, SampleFormat};

    /// Constant-value source lasting `cycles` reads
    struct ConstSource {
        value: f32,
        remaining: AtomicUsize,
        looping: AtomicBool,
        rewinds: AtomicUsize,
        finished: AtomicUsize,
        fail: bool,
    }

    impl ConstSource {
        fn new(value: f32, cycles: usize) -> Arc<Self> {
            Arc::new(Self {
                value,
                remaining: AtomicUsize::new(cycles),
                looping: AtomicBool::new(false),
                rewinds: AtomicUsize::new(0),
                finished: AtomicUsize::new(0),
                fail: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                value: 0.0,
                remaining: AtomicUsize::new(1),
                looping: AtomicBool::new(false),
                rewinds: AtomicUsize::new(0),
                finished: AtomicUsize::new(0),
                fail: true,
            })
        }
    }

    impl SoundSource for ConstSource {
        fn read_samples(&self, dst: &mut [f32]) -> SourceRead {
            if self.fail {
                return SourceRead::Failed(SourceError::Decode("corrupt".to_string()));
            }
            if self.remaining.load(Ordering::Relaxed) == 0 {
                return SourceRead::EndOfStream;
            }
            self.remaining.fetch_sub(1, Ordering::Relaxed);
            dst.fill(self.value);
            SourceRead::Samples(dst.len())
        }

        fn is_looping(&self) -> bool {
            self.looping.load(Ordering::Relaxed)
        }

        fn rewind(&self) -> SourceResult<()> {
            self.rewinds.fetch_add(1, Ordering::Relaxed);
            self.remaining.store(1, Ordering::Relaxed);
            Ok(())
        }

        fn on_finished(&self) {
            self.finished.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn mixer(sample_format: SampleFormat) -> AudioMixer {
        AudioMixer::new(
            AudioFormat::new(ChannelCount::Stereo, 48000, sample_format),
            ResamplerConfig::default(),
        )
    }

    fn as_f32(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect()
    }

    #[test]
    fn test_no_sources_gives_silence() {
        let mixer = mixer(SampleFormat::I16);
        let mut buf = vec![0xABu8; 64];
        assert_eq!(mixer.read_sound_data(&mut buf), 0);
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_sources_are_summed() {
        let mixer = mixer(SampleFormat::F32);
        mixer.add_sound_source(ConstSource::new(0.25, 10));
        mixer.add_sound_source(ConstSource::new(0.5, 10));

        let mut buf = vec![0u8; 16 * 4];
        assert_eq!(mixer.read_sound_data(&mut buf), 64);
        assert!(as_f32(&buf).iter().all(|&v| v == 0.75));
    }

    #[test]
    fn test_sum_is_clamped() {
        let mixer = mixer(SampleFormat::I16);
        mixer.add_sound_source(ConstSource::new(1.0, 10));
        mixer.add_sound_source(ConstSource::new(1.0, 10));

        let mut buf = vec![0u8; 8];
        mixer.read_sound_data(&mut buf);
        for sample in buf.chunks_exact(2) {
            assert_eq!(i16::from_le_bytes([sample[0], sample[1]]), 32767);
        }
    }

    #[test]
    fn test_end_of_stream_removes_and_notifies() {
        let mixer = mixer(SampleFormat::I24);
        let source = ConstSource::new(0.5, 2);
        mixer.add_sound_source(source.clone());

        let mut buf = vec![0u8; 6 * 4];
        assert_eq!(mixer.read_sound_data(&mut buf), 24);
        assert_eq!(mixer.read_sound_data(&mut buf), 24);
        assert_eq!(mixer.source_count(), 1);

        assert_eq!(mixer.read_sound_data(&mut buf), 0);
        assert_eq!(mixer.source_count(), 0);
        assert_eq!(source.finished.load(Ordering::Relaxed), 1);
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_looping_source_is_kept() {
        let mixer = mixer(SampleFormat::F32);
        let source = ConstSource::new(0.5, 1);
        source.looping.store(true, Ordering::Relaxed);
        mixer.add_sound_source(source.clone());

        let mut buf = vec![0u8; 32];
        for _ in 0..5 {
            assert_eq!(mixer.read_sound_data(&mut buf), 32);
            assert!(as_f32(&buf).iter().all(|&v| v == 0.5));
        }
        assert_eq!(mixer.source_count(), 1);
        assert_eq!(source.rewinds.load(Ordering::Relaxed), 4);
        assert_eq!(source.finished.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_failing_source_removed_others_continue() {
        let mixer = mixer(SampleFormat::F32);
        let bad = ConstSource::failing();
        let good = ConstSource::new(0.125, 10);
        mixer.add_sound_source(bad.clone());
        mixer.add_sound_source(good.clone());

        let mut buf = vec![0u8; 32];
        assert_eq!(mixer.read_sound_data(&mut buf), 32);
        assert!(as_f32(&buf).iter().all(|&v| v == 0.125));
        assert_eq!(mixer.source_count(), 1);
        assert_eq!(bad.finished.load(Ordering::Relaxed), 1);
        assert_eq!(good.finished.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_add_is_idempotent_and_remove_by_identity() {
        let mixer = mixer(SampleFormat::I16);
        let a: Arc<dyn SoundSource> = ConstSource::new(0.1, 1);
        let b: Arc<dyn SoundSource> = ConstSource::new(0.1, 1);

        mixer.add_sound_source(a.clone());
        mixer.add_sound_source(a.clone());
        mixer.add_sound_source(b.clone());
        assert_eq!(mixer.source_count(), 2);

        assert!(mixer.remove_sound_source(&a));
        assert!(!mixer.remove_sound_source(&a));
        assert_eq!(mixer.source_count(), 1);
    }

    #[test]
    fn test_partial_frame_bytes_ignored() {
        let mixer = mixer(SampleFormat::I16);
        mixer.add_sound_source(ConstSource::new(0.5, 10));

        // 3 bytes is less than one stereo I16 frame
        let mut buf = vec![0xFFu8; 3];
        assert_eq!(mixer.read_sound_data(&mut buf), 0);
        assert_eq!(buf, [0, 0, 0]);
    }

    #[test]
    fn test_drop_releases_sources() {
        let source = ConstSource::new(0.5, 1);
        let mixer = mixer(SampleFormat::I16);
        mixer.add_sound_source(source.clone());
        assert_eq!(Arc::strong_count(&source), 2);

        drop(mixer);
        assert_eq!(Arc::strong_count(&source), 1);
    }
}
