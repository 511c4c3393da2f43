//! End-to-end mixing through players, streams and the mixer

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use aumix_core::config::ResamplerConfig;
use aumix_core::{
    AudioFormat, AudioMixer, AudioPlayer, ChannelCount, DecodedSource, PcmBufferSource,
    PlaybackStatus, SampleFormat, SourceError, SourceResult,
};

const FRAMES_PER_CYCLE: usize = 512;

fn mixer(format: AudioFormat) -> Arc<AudioMixer> {
    Arc::new(AudioMixer::new(format, ResamplerConfig::default()))
}

fn i16_stereo(rate: u32) -> AudioFormat {
    AudioFormat::new(ChannelCount::Stereo, rate, SampleFormat::I16)
}

/// Source that yields some data, then fails
struct BrokenSource {
    format: AudioFormat,
    good_bytes: usize,
}

impl DecodedSource for BrokenSource {
    fn read(&mut self, buf: &mut [u8]) -> SourceResult<usize> {
        if self.good_bytes == 0 {
            return Err(SourceError::Decode("truncated frame".to_string()));
        }
        let n = buf.len().min(self.good_bytes);
        buf[..n].fill(0);
        self.good_bytes -= n;
        Ok(n)
    }

    fn info(&self) -> AudioFormat {
        self.format
    }

    fn rewind(&mut self) -> SourceResult<()> {
        Err(SourceError::RewindUnsupported)
    }
}

#[test]
fn source_plays_three_cycles_then_is_removed() {
    let format = i16_stereo(44100);
    let mixer = mixer(format);

    let tone = PcmBufferSource::from_f32(format, &vec![0.5; 3 * FRAMES_PER_CYCLE * 2]);
    assert_eq!(tone.len_frames(), 3 * FRAMES_PER_CYCLE);

    let player = AudioPlayer::with_source(&mixer, tone);
    let finished = player.finished();
    player.play().unwrap();

    let mut buf = vec![0u8; FRAMES_PER_CYCLE * format.bytes_per_frame()];
    for _ in 0..3 {
        assert_eq!(mixer.read_sound_data(&mut buf), buf.len());
        assert!(buf.iter().any(|&b| b != 0));
    }

    assert_eq!(mixer.read_sound_data(&mut buf), 0);
    assert!(buf.iter().all(|&b| b == 0));
    assert_eq!(mixer.source_count(), 0);
    assert_eq!(player.status(), PlaybackStatus::Stopped);
    assert!(finished.try_recv().is_ok());
}

#[test]
fn looping_player_survives_many_cycles() {
    let format = i16_stereo(44100);
    let mixer = mixer(format);

    // Shorter than one cycle so every cycle hits the end
    let tone = PcmBufferSource::sine(format, 220.0, 100.0 / 44100.0, 0.5);
    let player = AudioPlayer::with_source(&mixer, tone);
    player.set_loop(true);
    let finished = player.finished();
    player.play().unwrap();

    let mut buf = vec![0u8; FRAMES_PER_CYCLE * format.bytes_per_frame()];
    for _ in 0..5 {
        assert!(mixer.read_sound_data(&mut buf) > 0);
        assert_eq!(mixer.source_count(), 1);
    }
    assert!(player.is_playing());
    assert!(finished.try_recv().is_err());

    // Turning loop off lets it finish on the next end of source
    player.set_loop(false);
    for _ in 0..3 {
        mixer.read_sound_data(&mut buf);
    }
    assert_eq!(mixer.source_count(), 0);
    assert!(finished.try_recv().is_ok());
}

#[test]
fn failing_source_is_dropped_without_silencing_others() {
    let format = AudioFormat::new(ChannelCount::Stereo, 48000, SampleFormat::F32);
    let mixer = mixer(format);

    let broken = AudioPlayer::with_source(
        &mixer,
        BrokenSource {
            format,
            good_bytes: 0,
        },
    );
    let steady = AudioPlayer::with_source(
        &mixer,
        PcmBufferSource::from_f32(format, &vec![0.25; 48000 * 2]),
    );
    let broken_finished = broken.finished();

    broken.play().unwrap();
    steady.play().unwrap();
    assert_eq!(mixer.source_count(), 2);

    let mut buf = vec![0u8; 256 * format.bytes_per_frame()];
    assert_eq!(mixer.read_sound_data(&mut buf), buf.len());

    assert_eq!(mixer.source_count(), 1);
    assert_eq!(broken.status(), PlaybackStatus::Stopped);
    assert!(steady.is_playing());
    assert!(broken_finished.try_recv().is_ok());

    let first = f32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
    assert_eq!(first, 0.25);
}

#[test]
fn resampled_source_plays_for_expected_duration() {
    let output = i16_stereo(48000);
    let mixer = mixer(output);

    // Half a second of mono 22.05 kHz audio
    let source_format = AudioFormat::new(ChannelCount::Mono, 22050, SampleFormat::I16);
    let tone = PcmBufferSource::sine(source_format, 440.0, 0.5, 0.5);
    let player = AudioPlayer::with_source(&mixer, tone);
    player.play().unwrap();

    let mut buf = vec![0u8; FRAMES_PER_CYCLE * output.bytes_per_frame()];
    let mut cycles = 0;
    while mixer.read_sound_data(&mut buf) > 0 {
        cycles += 1;
        assert!(cycles < 1000, "player never finished");
    }

    // 0.5 s at 48 kHz is ~47 cycles of 512 frames
    assert!((44..=50).contains(&cycles), "cycles = {}", cycles);
    assert_eq!(player.status(), PlaybackStatus::Stopped);
}

#[test]
fn two_players_sum_and_clamp() {
    let format = AudioFormat::new(ChannelCount::Mono, 44100, SampleFormat::I24);
    let mixer = mixer(format);

    let loud = PcmBufferSource::from_f32(format, &vec![0.75; 4096]);
    let a = AudioPlayer::with_source(&mixer, loud.clone());
    let b = AudioPlayer::with_source(&mixer, loud);
    a.play().unwrap();
    b.play().unwrap();

    let mut buf = vec![0u8; 64 * format.bytes_per_frame()];
    mixer.read_sound_data(&mut buf);
    // Clamped to full scale
    assert_eq!(&buf[..3], &[0xFF, 0xFF, 0x7F]);

    b.stop();
    mixer.read_sound_data(&mut buf);
    let value = i32::from_le_bytes([0, buf[0], buf[1], buf[2]]) >> 8;
    assert!((value - (0.75f32 * 8_388_607.0) as i32).abs() <= 1);
}

#[test]
fn control_thread_and_output_thread_run_concurrently() {
    let format = i16_stereo(44100);
    let mixer = mixer(format);
    let tone = PcmBufferSource::sine(format, 330.0, 10.0, 0.3);
    let player = AudioPlayer::with_source(&mixer, tone);
    player.set_loop(true);

    let output_mixer = mixer.clone();
    let output = thread::spawn(move || {
        let mut buf = vec![0u8; 256 * format.bytes_per_frame()];
        for _ in 0..400 {
            output_mixer.read_sound_data(&mut buf);
        }
    });

    for i in 0..200 {
        match i % 4 {
            0 => player.play().unwrap(),
            1 => player.pause(),
            2 => player.set_volume((i % 10) as f32 / 10.0),
            _ => player.stop(),
        }
        if i % 50 == 0 {
            thread::sleep(Duration::from_millis(1));
        }
    }

    output.join().unwrap();
    player.stop();
    assert_eq!(mixer.source_count(), 0);
}
