//! aumix-play - play WAV files or a test tone through the shared output
//!
//! Every file gets its own player on the process-wide mixer, so several
//! files play at once.
//!
//! ## Command line
//!
//! ```text
//! aumix-play [--config PATH] [--loop] [--volume V] [--tone HZ] [--seconds S]
//!            [--list-devices] FILE...
//! ```
//!
//! - `--config PATH`: audio config YAML (default `<config dir>/aumix/config.yaml`)
//! - `--loop`: loop every source until interrupted (or `--seconds` elapse)
//! - `--volume V`: player volume in `[0.0, 1.0]`
//! - `--tone HZ`: add a generated sine tone
//! - `--seconds S`: stop after S seconds (at most one day); also the tone
//!   length (default 2, at most 10 minutes)
//! - `--list-devices`: print output devices and exit

use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use crossbeam::channel::RecvTimeoutError;

use aumix_core::audio::{global_output, output_devices, AudioConfig};
use aumix_core::config::{default_config_path, load_config, load_config_strict, CONFIG_FILE_NAME};
use aumix_core::{AudioFormat, AudioPlayer, ChannelCount, PcmBufferSource, SampleFormat, WavSource};

const DEFAULT_TONE_SECONDS: f32 = 2.0;
/// The tone is rendered up front, so its length is capped
const MAX_TONE_SECONDS: f32 = 600.0;
const TONE_AMPLITUDE: f32 = 0.5;
const MAX_SECONDS: f32 = 86_400.0;

/// Parsed command line
#[derive(Debug, Default, PartialEq)]
struct Args {
    config: Option<PathBuf>,
    looping: bool,
    volume: Option<f32>,
    tone: Option<f32>,
    seconds: Option<f32>,
    list_devices: bool,
    files: Vec<PathBuf>,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args> {
    let mut parsed = Args::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        let mut value = |name: &str| {
            args.next()
                .with_context(|| format!("{} needs a value", name))
        };
        match arg.as_str() {
            "--config" => parsed.config = Some(PathBuf::from(value("--config")?)),
            "--loop" => parsed.looping = true,
            "--volume" => parsed.volume = Some(parse_number("--volume", &value("--volume")?)?),
            "--tone" => parsed.tone = Some(parse_number("--tone", &value("--tone")?)?),
            "--seconds" => {
                let seconds = parse_number("--seconds", &value("--seconds")?)?;
                if seconds > MAX_SECONDS {
                    bail!("--seconds must be at most {}", MAX_SECONDS);
                }
                parsed.seconds = Some(seconds);
            }
            "--list-devices" => parsed.list_devices = true,
            flag if flag.starts_with("--") => bail!("Unknown option {}", flag),
            file => parsed.files.push(PathBuf::from(file)),
        }
    }

    if !parsed.list_devices && parsed.files.is_empty() && parsed.tone.is_none() {
        bail!("Nothing to play: give WAV files or --tone HZ");
    }
    Ok(parsed)
}

fn parse_number(name: &str, text: &str) -> Result<f32> {
    let value: f32 = text
        .parse()
        .with_context(|| format!("{} expects a number, got {:?}", name, text))?;
    if !value.is_finite() || value < 0.0 {
        bail!("{} must be a non-negative number", name);
    }
    Ok(value)
}

fn load_audio_config(path: Option<&PathBuf>) -> Result<AudioConfig> {
    match path {
        // A config the user named must exist and parse
        Some(path) => load_config_strict(path),
        None => Ok(load_config(&default_config_path(CONFIG_FILE_NAME))),
    }
}

fn list_devices() -> Result<()> {
    let devices = output_devices().context("Failed to list output devices")?;
    for device in devices {
        println!("{}  ({} ch)", device, device.max_channels);
    }
    Ok(())
}

fn run(args: Args) -> Result<()> {
    if args.list_devices {
        return list_devices();
    }

    let config = load_audio_config(args.config.as_ref())?;
    let output = global_output(&config).context("Failed to start audio output")?;
    log::info!("Playing on {} ({})", output.device_name, output.format());

    let mut players = Vec::new();
    for path in &args.files {
        let source = WavSource::open(path).with_context(|| format!("Failed to open {:?}", path))?;
        log::info!("{:?}: {} frames", path, source.len_frames());
        players.push(AudioPlayer::with_source(&output.mixer, source));
    }
    if let Some(frequency) = args.tone {
        let format = AudioFormat::new(
            ChannelCount::Mono,
            output.format().sample_rate,
            SampleFormat::F32,
        );
        let seconds = args.seconds.unwrap_or(DEFAULT_TONE_SECONDS);
        if seconds > MAX_TONE_SECONDS {
            log::warn!("Tone limited to {} seconds", MAX_TONE_SECONDS);
        }
        let seconds = seconds.min(MAX_TONE_SECONDS);
        let tone = PcmBufferSource::sine(format, frequency, seconds, TONE_AMPLITUDE);
        players.push(AudioPlayer::with_source(&output.mixer, tone));
    }

    for player in &players {
        player.set_loop(args.looping);
        if let Some(volume) = args.volume {
            player.set_volume(volume);
        }
        player.play()?;
    }

    let deadline = args
        .seconds
        .map(|s| Instant::now() + Duration::from_secs_f32(s));

    if args.looping {
        match deadline {
            Some(deadline) => thread::sleep(deadline.saturating_duration_since(Instant::now())),
            None => loop {
                thread::park();
            },
        }
    } else {
        for player in &players {
            let finished = player.finished();
            let result = match deadline {
                Some(deadline) => finished.recv_deadline(deadline),
                None => finished.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            if let Err(RecvTimeoutError::Timeout) = result {
                log::info!("Time limit reached");
                break;
            }
        }
    }

    for player in &players {
        player.stop();
    }
    log::info!("Done");
    Ok(())
}

fn main() -> Result<()> {
    // Initialize logger - set RUST_LOG=debug for verbose output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = parse_args(std::env::args().skip(1))?;
    run(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args> {
        parse_args(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_files_and_flags() {
        let args = parse(&["--loop", "--volume", "0.5", "a.wav", "b.wav"]).unwrap();
        assert!(args.looping);
        assert_eq!(args.volume, Some(0.5));
        assert_eq!(args.files, vec![PathBuf::from("a.wav"), PathBuf::from("b.wav")]);
    }

    #[test]
    fn test_tone_only() {
        let args = parse(&["--tone", "440", "--seconds", "1.5"]).unwrap();
        assert_eq!(args.tone, Some(440.0));
        assert_eq!(args.seconds, Some(1.5));
        assert!(args.files.is_empty());
    }

    #[test]
    fn test_list_devices_needs_no_input() {
        assert!(parse(&["--list-devices"]).unwrap().list_devices);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["--volume"]).is_err());
        assert!(parse(&["--volume", "loud", "a.wav"]).is_err());
        assert!(parse(&["--seconds", "-1", "a.wav"]).is_err());
        assert!(parse(&["--seconds", "1e30", "a.wav"]).is_err());
        assert!(parse(&["--seconds", "inf", "a.wav"]).is_err());
        assert!(parse(&["--shuffle", "a.wav"]).is_err());
    }
}
