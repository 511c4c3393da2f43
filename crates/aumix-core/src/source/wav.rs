//! WAV file source
//!
//! Exposes 16/24/32-bit integer and 32-bit float WAV data, mono or stereo,
//! as raw little-endian PCM without any conversion.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use hound::WavReader;

use super::DecodedSource;
use crate::error::{SourceError, SourceResult};
use crate::types::{AudioFormat, ChannelCount, SampleFormat};

/// Decoded source backed by a `hound` WAV reader
pub struct WavSource<R = BufReader<File>> {
    reader: WavReader<R>,
    format: AudioFormat,
}

impl WavSource<BufReader<File>> {
    /// Open a WAV file from disk
    pub fn open(path: impl AsRef<Path>) -> SourceResult<Self> {
        let path = path.as_ref();
        let reader = WavReader::open(path)?;
        log::debug!("Opened WAV {:?}: {:?}", path, reader.spec());
        Self::from_wav_reader(reader)
    }
}

impl<R: Read + Seek> WavSource<R> {
    /// Parse a WAV stream from any seekable reader
    pub fn new(reader: R) -> SourceResult<Self> {
        Self::from_wav_reader(WavReader::new(reader)?)
    }

    fn from_wav_reader(reader: WavReader<R>) -> SourceResult<Self> {
        let spec = reader.spec();

        let channel_count = ChannelCount::from_count(spec.channels as usize).ok_or_else(|| {
            SourceError::UnsupportedFormat(format!("{} channels", spec.channels))
        })?;

        let sample_format = match (spec.sample_format, spec.bits_per_sample) {
            (hound::SampleFormat::Int, 16) => SampleFormat::I16,
            (hound::SampleFormat::Int, 24) => SampleFormat::I24,
            (hound::SampleFormat::Int, 32) => SampleFormat::I32,
            (hound::SampleFormat::Float, 32) => SampleFormat::F32,
            (kind, bits) => {
                return Err(SourceError::UnsupportedFormat(format!(
                    "{}-bit {:?} samples",
                    bits, kind
                )))
            }
        };

        if spec.sample_rate == 0 {
            return Err(SourceError::UnsupportedFormat("0Hz sample rate".to_string()));
        }

        Ok(Self {
            reader,
            format: AudioFormat::new(channel_count, spec.sample_rate, sample_format),
        })
    }

    /// Length of the file in frames
    pub fn len_frames(&self) -> u32 {
        self.reader.duration()
    }
}

impl<R: Read + Seek + Send> DecodedSource for WavSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> SourceResult<usize> {
        let bps = self.format.bytes_per_sample();
        let mut written = 0;

        match self.format.sample_format {
            SampleFormat::I16 => {
                for (dst, sample) in buf.chunks_exact_mut(bps).zip(self.reader.samples::<i16>()) {
                    dst.copy_from_slice(&sample?.to_le_bytes());
                    written += bps;
                }
            }
            SampleFormat::I24 | SampleFormat::I32 => {
                for (dst, sample) in buf.chunks_exact_mut(bps).zip(self.reader.samples::<i32>()) {
                    dst.copy_from_slice(&sample?.to_le_bytes()[..bps]);
                    written += bps;
                }
            }
            SampleFormat::F32 => {
                for (dst, sample) in buf.chunks_exact_mut(bps).zip(self.reader.samples::<f32>()) {
                    dst.copy_from_slice(&sample?.to_le_bytes());
                    written += bps;
                }
            }
        }

        Ok(written)
    }

    fn info(&self) -> AudioFormat {
        self.format
    }

    fn rewind(&mut self) -> SourceResult<()> {
        self.reader.seek(0)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::read_fully;

    fn write_wav(path: &Path, spec: hound::WavSpec, samples: &[i32]) {
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    fn int_spec(channels: u16, bits: u16) -> hound::WavSpec {
        hound::WavSpec {
            channels,
            sample_rate: 22050,
            bits_per_sample: bits,
            sample_format: hound::SampleFormat::Int,
        }
    }

    #[test]
    fn test_reads_16_bit_stereo() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_wav(&path, int_spec(2, 16), &[100, -100, 32767, -32768]);

        let mut source = WavSource::open(&path).unwrap();
        assert_eq!(
            source.info(),
            AudioFormat::new(ChannelCount::Stereo, 22050, SampleFormat::I16)
        );
        assert_eq!(source.len_frames(), 2);

        let mut buf = [0u8; 16];
        assert_eq!(read_fully(&mut source, &mut buf).unwrap(), 8);
        assert_eq!(&buf[..2], &100i16.to_le_bytes());
        assert_eq!(&buf[6..8], &(-32768i16).to_le_bytes());
        assert_eq!(source.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_reads_24_bit_packed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.wav");
        write_wav(&path, int_spec(1, 24), &[-8_388_608, 8_388_607]);

        let mut source = WavSource::open(&path).unwrap();
        assert_eq!(source.info().sample_format, SampleFormat::I24);

        let mut buf = [0u8; 6];
        assert_eq!(source.read(&mut buf).unwrap(), 6);
        assert_eq!(buf, [0x00, 0x00, 0x80, 0xFF, 0xFF, 0x7F]);
    }

    #[test]
    fn test_rewind_restarts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.wav");
        write_wav(&path, int_spec(1, 16), &[1, 2, 3]);

        let mut source = WavSource::open(&path).unwrap();
        let mut buf = [0u8; 6];
        assert_eq!(source.read(&mut buf).unwrap(), 6);
        assert_eq!(source.read(&mut buf).unwrap(), 0);

        source.rewind().unwrap();
        assert_eq!(source.read(&mut buf[..2]).unwrap(), 2);
        assert_eq!(&buf[..2], &1i16.to_le_bytes());
    }

    #[test]
    fn test_rejects_surround() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("surround.wav");
        write_wav(&path, int_spec(6, 16), &[0; 6]);

        assert!(matches!(
            WavSource::open(&path),
            Err(SourceError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_rejects_8_bit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lofi.wav");
        write_wav(&path, int_spec(1, 8), &[0, 1]);

        assert!(matches!(
            WavSource::open(&path),
            Err(SourceError::UnsupportedFormat(_))
        ));
    }
}
