//! Sample format conversion
//!
//! Every conversion goes through a normalized `f32` in `[-1.0, 1.0]`:
//!
//! | Format | Decode            | Encode (after clamping) |
//! |--------|-------------------|-------------------------|
//! | I16    | `v / 32768`       | `x * 32767`             |
//! | I24    | `v / 8388608`     | `x * 8388607`           |
//! | I32    | `v / 2147483648`  | `x * 2147483647`        |
//! | F32    | as-is             | as-is                   |
//!
//! Converting between identical formats is a plain byte copy.

use crate::types::SampleFormat;

const I16_SCALE: f32 = 1.0 / 32768.0;
const I24_SCALE: f32 = 1.0 / 8_388_608.0;
const I32_SCALE: f64 = 1.0 / 2_147_483_648.0;

/// Decode one little-endian sample to a normalized float
#[inline]
pub fn decode_sample(format: SampleFormat, bytes: &[u8]) -> f32 {
    match format {
        SampleFormat::I16 => i16::from_le_bytes([bytes[0], bytes[1]]) as f32 * I16_SCALE,
        SampleFormat::I24 => {
            // Place the 24 bits in the top of an i32 so the shift sign-extends
            let value = i32::from_le_bytes([0, bytes[0], bytes[1], bytes[2]]) >> 8;
            value as f32 * I24_SCALE
        }
        SampleFormat::I32 => {
            let value = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            (value as f64 * I32_SCALE) as f32
        }
        SampleFormat::F32 => f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
    }
}

/// Encode one normalized float, clamping it to `[-1.0, 1.0]` first
#[inline]
pub fn encode_sample(format: SampleFormat, value: f32, out: &mut [u8]) {
    let value = value.clamp(-1.0, 1.0);
    match format {
        SampleFormat::I16 => {
            let v = (value * 32767.0) as i16;
            out[..2].copy_from_slice(&v.to_le_bytes());
        }
        SampleFormat::I24 => {
            let v = (value * 8_388_607.0) as i32;
            out[..3].copy_from_slice(&v.to_le_bytes()[..3]);
        }
        SampleFormat::I32 => {
            let v = (value as f64 * 2_147_483_647.0) as i32;
            out[..4].copy_from_slice(&v.to_le_bytes());
        }
        SampleFormat::F32 => out[..4].copy_from_slice(&value.to_le_bytes()),
    }
}

/// Convert `sample_count` samples from `input` to `output`
///
/// # Panics
/// If either buffer holds fewer than `sample_count` samples of its format.
pub fn convert_samples(
    in_format: SampleFormat,
    out_format: SampleFormat,
    input: &[u8],
    output: &mut [u8],
    sample_count: usize,
) {
    let in_bps = in_format.bytes_per_sample();
    let out_bps = out_format.bytes_per_sample();
    assert!(input.len() >= sample_count * in_bps, "input buffer too short");
    assert!(output.len() >= sample_count * out_bps, "output buffer too short");

    if in_format == out_format {
        let len = sample_count * in_bps;
        output[..len].copy_from_slice(&input[..len]);
        return;
    }

    for (src, dst) in input
        .chunks_exact(in_bps)
        .zip(output.chunks_exact_mut(out_bps))
        .take(sample_count)
    {
        encode_sample(out_format, decode_sample(in_format, src), dst);
    }
}

/// Decode `output.len()` samples from `input` into floats
///
/// Float input is passed through unclamped.
pub fn decode_to_f32(format: SampleFormat, input: &[u8], output: &mut [f32]) {
    let bps = format.bytes_per_sample();
    assert!(input.len() >= output.len() * bps, "input buffer too short");

    for (src, dst) in input.chunks_exact(bps).zip(output.iter_mut()) {
        *dst = decode_sample(format, src);
    }
}

/// Encode all of `input` into `output`, clamping each sample
pub fn encode_from_f32(format: SampleFormat, input: &[f32], output: &mut [u8]) {
    let bps = format.bytes_per_sample();
    assert!(output.len() >= input.len() * bps, "output buffer too short");

    for (src, dst) in input.iter().zip(output.chunks_exact_mut(bps)) {
        encode_sample(format, *src, dst);
    }
}
