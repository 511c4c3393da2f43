//! Channel layout conversion on interleaved float frames
//!
//! - 1 -> 2: the mono sample is duplicated to left and right
//! - 2 -> 1: left and right are averaged
//! - anything else: the first `min(in, out)` channels are copied and any extra
//!   output channels repeat the last copied one

/// Remap `frame_count` interleaved frames from `in_channels` to `out_channels`
///
/// # Panics
/// If a channel count is zero or a buffer is shorter than `frame_count` frames.
pub fn mix_channels(
    input: &[f32],
    frame_count: usize,
    in_channels: usize,
    output: &mut [f32],
    out_channels: usize,
) {
    assert!(in_channels > 0 && out_channels > 0, "channel count must be non-zero");
    let input = &input[..frame_count * in_channels];
    let output = &mut output[..frame_count * out_channels];

    match (in_channels, out_channels) {
        (1, 2) => {
            for (frame, &sample) in output.chunks_exact_mut(2).zip(input) {
                frame[0] = sample;
                frame[1] = sample;
            }
        }
        (2, 1) => {
            for (sample, frame) in output.iter_mut().zip(input.chunks_exact(2)) {
                *sample = (frame[0] + frame[1]) * 0.5;
            }
        }
        _ => {
            let copied = in_channels.min(out_channels);
            for (dst, src) in output
                .chunks_exact_mut(out_channels)
                .zip(input.chunks_exact(in_channels))
            {
                dst[..copied].copy_from_slice(&src[..copied]);
                let last = src[copied - 1];
                for sample in &mut dst[copied..] {
                    *sample = last;
                }
            }
        }
    }
}
