//! Fixed-point sample rate conversion.
//!
//! Linear interpolation through a 32.32 fixed-point cursor: fast,
//! deterministic, and exact for a 1:1 ratio. The conversion ratio is
//! retuned every chunk by the rate controller, so the kernel is
//! stateless - the cursor starts at zero for each call.

use crate::format::AudioSample;

/// One whole input frame in 32.32 fixed point.
const FIXED_ONE: u64 = 1 << 32;

/// Mask selecting the fractional part of the cursor.
const FRAC_MASK: u64 = FIXED_ONE - 1;

/// Normalization factor mapping the fractional part to `[0, 1)`.
const FRAC_NORM: f64 = 1.0 / FIXED_ONE as f64;

/// Returns the number of frames a conversion will produce, without
/// performing it.
///
/// `floor(in_frames * out_rate / in_rate)`, truncated down to a whole
/// multiple of `channels`. Use this to size the output buffer before
/// calling [`resample_into`].
#[must_use]
pub fn output_len(in_frames: usize, in_rate: u32, out_rate: u32, channels: usize) -> usize {
    debug_assert!(in_rate > 0 && out_rate > 0, "rates validated at init");
    if in_frames == 0 {
        return 0;
    }
    let frames = (in_frames as u64 * u64::from(out_rate) / u64::from(in_rate)) as usize;
    frames - frames % channels
}

/// Converts `in_frames` interleaved frames from `in_rate` to `out_rate`
/// by linear interpolation, writing into `output`.
///
/// Returns the number of frames written ([`output_len`] of the inputs);
/// `out * channels` samples of `output` are filled.
///
/// The kernel always reads one frame ahead of the interpolation
/// position, so `input` must hold at least `in_frames + 1` frames - the
/// caller over-provisions the final guard frame. `output` must hold at
/// least `output_len(..) * channels` samples.
///
/// An empty input produces zero frames and performs no writes.
pub fn resample_into<T: AudioSample>(
    input: &[T],
    in_frames: usize,
    output: &mut [T],
    in_rate: u32,
    out_rate: u32,
    channels: usize,
) -> usize {
    let out_frames = output_len(in_frames, in_rate, out_rate, channels);
    if out_frames == 0 {
        return 0;
    }

    debug_assert!(
        input.len() >= (in_frames + 1) * channels,
        "input must be over-provisioned by one guard frame"
    );
    debug_assert!(output.len() >= out_frames * channels);

    // 32.32 fixed-point step per output frame
    let step = (f64::from(in_rate) / f64::from(out_rate) * FIXED_ONE as f64 + 0.5) as u64;
    let mut cursor: u64 = 0;
    let mut frame = 0usize;
    let mut written = 0usize;

    for _ in 0..out_frames {
        let frac = (cursor & FRAC_MASK) as f64 * FRAC_NORM;
        let base = frame * channels;
        for c in 0..channels {
            let a = input[base + c];
            let b = input[base + channels + c];
            output[written] = T::interpolate(a, b, frac);
            written += 1;
        }
        cursor += step;
        frame += (cursor >> 32) as usize;
        cursor &= FRAC_MASK;
    }

    out_frames
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Ramp input with one guard frame appended past `frames`.
    fn ramp_mono(frames: usize) -> Vec<i16> {
        (0..=frames).map(|i| (i * 10) as i16).collect()
    }

    #[test]
    fn test_output_len_law() {
        // floor(N_in * out/in), truncated to a channel multiple
        assert_eq!(output_len(480, 48000, 16000, 1), 160);
        assert_eq!(output_len(160, 16000, 48000, 1), 480);
        assert_eq!(output_len(3, 2, 3, 2), 4);
        assert_eq!(output_len(0, 48000, 48000, 2), 0);
    }

    #[test]
    fn test_identity_ratio_reproduces_input() {
        let input = ramp_mono(8);
        let mut output = vec![0i16; 8];
        let n = resample_into(&input, 8, &mut output, 48000, 48000, 1);
        assert_eq!(n, 8);
        assert_eq!(output, &input[..8]);
    }

    #[test]
    fn test_identity_ratio_float() {
        let mut input: Vec<f32> = (0..8).map(|i| i as f32 * 0.1).collect();
        input.push(0.0); // guard frame
        let mut output = vec![0.0f32; 8];
        let n = resample_into(&input, 8, &mut output, 44100, 44100, 1);
        assert_eq!(n, 8);
        assert_eq!(output, &input[..8]);
    }

    #[test]
    fn test_downsample_length() {
        let input = ramp_mono(480);
        let mut output = vec![0i16; 160];
        let n = resample_into(&input, 480, &mut output, 48000, 16000, 1);
        assert_eq!(n, 160);
    }

    #[test]
    fn test_upsample_interpolates_between_frames() {
        // 2x upsample of [0, 1000]: odd outputs sit at the midpoints
        let input = vec![0i16, 1000, 2000]; // last entry is the guard
        let mut output = vec![0i16; 4];
        let n = resample_into(&input, 2, &mut output, 1, 2, 1);
        assert_eq!(n, 4);
        assert_eq!(output[0], 0);
        assert_eq!(output[1], 500);
        assert_eq!(output[2], 1000);
        assert_eq!(output[3], 1500);
    }

    #[test]
    fn test_stereo_channels_independent() {
        // Left channel constant, right channel ramping
        let mut input = Vec::new();
        for i in 0..5i16 {
            input.push(100);
            input.push(i * 100);
        }
        input.extend_from_slice(&[100, 400]); // guard frame
        let mut output = vec![0i16; 8];
        let n = resample_into(&input, 4, &mut output, 2, 2, 2);
        assert_eq!(n, 4);
        for frame in output.chunks_exact(2) {
            assert_eq!(frame[0], 100);
        }
        assert_eq!(output[1], 0);
        assert_eq!(output[3], 100);
    }

    #[test]
    fn test_empty_input_no_output() {
        let input: Vec<i16> = vec![0; 2];
        let mut output = vec![123i16; 4];
        let n = resample_into(&input, 0, &mut output, 48000, 44100, 1);
        assert_eq!(n, 0);
        // No writes on the empty path
        assert_eq!(output, vec![123i16; 4]);
    }

    #[test]
    fn test_ratio_fraction_not_reduced() {
        // 44100:48000 and 22050:24000 are the same fraction; both must
        // produce the same frame count for the same input
        let a = output_len(441, 44100, 48000, 1);
        let b = output_len(441, 22050, 24000, 1);
        assert_eq!(a, b);
    }
}
