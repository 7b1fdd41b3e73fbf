//! Per-chunk rate-control feedback loop.
//!
//! Invoked once per produced chunk from the producer context. Each
//! invocation re-estimates the producer's chunk size, nudges both queue
//! occupancies toward their bands, retunes the resampling ratio, and
//! moves one chunk's worth of audio from the input ring to the output
//! ring through the resampler.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::config::{AudioFormat, EngineConfig};
use crate::error::EngineError;
use crate::format::{resample, AudioSample};
use crate::pipeline::{MovingAverage, RingBuffer};

/// The feedback loop tying estimator, resampler, and ring buffers
/// together.
///
/// All state is owned here except the output ring, which is shared with
/// the real-time pull path behind a mutex. The controller runs entirely
/// in the producer context; the lock is taken only for individual queue
/// operations, never across computation or the backpressure wait.
pub struct RateController<T: AudioSample> {
    device_rate: u32,
    channels: usize,

    mavg: MovingAverage,
    input: RingBuffer<T>,
    output: Arc<Mutex<RingBuffer<T>>>,

    scratch_in: Vec<T>,
    scratch_out: Vec<T>,

    /// Target queue occupancy in samples for one simulated step.
    spf: usize,
    /// Reported simulation frame rate, rounded to the nearest integer.
    fps: u32,
    /// Persistent input-band offset in samples; re-decided only when
    /// occupancy leaves the hold band.
    band_offset: i32,

    /// Ratio from the previous invocation, reused if a retune would be
    /// degenerate.
    ratio: (u32, u32),

    time_compression: u32,
    muted: bool,

    input_band_margin: usize,
    reseed_tolerance: usize,
    backpressure_quantum: Duration,
}

impl<T: AudioSample> RateController<T> {
    /// Builds the full pipeline for one session: both rings sized to
    /// `ring_multiple` steps of audio, the estimator seeded with the
    /// nominal chunk size, and the conversion ratio at identity.
    pub fn new(format: &AudioFormat, config: &EngineConfig) -> Result<Self, EngineError> {
        format.validate()?;

        let channels = format.channels as usize;
        let nominal = format.samples_per_step();
        let ring_capacity = nominal * config.ring_multiple;

        Ok(Self {
            device_rate: format.sample_rate,
            channels,
            mavg: MovingAverage::new(nominal),
            input: RingBuffer::new(ring_capacity),
            output: Arc::new(Mutex::new(RingBuffer::new(ring_capacity))),
            // One guard frame past the scratch payload; the kernel
            // reads one frame ahead of the interpolation position.
            scratch_in: vec![T::SILENCE; nominal * 4 + channels],
            scratch_out: vec![T::SILENCE; nominal * 8],
            spf: nominal,
            fps: format.nominal_fps(),
            band_offset: 0,
            ratio: (format.sample_rate, format.sample_rate),
            time_compression: 0,
            muted: false,
            input_band_margin: config.input_band_margin,
            reseed_tolerance: config.reseed_tolerance,
            backpressure_quantum: config.backpressure_quantum,
        })
    }

    /// Handle to the output ring for the pull path.
    #[must_use]
    pub fn output_handle(&self) -> Arc<Mutex<RingBuffer<T>>> {
        Arc::clone(&self.output)
    }

    /// Accepts the simulation's current frame rate and recomputes the
    /// setpoint. Returns the new setpoint.
    ///
    /// If the implied chunk size diverges from the running average
    /// beyond tolerance the estimator is force-reseeded, avoiding a
    /// multi-second settling transient on abrupt rate changes (e.g. an
    /// emulated video-mode switch).
    pub fn set_frame_rate(&mut self, fps: f64) -> usize {
        // Round first: anything in (0, 0.5) would otherwise round to a
        // zero divisor below.
        let rounded = fps.round();
        if rounded < 1.0 {
            tracing::warn!(fps, "ignoring out-of-range frame rate");
            return self.spf;
        }

        self.fps = rounded as u32;
        self.spf = (self.device_rate / self.fps) as usize * self.channels;

        let divergence = (self.spf as f64 - self.mavg.avg()).abs();
        if divergence > self.reseed_tolerance as f64 {
            let old = self.mavg.avg();
            self.mavg.seed(self.spf);
            tracing::debug!(fps, spf = self.spf, old, "estimator reseeded");
        }

        self.spf
    }

    /// Sets the mute flag. Muted audio is replaced with silence at the
    /// resampler's input while the queues keep draining at the same
    /// rate, so muting never perturbs the timing model.
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    /// Sets the time-compression level `F` (0 = normal speed). The base
    /// output rate is divided by `F + 1`, which combined with `F` extra
    /// producer steps per displayed interval compresses wall-clock time
    /// while preserving pitch.
    pub fn set_time_compression(&mut self, level: u32) {
        self.time_compression = level;
    }

    /// Current target occupancy in samples.
    #[must_use]
    pub fn setpoint(&self) -> usize {
        self.spf
    }

    /// Current input-ring occupancy in samples.
    #[must_use]
    pub fn input_occupancy(&self) -> usize {
        self.input.occupancy()
    }

    /// Current output-ring occupancy in samples.
    #[must_use]
    pub fn output_occupancy(&self) -> usize {
        self.output.lock().occupancy()
    }

    /// The `(in_rate, out_rate)` fraction from the latest invocation.
    #[must_use]
    pub fn conversion_ratio(&self) -> (u32, u32) {
        self.ratio
    }

    /// The chunk-produced entry point: runs one full feedback
    /// invocation on `samples` (interleaved, one simulated step).
    pub fn submit(&mut self, samples: &[T]) {
        if samples.is_empty() {
            return;
        }

        self.mavg.push(samples.len());

        // Estimated chunk size, rounded up to an even sample count so
        // stereo pairs are never split.
        let avg = self.mavg.avg() as usize;
        let mut ma_insamps = avg + (avg & 1);

        // Input-queue regulation: banded baby steps, not proportional
        // control. The offset persists between decisions.
        let in_occ = self.input.occupancy();
        if in_occ == self.spf {
            self.band_offset = 0;
        } else if in_occ < self.spf {
            self.band_offset = -(self.channels as i32);
        } else if in_occ > self.spf + self.input_band_margin {
            self.band_offset = self.channels as i32;
        }
        ma_insamps = ma_insamps.saturating_add_signed(self.band_offset as isize);

        // Start of stream: consume only about half the chunk, leaving
        // the rest as a cushion instead of waiting for the band logic
        // to build one (which would underrun immediately).
        if self.input.is_empty() {
            ma_insamps = samples.len() / 2;
            ma_insamps += ma_insamps & 1;
        }
        ma_insamps -= ma_insamps % self.channels;
        // Bound by the scratch payload (guard frame excluded)
        ma_insamps = ma_insamps.min(self.scratch_in.len() - self.channels);

        let in_rate = (ma_insamps as u32 / self.channels as u32) * self.fps;

        // Base output rate, compressed under time compression
        let mut out_rate = self.device_rate / (self.time_compression + 1);

        // Output-queue regulation: graduated bands around multiples of
        // the setpoint, with correction strength scaling with the frame
        // rate rather than a fixed constant.
        let unit = self.fps * self.channels as u32;
        let out_occ = self.output.lock().occupancy();
        if out_occ < self.spf {
            out_rate += 2 * unit; // Push More
        } else if out_occ < self.spf * 2 {
            out_rate += unit; // Push More, gently
        } else if out_occ > self.spf * 3 {
            out_rate = out_rate.saturating_sub(unit); // Push Less
        }

        // Retune as a fraction; a degenerate rate keeps the previous
        // ratio rather than aborting playback.
        if in_rate == 0 || out_rate == 0 {
            tracing::debug!(in_rate, out_rate, "degenerate retune, keeping previous ratio");
        } else {
            self.ratio = (in_rate, out_rate);
        }
        let (in_rate, out_rate) = self.ratio;

        // Move this chunk into the input queue, then drain the
        // estimated amount for resampling. Truncation on a full ring is
        // deliberate; the band logic re-centers occupancy afterwards.
        let _ = self.input.enqueue(samples);

        for slot in &mut self.scratch_in[..ma_insamps] {
            *slot = self.input.dequeue();
        }
        // Guard frame: repeat the final frame for the kernel's one-ahead read
        for c in 0..self.channels {
            self.scratch_in[ma_insamps + c] = if ma_insamps >= self.channels {
                self.scratch_in[ma_insamps - self.channels + c]
            } else {
                T::SILENCE
            };
        }
        if self.muted {
            for slot in &mut self.scratch_in[..ma_insamps + self.channels] {
                *slot = T::SILENCE;
            }
        }

        let in_frames = ma_insamps / self.channels;
        let needed = resample::output_len(in_frames, in_rate, out_rate, self.channels) * self.channels;
        if needed > self.scratch_out.len() {
            self.scratch_out.resize(needed, T::SILENCE);
        }

        let out_frames = resample::resample_into(
            &self.scratch_in[..ma_insamps + self.channels],
            in_frames,
            &mut self.scratch_out,
            in_rate,
            out_rate,
            self.channels,
        );
        let mut out_samples = out_frames * self.channels;

        // A single burst larger than the ring can never fit no matter
        // how long the consumer drains; truncate it the way the ring
        // itself would instead of waiting for room that cannot appear.
        let capacity = self.output.lock().capacity();
        if out_samples >= capacity {
            out_samples = capacity - 1;
            out_samples -= out_samples % self.channels;
        }

        // Bounded backpressure: wait for room instead of dropping
        // resampled audio. The lock is only held for the occupancy
        // probe, never across the sleep, so the real-time callback can
        // keep draining.
        loop {
            let out = self.output.lock();
            if out.occupancy() + out_samples < out.capacity() {
                break;
            }
            drop(out);
            std::thread::sleep(self.backpressure_quantum);
        }

        self.output.lock().enqueue(&self.scratch_out[..out_samples]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SampleFormat;

    fn stereo_48k() -> AudioFormat {
        AudioFormat {
            sample_rate: 48000,
            channels: 2,
            sample_format: SampleFormat::Int16,
            frames_per_step: 800,
        }
    }

    fn controller() -> RateController<i16> {
        RateController::new(&stereo_48k(), &EngineConfig::default()).unwrap()
    }

    /// Drains one step's worth of samples, as the device callback would.
    fn drain(ctl: &RateController<i16>, samples: usize) {
        let ring = ctl.output_handle();
        let mut ring = ring.lock();
        for _ in 0..samples {
            ring.dequeue();
        }
    }

    #[test]
    fn test_rejects_invalid_format() {
        let format = AudioFormat {
            channels: 0,
            ..stereo_48k()
        };
        assert!(RateController::<i16>::new(&format, &EngineConfig::default()).is_err());
    }

    #[test]
    fn test_empty_chunk_is_noop() {
        let mut ctl = controller();
        ctl.submit(&[]);
        assert_eq!(ctl.input_occupancy(), 0);
        assert_eq!(ctl.output_occupancy(), 0);
    }

    #[test]
    fn test_start_of_stream_seeds_half_chunk() {
        let mut ctl = controller();
        ctl.submit(&vec![0i16; 1600]);
        // Half of the first chunk stays queued as a cushion
        assert_eq!(ctl.input_occupancy(), 800);
    }

    #[test]
    fn test_setpoint_recomputed_on_timing_change() {
        let mut ctl = controller();
        assert_eq!(ctl.setpoint(), 1600);
        assert_eq!(ctl.set_frame_rate(50.0), 1920);
    }

    #[test]
    fn test_subunit_frame_rate_is_rejected() {
        let mut ctl = controller();
        // Rates that round to zero must be rejected, not divided by
        assert_eq!(ctl.set_frame_rate(0.4), 1600);
        assert_eq!(ctl.set_frame_rate(-30.0), 1600);
        assert_eq!(ctl.setpoint(), 1600);

        // 0.5 rounds to 1 and is a valid, if extreme, rate
        assert_eq!(ctl.set_frame_rate(0.5), 48000 * 2);
    }

    #[test]
    fn test_oversized_burst_truncates_instead_of_stalling() {
        let mut ctl = controller();
        // At 5 fps one resampled chunk exceeds the whole ring, which
        // was sized for 60 fps steps; submit must return with the
        // burst truncated rather than wait for room that cannot appear
        ctl.set_frame_rate(5.0);
        ctl.submit(&vec![0i16; 9600]);

        let capacity = 1600 * 6;
        let occupancy = ctl.output_occupancy();
        assert!(occupancy > 0);
        assert!(occupancy < capacity);
    }

    #[test]
    fn test_worked_example_converges() {
        // 48000 Hz stereo at 60 fps: spf = 1600; a producer emitting
        // 1600 samples (800 frames) per call must stabilize ma_insamps
        // at 1600 and in_rate at 48000.
        let mut ctl = controller();
        let chunk = vec![0i16; 1600];
        for _ in 0..600 {
            ctl.submit(&chunk);
            drain(&ctl, 1600);
        }
        assert_eq!(ctl.input_occupancy(), 1600);
        let (in_rate, _) = ctl.conversion_ratio();
        assert_eq!(in_rate, 48000);
    }

    #[test]
    fn test_output_band_raises_rate_when_starved() {
        let mut ctl = controller();
        ctl.submit(&vec![0i16; 1600]); // output near-empty on entry
        let (in_rate, out_rate) = ctl.conversion_ratio();
        // Strong push: base 48000 plus two units of 60 * 2
        assert_eq!(out_rate, 48000 + 240);
        assert!(in_rate > 0);
    }

    #[test]
    fn test_time_compression_divides_base_rate() {
        let mut ctl = controller();
        ctl.set_time_compression(1);
        // Pre-fill output into the hold band so no band offset applies
        {
            let ring = ctl.output_handle();
            ring.lock().enqueue(&vec![0i16; 1600 * 2 + 100]);
        }
        ctl.submit(&vec![0i16; 1600]);
        let (_, out_rate) = ctl.conversion_ratio();
        assert_eq!(out_rate, 24000);
    }

    #[test]
    fn test_mute_does_not_change_occupancy_trajectory() {
        let mut muted = controller();
        let mut unmuted = controller();
        muted.set_muted(true);

        let chunk = vec![500i16; 1600];
        for _ in 0..50 {
            muted.submit(&chunk);
            unmuted.submit(&chunk);
            drain(&muted, 1600);
            drain(&unmuted, 1600);
            assert_eq!(muted.input_occupancy(), unmuted.input_occupancy());
            assert_eq!(muted.output_occupancy(), unmuted.output_occupancy());
        }
    }

    #[test]
    fn test_muted_output_is_silent() {
        let mut ctl = controller();
        ctl.set_muted(true);
        ctl.submit(&vec![12345i16; 1600]);

        let ring = ctl.output_handle();
        let mut ring = ring.lock();
        let occupancy = ring.occupancy();
        assert!(occupancy > 0);
        for _ in 0..occupancy {
            assert_eq!(ring.dequeue(), 0);
        }
    }
}
