//! Configuration types for the synchronization engine.

use std::time::Duration;

use crate::error::EngineError;

/// PCM sample representation used for the whole session.
///
/// Selected once at engine construction; the engine dispatches to an
/// i16 or f32 pipeline accordingly and never converts between the two
/// on the hot path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleFormat {
    /// 16-bit signed integer PCM.
    #[default]
    Int16,
    /// 32-bit floating point PCM in `[-1.0, 1.0]`.
    Float32,
}

/// Audio format negotiated with the producer at session start.
///
/// All fields are fixed for the lifetime of the engine. Zero values for
/// `sample_rate`, `channels`, or `frames_per_step` are a fatal
/// configuration error: an incorrect setpoint would corrupt the feedback
/// loop's convergence for the entire session, so they are rejected up
/// front rather than clamped.
#[derive(Debug, Clone, Copy)]
pub struct AudioFormat {
    /// Output device rate in Hz (e.g. 44100, 48000).
    pub sample_rate: u32,
    /// Number of interleaved channels (1 = mono, 2 = stereo).
    pub channels: u16,
    /// Sample representation for both producer and device.
    pub sample_format: SampleFormat,
    /// Nominal frames produced per simulated step.
    ///
    /// Seeds the chunk-size estimator and sizes the ring buffers; the
    /// actual per-step count is allowed to jitter around this value.
    pub frames_per_step: usize,
}

impl AudioFormat {
    /// Validates the format parameters.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.sample_rate == 0 {
            return Err(EngineError::invalid_format("sample_rate must be non-zero"));
        }
        if self.channels == 0 {
            return Err(EngineError::invalid_format("channels must be non-zero"));
        }
        if self.frames_per_step == 0 {
            return Err(EngineError::invalid_format(
                "frames_per_step must be non-zero",
            ));
        }
        Ok(())
    }

    /// Nominal samples produced per simulated step (frames x channels).
    #[must_use]
    pub fn samples_per_step(&self) -> usize {
        self.frames_per_step * self.channels as usize
    }

    /// Nominal simulation frame rate implied by this format, rounded to
    /// the nearest integer.
    #[must_use]
    pub fn nominal_fps(&self) -> u32 {
        (f64::from(self.sample_rate) / self.frames_per_step as f64).round() as u32
    }
}

/// Tuning knobs for the feedback loop.
///
/// The defaults reproduce well-tested values; they rarely need changing.
///
/// # Example
///
/// ```
/// use stream_sync::EngineConfig;
/// use std::time::Duration;
///
/// let config = EngineConfig {
///     ring_multiple: 8,
///     ..Default::default()
/// };
/// assert_eq!(config.backpressure_quantum, Duration::from_micros(100));
/// ```
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Ring buffer capacity as a multiple of the nominal per-step sample
    /// count. Default: 6.
    pub ring_multiple: usize,

    /// Upper band margin, in samples, above the setpoint before the
    /// controller starts draining the input queue faster. Default: 200.
    pub input_band_margin: usize,

    /// Sleep quantum for the bounded backpressure wait when the output
    /// ring is full. Short enough not to peg a core, long enough not to
    /// contend with the real-time callback. Default: 100 microseconds.
    pub backpressure_quantum: Duration,

    /// Divergence, in samples, between the reported nominal chunk size
    /// and the running average beyond which the estimator is reseeded
    /// instead of left to converge. Default: 32.
    pub reseed_tolerance: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ring_multiple: 6,
            input_band_margin: 200,
            backpressure_quantum: Duration::from_micros(100),
            reseed_tolerance: 32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stereo_48k() -> AudioFormat {
        AudioFormat {
            sample_rate: 48000,
            channels: 2,
            sample_format: SampleFormat::Int16,
            frames_per_step: 800,
        }
    }

    #[test]
    fn test_validate_accepts_sane_format() {
        assert!(stereo_48k().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_rate() {
        let format = AudioFormat {
            sample_rate: 0,
            ..stereo_48k()
        };
        assert!(format.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_channels() {
        let format = AudioFormat {
            channels: 0,
            ..stereo_48k()
        };
        assert!(format.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_frames_per_step() {
        let format = AudioFormat {
            frames_per_step: 0,
            ..stereo_48k()
        };
        assert!(format.validate().is_err());
    }

    #[test]
    fn test_samples_per_step_counts_all_channels() {
        assert_eq!(stereo_48k().samples_per_step(), 1600);
    }

    #[test]
    fn test_nominal_fps() {
        assert_eq!(stereo_48k().nominal_fps(), 60);
    }

    #[test]
    fn test_engine_config_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.ring_multiple, 6);
        assert_eq!(config.input_band_margin, 200);
        assert_eq!(config.backpressure_quantum, Duration::from_micros(100));
        assert_eq!(config.reseed_tolerance, 32);
    }
}
