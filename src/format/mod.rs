//! Audio sample formats and rate conversion.
//!
//! This module provides:
//! - The [`AudioSample`] capability trait over the two PCM
//!   representations the engine supports (i16, f32)
//! - Sample format conversion (f32 ↔ i16)
//! - Fixed-point sample rate conversion (resampling)

mod convert;
pub mod resample;

pub use convert::{f32_to_i16, i16_to_f32};

/// Capability surface for a PCM sample type.
///
/// The engine's buffers, controller, and resampling kernel are generic
/// over this trait; the concrete type is chosen once at init from
/// [`SampleFormat`](crate::SampleFormat) and dispatched through a tagged
/// backend, never branched on per sample.
pub trait AudioSample: Copy + PartialEq + Send + std::fmt::Debug + 'static {
    /// The silence value for this representation.
    const SILENCE: Self;

    /// Linear interpolation between two samples.
    ///
    /// `frac` is in `[0, 1)`; `frac == 0` must reproduce `a` exactly so
    /// that a 1:1 conversion ratio is an identity.
    fn interpolate(a: Self, b: Self, frac: f64) -> Self;

    /// Conversion to 16-bit PCM for sinks that only consume i16.
    fn to_i16(self) -> i16;
}

impl AudioSample for i16 {
    const SILENCE: Self = 0;

    #[inline]
    fn interpolate(a: Self, b: Self, frac: f64) -> Self {
        (f64::from(a) + (f64::from(b) - f64::from(a)) * frac) as i16
    }

    #[inline]
    fn to_i16(self) -> i16 {
        self
    }
}

impl AudioSample for f32 {
    const SILENCE: Self = 0.0;

    #[inline]
    fn interpolate(a: Self, b: Self, frac: f64) -> Self {
        (f64::from(a) + (f64::from(b) - f64::from(a)) * frac) as f32
    }

    #[inline]
    fn to_i16(self) -> i16 {
        convert::f32_to_i16(self)
    }
}
