//! # stream-sync
//!
//! Adaptive audio synchronization for variable-rate producers.
//!
//! `stream-sync` reconciles a jittery producer (a simulation loop that
//! emits an irregular number of audio frames each step) with a fixed-rate
//! consumer (an output device that drains exactly N frames per callback
//! and audibly glitches if starved). It does so by continuously re-tuning
//! a sample-rate conversion ratio from bounded queue-occupancy feedback.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stream_sync::{AudioEngine, AudioFormat, EngineConfig, SampleChunk, SampleFormat};
//!
//! let format = AudioFormat {
//!     sample_rate: 48000,
//!     channels: 2,
//!     sample_format: SampleFormat::Int16,
//!     frames_per_step: 800,
//! };
//!
//! let mut engine = AudioEngine::new(format, EngineConfig::default())?;
//! engine.play();
//!
//! // Main loop: once per simulated step
//! loop {
//!     let samples: Vec<i16> = run_one_step();
//!     engine.submit(SampleChunk::Int16(&samples));
//! }
//! ```
//!
//! ## Architecture
//!
//! The crate maintains a strict two-context boundary:
//!
//! - **Producer Context**: called synchronously once per simulated step;
//!   runs the whole rate-control procedure
//! - **CPAL Callback**: high-priority real-time pull that only dequeues
//!   from the output ring buffer
//!
//! The output ring buffer is the only shared state; its lock is held
//! strictly around individual queue operations so the real-time callback
//! is never blocked by producer-side computation.

#![warn(missing_docs)]
// Audio code requires intentional numeric casts between sample formats
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_lossless
)]
// unwrap/expect allowed in tests only
#![allow(clippy::unwrap_used)]
// These doc lints are too strict for internal implementation details
#![allow(clippy::missing_panics_doc, clippy::missing_errors_doc)]

mod chunk;
mod config;
mod engine;
mod error;
mod event;
pub mod format;
mod output;
pub mod pipeline;
mod sink;

pub use chunk::AudioChunk;
pub use config::{AudioFormat, EngineConfig, SampleFormat};
pub use engine::{AudioEngine, AudioEngineBuilder, SampleChunk};
pub use error::{EngineError, SinkError};
pub use event::{event_callback, EventCallback, StreamEvent};
pub use format::AudioSample;
pub use sink::{ChannelSink, FileSink, Sink};
