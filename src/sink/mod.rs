//! Sink trait and implementations for audio destinations.
//!
//! A [`Sink`] is any destination that can receive audio chunks. Two
//! built-in sinks are provided:
//!
//! - [`FileSink`]: writes chunks to a WAV file (output duplication)
//! - [`ChannelSink`]: sends chunks to an mpsc channel (captured-audio
//!   delivery to the simulation's input queue)
//!
//! Implement the trait for custom destinations.

mod channel;
mod file;

pub use channel::ChannelSink;
pub use file::FileSink;

use std::sync::Arc;

use crate::{AudioChunk, SinkError};

/// A destination for audio data.
///
/// # Implementation Notes
///
/// - Methods take `&self` - use interior mutability if needed
/// - An output-duplication sink's `write` runs on the real-time audio
///   callback; keep it cheap and never block on the producer
/// - Errors are recoverable: the engine logs them and playback continues
///
/// # Example
///
/// ```
/// use stream_sync::{Sink, AudioChunk, SinkError};
///
/// struct PrintSink;
///
/// impl Sink for PrintSink {
///     fn name(&self) -> &str {
///         "print"
///     }
///
///     fn write(&self, chunk: &AudioChunk) -> Result<(), SinkError> {
///         println!("received {} samples", chunk.samples.len());
///         Ok(())
///     }
/// }
/// ```
pub trait Sink: Send + Sync {
    /// Human-readable name for logging and error messages.
    fn name(&self) -> &str;

    /// Called once before audio flows. Open resources here; errors are
    /// fatal at engine start.
    fn on_start(&self) -> Result<(), SinkError> {
        Ok(())
    }

    /// Write a chunk of audio samples.
    fn write(&self, chunk: &AudioChunk) -> Result<(), SinkError>;

    /// Called at teardown. Flush and close resources here.
    fn finalize(&self) -> Result<(), SinkError> {
        Ok(())
    }
}

impl<S: Sink + ?Sized> Sink for Arc<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn on_start(&self) -> Result<(), SinkError> {
        (**self).on_start()
    }

    fn write(&self, chunk: &AudioChunk) -> Result<(), SinkError> {
        (**self).write(chunk)
    }

    fn finalize(&self) -> Result<(), SinkError> {
        (**self).finalize()
    }
}
