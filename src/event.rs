//! Runtime status events.
//!
//! Events are non-fatal notifications about engine behavior, intended
//! for a user-visible status line or log. The engine keeps running after
//! every event.

use std::sync::Arc;

/// Status events emitted while the engine is running.
///
/// These are informational, not errors. Register an [`EventCallback`]
/// to forward them to a UI status channel or logger.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// The mute state was toggled.
    MuteChanged {
        /// New mute state.
        muted: bool,
    },

    /// The time-compression level was changed.
    ///
    /// A level of 0 means normal speed; level `F` runs `F` extra
    /// simulation steps per displayed interval with the output rate
    /// divided by `F + 1` to preserve pitch.
    TimeCompressionChanged {
        /// New compression level.
        level: u32,
    },

    /// The simulation reported a new frame rate and the setpoint was
    /// recomputed.
    TimingChanged {
        /// Reported frame rate in steps per second.
        fps: f64,
        /// New target queue occupancy in samples.
        setpoint: usize,
    },

    /// A sink encountered an error during write.
    ///
    /// Playback continues; only the sink's output is affected.
    SinkError {
        /// Name of the sink that errored.
        sink_name: String,
        /// Description of the error.
        error: String,
    },
}

/// Callback type for receiving status events.
pub type EventCallback = Arc<dyn Fn(StreamEvent) + Send + Sync>;

/// Creates an [`EventCallback`] from a closure.
///
/// # Example
///
/// ```
/// use stream_sync::{event_callback, StreamEvent};
///
/// let callback = event_callback(|event| {
///     println!("status: {:?}", event);
/// });
/// ```
pub fn event_callback<F>(f: F) -> EventCallback
where
    F: Fn(StreamEvent) + Send + Sync + 'static,
{
    Arc::new(f)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_event_debug() {
        let event = StreamEvent::MuteChanged { muted: true };
        let debug = format!("{:?}", event);
        assert!(debug.contains("MuteChanged"));
        assert!(debug.contains("true"));
    }

    #[test]
    fn test_event_callback_helper() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let called = Arc::new(AtomicBool::new(false));
        let called_clone = called.clone();

        let callback = event_callback(move |_| {
            called_clone.store(true, Ordering::SeqCst);
        });

        callback(StreamEvent::TimeCompressionChanged { level: 1 });
        assert!(called.load(Ordering::SeqCst));
    }
}
