//! Channel sink implementation.

use std::sync::mpsc::{SyncSender, TrySendError};

use crate::sink::Sink;
use crate::{AudioChunk, SinkError};

/// A sink that forwards audio chunks to an mpsc channel.
///
/// Used for the captured-audio passthrough: the engine pushes captured
/// chunks here and the simulation's input side consumes them from the
/// receiver at its own pace. Sends never block; a full channel is a
/// recoverable write failure.
///
/// # Example
///
/// ```
/// use std::sync::mpsc;
/// use stream_sync::{AudioChunk, ChannelSink, Sink};
/// use std::time::Duration;
///
/// let (tx, rx) = mpsc::sync_channel::<AudioChunk>(32);
/// let sink = ChannelSink::new(tx);
///
/// sink.write(&AudioChunk::new(vec![0i16; 16], Duration::ZERO, 48000, 1)).unwrap();
/// assert_eq!(rx.recv().unwrap().samples.len(), 16);
/// ```
pub struct ChannelSink {
    name: String,
    sender: SyncSender<AudioChunk>,
}

impl ChannelSink {
    /// Creates a channel sink from a bounded sender.
    #[must_use]
    pub fn new(sender: SyncSender<AudioChunk>) -> Self {
        Self {
            name: "channel".to_string(),
            sender,
        }
    }

    /// Creates a channel sink with a custom name for logging.
    #[must_use]
    pub fn named(name: impl Into<String>, sender: SyncSender<AudioChunk>) -> Self {
        Self {
            name: name.into(),
            sender,
        }
    }
}

impl Sink for ChannelSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&self, chunk: &AudioChunk) -> Result<(), SinkError> {
        match self.sender.try_send(chunk.clone()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(SinkError::write_failed("channel full")),
            Err(TrySendError::Disconnected(_)) => Err(SinkError::ChannelClosed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    fn chunk(samples: Vec<i16>) -> AudioChunk {
        AudioChunk::new(samples, Duration::ZERO, 48000, 1)
    }

    #[test]
    fn test_delivers_chunks_in_order() {
        let (tx, rx) = mpsc::sync_channel(4);
        let sink = ChannelSink::new(tx);

        sink.write(&chunk(vec![1])).unwrap();
        sink.write(&chunk(vec![2])).unwrap();

        assert_eq!(*rx.recv().unwrap().samples, vec![1]);
        assert_eq!(*rx.recv().unwrap().samples, vec![2]);
    }

    #[test]
    fn test_full_channel_is_recoverable() {
        let (tx, _rx) = mpsc::sync_channel(1);
        let sink = ChannelSink::new(tx);

        sink.write(&chunk(vec![1])).unwrap();
        let err = sink.write(&chunk(vec![2])).unwrap_err();
        assert!(matches!(err, SinkError::WriteFailed { .. }));
    }

    #[test]
    fn test_disconnected_channel() {
        let (tx, rx) = mpsc::sync_channel(1);
        drop(rx);
        let sink = ChannelSink::named("capture", tx);

        let err = sink.write(&chunk(vec![1])).unwrap_err();
        assert!(matches!(err, SinkError::ChannelClosed));
        assert_eq!(sink.name(), "capture");
    }
}
