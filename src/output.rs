//! Real-time output: the CPAL stream and its pull path.
//!
//! The platform audio layer invokes the stream callback on its own
//! schedule; the callback only dequeues from the output ring (silence on
//! underrun) and optionally duplicates the same frames to a sink. All
//! rate decisions happen on the producer side.

use std::sync::Arc;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig as CpalStreamConfig};
use parking_lot::Mutex;

use crate::chunk::AudioChunk;
use crate::config::AudioFormat;
use crate::error::EngineError;
use crate::event::{EventCallback, StreamEvent};
use crate::format::AudioSample;
use crate::pipeline::RingBuffer;
use crate::sink::Sink;

/// Fills `data` from the output ring, zero-filling on underrun.
///
/// This is the entire body of the real-time callback's ring access: the
/// lock is held for the dequeue loop and nothing else.
pub(crate) fn pull<T: AudioSample>(ring: &Mutex<RingBuffer<T>>, data: &mut [T]) {
    let mut ring = ring.lock();
    for slot in data.iter_mut() {
        *slot = ring.dequeue();
    }
}

/// Duplicates pulled frames to an attached sink, outside the ring lock.
///
/// Sink failures are recoverable: logged, surfaced as an event, and
/// otherwise ignored so playback continues.
fn duplicate_to_sink<T: AudioSample>(
    sink: &Arc<dyn Sink>,
    events: Option<&EventCallback>,
    data: &[T],
    timestamp: Duration,
    sample_rate: u32,
    channels: u16,
) {
    let samples: Vec<i16> = data.iter().map(|s| s.to_i16()).collect();
    let chunk = AudioChunk::new(samples, timestamp, sample_rate, channels);
    if let Err(err) = sink.write(&chunk) {
        tracing::warn!(sink = sink.name(), %err, "sink write failed");
        if let Some(events) = events {
            events(StreamEvent::SinkError {
                sink_name: sink.name().to_string(),
                error: err.to_string(),
            });
        }
    }
}

/// A CPAL output stream wired to the output ring.
///
/// Created paused; the engine unpauses it once the producer is running.
/// Dropping it stops the platform callback and releases the device.
pub(crate) struct OutputStream {
    stream: Stream,
}

impl OutputStream {
    /// Opens the default output device at the session format and
    /// registers the pull callback, paused.
    pub(crate) fn open<T>(
        format: &AudioFormat,
        ring: Arc<Mutex<RingBuffer<T>>>,
        sink: Option<Arc<dyn Sink>>,
        events: Option<EventCallback>,
    ) -> Result<Self, EngineError>
    where
        T: AudioSample + cpal::SizedSample,
    {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(EngineError::NoOutputDevice)?;

        let config = CpalStreamConfig {
            channels: format.channels,
            sample_rate: SampleRate(format.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let sample_rate = format.sample_rate;
        let channels = format.channels;
        let mut pulled: u64 = 0;

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    pull(&ring, data);

                    if let Some(sink) = &sink {
                        let timestamp = Duration::from_secs_f64(
                            pulled as f64 / f64::from(sample_rate) / f64::from(channels),
                        );
                        duplicate_to_sink(
                            sink,
                            events.as_ref(),
                            data,
                            timestamp,
                            sample_rate,
                            channels,
                        );
                    }
                    pulled += data.len() as u64;
                },
                |err| {
                    tracing::error!("audio stream error: {}", err);
                },
                None,
            )
            .map_err(|err| match err {
                cpal::BuildStreamError::StreamConfigNotSupported => {
                    EngineError::UnsupportedFormat {
                        format: format!("{}Hz {}ch", sample_rate, channels),
                    }
                }
                other => EngineError::backend(other),
            })?;

        // Registered paused; playback starts on an explicit play()
        stream.pause().map_err(EngineError::backend)?;

        Ok(Self { stream })
    }

    /// Unpauses the output device.
    pub(crate) fn play(&self) -> Result<(), EngineError> {
        self.stream.play().map_err(EngineError::backend)
    }

    /// Pauses the output device; the ring keeps its contents.
    pub(crate) fn pause(&self) -> Result<(), EngineError> {
        self.stream.pause().map_err(EngineError::backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pull_drains_in_order_and_zero_fills() {
        let ring = Mutex::new(RingBuffer::<i16>::new(16));
        ring.lock().enqueue(&[1, 2, 3]);

        let mut data = [99i16; 6];
        pull(&ring, &mut data);
        // Queued samples first, silence for the underrun remainder
        assert_eq!(data, [1, 2, 3, 0, 0, 0]);
        assert!(ring.lock().is_empty());
    }

    #[test]
    fn test_pull_float_underrun_is_silence() {
        let ring = Mutex::new(RingBuffer::<f32>::new(8));
        let mut data = [1.0f32; 4];
        pull(&ring, &mut data);
        assert_eq!(data, [0.0; 4]);
    }

    // Device tests require actual audio hardware and are skipped in CI
    #[test]
    #[ignore = "requires audio hardware"]
    fn test_open_default_output() {
        use crate::config::SampleFormat;
        let format = AudioFormat {
            sample_rate: 48000,
            channels: 2,
            sample_format: SampleFormat::Int16,
            frames_per_step: 800,
        };
        let ring = Arc::new(Mutex::new(RingBuffer::<i16>::new(9600)));
        let stream = OutputStream::open(&format, ring, None, None).unwrap();
        stream.play().unwrap();
        stream.pause().unwrap();
    }
}
