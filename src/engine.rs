//! Top-level engine context and public API.

use std::sync::Arc;

use crate::chunk::AudioChunk;
use crate::config::{AudioFormat, EngineConfig, SampleFormat};
use crate::error::EngineError;
use crate::event::{EventCallback, StreamEvent};
use crate::output::OutputStream;
use crate::pipeline::RateController;
use crate::sink::Sink;

/// A borrowed chunk of producer samples, tagged with its PCM
/// representation.
///
/// The engine's pipeline is built once for the session's
/// [`SampleFormat`]; a chunk of the other representation is logged and
/// dropped rather than converted.
#[derive(Debug, Clone, Copy)]
pub enum SampleChunk<'a> {
    /// Interleaved 16-bit signed PCM.
    Int16(&'a [i16]),
    /// Interleaved 32-bit float PCM.
    Float32(&'a [f32]),
}

/// Per-format pipeline, chosen once at init.
enum Backend {
    Int16(RateController<i16>),
    Float32(RateController<f32>),
}

/// Builder for [`AudioEngine`].
///
/// # Example
///
/// ```rust,ignore
/// let engine = AudioEngine::builder(format)
///     .attach_sink(FileSink::wav("session.wav"))
///     .on_event(|e| tracing::info!(?e, "audio status"))
///     .build()?;
/// ```
pub struct AudioEngineBuilder {
    format: AudioFormat,
    config: EngineConfig,
    sink: Option<Arc<dyn Sink>>,
    capture_sink: Option<Arc<dyn Sink>>,
    events: Option<EventCallback>,
    headless: bool,
}

impl AudioEngineBuilder {
    /// Overrides the feedback-loop tuning.
    #[must_use]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Attaches a sink that receives a duplicate of every pulled output
    /// chunk (e.g. [`FileSink`](crate::FileSink) for WAV recording).
    #[must_use]
    pub fn attach_sink(mut self, sink: impl Sink + 'static) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// Registers the destination for captured input audio pushed via
    /// [`AudioEngine::push_captured`].
    #[must_use]
    pub fn capture_sink(mut self, sink: impl Sink + 'static) -> Self {
        self.capture_sink = Some(Arc::new(sink));
        self
    }

    /// Registers a status-event callback.
    #[must_use]
    pub fn on_event<F>(mut self, f: F) -> Self
    where
        F: Fn(StreamEvent) + Send + Sync + 'static,
    {
        self.events = Some(Arc::new(f));
        self
    }

    /// Builds the pipeline without opening an output device.
    ///
    /// The full feedback loop runs; only the platform callback is
    /// absent. Intended for tests and CI environments without audio
    /// hardware.
    #[must_use]
    pub fn headless(mut self) -> Self {
        self.headless = true;
        self
    }

    /// Validates the format, allocates the pipeline, and registers the
    /// output callback in a paused state.
    pub fn build(self) -> Result<AudioEngine, EngineError> {
        self.format.validate()?;

        if let Some(sink) = &self.sink {
            sink.on_start().map_err(|e| EngineError::SinkStartFailed {
                sink_name: sink.name().to_string(),
                reason: e.to_string(),
            })?;
        }

        let (backend, stream) = match self.format.sample_format {
            SampleFormat::Int16 => {
                let controller = RateController::<i16>::new(&self.format, &self.config)?;
                let stream = if self.headless {
                    None
                } else {
                    Some(OutputStream::open(
                        &self.format,
                        controller.output_handle(),
                        self.sink.clone(),
                        self.events.clone(),
                    )?)
                };
                (Backend::Int16(controller), stream)
            }
            SampleFormat::Float32 => {
                let controller = RateController::<f32>::new(&self.format, &self.config)?;
                let stream = if self.headless {
                    None
                } else {
                    Some(OutputStream::open(
                        &self.format,
                        controller.output_handle(),
                        self.sink.clone(),
                        self.events.clone(),
                    )?)
                };
                (Backend::Float32(controller), stream)
            }
        };

        tracing::info!(
            rate = self.format.sample_rate,
            channels = self.format.channels,
            format = ?self.format.sample_format,
            "audio engine ready"
        );

        Ok(AudioEngine {
            backend,
            stream,
            sink: self.sink,
            capture_sink: self.capture_sink,
            events: self.events,
            muted: false,
        })
    }
}

/// The synchronization engine: an owned context created at session
/// start and torn down at shutdown.
///
/// All producer-side calls (`submit`, `set_frame_rate`, runtime
/// controls) happen on one thread - the main loop's. The only
/// concurrent access is the platform's real-time callback pulling from
/// the output ring.
pub struct AudioEngine {
    backend: Backend,
    stream: Option<OutputStream>,
    sink: Option<Arc<dyn Sink>>,
    capture_sink: Option<Arc<dyn Sink>>,
    events: Option<EventCallback>,
    muted: bool,
}

impl AudioEngine {
    /// Starts building an engine for the given session format.
    #[must_use]
    pub fn builder(format: AudioFormat) -> AudioEngineBuilder {
        AudioEngineBuilder {
            format,
            config: EngineConfig::default(),
            sink: None,
            capture_sink: None,
            events: None,
            headless: false,
        }
    }

    /// Creates an engine with default tuning and an output device.
    pub fn new(format: AudioFormat, config: EngineConfig) -> Result<Self, EngineError> {
        Self::builder(format).config(config).build()
    }

    /// The chunk-produced entry point, called once per simulated step.
    ///
    /// Runs the full rate-control procedure. A chunk whose tag does not
    /// match the session format is logged and dropped.
    pub fn submit(&mut self, chunk: SampleChunk<'_>) {
        match (&mut self.backend, chunk) {
            (Backend::Int16(controller), SampleChunk::Int16(samples)) => {
                controller.submit(samples);
            }
            (Backend::Float32(controller), SampleChunk::Float32(samples)) => {
                controller.submit(samples);
            }
            _ => {
                tracing::warn!("sample chunk does not match session format; dropped");
            }
        }
    }

    /// Accepts the simulation's current frame rate whenever it changes.
    ///
    /// Recomputes the setpoint and reseeds the estimator if the implied
    /// chunk size diverged beyond tolerance.
    pub fn set_frame_rate(&mut self, fps: f64) {
        let setpoint = match &mut self.backend {
            Backend::Int16(controller) => controller.set_frame_rate(fps),
            Backend::Float32(controller) => controller.set_frame_rate(fps),
        };
        self.emit(StreamEvent::TimingChanged { fps, setpoint });
    }

    /// Sets the mute flag.
    ///
    /// Muting substitutes silence at the resampler's input while the
    /// queues keep moving at the same rate, so it never perturbs the
    /// timing model.
    pub fn set_muted(&mut self, muted: bool) {
        if self.muted == muted {
            return;
        }
        self.muted = muted;
        match &mut self.backend {
            Backend::Int16(controller) => controller.set_muted(muted),
            Backend::Float32(controller) => controller.set_muted(muted),
        }
        tracing::info!(muted, "audio mute toggled");
        self.emit(StreamEvent::MuteChanged { muted });
    }

    /// Returns the current mute state.
    #[must_use]
    pub fn muted(&self) -> bool {
        self.muted
    }

    /// Sets the time-compression level `F` (0 = normal speed).
    pub fn set_time_compression(&mut self, level: u32) {
        match &mut self.backend {
            Backend::Int16(controller) => controller.set_time_compression(level),
            Backend::Float32(controller) => controller.set_time_compression(level),
        }
        self.emit(StreamEvent::TimeCompressionChanged { level });
    }

    /// Unpauses the output device. No-op in headless mode.
    pub fn play(&self) -> Result<(), EngineError> {
        match &self.stream {
            Some(stream) => stream.play(),
            None => Ok(()),
        }
    }

    /// Pauses the output device. Queued audio is retained.
    pub fn pause(&self) -> Result<(), EngineError> {
        match &self.stream {
            Some(stream) => stream.pause(),
            None => Ok(()),
        }
    }

    /// Forwards captured input audio to the registered capture sink,
    /// bypassing the rate controller and resampler entirely
    /// (fixed-format passthrough, no rate conversion).
    pub fn push_captured(&self, chunk: &AudioChunk) {
        let Some(sink) = &self.capture_sink else {
            return;
        };
        if let Err(err) = sink.write(chunk) {
            tracing::warn!(sink = sink.name(), %err, "capture sink write failed");
            self.emit(StreamEvent::SinkError {
                sink_name: sink.name().to_string(),
                error: err.to_string(),
            });
        }
    }

    /// Current target queue occupancy in samples.
    #[must_use]
    pub fn setpoint(&self) -> usize {
        match &self.backend {
            Backend::Int16(controller) => controller.setpoint(),
            Backend::Float32(controller) => controller.setpoint(),
        }
    }

    /// Current input-ring occupancy in samples.
    #[must_use]
    pub fn input_occupancy(&self) -> usize {
        match &self.backend {
            Backend::Int16(controller) => controller.input_occupancy(),
            Backend::Float32(controller) => controller.input_occupancy(),
        }
    }

    /// Current output-ring occupancy in samples.
    #[must_use]
    pub fn output_occupancy(&self) -> usize {
        match &self.backend {
            Backend::Int16(controller) => controller.output_occupancy(),
            Backend::Float32(controller) => controller.output_occupancy(),
        }
    }

    /// The `(in_rate, out_rate)` fraction from the latest invocation.
    #[must_use]
    pub fn conversion_ratio(&self) -> (u32, u32) {
        match &self.backend {
            Backend::Int16(controller) => controller.conversion_ratio(),
            Backend::Float32(controller) => controller.conversion_ratio(),
        }
    }

    /// Fills `out` from the output ring, as the platform callback
    /// would. Only meaningful in headless mode, where no device is
    /// pulling.
    pub fn drain_output_i16(&self, out: &mut [i16]) {
        if let Backend::Int16(controller) = &self.backend {
            let ring = controller.output_handle();
            let mut ring = ring.lock();
            for slot in out.iter_mut() {
                *slot = ring.dequeue();
            }
        }
    }

    /// Float32 twin of [`Self::drain_output_i16`].
    pub fn drain_output_f32(&self, out: &mut [f32]) {
        if let Backend::Float32(controller) = &self.backend {
            let ring = controller.output_handle();
            let mut ring = ring.lock();
            for slot in out.iter_mut() {
                *slot = ring.dequeue();
            }
        }
    }

    fn emit(&self, event: StreamEvent) {
        if let Some(events) = &self.events {
            events(event);
        }
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        if let Some(stream) = &self.stream {
            let _ = stream.pause();
        }
        if let Some(sink) = &self.sink {
            if let Err(err) = sink.finalize() {
                tracing::warn!(sink = sink.name(), %err, "sink finalize failed");
            }
        }
    }
}
