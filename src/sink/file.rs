//! WAV file sink implementation.

use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::sink::Sink;
use crate::{AudioChunk, SinkError};

// WAV file format constants
// See: http://soundfile.sapp.org/doc/WaveFormat/

/// Byte offset of the file size field in WAV header (RIFF chunk size).
const WAV_FILE_SIZE_OFFSET: u64 = 4;

/// Byte offset of the data chunk size field in WAV header.
const WAV_DATA_SIZE_OFFSET: u64 = 40;

/// Size of the WAV header in bytes (RIFF + fmt + data chunk headers).
const WAV_HEADER_SIZE: usize = 44;

/// Size of the fmt chunk data (16 bytes for PCM).
const WAV_FMT_CHUNK_SIZE: u32 = 16;

/// Audio format code for PCM (uncompressed).
const WAV_FORMAT_PCM: u16 = 1;

/// Bits per sample for 16-bit audio.
const WAV_BITS_PER_SAMPLE: u16 = 16;

/// Bytes per sample (16-bit = 2 bytes).
const BYTES_PER_SAMPLE: u64 = 2;

/// A sink that duplicates pulled output audio to a WAV file.
///
/// The file is created on first write with a placeholder header and
/// finalized (true sizes written back) by [`Sink::finalize`], which the
/// engine calls at teardown.
///
/// # Example
///
/// ```no_run
/// use stream_sync::FileSink;
///
/// let sink = FileSink::wav("session.wav");
/// // Attach to the engine with attach_sink()...
/// ```
pub struct FileSink {
    name: String,
    path: PathBuf,
    state: Mutex<FileState>,
}

struct FileState {
    writer: Option<BufWriter<File>>,
    samples_written: u64,
    sample_rate: u32,
    channels: u16,
}

impl FileSink {
    /// Creates a new file sink that writes WAV format.
    pub fn wav(path: impl AsRef<Path>) -> Self {
        Self {
            name: format!("file:{}", path.as_ref().display()),
            path: path.as_ref().to_path_buf(),
            state: Mutex::new(FileState {
                writer: None,
                samples_written: 0,
                sample_rate: 0,
                channels: 0,
            }),
        }
    }

    /// Writes a complete WAV header with the given parameters.
    ///
    /// The header includes RIFF, fmt, and data chunk headers (44 bytes).
    fn write_wav_header(
        writer: &mut BufWriter<File>,
        sample_rate: u32,
        channels: u16,
        data_size: u32,
    ) -> std::io::Result<()> {
        // RIFF container header
        writer.write_all(b"RIFF")?;
        let file_size = WAV_HEADER_SIZE as u32 - 8 + data_size; // Total size minus RIFF header
        writer.write_all(&file_size.to_le_bytes())?;
        writer.write_all(b"WAVE")?;

        // fmt subchunk
        writer.write_all(b"fmt ")?;
        writer.write_all(&WAV_FMT_CHUNK_SIZE.to_le_bytes())?;
        writer.write_all(&WAV_FORMAT_PCM.to_le_bytes())?;
        writer.write_all(&channels.to_le_bytes())?;
        writer.write_all(&sample_rate.to_le_bytes())?;

        let bytes_per_sample = WAV_BITS_PER_SAMPLE / 8;
        let byte_rate = sample_rate * u32::from(channels) * u32::from(bytes_per_sample);
        writer.write_all(&byte_rate.to_le_bytes())?;

        let block_align = channels * bytes_per_sample;
        writer.write_all(&block_align.to_le_bytes())?;
        writer.write_all(&WAV_BITS_PER_SAMPLE.to_le_bytes())?;

        // data subchunk header
        writer.write_all(b"data")?;
        writer.write_all(&data_size.to_le_bytes())?;

        Ok(())
    }
}

impl Sink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&self, chunk: &AudioChunk) -> Result<(), SinkError> {
        let mut state = self.state.lock();

        if state.writer.is_none() {
            // First write: create the file with a placeholder header
            let file =
                File::create(&self.path).map_err(|e| SinkError::file_error(&self.path, e))?;
            let mut writer = BufWriter::new(file);
            Self::write_wav_header(&mut writer, chunk.sample_rate, chunk.channels, 0)
                .map_err(|e| SinkError::file_error(&self.path, e))?;

            state.writer = Some(writer);
            state.sample_rate = chunk.sample_rate;
            state.channels = chunk.channels;
        }

        let writer = state.writer.as_mut().ok_or_else(|| {
            SinkError::write_failed("writer unavailable")
        })?;
        for &sample in chunk.samples.iter() {
            writer
                .write_all(&sample.to_le_bytes())
                .map_err(|e| SinkError::file_error(&self.path, e))?;
        }
        state.samples_written += chunk.samples.len() as u64;

        Ok(())
    }

    fn finalize(&self) -> Result<(), SinkError> {
        let mut state = self.state.lock();

        let Some(mut writer) = state.writer.take() else {
            // Nothing was ever written; no file to finalize
            return Ok(());
        };

        let data_size = (state.samples_written * BYTES_PER_SAMPLE) as u32;
        let file_size = WAV_HEADER_SIZE as u32 - 8 + data_size;

        writer
            .flush()
            .map_err(|e| SinkError::file_error(&self.path, e))?;

        // Seek back and patch the two size fields with the real counts
        writer
            .seek(SeekFrom::Start(WAV_FILE_SIZE_OFFSET))
            .map_err(|e| SinkError::file_error(&self.path, e))?;
        writer
            .write_all(&file_size.to_le_bytes())
            .map_err(|e| SinkError::file_error(&self.path, e))?;
        writer
            .seek(SeekFrom::Start(WAV_DATA_SIZE_OFFSET))
            .map_err(|e| SinkError::file_error(&self.path, e))?;
        writer
            .write_all(&data_size.to_le_bytes())
            .map_err(|e| SinkError::file_error(&self.path, e))?;
        writer
            .flush()
            .map_err(|e| SinkError::file_error(&self.path, e))?;

        tracing::trace!(
            path = %self.path.display(),
            samples = state.samples_written,
            "finalized WAV file"
        );

        Ok(())
    }
}
