//! Chunked PCM playback.
//!
//! An output device accepts a bounded number of bytes per write, so the
//! payload is handed over in chunks until everything has been written.

use std::io;
use std::time::Duration;

use super::wav::{pcm_payload, DecodeMode, FormatError, WavFormat};

/// Destination for raw PCM bytes (an audio track, a file, a test buffer)
pub trait PcmSink {
    /// Write a chunk, returning how many bytes were accepted
    fn write(&mut self, chunk: &[u8]) -> io::Result<usize>;
}

/// Adapts any [`io::Write`] into a [`PcmSink`]
#[derive(Debug, Default)]
pub struct WriterSink<W: io::Write>(pub W);

impl<W: io::Write> PcmSink for WriterSink<W> {
    fn write(&mut self, chunk: &[u8]) -> io::Result<usize> {
        self.0.write(chunk)
    }
}

/// Feed `data` to `sink` in chunks of at most `chunk_size` bytes.
///
/// Returns the total number of bytes written, which is always `data.len()`
/// on success.
pub fn play_pcm<S: PcmSink + ?Sized>(data: &[u8], sink: &mut S, chunk_size: usize) -> io::Result<usize> {
    if chunk_size == 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "playback chunk size must be non-zero",
        ));
    }

    let mut offset = 0;
    while offset < data.len() {
        let size = chunk_size.min(data.len() - offset);
        let written = sink.write(&data[offset..offset + size])?;
        if written == 0 {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("sink stopped accepting data at byte {}", offset),
            ));
        }
        offset += written.min(size);
    }

    crate::debug!("Played {} PCM bytes", offset);
    Ok(offset)
}

/// Errors from playing a whole WAV buffer
#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("Playback failed: {0}")]
    Io(#[from] io::Error),
}

/// Play the PCM payload of a WAV buffer, skipping its header
pub fn play_wav<S: PcmSink + ?Sized>(
    bytes: &[u8],
    sink: &mut S,
    chunk_size: usize,
) -> Result<usize, PlaybackError> {
    let (_, payload) = pcm_payload(bytes, DecodeMode::Lenient)?;
    Ok(play_pcm(payload, sink, chunk_size)?)
}

/// Time it takes to play `byte_len` bytes of PCM in `format`
pub fn playback_duration(byte_len: usize, format: &WavFormat) -> Duration {
    let byte_rate = format.byte_rate();
    if byte_rate == 0 {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(byte_len as f64 / byte_rate as f64)
}

/// Render elapsed milliseconds as `MM:SS.d`
pub fn format_elapsed(elapsed_ms: u64) -> String {
    let seconds = elapsed_ms / 1000;
    format!(
        "{:02}:{:02}.{}",
        seconds / 60,
        seconds % 60,
        (elapsed_ms % 1000) / 100
    )
}

#[cfg(test)]
#[path = "playback_test.rs"]
mod tests;
