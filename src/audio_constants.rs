//! Centralized constants for the audio pipeline.
//!
//! The demo works with a single PCM layout end to end: the transcoder
//! produces it, the codec reads and writes it, and the model consumes it.

// =============================================================================
// PCM LAYOUT
// =============================================================================

/// Sample rate used throughout the pipeline (Hz).
///
/// The denoising models are trained on 16kHz speech, so recordings are
/// transcoded to this rate before inference.
pub const DEFAULT_SAMPLE_RATE: u32 = 16000;

/// Bits per PCM sample on the wire.
pub const DEFAULT_BITS_PER_SAMPLE: u16 = 16;

/// Channel count. Only mono audio is supported.
pub const DEFAULT_NUM_CHANNELS: u16 = 1;

/// Bytes per encoded sample (`DEFAULT_BITS_PER_SAMPLE / 8`).
pub const BYTES_PER_SAMPLE: usize = 2;

// =============================================================================
// RIFF / WAVE HEADER
// =============================================================================

/// Size of the canonical PCM WAV header (no extension chunks).
pub const WAV_HEADER_LEN: usize = 44;

/// Difference between the RIFF chunk size and the data size.
///
/// The RIFF chunk covers everything after its own 8-byte preamble:
/// 44 - 8 = 36 bytes of header plus the payload.
pub const RIFF_CHUNK_SIZE_OVERHEAD: u32 = 36;

/// `fmt ` sub-chunk size for plain PCM.
pub const PCM_FMT_CHUNK_SIZE: u32 = 16;

/// `audioFormat` tag for uncompressed PCM.
pub const PCM_AUDIO_FORMAT: u16 = 1;

// =============================================================================
// SAMPLE SCALING
// =============================================================================

/// Divisor used when normalizing i16 samples to f32.
///
/// Dividing by 32768 maps the full i16 range onto [-1.0, 32767/32768].
pub const NORMALIZE_DIVISOR: f32 = 32768.0;

/// Multiplier used when converting normalized f32 samples back to i16.
pub const DENORMALIZE_SCALE: f32 = 32767.0;

// =============================================================================
// PLAYBACK
// =============================================================================

/// Default number of PCM bytes handed to an output sink per write.
///
/// 3200 bytes = 1600 samples = 100ms at 16kHz mono 16-bit.
pub const DEFAULT_PLAYBACK_CHUNK_BYTES: usize = 3200;

#[cfg(test)]
#[path = "audio_constants_test.rs"]
mod tests;
