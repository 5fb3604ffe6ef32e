// WAV codec for the fixed PCM layout handed to and from the denoising model

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::audio_constants::{
    BYTES_PER_SAMPLE, DEFAULT_BITS_PER_SAMPLE, DEFAULT_NUM_CHANNELS, DEFAULT_SAMPLE_RATE,
    DENORMALIZE_SCALE, NORMALIZE_DIVISOR, PCM_AUDIO_FORMAT, PCM_FMT_CHUNK_SIZE,
    RIFF_CHUNK_SIZE_OVERHEAD, WAV_HEADER_LEN,
};

pub const RIFF_TAG: [u8; 4] = *b"RIFF";
pub const WAVE_TAG: [u8; 4] = *b"WAVE";
pub const FMT_TAG: [u8; 4] = *b"fmt ";
pub const DATA_TAG: [u8; 4] = *b"data";

/// Errors that can occur while decoding a WAV buffer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// Bytes 0..4 are not "RIFF"
    #[error("Invalid WAV file format: missing RIFF tag")]
    NotRiff,

    /// Bytes 8..12 are not "WAVE"
    #[error("Invalid WAV file format: missing WAVE tag")]
    NotWave,

    /// Anything other than mono 16-bit PCM
    #[error(
        "Unsupported WAV file format: {num_channels} channel(s), {bits_per_sample}-bit (must be mono, 16-bit)"
    )]
    UnsupportedLayout {
        num_channels: u16,
        bits_per_sample: u16,
    },

    /// Fewer bytes than the header or its declared payload require
    #[error("WAV data truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    /// A fixed header field does not hold its PCM value (strict mode only)
    #[error("Invalid WAV header field {field}: expected {expected}, got {actual}")]
    InvalidField {
        field: &'static str,
        expected: String,
        actual: String,
    },
}

/// Errors from the file-level helpers
#[derive(Debug, Error)]
pub enum WavFileError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Format(#[from] FormatError),
}

/// PCM layout written into encoded headers.
///
/// The payload is always serialized as 16-bit mono samples; these values only
/// describe it. The decoder enforces the channel count and bit depth but
/// accepts any sample rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WavFormat {
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub num_channels: u16,
}

impl Default for WavFormat {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            bits_per_sample: DEFAULT_BITS_PER_SAMPLE,
            num_channels: DEFAULT_NUM_CHANNELS,
        }
    }
}

impl WavFormat {
    /// sampleRate × numChannels × bitsPerSample / 8
    pub fn byte_rate(&self) -> u32 {
        self.sample_rate
            .wrapping_mul(u32::from(self.num_channels))
            .wrapping_mul(u32::from(self.bits_per_sample))
            / 8
    }

    /// numChannels × bitsPerSample / 8
    pub fn block_align(&self) -> u16 {
        self.num_channels.wrapping_mul(self.bits_per_sample) / 8
    }
}

/// How much of the header the decoder checks beyond the required fields
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodeMode {
    /// Also reject a wrong `fmt `/`data` tag, fmt chunk size, audio format
    /// or an odd data size.
    #[default]
    Strict,
    /// Only check the RIFF/WAVE tags and the mono 16-bit layout.
    Lenient,
}

/// The 44-byte canonical PCM header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub riff_tag: [u8; 4],
    pub chunk_size: u32,
    pub wave_tag: [u8; 4],
    pub fmt_tag: [u8; 4],
    pub fmt_chunk_size: u32,
    pub audio_format: u16,
    pub num_channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    pub data_tag: [u8; 4],
    pub data_size: u32,
}

impl WavHeader {
    /// Build the header for a payload of `data_size` bytes
    pub fn for_pcm(data_size: u32, format: &WavFormat) -> Self {
        Self {
            riff_tag: RIFF_TAG,
            chunk_size: data_size.wrapping_add(RIFF_CHUNK_SIZE_OVERHEAD),
            wave_tag: WAVE_TAG,
            fmt_tag: FMT_TAG,
            fmt_chunk_size: PCM_FMT_CHUNK_SIZE,
            audio_format: PCM_AUDIO_FORMAT,
            num_channels: format.num_channels,
            sample_rate: format.sample_rate,
            byte_rate: format.byte_rate(),
            block_align: format.block_align(),
            bits_per_sample: format.bits_per_sample,
            data_tag: DATA_TAG,
            data_size,
        }
    }

    /// Read the header fields at their fixed offsets.
    ///
    /// Only the RIFF/WAVE tags and the buffer length are checked here; use
    /// [`WavHeader::validate`] for the rest.
    pub fn parse(bytes: &[u8]) -> Result<Self, FormatError> {
        if bytes.get(0..4).is_some_and(|tag| tag != RIFF_TAG.as_slice()) {
            return Err(FormatError::NotRiff);
        }
        if bytes.get(8..12).is_some_and(|tag| tag != WAVE_TAG.as_slice()) {
            return Err(FormatError::NotWave);
        }
        if bytes.len() < WAV_HEADER_LEN {
            return Err(FormatError::Truncated {
                expected: WAV_HEADER_LEN,
                actual: bytes.len(),
            });
        }

        Ok(Self {
            riff_tag: read_tag(bytes, 0),
            chunk_size: read_u32(bytes, 4),
            wave_tag: read_tag(bytes, 8),
            fmt_tag: read_tag(bytes, 12),
            fmt_chunk_size: read_u32(bytes, 16),
            audio_format: read_u16(bytes, 20),
            num_channels: read_u16(bytes, 22),
            sample_rate: read_u32(bytes, 24),
            byte_rate: read_u32(bytes, 28),
            block_align: read_u16(bytes, 32),
            bits_per_sample: read_u16(bytes, 34),
            data_tag: read_tag(bytes, 36),
            data_size: read_u32(bytes, 40),
        })
    }

    /// Check the header against the supported layout.
    ///
    /// Payload length is checked separately since the header alone cannot
    /// know how many bytes follow it.
    pub fn validate(&self, mode: DecodeMode) -> Result<(), FormatError> {
        self.check_layout()?;
        if mode == DecodeMode::Strict {
            self.check_pcm_fields()?;
        }
        Ok(())
    }

    fn check_layout(&self) -> Result<(), FormatError> {
        if self.riff_tag != RIFF_TAG {
            return Err(FormatError::NotRiff);
        }
        if self.wave_tag != WAVE_TAG {
            return Err(FormatError::NotWave);
        }
        if self.num_channels != DEFAULT_NUM_CHANNELS || self.bits_per_sample != DEFAULT_BITS_PER_SAMPLE {
            return Err(FormatError::UnsupportedLayout {
                num_channels: self.num_channels,
                bits_per_sample: self.bits_per_sample,
            });
        }
        Ok(())
    }

    fn check_pcm_fields(&self) -> Result<(), FormatError> {
        check_tag("fmtTag", &self.fmt_tag, &FMT_TAG)?;
        check_field("fmtChunkSize", self.fmt_chunk_size, PCM_FMT_CHUNK_SIZE)?;
        check_field("audioFormat", self.audio_format, PCM_AUDIO_FORMAT)?;
        check_tag("dataTag", &self.data_tag, &DATA_TAG)?;
        if self.data_size % BYTES_PER_SAMPLE as u32 != 0 {
            return Err(FormatError::InvalidField {
                field: "dataSize",
                expected: "an even byte count".to_string(),
                actual: self.data_size.to_string(),
            });
        }
        Ok(())
    }

    /// Serialize to the exact on-disk byte layout
    pub fn to_bytes(&self) -> [u8; WAV_HEADER_LEN] {
        let mut out = [0u8; WAV_HEADER_LEN];
        out[0..4].copy_from_slice(&self.riff_tag);
        out[4..8].copy_from_slice(&self.chunk_size.to_le_bytes());
        out[8..12].copy_from_slice(&self.wave_tag);
        out[12..16].copy_from_slice(&self.fmt_tag);
        out[16..20].copy_from_slice(&self.fmt_chunk_size.to_le_bytes());
        out[20..22].copy_from_slice(&self.audio_format.to_le_bytes());
        out[22..24].copy_from_slice(&self.num_channels.to_le_bytes());
        out[24..28].copy_from_slice(&self.sample_rate.to_le_bytes());
        out[28..32].copy_from_slice(&self.byte_rate.to_le_bytes());
        out[32..34].copy_from_slice(&self.block_align.to_le_bytes());
        out[34..36].copy_from_slice(&self.bits_per_sample.to_le_bytes());
        out[36..40].copy_from_slice(&self.data_tag);
        out[40..44].copy_from_slice(&self.data_size.to_le_bytes());
        out
    }

    /// Number of 16-bit samples the payload holds
    pub fn sample_count(&self) -> usize {
        self.data_size as usize / BYTES_PER_SAMPLE
    }

    /// Payload duration in seconds (0.0 for a zero sample rate)
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.sample_count() as f64 / self.sample_rate as f64
    }
}

fn read_tag(bytes: &[u8], offset: usize) -> [u8; 4] {
    [bytes[offset], bytes[offset + 1], bytes[offset + 2], bytes[offset + 3]]
}

fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(read_tag(bytes, offset))
}

fn check_tag(field: &'static str, actual: &[u8; 4], expected: &[u8; 4]) -> Result<(), FormatError> {
    if actual == expected {
        return Ok(());
    }
    Err(FormatError::InvalidField {
        field,
        expected: String::from_utf8_lossy(expected).into_owned(),
        actual: String::from_utf8_lossy(actual).into_owned(),
    })
}

fn check_field<T>(field: &'static str, actual: T, expected: T) -> Result<(), FormatError>
where
    T: PartialEq + ToString,
{
    if actual == expected {
        return Ok(());
    }
    Err(FormatError::InvalidField {
        field,
        expected: expected.to_string(),
        actual: actual.to_string(),
    })
}

/// Scale an i16 sample into [-1.0, 1.0)
pub fn normalize(sample: i16) -> f32 {
    sample as f32 / NORMALIZE_DIVISOR
}

/// Convert a normalized sample back to i16, truncating toward zero.
///
/// Values outside [-1.0, 1.0] are not clamped: the scaled value saturates to
/// i32 and is then narrowed to its low 16 bits, so it wraps. Clamp first if
/// that matters.
pub fn denormalize(sample: f32) -> i16 {
    (sample * DENORMALIZE_SCALE) as i32 as i16
}

/// Most samples a single WAV buffer can describe.
///
/// Both `dataSize` and `ChunkSize = dataSize + 36` must fit in a u32.
pub const MAX_ENCODED_SAMPLES: usize =
    ((u32::MAX - RIFF_CHUNK_SIZE_OVERHEAD) / BYTES_PER_SAMPLE as u32) as usize;

/// Number of samples [`encode_with_format`] writes for an input of `len`
/// samples. Anything past [`MAX_ENCODED_SAMPLES`] is dropped so the header
/// never disagrees with the payload.
pub fn encoded_sample_count(len: usize) -> usize {
    len.min(MAX_ENCODED_SAMPLES)
}

/// Validate the header and return it with the declared payload slice.
///
/// Bytes beyond the declared payload are ignored.
pub fn pcm_payload(bytes: &[u8], mode: DecodeMode) -> Result<(WavHeader, &[u8]), FormatError> {
    let header = WavHeader::parse(bytes)?;
    header.check_layout()?;

    // Truncation outranks the strict field checks so a short file is always
    // reported as such.
    let end = WAV_HEADER_LEN.saturating_add(header.data_size as usize);
    if bytes.len() < end {
        return Err(FormatError::Truncated {
            expected: end,
            actual: bytes.len(),
        });
    }

    if mode == DecodeMode::Strict {
        header.check_pcm_fields()?;
    }

    Ok((header, &bytes[WAV_HEADER_LEN..end]))
}

/// Decode a WAV buffer into its header and normalized samples
pub fn decode_with_header(bytes: &[u8], mode: DecodeMode) -> Result<(WavHeader, Vec<f32>), FormatError> {
    let (header, payload) = pcm_payload(bytes, mode)?;

    let samples = payload
        .chunks_exact(BYTES_PER_SAMPLE)
        .map(|pair| normalize(i16::from_le_bytes([pair[0], pair[1]])))
        .collect();

    Ok((header, samples))
}

/// Decode a mono 16-bit WAV buffer into normalized samples.
///
/// Uses [`DecodeMode::Strict`].
pub fn decode(bytes: &[u8]) -> Result<Vec<f32>, FormatError> {
    decode_with_header(bytes, DecodeMode::default()).map(|(_, samples)| samples)
}

/// Encode normalized samples into a WAV buffer with the given header layout
pub fn encode_with_format(samples: &[f32], format: &WavFormat) -> Vec<u8> {
    let count = encoded_sample_count(samples.len());
    if count < samples.len() {
        crate::warn!(
            "Dropping {} samples that do not fit in a WAV payload",
            samples.len() - count
        );
    }
    let samples = &samples[..count];

    let data_len = count * BYTES_PER_SAMPLE;
    let header = WavHeader::for_pcm(data_len as u32, format);

    let mut buf = Vec::with_capacity(WAV_HEADER_LEN + data_len);
    buf.extend_from_slice(&header.to_bytes());
    for &sample in samples {
        buf.extend_from_slice(&denormalize(sample).to_le_bytes());
    }

    buf
}

/// Encode normalized samples as 16kHz mono 16-bit WAV.
///
/// Output is always `44 + 2 * samples.len()` bytes, up to
/// [`MAX_ENCODED_SAMPLES`] samples.
pub fn encode(samples: &[f32]) -> Vec<u8> {
    encode_with_format(samples, &WavFormat::default())
}

/// Trait for file system operations (allows mocking in tests)
pub trait FileWriter {
    /// Get the output directory path
    fn output_dir(&self) -> PathBuf;

    /// Create directory and all parent directories
    fn create_dir_all(&self, path: &Path) -> Result<(), std::io::Error>;

    /// Check if a path exists
    fn path_exists(&self, path: &Path) -> bool;
}

/// Production file writer rooted at a fixed output directory
#[derive(Debug, Clone)]
pub struct SystemFileWriter {
    output_dir: PathBuf,
}

impl SystemFileWriter {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }
}

impl FileWriter for SystemFileWriter {
    #[cfg_attr(coverage_nightly, coverage(off))]
    fn output_dir(&self) -> PathBuf {
        self.output_dir.clone()
    }

    #[cfg_attr(coverage_nightly, coverage(off))]
    fn create_dir_all(&self, path: &Path) -> Result<(), std::io::Error> {
        std::fs::create_dir_all(path)
    }

    #[cfg_attr(coverage_nightly, coverage(off))]
    fn path_exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

/// A decoded WAV file, keeping the raw bytes for playback
#[derive(Debug, Clone, PartialEq)]
pub struct WavRecording {
    pub header: WavHeader,
    pub samples: Vec<f32>,
    pub bytes: Vec<u8>,
}

/// Read and decode a WAV file
///
/// # Returns
/// * `Ok(WavRecording)` - Header, normalized samples and the original bytes
/// * `Err(WavFileError)` - If the file cannot be read or is not supported
pub fn read_wav_file(path: &Path, mode: DecodeMode) -> Result<WavRecording, WavFileError> {
    let bytes = std::fs::read(path).map_err(|source| WavFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let (header, samples) = decode_with_header(&bytes, mode)?;
    crate::debug!(
        "Decoded {}: {} samples @ {} Hz = {:.2} seconds",
        path.display(),
        samples.len(),
        header.sample_rate,
        header.duration_secs()
    );

    Ok(WavRecording {
        header,
        samples,
        bytes,
    })
}

/// Write encoded WAV bytes into the writer's output directory
///
/// # Returns
/// * `Ok(PathBuf)` - Path to the written file
/// * `Err(WavFileError)` - If the directory or file cannot be written
pub fn write_wav_file<W: FileWriter>(
    writer: &W,
    file_name: &str,
    bytes: &[u8],
) -> Result<PathBuf, WavFileError> {
    let output_dir = writer.output_dir();
    if !writer.path_exists(&output_dir) {
        writer
            .create_dir_all(&output_dir)
            .map_err(|source| WavFileError::Io {
                path: output_dir.clone(),
                source,
            })?;
    }

    let file_path = output_dir.join(file_name);
    crate::info!("Saving WAV to: {}", file_path.display());

    std::fs::write(&file_path, bytes).map_err(|source| WavFileError::Io {
        path: file_path.clone(),
        source,
    })?;

    Ok(file_path)
}
