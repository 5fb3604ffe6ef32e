//! External media transcoder.
//!
//! Recordings come off the microphone in a compressed container. ffmpeg
//! converts them to the canonical 16kHz mono 16-bit WAV the codec reads.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;

use crate::audio::WavFormat;

/// Default transcoder binary, resolved through PATH
pub const DEFAULT_FFMPEG_BINARY: &str = "ffmpeg";

/// Errors that can occur while transcoding
#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("Transcoder binary not found: {0}")]
    BinaryNotFound(PathBuf),

    #[error("Failed to spawn transcoder: {0}")]
    SpawnFailed(#[source] std::io::Error),

    #[error("Command failed with exit code {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },

    #[error("Transcoder exited successfully but wrote no output at {0}")]
    MissingOutput(PathBuf),
}

/// Converts an arbitrary audio file into a canonical PCM WAV file
pub trait Transcoder {
    fn transcode(&self, input: &Path, output: &Path) -> Result<(), TranscodeError>;
}

/// Transcoder backed by the ffmpeg command line
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    binary_path: PathBuf,
    format: WavFormat,
    extra_args: Vec<String>,
}

impl FfmpegTranscoder {
    pub fn new(binary_path: impl Into<PathBuf>, format: WavFormat) -> Self {
        Self {
            binary_path: binary_path.into(),
            format,
            extra_args: Vec::new(),
        }
    }

    /// Extra flags inserted before the output path
    pub fn with_extra_args(mut self, extra_args: Vec<String>) -> Self {
        self.extra_args = extra_args;
        self
    }

    /// Arguments passed to the binary for one conversion.
    ///
    /// `-bitexact` keeps ffmpeg from adding a LIST/INFO chunk, so the output
    /// header is exactly 44 bytes.
    pub fn transcode_args(&self, input: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-y".into(),
            "-i".into(),
            input.as_os_str().to_owned(),
            "-bitexact".into(),
            "-acodec".into(),
            "pcm_s16le".into(),
            "-ac".into(),
            self.format.num_channels.to_string().into(),
            "-ar".into(),
            self.format.sample_rate.to_string().into(),
        ];
        args.extend(self.extra_args.iter().map(OsString::from));
        args.push(output.as_os_str().to_owned());
        args
    }
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new(DEFAULT_FFMPEG_BINARY, WavFormat::default())
    }
}

impl Transcoder for FfmpegTranscoder {
    fn transcode(&self, input: &Path, output: &Path) -> Result<(), TranscodeError> {
        crate::info!(
            "Transcoding {} -> {} with {:?}",
            input.display(),
            output.display(),
            self.binary_path
        );

        let result = Command::new(&self.binary_path)
            .args(self.transcode_args(input, output))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output();

        let output_status = match result {
            Ok(o) => o,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TranscodeError::BinaryNotFound(self.binary_path.clone()));
            }
            Err(e) => return Err(TranscodeError::SpawnFailed(e)),
        };

        if !output_status.status.success() {
            let stderr = String::from_utf8_lossy(&output_status.stderr).to_string();
            crate::error!(
                "Command failed with state {} and rc {:?}. {}",
                output_status.status,
                output_status.status.code(),
                stderr
            );
            return Err(TranscodeError::Failed {
                code: output_status.status.code(),
                stderr,
            });
        }

        if !output.exists() {
            return Err(TranscodeError::MissingOutput(output.to_path_buf()));
        }

        crate::debug!("Transcoded {} successfully", input.display());
        Ok(())
    }
}

#[cfg(test)]
#[path = "transcode_test.rs"]
mod tests;
