//! Recording → transcode → decode → denoise → encode.
//!
//! Every phase takes the buffer it needs by value and returns a new one, so
//! nothing is shared between phases. The pipeline itself owns its
//! collaborators and is moved onto a blocking thread for async callers.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::audio::{
    encode_with_format, read_wav_file, write_wav_file, DecodeMode, FileWriter, SystemFileWriter,
    WavFileError, WavFormat,
};
use crate::config::AppConfig;
use crate::denoiser::{Denoiser, DenoiserError};
use crate::transcode::{TranscodeError, Transcoder};

/// File name of the denoised output inside the output directory
pub const DENOISED_FILE_NAME: &str = "denoised.wav";

/// Stem of the copy of the raw recording kept in the output directory
pub const INPUT_COPY_STEM: &str = "input";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Transcode(#[from] TranscodeError),

    #[error(transparent)]
    Wav(#[from] WavFileError),

    #[error(transparent)]
    Denoiser(#[from] DenoiserError),

    #[error("Pipeline task failed: {0}")]
    TaskFailed(String),
}

/// Encoded result of one denoiser run
#[derive(Debug, Clone, PartialEq)]
pub struct DenoisedAudio {
    pub bytes: Vec<u8>,
    pub sample_count: usize,
    pub inference_time: Duration,
}

/// Everything the caller needs to compare original and denoised audio
#[derive(Debug, Clone, PartialEq)]
pub struct DenoiseOutcome {
    /// Transcoded input WAV, as read from disk
    pub recorded: Vec<u8>,
    /// Denoised WAV bytes
    pub denoised: Vec<u8>,
    pub input_duration_secs: f64,
    pub inference_time: Duration,
    pub denoised_path: PathBuf,
}

pub struct DenoisePipeline<T, D> {
    transcoder: T,
    denoiser: D,
    writer: SystemFileWriter,
    format: WavFormat,
    decode_mode: DecodeMode,
}

impl<T: Transcoder, D: Denoiser> DenoisePipeline<T, D> {
    pub fn new(transcoder: T, denoiser: D, output_dir: PathBuf) -> Self {
        Self {
            transcoder,
            denoiser,
            writer: SystemFileWriter::new(output_dir),
            format: WavFormat::default(),
            decode_mode: DecodeMode::default(),
        }
    }

    /// Build a pipeline using the audio and output settings from `config`
    pub fn from_config(transcoder: T, denoiser: D, config: &AppConfig) -> Self {
        Self {
            format: config.audio.format,
            decode_mode: config.audio.decode_mode,
            ..Self::new(transcoder, denoiser, config.output_dir.clone())
        }
    }

    pub fn output_dir(&self) -> PathBuf {
        self.writer.output_dir()
    }

    pub fn denoiser_mut(&mut self) -> &mut D {
        &mut self.denoiser
    }

    /// Run the full pipeline on a raw recording
    ///
    /// # Returns
    /// * `Ok(DenoiseOutcome)` - Original and denoised audio plus timings
    /// * `Err(PipelineError)` - From whichever phase failed first
    pub fn process_recording(&mut self, recording: &Path) -> Result<DenoiseOutcome, PipelineError> {
        crate::info!("Beginning denoising of {}", recording.display());

        let output_dir = self.writer.output_dir();
        if !self.writer.path_exists(&output_dir) {
            self.writer
                .create_dir_all(&output_dir)
                .map_err(|source| PipelineError::Io {
                    path: output_dir.clone(),
                    source,
                })?;
        }

        self.keep_input_copy(recording, &output_dir)?;

        let stem = recording
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("recording");
        let transcoded = output_dir.join(format!("{}.transcoded.wav", stem));
        self.transcoder.transcode(recording, &transcoded)?;

        let wav = read_wav_file(&transcoded, self.decode_mode)?;
        let input_duration_secs = wav.header.duration_secs();
        crate::debug!(
            "input: {} samples @ {} Hz = {:.2} seconds",
            wav.samples.len(),
            wav.header.sample_rate,
            input_duration_secs
        );

        let recorded = wav.bytes;
        let denoised = self.denoise_samples(wav.samples)?;
        let denoised_path = write_wav_file(&self.writer, DENOISED_FILE_NAME, &denoised.bytes)?;

        crate::info!(
            "Denoised {:.2}s of audio in {} ms",
            input_duration_secs,
            denoised.inference_time.as_millis()
        );

        Ok(DenoiseOutcome {
            recorded,
            denoised: denoised.bytes,
            input_duration_secs,
            inference_time: denoised.inference_time,
            denoised_path,
        })
    }

    /// Denoise in-memory samples and encode the result
    pub fn denoise_samples(&mut self, samples: Vec<f32>) -> Result<DenoisedAudio, PipelineError> {
        let start = Instant::now();
        let output = self.denoiser.denoise(samples)?;
        let inference_time = start.elapsed();

        Ok(DenoisedAudio {
            bytes: encode_with_format(&output, &self.format),
            sample_count: output.len(),
            inference_time,
        })
    }

    fn keep_input_copy(&self, recording: &Path, output_dir: &Path) -> Result<(), PipelineError> {
        let copy = match recording.extension().and_then(|e| e.to_str()) {
            Some(ext) => output_dir.join(format!("{}.{}", INPUT_COPY_STEM, ext)),
            None => output_dir.join(INPUT_COPY_STEM),
        };

        // Copying a file onto itself truncates it first
        if is_same_file(recording, &copy) {
            crate::debug!("{} is already the kept input copy", recording.display());
            return Ok(());
        }

        std::fs::copy(recording, &copy).map_err(|source| PipelineError::Io {
            path: recording.to_path_buf(),
            source,
        })?;
        Ok(())
    }
}

impl<T, D> DenoisePipeline<T, D>
where
    T: Transcoder + Send + 'static,
    D: Denoiser + Send + 'static,
{
    /// Run [`DenoisePipeline::process_recording`] on a blocking thread.
    ///
    /// The pipeline moves onto the worker and is handed back together with
    /// the outcome.
    pub async fn process_recording_async(
        mut self,
        recording: PathBuf,
    ) -> Result<(Self, Result<DenoiseOutcome, PipelineError>), PipelineError> {
        tokio::task::spawn_blocking(move || {
            let outcome = self.process_recording(&recording);
            (self, outcome)
        })
        .await
        .map_err(|e| PipelineError::TaskFailed(e.to_string()))
    }
}

/// True when both paths resolve to the same existing file
fn is_same_file(a: &Path, b: &Path) -> bool {
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod tests;
