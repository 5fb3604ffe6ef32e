// Enable coverage attribute on nightly for explicit exclusions
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod audio;
pub mod audio_constants;
pub mod config;
pub mod denoiser;
pub mod logging;
pub mod pipeline;
pub mod transcode;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

// Re-export log macros for use throughout the crate
pub use log::{debug, error, info, trace, warn};

pub use audio::{decode, encode, FormatError, WavFormat, WavHeader};
pub use config::AppConfig;
pub use denoiser::{Denoiser, ModelVariant, OnnxDenoiser};
pub use pipeline::{DenoiseOutcome, DenoisePipeline, PipelineError};
pub use transcode::{FfmpegTranscoder, Transcoder};

/// Default config file looked up when none is given
const DEFAULT_CONFIG_FILE: &str = "denoise-demo.json";

/// CLI entry point: `denoise-demo <recording> [config.json]`
#[cfg_attr(coverage_nightly, coverage(off))]
pub fn run() -> ExitCode {
    let mut args = std::env::args_os().skip(1);
    let Some(recording) = args.next().map(PathBuf::from) else {
        eprintln!("usage: denoise-demo <recording> [config.json]");
        return ExitCode::from(2);
    };
    let config_path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    let config = match AppConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init(&config.logging, &config.output_dir) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    match denoise_recording(&recording, &config) {
        Ok(outcome) => {
            println!(
                "Denoised {:.2}s of audio in {} ms -> {}",
                outcome.input_duration_secs,
                outcome.inference_time.as_millis(),
                outcome.denoised_path.display()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Denoising failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Build the ffmpeg + ONNX pipeline from `config` and run it on one recording
#[cfg_attr(coverage_nightly, coverage(off))]
fn denoise_recording(recording: &Path, config: &AppConfig) -> Result<DenoiseOutcome, PipelineError> {
    let transcoder = FfmpegTranscoder::new(&config.transcoder.binary_path, config.audio.format)
        .with_extra_args(config.transcoder.extra_args.clone());
    let denoiser = OnnxDenoiser::new(&config.denoiser.model_dir, config.denoiser.model);
    let pipeline = DenoisePipeline::from_config(transcoder, denoiser, config);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .build()
        .map_err(|e| PipelineError::TaskFailed(format!("failed to start runtime: {}", e)))?;

    let (_, outcome) = runtime.block_on(pipeline.process_recording_async(recording.to_path_buf()))?;
    outcome
}
