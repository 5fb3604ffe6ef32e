// Tests for the denoise pipeline

use super::*;
use crate::audio::{decode, encode, FormatError};
use std::sync::{Arc, Mutex};

/// Transcoder that writes a fixed WAV buffer instead of running ffmpeg
struct FakeTranscoder {
    output: Vec<u8>,
    calls: Arc<Mutex<Vec<(PathBuf, PathBuf)>>>,
}

impl FakeTranscoder {
    fn producing(output: Vec<u8>) -> Self {
        Self {
            output,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl Transcoder for FakeTranscoder {
    fn transcode(&self, input: &Path, output: &Path) -> Result<(), TranscodeError> {
        self.calls
            .lock()
            .unwrap()
            .push((input.to_path_buf(), output.to_path_buf()));
        std::fs::write(output, &self.output).map_err(TranscodeError::SpawnFailed)
    }
}

struct FailingTranscoder;

impl Transcoder for FailingTranscoder {
    fn transcode(&self, _input: &Path, _output: &Path) -> Result<(), TranscodeError> {
        Err(TranscodeError::Failed {
            code: Some(1),
            stderr: "Invalid data found when processing input".to_string(),
        })
    }
}

/// Denoiser that halves every sample and remembers what it was given
#[derive(Default)]
struct HalvingDenoiser {
    inputs: Vec<Vec<f32>>,
}

impl Denoiser for HalvingDenoiser {
    fn denoise(&mut self, samples: Vec<f32>) -> Result<Vec<f32>, DenoiserError> {
        let output = samples.iter().map(|s| s * 0.5).collect();
        self.inputs.push(samples);
        Ok(output)
    }
}

struct FailingDenoiser;

impl Denoiser for FailingDenoiser {
    fn denoise(&mut self, _samples: Vec<f32>) -> Result<Vec<f32>, DenoiserError> {
        Err(DenoiserError::ModelNotFound("models/pretrained.onnx".to_string()))
    }
}

fn write_recording(dir: &Path) -> PathBuf {
    let path = dir.join("clip.amr");
    std::fs::write(&path, b"#!AMR\n fake compressed audio").unwrap();
    path
}

fn test_samples() -> Vec<f32> {
    (0..1600).map(|i| ((i % 100) as f32 / 100.0) - 0.5).collect()
}

#[test]
fn test_process_recording_produces_outcome_and_files() {
    let temp = tempfile::tempdir().unwrap();
    let recording = write_recording(temp.path());
    let output_dir = temp.path().join("out");
    let transcoded = encode(&test_samples());

    let transcoder = FakeTranscoder::producing(transcoded.clone());
    let calls = transcoder.calls.clone();
    let mut pipeline = DenoisePipeline::new(transcoder, HalvingDenoiser::default(), output_dir.clone());

    let outcome = pipeline.process_recording(&recording).unwrap();

    // Transcoder was pointed from the recording into the output dir
    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, recording);
    assert!(calls[0].1.starts_with(&output_dir));

    assert_eq!(outcome.recorded, transcoded);
    assert!((outcome.input_duration_secs - 0.1).abs() < 1e-9);
    assert_eq!(outcome.denoised.len(), transcoded.len());
    assert_eq!(outcome.denoised_path, output_dir.join(DENOISED_FILE_NAME));
    assert_eq!(std::fs::read(&outcome.denoised_path).unwrap(), outcome.denoised);
    assert!(output_dir.join("input.amr").exists());

    // Model saw the decoded input, output is the halved signal
    let original = decode(&transcoded).unwrap();
    assert_eq!(pipeline.denoiser_mut().inputs, vec![original.clone()]);
    let denoised = decode(&outcome.denoised).unwrap();
    for (before, after) in original.iter().zip(denoised.iter()) {
        assert!((before * 0.5 - after).abs() <= 2.0 / 32768.0);
    }
}

#[test]
fn test_transcode_failure_stops_pipeline() {
    let temp = tempfile::tempdir().unwrap();
    let recording = write_recording(temp.path());
    let output_dir = temp.path().join("out");
    let mut pipeline = DenoisePipeline::new(FailingTranscoder, HalvingDenoiser::default(), output_dir.clone());

    let result = pipeline.process_recording(&recording);

    assert!(matches!(result, Err(PipelineError::Transcode(TranscodeError::Failed { .. }))));
    assert!(pipeline.denoiser_mut().inputs.is_empty());
    assert!(!output_dir.join(DENOISED_FILE_NAME).exists());
}

#[test]
fn test_invalid_transcoder_output_is_format_error() {
    let temp = tempfile::tempdir().unwrap();
    let recording = write_recording(temp.path());
    let transcoder = FakeTranscoder::producing(b"ID3 this is an mp3, not a wav file at all.....".to_vec());
    let mut pipeline = DenoisePipeline::new(transcoder, HalvingDenoiser::default(), temp.path().join("out"));

    let result = pipeline.process_recording(&recording);

    assert!(matches!(
        result,
        Err(PipelineError::Wav(WavFileError::Format(FormatError::NotRiff)))
    ));
}

#[test]
fn test_denoiser_failure_propagates() {
    let temp = tempfile::tempdir().unwrap();
    let recording = write_recording(temp.path());
    let transcoder = FakeTranscoder::producing(encode(&test_samples()));
    let mut pipeline = DenoisePipeline::new(transcoder, FailingDenoiser, temp.path().join("out"));

    let result = pipeline.process_recording(&recording);

    assert!(matches!(
        result,
        Err(PipelineError::Denoiser(DenoiserError::ModelNotFound(_)))
    ));
}

#[test]
fn test_rerun_on_kept_input_copy_leaves_it_intact() {
    let temp = tempfile::tempdir().unwrap();
    let output_dir = temp.path().join("out");
    std::fs::create_dir_all(&output_dir).unwrap();
    let kept = output_dir.join("input.amr");
    std::fs::write(&kept, b"#!AMR\n fake compressed audio").unwrap();
    let before = std::fs::metadata(&kept).unwrap().len();

    let transcoder = FakeTranscoder::producing(encode(&test_samples()));
    let calls = transcoder.calls.clone();
    let mut pipeline = DenoisePipeline::new(transcoder, HalvingDenoiser::default(), output_dir.clone());

    // Reached through a non-canonical path as well
    let indirect = output_dir.join("..").join("out").join("input.amr");
    pipeline.process_recording(&kept).unwrap();
    pipeline.process_recording(&indirect).unwrap();

    assert_eq!(std::fs::metadata(&kept).unwrap().len(), before);
    assert_eq!(std::fs::read(&kept).unwrap(), b"#!AMR\n fake compressed audio");
    assert_eq!(calls.lock().unwrap().len(), 2);
}

#[test]
fn test_missing_recording_is_io_error() {
    let temp = tempfile::tempdir().unwrap();
    let transcoder = FakeTranscoder::producing(encode(&test_samples()));
    let mut pipeline = DenoisePipeline::new(transcoder, HalvingDenoiser::default(), temp.path().join("out"));

    let result = pipeline.process_recording(&temp.path().join("missing.amr"));

    let Err(PipelineError::Io { path, .. }) = result else {
        panic!("Expected Io error for missing recording");
    };
    assert!(path.ends_with("missing.amr"));
}

#[test]
fn test_denoise_samples_encodes_with_configured_format() {
    let temp = tempfile::tempdir().unwrap();
    let mut config = AppConfig::default();
    config.output_dir = temp.path().to_path_buf();
    config.audio.format.sample_rate = 8000;
    let mut pipeline = DenoisePipeline::from_config(
        FakeTranscoder::producing(Vec::new()),
        HalvingDenoiser::default(),
        &config,
    );

    let denoised = pipeline.denoise_samples(vec![0.5, -0.5, 0.25]).unwrap();

    assert_eq!(denoised.sample_count, 3);
    assert_eq!(denoised.bytes.len(), 44 + 6);
    let header = crate::audio::WavHeader::parse(&denoised.bytes).unwrap();
    assert_eq!(header.sample_rate, 8000);
    assert_eq!(pipeline.output_dir(), temp.path());
}

#[test]
fn test_lenient_config_accepts_nonstandard_fmt_fields() {
    let temp = tempfile::tempdir().unwrap();
    let recording = write_recording(temp.path());
    let mut odd = encode(&test_samples());
    odd[20..22].copy_from_slice(&0xFFFEu16.to_le_bytes());

    let mut config = AppConfig::default();
    config.output_dir = temp.path().join("out");

    let mut strict = DenoisePipeline::from_config(
        FakeTranscoder::producing(odd.clone()),
        HalvingDenoiser::default(),
        &config,
    );
    assert!(matches!(
        strict.process_recording(&recording),
        Err(PipelineError::Wav(WavFileError::Format(FormatError::InvalidField { .. })))
    ));

    config.audio.decode_mode = DecodeMode::Lenient;
    let mut lenient = DenoisePipeline::from_config(
        FakeTranscoder::producing(odd),
        HalvingDenoiser::default(),
        &config,
    );
    assert!(lenient.process_recording(&recording).is_ok());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_async_run_hands_pipeline_back() {
    let temp = tempfile::tempdir().unwrap();
    let recording = write_recording(temp.path());
    let transcoder = FakeTranscoder::producing(encode(&test_samples()));
    let pipeline = DenoisePipeline::new(transcoder, HalvingDenoiser::default(), temp.path().join("out"));

    let (mut pipeline, outcome) = pipeline
        .process_recording_async(recording.clone())
        .await
        .unwrap();
    assert!(outcome.is_ok());

    // The same pipeline can run again after being handed back
    let (mut pipeline, outcome) = pipeline.process_recording_async(recording).await.unwrap();
    assert!(outcome.is_ok());
    assert_eq!(pipeline.denoiser_mut().inputs.len(), 2);
}
