// Tests for the transcode module

use super::*;

#[test]
fn test_transcode_args_match_canonical_layout() {
    let transcoder = FfmpegTranscoder::default();

    let args = transcoder.transcode_args(Path::new("/tmp/in.amr"), Path::new("/tmp/out.wav"));

    let args: Vec<String> = args.iter().map(|a| a.to_string_lossy().to_string()).collect();
    assert_eq!(
        args,
        vec![
            "-y", "-i", "/tmp/in.amr", "-bitexact", "-acodec", "pcm_s16le", "-ac", "1", "-ar",
            "16000", "/tmp/out.wav"
        ]
    );
}

#[test]
fn test_transcode_args_follow_format_and_extra_args() {
    let format = WavFormat {
        sample_rate: 8000,
        ..WavFormat::default()
    };
    let transcoder = FfmpegTranscoder::new("ffmpeg", format)
        .with_extra_args(vec!["-loglevel".to_string(), "error".to_string()]);

    let args = transcoder.transcode_args(Path::new("in.m4a"), Path::new("out.wav"));
    let args: Vec<String> = args.iter().map(|a| a.to_string_lossy().to_string()).collect();

    assert_eq!(args[9], "8000");
    // Extra flags go right before the output path
    assert_eq!(&args[10..], &["-loglevel", "error", "out.wav"]);
}

#[test]
fn test_missing_binary_is_reported() {
    let transcoder = FfmpegTranscoder::new("/nonexistent/bin/ffmpeg", WavFormat::default());
    let temp = tempfile::tempdir().unwrap();

    let result = transcoder.transcode(&temp.path().join("in.amr"), &temp.path().join("out.wav"));

    let Err(TranscodeError::BinaryNotFound(path)) = result else {
        panic!("Expected BinaryNotFound, got {:?}", result);
    };
    assert_eq!(path, PathBuf::from("/nonexistent/bin/ffmpeg"));
}

#[cfg(unix)]
#[test]
fn test_non_zero_exit_is_failure() {
    let transcoder = FfmpegTranscoder::new("false", WavFormat::default());
    let temp = tempfile::tempdir().unwrap();

    let result = transcoder.transcode(&temp.path().join("in.amr"), &temp.path().join("out.wav"));

    assert!(matches!(result, Err(TranscodeError::Failed { code: Some(1), .. })));
}

#[cfg(unix)]
#[test]
fn test_success_without_output_file_is_reported() {
    let transcoder = FfmpegTranscoder::new("true", WavFormat::default());
    let temp = tempfile::tempdir().unwrap();
    let output = temp.path().join("out.wav");

    let result = transcoder.transcode(&temp.path().join("in.amr"), &output);

    let Err(TranscodeError::MissingOutput(path)) = result else {
        panic!("Expected MissingOutput, got {:?}", result);
    };
    assert_eq!(path, output);
}
