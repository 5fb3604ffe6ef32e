// Audio container codec and playback plumbing

pub mod playback;
pub use playback::{format_elapsed, play_pcm, play_wav, playback_duration, PcmSink, PlaybackError, WriterSink};

pub mod wav;
pub use wav::{
    decode, decode_with_header, encode, encode_with_format, encoded_sample_count, read_wav_file,
    write_wav_file, DecodeMode, FileWriter, FormatError, SystemFileWriter, WavFileError, WavFormat,
    WavHeader, WavRecording, MAX_ENCODED_SAMPLES,
};
