//! Traits and types for fragment slicing

use async_trait::async_trait;
use std::path::PathBuf;

/// Audio codec used for fragment output
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AudioCodec {
    /// MPEG layer III via LAME
    Mp3,
    /// Signed 16-bit little-endian PCM
    Pcm16,
}

impl AudioCodec {
    /// Codec for a fragment extension: mp3 for `.mp3`, PCM for anything else
    pub fn for_extension(extension: &str) -> Self {
        if extension.eq_ignore_ascii_case(".mp3") {
            AudioCodec::Mp3
        } else {
            AudioCodec::Pcm16
        }
    }

    /// Encoder name as understood by ffmpeg
    pub fn encoder(&self) -> &'static str {
        match self {
            AudioCodec::Mp3 => "libmp3lame",
            AudioCodec::Pcm16 => "pcm_s16le",
        }
    }
}

/// Output format shared by every fragment of a run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SliceFormat {
    /// Encoder
    pub codec: AudioCodec,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// 1 (mono) or 2 (stereo)
    pub channels: u8,
}

/// One invocation of the slicer
#[derive(Clone, Debug, PartialEq)]
pub struct SliceJob {
    /// Source asset
    pub input: PathBuf,
    /// Fragment file to (over)write
    pub output: PathBuf,
    /// Start, whole seconds
    pub start_secs: u64,
    /// End, whole seconds
    pub end_secs: u64,
    /// Output format
    pub format: SliceFormat,
}

/// Trait for the external transcode/slice primitive
///
/// An implementation trims `job.input` to `[start_secs, end_secs]` and writes
/// the result to `job.output`, overwriting any existing file.
#[async_trait]
pub trait Slicer: Send + Sync {
    /// Produce one fragment
    ///
    /// # Errors
    ///
    /// Returns an error if the tool cannot be started, times out or reports
    /// failure. A failed job may leave a missing or partial output file.
    async fn slice(&self, job: &SliceJob) -> crate::Result<()>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
