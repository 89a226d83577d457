//! Fragment extraction
//!
//! [`Slicer`] is the seam to the external transcode/slice primitive and
//! [`FfmpegSlicer`] drives the `ffmpeg` binary. [`FragmentExtractor`] runs a
//! slicer over every fragment of one source asset and releases the asset
//! afterwards.

mod extractor;
mod ffmpeg;
mod traits;

pub use extractor::{ExtractionReport, FragmentExtractor, FragmentOutcome};
pub use ffmpeg::FfmpegSlicer;
pub use traits::{AudioCodec, SliceFormat, SliceJob, Slicer};
