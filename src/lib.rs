pub mod analyzer;
pub mod bbox;
pub mod detection;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod score;
pub mod source;
pub mod tracker;

#[cfg(feature = "video")]
pub mod video;

pub use analyzer::{CategoryConfig, FrameAnalyzer, FrameCounts};
pub use detection::Detection;
pub use error::Error;
pub use pipeline::{FrameOutcome, Pipeline, PipelineConfig, VideoReport};
pub use report::{FrameRecord, SegmentRecord, SegmentReport};
pub use score::{frame_score, MAX_SCORE};
pub use source::{
    DetectionSource, FrameAnnotations, NullSink, PotholeReading, PotholeSource, VideoProperties,
    VideoSink, VideoSource,
};
pub use tracker::{ActiveTrack, IdentityTracker, TrackerConfig};
