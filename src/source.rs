use std::convert::Infallible;
use std::fmt::Display;

use crate::detection::Detection;
use crate::tracker::ActiveTrack;

/// Object detector contract. The model behind it is out of scope; anything
/// that maps a frame to a list of [`Detection`]s plugs in here.
pub trait DetectionSource<F> {
    type Error: Display;

    fn detect(&mut self, frame: &F) -> Result<Vec<Detection>, Self::Error>;
}

/// One pothole-classifier inference: predicted class index (or none below
/// the classifier's own threshold) and its confidence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PotholeReading {
    pub label: Option<i32>,
    pub probability: f32,
}

impl PotholeReading {
    /// Class index 1 means "pothole present".
    #[inline]
    pub fn is_pothole(&self) -> bool {
        self.label == Some(1)
    }
}

/// Whole-frame pothole classifier contract.
pub trait PotholeSource<F> {
    type Error: Display;

    fn predict(&mut self, frame: &F) -> Result<PotholeReading, Self::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoProperties {
    pub width: u32,
    pub height: u32,
    pub frame_count: u64,
    pub fps: f64,
}

/// Sequential frame supplier for one video.
pub trait VideoSource {
    type Frame;
    type Error: Display;

    fn properties(&self) -> VideoProperties;

    /// Next frame, or `None` at end of stream.
    fn read(&mut self) -> Result<Option<Self::Frame>, Self::Error>;
}

/// Everything a sink needs to annotate one processed frame.
#[derive(Debug)]
pub struct FrameAnnotations<'a> {
    pub detections: &'a [Detection],
    pub tracks: &'a [ActiveTrack],
    pub score: u8,
    /// Classifier confidence when a pothole was flagged this frame.
    pub pothole: Option<f32>,
}

/// Consumer of processed frames (annotated video writer, preview window, ...).
pub trait VideoSink<F> {
    type Error: Display;

    fn write(&mut self, frame: &mut F, annotations: &FrameAnnotations<'_>) -> Result<(), Self::Error>;
}

/// Sink that drops every frame; for report-only runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl<F> VideoSink<F> for NullSink {
    type Error = Infallible;

    #[inline]
    fn write(&mut self, _frame: &mut F, _annotations: &FrameAnnotations<'_>) -> Result<(), Infallible> {
        Ok(())
    }
}
