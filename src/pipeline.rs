use std::marker::PhantomData;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::warn;

use crate::analyzer::{CategoryConfig, FrameAnalyzer};
use crate::detection::Detection;
use crate::error::Error;
use crate::report::{FrameRecord, SegmentReport};
use crate::source::{
    DetectionSource, FrameAnnotations, PotholeReading, PotholeSource, VideoSink, VideoSource,
};
use crate::tracker::{ActiveTrack, IdentityTracker, TrackerConfig};

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Segment window length in seconds.
    pub segment_size: f64,
    pub tracker: TrackerConfig,
    pub categories: CategoryConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            segment_size: 5.0,
            tracker: TrackerConfig::default(),
            categories: CategoryConfig::default(),
        }
    }
}

/// Everything produced for one frame: the appended record plus the raw
/// detections and tracks, for sinks that annotate the output video.
#[derive(Debug)]
pub struct FrameOutcome {
    pub record: FrameRecord,
    pub detections: Vec<Detection>,
    pub tracks: Vec<ActiveTrack>,
    /// Classifier confidence when a pothole was flagged this frame.
    pub pothole: Option<f32>,
}

impl FrameOutcome {
    pub fn annotations(&self) -> FrameAnnotations<'_> {
        FrameAnnotations {
            detections: &self.detections,
            tracks: &self.tracks,
            score: self.record.score,
            pothole: self.pothole,
        }
    }
}

/// Final result object for one video. On internal failure `error` is
/// populated and the report left empty; callers check the field instead of
/// catching a panic.
#[derive(Debug)]
pub struct VideoReport {
    pub output_video: Option<PathBuf>,
    pub report: SegmentReport,
    pub average_score: f64,
    pub processing_time: Duration,
    pub segment_size: f64,
    pub frame_stats: Vec<FrameRecord>,
    pub error: Option<String>,
}

impl VideoReport {
    /// Terminal-failure report: nothing was processed.
    pub fn failed<S: Into<String>>(error: S, segment_size: f64) -> Self {
        Self {
            output_video: None,
            report: SegmentReport::default(),
            average_score: 0.0,
            processing_time: Duration::ZERO,
            segment_size,
            frame_stats: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// Per-video processing driver: detect, track, analyze, score, record,
/// one frame at a time, in order.
///
/// The pipeline is single-threaded and frame-sequential by construction:
/// the tracker registry depends on the immediately preceding frame, so
/// frames must not be reordered or interleaved. Parallel videos each get
/// their own pipeline.
pub struct Pipeline<F, D, P = ()> {
    detector: D,
    pothole: Option<P>,
    tracker: IdentityTracker,
    analyzer: FrameAnalyzer,
    segment_size: f64,
    fps: f64,
    frame_index: u64,
    frames: Vec<FrameRecord>,
    _frame: PhantomData<fn(&F)>,
}

impl<F, D: DetectionSource<F>> Pipeline<F, D> {
    pub fn new(detector: D, fps: f64, config: PipelineConfig) -> Result<Self, Error> {
        if !(fps > 0.0) || !fps.is_finite() {
            return Err(Error::InvalidFrameRate(fps));
        }
        if !(config.segment_size > 0.0) || !config.segment_size.is_finite() {
            return Err(Error::InvalidSegmentSize(config.segment_size));
        }

        Ok(Self {
            detector,
            pothole: None,
            tracker: IdentityTracker::new(config.tracker),
            analyzer: FrameAnalyzer::new(config.categories),
            segment_size: config.segment_size,
            fps,
            frame_index: 0,
            frames: Vec::new(),
            _frame: PhantomData,
        })
    }
}

impl<F, D: DetectionSource<F>, P: PotholeSource<F>> Pipeline<F, D, P> {
    /// Attach a pothole classifier. Without one, the pothole flag stays 0
    /// for the whole video.
    pub fn with_pothole_source<P2: PotholeSource<F>>(self, pothole: P2) -> Pipeline<F, D, P2> {
        Pipeline {
            detector: self.detector,
            pothole: Some(pothole),
            tracker: self.tracker,
            analyzer: self.analyzer,
            segment_size: self.segment_size,
            fps: self.fps,
            frame_index: self.frame_index,
            frames: self.frames,
            _frame: PhantomData,
        }
    }

    /// Process one frame end to end and append its record.
    ///
    /// A failing detector or pothole classifier is recovered locally as
    /// "nothing detected" for that frame; the pipeline never aborts a
    /// whole video over a transient inference error. Malformed detection
    /// data is fatal.
    pub fn process_frame(&mut self, frame: &F) -> Result<FrameOutcome, Error> {
        let detections = match self.detector.detect(frame) {
            Ok(detections) => detections,
            Err(err) => {
                warn!("detector failed on frame {}: {}", self.frame_index, err);
                Vec::new()
            }
        };

        let tracks = self.tracker.update(&detections)?;

        let pothole = match self.pothole.as_mut() {
            Some(source) => match source.predict(frame) {
                Ok(reading) => reading.is_pothole().then(|| reading.probability),
                Err(err) => {
                    warn!(
                        "pothole classifier failed on frame {}: {}",
                        self.frame_index, err
                    );
                    None
                }
            },
            None => None,
        };

        let counts = self.analyzer.analyze(&tracks, pothole.is_some());

        let record = FrameRecord {
            frame_index: self.frame_index,
            vehicle: counts.vehicle,
            pedestrian: counts.pedestrian,
            animal: counts.animal,
            pothole: counts.pothole,
            score: counts.score(),
            timestamp: self.frame_index as f64 / self.fps,
        };

        self.frames.push(record.clone());
        self.frame_index += 1;

        Ok(FrameOutcome {
            record,
            detections,
            tracks,
            pothole,
        })
    }

    /// Records accumulated so far; covers only the frames processed, so a
    /// partial run still reports best-effort.
    #[inline]
    pub fn frame_stats(&self) -> &[FrameRecord] {
        &self.frames
    }

    pub fn report(&self) -> Result<SegmentReport, Error> {
        SegmentReport::from_frames(&self.frames, self.segment_size)
    }

    /// Drive the whole video through the pipeline, feeding every processed
    /// frame to the sink, and build the final report.
    pub fn run<V, S>(mut self, video: &mut V, sink: &mut S) -> VideoReport
    where
        V: VideoSource<Frame = F>,
        S: VideoSink<F>,
    {
        let started = Instant::now();
        let mut error = None;

        loop {
            let mut frame = match video.read() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(err) => {
                    error = Some(format!("video read failed: {}", err));
                    break;
                }
            };

            let outcome = match self.process_frame(&frame) {
                Ok(outcome) => outcome,
                Err(err) => {
                    error = Some(err.to_string());
                    break;
                }
            };

            if let Err(err) = sink.write(&mut frame, &outcome.annotations()) {
                error = Some(format!("video write failed: {}", err));
                break;
            }
        }

        self.into_report(started.elapsed(), error)
    }

    fn into_report(self, processing_time: Duration, error: Option<String>) -> VideoReport {
        let (report, error) = match SegmentReport::from_frames(&self.frames, self.segment_size) {
            Ok(report) => (report, error),
            Err(err) => (SegmentReport::default(), error.or_else(|| Some(err.to_string()))),
        };

        VideoReport {
            output_video: None,
            average_score: report.average_score(),
            report,
            processing_time,
            segment_size: self.segment_size,
            frame_stats: self.frames,
            error,
        }
    }
}

/// Disabled pothole classifier; `Pipeline::new` starts without one.
impl<F> PotholeSource<F> for () {
    type Error = std::convert::Infallible;

    fn predict(&mut self, _frame: &F) -> Result<PotholeReading, Self::Error> {
        Ok(PotholeReading {
            label: None,
            probability: 0.0,
        })
    }
}
