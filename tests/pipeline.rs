use std::convert::Infallible;

use roadscore::{
    Detection, DetectionSource, FrameAnnotations, NullSink, Pipeline, PipelineConfig,
    PotholeReading, PotholeSource, SegmentReport, VideoProperties, VideoSink, VideoSource,
};

/// Frame stream handing out frame indices; detectors below are scripted
/// against those indices.
struct FrameStream {
    total: u64,
    cursor: u64,
    fps: f64,
    fail_at: Option<u64>,
}

impl FrameStream {
    fn new(total: u64, fps: f64) -> Self {
        Self {
            total,
            cursor: 0,
            fps,
            fail_at: None,
        }
    }
}

impl VideoSource for FrameStream {
    type Frame = u64;
    type Error = String;

    fn properties(&self) -> VideoProperties {
        VideoProperties {
            width: 640,
            height: 480,
            frame_count: self.total,
            fps: self.fps,
        }
    }

    fn read(&mut self) -> Result<Option<u64>, String> {
        if self.fail_at == Some(self.cursor) {
            return Err("decoder choked".to_string());
        }
        if self.cursor >= self.total {
            return Ok(None);
        }

        let frame = self.cursor;
        self.cursor += 1;
        Ok(Some(frame))
    }
}

struct ScriptedDetector {
    frames: Vec<Vec<Detection>>,
}

impl DetectionSource<u64> for ScriptedDetector {
    type Error = Infallible;

    fn detect(&mut self, frame: &u64) -> Result<Vec<Detection>, Infallible> {
        Ok(self
            .frames
            .get(*frame as usize)
            .cloned()
            .unwrap_or_default())
    }
}

struct ScriptedPothole {
    on_frames: Vec<u64>,
}

impl PotholeSource<u64> for ScriptedPothole {
    type Error = Infallible;

    fn predict(&mut self, frame: &u64) -> Result<PotholeReading, Infallible> {
        if self.on_frames.contains(frame) {
            Ok(PotholeReading {
                label: Some(1),
                probability: 0.93,
            })
        } else {
            Ok(PotholeReading {
                label: None,
                probability: 0.41,
            })
        }
    }
}

struct CountingSink {
    written: usize,
}

impl VideoSink<u64> for CountingSink {
    type Error = Infallible;

    fn write(
        &mut self,
        _frame: &mut u64,
        annotations: &FrameAnnotations<'_>,
    ) -> Result<(), Infallible> {
        assert_eq!(annotations.detections.len(), annotations.tracks.len());
        self.written += 1;
        Ok(())
    }
}

fn cars(n: usize) -> Vec<Detection> {
    (0..n)
        .map(|i| {
            let x = i as f32 * 200.;
            Detection::new(x, 0., x + 100., 100., 0.9, 2, "car")
        })
        .collect()
}

fn people(n: usize) -> Vec<Detection> {
    (0..n)
        .map(|i| {
            let x = i as f32 * 200.;
            Detection::new(x, 300., x + 50., 400., 0.9, 0, "person")
        })
        .collect()
}

#[test]
fn full_video_produces_segment_report() {
    // 12 frames at 2 fps: timestamps 0.0..5.5, so two 5-second segments.
    let mut frames: Vec<Vec<Detection>> = (0..12).map(|_| cars(12)).collect();
    frames[10].extend(people(2));

    let detector = ScriptedDetector { frames };
    let pothole = ScriptedPothole {
        on_frames: vec![10],
    };

    let pipeline: Pipeline<u64, _> =
        Pipeline::new(detector, 2.0, PipelineConfig::default()).unwrap();
    let pipeline = pipeline.with_pothole_source(pothole);

    let mut video = FrameStream::new(12, 2.0);
    let mut sink = CountingSink { written: 0 };
    let result = pipeline.run(&mut video, &mut sink);

    assert!(result.error.is_none());
    assert_eq!(sink.written, 12);
    assert_eq!(result.frame_stats.len(), 12);

    let segments = result.report.segments();
    assert_eq!(segments.len(), 2);

    // Segment 0: 12 vehicles throughout -> min(12/5, 4) = 2.
    assert_eq!(segments[0].segment, 0);
    assert_eq!(segments[0].vehicle, 12);
    assert_eq!(segments[0].timestamp, 0.0);
    assert!(!segments[0].pothole);
    assert_eq!(segments[0].score, 2);

    // Segment 1: worst frame adds 2 pedestrians and a pothole -> 2 + 1 + 1.
    assert_eq!(segments[1].segment, 1);
    assert_eq!(segments[1].vehicle, 12);
    assert_eq!(segments[1].pedestrian, 2);
    assert!(segments[1].pothole);
    assert_eq!(segments[1].timestamp, 5.0);
    assert_eq!(segments[1].score, 4);

    assert_eq!(result.average_score, 3.0);

    // The report table survives CSV serialization unchanged.
    let mut buf = Vec::new();
    result.report.write_csv(&mut buf).unwrap();
    let parsed = SegmentReport::parse_csv(buf.as_slice()).unwrap();
    assert_eq!(parsed, result.report);
}

#[test]
fn zero_frame_video_yields_empty_report() {
    let detector = ScriptedDetector { frames: Vec::new() };
    let pipeline: Pipeline<u64, _> =
        Pipeline::new(detector, 30.0, PipelineConfig::default()).unwrap();

    let mut video = FrameStream::new(0, 30.0);
    let result = pipeline.run(&mut video, &mut NullSink);

    assert!(result.error.is_none());
    assert!(result.report.is_empty());
    assert_eq!(result.average_score, 0.0);
    assert!(result.frame_stats.is_empty());
}

#[test]
fn read_failure_yields_partial_report_and_error() {
    let detector = ScriptedDetector {
        frames: (0..10).map(|_| cars(6)).collect(),
    };
    let pipeline: Pipeline<u64, _> =
        Pipeline::new(detector, 2.0, PipelineConfig::default()).unwrap();

    let mut video = FrameStream::new(10, 2.0);
    video.fail_at = Some(3);

    let result = pipeline.run(&mut video, &mut NullSink);

    // Best-effort report over the frames processed before the failure.
    assert!(result.error.as_deref().unwrap().contains("decoder choked"));
    assert_eq!(result.frame_stats.len(), 3);
    assert_eq!(result.report.len(), 1);
    assert_eq!(result.report.segments()[0].vehicle, 6);
}

#[test]
fn disabled_pothole_source_reports_zero_throughout() {
    let detector = ScriptedDetector {
        frames: (0..4).map(|_| cars(1)).collect(),
    };
    let pipeline: Pipeline<u64, _> =
        Pipeline::new(detector, 2.0, PipelineConfig::default()).unwrap();

    let mut video = FrameStream::new(4, 2.0);
    let result = pipeline.run(&mut video, &mut NullSink);

    assert!(result.error.is_none());
    assert!(result.frame_stats.iter().all(|f| !f.pothole));
    assert!(!result.report.segments()[0].pothole);
}
