use std::path::{Path, PathBuf};

use opencv::{
    core::{self, Mat},
    imgproc,
    prelude::*,
    videoio,
};

use crate::analyzer::CategoryConfig;
use crate::bbox::{BBox, Ltrb};
use crate::error::Error;
use crate::pipeline::{Pipeline, PipelineConfig, VideoReport};
use crate::source::{
    DetectionSource, FrameAnnotations, PotholeSource, VideoProperties, VideoSink, VideoSource,
};

/// Capture wrapper over one input video file.
pub struct VideoFile {
    cap: videoio::VideoCapture,
    props: VideoProperties,
}

impl VideoFile {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_string_lossy();
        let cap = videoio::VideoCapture::from_file(&path, videoio::CAP_ANY)?;

        if !videoio::VideoCapture::is_opened(&cap)? {
            return Err(Error::UnreadableInput(path.into_owned()));
        }

        let props = VideoProperties {
            width: cap.get(videoio::CAP_PROP_FRAME_WIDTH)? as u32,
            height: cap.get(videoio::CAP_PROP_FRAME_HEIGHT)? as u32,
            frame_count: cap.get(videoio::CAP_PROP_FRAME_COUNT)?.max(0.) as u64,
            fps: cap.get(videoio::CAP_PROP_FPS)?,
        };

        Ok(Self { cap, props })
    }
}

impl VideoSource for VideoFile {
    type Frame = Mat;
    type Error = Error;

    fn properties(&self) -> VideoProperties {
        self.props
    }

    fn read(&mut self) -> Result<Option<Mat>, Error> {
        let mut frame = Mat::default();

        if !self.cap.read(&mut frame)? {
            return Ok(None);
        }

        if frame.cols() == 0 || frame.rows() == 0 {
            return Ok(None);
        }

        Ok(Some(frame))
    }
}

/// Sink that draws detections, track ids, the frame score and the pothole
/// banner onto each frame before writing it out.
pub struct AnnotatedWriter {
    writer: videoio::VideoWriter,
    path: PathBuf,
    categories: CategoryConfig,
    frame_width: i32,
}

impl AnnotatedWriter {
    pub fn create<P: Into<PathBuf>>(path: P, props: &VideoProperties) -> Result<Self, Error> {
        let path = path.into();

        let fourcc =
            videoio::VideoWriter::fourcc(b'm' as _, b'p' as _, b'4' as _, b'v' as _)?;
        let writer = videoio::VideoWriter::new(
            &path.to_string_lossy(),
            fourcc,
            props.fps,
            core::Size::new(props.width as i32, props.height as i32),
            true,
        )?;

        Ok(Self {
            writer,
            path,
            categories: CategoryConfig::default(),
            frame_width: props.width as i32,
        })
    }

    /// Use the given category sets when picking box colors.
    pub fn with_categories(mut self, categories: CategoryConfig) -> Self {
        self.categories = categories;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn release(&mut self) -> Result<(), Error> {
        self.writer.release()?;
        Ok(())
    }

    fn color_for(&self, class_name: &str) -> core::Scalar {
        if self.categories.vehicle.contains(class_name) {
            core::Scalar::new(0., 255., 0., 0.)
        } else if self.categories.pedestrian.contains(class_name) {
            core::Scalar::new(255., 0., 0., 0.)
        } else if self.categories.animal.contains(class_name) {
            core::Scalar::new(0., 0., 255., 0.)
        } else {
            core::Scalar::new(255., 255., 255., 0.)
        }
    }

    fn draw_box(
        &self,
        frame: &mut Mat,
        bbox: &BBox<Ltrb>,
        label: &str,
        color: core::Scalar,
    ) -> Result<(), Error> {
        let ltwh = bbox.as_ltwh();
        let rect = core::Rect::new(
            ltwh.left() as i32,
            ltwh.top() as i32,
            ltwh.width() as i32,
            ltwh.height() as i32,
        );

        imgproc::rectangle(frame, rect, color, 2, imgproc::LINE_8, 0)?;
        imgproc::put_text(
            frame,
            label,
            core::Point::new(bbox.left() as i32, (bbox.top() - 10.) as i32),
            imgproc::FONT_HERSHEY_SIMPLEX,
            0.5,
            color,
            2,
            imgproc::LINE_AA,
            false,
        )?;

        Ok(())
    }
}

impl VideoSink<Mat> for AnnotatedWriter {
    type Error = Error;

    fn write(&mut self, frame: &mut Mat, annotations: &FrameAnnotations<'_>) -> Result<(), Error> {
        for det in annotations.detections {
            let color = self.color_for(&det.class_name);
            let label = format!("{} {:.2}", det.class_name, det.confidence);
            self.draw_box(frame, &det.bbox, &label, color)?;
        }

        for track in annotations.tracks {
            let color = self.color_for(&track.class_name);
            let label = format!("{} ID:{}", track.class_name, track.track_id);
            self.draw_box(frame, &track.bbox, &label, color)?;
        }

        if let Some(probability) = annotations.pothole {
            imgproc::put_text(
                frame,
                &format!("Pothole ({:.2})", probability),
                core::Point::new(self.frame_width - 300, 40),
                imgproc::FONT_HERSHEY_SIMPLEX,
                0.7,
                core::Scalar::new(0., 255., 255., 0.),
                2,
                imgproc::LINE_AA,
                false,
            )?;
        }

        imgproc::put_text(
            frame,
            &format!("Safety Score: {}/10", annotations.score),
            core::Point::new(20, 40),
            imgproc::FONT_HERSHEY_SIMPLEX,
            1.0,
            core::Scalar::new(0., 0., 255., 0.),
            2,
            imgproc::LINE_AA,
            false,
        )?;

        self.writer.write(frame)?;
        Ok(())
    }
}

/// End-to-end entry point: read `input`, write the annotated video to
/// `output`, return the segment report. Failures land in the returned
/// report's `error` field; this never panics.
pub fn process_video_file<D, P>(
    input: impl AsRef<Path>,
    output: impl Into<PathBuf>,
    detector: D,
    pothole: Option<P>,
    config: PipelineConfig,
) -> VideoReport
where
    D: DetectionSource<Mat>,
    P: PotholeSource<Mat>,
{
    let segment_size = config.segment_size;

    let mut video = match VideoFile::open(input) {
        Ok(video) => video,
        Err(err) => return VideoReport::failed(err.to_string(), segment_size),
    };

    let props = video.properties();
    if !(props.fps > 0.0) || !props.fps.is_finite() {
        return VideoReport::failed(
            format!("invalid frame rate {} in input video", props.fps),
            segment_size,
        );
    }

    let output = output.into();
    let mut sink = match AnnotatedWriter::create(&output, &props) {
        Ok(sink) => sink.with_categories(config.categories.clone()),
        Err(err) => return VideoReport::failed(err.to_string(), segment_size),
    };

    let pipeline = match Pipeline::new(detector, props.fps, config) {
        Ok(pipeline) => pipeline,
        Err(err) => return VideoReport::failed(err.to_string(), segment_size),
    };

    let mut report = match pothole {
        Some(pothole) => pipeline
            .with_pothole_source(pothole)
            .run(&mut video, &mut sink),
        None => pipeline.run(&mut video, &mut sink),
    };

    if let Err(err) = sink.release() {
        if report.error.is_none() {
            report.error = Some(format!("failed to finalize output video: {}", err));
        }
    }

    report.output_video = Some(output);
    report
}
