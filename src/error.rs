use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed detection: {0}")]
    MalformedDetection(String),

    #[error("segment size must be positive, got {0}")]
    InvalidSegmentSize(f64),

    #[error("frame rate must be positive, got {0}")]
    InvalidFrameRate(f64),

    #[error("could not open video file: {0}")]
    UnreadableInput(String),

    #[error("malformed report row: {0}")]
    Report(String),

    #[error("Io Error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "video")]
    #[error("OpenCV Error: {0}")]
    OpenCv(#[from] opencv::Error),
}
