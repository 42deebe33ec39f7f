use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Detector hardware or model failure.
///
/// Never retried inside the pipeline; the caller decides whether to abort
/// the stream or retry at a higher level.
#[derive(Debug, Error)]
#[error("{context}: {source}")]
pub struct DeviceError {
    context: String,
    #[source]
    source: BoxError,
}

impl DeviceError {
    pub fn new<E>(context: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            context: context.into(),
            source: Box::new(source),
        }
    }

    pub fn context(&self) -> &str {
        &self.context
    }
}

/// Why a detection was left out of association.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MalformedDetection {
    #[error("non-finite box or score")]
    NonFinite,
    #[error("degenerate box {width}x{height}")]
    Degenerate { width: f32, height: f32 },
    #[error("score {0} outside [0, 1]")]
    ScoreOutOfRange(f32),
    #[error("box lies outside the detector input")]
    OutOfBounds,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("frame has zero width or height")]
    Empty,
    #[error("pixel buffer holds {actual} bytes, expected {expected}")]
    BufferSize { expected: usize, actual: usize },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

/// Frame source/sink and replay file failures.
#[derive(Debug, Error)]
pub enum VideoError {
    #[error("frame read failed: {0}")]
    Read(String),
    #[error("frame write failed: {0}")]
    Write(String),
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("invalid detection file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors surfaced by the pipeline to its caller.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Frame(#[from] FrameError),
}

impl PipelineError {
    /// Whether the failure came from the detector or its device.
    pub fn is_device(&self) -> bool {
        matches!(self, PipelineError::Device(_))
    }
}
