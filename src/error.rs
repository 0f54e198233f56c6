use std::io;
use thiserror::Error;
use tokio_util::codec::LinesCodecError;

/// Startup configuration failures. Always fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io { path: String, source: io::Error },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Coarse classification of a link failure, for callers that only need to
/// decide between log-and-continue and propagate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkErrorKind {
    Timeout,
    Transport,
    Decode,
    Hardware,
}

/// Failures on the robot <-> brain channel and the robot <-> actuator line.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(#[from] io::Error),

    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("hardware error: {0}")]
    Hardware(String),

    #[error("peer closed the connection")]
    Closed,

    #[error("giving up after {failures} consecutive failed rounds")]
    Exhausted { failures: u32 },
}

impl LinkError {
    pub fn kind(&self) -> LinkErrorKind {
        match self {
            LinkError::Timeout => LinkErrorKind::Timeout,
            LinkError::Transport(_) | LinkError::Closed | LinkError::Exhausted { .. } => {
                LinkErrorKind::Transport
            }
            LinkError::Decode(_) | LinkError::Protocol(_) => LinkErrorKind::Decode,
            LinkError::Hardware(_) => LinkErrorKind::Hardware,
        }
    }
}

impl From<LinesCodecError> for LinkError {
    fn from(e: LinesCodecError) -> Self {
        match e {
            LinesCodecError::Io(io) => LinkError::Transport(io),
            LinesCodecError::MaxLineLengthExceeded => {
                LinkError::Protocol("line exceeds maximum length".to_string())
            }
        }
    }
}

/// Event archive failures. Logged by the reactor and otherwise ignored.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("bad bucket format: {0}")]
    Bucket(String),
}

/// Frames that cannot be interpreted as an RGB image.
#[derive(Debug, Error)]
pub enum VisionError {
    #[error("frame is {width}x{height} but carries {actual} bytes (expected {expected})")]
    BadFrame {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}
