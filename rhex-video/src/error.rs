use crate::frame::FrameSize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum VideoError {
    #[error("frame size {actual} is below the {min}px minimum; capture has not started yet")]
    FrameSizeUnknown { actual: FrameSize, min: u32 },

    #[error("nominal frame rate must be at least 1 fps")]
    InvalidFrameRate,

    #[error("maximum delay must be a finite, non-negative number of seconds (got {0})")]
    InvalidMaxDelay(f32),

    #[error("frame is {actual}, buffer slots are {expected}")]
    SizeMismatch { expected: FrameSize, actual: FrameSize },

    #[error("pixel data holds {actual} bytes, {expected} expected")]
    BufferLength { expected: usize, actual: usize },

    #[error("frame consumer has gone away")]
    SourceClosed,
}
