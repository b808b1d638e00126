pub mod delay;
pub mod diagnostics;
pub mod error;
pub mod frame;
pub mod ring;
pub mod source;
pub mod watchdog;

pub use delay::{CaptureStatus, VideoDelay, BYPASS_EPSILON_S, MIN_FRAME_SIDE};
pub use diagnostics::CaptureDiagnostics;
pub use error::VideoError;
pub use frame::{Frame, FrameSize};
pub use ring::DelayRingBuffer;
pub use source::{frame_channel, ChannelFrameSource, FrameProducer, FrameSource};
pub use watchdog::CaptureWatchdog;
