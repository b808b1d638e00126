use crate::delay::{CaptureStatus, VideoDelay};
use rhex_timing::Timer;
use std::time::Duration;

/// Bounded wait for the capture device to report a usable frame size.
pub struct CaptureWatchdog<T: Timer<Timestamp = u64>> {
    timer: T,
    started: u64,
    timeout: Duration,
}

impl<T: Timer<Timestamp = u64>> CaptureWatchdog<T> {
    pub fn new(timer: T, timeout: Duration) -> Self {
        let started = timer.now();
        Self {
            timer,
            started,
            timeout,
        }
    }

    /// Marks the video unavailable once the wait has expired.
    pub fn check(&self, video: &mut VideoDelay) -> CaptureStatus {
        let status = video.status();
        if status == CaptureStatus::Waiting && self.timer.elapsed(self.started) >= self.timeout {
            log::error!(
                "no usable camera frame after {:.1} s; continuing without video",
                self.timeout.as_secs_f32()
            );
            video.mark_unavailable();
            return CaptureStatus::Unavailable;
        }
        status
    }
}
