use rhex_timing::{CalibrationStats, Timer};

/// Measures the real capture rate from frame arrival times.
pub struct CaptureDiagnostics<T: Timer<Timestamp = u64>> {
    timer: T,
    nominal_fps: u32,
    last_arrival: Option<u64>,
    frames: u64,
    rate_warned: bool,
}

impl<T: Timer<Timestamp = u64>> CaptureDiagnostics<T> {
    /// Relative deviation from the nominal rate that triggers a warning.
    pub const RATE_TOLERANCE: f64 = 0.10;

    pub fn new(timer: T, nominal_fps: u32) -> Self {
        Self {
            timer,
            nominal_fps,
            last_arrival: None,
            frames: 0,
            rate_warned: false,
        }
    }

    pub fn on_frame(&mut self) {
        let now = self.timer.now();
        if let Some(last) = self.last_arrival {
            let interval = self.timer.elapsed(last);
            self.timer.record_frame(interval);
        }
        self.last_arrival = Some(now);
        self.frames += 1;

        // one check after a few seconds of samples
        if !self.rate_warned && self.frames == self.nominal_fps as u64 * 5 {
            self.check_rate();
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn stats(&self) -> CalibrationStats {
        self.timer.calibration_stats()
    }

    /// True when the measured rate is within tolerance of nominal.
    pub fn check_rate(&mut self) -> bool {
        let stats = self.stats();
        if stats.samples == 0 {
            return true;
        }
        let nominal = self.nominal_fps as f64;
        let deviation = (stats.effective_fps - nominal).abs() / nominal;
        if deviation > Self::RATE_TOLERANCE {
            if !self.rate_warned {
                log::warn!(
                    "capture runs at {:.1} fps, nominal {} fps; delays will be off by {:.0}%",
                    stats.effective_fps,
                    self.nominal_fps,
                    deviation * 100.0
                );
            }
            self.rate_warned = true;
            false
        } else {
            true
        }
    }

    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "{} frames, {:.3} ms/frame, {:.1} fps, jitter {:.3} ms",
            self.frames,
            stats.average_frame_time_ns / 1_000_000.0,
            stats.effective_fps,
            stats.jitter_ns / 1_000_000.0,
        )
    }
}
