use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Trait for high-precision timers
pub trait Timer: Clone + Send + Sync {
    type Timestamp: Copy + Clone + Send + Sync;
    fn now(&self) -> Self::Timestamp;
    fn elapsed(&self, ts: Self::Timestamp) -> Duration;
    fn sleep(&self, d: Duration);
    fn record_frame(&mut self, d: Duration);
    fn calibration_stats(&self) -> CalibrationStats;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalibrationStats {
    pub average_frame_time_ns: f64,
    pub jitter_ns: f64,
    pub min_frame_time_ns: f64,
    pub max_frame_time_ns: f64,
    pub effective_fps: f64,
    pub samples: usize,
}

impl CalibrationStats {
    pub fn from_samples<'a>(samples: impl IntoIterator<Item = &'a Duration>) -> Self {
        let times: Vec<f64> = samples
            .into_iter()
            .map(|d| d.as_nanos() as f64)
            .collect();
        if times.is_empty() {
            return Self::default();
        }
        let n = times.len() as f64;
        let avg = times.iter().sum::<f64>() / n;
        let var = times.iter().map(|x| (x - avg).powi(2)).sum::<f64>() / n;
        let min = times.iter().copied().fold(f64::INFINITY, f64::min);
        let max = times.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        CalibrationStats {
            average_frame_time_ns: avg,
            jitter_ns: var.sqrt(),
            min_frame_time_ns: min,
            max_frame_time_ns: max,
            effective_fps: if avg > 0.0 { 1e9 / avg } else { 0.0 },
            samples: times.len(),
        }
    }
}

/// Bounded history of frame intervals, oldest dropped first.
#[derive(Debug, Clone)]
pub(crate) struct FrameHistory {
    times: VecDeque<Duration>,
    max_samples: usize,
}

impl FrameHistory {
    pub(crate) fn new(max_samples: usize) -> Self {
        Self {
            times: VecDeque::with_capacity(max_samples),
            max_samples,
        }
    }

    pub(crate) fn push(&mut self, d: Duration) {
        if self.times.len() >= self.max_samples {
            self.times.pop_front();
        }
        self.times.push_back(d);
    }

    pub(crate) fn stats(&self) -> CalibrationStats {
        CalibrationStats::from_samples(&self.times)
    }
}

#[derive(Debug, Clone)]
pub struct HighPrecisionTimer {
    pub start: Instant,
    history: FrameHistory,
}

impl Timer for HighPrecisionTimer {
    type Timestamp = u64;
    fn now(&self) -> u64 {
        self.start.elapsed().as_nanos() as u64
    }
    fn elapsed(&self, ts: u64) -> Duration {
        Duration::from_nanos(self.now().saturating_sub(ts))
    }
    fn sleep(&self, d: Duration) {
        self.high_precision_sleep(d)
    }
    fn record_frame(&mut self, d: Duration) {
        self.history.push(d);
    }
    fn calibration_stats(&self) -> CalibrationStats {
        self.history.stats()
    }
}

impl HighPrecisionTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            history: FrameHistory::new(1000),
        }
    }

    pub fn high_precision_sleep(&self, duration: Duration) {
        #[cfg(target_os = "linux")]
        self.linux_sleep(duration);
        #[cfg(target_os = "macos")]
        self.macos_sleep(duration);
        #[cfg(not(any(target_os = "linux", target_os = "macos")))]
        std::thread::sleep(duration);
    }

    #[cfg(target_os = "linux")]
    fn linux_sleep(&self, duration: Duration) {
        use libc::{clock_nanosleep, timespec, CLOCK_MONOTONIC, EINTR};

        let mut req = timespec {
            tv_sec: duration.as_secs() as libc::time_t,
            tv_nsec: duration.subsec_nanos() as libc::c_long,
        };
        let mut rem = timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };

        loop {
            let rc = unsafe { clock_nanosleep(CLOCK_MONOTONIC, 0, &req, &mut rem) };
            match rc {
                0 => return,
                // interrupted by a signal: sleep only what is left
                EINTR => req = rem,
                _ => {
                    log::debug!("clock_nanosleep failed ({rc}), falling back to thread::sleep");
                    let left = Duration::new(req.tv_sec as u64, req.tv_nsec as u32);
                    std::thread::sleep(left);
                    return;
                }
            }
        }
    }

    #[cfg(target_os = "macos")]
    fn macos_sleep(&self, duration: Duration) {
        use mach2::mach_time::{mach_absolute_time, mach_timebase_info, mach_timebase_info_data_t};

        if duration.as_nanos() < 100_000 {
            unsafe {
                let start = mach_absolute_time();
                let mut timebase = mach_timebase_info_data_t { numer: 0, denom: 0 };
                mach_timebase_info(&mut timebase);

                let target_ticks =
                    duration.as_nanos() as u64 * timebase.denom as u64 / timebase.numer as u64;

                while mach_absolute_time() - start < target_ticks {
                    std::hint::spin_loop();
                }
            }
        } else {
            std::thread::sleep(duration);
        }
    }
}

impl Default for HighPrecisionTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_of_steady_intervals() {
        let samples = vec![Duration::from_millis(33); 10];
        let stats = CalibrationStats::from_samples(&samples);
        assert_eq!(stats.samples, 10);
        assert!(stats.jitter_ns.abs() < 1e-6);
        assert!((stats.effective_fps - 30.303).abs() < 0.01);
    }

    #[test]
    fn history_drops_oldest() {
        let mut h = FrameHistory::new(2);
        h.push(Duration::from_millis(10));
        h.push(Duration::from_millis(20));
        h.push(Duration::from_millis(30));
        let stats = h.stats();
        assert_eq!(stats.samples, 2);
        assert_eq!(stats.min_frame_time_ns, 20_000_000.0);
    }

    #[test]
    fn empty_stats_are_zero() {
        let t = HighPrecisionTimer::new();
        assert_eq!(t.calibration_stats(), CalibrationStats::default());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn interrupted_sleep_only_finishes_the_remainder() {
        extern "C" fn ignore(_: libc::c_int) {}
        unsafe {
            libc::signal(libc::SIGUSR1, ignore as libc::sighandler_t);
        }

        let t = HighPrecisionTimer::new();
        let (tx, rx) = std::sync::mpsc::channel();
        let sleeper = std::thread::spawn(move || {
            tx.send(unsafe { libc::pthread_self() }).unwrap();
            let start = t.now();
            t.sleep(Duration::from_millis(400));
            Duration::from_nanos(t.now() - start)
        });

        let thread = rx.recv().unwrap();
        std::thread::sleep(Duration::from_millis(200));
        unsafe {
            libc::pthread_kill(thread, libc::SIGUSR1);
        }
        let slept = sleeper.join().unwrap();
        assert!(slept >= Duration::from_millis(400));
        assert!(slept < Duration::from_millis(550), "slept {slept:?}");
    }

    #[test]
    fn clock_is_monotonic() {
        let t = HighPrecisionTimer::new();
        let a = t.now();
        t.sleep(Duration::from_millis(2));
        assert!(t.now() >= a + 1_000_000);
    }
}
