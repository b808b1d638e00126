use crate::error::VideoError;
use crate::frame::Frame;
use crate::ring::DelayRingBuffer;

/// Delays at or below this are served straight from the live frame.
pub const BYPASS_EPSILON_S: f32 = 0.02;

/// Smallest frame side accepted as a started camera. Some capture backends
/// report a placeholder size (16×16) until the first real frame arrives.
pub const MIN_FRAME_SIDE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStatus {
    /// No frame of usable size seen yet
    Waiting,
    Ready,
    /// Gave up waiting; video stays dark for the rest of the session
    Unavailable,
}

/// Runtime-switchable delayed view of the capture stream.
///
/// Owns the ring buffer once the capture size is known and decides per frame
/// whether to buffer it or pass it through.
#[derive(Debug)]
pub struct VideoDelay {
    nominal_fps: u32,
    max_delay_s: f32,
    ring: Option<DelayRingBuffer>,
    delay_s: f32,
    preview: bool,
    visible: bool,
    visible_before_preview: bool,
    unavailable: bool,
}

impl VideoDelay {
    pub fn new(nominal_fps: u32, max_delay_s: f32) -> Result<Self, VideoError> {
        if nominal_fps == 0 {
            return Err(VideoError::InvalidFrameRate);
        }
        if !max_delay_s.is_finite() || max_delay_s < 0.0 {
            return Err(VideoError::InvalidMaxDelay(max_delay_s));
        }
        Ok(Self {
            nominal_fps,
            max_delay_s,
            ring: None,
            delay_s: 0.0,
            preview: false,
            visible: false,
            visible_before_preview: false,
            unavailable: false,
        })
    }

    pub fn status(&self) -> CaptureStatus {
        if self.unavailable {
            CaptureStatus::Unavailable
        } else if self.ring.is_some() {
            CaptureStatus::Ready
        } else {
            CaptureStatus::Waiting
        }
    }

    pub fn ring(&self) -> Option<&DelayRingBuffer> {
        self.ring.as_ref()
    }

    /// Requested delay, ignoring the preview override
    pub fn delay_s(&self) -> f32 {
        self.delay_s
    }

    pub fn effective_delay_s(&self) -> f32 {
        if self.preview { 0.0 } else { self.delay_s }
    }

    pub fn is_bypassed(&self) -> bool {
        self.effective_delay_s() <= BYPASS_EPSILON_S
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_preview(&self) -> bool {
        self.preview
    }

    /// Feeds one captured frame, in capture order.
    pub fn on_frame(&mut self, frame: &Frame) -> Result<CaptureStatus, VideoError> {
        if self.unavailable {
            return Ok(CaptureStatus::Unavailable);
        }

        if self.ring.is_none() {
            let size = frame.size();
            if size.min_side() < MIN_FRAME_SIDE {
                log::trace!("capture reports {size}, still waiting");
                return Ok(CaptureStatus::Waiting);
            }
            let ring = DelayRingBuffer::new(size, self.nominal_fps, self.max_delay_s)?;
            log::info!(
                "capture ready at {size}, ring holds {} frames ({:.1} s at {} fps)",
                ring.capacity(),
                ring.capacity() as f32 / self.nominal_fps as f32,
                self.nominal_fps
            );
            self.ring = Some(ring);
        }

        if self.is_bypassed() {
            return Ok(CaptureStatus::Ready);
        }
        if let Some(ring) = &mut self.ring {
            ring.tick(frame)?;
        }
        Ok(CaptureStatus::Ready)
    }

    /// Frame to display this tick; `None` means draw nothing.
    pub fn present<'a>(&'a self, live: &'a Frame) -> Option<&'a Frame> {
        if self.unavailable || !self.visible {
            return None;
        }
        let ring = self.ring.as_ref()?;
        if self.is_bypassed() {
            return Some(live);
        }
        ring.read(self.effective_delay_s())
    }

    /// Clamps to `[0, max_delay_s]`.
    pub fn set_delay(&mut self, delay_s: f32) {
        let was_bypassed = self.is_bypassed();
        self.delay_s = if delay_s.is_nan() {
            0.0
        } else {
            delay_s.clamp(0.0, self.max_delay_s)
        };
        self.on_mode_change(was_bypassed);
    }

    pub fn set_preview(&mut self, on: bool) {
        if on == self.preview {
            return;
        }
        let was_bypassed = self.is_bypassed();
        if on {
            self.visible_before_preview = self.visible;
            self.visible = true;
        } else {
            self.visible = self.visible_before_preview;
        }
        self.preview = on;
        self.on_mode_change(was_bypassed);
    }

    pub fn toggle_preview(&mut self) -> bool {
        self.set_preview(!self.preview);
        self.preview
    }

    pub fn show(&mut self) {
        self.visible = true;
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }

    pub fn mark_unavailable(&mut self) {
        self.unavailable = true;
        self.visible = false;
    }

    /// Frames skipped while bypassing leave a gap in the history, so it is
    /// dropped when buffering resumes.
    fn on_mode_change(&mut self, was_bypassed: bool) {
        if was_bypassed && !self.is_bypassed() {
            if let Some(ring) = &mut self.ring {
                ring.reset();
            }
            log::debug!("leaving bypass, delay {:.3} s", self.effective_delay_s());
        }
    }
}
