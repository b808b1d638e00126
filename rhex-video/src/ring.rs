use crate::error::VideoError;
use crate::frame::{Frame, FrameSize};

/// Fixed-capacity history of captured frames.
///
/// Slots are allocated once and overwritten in place; `write_head` is the slot
/// the next `tick` writes, so the newest frame lives at `write_head - 1`.
pub struct DelayRingBuffer {
    slots: Vec<Frame>,
    write_head: usize,
    /// Ticks since creation or the last reset, saturating
    written: u64,
    nominal_fps: u32,
    max_delay_s: f32,
}

impl DelayRingBuffer {
    pub fn new(size: FrameSize, nominal_fps: u32, max_delay_s: f32) -> Result<Self, VideoError> {
        if size.width == 0 || size.height == 0 {
            return Err(VideoError::FrameSizeUnknown {
                actual: size,
                min: 1,
            });
        }
        if nominal_fps == 0 {
            return Err(VideoError::InvalidFrameRate);
        }
        if !max_delay_s.is_finite() || max_delay_s < 0.0 {
            return Err(VideoError::InvalidMaxDelay(max_delay_s));
        }

        let capacity = Self::capacity_for(nominal_fps, max_delay_s);
        let slots = (0..capacity).map(|_| Frame::new(size)).collect();

        Ok(Self {
            slots,
            write_head: 0,
            written: 0,
            nominal_fps,
            max_delay_s,
        })
    }

    /// `ceil(max_delay * fps)` frames plus one second of headroom.
    pub fn capacity_for(nominal_fps: u32, max_delay_s: f32) -> usize {
        let fps = nominal_fps as f64;
        (max_delay_s as f64 * fps).ceil() as usize + nominal_fps as usize
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn write_head(&self) -> usize {
        self.write_head
    }

    pub fn nominal_fps(&self) -> u32 {
        self.nominal_fps
    }

    pub fn max_delay_s(&self) -> f32 {
        self.max_delay_s
    }

    pub fn frame_size(&self) -> FrameSize {
        self.slots[0].size()
    }

    /// Frames currently readable
    pub fn history_len(&self) -> usize {
        (self.written.min(self.capacity() as u64)) as usize
    }

    /// Writes `frame` into the slot under the head and advances it.
    pub fn tick(&mut self, frame: &Frame) -> Result<(), VideoError> {
        let capacity = self.capacity();
        self.slots[self.write_head].copy_from(frame)?;
        self.write_head = (self.write_head + 1) % capacity;
        self.written = self.written.saturating_add(1);
        Ok(())
    }

    /// Delay in whole frames, `round(delay * fps)` clamped to `[0, capacity - 1]`.
    pub fn frames_back(&self, delay_s: f32) -> usize {
        let raw = (delay_s as f64 * self.nominal_fps as f64).round();
        if raw.is_nan() || raw <= 0.0 {
            return 0;
        }
        (raw as usize).min(self.capacity() - 1)
    }

    /// Frame captured `frames_back(delay_s)` ticks ago, or the oldest frame
    /// still held when less history exists. `None` before the first tick.
    pub fn read(&self, delay_s: f32) -> Option<&Frame> {
        let available = self.history_len();
        if available == 0 {
            return None;
        }
        let back = self.frames_back(delay_s).min(available - 1);
        let capacity = self.capacity();
        let index = (self.write_head + capacity - 1 - back) % capacity;
        Some(&self.slots[index])
    }

    /// Forgets all history without touching the slot allocations.
    pub fn reset(&mut self) {
        self.write_head = 0;
        self.written = 0;
    }
}

impl std::fmt::Debug for DelayRingBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelayRingBuffer")
            .field("capacity", &self.capacity())
            .field("write_head", &self.write_head)
            .field("written", &self.written)
            .field("nominal_fps", &self.nominal_fps)
            .finish()
    }
}
