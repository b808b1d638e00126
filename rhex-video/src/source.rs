use crate::error::VideoError;
use crate::frame::{Frame, FrameSize};
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};

/// Polled once per tick by the host loop
pub trait FrameSource {
    /// Moves to the next captured frame; false when nothing new arrived.
    fn poll(&mut self) -> bool;
    fn latest(&self) -> Option<&Frame>;
}

/// Creates a bounded capture channel. The producer half lives on the
/// capture thread; frames the consumer is done with flow back for reuse.
pub fn frame_channel(depth: usize) -> (FrameProducer, ChannelFrameSource) {
    let (frame_tx, frame_rx) = bounded(depth.max(1));
    // every in-flight frame plus the consumer's current one can be returned
    let (recycle_tx, recycle_rx) = bounded(depth.max(1) + 2);
    (
        FrameProducer {
            frames: frame_tx,
            recycled: recycle_rx,
        },
        ChannelFrameSource {
            frames: frame_rx,
            recycle: recycle_tx,
            latest: None,
            received: 0,
            closed: false,
        },
    )
}

pub struct FrameProducer {
    frames: Sender<Frame>,
    recycled: Receiver<Frame>,
}

impl FrameProducer {
    /// A frame buffer to draw into, reused when one of the right size came back.
    pub fn buffer(&self, size: FrameSize) -> Frame {
        while let Ok(frame) = self.recycled.try_recv() {
            if frame.size() == size {
                return frame;
            }
        }
        Frame::new(size)
    }

    /// Blocks while the consumer is `depth` frames behind.
    pub fn send(&self, frame: Frame) -> Result<(), VideoError> {
        self.frames.send(frame).map_err(|_| VideoError::SourceClosed)
    }
}

pub struct ChannelFrameSource {
    frames: Receiver<Frame>,
    recycle: Sender<Frame>,
    latest: Option<Frame>,
    received: u64,
    closed: bool,
}

impl ChannelFrameSource {
    pub fn received(&self) -> u64 {
        self.received
    }

    /// True once the producer hung up and every queued frame was polled.
    pub fn is_disconnected(&self) -> bool {
        self.closed
    }
}

impl FrameSource for ChannelFrameSource {
    fn poll(&mut self) -> bool {
        match self.frames.try_recv() {
            Ok(frame) => {
                if let Some(old) = self.latest.replace(frame) {
                    // producer gone or recycle queue full: just drop it
                    let _ = self.recycle.try_send(old);
                }
                self.received += 1;
                true
            }
            Err(TryRecvError::Empty) => false,
            Err(TryRecvError::Disconnected) => {
                self.closed = true;
                false
            }
        }
    }

    fn latest(&self) -> Option<&Frame> {
        self.latest.as_ref()
    }
}
