use crate::error::VideoError;
use bytemuck::{cast_slice, cast_slice_mut};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// RGBA8 byte count
    pub fn byte_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }

    pub fn min_side(&self) -> u32 {
        self.width.min(self.height)
    }
}

impl std::fmt::Display for FrameSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}×{}", self.width, self.height)
    }
}

/// RGBA8 pixel buffer tagged with its capture sequence number.
#[derive(Clone, PartialEq)]
pub struct Frame {
    size: FrameSize,
    sequence: u64,
    data: Vec<u8>,
}

impl Frame {
    /// Transparent black frame
    pub fn new(size: FrameSize) -> Self {
        Self {
            size,
            sequence: 0,
            data: vec![0; size.byte_len()],
        }
    }

    pub fn from_rgba(size: FrameSize, sequence: u64, data: Vec<u8>) -> Result<Self, VideoError> {
        if data.len() != size.byte_len() {
            return Err(VideoError::BufferLength {
                expected: size.byte_len(),
                actual: data.len(),
            });
        }
        Ok(Self {
            size,
            sequence,
            data,
        })
    }

    pub fn size(&self) -> FrameSize {
        self.size
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn set_sequence(&mut self, sequence: u64) {
        self.sequence = sequence;
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn pixels(&self) -> &[[u8; 4]] {
        cast_slice(&self.data)
    }

    pub fn pixels_mut(&mut self) -> &mut [[u8; 4]] {
        cast_slice_mut(&mut self.data)
    }

    pub fn fill(&mut self, rgba: [u8; 4]) {
        self.pixels_mut().fill(rgba);
    }

    /// Overwrites this frame in place; sizes must already match.
    pub fn copy_from(&mut self, other: &Frame) -> Result<(), VideoError> {
        if self.size != other.size {
            return Err(VideoError::SizeMismatch {
                expected: self.size,
                actual: other.size,
            });
        }
        self.data.copy_from_slice(&other.data);
        self.sequence = other.sequence;
        Ok(())
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("size", &self.size)
            .field("sequence", &self.sequence)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_view_covers_every_pixel() {
        let mut f = Frame::new(FrameSize::new(4, 2));
        assert_eq!(f.pixels().len(), 8);
        f.fill([1, 2, 3, 255]);
        assert_eq!(&f.data()[4..8], &[1, 2, 3, 255]);
    }

    #[test]
    fn rejects_short_buffer() {
        let err = Frame::from_rgba(FrameSize::new(2, 2), 0, vec![0; 15]).unwrap_err();
        assert_eq!(
            err,
            VideoError::BufferLength {
                expected: 16,
                actual: 15
            }
        );
    }

    #[test]
    fn copy_keeps_allocation_and_takes_sequence() {
        let size = FrameSize::new(2, 2);
        let mut dst = Frame::new(size);
        let ptr = dst.data().as_ptr();
        let mut src = Frame::new(size);
        src.fill([9, 9, 9, 9]);
        src.set_sequence(41);
        dst.copy_from(&src).unwrap();
        assert_eq!(dst.sequence(), 41);
        assert_eq!(dst.data().as_ptr(), ptr);
        assert_eq!(dst.pixels()[3], [9, 9, 9, 9]);
    }

    #[test]
    fn copy_between_sizes_fails() {
        let mut dst = Frame::new(FrameSize::new(2, 2));
        let src = Frame::new(FrameSize::new(3, 2));
        assert!(matches!(
            dst.copy_from(&src),
            Err(VideoError::SizeMismatch { .. })
        ));
    }
}
