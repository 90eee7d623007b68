//! Captured frames and the capture-device seam.
//!
//! [`FrameSource`] is pull-based and blocking: the driver asks for the
//! next frame, the source waits for the device.  `Ok(None)` means the
//! stream ended normally.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("cannot open capture device {device}")]
    Open { device: i32 },
    #[error("frame read failed: {0}")]
    Read(String),
    #[error("frame buffer holds {found} bytes, expected {expected}")]
    BadBuffer { expected: usize, found: usize },
}

// ════════════════════════════════════════════════════════════════════════════
// Frame
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    /// Interleaved 8-bit blue, green, red.
    Bgr8,
}

impl PixelFormat {
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Bgr8 => 3,
        }
    }
}

/// One image from the capture device, row-major, tightly packed.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    width:  u32,
    height: u32,
    format: PixelFormat,
    data:   Vec<u8>,
}

impl Frame {
    pub fn new(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Result<Self, CaptureError> {
        let expected = width as usize * height as usize * format.channels();
        if data.len() != expected {
            return Err(CaptureError::BadBuffer { expected, found: data.len() });
        }
        Ok(Frame { width, height, format, data })
    }

    /// A BGR frame with every byte set to `value`.
    pub fn filled(width: u32, height: u32, value: u8) -> Self {
        let len = width as usize * height as usize * PixelFormat::Bgr8.channels();
        Frame { width, height, format: PixelFormat::Bgr8, data: vec![value; len] }
    }

    pub fn width(&self)  -> u32 { self.width }
    pub fn height(&self) -> u32 { self.height }
    pub fn format(&self) -> PixelFormat { self.format }
    pub fn data(&self)   -> &[u8] { &self.data }

    /// The photographic negative: every byte becomes `255 - byte`.
    ///
    /// Lets the marker detector find light-on-dark markers.
    pub fn inverted(&self) -> Frame {
        Frame {
            data: self.data.iter().map(|b| !b).collect(),
            ..*self
        }
    }

    /// BGR triple at `(x, y)`, or `None` outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * self.format.channels();
        Some([self.data[i], self.data[i + 1], self.data[i + 2]])
    }
}

// ════════════════════════════════════════════════════════════════════════════
// FrameSource trait
// ════════════════════════════════════════════════════════════════════════════

/// A capture device, opened by the implementor's constructor.
pub trait FrameSource {
    /// Block until the next frame is available.
    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError>;

    /// Give the device back.  Must tolerate being called more than once.
    fn release(&mut self);
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError> { (**self).next_frame() }
    fn release(&mut self) { (**self).release() }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_checks_buffer_length() {
        assert!(Frame::new(2, 2, PixelFormat::Bgr8, vec![0; 12]).is_ok());
        assert!(matches!(
            Frame::new(2, 2, PixelFormat::Bgr8, vec![0; 11]),
            Err(CaptureError::BadBuffer { expected: 12, found: 11 })
        ));
    }

    #[test]
    fn inverted_flips_every_byte() {
        let frame = Frame::new(2, 1, PixelFormat::Bgr8, vec![0, 1, 127, 128, 254, 255]).unwrap();
        let neg = frame.inverted();
        assert_eq!(neg.data(), &[255, 254, 128, 127, 1, 0]);
        assert_eq!((neg.width(), neg.height()), (2, 1));
        assert_eq!(neg.inverted(), frame);
    }

    #[test]
    fn inverted_leaves_the_original_alone() {
        let frame = Frame::filled(4, 4, 10);
        let _ = frame.inverted();
        assert!(frame.data().iter().all(|&b| b == 10));
    }

    #[test]
    fn pixel_lookup_is_row_major() {
        let data: Vec<u8> = (0..18).collect();
        let frame = Frame::new(3, 2, PixelFormat::Bgr8, data).unwrap();
        assert_eq!(frame.pixel(0, 0), Some([0, 1, 2]));
        assert_eq!(frame.pixel(2, 0), Some([6, 7, 8]));
        assert_eq!(frame.pixel(0, 1), Some([9, 10, 11]));
        assert_eq!(frame.pixel(3, 0), None);
    }
}
