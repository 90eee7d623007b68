//! OpenCV capture device (`camera` feature).

use opencv::core::{self, Mat};
use opencv::prelude::*;
use opencv::videoio::{self, VideoCapture};
use tracing::{debug, info, warn};

use crate::frame::{CaptureError, Frame, FrameSource, PixelFormat};

/// A local camera opened by index.
pub struct CameraSource {
    cap:      VideoCapture,
    device:   i32,
    scratch:  Mat,
    frames:   u64,
    released: bool,
}

impl CameraSource {
    /// Open device `device`, trying V4L first and then whatever OpenCV picks.
    pub fn open(device: i32) -> Result<Self, CaptureError> {
        for backend in [videoio::CAP_V4L, videoio::CAP_ANY] {
            match VideoCapture::new(device, backend) {
                Ok(cap) if cap.is_opened().unwrap_or(false) => {
                    info!(device, backend, "capture device opened");
                    return Ok(CameraSource {
                        cap,
                        device,
                        scratch:  Mat::default(),
                        frames:   0,
                        released: false,
                    });
                }
                Ok(_)    => debug!(device, backend, "backend could not open device"),
                Err(err) => debug!(device, backend, "backend failed: {}", err),
            }
        }
        Err(CaptureError::Open { device })
    }
}

impl FrameSource for CameraSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        if self.released {
            return Ok(None);
        }
        let got = self
            .cap
            .read(&mut self.scratch)
            .map_err(|e| CaptureError::Read(e.to_string()))?;
        if !got || self.scratch.empty() {
            return Ok(None);
        }
        self.frames += 1;
        mat_to_frame(&self.scratch).map(Some)
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(e) = self.cap.release() {
            warn!(device = self.device, "releasing capture device failed: {}", e);
        }
        info!(device = self.device, frames = self.frames, "capture device released");
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        self.release();
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Mat ⇄ Frame
// ════════════════════════════════════════════════════════════════════════════

/// Copy an 8-bit three-channel BGR `Mat` into a [`Frame`].
pub(crate) fn mat_to_frame(mat: &Mat) -> Result<Frame, CaptureError> {
    if mat.typ() != core::CV_8UC3 {
        return Err(CaptureError::Read(format!(
            "expected an 8-bit BGR image, got OpenCV type {}",
            mat.typ()
        )));
    }
    let size = mat.size().map_err(|e| CaptureError::Read(e.to_string()))?;
    let data = if mat.is_continuous() {
        mat.data_bytes().map_err(|e| CaptureError::Read(e.to_string()))?.to_vec()
    } else {
        mat.try_clone()
            .and_then(|m| m.data_bytes().map(<[u8]>::to_vec))
            .map_err(|e| CaptureError::Read(e.to_string()))?
    };
    Frame::new(size.width.max(0) as u32, size.height.max(0) as u32, PixelFormat::Bgr8, data)
}

/// An owned BGR `Mat` holding a copy of `frame`.
pub(crate) fn frame_to_mat(frame: &Frame) -> opencv::Result<Mat> {
    let flat = Mat::from_slice(frame.data())?;
    let shaped = flat.reshape(frame.format().channels() as i32, frame.height() as i32)?;
    shaped.try_clone()
}
