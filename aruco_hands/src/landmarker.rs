//! MediaPipe hand landmarks through ONNX Runtime (`hands` feature).
//!
//! Expects the `hand_landmark` model exported to ONNX (224×224 RGB input,
//! NHWC, values in `[0,1]`), with outputs:
//!
//! * `Identity`   : `[1, 63]`, 21 × (x, y, z) in input-pixel units
//! * `Identity_1` : `[1, 1]`, hand-presence logit
//!
//! There is no palm detector in front of it: the whole frame is
//! letterboxed into the model input, so at most one hand is reported and
//! it works best when the hand fills a good part of the view.

use std::path::Path;

use aruco_space::{HandDetection, PixelPoint, HAND_LANDMARK_COUNT};
use opencv::core::{self, Mat, Scalar, Size};
use opencv::imgproc;
use opencv::prelude::*;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{Tensor, Value};
use tracing::{info, trace};

use crate::camera::frame_to_mat;
use crate::frame::Frame;
use crate::provider::{HandFeatureProvider, ProviderError};

pub const INPUT_SIZE:           i32  = 224;
pub const PRESENCE_THRESHOLD:   f32  = 0.5;
const LANDMARKS_OUTPUT:         &str = "Identity";
const PRESENCE_OUTPUT:          &str = "Identity_1";

// ════════════════════════════════════════════════════════════════════════════
// Letterbox: frame ⇄ square model input
// ════════════════════════════════════════════════════════════════════════════

/// Centre the frame in a black square, then scale to the model input.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Letterbox {
    pub side: i32,
    pub left: i32,
    pub top:  i32,
}

impl Letterbox {
    pub fn for_frame(width: u32, height: u32) -> Self {
        let (w, h) = (width as i32, height as i32);
        let side = w.max(h);
        Letterbox { side, left: (side - w) / 2, top: (side - h) / 2 }
    }

    /// A point in model-input pixels back in frame pixels.
    pub fn to_frame(&self, u: f32, v: f32) -> PixelPoint {
        let scale = self.side as f32 / INPUT_SIZE as f32;
        PixelPoint::new(u * scale - self.left as f32, v * scale - self.top as f32)
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

// ════════════════════════════════════════════════════════════════════════════
// OrtHandLandmarker
// ════════════════════════════════════════════════════════════════════════════

pub struct OrtHandLandmarker {
    session: Session,
}

impl OrtHandLandmarker {
    pub fn load(model_path: &Path) -> Result<Self, ProviderError> {
        if !model_path.exists() {
            return Err(ProviderError::Setup(format!(
                "hand landmark model not found at {}",
                model_path.display()
            )));
        }
        let model_bytes = std::fs::read(model_path)
            .map_err(|e| ProviderError::Setup(format!("reading {}: {}", model_path.display(), e)))?;

        let session = Session::builder()
            .map_err(|e| ProviderError::Setup(format!("ORT session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| ProviderError::Setup(format!("ORT opt level: {e}")))?
            .commit_from_memory(model_bytes.as_slice())
            .map_err(|e| ProviderError::Setup(format!("ORT load model: {e}")))?;

        info!(model = %model_path.display(), "hand landmark model loaded");
        Ok(OrtHandLandmarker { session })
    }

    fn input_tensor(&self, frame: &Frame, letterbox: &Letterbox) -> Result<Value, ProviderError> {
        let cv = |e: opencv::Error| ProviderError::Inference(format!("preprocess: {e}"));

        let bgr = frame_to_mat(frame).map_err(cv)?;
        let mut square = Mat::default();
        core::copy_make_border(
            &bgr,
            &mut square,
            letterbox.top,
            letterbox.side - frame.height() as i32 - letterbox.top,
            letterbox.left,
            letterbox.side - frame.width() as i32 - letterbox.left,
            core::BORDER_CONSTANT,
            Scalar::all(0.0),
        )
        .map_err(cv)?;

        let mut resized = Mat::default();
        imgproc::resize(
            &square,
            &mut resized,
            Size::new(INPUT_SIZE, INPUT_SIZE),
            0.0,
            0.0,
            imgproc::INTER_LINEAR,
        )
        .map_err(cv)?;

        let mut rgb = Mat::default();
        imgproc::cvt_color(
            &resized,
            &mut rgb,
            imgproc::COLOR_BGR2RGB,
            0,
            core::AlgorithmHint::ALGO_HINT_DEFAULT,
        )
        .map_err(cv)?;

        let nhwc: Vec<f32> = rgb
            .data_bytes()
            .map_err(cv)?
            .iter()
            .map(|&b| b as f32 / 255.0)
            .collect();

        let shape = vec![1usize, INPUT_SIZE as usize, INPUT_SIZE as usize, 3];
        Tensor::from_array((shape, nhwc.into_boxed_slice()))
            .map(Value::from)
            .map_err(|e| ProviderError::Inference(format!("ORT tensor: {e}")))
    }
}

impl HandFeatureProvider for OrtHandLandmarker {
    fn detect_hands(&mut self, frame: &Frame) -> Result<Vec<HandDetection>, ProviderError> {
        let letterbox = Letterbox::for_frame(frame.width(), frame.height());
        let tensor = self.input_tensor(frame, &letterbox)?;

        let outputs = self
            .session
            .run(ort::inputs![tensor])
            .map_err(|e| ProviderError::Inference(format!("ORT run failed: {e}")))?;

        let extract = |name: &str| -> Result<Vec<f32>, ProviderError> {
            let value = outputs
                .get(name)
                .ok_or_else(|| ProviderError::Inference(format!("model has no output {name:?}")))?;
            let (_, data) = value
                .try_extract_tensor::<f32>()
                .map_err(|e| ProviderError::Inference(format!("ORT extract {name}: {e}")))?;
            Ok(data.to_vec())
        };

        let presence = extract(PRESENCE_OUTPUT)?
            .first()
            .copied()
            .map(sigmoid)
            .unwrap_or(0.0);
        trace!(presence, "hand presence");
        if presence < PRESENCE_THRESHOLD {
            return Ok(Vec::new());
        }

        let raw = extract(LANDMARKS_OUTPUT)?;
        if raw.len() < HAND_LANDMARK_COUNT * 3 {
            return Err(ProviderError::Inference(format!(
                "landmark output holds {} values, expected {}",
                raw.len(),
                HAND_LANDMARK_COUNT * 3
            )));
        }
        let points: Vec<PixelPoint> = raw
            .chunks_exact(3)
            .take(HAND_LANDMARK_COUNT)
            .map(|xyz| letterbox.to_frame(xyz[0], xyz[1]))
            .collect();

        Ok(vec![HandDetection::from_slice(&points)?])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn landscape_frames_are_padded_top_and_bottom() {
        let lb = Letterbox::for_frame(640, 480);
        assert_eq!(lb, Letterbox { side: 640, left: 0, top: 80 });
    }

    #[test]
    fn model_corners_map_to_the_padded_square() {
        let lb = Letterbox::for_frame(640, 480);
        let origin = lb.to_frame(0.0, 0.0);
        assert_relative_eq!(origin.x, 0.0);
        assert_relative_eq!(origin.y, -80.0);
        let centre = lb.to_frame(112.0, 112.0);
        assert_relative_eq!(centre.x, 320.0, epsilon = 1e-3);
        assert_relative_eq!(centre.y, 240.0, epsilon = 1e-3);
    }

    #[test]
    fn portrait_frames_are_padded_left_and_right() {
        let lb = Letterbox::for_frame(300, 400);
        assert_eq!((lb.side, lb.left, lb.top), (400, 50, 0));
    }

    #[test]
    fn presence_threshold_sits_at_logit_zero() {
        assert_relative_eq!(sigmoid(0.0), PRESENCE_THRESHOLD);
        assert!(sigmoid(3.0) > 0.9);
    }

    #[test]
    fn missing_model_is_a_setup_error() {
        let err = OrtHandLandmarker::load(Path::new("/nonexistent/hand_landmark.onnx"));
        assert!(matches!(err, Err(ProviderError::Setup(_))));
    }
}
