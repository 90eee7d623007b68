//! Per-frame detections and their normalized counterparts.

use thiserror::Error;

use crate::geometry::{FrameDims, NormalizedPoint, PixelPoint, Quad};

/// Number of landmarks in the hand model.
pub const HAND_LANDMARK_COUNT: usize = 21;

/// Landmark index of the index-finger tip, used for hover tests.
pub const INDEX_FINGER_TIP: usize = Landmark::IndexFingerTip as usize;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("hand detection needs {expected} landmarks, got {found}")]
    LandmarkCount { expected: usize, found: usize },
}

// ════════════════════════════════════════════════════════════════════════════
// Landmark: the 21-point hand model
// ════════════════════════════════════════════════════════════════════════════

/// Anatomical landmark ids, in model output order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Landmark {
    Wrist             = 0,
    ThumbCmc          = 1,
    ThumbMcp          = 2,
    ThumbIp           = 3,
    ThumbTip          = 4,
    IndexFingerMcp    = 5,
    IndexFingerPip    = 6,
    IndexFingerDip    = 7,
    IndexFingerTip    = 8,
    MiddleFingerMcp   = 9,
    MiddleFingerPip   = 10,
    MiddleFingerDip   = 11,
    MiddleFingerTip   = 12,
    RingFingerMcp     = 13,
    RingFingerPip     = 14,
    RingFingerDip     = 15,
    RingFingerTip     = 16,
    PinkyMcp          = 17,
    PinkyPip          = 18,
    PinkyDip          = 19,
    PinkyTip          = 20,
}

/// Bone segments between landmarks, for skeleton overlays.
pub const HAND_CONNECTIONS: [(usize, usize); 21] = [
    (0, 1), (1, 2), (2, 3), (3, 4),
    (0, 5), (5, 6), (6, 7), (7, 8),
    (5, 9), (9, 10), (10, 11), (11, 12),
    (9, 13), (13, 14), (14, 15), (15, 16),
    (13, 17), (0, 17), (17, 18), (18, 19), (19, 20),
];

// ════════════════════════════════════════════════════════════════════════════
// Hands
// ════════════════════════════════════════════════════════════════════════════

/// One detected hand in frame-pixel space.
#[derive(Clone, Debug, PartialEq)]
pub struct HandDetection {
    pub landmarks: [PixelPoint; HAND_LANDMARK_COUNT],
}

impl HandDetection {
    pub fn new(landmarks: [PixelPoint; HAND_LANDMARK_COUNT]) -> Self {
        HandDetection { landmarks }
    }

    /// Build from a provider's landmark list, which must hold exactly 21 points.
    pub fn from_slice(points: &[PixelPoint]) -> Result<Self, ModelError> {
        let landmarks: [PixelPoint; HAND_LANDMARK_COUNT] = points
            .try_into()
            .map_err(|_| ModelError::LandmarkCount {
                expected: HAND_LANDMARK_COUNT,
                found:    points.len(),
            })?;
        Ok(HandDetection { landmarks })
    }

    pub fn fingertip(&self) -> PixelPoint { self.landmarks[INDEX_FINGER_TIP] }
}

/// A hand rescaled to the unit square of its frame.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedHand {
    pub landmarks: [NormalizedPoint; HAND_LANDMARK_COUNT],
}

impl NormalizedHand {
    pub fn from_detection(hand: &HandDetection, dims: FrameDims) -> Self {
        NormalizedHand { landmarks: hand.landmarks.map(|p| dims.normalize(p)) }
    }

    pub fn fingertip(&self) -> NormalizedPoint { self.landmarks[INDEX_FINGER_TIP] }

    /// Flatten to `[x0, y0, …, x20, y20]` in landmark order.
    pub fn flatten(&self) -> [f32; 2 * HAND_LANDMARK_COUNT] {
        let mut out = [0.0; 2 * HAND_LANDMARK_COUNT];
        for (i, p) in self.landmarks.iter().enumerate() {
            out[2 * i]     = p.x;
            out[2 * i + 1] = p.y;
        }
        out
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Markers
// ════════════════════════════════════════════════════════════════════════════

/// One detected fiducial marker in frame-pixel space.
#[derive(Clone, Debug, PartialEq)]
pub struct MarkerDetection {
    pub marker_id: u32,
    pub corners:   Quad<PixelPoint>,
}

impl MarkerDetection {
    pub fn new(marker_id: u32, corners: [PixelPoint; 4]) -> Self {
        MarkerDetection { marker_id, corners: Quad::new(corners) }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedMarker {
    pub marker_id: u32,
    pub quad:      Quad<NormalizedPoint>,
}

impl NormalizedMarker {
    pub fn from_detection(marker: &MarkerDetection, dims: FrameDims) -> Self {
        NormalizedMarker {
            marker_id: marker.marker_id,
            quad:      dims.normalize_quad(&marker.corners),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// InteractionEvent
// ════════════════════════════════════════════════════════════════════════════

/// The fingertip of hand `hand_index` lies inside marker `marker_id`'s
/// last known quad in the current frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InteractionEvent {
    pub hand_index: usize,
    pub marker_id:  u32,
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
