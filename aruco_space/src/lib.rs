//! # aruco_space
//!
//! The spatial half of the hand/marker pipeline:
//!
//! * [`geometry`]: pixel and unit-square points, quads, [`FrameDims`]
//!   (the coordinate normalizer), and the strict point-in-polygon test.
//! * [`model`]: per-frame hand and marker detections, the 21-point
//!   landmark model, and [`InteractionEvent`].
//! * [`registry`]: [`MarkerRegistry`], the last known quad of every
//!   marker ever seen.
//! * [`interaction`]: [`detect_interactions`], fingertip-over-marker.
//!
//! No I/O happens here.  Capture, detection and transport live in
//! `aruco_hands` and `aruco_osc`.
//!
//! ```rust
//! use aruco_space::{FrameDims, MarkerDetection, MarkerRegistry, NormalizedMarker, PixelPoint};
//!
//! let dims = FrameDims::new(200, 200).unwrap();
//! let seen = MarkerDetection::new(7, [
//!     PixelPoint::new(10.0, 10.0),  PixelPoint::new(110.0, 10.0),
//!     PixelPoint::new(110.0, 110.0), PixelPoint::new(10.0, 110.0),
//! ]);
//! let marker = NormalizedMarker::from_detection(&seen, dims);
//!
//! let mut registry = MarkerRegistry::new();
//! registry.upsert(marker.marker_id, marker.quad);
//! assert!(registry.contains(7));
//! ```

pub mod geometry;
pub mod interaction;
pub mod model;
pub mod registry;

pub use geometry::{point_in_quad, FrameDims, GeometryError, NormalizedPoint, PixelPoint, Quad};
pub use interaction::detect_interactions;
pub use model::{
    HandDetection, InteractionEvent, Landmark, MarkerDetection, ModelError, NormalizedHand,
    NormalizedMarker, HAND_CONNECTIONS, HAND_LANDMARK_COUNT, INDEX_FINGER_TIP,
};
pub use registry::MarkerRegistry;
