//! Simulation backends: no camera, no model, fully deterministic.
//!
//! A grey frame source, one hand whose index fingertip orbits a point, and
//! a ring of markers placed on that orbit.  The fingertip therefore passes
//! over every marker once per revolution, and markers that have dropped
//! out of view still trigger hovers from the registry.

use std::f32::consts::TAU;
use std::thread;
use std::time::{Duration, Instant};

use aruco_space::{HandDetection, MarkerDetection, NormalizedPoint, PixelPoint, HAND_LANDMARK_COUNT};
use tracing::debug;

use crate::frame::{CaptureError, Frame, FrameSource};
use crate::provider::{HandFeatureProvider, MarkerFeatureProvider, ProviderError};

// ════════════════════════════════════════════════════════════════════════════
// SimFrameSource
// ════════════════════════════════════════════════════════════════════════════

pub const SIM_GREY: u8 = 0x80;

/// Uniform grey frames, optionally paced and optionally finite.
pub struct SimFrameSource {
    width:    u32,
    height:   u32,
    limit:    Option<u64>,
    interval: Option<Duration>,
    produced: u64,
    last:     Option<Instant>,
    released: bool,
}

impl SimFrameSource {
    pub fn new(width: u32, height: u32) -> Self {
        SimFrameSource {
            width,
            height,
            limit:    None,
            interval: None,
            produced: 0,
            last:     None,
            released: false,
        }
    }

    /// End the stream after `n` frames.
    pub fn with_limit(mut self, n: u64) -> Self { self.limit = Some(n); self }

    /// Deliver at most one frame per `interval`, like a real camera.
    pub fn with_interval(mut self, interval: Duration) -> Self { self.interval = Some(interval); self }

    pub fn produced(&self) -> u64 { self.produced }
    pub fn is_released(&self) -> bool { self.released }
}

impl FrameSource for SimFrameSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        if self.released || self.limit.is_some_and(|n| self.produced >= n) {
            return Ok(None);
        }
        if let (Some(interval), Some(last)) = (self.interval, self.last) {
            let due = last + interval;
            let now = Instant::now();
            if due > now {
                thread::sleep(due - now);
            }
        }
        self.last = Some(Instant::now());
        self.produced += 1;
        Ok(Some(Frame::filled(self.width, self.height, SIM_GREY)))
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            debug!(frames = self.produced, "simulated capture released");
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Synthetic hand shape
// ════════════════════════════════════════════════════════════════════════════

/// An open right hand, fingers up, in units of hand size with the index
/// fingertip at the origin.  Order follows [`aruco_space::Landmark`].
const HAND_SHAPE: [(f32, f32); HAND_LANDMARK_COUNT] = [
    ( 0.20,  1.15),                                                 // wrist
    (-0.12,  1.02), (-0.25,  0.92), (-0.35,  0.82), (-0.43,  0.72), // thumb
    ( 0.00,  0.55), ( 0.00,  0.35), ( 0.00,  0.17), ( 0.00,  0.00), // index
    ( 0.18,  0.57), ( 0.20,  0.33), ( 0.21,  0.15), ( 0.22, -0.02), // middle
    ( 0.34,  0.62), ( 0.37,  0.42), ( 0.39,  0.26), ( 0.40,  0.12), // ring
    ( 0.48,  0.70), ( 0.53,  0.55), ( 0.56,  0.44), ( 0.58,  0.33), // pinky
];

/// A plausible 21-landmark hand whose index fingertip sits exactly at `tip`.
pub fn synthetic_hand(tip: PixelPoint, size_px: f32) -> HandDetection {
    HandDetection::new(HAND_SHAPE.map(|(dx, dy)| {
        PixelPoint::new(tip.x + dx * size_px, tip.y + dy * size_px)
    }))
}

// ════════════════════════════════════════════════════════════════════════════
// SimHandProvider
// ════════════════════════════════════════════════════════════════════════════

/// One hand whose fingertip circles `centre` once every `period` frames.
#[derive(Clone, Debug)]
pub struct SimHandProvider {
    pub centre: NormalizedPoint,
    pub radius: f32,
    pub period: u64,
    /// Hand size as a fraction of frame height.
    pub size:   f32,
    calls:      u64,
}

impl Default for SimHandProvider {
    fn default() -> Self {
        SimHandProvider {
            centre: NormalizedPoint::new(0.5, 0.4),
            radius: 0.25,
            period: 120,
            size:   0.25,
            calls:  0,
        }
    }
}

impl SimHandProvider {
    pub fn new() -> Self { Self::default() }

    /// Normalized fingertip position on call number `call` (0-based).
    pub fn fingertip_at(&self, call: u64) -> NormalizedPoint {
        let period = self.period.max(1);
        let angle  = TAU * (call % period) as f32 / period as f32;
        NormalizedPoint::new(
            self.centre.x + self.radius * angle.cos(),
            self.centre.y + self.radius * angle.sin(),
        )
    }
}

impl HandFeatureProvider for SimHandProvider {
    fn detect_hands(&mut self, frame: &Frame) -> Result<Vec<HandDetection>, ProviderError> {
        let (w, h) = (frame.width() as f32, frame.height() as f32);
        let tip = self.fingertip_at(self.calls);
        self.calls += 1;
        Ok(vec![synthetic_hand(PixelPoint::new(tip.x * w, tip.y * h), self.size * h)])
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SimMarkerProvider
// ════════════════════════════════════════════════════════════════════════════

/// A square marker described in frame-relative terms.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimMarker {
    pub marker_id: u32,
    pub centre:    NormalizedPoint,
    /// Half the side length, as a fraction of the shorter frame edge.
    pub half_size: f32,
}

impl SimMarker {
    /// Corners clockwise from top-left, as the ArUco detector reports them.
    pub fn corners(&self, width: u32, height: u32) -> [PixelPoint; 4] {
        let (w, h) = (width as f32, height as f32);
        let half = self.half_size * w.min(h);
        let (cx, cy) = (self.centre.x * w, self.centre.y * h);
        [
            PixelPoint::new(cx - half, cy - half),
            PixelPoint::new(cx + half, cy - half),
            PixelPoint::new(cx + half, cy + half),
            PixelPoint::new(cx - half, cy + half),
        ]
    }
}

/// Reports a fixed set of markers, optionally only for the first few frames.
#[derive(Clone, Debug)]
pub struct SimMarkerProvider {
    markers:     Vec<SimMarker>,
    visible_for: Option<u64>,
    calls:       u64,
}

impl SimMarkerProvider {
    pub fn new(markers: Vec<SimMarker>) -> Self {
        SimMarkerProvider { markers, visible_for: None, calls: 0 }
    }

    /// `count` markers evenly spaced on a circle, ids `0..count`.
    /// The first sits at angle zero, where [`SimHandProvider`] starts.
    pub fn ring(centre: NormalizedPoint, radius: f32, count: u32) -> Self {
        let markers = (0..count)
            .map(|i| {
                let angle = TAU * i as f32 / count.max(1) as f32;
                SimMarker {
                    marker_id: i,
                    centre:    NormalizedPoint::new(
                        centre.x + radius * angle.cos(),
                        centre.y + radius * angle.sin(),
                    ),
                    half_size: 0.06,
                }
            })
            .collect();
        Self::new(markers)
    }

    /// The ring that matches a [`SimHandProvider`]'s orbit.
    pub fn for_orbit(hand: &SimHandProvider, count: u32) -> Self {
        Self::ring(hand.centre, hand.radius, count)
    }

    /// Stop reporting after `frames` calls; the markers "leave the view".
    pub fn visible_for(mut self, frames: u64) -> Self { self.visible_for = Some(frames); self }
}

impl MarkerFeatureProvider for SimMarkerProvider {
    fn detect_markers(&mut self, frame: &Frame) -> Result<Vec<MarkerDetection>, ProviderError> {
        let call = self.calls;
        self.calls += 1;
        if self.visible_for.is_some_and(|n| call >= n) {
            return Ok(Vec::new());
        }
        Ok(self
            .markers
            .iter()
            .map(|m| MarkerDetection::new(m.marker_id, m.corners(frame.width(), frame.height())))
            .collect())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use aruco_space::{point_in_quad, FrameDims, NormalizedHand, NormalizedMarker, INDEX_FINGER_TIP};

    #[test]
    fn frame_source_honours_limit() {
        let mut src = SimFrameSource::new(16, 8).with_limit(2);
        let first = src.next_frame().unwrap().unwrap();
        assert_eq!((first.width(), first.height()), (16, 8));
        assert!(first.data().iter().all(|&b| b == SIM_GREY));
        assert!(src.next_frame().unwrap().is_some());
        assert!(src.next_frame().unwrap().is_none());
        assert_eq!(src.produced(), 2);
    }

    #[test]
    fn released_source_ends_the_stream() {
        let mut src = SimFrameSource::new(4, 4);
        src.release();
        src.release();
        assert!(src.is_released());
        assert!(src.next_frame().unwrap().is_none());
    }

    #[test]
    fn pacing_spaces_frames_out() {
        let mut src = SimFrameSource::new(2, 2).with_interval(Duration::from_millis(20));
        let start = Instant::now();
        for _ in 0..3 {
            src.next_frame().unwrap();
        }
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[test]
    fn synthetic_hand_puts_the_tip_where_asked() {
        let hand = synthetic_hand(PixelPoint::new(50.0, 60.0), 40.0);
        assert_eq!(hand.landmarks[INDEX_FINGER_TIP], PixelPoint::new(50.0, 60.0));
        // wrist below the fingertip in image space
        assert!(hand.landmarks[0].y > 60.0);
    }

    #[test]
    fn fingertip_orbit_starts_at_angle_zero_and_wraps() {
        let hand = SimHandProvider::default();
        let p0 = hand.fingertip_at(0);
        assert_relative_eq!(p0.x, 0.75, epsilon = 1e-6);
        assert_relative_eq!(p0.y, 0.40, epsilon = 1e-6);
        let q = hand.fingertip_at(hand.period / 4);
        assert_relative_eq!(q.x, 0.50, epsilon = 1e-5);
        assert_relative_eq!(q.y, 0.65, epsilon = 1e-5);
        assert_eq!(hand.fingertip_at(hand.period), p0);
    }

    #[test]
    fn hand_provider_scales_to_the_frame() {
        let mut hand = SimHandProvider::default();
        let frame = Frame::filled(200, 100, SIM_GREY);
        let got = hand.detect_hands(&frame).unwrap();
        assert_eq!(got.len(), 1);
        let tip = got[0].fingertip();
        assert_relative_eq!(tip.x, 150.0, epsilon = 1e-3);
        assert_relative_eq!(tip.y, 40.0, epsilon = 1e-3);
    }

    #[test]
    fn first_ring_marker_sits_under_the_starting_fingertip() {
        let mut hands   = SimHandProvider::default();
        let mut markers = SimMarkerProvider::for_orbit(&hands, 4);
        let frame = Frame::filled(320, 240, SIM_GREY);
        let dims  = FrameDims::new(320, 240).unwrap();

        let hand   = NormalizedHand::from_detection(&hands.detect_hands(&frame).unwrap()[0], dims);
        let seen   = markers.detect_markers(&frame).unwrap();
        assert_eq!(seen.iter().map(|m| m.marker_id).collect::<Vec<_>>(), vec![0, 1, 2, 3]);

        let first = NormalizedMarker::from_detection(&seen[0], dims);
        assert!(point_in_quad(hand.fingertip(), &first.quad));
        let third = NormalizedMarker::from_detection(&seen[2], dims);
        assert!(!point_in_quad(hand.fingertip(), &third.quad));
    }

    #[test]
    fn markers_disappear_after_their_visibility_window() {
        let mut markers = SimMarkerProvider::ring(NormalizedPoint::new(0.5, 0.5), 0.2, 3).visible_for(1);
        let frame = Frame::filled(10, 10, 0);
        assert_eq!(markers.detect_markers(&frame).unwrap().len(), 3);
        assert!(markers.detect_markers(&frame).unwrap().is_empty());
    }

    #[test]
    fn sim_marker_corners_are_clockwise_from_top_left() {
        let m = SimMarker { marker_id: 1, centre: NormalizedPoint::new(0.5, 0.5), half_size: 0.1 };
        let c = m.corners(100, 200);
        assert_eq!(c[0], PixelPoint::new(40.0, 90.0));
        assert_eq!(c[2], PixelPoint::new(60.0, 110.0));
    }
}
