//! Pixel and unit-square coordinates, quadrilaterals, and the strict
//! point-in-polygon test used for hover detection.

use thiserror::Error;

// ════════════════════════════════════════════════════════════════════════════
// Errors
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GeometryError {
    #[error("frame has zero area ({width}x{height}); cannot normalize against it")]
    ZeroSizedFrame { width: u32, height: u32 },
}

// ════════════════════════════════════════════════════════════════════════════
// Points
// ════════════════════════════════════════════════════════════════════════════

/// A point in frame-pixel space, origin top-left, `y` growing downward.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PixelPoint {
    pub x: f32,
    pub y: f32,
}

impl PixelPoint {
    pub const fn new(x: f32, y: f32) -> Self { PixelPoint { x, y } }
}

/// A point rescaled to the `[0,1]×[0,1]` unit square of one frame.
///
/// Only meaningful next to other points produced from the same
/// [`FrameDims`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NormalizedPoint {
    pub x: f32,
    pub y: f32,
}

impl NormalizedPoint {
    pub const fn new(x: f32, y: f32) -> Self { NormalizedPoint { x, y } }
}

// ════════════════════════════════════════════════════════════════════════════
// Quad: four ordered corners
// ════════════════════════════════════════════════════════════════════════════

/// Four corners in the order the detector returned them.
///
/// Winding is not guaranteed to be consistent between detections.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quad<P> {
    pub corners: [P; 4],
}

impl<P: Copy> Quad<P> {
    pub const fn new(corners: [P; 4]) -> Self { Quad { corners } }

    /// Apply `f` to every corner, preserving order.
    pub fn map<Q>(&self, mut f: impl FnMut(P) -> Q) -> Quad<Q> {
        let [a, b, c, d] = self.corners;
        Quad { corners: [f(a), f(b), f(c), f(d)] }
    }

    /// Consecutive corner pairs `(0,1) (1,2) (2,3) (3,0)`.
    pub fn edges(&self) -> impl Iterator<Item = (P, P)> + '_ {
        (0..4).map(move |i| (self.corners[i], self.corners[(i + 1) % 4]))
    }
}

impl Quad<NormalizedPoint> {
    /// Flatten to `[x0, y0, x1, y1, x2, y2, x3, y3]`.
    pub fn flatten(&self) -> [f32; 8] {
        let mut out = [0.0; 8];
        for (i, p) in self.corners.iter().enumerate() {
            out[2 * i]     = p.x;
            out[2 * i + 1] = p.y;
        }
        out
    }
}

// ════════════════════════════════════════════════════════════════════════════
// FrameDims: pixel ⇄ unit square
// ════════════════════════════════════════════════════════════════════════════

/// Validated frame dimensions for one pipeline iteration.
///
/// Built once from the current frame and passed to every normalization
/// in that iteration, so the normalizer and all emitters agree on the
/// scale.  Both sides are guaranteed non-zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameDims {
    width:  u32,
    height: u32,
}

impl FrameDims {
    pub fn new(width: u32, height: u32) -> Result<Self, GeometryError> {
        if width == 0 || height == 0 {
            return Err(GeometryError::ZeroSizedFrame { width, height });
        }
        Ok(FrameDims { width, height })
    }

    pub fn width(&self)  -> u32 { self.width }
    pub fn height(&self) -> u32 { self.height }

    /// `x / width`, `y / height`.  No rounding, no clamping.
    pub fn normalize(&self, p: PixelPoint) -> NormalizedPoint {
        NormalizedPoint {
            x: p.x / self.width as f32,
            y: p.y / self.height as f32,
        }
    }

    /// Inverse of [`normalize`](Self::normalize).
    pub fn denormalize(&self, p: NormalizedPoint) -> PixelPoint {
        PixelPoint {
            x: p.x * self.width as f32,
            y: p.y * self.height as f32,
        }
    }

    pub fn normalize_quad(&self, quad: &Quad<PixelPoint>) -> Quad<NormalizedPoint> {
        quad.map(|p| self.normalize(p))
    }

    pub fn denormalize_quad(&self, quad: &Quad<NormalizedPoint>) -> Quad<PixelPoint> {
        quad.map(|p| self.denormalize(p))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Point-in-polygon
// ════════════════════════════════════════════════════════════════════════════

/// Squared distance below which a point counts as lying on an edge: points
/// within 1e-6 of an edge, in unit-square coordinates.
const EDGE_EPS: f64 = 1e-12;

/// True when `p` lies strictly inside the closed polygon `quad`.
///
/// The quad is treated as a simple polygon that need not be convex.
/// Points on an edge or a corner are outside, and so is anything closer
/// than 1e-6 to an edge, even on its inner side.  On a 4K frame that is
/// well under a hundredth of a pixel.
pub fn point_in_quad(p: NormalizedPoint, quad: &Quad<NormalizedPoint>) -> bool {
    let (px, py) = (p.x as f64, p.y as f64);

    if quad.edges().any(|(a, b)| on_segment(px, py, a, b)) {
        return false;
    }

    // Crossing-number test with a ray toward +x.
    let mut inside = false;
    for (a, b) in quad.edges() {
        let (ax, ay) = (a.x as f64, a.y as f64);
        let (bx, by) = (b.x as f64, b.y as f64);
        if (ay > py) != (by > py) {
            let x_cross = ax + (py - ay) * (bx - ax) / (by - ay);
            if px < x_cross {
                inside = !inside;
            }
        }
    }
    inside
}

fn on_segment(px: f64, py: f64, a: NormalizedPoint, b: NormalizedPoint) -> bool {
    let (ax, ay) = (a.x as f64, a.y as f64);
    let (bx, by) = (b.x as f64, b.y as f64);
    let (dx, dy) = (bx - ax, by - ay);
    let cross = (px - ax) * dy - (py - ay) * dx;
    let len2  = dx * dx + dy * dy;
    if len2 <= EDGE_EPS {
        // Degenerate edge: a single corner.
        return (px - ax).powi(2) + (py - ay).powi(2) <= EDGE_EPS;
    }
    if cross * cross > EDGE_EPS * len2 {
        return false;
    }
    let t = ((px - ax) * dx + (py - ay) * dy) / len2;
    (0.0..=1.0).contains(&t)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
