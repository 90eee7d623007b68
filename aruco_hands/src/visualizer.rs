//! Debug overlay window using `minifb`.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ camera frame                                  │
//! │    ┌──┐ 3          ● landmarks, white skeleton │
//! │    └──┘   ┌──┐ 5   green  detected this frame  │
//! │           └──┘     grey   known, out of view   │
//! │                    yellow fingertip over it    │
//! │ HANDS 1  MARKERS 2  KNOWN 4  HOVER 5           │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Drawing goes into a plain [`Canvas`] so it can be checked without a
//! display; the [`Visualizer`] only owns the window.

use std::collections::BTreeSet;

use aruco_space::{PixelPoint, Quad, HAND_CONNECTIONS, INDEX_FINGER_TIP};
use minifb::{Key, Window, WindowOptions};
use tracing::{info, warn};

use crate::frame::Frame;
use crate::pipeline::{Overlay, Renderer};

const TITLE:         &str = "aruco_hands: hands + ArUco markers (Esc to close)";
const SEEN_COLOR:    u32  = 0xFF00E060;
const KNOWN_COLOR:   u32  = 0xFF808080;
const HOVER_COLOR:   u32  = 0xFFFFD700;
const BONE_COLOR:    u32  = 0xFFF0F0F0;
const JOINT_COLOR:   u32  = 0xFFE03030;
const TIP_COLOR:     u32  = 0xFF30A0FF;
const STATUS_BG:     u32  = 0xFF101820;
const STATUS_FG:     u32  = 0xFFE0E0E0;
const GLYPH_SCALE:   usize = 2;

// ════════════════════════════════════════════════════════════════════════════
// Canvas
// ════════════════════════════════════════════════════════════════════════════

/// An ARGB framebuffer with the few primitives the overlay needs.
pub struct Canvas {
    width:  usize,
    height: usize,
    buf:    Vec<u32>,
}

impl Canvas {
    pub fn new(width: usize, height: usize) -> Self {
        Canvas { width, height, buf: vec![0xFF000000; width * height] }
    }

    pub fn width(&self)  -> usize { self.width }
    pub fn height(&self) -> usize { self.height }
    pub fn buffer(&self) -> &[u32] { &self.buf }

    pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
        (x < self.width && y < self.height).then(|| self.buf[y * self.width + x])
    }

    /// Copy a BGR frame in, resizing the canvas to match.
    pub fn blit_frame(&mut self, frame: &Frame) {
        self.width  = frame.width() as usize;
        self.height = frame.height() as usize;
        self.buf.clear();
        self.buf.extend(frame.data().chunks_exact(3).map(|bgr| {
            0xFF000000 | (bgr[2] as u32) << 16 | (bgr[1] as u32) << 8 | bgr[0] as u32
        }));
    }

    /// Draw everything one iteration produced on top of its frame.
    pub fn draw_overlay(&mut self, overlay: &Overlay<'_>) {
        self.blit_frame(overlay.frame);
        let dims = overlay.dims;

        let hovered: BTreeSet<u32> = overlay.interactions.iter().map(|e| e.marker_id).collect();
        let seen:    BTreeSet<u32> = overlay.markers.iter().map(|m| m.marker_id).collect();

        // ── Markers, from the registry so stale ones show too ─────────────
        for (id, quad) in overlay.registry.snapshot() {
            let color = if hovered.contains(&id) {
                HOVER_COLOR
            } else if seen.contains(&id) {
                SEEN_COLOR
            } else {
                KNOWN_COLOR
            };
            let px = dims.denormalize_quad(quad);
            self.draw_quad(&px, color);
            let label = px.corners[0];
            self.draw_label(&id.to_string(), label.x as isize, label.y as isize - 12, color);
        }

        // ── Hands ─────────────────────────────────────────────────────────
        for hand in overlay.hands {
            for &(a, b) in HAND_CONNECTIONS.iter() {
                let (p0, p1) = (dims.denormalize(hand.landmarks[a]), dims.denormalize(hand.landmarks[b]));
                self.draw_line(p0.x, p0.y, p1.x, p1.y, BONE_COLOR);
            }
            for (i, &p) in hand.landmarks.iter().enumerate() {
                let px = dims.denormalize(p);
                let (r, color) = if i == INDEX_FINGER_TIP { (4, TIP_COLOR) } else { (2, JOINT_COLOR) };
                self.fill_disc(px.x as isize, px.y as isize, r, color);
            }
        }

        // ── Status bar ────────────────────────────────────────────────────
        let bar_h = 5 * GLYPH_SCALE + 8;
        let top   = self.height.saturating_sub(bar_h);
        self.fill_rect(0, top, self.width, bar_h, STATUS_BG);
        let status = format!(
            "HANDS {}  MARKERS {}  KNOWN {}  HOVER {}",
            overlay.hands.len(),
            overlay.markers.len(),
            overlay.registry.len(),
            overlay.interactions.len(),
        );
        self.draw_label(&status, 6, top as isize + 4, STATUS_FG);
    }

    // ── primitives ────────────────────────────────────────────────────────

    fn set_pixel(&mut self, x: isize, y: isize, color: u32) {
        if x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height {
            self.buf[y as usize * self.width + x as usize] = color;
        }
    }

    fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        for row in y..(y + h).min(self.height) {
            for col in x..(x + w).min(self.width) {
                self.buf[row * self.width + col] = color;
            }
        }
    }

    fn fill_disc(&mut self, cx: isize, cy: isize, r: isize, color: u32) {
        for dy in -r..=r {
            for dx in -r..=r {
                if dx * dx + dy * dy <= r * r {
                    self.set_pixel(cx + dx, cy + dy, color);
                }
            }
        }
    }

    /// Bresenham, two pixels thick.
    pub fn draw_line(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, color: u32) {
        let (mut x, mut y) = (x0.round() as isize, y0.round() as isize);
        let (xe, ye) = (x1.round() as isize, y1.round() as isize);
        let dx =  (xe - x).abs();
        let dy = -(ye - y).abs();
        let sx = if x < xe { 1 } else { -1 };
        let sy = if y < ye { 1 } else { -1 };
        let mut err = dx + dy;
        // bounded so a wild coordinate cannot stall the frame
        for _ in 0..=(dx - dy).min(8192) {
            self.set_pixel(x, y, color);
            self.set_pixel(x + 1, y, color);
            if x == xe && y == ye { break; }
            let e2 = 2 * err;
            if e2 >= dy { err += dy; x += sx; }
            if e2 <= dx { err += dx; y += sy; }
        }
    }

    fn draw_quad(&mut self, quad: &Quad<PixelPoint>, color: u32) {
        for (a, b) in quad.edges() {
            self.draw_line(a.x, a.y, b.x, b.y, color);
        }
    }

    fn draw_label(&mut self, text: &str, x: isize, y: isize, color: u32) {
        let mut cx = x;
        for ch in text.chars() {
            for (row, bits) in glyph(ch).iter().enumerate() {
                for col in 0..3 {
                    if bits & (0b100 >> col) == 0 { continue; }
                    for sy in 0..GLYPH_SCALE {
                        for sx in 0..GLYPH_SCALE {
                            self.set_pixel(
                                cx + (col * GLYPH_SCALE + sx) as isize,
                                y + (row * GLYPH_SCALE + sy) as isize,
                                color,
                            );
                        }
                    }
                }
            }
            cx += (4 * GLYPH_SCALE) as isize;
        }
    }
}

/// 3×5 bitmap glyphs, one row per byte, MSB of the low three bits on the left.
/// Only what the overlay prints: digits and the status-bar capitals.
fn glyph(c: char) -> [u8; 5] {
    match c.to_ascii_uppercase() {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b011, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b010, 0b010, 0b010],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'A' => [0b010, 0b101, 0b111, 0b101, 0b101],
        'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'E' => [0b111, 0b100, 0b110, 0b100, 0b111],
        'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'K' => [0b101, 0b110, 0b100, 0b110, 0b101],
        'M' => [0b101, 0b111, 0b111, 0b101, 0b101],
        'N' => [0b110, 0b101, 0b101, 0b101, 0b101],
        'O' => [0b010, 0b101, 0b101, 0b101, 0b010],
        'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        'S' => [0b011, 0b100, 0b010, 0b001, 0b110],
        'V' => [0b101, 0b101, 0b101, 0b101, 0b010],
        'W' => [0b101, 0b101, 0b111, 0b111, 0b101],
        ' ' => [0; 5],
        _   => [0b000, 0b000, 0b010, 0b000, 0b000],
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Visualizer
// ════════════════════════════════════════════════════════════════════════════

/// Owns the window.  Opens lazily on the first frame, sized to it, and
/// reopens if the frame size changes.
pub struct Visualizer {
    window: Option<Window>,
    canvas: Canvas,
    broken: bool,
}

impl Default for Visualizer {
    fn default() -> Self { Self::new() }
}

impl Visualizer {
    pub fn new() -> Self {
        Visualizer { window: None, canvas: Canvas::new(0, 0), broken: false }
    }

    fn ensure_window(&mut self, width: usize, height: usize) -> Option<&mut Window> {
        let stale = self.window.as_ref().is_some_and(|w| w.get_size() != (width, height));
        if stale {
            self.window = None;
        }
        if self.window.is_none() && !self.broken {
            match Window::new(TITLE, width, height, WindowOptions::default()) {
                Ok(window) => {
                    info!(width, height, "display window opened");
                    self.window = Some(window);
                }
                Err(e) => {
                    // keep the pipeline running headless
                    warn!("cannot open display window, continuing without it: {}", e);
                    self.broken = true;
                }
            }
        }
        self.window.as_mut()
    }
}

impl Renderer for Visualizer {
    fn render(&mut self, overlay: &Overlay<'_>) -> bool {
        let (w, h) = (overlay.dims.width() as usize, overlay.dims.height() as usize);
        self.canvas.draw_overlay(overlay);

        let buf = std::mem::take(&mut self.canvas.buf);
        let keep_open = match self.ensure_window(w, h) {
            Some(window) => {
                if let Err(e) = window.update_with_buffer(&buf, w, h) {
                    warn!("display update failed: {}", e);
                }
                window.is_open() && !window.is_key_down(Key::Escape)
            }
            None => true,
        };
        self.canvas.buf = buf;
        keep_open
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use aruco_space::{
        FrameDims, InteractionEvent, MarkerDetection, MarkerRegistry, NormalizedHand,
        NormalizedMarker, PixelPoint,
    };
    use crate::frame::PixelFormat;
    use crate::sim::synthetic_hand;

    #[test]
    fn blit_converts_bgr_to_argb() {
        let frame = Frame::new(2, 1, PixelFormat::Bgr8, vec![0x10, 0x20, 0x30, 0xFF, 0x00, 0x00]).unwrap();
        let mut canvas = Canvas::new(0, 0);
        canvas.blit_frame(&frame);
        assert_eq!((canvas.width(), canvas.height()), (2, 1));
        assert_eq!(canvas.pixel(0, 0), Some(0xFF302010));
        assert_eq!(canvas.pixel(1, 0), Some(0xFF0000FF));
    }

    #[test]
    fn lines_touch_both_endpoints() {
        let mut canvas = Canvas::new(20, 20);
        canvas.draw_line(2.0, 3.0, 15.0, 11.0, 0xFFFFFFFF);
        assert_eq!(canvas.pixel(2, 3), Some(0xFFFFFFFF));
        assert_eq!(canvas.pixel(15, 11), Some(0xFFFFFFFF));
    }

    #[test]
    fn offscreen_lines_are_clipped() {
        let mut canvas = Canvas::new(10, 10);
        canvas.draw_line(-50.0, -50.0, 1e6, 5.0, 0xFFFFFFFF);
        assert_eq!(canvas.buffer().len(), 100);
    }

    fn overlay_fixture(hover: bool) -> (Frame, FrameDims, Vec<NormalizedHand>, Vec<NormalizedMarker>, MarkerRegistry, Vec<InteractionEvent>) {
        let frame = Frame::filled(200, 200, 0);
        let dims  = FrameDims::new(200, 200).unwrap();
        let seen  = MarkerDetection::new(7, [
            PixelPoint::new(10.0, 10.0),
            PixelPoint::new(110.0, 10.0),
            PixelPoint::new(110.0, 110.0),
            PixelPoint::new(10.0, 110.0),
        ]);
        let marker = NormalizedMarker::from_detection(&seen, dims);
        let mut registry = MarkerRegistry::new();
        registry.upsert(marker.marker_id, marker.quad);
        let hand = NormalizedHand::from_detection(&synthetic_hand(PixelPoint::new(60.0, 60.0), 30.0), dims);
        let hits = if hover { vec![InteractionEvent { hand_index: 0, marker_id: 7 }] } else { vec![] };
        (frame, dims, vec![hand], vec![marker], registry, hits)
    }

    #[test]
    fn overlay_colours_markers_by_state() {
        for (hover, want) in [(false, SEEN_COLOR), (true, HOVER_COLOR)] {
            let (frame, dims, hands, markers, registry, hits) = overlay_fixture(hover);
            let overlay = Overlay {
                frame: &frame, dims, hands: &hands, markers: &markers,
                registry: &registry, interactions: &hits,
            };
            let mut canvas = Canvas::new(0, 0);
            canvas.draw_overlay(&overlay);
            // middle of the top edge of marker 7
            assert_eq!(canvas.pixel(60, 10), Some(want));
            // the fingertip dot
            assert_eq!(canvas.pixel(60, 60), Some(TIP_COLOR));
        }
    }

    #[test]
    fn registry_only_markers_are_grey() {
        let (frame, dims, hands, _, registry, hits) = overlay_fixture(false);
        let overlay = Overlay {
            frame: &frame, dims, hands: &hands, markers: &[],
            registry: &registry, interactions: &hits,
        };
        let mut canvas = Canvas::new(0, 0);
        canvas.draw_overlay(&overlay);
        assert_eq!(canvas.pixel(60, 10), Some(KNOWN_COLOR));
    }
}
