//! The three pipeline events and their fixed OSC argument layouts.

use aruco_space::{NormalizedHand, NormalizedMarker};

use crate::{OscArg, OscMessage};

pub const HANDS_ADDRESS:         &str = "/hands";
pub const MARKER_ADDRESS:        &str = "/aruco/marker";
pub const HAND_DETECTED_ADDRESS: &str = "/hand_detected";

/// One emission from the pipeline.
#[derive(Clone, Copy, Debug)]
pub enum Event<'a> {
    /// `/hands [index, x0, y0, …, x20, y20]`
    Hand { index: usize, hand: &'a NormalizedHand },
    /// `/aruco/marker [id, x0, y0, …, x3, y3]`
    Marker(&'a NormalizedMarker),
    /// `/hand_detected [id]`
    HandDetected { marker_id: u32 },
}

impl Event<'_> {
    pub fn address(&self) -> &'static str {
        match self {
            Event::Hand { .. }         => HANDS_ADDRESS,
            Event::Marker(_)           => MARKER_ADDRESS,
            Event::HandDetected { .. } => HAND_DETECTED_ADDRESS,
        }
    }

    pub fn to_message(&self) -> OscMessage {
        let args = match self {
            Event::Hand { index, hand } => {
                let flat = hand.flatten();
                let mut args = Vec::with_capacity(1 + flat.len());
                args.push(OscArg::Int(saturating_i32(*index as u64)));
                args.extend(flat.iter().copied().map(OscArg::Float));
                args
            }
            Event::Marker(marker) => {
                let flat = marker.quad.flatten();
                let mut args = Vec::with_capacity(1 + flat.len());
                args.push(OscArg::Int(saturating_i32(marker.marker_id as u64)));
                args.extend(flat.iter().copied().map(OscArg::Float));
                args
            }
            Event::HandDetected { marker_id } => {
                vec![OscArg::Int(saturating_i32(*marker_id as u64))]
            }
        };
        OscMessage::with_static_address(self.address(), args)
    }
}

/// Ids and indices are unbounded upstream; OSC `int32` is not.
fn saturating_i32(v: u64) -> i32 {
    i32::try_from(v).unwrap_or(i32::MAX)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
