//! Fingertip-over-marker hover detection.

use crate::geometry::point_in_quad;
use crate::model::{InteractionEvent, NormalizedHand};
use crate::registry::MarkerRegistry;

/// Test every hand's index fingertip against every registered marker.
///
/// Events come out hand-major (provider order), then ascending marker id.
/// Cost is `hands × markers`; both are expected to be a handful.
pub fn detect_interactions(
    hands:    &[NormalizedHand],
    registry: &MarkerRegistry,
) -> Vec<InteractionEvent> {
    let mut events = Vec::new();
    for (hand_index, hand) in hands.iter().enumerate() {
        let tip = hand.fingertip();
        for (marker_id, quad) in registry.snapshot() {
            if point_in_quad(tip, quad) {
                events.push(InteractionEvent { hand_index, marker_id });
            }
        }
    }
    events
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{NormalizedPoint, Quad};
    use crate::model::{HAND_LANDMARK_COUNT, INDEX_FINGER_TIP};

    fn hand_pointing_at(x: f32, y: f32) -> NormalizedHand {
        let mut landmarks = [NormalizedPoint::new(0.99, 0.99); HAND_LANDMARK_COUNT];
        landmarks[INDEX_FINGER_TIP] = NormalizedPoint::new(x, y);
        NormalizedHand { landmarks }
    }

    fn square(x: f32, y: f32, side: f32) -> Quad<NormalizedPoint> {
        Quad::new([
            NormalizedPoint::new(x,        y),
            NormalizedPoint::new(x + side, y),
            NormalizedPoint::new(x + side, y + side),
            NormalizedPoint::new(x,        y + side),
        ])
    }

    #[test]
    fn empty_registry_yields_nothing() {
        let reg = MarkerRegistry::new();
        assert!(detect_interactions(&[hand_pointing_at(0.5, 0.5)], &reg).is_empty());
    }

    #[test]
    fn no_hands_yields_nothing() {
        let mut reg = MarkerRegistry::new();
        reg.upsert(1, square(0.0, 0.0, 1.0));
        assert!(detect_interactions(&[], &reg).is_empty());
    }

    #[test]
    fn only_the_fingertip_counts() {
        // Every other landmark sits at (0.99, 0.99), inside this marker.
        let mut reg = MarkerRegistry::new();
        reg.upsert(5, square(0.9, 0.9, 0.1));
        assert!(detect_interactions(&[hand_pointing_at(0.1, 0.1)], &reg).is_empty());
    }

    #[test]
    fn events_are_hand_major_then_id_ascending() {
        let mut reg = MarkerRegistry::new();
        reg.upsert(20, square(0.0, 0.0, 0.5));
        reg.upsert(10, square(0.1, 0.1, 0.3));
        reg.upsert(30, square(0.6, 0.6, 0.3));

        let hands = [hand_pointing_at(0.7, 0.7), hand_pointing_at(0.2, 0.2)];
        let events = detect_interactions(&hands, &reg);
        assert_eq!(events, vec![
            InteractionEvent { hand_index: 0, marker_id: 30 },
            InteractionEvent { hand_index: 1, marker_id: 10 },
            InteractionEvent { hand_index: 1, marker_id: 20 },
        ]);
    }

    #[test]
    fn fingertip_on_marker_edge_does_not_hover() {
        let mut reg = MarkerRegistry::new();
        reg.upsert(4, square(0.25, 0.25, 0.5));
        assert!(detect_interactions(&[hand_pointing_at(0.5, 0.25)], &reg).is_empty());
    }
}
