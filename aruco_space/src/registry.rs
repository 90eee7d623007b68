//! Last known position of every marker seen since startup.

use std::collections::BTreeMap;

use crate::geometry::{NormalizedPoint, Quad};

/// Map from marker id to its most recently observed normalized quad.
///
/// Entries are created on first sighting and overwritten on every later
/// sighting.  Nothing is ever removed: a marker that leaves the view keeps
/// its last position and stays hoverable.
#[derive(Clone, Debug, Default)]
pub struct MarkerRegistry {
    entries: BTreeMap<u32, Quad<NormalizedPoint>>,
}

impl MarkerRegistry {
    pub fn new() -> Self { Self::default() }

    /// Store `quad` for `marker_id`, replacing any previous quad outright.
    ///
    /// Returns `true` when this is the first sighting of `marker_id`.
    pub fn upsert(&mut self, marker_id: u32, quad: Quad<NormalizedPoint>) -> bool {
        self.entries.insert(marker_id, quad).is_none()
    }

    /// Every entry, ascending by marker id.
    pub fn snapshot(&self) -> impl Iterator<Item = (u32, &Quad<NormalizedPoint>)> + '_ {
        self.entries.iter().map(|(id, quad)| (*id, quad))
    }

    pub fn get(&self, marker_id: u32) -> Option<&Quad<NormalizedPoint>> {
        self.entries.get(&marker_id)
    }

    pub fn contains(&self, marker_id: u32) -> bool { self.entries.contains_key(&marker_id) }
    pub fn len(&self)      -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool  { self.entries.is_empty() }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
