// Core score representation shared by both generators.
//
// A melody is a flat list of (note, duration) events; durations are
// fractions of a whole note (0.25 = quarter). A harmony is one chord per bar.
// Bars are implicit: the generators decide how many events make up a bar.

use crate::theory::{Chord, Note};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MelodyEvent {
    pub note: Note,
    /// Fraction of a whole note.
    pub duration: f64,
}

impl MelodyEvent {
    pub fn new(note: Note, duration: f64) -> Self {
        MelodyEvent { note, duration }
    }
}

pub type Melody = Vec<MelodyEvent>;

/// One chord per bar.
pub type Harmony = Vec<Chord>;

/// Repeat `items` cyclically and truncate to exactly `len` entries.
/// Returns an empty list if `items` is empty.
pub fn cycle_to_length<T: Clone>(items: &[T], len: usize) -> Vec<T> {
    items.iter().cycle().take(len).cloned().collect()
}
