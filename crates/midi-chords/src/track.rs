use serde::{Deserialize, Serialize};

/// Whether an event starts or stops a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    NoteStart,
    NoteStop,
}

/// A single note event as it appears in the track.
///
/// `delta` is the raw tick value stored on the event. Every stage compares it
/// as-is, so after merging it holds a range offset rather than a true delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    pub pitch: u8,
    pub velocity: u8,
    pub delta: u32,
}

impl Event {
    pub fn start(pitch: u8, velocity: u8, delta: u32) -> Self {
        Self {
            kind: EventKind::NoteStart,
            pitch,
            velocity,
            delta,
        }
    }

    pub fn stop(pitch: u8, delta: u32) -> Self {
        Self {
            kind: EventKind::NoteStop,
            pitch,
            velocity: 0,
            delta,
        }
    }

    /// A note start with positive velocity.
    pub fn is_onset(&self) -> bool {
        self.kind == EventKind::NoteStart && self.velocity > 0
    }

    /// A note stop, or a zero-velocity note start.
    pub fn is_release(&self) -> bool {
        !self.is_onset()
    }
}

/// An ordered run of note events, optionally carrying the source track name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub name: Option<String>,
    pub events: Vec<Event>,
}

impl Track {
    pub fn from_events(events: Vec<Event>) -> Self {
        Self { name: None, events }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Positive-velocity note starts, in track order.
    pub fn onsets(&self) -> impl Iterator<Item = &Event> {
        self.events.iter().filter(|e| e.is_onset())
    }
}

/// A sustained activation of one pitch, produced by the merger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteRange {
    pub pitch: u8,
    pub start: u32,
    pub end: u32,
}

/// Pitches heard together, sorted ascending with duplicates removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chord {
    pub pitches: Vec<u8>,
    /// Offset of the note that opened this chord window.
    pub tick: u32,
}

impl Chord {
    pub fn new(pitches: impl IntoIterator<Item = u8>, tick: u32) -> Self {
        let mut pitches: Vec<u8> = pitches.into_iter().collect();
        pitches.sort_unstable();
        pitches.dedup();
        Self { pitches, tick }
    }

    pub fn is_empty(&self) -> bool {
        self.pitches.is_empty()
    }

    /// Number of pitches shared with `other`.
    pub fn overlap(&self, other: &Chord) -> usize {
        self.pitches
            .iter()
            .filter(|p| other.pitches.binary_search(p).is_ok())
            .count()
    }
}

/// A chord with the label the classifier gave it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelledChord {
    pub chord: Chord,
    pub label: String,
}

impl LabelledChord {
    pub fn new(chord: Chord, label: impl Into<String>) -> Self {
        Self {
            chord,
            label: label.into(),
        }
    }

    pub fn pitches(&self) -> &[u8] {
        &self.chord.pitches
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_velocity_start_is_a_release() {
        assert!(Event::start(60, 0, 10).is_release());
        assert!(Event::stop(60, 10).is_release());
        assert!(Event::start(60, 1, 10).is_onset());
    }

    #[test]
    fn chord_pitches_are_normalized() {
        let chord = Chord::new([67, 60, 64, 60], 0);
        assert_eq!(chord.pitches, vec![60, 64, 67]);
    }

    #[test]
    fn overlap_counts_shared_pitches() {
        let c = Chord::new([0, 4, 7], 0);
        let cadd9 = Chord::new([0, 4, 7, 2], 0);
        let g = Chord::new([2, 7, 11], 0);
        assert_eq!(c.overlap(&cadd9), 3);
        assert_eq!(c.overlap(&g), 1);
        assert_eq!(c.overlap(&Chord::new([], 0)), 0);
    }
}
