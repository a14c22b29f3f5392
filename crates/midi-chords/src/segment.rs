use tracing::debug;

use crate::config::PipelineConfig;
use crate::track::{Chord, Track};

/// Cut a chronological track into chord windows.
///
/// A note more than `chord_gap_ticks` after the last note added to the open
/// window closes it and opens the next one. Offsets are signed differences,
/// so a note earlier than the previous one never splits a window.
pub fn segment_chords(track: &Track, config: &PipelineConfig) -> Vec<Chord> {
    let gap = i64::from(config.chord_gap_ticks);
    let mut chords = Vec::new();
    let mut pending: Vec<u8> = Vec::new();
    let mut window_tick = 0u32;
    let mut last_tick = 0u32;

    for onset in track.onsets() {
        if !pending.is_empty() && i64::from(onset.delta) - i64::from(last_tick) > gap {
            chords.push(Chord::new(pending.drain(..), window_tick));
        }
        if pending.is_empty() {
            window_tick = onset.delta;
        }
        pending.push(onset.pitch);
        last_tick = onset.delta;
    }

    if !pending.is_empty() {
        chords.push(Chord::new(pending, window_tick));
    }

    debug!(chords = chords.len(), "segmented chord windows");
    chords
}
