use std::collections::BTreeMap;

use tracing::debug;

use crate::config::PipelineConfig;
use crate::track::{Event, NoteRange, Track};

/// Ranges recovered from one track, plus the stops that matched nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeOutcome {
    pub ranges: Vec<NoteRange>,
    pub orphan_stops: usize,
}

/// Coalesce repeated activations of each pitch into sustained ranges.
///
/// A note start whose delta is within `merge_gap_ticks` stretches the pitch's
/// open range to that delta; anything further starts a new range. Ranges are
/// returned as they close, then the still-open ones by ascending pitch.
pub fn merge_ranges(track: &Track, config: &PipelineConfig) -> MergeOutcome {
    let mut open: BTreeMap<u8, NoteRange> = BTreeMap::new();
    let mut outcome = MergeOutcome::default();

    for event in &track.events {
        if event.is_onset() {
            match open.get_mut(&event.pitch) {
                Some(range) if event.delta <= config.merge_gap_ticks => {
                    range.end = event.delta;
                }
                _ => {
                    let fresh = NoteRange {
                        pitch: event.pitch,
                        start: event.delta,
                        end: event.delta,
                    };
                    if let Some(closed) = open.insert(event.pitch, fresh) {
                        outcome.ranges.push(closed);
                    }
                }
            }
        } else if let Some(range) = open.get_mut(&event.pitch) {
            range.end = event.delta;
        } else {
            outcome.orphan_stops += 1;
        }
    }

    outcome.ranges.extend(open.into_values());
    outcome
}

/// Merge one track and re-emit it as one start/stop pair per range.
///
/// The start velocity is held within 1..=127 so merged starts always count as
/// onsets downstream.
pub fn merge_track(track: &Track, config: &PipelineConfig) -> (Track, MergeOutcome) {
    let outcome = merge_ranges(track, config);
    let velocity = config.merged_velocity.clamp(1, 127);

    let mut events = Vec::with_capacity(outcome.ranges.len() * 2);
    for range in &outcome.ranges {
        events.push(Event::start(range.pitch, velocity, range.start));
        events.push(Event::stop(range.pitch, range.end));
    }

    debug!(
        input_events = track.events.len(),
        ranges = outcome.ranges.len(),
        orphan_stops = outcome.orphan_stops,
        "merged note ranges"
    );

    let merged = Track {
        name: track.name.clone(),
        events,
    };
    (merged, outcome)
}

/// Merge each track on its own; ranges never cross tracks.
pub fn merge_tracks(tracks: &[Track], config: &PipelineConfig) -> (Vec<Track>, usize) {
    let mut orphan_stops = 0;
    let merged = tracks
        .iter()
        .map(|track| {
            let (merged, outcome) = merge_track(track, config);
            orphan_stops += outcome.orphan_stops;
            merged
        })
        .collect();
    (merged, orphan_stops)
}
