use std::collections::{HashMap, VecDeque};

use tracing::{debug, warn};

use crate::config::PipelineConfig;
use crate::track::{Event, Track};

/// The chronological track and how many original notes could not be mapped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconstruction {
    pub track: Track,
    pub mapped: usize,
    pub dropped: usize,
}

/// Replay the merged notes in the order their pitches were first played.
///
/// Each original onset claims the earliest unclaimed merged onset of the same
/// pitch and is re-emitted at that onset's offset, with a stop
/// `release_ticks` later. Onsets left without a counterpart are dropped.
/// All source tracks are folded into one output track.
pub fn reconstruct(original: &[Track], merged: &[Track], config: &PipelineConfig) -> Reconstruction {
    let mut available: HashMap<u8, VecDeque<&Event>> = HashMap::new();
    for event in merged.iter().flat_map(|t| t.onsets()) {
        available.entry(event.pitch).or_default().push_back(event);
    }

    let mut result = Reconstruction::default();

    for onset in original.iter().flat_map(|t| t.onsets()) {
        let Some(bound) = available.get_mut(&onset.pitch).and_then(|q| q.pop_front()) else {
            result.dropped += 1;
            continue;
        };

        result
            .track
            .events
            .push(Event::start(bound.pitch, bound.velocity, bound.delta));
        result.track.events.push(Event::stop(
            bound.pitch,
            bound.delta.saturating_add(config.release_ticks),
        ));
        result.mapped += 1;
    }

    if result.dropped > 0 {
        warn!(
            dropped = result.dropped,
            mapped = result.mapped,
            "notes without a merged counterpart were dropped"
        );
    }
    debug!(notes = result.mapped, "reconstructed chronological track");

    result
}
