use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::classify::{classify_chords, ChordClassifier};
use crate::config::PipelineConfig;
use crate::dedup::dedup_chords;
use crate::extract::extract_notes;
use crate::merge::merge_tracks;
use crate::reconstruct::reconstruct;
use crate::segment::segment_chords;
use crate::smf::{parse_midi, read_midi};
use crate::track::{LabelledChord, Track};
use crate::Result;

/// Counts of what each stage discarded or produced along the way.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    /// Note stops that arrived with no open range for their pitch.
    pub orphan_stops: usize,
    /// Original onsets the reconstructor could not bind to a merged note.
    pub dropped_notes: usize,
    pub chords_segmented: usize,
    /// Chords skipped for repeating the previous label.
    pub repeated: usize,
    /// Chords skipped for sharing too many pitches with a recent chord.
    pub similar: usize,
}

/// Everything one pipeline run produces.
#[derive(Debug, Clone, PartialEq)]
pub struct ChordReport {
    /// The merged notes replayed in playing order, as one track.
    pub chronological: Track,
    /// Final chord sequence after deduplication.
    pub chords: Vec<LabelledChord>,
    /// Onset pitches of `chronological`, in order.
    pub notes: Vec<u8>,
    pub diagnostics: Diagnostics,
}

/// The merged notes replayed in playing order, before any chord work.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Chronology {
    pub track: Track,
    /// Onset pitches of `track`, in order.
    pub notes: Vec<u8>,
    /// Only `orphan_stops` and `dropped_notes` are filled in.
    pub diagnostics: Diagnostics,
}

/// Merge each track, then replay every note in the order it was first played.
///
/// Needs no classifier, so note lists can be produced without one.
pub fn chronological_stream(tracks: &[Track], config: &PipelineConfig) -> Chronology {
    let (merged, orphan_stops) = merge_tracks(tracks, config);
    let reconstruction = reconstruct(tracks, &merged, config);
    let notes = extract_notes(&reconstruction.track);

    Chronology {
        track: reconstruction.track,
        notes,
        diagnostics: Diagnostics {
            orphan_stops,
            dropped_notes: reconstruction.dropped,
            ..Diagnostics::default()
        },
    }
}

/// Runs merge, reconstruction, segmentation, labelling and deduplication with
/// one shared classifier.
#[derive(Clone)]
pub struct ChordPipeline {
    classifier: Arc<dyn ChordClassifier>,
    config: PipelineConfig,
}

impl ChordPipeline {
    pub fn new(classifier: Arc<dyn ChordClassifier>) -> Self {
        Self {
            classifier,
            config: PipelineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The classifier-free first half of [`run`](Self::run).
    pub fn chronological(&self, tracks: &[Track]) -> Chronology {
        chronological_stream(tracks, &self.config)
    }

    pub fn run(&self, tracks: &[Track]) -> Result<ChordReport> {
        let config = &self.config;

        let Chronology {
            track: chronological,
            notes,
            diagnostics,
        } = self.chronological(tracks);

        let windows = segment_chords(&chronological, config);
        let chords_segmented = windows.len();

        let labelled = classify_chords(self.classifier.as_ref(), windows)?;
        let deduped = dedup_chords(labelled, config);

        let diagnostics = Diagnostics {
            chords_segmented,
            repeated: deduped.repeated,
            similar: deduped.similar,
            ..diagnostics
        };

        info!(
            tracks = tracks.len(),
            notes = notes.len(),
            chords = deduped.chords.len(),
            segmented = chords_segmented,
            dropped_notes = diagnostics.dropped_notes,
            "chord pipeline finished"
        );

        Ok(ChordReport {
            chronological,
            chords: deduped.chords,
            notes,
            diagnostics,
        })
    }

    pub fn run_bytes(&self, bytes: &[u8]) -> Result<ChordReport> {
        let source = parse_midi(bytes)?;
        self.run(&source.tracks)
    }

    pub fn run_file(&self, path: &Path) -> Result<ChordReport> {
        let source = read_midi(path)?;
        info!(file = %path.display(), tracks = source.tracks.len(), "running chord pipeline");
        self.run(&source.tracks)
    }
}

impl std::fmt::Debug for ChordPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChordPipeline")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
