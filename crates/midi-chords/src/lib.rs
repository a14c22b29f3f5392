//! Cleanup and chord labelling for transcribed MIDI tracks.
//!
//! A raw transcription is merged into sustained note ranges, re-emitted in the
//! order the notes were first played, cut into chord windows, labelled by an
//! injected [`ChordClassifier`] and finally thinned of repeated or
//! near-identical chords.
//!
//! ```
//! use std::sync::Arc;
//! use midi_chords::{ChordPipeline, ClassifierError, Event, Track};
//!
//! let classifier = |pitches: &[u8]| -> Result<String, ClassifierError> {
//!     Ok(format!("{}-note chord", pitches.len()))
//! };
//! let pipeline = ChordPipeline::new(Arc::new(classifier));
//!
//! let track = Track::from_events(vec![
//!     Event::start(60, 100, 0),
//!     Event::start(64, 100, 0),
//!     Event::start(67, 100, 0),
//!     Event::stop(60, 480),
//! ]);
//! let report = pipeline.run(&[track]).unwrap();
//! assert_eq!(report.chords.len(), 1);
//! assert_eq!(report.notes, vec![60, 64, 67]);
//! ```

pub mod classify;
pub mod config;
pub mod dedup;
pub mod evaluate;
pub mod exemplar;
pub mod extract;
pub mod merge;
pub mod midi_writer;
pub mod pipeline;
pub mod reconstruct;
pub mod segment;
pub mod smf;
pub mod table;
pub mod track;

pub use classify::{classify_chords, label_chord, ChordClassifier, ClassifierError, UNKNOWN_LABEL};
pub use config::PipelineConfig;
pub use dedup::{dedup_chords, DedupOutcome};
pub use evaluate::{
    corpus_samples, evaluate_corpus_dir, evaluate_samples, write_predictions, Evaluation, LabelScore,
    Prediction, Sample,
};
pub use exemplar::{Exemplar, ExemplarClassifier};
pub use extract::extract_notes;
pub use merge::{merge_ranges, merge_track, merge_tracks, MergeOutcome};
pub use midi_writer::{chords_to_midi, tracks_to_midi, RenderOptions, MAX_TEMPO_USEC};
pub use pipeline::{chronological_stream, ChordPipeline, ChordReport, Chronology, Diagnostics};
pub use reconstruct::{reconstruct, Reconstruction};
pub use segment::segment_chords;
pub use smf::{labelled_chords, midi_files, parse_midi, read_midi, MidiSource};
pub use table::{read_chord_table, write_chord_table, write_note_table};
pub use track::{Chord, Event, EventKind, LabelledChord, NoteRange, Track};

use std::path::PathBuf;

/// Errors from reading, labelling or writing chord data.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("MIDI parse error: {0}")]
    MidiParse(String),

    #[error("chord classifier failed at tick {tick}: {source}")]
    Classifier {
        tick: u32,
        source: ClassifierError,
    },

    #[error("CSV error: {0}")]
    Table(#[from] csv::Error),

    #[error("invalid chord table row {row}: {message}")]
    InvalidTable { row: usize, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("tempo {0} µs per beat does not fit a MIDI tempo event (1..=16777215)")]
    TempoOutOfRange(u32),
}

pub type Result<T> = std::result::Result<T, Error>;
