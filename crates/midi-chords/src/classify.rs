use tracing::debug;

use crate::track::{Chord, LabelledChord};

/// Label given to a chord with no pitches. The classifier is never asked.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Errors a chord classifier may report.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassifierError {
    #[error("classifier unavailable: {0}")]
    Unavailable(String),

    #[error("classification failed: {0}")]
    Failed(String),
}

/// Maps a set of MIDI pitches to a chord label.
///
/// Implementations are shared read-only across pipeline runs, so they must be
/// `Send + Sync` and must not depend on call order. `pitches` is sorted
/// ascending with duplicates removed and is never empty.
pub trait ChordClassifier: Send + Sync {
    fn classify(&self, pitches: &[u8]) -> Result<String, ClassifierError>;
}

impl<F> ChordClassifier for F
where
    F: Fn(&[u8]) -> Result<String, ClassifierError> + Send + Sync,
{
    fn classify(&self, pitches: &[u8]) -> Result<String, ClassifierError> {
        self(pitches)
    }
}

/// Label one chord, substituting [`UNKNOWN_LABEL`] for an empty chord.
pub fn label_chord(classifier: &dyn ChordClassifier, chord: Chord) -> crate::Result<LabelledChord> {
    if chord.is_empty() {
        return Ok(LabelledChord::new(chord, UNKNOWN_LABEL));
    }

    let label = classifier
        .classify(&chord.pitches)
        .map_err(|source| crate::Error::Classifier {
            tick: chord.tick,
            source,
        })?;
    Ok(LabelledChord::new(chord, label))
}

/// Label every chord in order. The first classifier failure aborts the run.
pub fn classify_chords(
    classifier: &dyn ChordClassifier,
    chords: Vec<Chord>,
) -> crate::Result<Vec<LabelledChord>> {
    let labelled = chords
        .into_iter()
        .map(|chord| label_chord(classifier, chord))
        .collect::<crate::Result<Vec<_>>>()?;

    debug!(chords = labelled.len(), "classified chords");
    Ok(labelled)
}
