//! Scoring a chord classifier against a labelled chord corpus.
//!
//! Every labelled chord in the corpus is classified on its own and the
//! prediction compared with the track's label. The result carries overall
//! accuracy and per-label precision, recall and F1.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use tracing::{debug, info};

use crate::classify::{label_chord, ChordClassifier};
use crate::smf::{labelled_chords, midi_files, read_midi};
use crate::table::format_pitch_list;
use crate::track::Chord;
use crate::Result;

/// One labelled chord from the corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    /// Name of the corpus file the chord came from.
    pub filename: String,
    pub label: String,
    pub pitches: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prediction {
    pub filename: String,
    pub chord: String,
    pub pitches: Vec<u8>,
    pub predicted: String,
}

impl Prediction {
    pub fn is_correct(&self) -> bool {
        self.chord == self.predicted
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelScore {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Samples whose true label is this one.
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub predictions: Vec<Prediction>,
    /// Fraction of predictions equal to their label; 0 for no samples.
    pub accuracy: f64,
    /// Every label seen as truth or prediction, sorted by name.
    pub labels: Vec<LabelScore>,
}

impl Evaluation {
    pub fn correct(&self) -> usize {
        self.predictions.iter().filter(|p| p.is_correct()).count()
    }

    /// Labels whose precision falls below `threshold`.
    pub fn labels_below(&self, threshold: f64) -> impl Iterator<Item = &LabelScore> {
        self.labels.iter().filter(move |s| s.precision < threshold)
    }
}

#[derive(Default)]
struct Tally {
    true_positive: usize,
    predicted: usize,
    support: usize,
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Classify every sample and score the predictions.
pub fn evaluate_samples(classifier: &dyn ChordClassifier, samples: Vec<Sample>) -> Result<Evaluation> {
    let mut predictions = Vec::with_capacity(samples.len());
    for sample in samples {
        let labelled = label_chord(classifier, Chord::new(sample.pitches.iter().copied(), 0))?;
        predictions.push(Prediction {
            filename: sample.filename,
            chord: sample.label,
            pitches: sample.pitches,
            predicted: labelled.label,
        });
    }

    let mut tallies: BTreeMap<&str, Tally> = BTreeMap::new();
    for p in &predictions {
        tallies.entry(p.chord.as_str()).or_default().support += 1;
        let predicted = tallies.entry(p.predicted.as_str()).or_default();
        predicted.predicted += 1;
        if p.is_correct() {
            predicted.true_positive += 1;
        }
    }

    let labels = tallies
        .into_iter()
        .map(|(label, t)| {
            let precision = ratio(t.true_positive, t.predicted);
            let recall = ratio(t.true_positive, t.support);
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
            LabelScore {
                label: label.to_string(),
                precision,
                recall,
                f1,
                support: t.support,
            }
        })
        .collect();

    let correct = predictions.iter().filter(|p| p.is_correct()).count();
    let accuracy = ratio(correct, predictions.len());
    debug!(samples = predictions.len(), correct, "scored predictions");

    Ok(Evaluation {
        predictions,
        accuracy,
        labels,
    })
}

/// Labelled chords from every MIDI file in `dir`, tagged with their file name.
pub fn corpus_samples(dir: &Path) -> Result<Vec<Sample>> {
    let mut samples = Vec::new();
    for path in midi_files(dir)? {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        for exemplar in labelled_chords(&read_midi(&path)?) {
            samples.push(Sample {
                filename: filename.clone(),
                label: exemplar.label,
                pitches: exemplar.pitches,
            });
        }
    }
    Ok(samples)
}

pub fn evaluate_corpus_dir(classifier: &dyn ChordClassifier, dir: &Path) -> Result<Evaluation> {
    let samples = corpus_samples(dir)?;
    let evaluation = evaluate_samples(classifier, samples)?;
    info!(
        corpus = %dir.display(),
        samples = evaluation.predictions.len(),
        accuracy = evaluation.accuracy,
        "evaluated classifier"
    );
    Ok(evaluation)
}

/// Write one row per prediction: `filename,chord,notes,predicted_chord`.
pub fn write_predictions<W: Write>(writer: W, predictions: &[Prediction]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(["filename", "chord", "notes", "predicted_chord"])?;
    for p in predictions {
        csv.write_record([
            p.filename.as_str(),
            p.chord.as_str(),
            format_pitch_list(&p.pitches).as_str(),
            p.predicted.as_str(),
        ])?;
    }
    csv.flush().map_err(csv::Error::from)?;
    Ok(())
}
