//! Nearest-exemplar chord classifier.
//!
//! Labels a pitch set by looking it up among labelled example chords: an exact
//! match wins, otherwise the example with the highest Jaccard similarity over
//! 128-bit pitch masks. Examples come from JSON or from a directory of
//! chord-library MIDI files (see [`crate::smf::labelled_chords`]).

use std::collections::{BTreeMap, HashMap};
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::classify::{ChordClassifier, ClassifierError};
use crate::smf::{labelled_chords, midi_files, read_midi};
use crate::{Error, Result};

/// A labelled example chord.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exemplar {
    pub label: String,
    pub pitches: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct ExemplarClassifier {
    exemplars: Vec<Exemplar>,
    masks: Vec<u128>,
    exact: HashMap<u128, usize>,
}

fn pitch_mask(pitches: &[u8]) -> u128 {
    pitches
        .iter()
        .filter(|&&p| p < 128)
        .fold(0u128, |mask, &p| mask | (1u128 << p))
}

impl ExemplarClassifier {
    pub fn from_exemplars(exemplars: Vec<Exemplar>) -> Self {
        let masks: Vec<u128> = exemplars.iter().map(|e| pitch_mask(&e.pitches)).collect();

        let mut exact = HashMap::new();
        for (index, &mask) in masks.iter().enumerate() {
            exact.entry(mask).or_insert(index);
        }

        Self {
            exemplars,
            masks,
            exact,
        }
    }

    /// Load exemplars from a JSON array of `{"label", "pitches"}` objects.
    pub fn from_json<R: Read>(reader: R) -> Result<Self> {
        let exemplars: Vec<Exemplar> = serde_json::from_reader(reader)?;
        Ok(Self::from_exemplars(exemplars))
    }

    pub fn to_json<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, &self.exemplars)?;
        Ok(())
    }

    /// Collect exemplars from every `.mid`/`.midi` file in `dir`, in file name order.
    pub fn from_corpus_dir(dir: &Path) -> Result<Self> {
        let files = midi_files(dir)?;

        let mut exemplars = Vec::new();
        for path in &files {
            let found = labelled_chords(&read_midi(path)?);
            debug!(file = %path.display(), chords = found.len(), "read chord library file");
            exemplars.extend(found);
        }

        info!(
            files = files.len(),
            exemplars = exemplars.len(),
            "loaded chord exemplars"
        );
        Ok(Self::from_exemplars(exemplars))
    }

    /// Load from a JSON file, or from a corpus directory when given one.
    pub fn load(path: &Path) -> Result<Self> {
        if path.is_dir() {
            return Self::from_corpus_dir(path);
        }
        let file = std::fs::File::open(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(std::io::BufReader::new(file))
    }

    pub fn exemplars(&self) -> &[Exemplar] {
        &self.exemplars
    }

    pub fn len(&self) -> usize {
        self.exemplars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exemplars.is_empty()
    }

    /// How many exemplars carry each label.
    pub fn label_counts(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for exemplar in &self.exemplars {
            *counts.entry(exemplar.label.as_str()).or_insert(0) += 1;
        }
        counts
    }
}

impl ChordClassifier for ExemplarClassifier {
    fn classify(&self, pitches: &[u8]) -> std::result::Result<String, ClassifierError> {
        if self.exemplars.is_empty() {
            return Err(ClassifierError::Unavailable("no chord exemplars loaded".into()));
        }

        let query = pitch_mask(pitches);
        if let Some(&index) = self.exact.get(&query) {
            return Ok(self.exemplars[index].label.clone());
        }

        let mut best = 0;
        let mut best_score = -1.0f64;
        for (index, &mask) in self.masks.iter().enumerate() {
            let union = (mask | query).count_ones();
            let score = if union == 0 {
                0.0
            } else {
                f64::from((mask & query).count_ones()) / f64::from(union)
            };
            if score > best_score {
                best = index;
                best_score = score;
            }
        }

        Ok(self.exemplars[best].label.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exemplar(label: &str, pitches: &[u8]) -> Exemplar {
        Exemplar {
            label: label.into(),
            pitches: pitches.to_vec(),
        }
    }

    fn library() -> ExemplarClassifier {
        ExemplarClassifier::from_exemplars(vec![
            exemplar("C", &[60, 64, 67]),
            exemplar("Am", &[57, 60, 64]),
            exemplar("G7", &[55, 59, 62, 65]),
            exemplar("C", &[48, 52, 55]),
        ])
    }

    #[test]
    fn exact_match_wins() {
        assert_eq!(library().classify(&[57, 60, 64]).unwrap(), "Am");
    }

    #[test]
    fn nearest_exemplar_by_jaccard() {
        // Shares three of four pitches with G7.
        assert_eq!(library().classify(&[55, 59, 62]).unwrap(), "G7");
    }

    #[test]
    fn ties_go_to_the_earliest_exemplar() {
        // {60, 64} scores 2/3 against both C and Am.
        assert_eq!(library().classify(&[60, 64]).unwrap(), "C");
    }

    #[test]
    fn empty_library_is_unavailable() {
        let classifier = ExemplarClassifier::from_exemplars(Vec::new());
        assert!(matches!(
            classifier.classify(&[60]),
            Err(ClassifierError::Unavailable(_))
        ));
    }

    #[test]
    fn json_round_trip_keeps_labels() {
        let mut buf = Vec::new();
        library().to_json(&mut buf).unwrap();
        let restored = ExemplarClassifier::from_json(buf.as_slice()).unwrap();
        assert_eq!(restored.exemplars(), library().exemplars());
    }

    #[test]
    fn label_counts_group_duplicates() {
        let lib = library();
        let counts = lib.label_counts();
        assert_eq!(counts.get("C"), Some(&2));
        assert_eq!(counts.get("G7"), Some(&1));
        assert_eq!(counts.len(), 3);
    }

    #[test]
    fn corpus_dir_reads_midi_files_only() {
        let dir = tempfile::tempdir().unwrap();
        let mut track = vec![0x00, 0xFF, 0x03, 0x06];
        track.extend_from_slice(b"I - Dm");
        for p in [62u8, 65, 69] {
            track.extend_from_slice(&[0x00, 0x90, p, 90]);
        }
        track.extend_from_slice(&[0x83, 0x60, 0x80, 62, 0, 0x00, 0xFF, 0x2F, 0x00]);

        let mut smf = Vec::new();
        smf.extend_from_slice(b"MThd");
        smf.extend_from_slice(&6u32.to_be_bytes());
        smf.extend_from_slice(&0u16.to_be_bytes());
        smf.extend_from_slice(&1u16.to_be_bytes());
        smf.extend_from_slice(&480u16.to_be_bytes());
        smf.extend_from_slice(b"MTrk");
        smf.extend_from_slice(&(track.len() as u32).to_be_bytes());
        smf.extend_from_slice(&track);

        std::fs::write(dir.path().join("i - Dm.mid"), &smf).unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

        let classifier = ExemplarClassifier::load(dir.path()).unwrap();
        assert_eq!(classifier.len(), 1);
        assert_eq!(classifier.classify(&[62, 65, 69]).unwrap(), "Dm");
    }
}
