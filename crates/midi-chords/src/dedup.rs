use tracing::debug;

use crate::config::PipelineConfig;
use crate::track::LabelledChord;

/// Retained chords and how many were suppressed by each rule.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DedupOutcome {
    pub chords: Vec<LabelledChord>,
    pub repeated: usize,
    pub similar: usize,
}

/// Drop repeated and near-duplicate chords.
///
/// A chord is skipped when its label matches the last retained chord, or when
/// it shares at least `similarity_threshold` pitches with any of the last
/// `dedup_lookback` retained chords. Skipped chords never enter the window.
pub fn dedup_chords(chords: Vec<LabelledChord>, config: &PipelineConfig) -> DedupOutcome {
    let mut outcome = DedupOutcome::default();

    for candidate in chords {
        if outcome
            .chords
            .last()
            .is_some_and(|last| last.label == candidate.label)
        {
            outcome.repeated += 1;
            continue;
        }

        let window_start = outcome.chords.len().saturating_sub(config.dedup_lookback);
        let too_similar = outcome.chords[window_start..]
            .iter()
            .any(|kept| kept.chord.overlap(&candidate.chord) >= config.similarity_threshold);
        if too_similar {
            outcome.similar += 1;
            continue;
        }

        outcome.chords.push(candidate);
    }

    debug!(
        retained = outcome.chords.len(),
        repeated = outcome.repeated,
        similar = outcome.similar,
        "deduplicated chords"
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::Chord;
    use pretty_assertions::assert_eq;

    fn labelled(label: &str, pitches: &[u8]) -> LabelledChord {
        LabelledChord::new(Chord::new(pitches.iter().copied(), 0), label)
    }

    fn labels(outcome: &DedupOutcome) -> Vec<&str> {
        outcome.chords.iter().map(|c| c.label.as_str()).collect()
    }

    #[test]
    fn empty_sequence_stays_empty() {
        let outcome = dedup_chords(Vec::new(), &PipelineConfig::default());
        assert!(outcome.chords.is_empty());
    }

    #[test]
    fn consecutive_repeats_are_dropped() {
        let outcome = dedup_chords(
            vec![
                labelled("Cmaj", &[0, 4, 7]),
                labelled("Cmaj", &[0, 4, 7]),
                labelled("Gmaj", &[2, 7, 11]),
            ],
            &PipelineConfig::default(),
        );
        assert_eq!(labels(&outcome), vec!["Cmaj", "Gmaj"]);
        assert_eq!(outcome.repeated, 1);
        assert_eq!(outcome.similar, 0);
    }

    #[test]
    fn similar_chords_are_dropped_despite_new_label() {
        let outcome = dedup_chords(
            vec![labelled("Cmaj", &[0, 4, 7]), labelled("Cadd9", &[0, 4, 7, 2])],
            &PipelineConfig::default(),
        );
        assert_eq!(labels(&outcome), vec!["Cmaj"]);
        assert_eq!(outcome.similar, 1);
    }

    #[test]
    fn window_covers_only_the_last_three_retained() {
        let outcome = dedup_chords(
            vec![
                labelled("C", &[60, 64, 67]),
                labelled("Dm", &[62, 65, 69]),
                labelled("Em", &[64, 67, 71]),
                labelled("F", &[65, 69, 72]),
                // Matches C, which has slid out of the window.
                labelled("C/G", &[55, 60, 64, 67]),
            ],
            &PipelineConfig::default(),
        );
        assert_eq!(labels(&outcome), vec!["C", "Dm", "Em", "F", "C/G"]);
    }

    #[test]
    fn skipped_chords_do_not_enter_the_window() {
        let outcome = dedup_chords(
            vec![
                labelled("A", &[57, 61, 64]),
                labelled("A", &[40, 41, 42]),
                // Would match the skipped repeat, but that chord was never kept.
                labelled("B", &[40, 41, 42]),
                labelled("A", &[57, 61, 64, 69]),
            ],
            &PipelineConfig::default(),
        );
        assert_eq!(labels(&outcome), vec!["A", "B"]);
        assert_eq!(outcome.repeated, 1);
        assert_eq!(outcome.similar, 1);
    }
}
