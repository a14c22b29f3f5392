//! CSV tables for chord sequences and note lists.
//!
//! The chord table has columns `Notes` and `Predicted Chord`, with the notes
//! written as a list literal such as `[60, 64, 67]`. The note table has a
//! single `Note` column.

use std::io::{Read, Write};

use crate::track::{Chord, LabelledChord};
use crate::{Error, Result};

pub const NOTES_COLUMN: &str = "Notes";
pub const LABEL_COLUMN: &str = "Predicted Chord";
pub const NOTE_COLUMN: &str = "Note";

pub fn format_pitch_list(pitches: &[u8]) -> String {
    let items: Vec<String> = pitches.iter().map(|p| p.to_string()).collect();
    format!("[{}]", items.join(", "))
}

pub fn parse_pitch_list(text: &str) -> Option<Vec<u8>> {
    let inner = text.trim().strip_prefix('[')?.strip_suffix(']')?.trim();
    if inner.is_empty() {
        return Some(Vec::new());
    }
    inner
        .split(',')
        .map(|item| item.trim().parse::<u8>().ok().filter(|&p| p < 128))
        .collect()
}

pub fn write_chord_table<W: Write>(writer: W, chords: &[LabelledChord]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record([NOTES_COLUMN, LABEL_COLUMN])?;
    for chord in chords {
        csv.write_record([format_pitch_list(chord.pitches()).as_str(), chord.label.as_str()])?;
    }
    csv.flush().map_err(csv::Error::from)?;
    Ok(())
}

pub fn write_note_table<W: Write>(writer: W, notes: &[u8]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record([NOTE_COLUMN])?;
    for note in notes {
        csv.write_record([note.to_string()])?;
    }
    csv.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Read a chord table written by [`write_chord_table`].
///
/// Chord ticks are not stored, so every chord comes back with tick 0.
pub fn read_chord_table<R: Read>(reader: R) -> Result<Vec<LabelledChord>> {
    let mut csv = csv::Reader::from_reader(reader);

    let headers = csv.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| Error::InvalidTable {
                row: 0,
                message: format!("missing column {name:?}"),
            })
    };
    let notes_at = column(NOTES_COLUMN)?;
    let label_at = column(LABEL_COLUMN)?;

    let mut chords = Vec::new();
    for (index, record) in csv.records().enumerate() {
        let record = record?;
        let row = index + 1;
        let notes = record.get(notes_at).unwrap_or_default();
        let pitches = parse_pitch_list(notes).ok_or_else(|| Error::InvalidTable {
            row,
            message: format!("cannot read notes {notes:?}"),
        })?;
        let label = record.get(label_at).unwrap_or_default();
        chords.push(LabelledChord::new(Chord::new(pitches, 0), label));
    }
    Ok(chords)
}
