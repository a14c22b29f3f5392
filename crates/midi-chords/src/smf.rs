use std::path::{Path, PathBuf};

use midly::{MetaMessage, MidiMessage, Smf, TrackEventKind};

use crate::exemplar::Exemplar;
use crate::track::{Event, Track};
use crate::{Error, Result};

/// Note events and timing header of a Standard MIDI File.
#[derive(Debug, Clone, PartialEq)]
pub struct MidiSource {
    pub ppq: u16,
    pub format: u8,
    pub tracks: Vec<Track>,
}

impl MidiSource {
    pub fn onset_count(&self) -> usize {
        self.tracks.iter().map(|t| t.onsets().count()).sum()
    }
}

/// Read and parse a MIDI file from disk.
pub fn read_midi(path: &Path) -> Result<MidiSource> {
    let bytes = std::fs::read(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_midi(&bytes)
}

/// Parse MIDI bytes, keeping only note events.
///
/// Each note event keeps the delta stored on it; deltas of skipped meta and
/// controller events are not folded in.
pub fn parse_midi(bytes: &[u8]) -> Result<MidiSource> {
    let smf = Smf::parse(bytes).map_err(|e| Error::MidiParse(e.to_string()))?;

    let ppq = match smf.header.timing {
        midly::Timing::Metrical(ticks) => ticks.as_int(),
        midly::Timing::Timecode(_, _) => 480,
    };

    let format = match smf.header.format {
        midly::Format::SingleTrack => 0,
        midly::Format::Parallel => 1,
        midly::Format::Sequential => 2,
    };

    let tracks = smf
        .tracks
        .iter()
        .map(|events| {
            let mut track = Track::default();
            for event in events {
                let delta = event.delta.as_int();
                match event.kind {
                    TrackEventKind::Meta(MetaMessage::TrackName(bytes)) => {
                        track.name = Some(String::from_utf8_lossy(bytes).into_owned());
                    }
                    TrackEventKind::Midi { message, .. } => match message {
                        MidiMessage::NoteOn { key, vel } => {
                            track.events.push(Event::start(key.as_int(), vel.as_int(), delta));
                        }
                        MidiMessage::NoteOff { key, .. } => {
                            track.events.push(Event::stop(key.as_int(), delta));
                        }
                        _ => {}
                    },
                    _ => {}
                }
            }
            track
        })
        .collect();

    Ok(MidiSource {
        ppq,
        format,
        tracks,
    })
}

/// Every `.mid`/`.midi` file directly inside `dir`, sorted by path.
pub fn midi_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let io_err = |source| Error::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        let is_midi = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("mid") || e.eq_ignore_ascii_case("midi"));
        if is_midi {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Labelled chords from a chord-library file: one chord per named track.
///
/// The label is the last word of the track name ("I - Cmaj7" gives "Cmaj7").
/// Tracks without a name or without onsets are skipped.
pub fn labelled_chords(source: &MidiSource) -> Vec<Exemplar> {
    source
        .tracks
        .iter()
        .filter_map(|track| {
            let label = track.name.as_deref()?.split_whitespace().last()?;
            let mut pitches: Vec<u8> = track.onsets().map(|e| e.pitch).collect();
            if pitches.is_empty() {
                return None;
            }
            pitches.sort_unstable();
            Some(Exemplar {
                label: label.to_string(),
                pitches,
            })
        })
        .collect()
}
