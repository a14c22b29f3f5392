use serde::{Deserialize, Serialize};

use crate::track::{EventKind, LabelledChord, Track};
use crate::{Error, Result};

/// Largest delta a variable-length quantity can carry.
const MAX_VLQ: u32 = 0x0FFF_FFFF;

/// Largest tempo the three data bytes of a set-tempo event can hold.
pub const MAX_TEMPO_USEC: u32 = 0x00FF_FFFF;

/// Options for turning a chord sequence back into MIDI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderOptions {
    /// Ticks per quarter note. Default: 480.
    pub ppq: u16,
    /// How long each chord sounds, in ticks. Default: 480.
    pub chord_ticks: u32,
    /// Note-on velocity. Default: 64.
    pub velocity: u8,
    /// Tempo in microseconds per beat. Default: 500000 (120 BPM).
    pub tempo_usec: u32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            ppq: 480,
            chord_ticks: 480,
            velocity: 64,
            tempo_usec: 500_000,
        }
    }
}

/// Write tracks to Standard MIDI File format 1 bytes, one MTrk per track.
///
/// Event deltas are written exactly as stored on each event.
pub fn tracks_to_midi(tracks: &[Track], ppq: u16) -> Vec<u8> {
    let chunks: Vec<Vec<u8>> = tracks.iter().map(build_note_track).collect();
    build_midi_file(1, ppq, &chunks)
}

fn build_note_track(track: &Track) -> Vec<u8> {
    let mut track_data = Vec::new();

    if let Some(name) = &track.name {
        write_vlq(&mut track_data, 0);
        track_data.extend_from_slice(&[0xFF, 0x03]);
        write_vlq(&mut track_data, name.len() as u32);
        track_data.extend_from_slice(name.as_bytes());
    }

    for event in &track.events {
        write_vlq(&mut track_data, event.delta.min(MAX_VLQ));
        match event.kind {
            EventKind::NoteStart => {
                track_data.extend_from_slice(&[0x90, event.pitch & 0x7F, event.velocity & 0x7F]);
            }
            EventKind::NoteStop => {
                track_data.extend_from_slice(&[0x80, event.pitch & 0x7F, 0]);
            }
        }
    }

    // End of track
    write_vlq(&mut track_data, 0);
    track_data.extend_from_slice(&[0xFF, 0x2F, 0x00]);

    track_data
}

/// Render a chord sequence as a single-track (format 0) MIDI file.
///
/// Each chord strikes all its pitches together, holds for `chord_ticks`, then
/// releases. Chords without pitches are skipped. A tempo of zero or above
/// [`MAX_TEMPO_USEC`] is rejected.
pub fn chords_to_midi(chords: &[LabelledChord], options: &RenderOptions) -> Result<Vec<u8>> {
    let usec = options.tempo_usec;
    if usec == 0 || usec > MAX_TEMPO_USEC {
        return Err(Error::TempoOutOfRange(usec));
    }

    let mut track_data = Vec::new();
    write_vlq(&mut track_data, 0);
    track_data.extend_from_slice(&[
        0xFF,
        0x51,
        0x03,
        (usec >> 16) as u8,
        (usec >> 8) as u8,
        usec as u8,
    ]);

    let velocity = options.velocity & 0x7F;
    for chord in chords {
        let Some((&first, rest)) = chord.pitches().split_first() else {
            continue;
        };

        for &pitch in chord.pitches() {
            write_vlq(&mut track_data, 0);
            track_data.extend_from_slice(&[0x90, pitch & 0x7F, velocity]);
        }

        write_vlq(&mut track_data, options.chord_ticks.min(MAX_VLQ));
        track_data.extend_from_slice(&[0x80, first & 0x7F, 0]);
        for &pitch in rest {
            write_vlq(&mut track_data, 0);
            track_data.extend_from_slice(&[0x80, pitch & 0x7F, 0]);
        }
    }

    write_vlq(&mut track_data, 0);
    track_data.extend_from_slice(&[0xFF, 0x2F, 0x00]);

    Ok(build_midi_file(0, options.ppq, &[track_data]))
}

/// Assemble a complete MIDI file from track data blobs.
fn build_midi_file(format: u16, ppq: u16, tracks: &[Vec<u8>]) -> Vec<u8> {
    let mut buf = Vec::new();

    // MThd header
    buf.extend_from_slice(b"MThd");
    buf.extend_from_slice(&6u32.to_be_bytes());
    buf.extend_from_slice(&format.to_be_bytes());
    buf.extend_from_slice(&(tracks.len() as u16).to_be_bytes());
    buf.extend_from_slice(&ppq.to_be_bytes());

    // MTrk chunks
    for track_data in tracks {
        buf.extend_from_slice(b"MTrk");
        buf.extend_from_slice(&(track_data.len() as u32).to_be_bytes());
        buf.extend_from_slice(track_data);
    }

    buf
}

/// Write a variable-length quantity to a byte buffer.
fn write_vlq(buf: &mut Vec<u8>, mut value: u32) {
    let mut bytes = vec![(value & 0x7F) as u8];
    value >>= 7;

    while value > 0 {
        bytes.push((value & 0x7F) as u8 | 0x80);
        value >>= 7;
    }

    bytes.reverse();
    buf.extend_from_slice(&bytes);
}
