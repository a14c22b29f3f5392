use crate::track::Track;

/// Every onset pitch in track order, repeats included.
pub fn extract_notes(track: &Track) -> Vec<u8> {
    track.onsets().map(|e| e.pitch).collect()
}
