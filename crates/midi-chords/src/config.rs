use serde::{Deserialize, Serialize};

/// Tuning for every pipeline stage.
///
/// Passed by value into each stage so differently tuned pipelines can run side
/// by side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Largest delta (ticks) at which a repeated note start extends the open
    /// range instead of starting a new one. Default: 1000.
    pub merge_gap_ticks: u32,
    /// Gap (ticks) after which the next note opens a new chord. Default: 50.
    pub chord_gap_ticks: u32,
    /// Shared pitches with a recent chord at which a chord is suppressed. Default: 3.
    pub similarity_threshold: usize,
    /// Number of retained chords checked for similarity. Default: 3.
    pub dedup_lookback: usize,
    /// Ticks between a reconstructed note start and its stop. Default: 200.
    pub release_ticks: u32,
    /// Velocity written on merged note starts. Default: 64.
    pub merged_velocity: u8,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            merge_gap_ticks: 1000,
            chord_gap_ticks: 50,
            similarity_threshold: 3,
            dedup_lookback: 3,
            release_ticks: 200,
            merged_velocity: 64,
        }
    }
}
