//! Configuration loading for chordscribe.
//!
//! # Usage
//!
//! ```rust,no_run
//! use chordconf::ChordConfig;
//!
//! let config = ChordConfig::load().expect("Failed to load config");
//! println!("chord gap: {} ticks", config.pipeline.chord_gap_ticks);
//! println!("output dir: {}", config.paths.output_dir.display());
//! ```
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins):
//! 1. `/etc/chordscribe/config.toml` (system)
//! 2. `~/.config/chordscribe/config.toml` (user)
//! 3. `./chordscribe.toml` (local override, or the `--config` path)
//! 4. Environment variables (`CHORDSCRIBE_*`, `RUST_LOG`)
//!
//! # Example Config
//!
//! ```toml
//! [pipeline]
//! merge_gap_ticks = 1000
//! chord_gap_ticks = 50
//! similarity_threshold = 3
//!
//! [paths]
//! output_dir = "~/chords"
//! classifier = "~/chords/exemplars.json"
//!
//! [telemetry]
//! log_level = "info"
//! ```

pub mod loader;
pub mod settings;

pub use loader::{discover_config_files_with_override, ConfigSources};
pub use midi_chords::PipelineConfig;
pub use settings::{PathsConfig, TelemetryConfig};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Complete chordscribe configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ChordConfig {
    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl ChordConfig {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load configuration from a specific file path, then apply env overrides.
    ///
    /// If `config_path` is provided, it takes precedence over the local
    /// `./chordscribe.toml` override. System and user configs still load first.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration from optional path and return information about sources.
    pub fn load_with_sources_from(
        config_path: Option<&Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut config = ChordConfig::default();

        for path in loader::discover_config_files_with_override(config_path) {
            loader::apply_file(&mut config, &path)?;
            sources.files.push(path);
        }

        loader::apply_env_overrides(&mut config, &mut sources);

        Ok((config, sources))
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> String {
        // Build TOML manually for nicer formatting
        let mut output = String::new();
        let p = &self.pipeline;

        output.push_str("# chordscribe configuration\n\n");

        output.push_str("[pipeline]\n");
        output.push_str(&format!("merge_gap_ticks = {}\n", p.merge_gap_ticks));
        output.push_str(&format!("chord_gap_ticks = {}\n", p.chord_gap_ticks));
        output.push_str(&format!("similarity_threshold = {}\n", p.similarity_threshold));
        output.push_str(&format!("dedup_lookback = {}\n", p.dedup_lookback));
        output.push_str(&format!("release_ticks = {}\n", p.release_ticks));
        output.push_str(&format!("merged_velocity = {}\n", p.merged_velocity));

        output.push_str("\n[paths]\n");
        output.push_str(&format!(
            "output_dir = \"{}\"\n",
            self.paths.output_dir.display()
        ));
        match &self.paths.classifier {
            Some(path) => output.push_str(&format!("classifier = \"{}\"\n", path.display())),
            None => output.push_str("# classifier = \"exemplars.json\"\n"),
        }

        output.push_str("\n[telemetry]\n");
        output.push_str(&format!(
            "log_level = \"{}\"\n",
            self.telemetry.log_level
        ));

        output
    }
}
