//! Config file discovery, loading, and environment variable overlay.

use crate::{ChordConfig, ConfigError};
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files in standard locations.
///
/// Returns paths in load order (system, user, local).
/// Only returns files that exist.
pub fn discover_config_files() -> Vec<PathBuf> {
    discover_config_files_with_override(None)
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided it replaces the local override. It is returned
/// even when missing so the read fails loudly instead of being skipped.
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/chordscribe/config.toml");
    if system.exists() {
        files.push(system);
    }

    // User config (XDG_CONFIG_HOME or ~/.config)
    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("chordscribe/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    if let Some(path) = cli_path {
        files.push(path.to_path_buf());
        return files;
    }

    let local = PathBuf::from("chordscribe.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Overlay the keys set in a TOML file onto `config`.
pub fn apply_file(config: &mut ChordConfig, path: &Path) -> Result<(), ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    apply_toml(config, &contents, path)
}

fn parse_error(path: &Path, message: impl Into<String>) -> ConfigError {
    ConfigError::Parse {
        path: path.to_path_buf(),
        message: message.into(),
    }
}

fn read_int<T: TryFrom<i64>>(
    table: &toml::Table,
    section: &str,
    key: &str,
    path: &Path,
) -> Result<Option<T>, ConfigError> {
    let Some(value) = table.get(key) else {
        return Ok(None);
    };
    let int = value
        .as_integer()
        .ok_or_else(|| parse_error(path, format!("{section}.{key} must be an integer")))?;
    T::try_from(int)
        .map(Some)
        .map_err(|_| parse_error(path, format!("{section}.{key} is out of range: {int}")))
}

/// Overlay config from a TOML string. Keys absent from `contents` keep their
/// current value.
pub(crate) fn apply_toml(config: &mut ChordConfig, contents: &str, path: &Path) -> Result<(), ConfigError> {
    let table: toml::Table = contents
        .parse()
        .map_err(|e: toml::de::Error| parse_error(path, e.to_string()))?;

    if let Some(pipeline) = table.get("pipeline").and_then(|v| v.as_table()) {
        let p = &mut config.pipeline;
        if let Some(v) = read_int(pipeline, "pipeline", "merge_gap_ticks", path)? {
            p.merge_gap_ticks = v;
        }
        if let Some(v) = read_int(pipeline, "pipeline", "chord_gap_ticks", path)? {
            p.chord_gap_ticks = v;
        }
        if let Some(v) = read_int(pipeline, "pipeline", "similarity_threshold", path)? {
            p.similarity_threshold = v;
        }
        if let Some(v) = read_int(pipeline, "pipeline", "dedup_lookback", path)? {
            p.dedup_lookback = v;
        }
        if let Some(v) = read_int(pipeline, "pipeline", "release_ticks", path)? {
            p.release_ticks = v;
        }
        if let Some(v) = read_int::<u8>(pipeline, "pipeline", "merged_velocity", path)? {
            if !(1..=127).contains(&v) {
                return Err(parse_error(path, format!("pipeline.merged_velocity is out of range: {v}")));
            }
            p.merged_velocity = v;
        }
    }

    if let Some(paths) = table.get("paths").and_then(|v| v.as_table()) {
        if let Some(v) = paths.get("output_dir").and_then(|v| v.as_str()) {
            config.paths.output_dir = expand_path(v);
        }
        if let Some(v) = paths.get("classifier").and_then(|v| v.as_str()) {
            config.paths.classifier = Some(expand_path(v));
        }
    }

    if let Some(telemetry) = table.get("telemetry").and_then(|v| v.as_table()) {
        if let Some(v) = telemetry.get("log_level").and_then(|v| v.as_str()) {
            config.telemetry.log_level = v.to_string();
        }
    }

    Ok(())
}

/// Apply environment variable overrides to config.
pub fn apply_env_overrides(config: &mut ChordConfig, sources: &mut ConfigSources) {
    apply_env_overrides_with(config, sources, |key| env::var(key).ok());
}

/// Apply overrides read through `lookup` instead of the process environment.
pub fn apply_env_overrides_with<F>(config: &mut ChordConfig, sources: &mut ConfigSources, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    // Pipeline tuning; unparseable values are ignored
    if let Some(v) = lookup("CHORDSCRIBE_MERGE_GAP_TICKS").and_then(|v| v.parse().ok()) {
        config.pipeline.merge_gap_ticks = v;
        sources.env_overrides.push("CHORDSCRIBE_MERGE_GAP_TICKS".to_string());
    }
    if let Some(v) = lookup("CHORDSCRIBE_CHORD_GAP_TICKS").and_then(|v| v.parse().ok()) {
        config.pipeline.chord_gap_ticks = v;
        sources.env_overrides.push("CHORDSCRIBE_CHORD_GAP_TICKS".to_string());
    }
    if let Some(v) = lookup("CHORDSCRIBE_SIMILARITY_THRESHOLD").and_then(|v| v.parse().ok()) {
        config.pipeline.similarity_threshold = v;
        sources.env_overrides.push("CHORDSCRIBE_SIMILARITY_THRESHOLD".to_string());
    }

    // Paths
    if let Some(v) = lookup("CHORDSCRIBE_OUTPUT_DIR") {
        config.paths.output_dir = expand_path(&v);
        sources.env_overrides.push("CHORDSCRIBE_OUTPUT_DIR".to_string());
    }
    if let Some(v) = lookup("CHORDSCRIBE_CLASSIFIER") {
        config.paths.classifier = Some(expand_path(&v));
        sources.env_overrides.push("CHORDSCRIBE_CLASSIFIER".to_string());
    }

    // Telemetry
    if let Some(v) = lookup("CHORDSCRIBE_LOG_LEVEL") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("CHORDSCRIBE_LOG_LEVEL".to_string());
    }
    // Also support RUST_LOG
    if let Some(v) = lookup("RUST_LOG") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("RUST_LOG".to_string());
    }
}

/// Expand ~ and environment variables in a path.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            home.join(stripped)
        } else {
            PathBuf::from(path)
        }
    } else if let Some(stripped) = path.strip_prefix('$') {
        // Handle $VAR/rest/of/path
        if let Some(slash_pos) = stripped.find('/') {
            let var_name = &stripped[..slash_pos];
            if let Ok(var_value) = env::var(var_name) {
                PathBuf::from(var_value).join(&stripped[slash_pos + 1..])
            } else {
                PathBuf::from(path)
            }
        } else {
            env::var(stripped)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(path))
        }
    } else {
        PathBuf::from(path)
    }
}
