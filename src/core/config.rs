//! Configuration system: TOML file + env var overrides + defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, StxError};

/// Full STX configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub playback: PlaybackConfig,
    pub layout: LayoutConfig,
    pub logging: LoggingConfig,
    pub paths: PathsConfig,
}

/// Playback pacing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Pause between steps in milliseconds.
    pub step_ms: u64,
    /// Floor applied to every step duration.
    pub min_step_ms: u64,
    /// Play toward the root by default.
    pub reverse: bool,
}

/// Layout aggregates handed to renderers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LayoutConfig {
    /// `minsize` reported when every node carries the same weight.
    pub minsize_floor: f64,
}

/// JSONL activity log behavior.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    pub enabled: bool,
    /// Secondary log file used when the primary cannot be opened.
    pub fallback_path: Option<PathBuf>,
    pub max_size_bytes: u64,
    pub max_rotated_files: u32,
    pub fsync_interval_secs: u64,
}

/// Filesystem paths used by stx.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
    pub jsonl_log: PathBuf,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            step_ms: 500,
            min_step_ms: 5,
            reverse: false,
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self { minsize_floor: 1.0 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            fallback_path: Some(env::temp_dir().join("stx-activity.jsonl")),
            max_size_bytes: 10 * 1024 * 1024,
            max_rotated_files: 3,
            fsync_interval_secs: 10,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let home_dir = env::var_os("HOME").map_or_else(
            || {
                eprintln!(
                    "[STX-CONFIG] WARNING: HOME not set, falling back to /tmp for data paths"
                );
                PathBuf::from("/tmp")
            },
            PathBuf::from,
        );
        Self {
            config_file: home_dir.join(".config").join("stx").join("config.toml"),
            jsonl_log: home_dir
                .join(".local")
                .join("share")
                .join("stx")
                .join("activity.jsonl"),
        }
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// A missing file at the default path yields defaults; a missing explicit
    /// path is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, env_var)
    }

    /// [`load`](Self::load) with an injectable environment lookup.
    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| StxError::io(&path_buf, source))?;
            Self::from_toml_str(&raw)?
        } else if path.is_some() {
            return Err(StxError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides_from(lookup)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a TOML document without env overrides or validation.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Deterministic hash of the effective config for logging.
    ///
    /// FNV-1a over the canonical JSON form, so the value is stable across
    /// processes and toolchain releases.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut get = |name: &str| lookup(name).filter(|raw| !raw.trim().is_empty());

        // playback
        if let Some(raw) = get("STX_PLAYBACK_STEP_MS") {
            self.playback.step_ms = parse_env("STX_PLAYBACK_STEP_MS", &raw)?;
        }
        if let Some(raw) = get("STX_PLAYBACK_MIN_STEP_MS") {
            self.playback.min_step_ms = parse_env("STX_PLAYBACK_MIN_STEP_MS", &raw)?;
        }
        if let Some(raw) = get("STX_PLAYBACK_REVERSE") {
            self.playback.reverse = parse_env("STX_PLAYBACK_REVERSE", &raw)?;
        }

        // layout
        if let Some(raw) = get("STX_LAYOUT_MINSIZE_FLOOR") {
            self.layout.minsize_floor = parse_env("STX_LAYOUT_MINSIZE_FLOOR", &raw)?;
        }

        // logging
        if let Some(raw) = get("STX_LOG_ENABLED") {
            self.logging.enabled = parse_env("STX_LOG_ENABLED", &raw)?;
        }
        if let Some(raw) = get("STX_LOG_PATH") {
            self.paths.jsonl_log = PathBuf::from(raw);
        }
        if let Some(raw) = get("STX_LOG_MAX_SIZE_BYTES") {
            self.logging.max_size_bytes = parse_env("STX_LOG_MAX_SIZE_BYTES", &raw)?;
        }

        Ok(())
    }

    /// Check cross-field and range constraints.
    pub fn validate(&self) -> Result<()> {
        if self.playback.min_step_ms == 0 {
            return Err(StxError::InvalidConfig {
                details: "playback.min_step_ms must be >= 1".to_string(),
            });
        }
        if !self.layout.minsize_floor.is_finite() || self.layout.minsize_floor <= 0.0 {
            return Err(StxError::InvalidConfig {
                details: format!(
                    "layout.minsize_floor must be a positive number, got {}",
                    self.layout.minsize_floor
                ),
            });
        }
        if self.logging.max_size_bytes == 0 {
            return Err(StxError::InvalidConfig {
                details: "logging.max_size_bytes must be > 0".to_string(),
            });
        }
        if self.logging.max_rotated_files == 0 {
            return Err(StxError::InvalidConfig {
                details: "logging.max_rotated_files must be >= 1".to_string(),
            });
        }
        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok()
}

fn parse_env<T>(name: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|error| StxError::ConfigParse {
        context: "env",
        details: format!("{name}={raw:?}: {error}"),
    })
}
