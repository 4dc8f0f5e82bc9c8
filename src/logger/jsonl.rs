//! JSONL activity log: one self-contained JSON object per line.
//!
//! Lines are assembled in memory and written with a single `write_all`, so a
//! concurrent `tail -f` never sees a partial line.
//!
//! Four-level fallback chain:
//! 1. Primary file path
//! 2. Fallback path (by default in the system temp directory)
//! 3. stderr with `[STX-JSONL]` prefix
//! 4. Silent discard (logging never fails the caller)

#![allow(missing_docs)]

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::core::config::Config;
use crate::core::errors::{Result, StxError};

const WRITE_BUFFER_BYTES: usize = 16 * 1024;

/// Severity level for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Event types recorded in the activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    TreeLoaded,
    TreeRejected,
    CommandApplied,
    PlaybackStart,
    PlaybackFinish,
    ConfigLoaded,
    Error,
}

/// A single JSONL log entry. Only `ts`, `event` and `severity` are always
/// present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// RFC 3339 UTC timestamp, millisecond precision.
    pub ts: String,
    pub event: EventType,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tree_id: Option<String>,
    /// Selection after the event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected: Option<u64>,
    /// Selection before the event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solveable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl LogEntry {
    /// Create a new entry stamped with the current UTC time.
    pub fn new(event: EventType, severity: Severity) -> Self {
        Self {
            ts: format_utc_now(),
            event,
            severity,
            tree_id: None,
            selected: None,
            from: None,
            command: None,
            direction: None,
            outcome: None,
            steps: None,
            node_count: None,
            solveable: None,
            config_hash: None,
            duration_ms: None,
            error_code: None,
            error_message: None,
            details: None,
        }
    }
}

/// Settings for the JSONL writer.
#[derive(Debug, Clone)]
pub struct JsonlConfig {
    /// Primary log file path.
    pub path: PathBuf,
    /// Optional fallback path (e.g. on a different filesystem).
    pub fallback_path: Option<PathBuf>,
    /// Maximum file size before rotation (bytes).
    pub max_size_bytes: u64,
    /// Number of rotated files to keep.
    pub max_rotated_files: u32,
    /// Seconds between forced fsync calls.
    pub fsync_interval_secs: u64,
}

impl Default for JsonlConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl JsonlConfig {
    /// Writer settings from the effective configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            path: config.paths.jsonl_log.clone(),
            fallback_path: config.logging.fallback_path.clone(),
            max_size_bytes: config.logging.max_size_bytes,
            max_rotated_files: config.logging.max_rotated_files,
            fsync_interval_secs: config.logging.fsync_interval_secs,
        }
    }
}

/// Which link of the fallback chain a file sink belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tier {
    Primary,
    Fallback,
}

/// Where lines currently go.
#[derive(Debug)]
enum Sink {
    File {
        tier: Tier,
        writer: BufWriter<File>,
        /// Size of the open file, including buffered bytes.
        size: u64,
    },
    Stderr,
    Discard,
}

/// Append-only JSONL writer with size-based rotation and a fallback chain.
#[derive(Debug)]
pub struct JsonlWriter {
    config: JsonlConfig,
    sink: Sink,
    last_fsync: Instant,
}

impl JsonlWriter {
    /// Open the log. Never fails: an unusable primary path degrades down the
    /// chain immediately.
    pub fn open(config: JsonlConfig) -> Self {
        let sink = open_file_sink(&config, Tier::Primary)
            .or_else(|| open_file_sink(&config, Tier::Fallback))
            .unwrap_or_else(|| {
                let _ = writeln!(
                    io::stderr(),
                    "[STX-JSONL] no writable log file, writing to stderr"
                );
                Sink::Stderr
            });
        if let Sink::File {
            tier: Tier::Fallback,
            ..
        } = sink
        {
            let _ = writeln!(
                io::stderr(),
                "[STX-JSONL] primary log path unusable, using fallback"
            );
        }
        Self {
            config,
            sink,
            last_fsync: Instant::now(),
        }
    }

    /// Serialize `entry` and append it as one line.
    pub fn write_entry(&mut self, entry: &LogEntry) {
        match serde_json::to_string(entry) {
            Ok(mut line) => {
                line.push('\n');
                self.write_line(&line);
            }
            Err(e) => {
                let _ = writeln!(io::stderr(), "[STX-JSONL] serialize error: {e}");
            }
        }
    }

    pub fn flush(&mut self) {
        if let Sink::File { writer, .. } = &mut self.sink {
            let _ = writer.flush();
        }
    }

    /// Flush and sync file data to disk.
    pub fn fsync(&mut self) {
        if let Sink::File { writer, .. } = &mut self.sink {
            let _ = writer.flush();
            let _ = writer.get_ref().sync_data();
        }
        self.last_fsync = Instant::now();
    }

    /// Current link of the fallback chain: `normal`, `fallback`, `stderr` or
    /// `discard`.
    pub fn state(&self) -> &'static str {
        match self.sink {
            Sink::File {
                tier: Tier::Primary,
                ..
            } => "normal",
            Sink::File {
                tier: Tier::Fallback,
                ..
            } => "fallback",
            Sink::Stderr => "stderr",
            Sink::Discard => "discard",
        }
    }

    /// Bytes in the current log file.
    pub fn bytes_written(&self) -> u64 {
        match self.sink {
            Sink::File { size, .. } => size,
            _ => 0,
        }
    }

    /// Return to the primary path if it became usable again.
    pub fn try_recover(&mut self) {
        if self.state() == "normal" {
            return;
        }
        if let Some(sink) = open_file_sink(&self.config, Tier::Primary) {
            self.flush();
            self.sink = sink;
            let _ = writeln!(
                io::stderr(),
                "[STX-JSONL] recovered to primary path: {}",
                self.config.path.display()
            );
        }
    }

    fn write_line(&mut self, line: &str) {
        let len = line.len() as u64;
        if let Sink::File { size, .. } = self.sink
            && size > 0
            && size + len > self.config.max_size_bytes
        {
            self.rotate();
        }

        let failed = match &mut self.sink {
            Sink::File { writer, size, .. } => {
                let ok = writer.write_all(line.as_bytes()).is_ok();
                if ok {
                    *size += len;
                }
                !ok
            }
            Sink::Stderr => {
                let _ = write!(io::stderr(), "[STX-JSONL] {line}");
                false
            }
            Sink::Discard => false,
        };

        if failed {
            self.degrade();
            self.write_line(line);
            return;
        }
        if self.last_fsync.elapsed().as_secs() >= self.config.fsync_interval_secs {
            self.fsync();
        }
    }

    /// Move one link down the chain.
    fn degrade(&mut self) {
        self.sink = match self.sink {
            Sink::File {
                tier: Tier::Primary,
                ..
            } => open_file_sink(&self.config, Tier::Fallback).unwrap_or(Sink::Stderr),
            Sink::File {
                tier: Tier::Fallback,
                ..
            } => Sink::Stderr,
            Sink::Stderr | Sink::Discard => Sink::Discard,
        };
        let _ = writeln!(io::stderr(), "[STX-JSONL] write failed, now {}", self.state());
    }

    /// Shift `log.N` → `log.N+1`, dropping the oldest, then start a fresh file.
    fn rotate(&mut self) {
        let tier = match &mut self.sink {
            Sink::File { tier, writer, .. } => {
                let _ = writer.flush();
                *tier
            }
            _ => return,
        };
        let base = match tier {
            Tier::Primary => self.config.path.clone(),
            Tier::Fallback => match &self.config.fallback_path {
                Some(path) => path.clone(),
                None => return,
            },
        };

        let keep = self.config.max_rotated_files;
        let _ = fs::remove_file(rotated_name(&base, keep));
        for generation in (1..keep).rev() {
            let _ = fs::rename(rotated_name(&base, generation), rotated_name(&base, generation + 1));
        }
        let _ = fs::rename(&base, rotated_name(&base, 1));

        match open_file_sink(&self.config, tier) {
            Some(sink) => self.sink = sink,
            None => self.degrade(),
        }
    }
}

impl Drop for JsonlWriter {
    fn drop(&mut self) {
        self.flush();
    }
}

// ──────────────────────── helpers ────────────────────────

fn open_file_sink(config: &JsonlConfig, tier: Tier) -> Option<Sink> {
    let path = match tier {
        Tier::Primary => &config.path,
        Tier::Fallback => config.fallback_path.as_ref()?,
    };
    let (file, size) = open_append(path).ok()?;
    Some(Sink::File {
        tier,
        writer: BufWriter::with_capacity(WRITE_BUFFER_BYTES, file),
        size,
    })
}

/// Open or create a file for appending. Returns `(File, current_size)`.
fn open_append(path: &Path) -> Result<(File, u64)> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| StxError::io(parent, source))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| StxError::io(path, source))?;
    let size = file.metadata().map_or(0, |m| m.len());
    Ok((file, size))
}

/// `activity.jsonl` → `activity.jsonl.3`.
fn rotated_name(base: &Path, generation: u32) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(format!(".{generation}"));
    PathBuf::from(name)
}

/// Current UTC time as RFC 3339 with milliseconds.
pub fn format_utc_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

// ──────────────────────── tests ────────────────────────
