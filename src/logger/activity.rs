//! Typed activity events and the logger that records them.
//!
//! Hosts (the CLI, playback observers) describe what happened as an
//! [`ActivityEvent`]; [`ActivityLog`] turns it into a [`LogEntry`] and hands it
//! to the JSONL writer. A disabled log accepts events and drops them.

#![allow(missing_docs)]

use std::time::Duration;

use crate::core::config::Config;
use crate::core::errors::StxError;
use crate::explorer::model::ExplorerSnapshot;
use crate::playback::controller::{PlaybackOutcome, PlaybackReport};
use crate::tree::node::NodeId;

use super::jsonl::{EventType, JsonlConfig, JsonlWriter, LogEntry, Severity};

/// Events recorded in the activity log.
#[derive(Debug, Clone)]
pub enum ActivityEvent {
    ConfigLoaded {
        config_hash: String,
        path: String,
    },
    TreeLoaded {
        tree_id: String,
        node_count: usize,
        solveable: bool,
    },
    TreeRejected {
        tree_id: String,
        code: String,
        message: String,
    },
    CommandApplied {
        tree_id: String,
        command: String,
        from: NodeId,
        to: NodeId,
    },
    PlaybackStarted {
        tree_id: String,
        direction: String,
        from: NodeId,
    },
    PlaybackFinished {
        tree_id: String,
        report: PlaybackReport,
        selected: NodeId,
        elapsed: Duration,
    },
    Error {
        code: String,
        message: String,
    },
}

impl ActivityEvent {
    /// `TreeLoaded` from a session snapshot.
    #[must_use]
    pub fn tree_loaded(snapshot: &ExplorerSnapshot) -> Self {
        Self::TreeLoaded {
            tree_id: snapshot.tree_id.clone(),
            node_count: snapshot.total_node_count,
            solveable: snapshot.solveable,
        }
    }

    /// `TreeRejected` for a tree that failed validation. Errors that name no
    /// tree fall back to a plain `Error`.
    #[must_use]
    pub fn tree_rejected(error: &StxError) -> Self {
        match error.tree_id() {
            Some(tree_id) => Self::TreeRejected {
                tree_id: tree_id.to_string(),
                code: error.code().to_string(),
                message: error.to_string(),
            },
            None => Self::error(error),
        }
    }

    /// `Error` from any crate error.
    #[must_use]
    pub fn error(error: &StxError) -> Self {
        Self::Error {
            code: error.code().to_string(),
            message: error.to_string(),
        }
    }

    /// Flatten into a log line.
    #[must_use]
    pub fn to_entry(&self) -> LogEntry {
        match self {
            Self::ConfigLoaded { config_hash, path } => {
                let mut entry = LogEntry::new(EventType::ConfigLoaded, Severity::Info);
                entry.config_hash = Some(config_hash.clone());
                entry.details = Some(path.clone());
                entry
            }
            Self::TreeLoaded {
                tree_id,
                node_count,
                solveable,
            } => {
                let mut entry = LogEntry::new(EventType::TreeLoaded, Severity::Info);
                entry.tree_id = Some(tree_id.clone());
                entry.node_count = Some(*node_count);
                entry.solveable = Some(*solveable);
                entry
            }
            Self::TreeRejected {
                tree_id,
                code,
                message,
            } => {
                let mut entry = LogEntry::new(EventType::TreeRejected, Severity::Warning);
                entry.tree_id = Some(tree_id.clone());
                entry.error_code = Some(code.clone());
                entry.error_message = Some(message.clone());
                entry
            }
            Self::CommandApplied {
                tree_id,
                command,
                from,
                to,
            } => {
                let mut entry = LogEntry::new(EventType::CommandApplied, Severity::Info);
                entry.tree_id = Some(tree_id.clone());
                entry.command = Some(command.clone());
                entry.from = Some(*from);
                entry.selected = Some(*to);
                entry
            }
            Self::PlaybackStarted {
                tree_id,
                direction,
                from,
            } => {
                let mut entry = LogEntry::new(EventType::PlaybackStart, Severity::Info);
                entry.tree_id = Some(tree_id.clone());
                entry.direction = Some(direction.clone());
                entry.from = Some(*from);
                entry
            }
            Self::PlaybackFinished {
                tree_id,
                report,
                selected,
                elapsed,
            } => {
                let severity = match report.outcome {
                    PlaybackOutcome::Stalled => Severity::Warning,
                    PlaybackOutcome::Completed | PlaybackOutcome::Cancelled => Severity::Info,
                };
                let mut entry = LogEntry::new(EventType::PlaybackFinish, severity);
                entry.tree_id = Some(tree_id.clone());
                entry.direction = Some(report.direction.label().to_string());
                entry.outcome = Some(outcome_label(report.outcome).to_string());
                entry.steps = Some(report.steps);
                entry.selected = Some(*selected);
                entry.duration_ms = Some(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX));
                entry
            }
            Self::Error { code, message } => {
                let mut entry = LogEntry::new(EventType::Error, Severity::Error);
                entry.error_code = Some(code.clone());
                entry.error_message = Some(message.clone());
                entry
            }
        }
    }
}

#[must_use]
pub const fn outcome_label(outcome: PlaybackOutcome) -> &'static str {
    match outcome {
        PlaybackOutcome::Completed => "completed",
        PlaybackOutcome::Cancelled => "cancelled",
        PlaybackOutcome::Stalled => "stalled",
    }
}

/// Activity logger; `None` writer means logging is disabled.
#[derive(Debug)]
pub struct ActivityLog {
    writer: Option<JsonlWriter>,
}

impl ActivityLog {
    /// Open the log described by `config`, or a disabled log when
    /// `logging.enabled` is false.
    #[must_use]
    pub fn open(config: &Config) -> Self {
        if !config.logging.enabled {
            return Self::disabled();
        }
        Self {
            writer: Some(JsonlWriter::open(JsonlConfig::from_config(config))),
        }
    }

    #[must_use]
    pub const fn disabled() -> Self {
        Self { writer: None }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.writer.is_some()
    }

    pub fn record(&mut self, event: &ActivityEvent) {
        if let Some(writer) = self.writer.as_mut() {
            writer.write_entry(&event.to_entry());
        }
    }

    pub fn flush(&mut self) {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush();
        }
    }

    /// Fallback-chain state of the underlying writer.
    #[must_use]
    pub fn state(&self) -> &'static str {
        self.writer.as_ref().map_or("disabled", JsonlWriter::state)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::playback::controller::Direction;
    use crate::tree::index::StructuralError;

    fn config_in(dir: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.paths.jsonl_log = dir.join("activity.jsonl");
        config.logging.fallback_path = None;
        config
    }

    #[test]
    fn disabled_log_drops_events() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.logging.enabled = false;
        let mut log = ActivityLog::open(&config);
        assert!(!log.is_enabled());
        assert_eq!(log.state(), "disabled");
        log.record(&ActivityEvent::Error {
            code: "STX-3900".into(),
            message: "boom".into(),
        });
        assert!(!config.paths.jsonl_log.exists());
    }

    #[test]
    fn events_land_in_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let mut log = ActivityLog::open(&config);
        log.record(&ActivityEvent::PlaybackFinished {
            tree_id: "t".into(),
            report: PlaybackReport {
                direction: Direction::Forward,
                outcome: PlaybackOutcome::Stalled,
                steps: 4,
            },
            selected: 9,
            elapsed: Duration::from_millis(42),
        });
        log.flush();

        let raw = fs::read_to_string(&config.paths.jsonl_log).unwrap();
        let line: serde_json::Value = serde_json::from_str(raw.trim()).unwrap();
        assert_eq!(line["event"], "playback_finish");
        assert_eq!(line["severity"], "warning");
        assert_eq!(line["outcome"], "stalled");
        assert_eq!(line["direction"], "forward");
        assert_eq!(line["steps"], 4);
        assert_eq!(line["duration_ms"], 42);
    }

    #[test]
    fn error_event_carries_code() {
        let err = StxError::UnknownCommand { name: "fly".into() };
        let entry = ActivityEvent::error(&err).to_entry();
        assert_eq!(entry.event, EventType::Error);
        assert_eq!(entry.error_code.as_deref(), Some("STX-2002"));
    }

    #[test]
    fn rejected_tree_event_names_the_tree() {
        let err = StxError::structural("bad-tree", StructuralError::MissingRoot);
        let entry = ActivityEvent::tree_rejected(&err).to_entry();
        assert_eq!(entry.event, EventType::TreeRejected);
        assert_eq!(entry.severity, Severity::Warning);
        assert_eq!(entry.tree_id.as_deref(), Some("bad-tree"));
        assert_eq!(entry.error_code.as_deref(), Some("STX-2001"));

        let other = StxError::UnknownCommand { name: "fly".into() };
        let entry = ActivityEvent::tree_rejected(&other).to_entry();
        assert_eq!(entry.event, EventType::Error);
    }

    #[test]
    fn command_event_records_both_ends() {
        let entry = ActivityEvent::CommandApplied {
            tree_id: "t".into(),
            command: "goUp".into(),
            from: 4,
            to: 3,
        }
        .to_entry();
        assert_eq!(entry.from, Some(4));
        assert_eq!(entry.selected, Some(3));
        assert_eq!(entry.command.as_deref(), Some("goUp"));
    }
}
