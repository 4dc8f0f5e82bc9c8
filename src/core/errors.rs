//! STX-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::tree::index::StructuralError;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, StxError>;

/// Top-level error type for the search tree explorer.
#[derive(Debug, Error)]
pub enum StxError {
    #[error("[STX-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[STX-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[STX-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[STX-2001] malformed tree {tree_id:?}: {source}")]
    Structural {
        tree_id: String,
        #[source]
        source: StructuralError,
    },

    #[error("[STX-2002] unknown command {name:?}")]
    UnknownCommand { name: String },

    #[error("[STX-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[STX-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[STX-3003] channel closed in component {component}")]
    ChannelClosed { component: &'static str },

    #[error("[STX-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl StxError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "STX-1001",
            Self::MissingConfig { .. } => "STX-1002",
            Self::ConfigParse { .. } => "STX-1003",
            Self::Structural { .. } => "STX-2001",
            Self::UnknownCommand { .. } => "STX-2002",
            Self::Serialization { .. } => "STX-2101",
            Self::Io { .. } => "STX-3002",
            Self::ChannelClosed { .. } => "STX-3003",
            Self::Runtime { .. } => "STX-3900",
        }
    }

    /// Whether retrying might resolve the failure.
    ///
    /// Malformed trees and unknown commands are contract violations: feeding
    /// the same input again fails the same way.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Io { .. } | Self::ChannelClosed { .. } | Self::Runtime { .. }
        )
    }

    /// Identifier of the tree this error is about, when there is one.
    #[must_use]
    pub fn tree_id(&self) -> Option<&str> {
        match self {
            Self::Structural { tree_id, .. } => Some(tree_id),
            _ => None,
        }
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Wrap a structural violation with the identifier of the offending tree.
    #[must_use]
    pub fn structural(tree_id: impl Into<String>, source: StructuralError) -> Self {
        Self::Structural {
            tree_id: tree_id.into(),
            source,
        }
    }
}

impl From<serde_json::Error> for StxError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for StxError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

impl From<toml::ser::Error> for StxError {
    fn from(value: toml::ser::Error) -> Self {
        Self::Serialization {
            context: "toml",
            details: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_variants() -> Vec<StxError> {
        vec![
            StxError::InvalidConfig {
                details: String::new(),
            },
            StxError::MissingConfig {
                path: PathBuf::new(),
            },
            StxError::ConfigParse {
                context: "",
                details: String::new(),
            },
            StxError::structural("t", StructuralError::MissingRoot),
            StxError::UnknownCommand {
                name: String::new(),
            },
            StxError::Serialization {
                context: "",
                details: String::new(),
            },
            StxError::Io {
                path: PathBuf::new(),
                source: std::io::Error::other("test"),
            },
            StxError::ChannelClosed { component: "" },
            StxError::Runtime {
                details: String::new(),
            },
        ]
    }

    #[test]
    fn error_codes_are_unique() {
        let errors = all_variants();
        let codes: Vec<&str> = errors.iter().map(StxError::code).collect();
        let unique: std::collections::HashSet<&&str> = codes.iter().collect();
        assert_eq!(
            codes.len(),
            unique.len(),
            "error codes must be unique: {codes:?}"
        );
    }

    #[test]
    fn error_codes_have_stx_prefix() {
        for err in &all_variants() {
            assert!(
                err.code().starts_with("STX-"),
                "code {} must start with STX-",
                err.code()
            );
        }
    }

    #[test]
    fn error_display_includes_code() {
        for err in &all_variants() {
            let msg = err.to_string();
            assert!(
                msg.contains(err.code()),
                "display should contain error code: {msg}"
            );
        }
    }

    #[test]
    fn structural_display_names_tree_and_violation() {
        let err = StxError::structural(
            "run-7",
            StructuralError::DanglingParent {
                id: 4,
                parent_id: 99,
            },
        );
        let msg = err.to_string();
        assert!(msg.contains("run-7"), "missing tree id: {msg}");
        assert!(msg.contains("99"), "missing dangling parent: {msg}");
    }

    #[test]
    fn retryable_errors_are_correct() {
        assert!(StxError::io("/tmp/x", std::io::Error::other("test")).is_retryable());
        assert!(StxError::ChannelClosed { component: "runner" }.is_retryable());
        assert!(
            StxError::Runtime {
                details: String::new()
            }
            .is_retryable()
        );

        assert!(!StxError::structural("t", StructuralError::MissingRoot).is_retryable());
        assert!(
            !StxError::UnknownCommand {
                name: "fly".into()
            }
            .is_retryable()
        );
        assert!(
            !StxError::InvalidConfig {
                details: String::new()
            }
            .is_retryable()
        );
    }

    #[test]
    fn io_convenience_constructor() {
        let err = StxError::io(
            "/tmp/core.json",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(err.code(), "STX-3002");
        assert!(err.to_string().contains("/tmp/core.json"));
    }

    #[test]
    fn from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: StxError = json_err.into();
        assert_eq!(err.code(), "STX-2101");
    }

    #[test]
    fn from_toml_error() {
        let toml_err = toml::from_str::<toml::Value>("= invalid").unwrap_err();
        let err: StxError = toml_err.into();
        assert_eq!(err.code(), "STX-1003");
    }
}
