//! Error types for the formatting pipeline.

use crate::types::ZoneTag;
use std::io;
use thiserror::Error;

/// Result type alias for paperfmt operations.
pub type Result<T> = std::result::Result<T, FormatError>;

#[derive(Error, Debug)]
pub enum FormatError {
    /// A zone has no matching rule and the formatting spec declares no default.
    /// Fatal only when the zone is mandatory; otherwise it is reported as a
    /// skipped paragraph.
    #[error("No formatting rule for {tag} at paragraph {paragraph} (and no default rule)")]
    SpecMismatch { paragraph: usize, tag: ZoneTag },

    /// Paragraph or run structure cannot be safely mutated.
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    /// Formatting spec is inconsistent (e.g. a rule with a non-positive size).
    #[error("Invalid formatting spec: {0}")]
    Config(String),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Failure reported by an external collaborator (codec, hint provider).
    #[error(transparent)]
    External(#[from] anyhow::Error),
}

impl FormatError {
    /// Paragraph index for errors scoped to a single paragraph.
    pub fn paragraph(&self) -> Option<usize> {
        match self {
            FormatError::SpecMismatch { paragraph, .. } => Some(*paragraph),
            _ => None,
        }
    }
}
