// Document codec abstraction
//
// This module defines the boundary between on-disk containers and the in-memory
// paragraph model. Everything after `read` works with `Document` and is
// format-agnostic; `write` persists the mutated model back.

use crate::types::Document;
use anyhow::{Context, Result};
use std::path::Path;

/// Reads and writes documents in one container format.
///
/// Codecs handle:
/// - container parsing (JSON here; word-processor formats plug in behind the same trait)
/// - mapping paragraph and run properties onto the model
/// - writing the mutated model back without touching unrelated content
pub trait DocumentCodec {
    fn read(&self, path: &Path) -> Result<Document>;

    fn write(&self, document: &Document, path: &Path) -> Result<()>;

    /// Codec name for debugging/logging
    fn name(&self) -> &str;

    /// Check if the codec supports the given file type
    fn supports_file_type(&self, path: &Path) -> bool;
}

/// The document model serialized as pretty JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl DocumentCodec for JsonCodec {
    fn read(&self, path: &Path) -> Result<Document> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut document: Document = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse document JSON in {}", path.display()))?;
        document.metadata.source_path = Some(path.display().to_string());
        Ok(document)
    }

    fn write(&self, document: &Document, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(document)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    fn name(&self) -> &str {
        "json"
    }

    fn supports_file_type(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false)
    }
}

impl Document {
    /// Load a JSON document.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        JsonCodec.read(path.as_ref())
    }

    /// Save as JSON. Only called after a successful run.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        JsonCodec.write(self, path.as_ref())
    }
}
