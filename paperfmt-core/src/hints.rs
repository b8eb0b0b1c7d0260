//! Advisory zone hints.
//!
//! Hints come from an external suggester (typically a language model) and are
//! resolved *before* classification runs, so the classifier itself never does
//! I/O. A hint is only a tie-breaker: the classifier consults it for
//! paragraphs its own rules left unclassified or positional, and drops it when
//! it conflicts with the document structure.

use crate::types::{Paragraph, ZoneTag};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ZoneHint {
    pub tag: ZoneTag,
    /// 0.0 - 1.0
    pub confidence: f32,
}

impl ZoneHint {
    pub fn new(tag: ZoneTag, confidence: f32) -> Self {
        Self { tag, confidence }
    }
}

/// Source of advisory suggestions for one paragraph at a time.
pub trait HintProvider {
    /// Suggest a zone for the paragraph at `index`; `Ok(None)` means no opinion.
    fn suggest(&self, index: usize, text: &str) -> Result<Option<ZoneHint>>;

    fn name(&self) -> &str;
}

/// Pre-resolved hints keyed by paragraph index. Ordered so iteration (and
/// therefore classification) is reproducible.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct HintSet {
    hints: BTreeMap<usize, ZoneHint>,
}

impl HintSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, index: usize, hint: ZoneHint) {
        self.hints.insert(index, hint);
    }

    pub fn with(mut self, index: usize, tag: ZoneTag, confidence: f32) -> Self {
        self.insert(index, ZoneHint::new(tag, confidence));
        self
    }

    pub fn get(&self, index: usize) -> Option<&ZoneHint> {
        self.hints.get(&index)
    }

    pub fn len(&self) -> usize {
        self.hints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hints.is_empty()
    }

    /// Ask `provider` about every non-empty paragraph. Provider failures are
    /// logged and skipped; they never fail the run.
    pub fn collect(provider: &dyn HintProvider, paragraphs: &[Paragraph]) -> Self {
        let mut set = Self::new();
        let mut failures = 0usize;
        for paragraph in paragraphs.iter().filter(|p| !p.is_empty()) {
            match provider.suggest(paragraph.index, paragraph.trimmed_text()) {
                Ok(Some(hint)) if hint.confidence.is_finite() => {
                    set.insert(paragraph.index, hint);
                }
                Ok(Some(_)) => {
                    log::debug!(
                        "hint for paragraph {} from {} has non-finite confidence, dropped",
                        paragraph.index,
                        provider.name()
                    );
                }
                Ok(None) => {}
                Err(e) => {
                    failures += 1;
                    log::warn!(
                        "⚠️  Hint provider {} failed on paragraph {}: {}",
                        provider.name(),
                        paragraph.index,
                        e
                    );
                }
            }
        }
        log::info!(
            "💡 Collected {} hints from {} ({} failures)",
            set.len(),
            provider.name(),
            failures
        );
        set
    }
}

/// Hints read from a JSON file: `{ "3": { "tag": "Abstract", "confidence": 0.9 } }`.
#[derive(Debug, Clone, Default)]
pub struct StaticHints {
    hints: HintSet,
}

impl StaticHints {
    pub fn new(hints: HintSet) -> Self {
        Self { hints }
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let hints: HintSet = serde_json::from_str(&content)?;
        Ok(Self { hints })
    }
}

impl HintProvider for StaticHints {
    fn suggest(&self, index: usize, _text: &str) -> Result<Option<ZoneHint>> {
        Ok(self.hints.get(index).copied())
    }

    fn name(&self) -> &str {
        "static"
    }
}
