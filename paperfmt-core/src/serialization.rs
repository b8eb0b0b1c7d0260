use crate::error::{FormatError, Result};
use crate::processor::FormatOutcome;
use crate::rules::engine::text_preview;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One row of a tag dump.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TagEntry {
    pub index: usize,
    pub tag: ZoneTag,
    pub source: ZoneSource,
    pub text: String,
}

/// Paragraph-by-paragraph view of a classification, for `--dump-tags`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TagListing {
    pub format: String,
    pub fingerprint: String,
    pub distribution: ZoneDistribution,
    pub entries: Vec<TagEntry>,
}

impl TagListing {
    pub fn new(document: &Document, tags: &TagMap) -> Self {
        let entries = document
            .paragraphs()
            .iter()
            .zip(tags.iter())
            .map(|(paragraph, (index, classification))| TagEntry {
                index,
                tag: classification.tag,
                source: classification.source,
                text: text_preview(&paragraph.text, 60),
            })
            .collect();

        Self {
            format: "tags".to_string(),
            fingerprint: tags.fingerprint(),
            distribution: tags.distribution(),
            entries,
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }
}

/// Compact form of a run: counts instead of per-paragraph lists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutcomeSummary {
    pub format: String,
    pub run_id: String,
    pub spec_name: String,
    pub tag_fingerprint: String,
    pub applied: usize,
    pub changed: usize,
    pub skipped: usize,
    pub warnings: Vec<String>,
    pub quality_score: f32,
    pub zone_distribution: ZoneDistribution,
}

impl FormatOutcome {
    pub fn to_summary_format(&self) -> OutcomeSummary {
        OutcomeSummary {
            format: "summary".to_string(),
            run_id: self.run_id.to_string(),
            spec_name: self.spec_name.clone(),
            tag_fingerprint: self.tag_fingerprint.clone(),
            applied: self.report.applied.len(),
            changed: self.report.changed_count(),
            skipped: self.report.skipped.len(),
            warnings: self.report.warnings(),
            quality_score: self.validation.quality_score,
            zone_distribution: self.zone_distribution.clone(),
        }
    }

    pub fn save_with_format(&self, path: impl AsRef<Path>, format: &str) -> Result<()> {
        let json = match format {
            "summary" => serde_json::to_string_pretty(&self.to_summary_format())?,
            "report" => serde_json::to_string_pretty(self)?,
            other => {
                return Err(FormatError::Config(format!(
                    "unknown report format '{other}' (expected 'report' or 'summary')"
                )))
            }
        };
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }
}
