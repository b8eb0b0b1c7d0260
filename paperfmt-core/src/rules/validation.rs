use super::engine::{resolve_rule, text_preview};
use crate::config::FormattingSpec;
use crate::types::*;
use serde::{Deserialize, Serialize};

// ConformanceValidator - checks a formatted document against its spec.
// Pure: it reports, it never fixes (heading jumps are not renumbered).
pub struct ConformanceValidator<'a> {
    spec: &'a FormattingSpec,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
    pub quality_score: f32,
    pub total_paragraphs: usize,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationIssue {
    /// A run whose character style differs from its rule
    RunMismatch {
        index: usize,
        run: usize,
        field: String,
    },
    /// Paragraph-level format differs from its rule
    FormatMismatch {
        index: usize,
        field: String,
    },
    /// A heading more than one level deeper than the previous heading
    HeadingLevelJump {
        from_level: u32,
        to_level: u32,
        from_index: usize,
        to_index: usize,
    },
    /// A mandatory zone that no paragraph was classified as
    MissingMandatoryZone { zone: String },
    SuspiciousHeading {
        index: usize,
        text: String,
        reason: String,
    },
}

// Longest text that still reads like a heading
const MAX_HEADING_CHARS: usize = 200;

impl<'a> ConformanceValidator<'a> {
    pub fn new(spec: &'a FormattingSpec) -> Self {
        Self { spec }
    }

    pub fn validate(&self, document: &Document, tags: &TagMap) -> ValidationReport {
        log::info!("🔍 Validating {} paragraphs against '{}'", document.len(), self.spec.name);

        let mut issues = Vec::new();
        let total_paragraphs = document.len();

        // 1. Every styled paragraph matches its rule
        self.validate_conformance(document, tags, &mut issues);

        // 2. Heading hierarchy
        self.validate_heading_levels(document, tags, &mut issues);

        // 3. Mandatory zones present
        self.validate_mandatory_zones(tags, &mut issues);

        // 4. Heading text sanity
        self.validate_heading_quality(document, tags, &mut issues);

        let quality_score = if total_paragraphs == 0 {
            1.0
        } else {
            (1.0 - (issues.len() as f32 / total_paragraphs as f32)).max(0.0)
        };

        let report = ValidationReport {
            issues,
            quality_score,
            total_paragraphs,
        };
        log_validation_report(&report);
        report
    }

    fn validate_conformance(
        &self,
        document: &Document,
        tags: &TagMap,
        issues: &mut Vec<ValidationIssue>,
    ) {
        for (paragraph, (_, classification)) in document.paragraphs().iter().zip(tags.iter()) {
            if paragraph.is_empty() {
                continue;
            }
            let Some((style, _)) = resolve_rule(self.spec, classification.tag) else {
                continue;
            };

            let expected_format = style.paragraph_format();
            let format = &paragraph.format;
            let format_fields = [
                ("alignment", format.alignment == expected_format.alignment),
                ("line_spacing", format.line_spacing == expected_format.line_spacing),
                ("space_before", format.space_before == expected_format.space_before),
                ("space_after", format.space_after == expected_format.space_after),
                (
                    "first_line_indent",
                    format.first_line_indent == expected_format.first_line_indent,
                ),
                ("left_indent", format.left_indent == expected_format.left_indent),
            ];
            for (field, ok) in format_fields {
                if !ok {
                    issues.push(ValidationIssue::FormatMismatch {
                        index: paragraph.index,
                        field: field.to_string(),
                    });
                }
            }

            let expected = style.run_style();
            for (run_idx, run) in paragraph.runs.iter().enumerate() {
                let fields = [
                    ("font_family", run.style.font_family == expected.font_family),
                    ("font_size", run.style.font_size == expected.font_size),
                    ("bold", run.style.bold == expected.bold),
                    ("italic", run.style.italic == expected.italic),
                    ("underline", run.style.underline == expected.underline),
                    ("color", run.style.color == expected.color),
                ];
                if let Some((field, _)) = fields.iter().find(|(_, ok)| !ok) {
                    issues.push(ValidationIssue::RunMismatch {
                        index: paragraph.index,
                        run: run_idx,
                        field: field.to_string(),
                    });
                }
            }
        }
    }

    /// Flag headings that skip levels (1 -> 3)
    fn validate_heading_levels(
        &self,
        document: &Document,
        tags: &TagMap,
        issues: &mut Vec<ValidationIssue>,
    ) {
        let mut previous: Option<(usize, u32)> = None;
        for (paragraph, (_, classification)) in document.paragraphs().iter().zip(tags.iter()) {
            let Some(level) = classification.tag.heading_level() else {
                continue;
            };
            // A document may open at any level; only jumps between headings count
            if let Some((from_index, from_level)) = previous {
                if level > from_level + 1 {
                    issues.push(ValidationIssue::HeadingLevelJump {
                        from_level,
                        to_level: level,
                        from_index,
                        to_index: paragraph.index,
                    });
                }
            }
            previous = Some((paragraph.index, level));
        }
    }

    fn validate_mandatory_zones(&self, tags: &TagMap, issues: &mut Vec<ValidationIssue>) {
        for selector in &self.spec.mandatory {
            let present = tags.iter().any(|(_, c)| selector.matches(c.tag));
            if !present {
                let zone = match selector.level {
                    Some(level) => format!("{:?}(level {})", selector.zone, level),
                    None => format!("{:?}", selector.zone),
                };
                issues.push(ValidationIssue::MissingMandatoryZone { zone });
            }
        }
    }

    fn validate_heading_quality(
        &self,
        document: &Document,
        tags: &TagMap,
        issues: &mut Vec<ValidationIssue>,
    ) {
        for (paragraph, (_, classification)) in document.paragraphs().iter().zip(tags.iter()) {
            if classification.tag.kind() != ZoneKind::SectionHeading {
                continue;
            }
            let len = paragraph.char_len();
            if len > MAX_HEADING_CHARS {
                issues.push(ValidationIssue::SuspiciousHeading {
                    index: paragraph.index,
                    text: text_preview(&paragraph.text, 50),
                    reason: format!("heading text unusually long (> {MAX_HEADING_CHARS} characters)"),
                });
            }
        }
    }
}

/// Log validation results
fn log_validation_report(report: &ValidationReport) {
    log::info!("   📊 Validation Report:");
    log::info!("      📈 Quality Score: {:.2}/1.00", report.quality_score);
    log::info!("      🔍 Issues Found: {}", report.issues.len());

    if report.issues.is_empty() {
        log::info!("      ✅ Document conforms to spec");
        return;
    }

    for issue in &report.issues {
        match issue {
            ValidationIssue::RunMismatch { index, run, field } => {
                log::warn!("         🔤 Run {run} of paragraph {index}: {field} differs from rule");
            }
            ValidationIssue::FormatMismatch { index, field } => {
                log::warn!("         📐 Paragraph {index}: {field} differs from rule");
            }
            ValidationIssue::HeadingLevelJump {
                from_level,
                to_level,
                from_index,
                to_index,
            } => {
                log::warn!(
                    "         📊 Heading jump: Level {} → {} (paragraphs {}-{})",
                    from_level,
                    to_level,
                    from_index,
                    to_index
                );
            }
            ValidationIssue::MissingMandatoryZone { zone } => {
                log::warn!("         🏝️  Mandatory zone missing: {zone}");
            }
            ValidationIssue::SuspiciousHeading {
                index,
                text,
                reason,
            } => {
                log::warn!("         🤔 Suspicious heading at {}: \"{}\" ({})", index, text, reason);
            }
        }
    }
}
