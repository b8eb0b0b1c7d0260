use crate::config::{FormattingSpec, RuleStyle};
use crate::error::{FormatError, Result};
use crate::types::*;
use regex::Regex;
use serde::{Deserialize, Serialize};

// Debug configuration for tracing paragraphs through a run
#[derive(Debug, Clone, Default)]
pub struct DebugConfig {
    pub enabled: bool,
    pub filter_patterns: Vec<String>,
}

impl DebugConfig {
    pub fn new(enabled: bool, filter_patterns: Vec<String>) -> Self {
        Self {
            enabled,
            filter_patterns,
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }
}

/// Debug utility to trace paragraphs matching the filter patterns
pub fn debug_paragraphs(
    stage: &str,
    paragraphs: &[Paragraph],
    tags: &TagMap,
    debug_config: &DebugConfig,
) {
    if !debug_config.enabled || debug_config.filter_patterns.is_empty() {
        return;
    }

    // Try regex first, fall back to simple string contains
    let filters: Vec<std::result::Result<Regex, &str>> = debug_config
        .filter_patterns
        .iter()
        .map(|pattern| Regex::new(pattern).map_err(|_| pattern.as_str()))
        .collect();

    let matching: Vec<&Paragraph> = paragraphs
        .iter()
        .filter(|p| {
            filters.iter().any(|filter| match filter {
                Ok(regex) => regex.is_match(&p.text),
                Err(needle) => p.text.contains(needle),
            })
        })
        .collect();

    if matching.is_empty() {
        return;
    }

    log::info!("🔍 [{}] {} matching paragraphs:", stage, matching.len());
    for paragraph in matching {
        let tag = tags
            .get(paragraph.index)
            .map(|t| t.to_string())
            .unwrap_or_else(|| "-".to_string());
        let size = paragraph
            .runs
            .first()
            .and_then(|r| r.style.font_size)
            .map(|s| format!("{s:.1}pt"))
            .unwrap_or_else(|| "inherit".to_string());
        log::info!(
            "  Paragraph {}: \"{}\" ({}, style: {}, size: {}, runs: {})",
            paragraph.index,
            text_preview(&paragraph.text, 50),
            tag,
            paragraph.style_name.as_deref().unwrap_or("-"),
            size,
            paragraph.runs.len()
        );
    }
}

pub(crate) fn text_preview(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() > max_chars {
        let cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}

/// Rule for `tag` with its report label: the best matching rule, then the
/// default rule (labelled "default"). The default never covers Unclassified
/// paragraphs.
pub fn resolve_rule(spec: &FormattingSpec, tag: ZoneTag) -> Option<(&RuleStyle, String)> {
    if let Some(rule) = spec.rule_for(tag) {
        return Some((&rule.style, rule.label()));
    }
    if tag == ZoneTag::Unclassified {
        return None;
    }
    spec.default_rule().map(|style| (style, "default".to_string()))
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    EmptyParagraph,
    /// No explicit rule for unclassified paragraphs
    Unclassified,
    /// Neither a matching rule nor a default (non-mandatory zone)
    NoRule,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppliedRule {
    pub index: usize,
    pub tag: ZoneTag,
    pub rule: String,
    /// False when the paragraph already conformed
    pub changed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkippedParagraph {
    pub index: usize,
    pub tag: ZoneTag,
    pub reason: SkipReason,
}

/// What one engine run did to each paragraph.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FormatReport {
    pub spec_name: String,
    pub applied: Vec<AppliedRule>,
    pub skipped: Vec<SkippedParagraph>,
}

impl FormatReport {
    pub fn changed_count(&self) -> usize {
        self.applied.iter().filter(|a| a.changed).count()
    }

    /// Skipped zones that had no rule at all; empty and unclassified
    /// paragraphs are expected skips and do not count.
    pub fn warnings(&self) -> Vec<String> {
        self.skipped
            .iter()
            .filter(|s| s.reason == SkipReason::NoRule)
            .map(|s| {
                FormatError::SpecMismatch {
                    paragraph: s.index,
                    tag: s.tag,
                }
                .to_string()
            })
            .collect()
    }

    pub fn skipped_for(&self, reason: SkipReason) -> impl Iterator<Item = &SkippedParagraph> {
        self.skipped.iter().filter(move |s| s.reason == reason)
    }
}

enum Plan<'a> {
    Apply { style: &'a RuleStyle, label: String },
    Skip(SkipReason),
}

/// Applies a formatting spec to a classified document.
pub struct RuleEngine {
    debug_config: DebugConfig,
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleEngine {
    pub fn new() -> Self {
        Self {
            debug_config: DebugConfig::disabled(),
        }
    }

    pub fn set_debug_config(&mut self, debug_config: DebugConfig) {
        self.debug_config = debug_config;
    }

    pub fn debug_config(&self) -> &DebugConfig {
        &self.debug_config
    }

    /// Format every paragraph of `document` according to its zone tag.
    ///
    /// Rules are resolved for all paragraphs before the first mutation, so
    /// any error leaves the document exactly as it was. Text, paragraph order
    /// and paragraph count are never changed.
    pub fn apply(
        &self,
        document: &mut Document,
        tags: &TagMap,
        spec: &FormattingSpec,
    ) -> Result<FormatReport> {
        log::info!(
            "⚙️  Applying spec '{}' ({} rules) to {} paragraphs",
            spec.name,
            spec.rules.len(),
            document.len()
        );

        document.validate_structure()?;
        if tags.len() != document.len() {
            return Err(FormatError::MalformedDocument(format!(
                "tag map covers {} paragraphs, document has {}",
                tags.len(),
                document.len()
            )));
        }

        let plans = self.plan(document, tags, spec)?;

        let mut report = FormatReport {
            spec_name: spec.name.clone(),
            ..Default::default()
        };
        for ((paragraph, plan), (_, classification)) in
            document.paragraphs_mut().iter_mut().zip(plans).zip(tags.iter())
        {
            let tag = classification.tag;
            match plan {
                Plan::Apply { style, label } => {
                    let changed = apply_style(paragraph, style);
                    log::debug!(
                        "paragraph {} ({}) <- {}{}",
                        paragraph.index,
                        tag,
                        label,
                        if changed { "" } else { " (already conforming)" }
                    );
                    report.applied.push(AppliedRule {
                        index: paragraph.index,
                        tag,
                        rule: label,
                        changed,
                    });
                }
                Plan::Skip(reason) => {
                    report.skipped.push(SkippedParagraph {
                        index: paragraph.index,
                        tag,
                        reason,
                    });
                }
            }
        }

        debug_paragraphs("RuleEngine", document.paragraphs(), tags, &self.debug_config);

        for warning in report.warnings() {
            log::warn!("⚠️  {warning}");
        }
        log::info!(
            "   ✅ {} paragraphs formatted ({} changed), {} skipped",
            report.applied.len(),
            report.changed_count(),
            report.skipped.len()
        );
        Ok(report)
    }

    fn plan<'a>(
        &self,
        document: &Document,
        tags: &TagMap,
        spec: &'a FormattingSpec,
    ) -> Result<Vec<Plan<'a>>> {
        document
            .paragraphs()
            .iter()
            .zip(tags.iter())
            .map(|(paragraph, (_, classification))| {
                let tag = classification.tag;
                if paragraph.is_empty() {
                    return Ok(Plan::Skip(SkipReason::EmptyParagraph));
                }
                match resolve_rule(spec, tag) {
                    Some((style, label)) => Ok(Plan::Apply { style, label }),
                    None if tag == ZoneTag::Unclassified => Ok(Plan::Skip(SkipReason::Unclassified)),
                    None if spec.is_mandatory(tag) => Err(FormatError::SpecMismatch {
                        paragraph: paragraph.index,
                        tag,
                    }),
                    None => Ok(Plan::Skip(SkipReason::NoRule)),
                }
            })
            .collect()
    }
}

/// Set the paragraph format and replace every run's style. Returns whether
/// anything was different before.
fn apply_style(paragraph: &mut Paragraph, style: &RuleStyle) -> bool {
    let mut changed = false;

    let format = style.paragraph_format();
    if paragraph.format != format {
        paragraph.format = format;
        changed = true;
    }

    if paragraph.runs.is_empty() {
        paragraph.runs.push(Run::new(paragraph.text.clone()));
        changed = true;
    }

    let run_style = style.run_style();
    for run in &mut paragraph.runs {
        if run.style != run_style {
            run.style = run_style.clone();
            changed = true;
        }
    }

    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FormattingRule, ZoneSelector};

    fn tags(tags: &[ZoneTag]) -> TagMap {
        TagMap::from_tags(tags.iter().copied())
    }

    #[test]
    fn test_title_rule_applied_to_every_run() {
        let mut doc = Document::new();
        doc.push(
            Paragraph::new(0, "").with_runs(vec![Run::new("A Study "), Run::new("of X")]),
        );
        let spec = FormattingSpec::builtin_default();
        let report = RuleEngine::new()
            .apply(&mut doc, &tags(&[ZoneTag::Title]), &spec)
            .unwrap();

        assert_eq!(report.applied.len(), 1);
        let p = &doc.paragraphs()[0];
        assert_eq!(p.format.alignment, Some(Alignment::Center));
        for run in &p.runs {
            assert_eq!(run.style.font_family.as_deref(), Some("Times New Roman"));
            assert_eq!(run.style.font_size, Some(16.0));
            assert_eq!(run.style.bold, Some(true));
            assert_eq!(run.style.italic, Some(false));
        }
        assert_eq!(p.text, "A Study of X");
    }

    #[test]
    fn test_reapplying_is_a_no_op() {
        let mut doc = Document::from_texts(["Title", "Body text here."]);
        let t = tags(&[ZoneTag::Title, ZoneTag::BodyText]);
        let spec = FormattingSpec::builtin_default();
        let engine = RuleEngine::new();

        let first = engine.apply(&mut doc, &t, &spec).unwrap();
        assert_eq!(first.changed_count(), 2);
        let snapshot = doc.clone();

        let second = engine.apply(&mut doc, &t, &spec).unwrap();
        assert_eq!(second.changed_count(), 0);
        assert_eq!(doc, snapshot);
    }

    #[test]
    fn test_paragraph_without_runs_gets_one() {
        let mut doc = Document::from_texts(["Body"]);
        doc.paragraphs_mut()[0].runs.clear();
        RuleEngine::new()
            .apply(&mut doc, &tags(&[ZoneTag::BodyText]), &FormattingSpec::builtin_default())
            .unwrap();
        let p = &doc.paragraphs()[0];
        assert_eq!(p.runs.len(), 1);
        assert_eq!(p.runs[0].text, "Body");
        assert_eq!(p.runs[0].style.font_size, Some(12.0));
    }

    #[test]
    fn test_empty_and_unclassified_are_skipped() {
        let mut doc = Document::from_texts(["", "Jane Doe"]);
        let before = doc.clone();
        let report = RuleEngine::new()
            .apply(
                &mut doc,
                &tags(&[ZoneTag::Unclassified, ZoneTag::Unclassified]),
                &FormattingSpec::builtin_default(),
            )
            .unwrap();
        assert_eq!(doc, before);
        assert_eq!(report.skipped[0].reason, SkipReason::EmptyParagraph);
        assert_eq!(report.skipped[1].reason, SkipReason::Unclassified);
        assert!(report.warnings().is_empty());
    }

    #[test]
    fn test_explicit_unclassified_rule_is_honoured() {
        let spec = FormattingSpec::new("t").with_rule(FormattingRule::new(
            ZoneSelector::new(ZoneKind::Unclassified),
            RuleStyle::sized(9.0),
        ));
        let mut doc = Document::from_texts(["Jane Doe"]);
        let report = RuleEngine::new()
            .apply(&mut doc, &tags(&[ZoneTag::Unclassified]), &spec)
            .unwrap();
        assert_eq!(report.applied[0].rule, "unclassified");
        assert_eq!(doc.paragraphs()[0].runs[0].style.font_size, Some(9.0));
    }

    #[test]
    fn test_default_rule_covers_unmatched_zone() {
        let spec = FormattingSpec::new("t").with_default(RuleStyle::sized(11.0));
        let mut doc = Document::from_texts(["Abstract: text"]);
        let report = RuleEngine::new()
            .apply(&mut doc, &tags(&[ZoneTag::Abstract]), &spec)
            .unwrap();
        assert_eq!(report.applied[0].rule, "default");
        assert_eq!(doc.paragraphs()[0].runs[0].style.font_size, Some(11.0));
    }

    #[test]
    fn test_missing_rule_for_optional_zone_is_a_warning() {
        let spec = FormattingSpec::new("t").with_rule(FormattingRule::new(
            ZoneSelector::new(ZoneKind::BodyText),
            RuleStyle::sized(12.0),
        ));
        let mut doc = Document::from_texts(["Keywords: a", "Body"]);
        let report = RuleEngine::new()
            .apply(&mut doc, &tags(&[ZoneTag::Keywords, ZoneTag::BodyText]), &spec)
            .unwrap();
        assert_eq!(report.skipped_for(SkipReason::NoRule).count(), 1);
        assert_eq!(report.warnings().len(), 1);
        assert!(report.warnings()[0].contains("paragraph 0"));
        assert_eq!(report.applied.len(), 1);
    }

    #[test]
    fn test_mandatory_zone_without_rule_aborts_untouched() {
        let spec = FormattingSpec::new("t")
            .with_rule(FormattingRule::new(ZoneSelector::heading(1), RuleStyle::sized(14.0)))
            .with_rule(FormattingRule::new(
                ZoneSelector::new(ZoneKind::BodyText),
                RuleStyle::sized(12.0),
            ))
            .with_mandatory(ZoneSelector::heading(3));
        let mut doc = Document::from_texts(["1 Intro", "Text", "1.1.1 Deep"]);
        let before = doc.clone();
        let t = tags(&[
            ZoneTag::SectionHeading { level: 1 },
            ZoneTag::BodyText,
            ZoneTag::SectionHeading { level: 3 },
        ]);

        let err = RuleEngine::new().apply(&mut doc, &t, &spec).unwrap_err();
        match err {
            FormatError::SpecMismatch { paragraph, tag } => {
                assert_eq!(paragraph, 2);
                assert_eq!(tag, ZoneTag::SectionHeading { level: 3 });
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(doc, before);
    }

    #[test]
    fn test_tag_map_length_mismatch_is_malformed() {
        let mut doc = Document::from_texts(["a", "b"]);
        let err = RuleEngine::new()
            .apply(&mut doc, &tags(&[ZoneTag::BodyText]), &FormattingSpec::builtin_default())
            .unwrap_err();
        assert!(matches!(err, FormatError::MalformedDocument(_)));
    }

    #[test]
    fn test_hanging_indent_for_references() {
        let mut doc = Document::from_texts(["[1] A. Author. Title. 2020."]);
        RuleEngine::new()
            .apply(
                &mut doc,
                &tags(&[ZoneTag::ReferenceEntry]),
                &FormattingSpec::builtin_default(),
            )
            .unwrap();
        let format = &doc.paragraphs()[0].format;
        assert_eq!(format.first_line_indent, Some(-24.0));
        assert_eq!(format.left_indent, Some(24.0));
        assert_eq!(doc.paragraphs()[0].runs[0].style.font_size, Some(10.5));
    }

    #[test]
    fn test_text_preview_counts_chars() {
        assert_eq!(text_preview("短文本", 50), "短文本");
        let long = "字".repeat(60);
        assert_eq!(text_preview(&long, 10).chars().count(), 10);
    }
}
