use crate::config::ClassifierConfig;
use crate::error::Result;
use crate::hints::HintSet;
use crate::rules::pattern_detection::PatternTable;
use crate::rules::style_match::StyleTable;
use crate::types::*;

/// Labels every paragraph of a document with exactly one zone tag.
///
/// Classification runs in two passes over a frozen paragraph slice. The first
/// pass looks for confident markers (style names, then text patterns) on each
/// paragraph independently. The second walks the document in order and fills
/// the gaps from position: what came before decides what an unmarked
/// paragraph is. Advisory hints are only consulted for low-confidence gaps.
pub struct ZoneClassifier {
    styles: StyleTable,
    patterns: PatternTable,
    config: ClassifierConfig,
}

/// A confident zone marker found on a single paragraph.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Marker {
    tag: ZoneTag,
    source: ZoneSource,
    label_only: bool,
    opens_references: bool,
}

impl ZoneClassifier {
    pub fn new(config: &ClassifierConfig) -> Result<Self> {
        Ok(Self {
            styles: StyleTable::with_custom(&config.style_tokens),
            patterns: PatternTable::new(config)?,
            config: config.clone(),
        })
    }

    pub fn classify(&self, paragraphs: &[Paragraph], hints: Option<&HintSet>) -> TagMap {
        log::info!("🔍 Classifying {} paragraphs...", paragraphs.len());

        let markers = self.scan_markers(paragraphs);
        if markers.iter().all(Option::is_none) {
            log::info!("📋 No structural markers found, treating document as body text");
            return Self::without_markers(paragraphs);
        }

        let hints = hints.filter(|_| self.config.use_hints);
        let mut walk = ZoneWalk::default();
        let mut entries = Vec::with_capacity(paragraphs.len());

        for (paragraph, marker) in paragraphs.iter().zip(&markers) {
            if paragraph.is_empty() {
                entries.push(Classification::new(
                    ZoneTag::Unclassified,
                    ZoneSource::EmptyParagraph,
                ));
                continue;
            }

            let mut classification = match marker {
                Some(m) => Classification::new(m.tag, m.source),
                None => walk.positional(),
            };

            if classification.confidence() == Confidence::Low {
                if let Some(hint) = hints.and_then(|h| h.get(paragraph.index)) {
                    if !hint.confidence.is_finite()
                        || hint.confidence < self.config.min_hint_confidence
                    {
                        log::debug!(
                            "paragraph {}: hint {} below confidence floor ({:.2})",
                            paragraph.index,
                            hint.tag,
                            hint.confidence
                        );
                    } else if let Some(conflict) = walk.hint_conflict(hint.tag) {
                        log::debug!(
                            "paragraph {}: hint {} rejected ({})",
                            paragraph.index,
                            hint.tag,
                            conflict
                        );
                    } else {
                        classification = Classification::new(hint.tag, ZoneSource::Hint);
                    }
                }
            }

            log::debug!(
                "paragraph {} -> {} ({:?})",
                paragraph.index,
                classification.tag,
                classification.source
            );
            walk.advance(classification, marker.as_ref());
            entries.push(classification);
        }

        let tag_map = TagMap::from_classifications(entries);
        let distribution = tag_map.distribution();
        log::info!("📋 Zones: {:?}", distribution.counts);
        tag_map
    }

    // Pass 1: per-paragraph markers, independent of surrounding zones.
    fn scan_markers(&self, paragraphs: &[Paragraph]) -> Vec<Option<Marker>> {
        let mut seen_text = false;
        paragraphs
            .iter()
            .map(|paragraph| {
                if paragraph.is_empty() {
                    return None;
                }
                let is_first = !seen_text;
                seen_text = true;
                self.style_marker(paragraph, is_first)
                    .or_else(|| self.pattern_marker(paragraph, is_first))
            })
            .collect()
    }

    fn style_marker(&self, paragraph: &Paragraph, is_first: bool) -> Option<Marker> {
        let style_name = paragraph.style_name.as_deref()?;
        let mut tag = self.styles.lookup(style_name)?;
        let text = paragraph.trimmed_text();

        // Papers routinely style their title as Heading 1
        if is_first
            && tag == (ZoneTag::SectionHeading { level: 1 })
            && !self.patterns.heading_detector().has_prefix(text, usize::MAX)
            && !self.patterns.is_references_heading(text)
        {
            tag = ZoneTag::Title;
        }

        Some(Marker {
            tag,
            source: ZoneSource::StyleName,
            label_only: self.patterns.is_label_only(tag, text),
            opens_references: tag.kind() == ZoneKind::SectionHeading
                && self.patterns.is_references_heading(text),
        })
    }

    fn pattern_marker(&self, paragraph: &Paragraph, is_first: bool) -> Option<Marker> {
        let found = self.patterns.detect(paragraph, is_first)?;
        Some(Marker {
            tag: found.tag,
            source: ZoneSource::Pattern,
            label_only: found.label_only,
            opens_references: found.opens_references,
        })
    }

    fn without_markers(paragraphs: &[Paragraph]) -> TagMap {
        let entries = paragraphs
            .iter()
            .map(|paragraph| {
                if paragraph.is_empty() {
                    Classification::new(ZoneTag::Unclassified, ZoneSource::EmptyParagraph)
                } else {
                    Classification::new(ZoneTag::BodyText, ZoneSource::NoMarkers)
                }
            })
            .collect();
        TagMap::from_classifications(entries)
    }
}

/// Document state carried through pass 2.
#[derive(Debug, Default)]
struct ZoneWalk {
    started: bool,
    title_seen: bool,
    front_matter_seen: bool,
    heading_seen: bool,
    in_references: bool,
    /// Zone a marker hands to the next non-empty paragraph: any label-only
    /// marker, or a Keywords marker ahead of the first heading
    pending: Option<ZoneTag>,
}

impl ZoneWalk {
    fn positional(&self) -> Classification {
        use ZoneSource::{Fallback, Positional};
        let (tag, source) = if let Some(tag) = self.pending {
            (tag, Positional)
        } else if self.in_references {
            (ZoneTag::ReferenceEntry, Positional)
        } else if !self.started {
            (ZoneTag::Title, Positional)
        } else if self.heading_seen {
            (ZoneTag::BodyText, Fallback)
        } else if self.title_seen || self.front_matter_seen {
            (ZoneTag::BodyText, Positional)
        } else {
            (ZoneTag::Unclassified, Fallback)
        };
        Classification::new(tag, source)
    }

    fn hint_conflict(&self, tag: ZoneTag) -> Option<&'static str> {
        match tag {
            ZoneTag::Unclassified => Some("hint carries no zone"),
            ZoneTag::Title if self.title_seen => Some("title already assigned"),
            t if t.is_front_matter() && self.heading_seen => {
                Some("front matter after the first section heading")
            }
            ZoneTag::ReferenceEntry if !self.heading_seen => {
                Some("reference entry before any section heading")
            }
            ZoneTag::SectionHeading { level: 0 } => Some("heading level 0"),
            _ => None,
        }
    }

    fn advance(&mut self, classification: Classification, marker: Option<&Marker>) {
        self.started = true;
        self.pending = None;

        match classification.tag {
            ZoneTag::Title => self.title_seen = true,
            ZoneTag::Abstract | ZoneTag::Keywords => self.front_matter_seen = true,
            ZoneTag::SectionHeading { .. } => {
                self.heading_seen = true;
                self.in_references = marker.map_or(false, |m| m.opens_references);
            }
            _ => {}
        }

        if let Some(m) = marker {
            let keywords_run_on = m.tag == ZoneTag::Keywords && !self.heading_seen;
            if classification.tag == m.tag && (m.label_only || keywords_run_on) {
                self.pending = Some(m.tag);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Alignment, Document};

    fn classifier() -> ZoneClassifier {
        ZoneClassifier::new(&ClassifierConfig::default()).unwrap()
    }

    fn paper() -> Document {
        let mut doc = Document::new();
        doc.push(Paragraph::new(0, "A Study of X").with_alignment(Alignment::Center));
        doc.push_text("Jane Doe, Example University");
        doc.push_text("");
        doc.push_text("Abstract");
        doc.push_text("We study X and find Y.");
        doc.push_text("Keywords: formatting; layout");
        doc.push_text("1. Introduction");
        doc.push_text("Documents vary widely in structure.");
        doc.push_text("1.1 Background");
        doc.push_text("Earlier work exists.");
        doc.push_text("References");
        doc.push_text("A. Author. A Paper. 2020.");
        doc.push_text("[2] B. Author. Another Paper. 2021.");
        doc
    }

    #[test]
    fn test_full_paper_zones() {
        let doc = paper();
        let tags = classifier().classify(doc.paragraphs(), None).tags();
        assert_eq!(
            tags,
            vec![
                ZoneTag::Title,
                ZoneTag::BodyText,
                ZoneTag::Unclassified,
                ZoneTag::Abstract,
                ZoneTag::Abstract,
                ZoneTag::Keywords,
                ZoneTag::SectionHeading { level: 1 },
                ZoneTag::BodyText,
                ZoneTag::SectionHeading { level: 2 },
                ZoneTag::BodyText,
                ZoneTag::SectionHeading { level: 1 },
                ZoneTag::ReferenceEntry,
                ZoneTag::ReferenceEntry,
            ]
        );
    }

    #[test]
    fn test_sources_are_recorded() {
        let doc = paper();
        let map = classifier().classify(doc.paragraphs(), None);
        assert_eq!(map.classification(0).unwrap().source, ZoneSource::Pattern);
        assert_eq!(map.classification(1).unwrap().source, ZoneSource::Positional);
        assert_eq!(map.classification(2).unwrap().source, ZoneSource::EmptyParagraph);
        assert_eq!(map.classification(4).unwrap().source, ZoneSource::Positional);
        assert_eq!(map.classification(7).unwrap().source, ZoneSource::Fallback);
        assert_eq!(map.classification(11).unwrap().source, ZoneSource::Positional);
        assert_eq!(map.classification(12).unwrap().source, ZoneSource::Pattern);
    }

    #[test]
    fn test_heading1_styled_first_paragraph_is_title() {
        let mut doc = Document::new();
        doc.push(
            Paragraph::new(0, "A Study of X")
                .with_style("Heading1")
                .with_alignment(Alignment::Center),
        );
        doc.push(Paragraph::new(0, "Introduction").with_style("Heading 1"));
        doc.push_text("Body.");

        let map = classifier().classify(doc.paragraphs(), None);
        assert_eq!(map.get(0), Some(ZoneTag::Title));
        assert_eq!(map.classification(0).unwrap().source, ZoneSource::StyleName);
        assert_eq!(map.get(1), Some(ZoneTag::SectionHeading { level: 1 }));
        assert_eq!(map.get(2), Some(ZoneTag::BodyText));
    }

    #[test]
    fn test_chinese_abstract_with_normal_style() {
        let mut doc = Document::new();
        doc.push(Paragraph::new(0, "论文标题").with_alignment(Alignment::Center));
        doc.push(Paragraph::new(0, "摘要：本文研究了学术论文的自动排版。").with_style("Normal"));
        doc.push(Paragraph::new(0, "关键词：排版；规则").with_style("Normal"));
        doc.push(Paragraph::new(0, "一、引言").with_style("Normal"));

        let tags = classifier().classify(doc.paragraphs(), None).tags();
        assert_eq!(
            tags,
            vec![
                ZoneTag::Title,
                ZoneTag::Abstract,
                ZoneTag::Keywords,
                ZoneTag::SectionHeading { level: 1 },
            ]
        );
    }

    #[test]
    fn test_style_name_outranks_pattern() {
        let mut doc = Document::new();
        doc.push_text("Title");
        doc.push(Paragraph::new(0, "Abstract: a summary").with_style("Heading 2"));

        let map = classifier().classify(doc.paragraphs(), None);
        assert_eq!(map.get(1), Some(ZoneTag::SectionHeading { level: 2 }));
        assert_eq!(map.classification(1).unwrap().source, ZoneSource::StyleName);
    }

    #[test]
    fn test_label_only_keywords_pulls_next_paragraph() {
        let doc = Document::from_texts(["Keywords", "", "layout, rules", "1 Methods", "Text."]);
        let tags = classifier().classify(doc.paragraphs(), None).tags();
        assert_eq!(tags[0], ZoneTag::Keywords);
        assert_eq!(tags[1], ZoneTag::Unclassified);
        assert_eq!(tags[2], ZoneTag::Keywords);
        assert_eq!(tags[3], ZoneTag::SectionHeading { level: 1 });
        assert_eq!(tags[4], ZoneTag::BodyText);
    }

    #[test]
    fn test_inline_keywords_pull_next_paragraph() {
        let mut doc = Document::new();
        doc.push(Paragraph::new(0, "A Study of X").with_alignment(Alignment::Center));
        doc.push_text("Abstract: We study X.");
        doc.push_text("Keywords: formatting; layout;");
        doc.push_text("typography, rules");
        doc.push_text("1. Introduction");
        doc.push_text("Keywords: late");
        doc.push_text("Not a keyword line.");

        let map = classifier().classify(doc.paragraphs(), None);
        assert_eq!(map.get(3), Some(ZoneTag::Keywords));
        assert_eq!(map.classification(3).unwrap().source, ZoneSource::Positional);
        assert_eq!(map.get(4), Some(ZoneTag::SectionHeading { level: 1 }));
        // only ahead of the first heading
        assert_eq!(map.get(6), Some(ZoneTag::BodyText));
    }

    #[test]
    fn test_unmarked_paragraph_after_title_is_body_text() {
        let mut doc = Document::new();
        doc.push(Paragraph::new(0, "A Study of X").with_alignment(Alignment::Center));
        doc.push_text("Jane Doe, Example University");
        doc.push_text("Abstract: We study X.");
        doc.push_text("1. Introduction");

        let map = classifier().classify(doc.paragraphs(), None);
        assert_eq!(map.get(1), Some(ZoneTag::BodyText));
        assert_eq!(map.classification(1).unwrap().source, ZoneSource::Positional);
    }

    #[test]
    fn test_unmarked_paragraph_between_abstract_and_heading() {
        let doc = Document::from_texts(["Abstract: x", "more abstract prose", "1 Intro"]);
        let map = classifier().classify(doc.paragraphs(), None);
        assert_eq!(map.get(0), Some(ZoneTag::Abstract));
        assert_eq!(map.get(1), Some(ZoneTag::BodyText));
        assert_eq!(map.classification(1).unwrap().source, ZoneSource::Positional);
        assert_eq!(map.get(2), Some(ZoneTag::SectionHeading { level: 1 }));
    }

    #[test]
    fn test_unclassified_only_before_any_marker() {
        let doc = Document::from_texts(["[1] A. Author. Paper.", "stray line", "1 Intro"]);
        let map = classifier().classify(doc.paragraphs(), None);
        assert_eq!(map.get(1), Some(ZoneTag::Unclassified));
        assert_eq!(map.classification(1).unwrap().source, ZoneSource::Fallback);
    }

    #[test]
    fn test_document_without_markers_is_all_body_text() {
        let doc = Document::from_texts([
            "just some words",
            "",
            "more plain prose without structure",
            "and a final line",
        ]);
        let map = classifier().classify(doc.paragraphs(), None);
        assert_eq!(
            map.tags(),
            vec![
                ZoneTag::BodyText,
                ZoneTag::Unclassified,
                ZoneTag::BodyText,
                ZoneTag::BodyText,
            ]
        );
        assert_eq!(map.classification(0).unwrap().source, ZoneSource::NoMarkers);
    }

    #[test]
    fn test_hints_ignored_without_markers() {
        let doc = Document::from_texts(["plain", "prose"]);
        let hints = HintSet::new().with(0, ZoneTag::Title, 0.99);
        let map = classifier().classify(doc.paragraphs(), Some(&hints));
        assert_eq!(map.get(0), Some(ZoneTag::BodyText));
    }

    #[test]
    fn test_classification_is_deterministic() {
        let doc = paper();
        let hints = HintSet::new().with(1, ZoneTag::Abstract, 0.9);
        let c = classifier();
        let first = c.classify(doc.paragraphs(), Some(&hints));
        for _ in 0..5 {
            let again = c.classify(doc.paragraphs(), Some(&hints));
            assert_eq!(again, first);
            assert_eq!(again.fingerprint(), first.fingerprint());
        }
    }

    #[test]
    fn test_hint_fills_low_confidence_gap() {
        let doc = paper();
        let hints = HintSet::new().with(1, ZoneTag::Abstract, 0.9);
        let map = classifier().classify(doc.paragraphs(), Some(&hints));
        assert_eq!(map.get(1), Some(ZoneTag::Abstract));
        assert_eq!(map.classification(1).unwrap().source, ZoneSource::Hint);
    }

    #[test]
    fn test_conflicting_or_weak_hints_rejected() {
        let doc = paper();
        let c = classifier();

        // second title
        let hints = HintSet::new().with(1, ZoneTag::Title, 0.95);
        assert_eq!(c.classify(doc.paragraphs(), Some(&hints)).get(1), Some(ZoneTag::BodyText));

        // reference entry before any heading
        let hints = HintSet::new().with(1, ZoneTag::ReferenceEntry, 0.95);
        assert_eq!(c.classify(doc.paragraphs(), Some(&hints)).get(1), Some(ZoneTag::BodyText));

        // front matter after the first heading
        let hints = HintSet::new().with(7, ZoneTag::Abstract, 0.95);
        assert_eq!(c.classify(doc.paragraphs(), Some(&hints)).get(7), Some(ZoneTag::BodyText));

        // below the floor
        let hints = HintSet::new().with(1, ZoneTag::Abstract, 0.3);
        assert_eq!(c.classify(doc.paragraphs(), Some(&hints)).get(1), Some(ZoneTag::BodyText));

        // not a number
        let hints = HintSet::new().with(1, ZoneTag::Abstract, f32::NAN);
        let map = c.classify(doc.paragraphs(), Some(&hints));
        assert_eq!(map.get(1), Some(ZoneTag::BodyText));
        assert_eq!(map.classification(1).unwrap().source, ZoneSource::Positional);
    }

    #[test]
    fn test_hints_never_override_confident_matches() {
        let doc = paper();
        let hints = HintSet::new()
            .with(6, ZoneTag::BodyText, 1.0)
            .with(5, ZoneTag::Abstract, 1.0)
            .with(2, ZoneTag::BodyText, 1.0);
        let map = classifier().classify(doc.paragraphs(), Some(&hints));
        assert_eq!(map.get(6), Some(ZoneTag::SectionHeading { level: 1 }));
        assert_eq!(map.get(5), Some(ZoneTag::Keywords));
        assert_eq!(map.get(2), Some(ZoneTag::Unclassified));
    }

    #[test]
    fn test_hints_disabled_by_config() {
        let config = ClassifierConfig {
            use_hints: false,
            ..Default::default()
        };
        let c = ZoneClassifier::new(&config).unwrap();
        let doc = paper();
        let hints = HintSet::new().with(1, ZoneTag::Abstract, 0.9);
        assert_eq!(c.classify(doc.paragraphs(), Some(&hints)).get(1), Some(ZoneTag::BodyText));
    }

    #[test]
    fn test_heading_levels_follow_prefix_depth() {
        let doc = Document::from_texts([
            "1 Overview",
            "1.1.1 Deep Jump",
            "II.1 Setup",
            "（一）数据来源",
        ]);
        let tags = classifier().classify(doc.paragraphs(), None).tags();
        assert_eq!(
            tags,
            vec![
                ZoneTag::SectionHeading { level: 1 },
                ZoneTag::SectionHeading { level: 3 },
                ZoneTag::SectionHeading { level: 2 },
                ZoneTag::SectionHeading { level: 2 },
            ]
        );
    }

    #[test]
    fn test_custom_style_tokens() {
        let config = ClassifierConfig {
            style_tokens: vec![crate::config::StyleTokenConfig {
                style: "PaperTitle".to_string(),
                zone: ZoneKind::Title,
                level: None,
            }],
            ..Default::default()
        };
        let c = ZoneClassifier::new(&config).unwrap();
        let mut doc = Document::new();
        doc.push_text("Preface line");
        doc.push(Paragraph::new(0, "Real Title").with_style("Paper Title"));
        let map = c.classify(doc.paragraphs(), None);
        assert_eq!(map.get(1), Some(ZoneTag::Title));
    }
}
