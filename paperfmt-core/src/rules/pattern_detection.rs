use super::section_detection::{prefix_depth, HeadingDetector};
use crate::config::ClassifierConfig;
use crate::types::{Alignment, Paragraph, ZoneTag};
use regex::Regex;

/// What a text pattern says about a paragraph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    pub tag: ZoneTag,
    /// Marker with no content of its own ("Abstract", "Keywords:")
    pub label_only: bool,
    /// Heading that opens the reference list
    pub opens_references: bool,
}

impl PatternMatch {
    fn zone(tag: ZoneTag) -> Self {
        Self {
            tag,
            label_only: false,
            opens_references: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PatternKind {
    Abstract,
    Keywords,
    ReferencesHeading,
    ReferenceEntry,
}

/// Ordered (regex -> zone) table, evaluated top to bottom. Numbered headings
/// and the centered-title check come after the table.
pub struct PatternTable {
    patterns: Vec<(Regex, PatternKind)>,
    headings: HeadingDetector,
    heading_max_chars: usize,
    title_max_chars: usize,
}

impl PatternTable {
    pub fn new(config: &ClassifierConfig) -> Result<Self, regex::Error> {
        let patterns = vec![
            (
                Regex::new(r"(?is)^\s*(?:abstract\b|摘\s*要)\s*[:：.．—–-]?\s*(?P<rest>.*)$")?,
                PatternKind::Abstract,
            ),
            (
                Regex::new(
                    r"(?is)^\s*(?:key\s*words?\b|index\s+terms\b|关\s*键\s*[词字])\s*[:：.．—–-]?\s*(?P<rest>.*)$",
                )?,
                PatternKind::Keywords,
            ),
            (
                Regex::new(
                    r"(?i)^\s*(?:(?P<num>\d{1,2}(?:\.\d{1,2})*|[IVX]{1,5})[.．、]?\s*)?(?:references|bibliography|works\s+cited|参\s*考\s*文\s*献)\s*[:：]?\s*$",
                )?,
                PatternKind::ReferencesHeading,
            ),
            (
                Regex::new(r"^\s*[\[［]\d{1,3}[\]］]\s*\S")?,
                PatternKind::ReferenceEntry,
            ),
        ];
        Ok(Self {
            patterns,
            headings: HeadingDetector::new()?,
            heading_max_chars: config.heading_max_chars,
            title_max_chars: config.title_max_chars,
        })
    }

    /// First matching text pattern for `paragraph`. `is_first` marks the first
    /// non-empty paragraph of the document (the only title candidate).
    pub fn detect(&self, paragraph: &Paragraph, is_first: bool) -> Option<PatternMatch> {
        let text = paragraph.trimmed_text();

        for (regex, kind) in &self.patterns {
            let Some(caps) = regex.captures(text) else {
                continue;
            };
            let rest_empty = caps
                .name("rest")
                .map(|m| m.as_str().trim().is_empty())
                .unwrap_or(true);
            return Some(match kind {
                PatternKind::Abstract => PatternMatch {
                    label_only: rest_empty,
                    ..PatternMatch::zone(ZoneTag::Abstract)
                },
                PatternKind::Keywords => PatternMatch {
                    label_only: rest_empty,
                    ..PatternMatch::zone(ZoneTag::Keywords)
                },
                PatternKind::ReferencesHeading => {
                    let level = caps.name("num").map(|m| prefix_depth(m.as_str())).unwrap_or(1);
                    PatternMatch {
                        opens_references: true,
                        ..PatternMatch::zone(ZoneTag::SectionHeading { level })
                    }
                }
                PatternKind::ReferenceEntry => PatternMatch::zone(ZoneTag::ReferenceEntry),
            });
        }

        if let Some(prefix) = self.headings.detect(text, self.heading_max_chars) {
            return Some(PatternMatch::zone(ZoneTag::SectionHeading {
                level: prefix.depth,
            }));
        }

        if is_first && self.looks_like_title(paragraph) {
            return Some(PatternMatch::zone(ZoneTag::Title));
        }

        None
    }

    /// Short and centered.
    pub fn looks_like_title(&self, paragraph: &Paragraph) -> bool {
        paragraph.alignment() == Some(Alignment::Center)
            && paragraph.char_len() <= self.title_max_chars
            && !paragraph.trimmed_text().contains('\n')
    }

    /// Whether `text` is a bare "Abstract"/"Keywords" label for `tag`.
    pub fn is_label_only(&self, tag: ZoneTag, text: &str) -> bool {
        let kind = match tag {
            ZoneTag::Abstract => PatternKind::Abstract,
            ZoneTag::Keywords => PatternKind::Keywords,
            _ => return false,
        };
        self.patterns
            .iter()
            .filter(|(_, k)| *k == kind)
            .filter_map(|(regex, _)| regex.captures(text.trim()))
            .any(|caps| caps.name("rest").map_or(true, |m| m.as_str().trim().is_empty()))
    }

    pub fn is_references_heading(&self, text: &str) -> bool {
        self.patterns
            .iter()
            .any(|(regex, kind)| *kind == PatternKind::ReferencesHeading && regex.is_match(text.trim()))
    }

    pub fn heading_detector(&self) -> &HeadingDetector {
        &self.headings
    }

    pub fn heading_max_chars(&self) -> usize {
        self.heading_max_chars
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> PatternTable {
        PatternTable::new(&ClassifierConfig::default()).unwrap()
    }

    fn detect(text: &str) -> Option<PatternMatch> {
        table().detect(&Paragraph::new(3, text), false)
    }

    #[test]
    fn test_abstract_markers() {
        let m = detect("Abstract: We study X.").unwrap();
        assert_eq!(m.tag, ZoneTag::Abstract);
        assert!(!m.label_only);

        let m = detect("摘要：本文研究了格式化问题。").unwrap();
        assert_eq!(m.tag, ZoneTag::Abstract);

        let m = detect("ABSTRACT").unwrap();
        assert!(m.label_only);

        let m = detect("摘  要").unwrap();
        assert!(m.label_only);

        assert_eq!(detect("Abstraction layers are everywhere."), None);
    }

    #[test]
    fn test_keyword_markers() {
        assert_eq!(detect("Keywords: formatting; rules").unwrap().tag, ZoneTag::Keywords);
        assert_eq!(detect("Key words — a, b").unwrap().tag, ZoneTag::Keywords);
        assert_eq!(detect("Index Terms—layout").unwrap().tag, ZoneTag::Keywords);
        assert_eq!(detect("关键词：排版；规则").unwrap().tag, ZoneTag::Keywords);
        assert!(detect("Keywords:").unwrap().label_only);
        assert_eq!(detect("Keynote speakers were invited"), None);
    }

    #[test]
    fn test_reference_markers() {
        let m = detect("References").unwrap();
        assert_eq!(m.tag, ZoneTag::SectionHeading { level: 1 });
        assert!(m.opens_references);

        let m = detect("7. References").unwrap();
        assert!(m.opens_references);

        assert!(detect("参考文献").unwrap().opens_references);

        let m = detect("[12] A. Author. A paper. 2020.").unwrap();
        assert_eq!(m.tag, ZoneTag::ReferenceEntry);
    }

    #[test]
    fn test_numbered_heading_via_table() {
        assert_eq!(
            detect("2.3 Methods").unwrap().tag,
            ZoneTag::SectionHeading { level: 2 }
        );
    }

    #[test]
    fn test_title_needs_first_position_and_center() {
        let t = table();
        let centered = Paragraph::new(0, "A Study of X").with_alignment(Alignment::Center);
        assert_eq!(t.detect(&centered, true).unwrap().tag, ZoneTag::Title);
        assert_eq!(t.detect(&centered, false), None);

        let left = Paragraph::new(0, "A Study of X");
        assert_eq!(t.detect(&left, true), None);
    }

    #[test]
    fn test_label_only_check() {
        let t = table();
        assert!(t.is_label_only(ZoneTag::Abstract, "Abstract"));
        assert!(!t.is_label_only(ZoneTag::Abstract, "Abstract: text"));
        assert!(!t.is_label_only(ZoneTag::BodyText, "Abstract"));
    }
}
