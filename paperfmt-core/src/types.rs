use crate::error::{FormatError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

// ===== DOCUMENT MODEL =====
// The document owns its paragraphs. The classifier only borrows them and the
// rule engine mutates them in place; neither keeps copies.

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Document {
    #[serde(default)]
    pub metadata: DocumentMetadata,
    pub paragraphs: Vec<Paragraph>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub language: Option<String>,
    /// Path the document was read from, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_path: Option<String>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a document of plain paragraphs (one unstyled run each).
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut doc = Self::new();
        for text in texts {
            doc.push_text(text);
        }
        doc
    }

    /// Append a paragraph, fixing up its position index.
    pub fn push(&mut self, mut paragraph: Paragraph) -> &mut Paragraph {
        paragraph.index = self.paragraphs.len();
        self.paragraphs.push(paragraph);
        let last = self.paragraphs.len() - 1;
        &mut self.paragraphs[last]
    }

    pub fn push_text(&mut self, text: impl Into<String>) -> &mut Paragraph {
        self.push(Paragraph::new(0, text))
    }

    pub fn paragraphs(&self) -> &[Paragraph] {
        &self.paragraphs
    }

    pub fn paragraphs_mut(&mut self) -> &mut [Paragraph] {
        &mut self.paragraphs
    }

    pub fn len(&self) -> usize {
        self.paragraphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paragraphs.is_empty()
    }

    /// Check that every paragraph can be safely read and mutated.
    pub fn validate_structure(&self) -> Result<()> {
        for (position, paragraph) in self.paragraphs.iter().enumerate() {
            if paragraph.index != position {
                return Err(FormatError::MalformedDocument(format!(
                    "paragraph at position {} carries index {}",
                    position, paragraph.index
                )));
            }
            paragraph.check_consistency()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Paragraph {
    /// Position in the document (0-based)
    pub index: usize,
    pub text: String,
    /// Paragraph style name from the source document ("Heading 1", "Normal", ...)
    #[serde(default)]
    pub style_name: Option<String>,
    #[serde(default)]
    pub runs: Vec<Run>,
    #[serde(default)]
    pub format: ParagraphFormat,
}

impl Paragraph {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        let text = text.into();
        let runs = if text.is_empty() {
            Vec::new()
        } else {
            vec![Run::new(text.clone())]
        };
        Self {
            index,
            text,
            style_name: None,
            runs,
            format: ParagraphFormat::default(),
        }
    }

    pub fn with_style(mut self, style_name: impl Into<String>) -> Self {
        self.style_name = Some(style_name.into());
        self
    }

    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.format.alignment = Some(alignment);
        self
    }

    /// Replace the runs; the paragraph text becomes their concatenation.
    pub fn with_runs(mut self, runs: Vec<Run>) -> Self {
        self.text = runs.iter().map(|r| r.text.as_str()).collect();
        self.runs = runs;
        self
    }

    /// Whitespace-only paragraphs are never classified or formatted.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn trimmed_text(&self) -> &str {
        self.text.trim()
    }

    /// Character count of the trimmed text (not bytes; CJK titles are short in chars).
    pub fn char_len(&self) -> usize {
        self.text.trim().chars().count()
    }

    pub fn alignment(&self) -> Option<Alignment> {
        self.format.alignment
    }

    fn check_consistency(&self) -> Result<()> {
        if !self.runs.is_empty() {
            let joined: String = self.runs.iter().map(|r| r.text.as_str()).collect();
            if joined != self.text {
                return Err(FormatError::MalformedDocument(format!(
                    "paragraph {}: runs do not concatenate to the paragraph text",
                    self.index
                )));
            }
        }
        for (run_idx, run) in self.runs.iter().enumerate() {
            if let Some(size) = run.style.font_size {
                if !size.is_finite() || size <= 0.0 {
                    return Err(FormatError::MalformedDocument(format!(
                        "paragraph {} run {}: invalid font size {}",
                        self.index, run_idx, size
                    )));
                }
            }
        }
        self.format.check_finite().map_err(|field| {
            FormatError::MalformedDocument(format!(
                "paragraph {}: non-finite {}",
                self.index, field
            ))
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Run {
    pub text: String,
    #[serde(default)]
    pub style: RunStyle,
}

impl Run {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: RunStyle::default(),
        }
    }

    pub fn styled(text: impl Into<String>, style: RunStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}

/// Character-level style. `None` means "inherit from the paragraph style".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RunStyle {
    pub font_family: Option<String>,
    pub font_size: Option<f32>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub color: Option<String>, // "#RRGGBB"
}

/// Paragraph-level format. Sizes and indents are in points.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ParagraphFormat {
    pub alignment: Option<Alignment>,
    /// Line spacing multiple (1.0 = single)
    pub line_spacing: Option<f32>,
    pub space_before: Option<f32>,
    pub space_after: Option<f32>,
    /// Negative values produce a hanging indent
    pub first_line_indent: Option<f32>,
    pub left_indent: Option<f32>,
}

impl ParagraphFormat {
    fn check_finite(&self) -> std::result::Result<(), &'static str> {
        let fields = [
            ("line_spacing", self.line_spacing),
            ("space_before", self.space_before),
            ("space_after", self.space_after),
            ("first_line_indent", self.first_line_indent),
            ("left_indent", self.left_indent),
        ];
        for (name, value) in fields {
            if matches!(value, Some(v) if !v.is_finite()) {
                return Err(name);
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    #[serde(alias = "LEFT")]
    Left,
    #[serde(alias = "CENTER", alias = "centered", alias = "centre")]
    Center,
    #[serde(alias = "RIGHT")]
    Right,
    #[serde(alias = "JUSTIFY", alias = "justified")]
    Justify,
}

// ===== ZONES =====

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ZoneTag {
    Title,
    Abstract,
    Keywords,
    SectionHeading { level: u32 },
    BodyText,
    ReferenceEntry,
    Unclassified,
}

impl ZoneTag {
    pub fn kind(&self) -> ZoneKind {
        match self {
            ZoneTag::Title => ZoneKind::Title,
            ZoneTag::Abstract => ZoneKind::Abstract,
            ZoneTag::Keywords => ZoneKind::Keywords,
            ZoneTag::SectionHeading { .. } => ZoneKind::SectionHeading,
            ZoneTag::BodyText => ZoneKind::BodyText,
            ZoneTag::ReferenceEntry => ZoneKind::ReferenceEntry,
            ZoneTag::Unclassified => ZoneKind::Unclassified,
        }
    }

    pub fn heading_level(&self) -> Option<u32> {
        match self {
            ZoneTag::SectionHeading { level } => Some(*level),
            _ => None,
        }
    }

    /// Zones that belong before the first section heading.
    pub fn is_front_matter(&self) -> bool {
        matches!(self, ZoneTag::Title | ZoneTag::Abstract | ZoneTag::Keywords)
    }
}

impl fmt::Display for ZoneTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZoneTag::SectionHeading { level } => write!(f, "SectionHeading(level {level})"),
            other => write!(f, "{:?}", other.kind()),
        }
    }
}

/// Zone tag without the heading level; used by rule selectors.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ZoneKind {
    Title,
    Abstract,
    Keywords,
    #[serde(alias = "heading")]
    SectionHeading,
    #[serde(alias = "body")]
    BodyText,
    #[serde(alias = "references", alias = "reference")]
    ReferenceEntry,
    Unclassified,
}

/// Which classifier step produced a tag.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ZoneSource {
    EmptyParagraph,
    StyleName,
    Pattern,
    Positional,
    Hint,
    Fallback,
    /// Document carried no recognizable markers at all
    NoMarkers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl ZoneSource {
    pub fn confidence(&self) -> Confidence {
        match self {
            ZoneSource::EmptyParagraph | ZoneSource::StyleName | ZoneSource::Pattern => {
                Confidence::High
            }
            ZoneSource::Hint | ZoneSource::NoMarkers => Confidence::Medium,
            ZoneSource::Positional | ZoneSource::Fallback => Confidence::Low,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Classification {
    pub tag: ZoneTag,
    pub source: ZoneSource,
}

impl Classification {
    pub fn new(tag: ZoneTag, source: ZoneSource) -> Self {
        Self { tag, source }
    }

    pub fn confidence(&self) -> Confidence {
        self.source.confidence()
    }
}

/// Paragraph index -> zone tag. Built once by the classifier (or by a caller
/// supplying its own labels); there are no mutators after construction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TagMap {
    entries: Vec<Classification>,
}

impl TagMap {
    pub(crate) fn from_classifications(entries: Vec<Classification>) -> Self {
        Self { entries }
    }

    /// Labels supplied from outside the classifier.
    pub fn from_tags<I: IntoIterator<Item = ZoneTag>>(tags: I) -> Self {
        Self {
            entries: tags
                .into_iter()
                .map(|tag| Classification::new(tag, ZoneSource::Fallback))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<ZoneTag> {
        self.entries.get(index).map(|c| c.tag)
    }

    pub fn classification(&self, index: usize) -> Option<&Classification> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Classification)> {
        self.entries.iter().enumerate()
    }

    pub fn tags(&self) -> Vec<ZoneTag> {
        self.entries.iter().map(|c| c.tag).collect()
    }

    /// Stable hash of the tag sequence; equal for identical classifications.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for (index, entry) in self.iter() {
            hasher.update(index.to_le_bytes());
            hasher.update(entry.tag.to_string().as_bytes());
            hasher.update([0u8]);
        }
        format!("{:x}", hasher.finalize())
    }

    pub fn distribution(&self) -> ZoneDistribution {
        ZoneDistribution::from_tags(self.entries.iter().map(|c| c.tag))
    }
}

/// Count of paragraphs per zone (heading levels counted separately).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ZoneDistribution {
    pub counts: BTreeMap<String, usize>,
    pub total: usize,
}

impl ZoneDistribution {
    pub fn from_tags<I: IntoIterator<Item = ZoneTag>>(tags: I) -> Self {
        let mut dist = Self::default();
        for tag in tags {
            *dist.counts.entry(tag.to_string()).or_insert(0) += 1;
            dist.total += 1;
        }
        dist
    }

    pub fn count(&self, tag: ZoneTag) -> usize {
        self.counts.get(&tag.to_string()).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_assigns_indices() {
        let doc = Document::from_texts(["a", "b", "c"]);
        let indices: Vec<usize> = doc.paragraphs().iter().map(|p| p.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert!(doc.validate_structure().is_ok());
    }

    #[test]
    fn test_runs_must_concatenate_to_text() {
        let mut doc = Document::new();
        doc.push(Paragraph::new(0, "Hello world"));
        doc.paragraphs[0].runs = vec![Run::new("Hello "), Run::new("there")];

        let err = doc.validate_structure().unwrap_err();
        assert!(matches!(err, FormatError::MalformedDocument(_)));
    }

    #[test]
    fn test_misplaced_index_is_malformed() {
        let mut doc = Document::from_texts(["a", "b"]);
        doc.paragraphs[1].index = 7;
        assert!(matches!(
            doc.validate_structure(),
            Err(FormatError::MalformedDocument(_))
        ));
    }

    #[test]
    fn test_non_finite_spacing_is_malformed() {
        let mut doc = Document::from_texts(["a"]);
        doc.paragraphs[0].format.line_spacing = Some(f32::NAN);
        assert!(doc.validate_structure().is_err());
    }

    #[test]
    fn test_with_runs_rebuilds_text() {
        let p = Paragraph::new(0, "").with_runs(vec![Run::new("摘要："), Run::new("本文")]);
        assert_eq!(p.text, "摘要：本文");
        assert_eq!(p.char_len(), 5);
    }

    #[test]
    fn test_zone_tag_display() {
        assert_eq!(ZoneTag::Title.to_string(), "Title");
        assert_eq!(
            ZoneTag::SectionHeading { level: 2 }.to_string(),
            "SectionHeading(level 2)"
        );
    }

    #[test]
    fn test_fingerprint_tracks_tags() {
        let a = TagMap::from_tags([ZoneTag::Title, ZoneTag::BodyText]);
        let b = TagMap::from_tags([ZoneTag::Title, ZoneTag::BodyText]);
        let c = TagMap::from_tags([ZoneTag::Title, ZoneTag::Abstract]);
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn test_alignment_accepts_uppercase() {
        let a: Alignment = serde_yaml::from_str("CENTER").unwrap();
        assert_eq!(a, Alignment::Center);
        let b: Alignment = serde_yaml::from_str("justify").unwrap();
        assert_eq!(b, Alignment::Justify);
    }
}
