use crate::error::{FormatError, Result};
use crate::types::{Alignment, ParagraphFormat, RunStyle, ZoneKind, ZoneTag};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_font_family() -> String {
    "Times New Roman".to_string()
}

fn default_font_size() -> f32 {
    12.0
}

fn default_line_spacing() -> f32 {
    1.0
}

fn default_spec_name() -> String {
    "custom".to_string()
}

/// Everything a formatting run reads: the rule spec plus classifier tuning.
/// This is the shape of a YAML preset file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FormatConfig {
    #[serde(flatten)]
    pub spec: FormattingSpec,
    #[serde(default)]
    pub classifier: ClassifierConfig,
}

/// Ordered rule set keyed by zone. Read-only for the rule engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FormattingSpec {
    #[serde(default = "default_spec_name")]
    pub name: String,
    /// Rules in declaration order; order breaks precedence ties
    #[serde(default)]
    pub rules: Vec<FormattingRule>,
    /// Applied to any classified zone without a matching rule (never to Unclassified)
    #[serde(default)]
    pub default_rule: Option<RuleStyle>,
    /// Zones whose paragraphs must resolve a rule, or the whole run fails
    #[serde(default)]
    pub mandatory: Vec<ZoneSelector>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FormattingRule {
    #[serde(flatten)]
    pub selector: ZoneSelector,
    /// Higher wins among equally specific candidates
    #[serde(default)]
    pub precedence: i32,
    #[serde(flatten)]
    pub style: RuleStyle,
}

/// Zone kind plus, for headings, an optional level. A selector without a
/// level matches every level of its kind.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ZoneSelector {
    pub zone: ZoneKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
}

impl ZoneSelector {
    pub fn new(zone: ZoneKind) -> Self {
        Self { zone, level: None }
    }

    pub fn heading(level: u32) -> Self {
        Self {
            zone: ZoneKind::SectionHeading,
            level: Some(level),
        }
    }

    pub fn matches(&self, tag: ZoneTag) -> bool {
        if self.zone != tag.kind() {
            return false;
        }
        match self.level {
            None => true,
            Some(level) => tag.heading_level() == Some(level),
        }
    }

    fn is_exact(&self) -> bool {
        self.level.is_some()
    }
}

/// Visual attributes of one rule. Units are points except `line_spacing`,
/// which is a multiple of single spacing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleStyle {
    #[serde(default = "default_font_family", alias = "font_name")]
    pub font_family: String,
    #[serde(default = "default_font_size")]
    pub font_size: f32,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub underline: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub alignment: Alignment,
    #[serde(default = "default_line_spacing")]
    pub line_spacing: f32,
    #[serde(default)]
    pub space_before: f32,
    #[serde(default)]
    pub space_after: f32,
    #[serde(default)]
    pub first_line_indent: f32,
    #[serde(default)]
    pub left_indent: f32,
}

impl Default for RuleStyle {
    fn default() -> Self {
        Self {
            font_family: default_font_family(),
            font_size: default_font_size(),
            bold: false,
            italic: false,
            underline: false,
            color: None,
            alignment: Alignment::Left,
            line_spacing: default_line_spacing(),
            space_before: 0.0,
            space_after: 0.0,
            first_line_indent: 0.0,
            left_indent: 0.0,
        }
    }
}

impl RuleStyle {
    pub fn sized(font_size: f32) -> Self {
        Self {
            font_size,
            ..Default::default()
        }
    }

    /// The complete run style this rule produces. Runs are replaced, not merged.
    pub fn run_style(&self) -> RunStyle {
        RunStyle {
            font_family: Some(self.font_family.clone()),
            font_size: Some(self.font_size),
            bold: Some(self.bold),
            italic: Some(self.italic),
            underline: Some(self.underline),
            color: self.color.clone(),
        }
    }

    pub fn paragraph_format(&self) -> ParagraphFormat {
        ParagraphFormat {
            alignment: Some(self.alignment),
            line_spacing: Some(self.line_spacing),
            space_before: Some(self.space_before),
            space_after: Some(self.space_after),
            first_line_indent: Some(self.first_line_indent),
            left_indent: Some(self.left_indent),
        }
    }

    fn validate(&self, label: &str) -> Result<()> {
        if !self.font_size.is_finite() || self.font_size <= 0.0 {
            return Err(FormatError::Config(format!(
                "{label}: font_size must be positive, got {}",
                self.font_size
            )));
        }
        if !self.line_spacing.is_finite() || self.line_spacing <= 0.0 {
            return Err(FormatError::Config(format!(
                "{label}: line_spacing must be positive, got {}",
                self.line_spacing
            )));
        }
        let lengths = [
            self.space_before,
            self.space_after,
            self.first_line_indent,
            self.left_indent,
        ];
        if lengths.iter().any(|v| !v.is_finite()) {
            return Err(FormatError::Config(format!(
                "{label}: spacing and indents must be finite"
            )));
        }
        if self.font_family.trim().is_empty() {
            return Err(FormatError::Config(format!("{label}: empty font_family")));
        }
        Ok(())
    }
}

impl FormattingRule {
    pub fn new(selector: ZoneSelector, style: RuleStyle) -> Self {
        Self {
            selector,
            precedence: 0,
            style,
        }
    }

    pub fn with_precedence(mut self, precedence: i32) -> Self {
        self.precedence = precedence;
        self
    }

    /// Human-readable selector, used in reports ("section_heading/2").
    pub fn label(&self) -> String {
        let zone = serde_json::to_value(self.selector.zone)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| format!("{:?}", self.selector.zone));
        match self.selector.level {
            Some(level) => format!("{zone}/{level}"),
            None => zone,
        }
    }
}

impl FormattingSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: Vec::new(),
            default_rule: None,
            mandatory: Vec::new(),
        }
    }

    pub fn with_rule(mut self, rule: FormattingRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn with_default(mut self, style: RuleStyle) -> Self {
        self.default_rule = Some(style);
        self
    }

    pub fn with_mandatory(mut self, selector: ZoneSelector) -> Self {
        self.mandatory.push(selector);
        self
    }

    /// Best rule for a tag: an exact heading-level match beats a generic rule
    /// of the same kind; then higher precedence; then earlier declaration.
    pub fn rule_for(&self, tag: ZoneTag) -> Option<&FormattingRule> {
        let mut best: Option<&FormattingRule> = None;
        for rule in self.rules.iter().filter(|r| r.selector.matches(tag)) {
            best = match best {
                None => Some(rule),
                Some(current) => {
                    let candidate_key = (rule.selector.is_exact(), rule.precedence);
                    let current_key = (current.selector.is_exact(), current.precedence);
                    if candidate_key > current_key {
                        Some(rule)
                    } else {
                        Some(current)
                    }
                }
            };
        }
        best
    }

    pub fn default_rule(&self) -> Option<&RuleStyle> {
        self.default_rule.as_ref()
    }

    pub fn has_explicit_rule(&self, kind: ZoneKind) -> bool {
        self.rules.iter().any(|r| r.selector.zone == kind)
    }

    pub fn is_mandatory(&self, tag: ZoneTag) -> bool {
        self.mandatory.iter().any(|s| s.matches(tag))
    }

    pub fn validate(&self) -> Result<()> {
        for (i, rule) in self.rules.iter().enumerate() {
            let label = format!("rule #{} ({})", i, rule.label());
            if let Some(level) = rule.selector.level {
                if rule.selector.zone != ZoneKind::SectionHeading {
                    return Err(FormatError::Config(format!(
                        "{label}: only section_heading rules may set a level"
                    )));
                }
                if level == 0 {
                    return Err(FormatError::Config(format!(
                        "{label}: heading levels start at 1"
                    )));
                }
            }
            rule.style.validate(&label)?;
        }
        if let Some(default_rule) = &self.default_rule {
            default_rule.validate("default_rule")?;
        }
        Ok(())
    }

    /// Fallback format for academic papers: 16pt bold centered title, 12pt
    /// body with 24pt first-line indent at 1.5 spacing, 10.5pt references
    /// with a 24pt hanging indent.
    pub fn builtin_default() -> Self {
        FormattingSpec::new("default")
            .with_rule(FormattingRule::new(
                ZoneSelector::new(ZoneKind::Title),
                RuleStyle {
                    font_size: 16.0,
                    bold: true,
                    alignment: Alignment::Center,
                    ..Default::default()
                },
            ))
            .with_rule(FormattingRule::new(
                ZoneSelector::new(ZoneKind::Abstract),
                RuleStyle {
                    first_line_indent: 24.0,
                    ..RuleStyle::sized(12.0)
                },
            ))
            .with_rule(FormattingRule::new(
                ZoneSelector::new(ZoneKind::Keywords),
                RuleStyle::sized(12.0),
            ))
            .with_rule(FormattingRule::new(
                ZoneSelector::heading(1),
                RuleStyle {
                    bold: true,
                    ..RuleStyle::sized(14.0)
                },
            ))
            .with_rule(FormattingRule::new(
                ZoneSelector::heading(2),
                RuleStyle {
                    bold: true,
                    ..RuleStyle::sized(13.0)
                },
            ))
            .with_rule(FormattingRule::new(
                ZoneSelector::new(ZoneKind::SectionHeading),
                RuleStyle {
                    bold: true,
                    ..RuleStyle::sized(12.0)
                },
            ))
            .with_rule(FormattingRule::new(
                ZoneSelector::new(ZoneKind::BodyText),
                RuleStyle {
                    first_line_indent: 24.0,
                    line_spacing: 1.5,
                    ..RuleStyle::sized(12.0)
                },
            ))
            .with_rule(FormattingRule::new(
                ZoneSelector::new(ZoneKind::ReferenceEntry),
                RuleStyle {
                    first_line_indent: -24.0,
                    left_indent: 24.0,
                    ..RuleStyle::sized(10.5)
                },
            ))
            .with_default(RuleStyle::sized(12.0))
    }

    /// CJK thesis layout: SimHei headings, SimSun body.
    pub fn builtin_chinese_thesis() -> Self {
        let song = |size: f32| RuleStyle {
            font_family: "SimSun".to_string(),
            ..RuleStyle::sized(size)
        };
        let hei = |size: f32| RuleStyle {
            font_family: "SimHei".to_string(),
            bold: true,
            ..RuleStyle::sized(size)
        };
        FormattingSpec::new("chinese-thesis")
            .with_rule(FormattingRule::new(
                ZoneSelector::new(ZoneKind::Title),
                RuleStyle {
                    alignment: Alignment::Center,
                    space_after: 12.0,
                    ..hei(18.0)
                },
            ))
            .with_rule(FormattingRule::new(
                ZoneSelector::new(ZoneKind::Abstract),
                RuleStyle {
                    first_line_indent: 21.0,
                    line_spacing: 1.25,
                    ..song(10.5)
                },
            ))
            .with_rule(FormattingRule::new(
                ZoneSelector::new(ZoneKind::Keywords),
                song(10.5),
            ))
            .with_rule(FormattingRule::new(
                ZoneSelector::heading(1),
                RuleStyle {
                    space_before: 12.0,
                    space_after: 6.0,
                    ..hei(15.0)
                },
            ))
            .with_rule(FormattingRule::new(ZoneSelector::heading(2), hei(14.0)))
            .with_rule(FormattingRule::new(
                ZoneSelector::new(ZoneKind::SectionHeading),
                hei(12.0),
            ))
            .with_rule(FormattingRule::new(
                ZoneSelector::new(ZoneKind::BodyText),
                RuleStyle {
                    alignment: Alignment::Justify,
                    first_line_indent: 24.0,
                    line_spacing: 1.5,
                    ..song(12.0)
                },
            ))
            .with_rule(FormattingRule::new(
                ZoneSelector::new(ZoneKind::ReferenceEntry),
                RuleStyle {
                    first_line_indent: -21.0,
                    left_indent: 21.0,
                    ..song(10.5)
                },
            ))
            .with_default(song(12.0))
            .with_mandatory(ZoneSelector::new(ZoneKind::Title))
    }
}

/// Tuning for the zone classifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassifierConfig {
    /// Longest first paragraph (in chars) still considered a title by pattern
    #[serde(default = "default_title_max_chars")]
    pub title_max_chars: usize,
    /// Longest numbered line (in chars) still considered a section heading
    #[serde(default = "default_heading_max_chars")]
    pub heading_max_chars: usize,
    /// Consult advisory hints for low-confidence paragraphs
    #[serde(default = "default_true")]
    pub use_hints: bool,
    /// Hints below this confidence are ignored
    #[serde(default = "default_min_hint_confidence")]
    pub min_hint_confidence: f32,
    /// Extra style names, checked before the built-in style table
    #[serde(default)]
    pub style_tokens: Vec<StyleTokenConfig>,
}

fn default_title_max_chars() -> usize {
    120
}

fn default_heading_max_chars() -> usize {
    80
}

fn default_min_hint_confidence() -> f32 {
    0.6
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            title_max_chars: default_title_max_chars(),
            heading_max_chars: default_heading_max_chars(),
            use_hints: true,
            min_hint_confidence: default_min_hint_confidence(),
            style_tokens: Vec::new(),
        }
    }
}

/// A user style name mapped to a zone, e.g. `{ style: "PaperTitle", zone: title }`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StyleTokenConfig {
    pub style: String,
    pub zone: ZoneKind,
    #[serde(default)]
    pub level: Option<u32>,
}

impl FormatConfig {
    pub fn new(spec: FormattingSpec) -> Self {
        Self {
            spec,
            classifier: ClassifierConfig::default(),
        }
    }

    /// Load config from a YAML file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: FormatConfig = serde_yaml::from_str(content)?;
        config.spec.validate()?;
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Load config with fallback to the built-in default
    pub fn load_with_fallback(path: Option<&str>) -> Self {
        match path {
            Some(p) => Self::load_from_file(p).unwrap_or_else(|e| {
                log::warn!("⚠️  Failed to load config from {}: {}. Using defaults", p, e);
                Self::default()
            }),
            None => Self::default(),
        }
    }
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self::new(FormattingSpec::builtin_default())
    }
}

/// Named presets: the built-ins plus any files loaded at runtime.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    presets: BTreeMap<String, FormatConfig>,
}

impl ConfigManager {
    pub fn new() -> Self {
        let mut manager = Self {
            presets: BTreeMap::new(),
        };
        manager.load_builtin_presets();
        manager
    }

    fn load_builtin_presets(&mut self) {
        for spec in [
            FormattingSpec::builtin_default(),
            FormattingSpec::builtin_chinese_thesis(),
        ] {
            self.presets.insert(spec.name.clone(), FormatConfig::new(spec));
        }
    }

    pub fn get(&self, name: &str) -> Option<&FormatConfig> {
        self.presets.get(name)
    }

    /// Preset by name, falling back to `default`.
    pub fn get_or_default(&self, name: &str) -> FormatConfig {
        self.presets.get(name).cloned().unwrap_or_else(|| {
            log::warn!("⚠️  Unknown preset '{}', using default", name);
            FormatConfig::default()
        })
    }

    pub fn names(&self) -> Vec<&str> {
        self.presets.keys().map(String::as_str).collect()
    }

    /// Load a YAML preset; it is registered under its own `name`.
    pub fn load_config_from_file(&mut self, path: impl AsRef<Path>) -> Result<String> {
        let config = FormatConfig::load_from_file(path)?;
        let name = config.spec.name.clone();
        self.insert(config);
        Ok(name)
    }

    pub fn insert(&mut self, config: FormatConfig) {
        self.presets.insert(config.spec.name.clone(), config);
    }

    pub fn remove(&mut self, name: &str) -> Option<FormatConfig> {
        self.presets.remove(name)
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
