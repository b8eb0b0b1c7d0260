use crate::config::StyleTokenConfig;
use crate::types::{ZoneKind, ZoneTag};

/// How a table entry compares against a normalized style name.
#[derive(Debug, Clone, PartialEq)]
pub enum StyleMatcher {
    Exact(String),
    Prefix(String),
    /// Prefix followed by an optional level number ("heading2" -> 2, "heading" -> 1)
    HeadingLevel(String),
}

#[derive(Debug, Clone)]
pub struct StyleEntry {
    pub matcher: StyleMatcher,
    pub zone: ZoneKind,
    pub level: Option<u32>,
}

/// Ordered (style token -> zone) table. First match wins.
#[derive(Debug, Clone)]
pub struct StyleTable {
    entries: Vec<StyleEntry>,
}

/// Lowercase, drop whitespace, '_' and '-': "Heading 1" / "heading_1" -> "heading1".
pub fn normalize_style_name(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

impl StyleTable {
    pub fn builtin() -> Self {
        use StyleMatcher::*;
        let entry = |matcher: StyleMatcher, zone: ZoneKind| StyleEntry {
            matcher,
            zone,
            level: None,
        };
        let entries = vec![
            entry(Exact("title".into()), ZoneKind::Title),
            entry(Exact("subtitle".into()), ZoneKind::Title),
            entry(Exact("标题".into()), ZoneKind::Title),
            entry(Exact("abstract".into()), ZoneKind::Abstract),
            entry(Exact("abstracttext".into()), ZoneKind::Abstract),
            entry(Exact("摘要".into()), ZoneKind::Abstract),
            entry(Exact("keywords".into()), ZoneKind::Keywords),
            entry(Exact("keyword".into()), ZoneKind::Keywords),
            entry(Exact("关键词".into()), ZoneKind::Keywords),
            entry(Prefix("bibliography".into()), ZoneKind::ReferenceEntry),
            entry(Prefix("reference".into()), ZoneKind::ReferenceEntry),
            entry(Prefix("参考文献".into()), ZoneKind::ReferenceEntry),
            entry(HeadingLevel("heading".into()), ZoneKind::SectionHeading),
            entry(HeadingLevel("标题".into()), ZoneKind::SectionHeading),
        ];
        Self { entries }
    }

    /// User tokens are checked before the built-in table.
    pub fn with_custom(tokens: &[StyleTokenConfig]) -> Self {
        let mut entries: Vec<StyleEntry> = tokens
            .iter()
            .map(|t| StyleEntry {
                matcher: StyleMatcher::Exact(normalize_style_name(&t.style)),
                zone: t.zone,
                level: t.level,
            })
            .collect();
        entries.extend(Self::builtin().entries);
        Self { entries }
    }

    pub fn lookup(&self, style_name: &str) -> Option<ZoneTag> {
        let name = normalize_style_name(style_name);
        if name.is_empty() {
            return None;
        }
        self.entries.iter().find_map(|entry| entry.resolve(&name))
    }
}

impl StyleEntry {
    fn resolve(&self, name: &str) -> Option<ZoneTag> {
        let level = match &self.matcher {
            StyleMatcher::Exact(token) => {
                if name != token {
                    return None;
                }
                self.level
            }
            StyleMatcher::Prefix(token) => {
                if !name.starts_with(token.as_str()) {
                    return None;
                }
                self.level
            }
            StyleMatcher::HeadingLevel(token) => {
                let rest = name.strip_prefix(token.as_str())?;
                if rest.is_empty() {
                    Some(1)
                } else if rest.chars().all(|c| c.is_ascii_digit()) {
                    match rest.parse::<u32>() {
                        Ok(0) | Err(_) => return None,
                        Ok(level) => Some(level),
                    }
                } else {
                    return None;
                }
            }
        };
        Some(tag_for(self.zone, level))
    }
}

fn tag_for(zone: ZoneKind, level: Option<u32>) -> ZoneTag {
    match zone {
        ZoneKind::Title => ZoneTag::Title,
        ZoneKind::Abstract => ZoneTag::Abstract,
        ZoneKind::Keywords => ZoneTag::Keywords,
        ZoneKind::SectionHeading => ZoneTag::SectionHeading {
            level: level.unwrap_or(1).max(1),
        },
        ZoneKind::BodyText => ZoneTag::BodyText,
        ZoneKind::ReferenceEntry => ZoneTag::ReferenceEntry,
        ZoneKind::Unclassified => ZoneTag::Unclassified,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize_style_name("Heading 1"), "heading1");
        assert_eq!(normalize_style_name("heading_2"), "heading2");
        assert_eq!(normalize_style_name("Key-Words"), "keywords");
        assert_eq!(normalize_style_name("标题 3"), "标题3");
    }

    #[test]
    fn test_builtin_lookup() {
        let table = StyleTable::builtin();
        assert_eq!(table.lookup("Title"), Some(ZoneTag::Title));
        assert_eq!(table.lookup("Abstract"), Some(ZoneTag::Abstract));
        assert_eq!(table.lookup("Heading1"), Some(ZoneTag::SectionHeading { level: 1 }));
        assert_eq!(table.lookup("Heading 3"), Some(ZoneTag::SectionHeading { level: 3 }));
        assert_eq!(table.lookup("标题 2"), Some(ZoneTag::SectionHeading { level: 2 }));
        assert_eq!(table.lookup("标题"), Some(ZoneTag::Title));
        assert_eq!(table.lookup("Bibliography Entry"), Some(ZoneTag::ReferenceEntry));
    }

    #[test]
    fn test_generic_styles_do_not_match() {
        let table = StyleTable::builtin();
        assert_eq!(table.lookup("Normal"), None);
        assert_eq!(table.lookup("Body Text"), None);
        assert_eq!(table.lookup(""), None);
        assert_eq!(table.lookup("Heading 0"), None);
        assert_eq!(table.lookup("Heading Char"), None);
    }

    #[test]
    fn test_custom_tokens_take_priority() {
        let table = StyleTable::with_custom(&[
            StyleTokenConfig {
                style: "Paper Title".to_string(),
                zone: ZoneKind::Title,
                level: None,
            },
            StyleTokenConfig {
                style: "Title".to_string(),
                zone: ZoneKind::SectionHeading,
                level: Some(2),
            },
        ]);
        assert_eq!(table.lookup("paper_title"), Some(ZoneTag::Title));
        assert_eq!(table.lookup("Title"), Some(ZoneTag::SectionHeading { level: 2 }));
    }
}
