use regex::Regex;

/// A numbering prefix found at the start of a heading line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingPrefix {
    /// The prefix as written ("2.3", "IV", "一")
    pub prefix: String,
    /// Nesting depth; becomes the SectionHeading level
    pub depth: u32,
}

/// Detects numbered section headings and derives their level from the
/// nesting depth of the prefix. Numbering is never checked for continuity:
/// "1" followed by "1.1.1" yields levels 1 and 3.
pub struct HeadingDetector {
    numeric: Regex,
    roman: Regex,
    roman_value: Regex,
    chinese_chapter: Regex,
    chinese_enum: Regex,
    chinese_paren: Regex,
}

// Headings do not end like sentences
const SENTENCE_ENDINGS: [char; 6] = ['.', '。', ';', '；', ',', '，'];

impl HeadingDetector {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            // "1 Introduction", "2.3 Methods", "1.1. Background", "3、结论"
            numeric: Regex::new(
                r"^\s*(?P<prefix>\d{1,2}(?:[.．]\d{1,2})*)(?:[.．、]\s*|\s+)(?P<title>\S.*)$",
            )?,
            // "II. Related Work", "IV.2 Ablation"
            roman: Regex::new(
                r"^\s*(?P<roman>[IVXL]{1,7})(?:(?P<sub>(?:[.．]\d{1,2})+)(?:[.．、]\s*|\s+)|[.．、]\s*)(?P<title>\S.*)$",
            )?,
            roman_value: Regex::new(r"^(?:XL|L?X{0,3})(?:IX|IV|V?I{0,3})$")?,
            // "第一章 绪论" (level 1), "第二节 方法" (level 2)
            chinese_chapter: Regex::new(
                r"^\s*第(?P<num>[一二三四五六七八九十百零〇\d]+)(?P<unit>[章节部])\s*(?P<title>.*)$",
            )?,
            // "一、引言"
            chinese_enum: Regex::new(r"^\s*(?P<num>[一二三四五六七八九十]+)[、．.]\s*(?P<title>\S.*)$")?,
            // "（一）研究背景"
            chinese_paren: Regex::new(
                r"^\s*[（(](?P<num>[一二三四五六七八九十]+)[)）]\s*(?P<title>\S.*)$",
            )?,
        })
    }

    /// Numbering prefix of a heading line, if `text` looks like one.
    /// Lines longer than `max_chars` or ending like a sentence are not headings.
    pub fn detect(&self, text: &str, max_chars: usize) -> Option<HeadingPrefix> {
        let text = text.trim();
        if text.is_empty() || text.contains('\n') || text.chars().count() > max_chars {
            return None;
        }
        if text.ends_with(SENTENCE_ENDINGS) {
            return None;
        }

        if let Some(caps) = self.numeric.captures(text) {
            let title = caps.name("title").map(|m| m.as_str()).unwrap_or_default();
            if starts_like_title(title) {
                let prefix = caps["prefix"].to_string();
                let depth = prefix_depth(&prefix);
                return Some(HeadingPrefix { prefix, depth });
            }
        }

        if let Some(caps) = self.roman.captures(text) {
            let roman = &caps["roman"];
            let title = caps.name("title").map(|m| m.as_str()).unwrap_or_default();
            if self.roman_value.is_match(roman) && starts_like_title(title) {
                let sub = caps.name("sub").map(|m| m.as_str()).unwrap_or_default();
                let prefix = format!("{}{}", roman, sub);
                let depth = prefix_depth(&prefix);
                return Some(HeadingPrefix { prefix, depth });
            }
        }

        if let Some(caps) = self.chinese_chapter.captures(text) {
            let depth = match &caps["unit"] {
                "节" => 2,
                _ => 1,
            };
            return Some(HeadingPrefix {
                prefix: format!("第{}{}", &caps["num"], &caps["unit"]),
                depth,
            });
        }

        if let Some(caps) = self.chinese_enum.captures(text) {
            return Some(HeadingPrefix {
                prefix: caps["num"].to_string(),
                depth: 1,
            });
        }

        if let Some(caps) = self.chinese_paren.captures(text) {
            return Some(HeadingPrefix {
                prefix: format!("（{}）", &caps["num"]),
                depth: 2,
            });
        }

        None
    }

    pub fn has_prefix(&self, text: &str, max_chars: usize) -> bool {
        self.detect(text, max_chars).is_some()
    }
}

/// Number of dot-separated components: "1" -> 1, "2.3" -> 2, "IV.2.1" -> 3.
pub fn prefix_depth(prefix: &str) -> u32 {
    prefix
        .split(['.', '．'])
        .filter(|part| !part.is_empty())
        .count()
        .max(1) as u32
}

// A heading title starts with something other than a lowercase letter or digit
// ("3.14 is pi" and "1 2 3" are not headings).
fn starts_like_title(title: &str) -> bool {
    match title.chars().next() {
        Some(c) => !c.is_lowercase() && !c.is_ascii_digit(),
        None => false,
    }
}
