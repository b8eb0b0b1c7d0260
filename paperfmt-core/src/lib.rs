// Paperfmt Core Library
//
// Recognizes the logical zones of an academic paper (title, abstract,
// keywords, headings, body, references) and applies a declarative
// formatting spec to each zone.

pub mod types;
pub mod error;
pub mod config;
pub mod hints;
pub mod rules;
pub mod classifier;
pub mod codec;
pub mod processor;
pub mod serialization;

// Re-export main types and functions for easy use
pub use types::*;
pub use error::{FormatError, Result};
pub use config::{ConfigManager, FormatConfig, FormattingRule, FormattingSpec, RuleStyle, ZoneSelector};
pub use hints::{HintProvider, HintSet, StaticHints, ZoneHint};
pub use classifier::ZoneClassifier;
pub use codec::{DocumentCodec, JsonCodec};
pub use processor::{FormatOutcome, FormatStages, PaperFormatter};
pub use rules::{FormatReport, RuleEngine, SkipReason, ValidationReport};
pub use serialization::{OutcomeSummary, TagListing};
