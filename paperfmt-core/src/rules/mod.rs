// Main rules module - delegates to semantic sub-modules
// - style_match.rs: style name -> zone lookup table
// - section_detection.rs: numbered heading prefixes and their depth
// - pattern_detection.rs: ordered text pattern table
// - engine.rs: RuleEngine, rule resolution and the format report
// - validation.rs: conformance checks after formatting

pub mod engine;
pub mod pattern_detection;
pub mod section_detection;
pub mod style_match;
pub mod validation;

pub use engine::*;
pub use validation::{ConformanceValidator, ValidationIssue, ValidationReport};
