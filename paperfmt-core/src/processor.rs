use crate::classifier::ZoneClassifier;
use crate::codec::{DocumentCodec, JsonCodec};
use crate::config::FormatConfig;
use crate::error::Result;
use crate::hints::{HintProvider, HintSet};
use crate::rules::{
    engine::DebugConfig, ConformanceValidator, FormatReport, RuleEngine, ValidationReport,
};
use crate::types::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Captured intermediate outputs from each pipeline stage
/// Used for testing and diagnostics to inspect each boundary
#[derive(Debug, Clone, Serialize)]
pub struct FormatStages {
    pub input: Document,
    pub hints: Option<HintSet>,
    pub tags: TagMap,
    pub formatted: Document,
    pub report: FormatReport,
    pub validation: ValidationReport,
}

/// Result of one formatting run. The mutated document stays with the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FormatOutcome {
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub spec_name: String,
    pub tag_fingerprint: String,
    pub zone_distribution: ZoneDistribution,
    pub report: FormatReport,
    pub validation: ValidationReport,
}

impl FormatOutcome {
    fn new(tags: &TagMap, report: FormatReport, validation: ValidationReport) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            created_at: Utc::now(),
            spec_name: report.spec_name.clone(),
            tag_fingerprint: tags.fingerprint(),
            zone_distribution: tags.distribution(),
            report,
            validation,
        }
    }
}

/// Simple profiler that collects timings for pipeline steps
pub struct StepProfiler {
    enabled: bool,
    timings: Vec<(String, Duration)>,
}

impl StepProfiler {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            timings: Vec::new(),
        }
    }

    pub fn time_step<F, R>(&mut self, step_name: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        if !self.enabled {
            return f();
        }

        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();

        self.timings.push((step_name.to_string(), elapsed));
        log::info!("⏱️  {}: {:.0}ms", step_name, elapsed.as_millis());

        result
    }

    pub fn timings(&self) -> &[(String, Duration)] {
        &self.timings
    }

    pub fn print_summary(&self) {
        if !self.enabled || self.timings.is_empty() {
            return;
        }

        log::info!("📊 Performance Summary:");
        let total: Duration = self.timings.iter().map(|(_, d)| *d).sum();

        for (step, duration) in &self.timings {
            let percentage = if total.is_zero() {
                0.0
            } else {
                (duration.as_secs_f64() / total.as_secs_f64()) * 100.0
            };
            log::info!(
                "   {:.<35} {:.0}ms ({:.1}%)",
                step,
                duration.as_millis(),
                percentage
            );
        }
        log::info!("   {:.<35} {:.0}ms", "Total", total.as_millis());
    }
}

pub struct PaperFormatter {
    codec: Box<dyn DocumentCodec>,
    config: FormatConfig,
    classifier: ZoneClassifier,
    rule_engine: RuleEngine,
}

impl PaperFormatter {
    /// Formatter reading and writing JSON documents
    pub fn new(config: FormatConfig) -> Result<Self> {
        Self::new_with_codec(Box::new(JsonCodec), config)
    }

    /// Create PaperFormatter with an explicit codec
    pub fn new_with_codec(codec: Box<dyn DocumentCodec>, config: FormatConfig) -> Result<Self> {
        config.spec.validate()?;
        Ok(Self {
            codec,
            classifier: ZoneClassifier::new(&config.classifier)?,
            rule_engine: RuleEngine::new(),
            config,
        })
    }

    pub fn config(&self) -> &FormatConfig {
        &self.config
    }

    pub fn set_debug_config(&mut self, debug_config: DebugConfig) {
        self.rule_engine.set_debug_config(debug_config);
    }

    pub fn classify(&self, document: &Document, hints: Option<&HintSet>) -> TagMap {
        self.classifier.classify(document.paragraphs(), hints)
    }

    /// Classify, format and validate `document` in place.
    pub fn format_document(
        &self,
        document: &mut Document,
        hints: Option<&HintSet>,
    ) -> Result<FormatOutcome> {
        self.format_document_with_profiling(document, hints, false)
    }

    pub fn format_document_with_profiling(
        &self,
        document: &mut Document,
        hints: Option<&HintSet>,
        enable_profiling: bool,
    ) -> Result<FormatOutcome> {
        let mut profiler = StepProfiler::new(enable_profiling);
        let outcome = self.format_with_profiler(document, hints, &mut profiler)?;
        profiler.print_summary();
        Ok(outcome)
    }

    fn format_with_profiler(
        &self,
        document: &mut Document,
        hints: Option<&HintSet>,
        profiler: &mut StepProfiler,
    ) -> Result<FormatOutcome> {
        let tags = profiler.time_step("1. Classification", || {
            self.classifier.classify(document.paragraphs(), hints)
        });

        let report = profiler.time_step("2. Rule Application", || {
            self.rule_engine.apply(document, &tags, &self.config.spec)
        })?;

        let validation = profiler.time_step("3. Validation", || {
            ConformanceValidator::new(&self.config.spec).validate(document, &tags)
        });

        Ok(FormatOutcome::new(&tags, report, validation))
    }

    /// Read `input`, format it and write the result to `output`.
    ///
    /// The output is only written when every step succeeded; a failed run
    /// leaves no file behind.
    pub fn format_file(
        &self,
        input: &Path,
        output: &Path,
        hint_provider: Option<&dyn HintProvider>,
        enable_profiling: bool,
    ) -> Result<FormatOutcome> {
        let start_time = Instant::now();
        let mut profiler = StepProfiler::new(enable_profiling);

        if !self.codec.supports_file_type(input) {
            log::warn!(
                "⚠️  {} codec does not recognise {}, trying anyway",
                self.codec.name(),
                input.display()
            );
        }

        log::info!("📄 Formatting document: {}", input.display());
        let mut document = profiler.time_step("0. Read", || self.codec.read(input))?;

        let hints = match hint_provider {
            Some(provider) => Some(profiler.time_step("0b. Hints", || {
                HintSet::collect(provider, document.paragraphs())
            })),
            None => None,
        };

        let outcome = self.format_with_profiler(&mut document, hints.as_ref(), &mut profiler)?;

        profiler.time_step("4. Write", || self.codec.write(&document, output))?;
        log::info!("💾 Saved formatted document to {}", output.display());

        profiler.print_summary();
        log::info!(
            "⏱️  Total processing time: {:.3}s",
            start_time.elapsed().as_secs_f64()
        );
        Ok(outcome)
    }

    /// Run the pipeline on a copy of `document` and capture all intermediate
    /// stage outputs. Used for pipeline diagnostics and testing stage boundaries
    pub fn capture_stages(
        &self,
        document: &Document,
        hints: Option<&HintSet>,
    ) -> Result<FormatStages> {
        let tags = self.classify(document, hints);
        log::info!("📋 Stage 1: {} paragraphs classified", tags.len());

        let mut formatted = document.clone();
        let report = self.rule_engine.apply(&mut formatted, &tags, &self.config.spec)?;
        log::info!(
            "📋 Stage 2: {} applied, {} skipped",
            report.applied.len(),
            report.skipped.len()
        );

        let validation = ConformanceValidator::new(&self.config.spec).validate(&formatted, &tags);
        log::info!("📋 Stage 3: {} validation issues", validation.issues.len());

        Ok(FormatStages {
            input: document.clone(),
            hints: hints.cloned(),
            tags,
            formatted,
            report,
            validation,
        })
    }
}
