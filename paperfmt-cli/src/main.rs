use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};

// Import from paperfmt-core
use paperfmt_core::rules::engine::DebugConfig;
use paperfmt_core::{
    ConfigManager, Document, FormatConfig, FormatStages, HintProvider, HintSet, PaperFormatter,
    StaticHints, TagListing,
};

// Import CLI utilities
use paperfmt::PresetStore;

#[derive(Parser)]
#[command(name = "paperfmt")]
#[command(about = "Formats academic papers by recognizing their zones and applying a style spec")]
struct Args {
    /// Path to the document (JSON) to format
    #[arg(short, long)]
    input: Option<String>,

    /// Path to custom config file (YAML format)
    #[arg(short, long)]
    config: Option<String>,

    /// Named preset: built-in ("default", "chinese-thesis") or saved with --save-preset
    #[arg(short, long, default_value = "default")]
    preset: String,

    /// JSON file of advisory zone hints keyed by paragraph index
    #[arg(long)]
    hints: Option<String>,

    /// Output file path (if not specified, auto-generated based on input)
    #[arg(short, long)]
    output: Option<String>,

    /// Write the run report to this path
    #[arg(long)]
    report: Option<String>,

    /// Report format: summary or report
    #[arg(long, default_value = "summary")]
    report_format: String,

    /// Show available presets and exit
    #[arg(long)]
    show_presets: bool,

    /// Enable detailed profiling of all pipeline steps
    #[arg(long)]
    profile: bool,

    /// Classify only and write the paragraph tag listing to this path
    #[arg(long)]
    dump_tags: Option<String>,

    /// Dump all intermediate pipeline stage outputs to a directory
    #[arg(long)]
    dump_stages: bool,

    /// Directory for stage dump output
    #[arg(long, default_value = "test_outputs/stages")]
    stages_dir: String,

    /// Trace paragraphs whose text matches these patterns (regex or substring)
    #[arg(long)]
    debug_filter: Vec<String>,

    /// Save the --config file as a user preset under this name and exit
    #[arg(long)]
    save_preset: Option<String>,

    /// Delete a saved user preset and exit
    #[arg(long)]
    delete_preset: Option<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    log::info!("🦀 Paperfmt Academic Paper Formatter");

    let store = match PresetStore::new() {
        Ok(store) => Some(store),
        Err(e) => {
            log::warn!("⚠️  User presets unavailable: {e}");
            None
        }
    };

    if let Some(name) = &args.delete_preset {
        let store = store.ok_or_else(|| anyhow!("No preset directory available"))?;
        store.delete(name)?;
        return Ok(());
    }

    if let Some(name) = &args.save_preset {
        let store = store.ok_or_else(|| anyhow!("No preset directory available"))?;
        let config_path = args
            .config
            .as_deref()
            .ok_or_else(|| anyhow!("--save-preset needs --config <path>"))?;
        let mut config = FormatConfig::load_from_file(config_path)
            .with_context(|| format!("Failed to load config from {config_path}"))?;
        config.spec.name = name.clone();
        let path = store.save(&config)?;
        log::info!("✅ Preset '{}' saved to {}", name, path.display());
        return Ok(());
    }

    let mut manager = ConfigManager::new();
    if let Some(store) = &store {
        match store.load_into(&mut manager) {
            Ok(0) => {}
            Ok(n) => log::info!("📁 Loaded {} user presets from {}", n, store.presets_dir().display()),
            Err(e) => log::warn!("⚠️  Failed to read user presets: {e}"),
        }
    }

    if args.show_presets {
        show_presets(&manager);
        return Ok(());
    }

    let input = args
        .input
        .as_deref()
        .ok_or_else(|| anyhow!("--input <path> is required (see --help)"))?;
    if !Path::new(input).exists() {
        return Err(anyhow!("Input document not found at: {input}"));
    }

    let config = load_config(&args, &manager)?;
    let mut formatter = PaperFormatter::new(config)?;
    if !args.debug_filter.is_empty() {
        formatter.set_debug_config(DebugConfig::new(true, args.debug_filter.clone()));
    }

    let hint_provider = match &args.hints {
        Some(path) => Some(
            StaticHints::load_from_file(path)
                .with_context(|| format!("Failed to load hints from {path}"))?,
        ),
        None => None,
    };

    // Classification-only and stage dump modes never write the document
    if args.dump_tags.is_some() || args.dump_stages {
        let document = Document::load(input)?;
        let hints = hint_provider
            .as_ref()
            .map(|p| HintSet::collect(p as &dyn HintProvider, document.paragraphs()));

        if let Some(path) = &args.dump_tags {
            let tags = formatter.classify(&document, hints.as_ref());
            TagListing::new(&document, &tags).save(path)?;
            log::info!("💾 Tag listing saved to: {}", path);
        }
        if args.dump_stages {
            log::info!("🔬 Pipeline stage dump mode");
            let stages = formatter.capture_stages(&document, hints.as_ref())?;
            save_stages(&stages, &args.stages_dir)?;
            log::info!("✅ All stages dumped to: {}", args.stages_dir);
        }
        return Ok(());
    }

    let output_path = match &args.output {
        Some(output) => PathBuf::from(output),
        None => default_output_path(input),
    };

    log::info!("📄 Processing: {}", input);
    match formatter.format_file(
        Path::new(input),
        &output_path,
        hint_provider.as_ref().map(|p| p as &dyn HintProvider),
        args.profile,
    ) {
        Ok(outcome) => {
            log::info!("✅ Successfully formatted document");
            log::info!("📊 Run {}:", outcome.run_id);
            log::info!("   - Spec: {}", outcome.spec_name);
            log::info!(
                "   - Formatted: {} ({} changed)",
                outcome.report.applied.len(),
                outcome.report.changed_count()
            );
            log::info!("   - Skipped: {}", outcome.report.skipped.len());
            log::info!("   - Quality score: {:.2}", outcome.validation.quality_score);

            if let Some(report_path) = &args.report {
                outcome.save_with_format(report_path, &args.report_format)?;
                log::info!("💾 Report saved to: {}", report_path);
            }
        }
        Err(e) => {
            match e.paragraph() {
                Some(index) => eprintln!("❌ Formatting failed at paragraph {index}: {e}"),
                None => eprintln!("❌ Formatting failed: {e}"),
            }
            eprintln!("   Nothing was saved.");
            std::process::exit(1);
        }
    }

    Ok(())
}

/// --config wins over --preset
fn load_config(args: &Args, manager: &ConfigManager) -> Result<FormatConfig> {
    if let Some(config_path) = &args.config {
        let config = FormatConfig::load_from_file(config_path)
            .with_context(|| format!("Failed to load config from {config_path}"))?;
        log::info!("📋 Loaded config '{}' from: {}", config.spec.name, config_path);
        return Ok(config);
    }

    let config = manager.get(&args.preset).cloned().ok_or_else(|| {
        anyhow!(
            "Unknown preset '{}'. Available: {}",
            args.preset,
            manager.names().join(", ")
        )
    })?;
    log::info!("📋 Using preset: {}", args.preset);
    Ok(config)
}

fn default_output_path(input: &str) -> PathBuf {
    let input = Path::new(input);
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    input.with_file_name(format!("{stem}_formatted.json"))
}

fn show_presets(manager: &ConfigManager) {
    println!("\n📋 Available Presets:");
    for name in manager.names() {
        if let Some(config) = manager.get(name) {
            let mandatory = if config.spec.mandatory.is_empty() {
                String::new()
            } else {
                format!(", {} mandatory zones", config.spec.mandatory.len())
            };
            println!("  {:<20} {} rules{}", name, config.spec.rules.len(), mandatory);
        }
    }

    println!("\n📝 Usage Examples:");
    println!("  paperfmt -i paper.json");
    println!("  paperfmt -i paper.json -p chinese-thesis -o out.json");
    println!("  paperfmt -i paper.json -c journal.yaml --report report.json");
    println!("  paperfmt -c journal.yaml --save-preset journal");
    println!("  paperfmt -i paper.json --dump-tags tags.json");
}

fn save_stages(stages: &FormatStages, output_dir: &str) -> Result<()> {
    use std::fs;
    fs::create_dir_all(output_dir)?;

    // Stage 1: Tag map
    let tags_path = format!("{}/stage1_tags.json", output_dir);
    TagListing::new(&stages.input, &stages.tags).save(&tags_path)?;
    log::info!("  💾 {} ({} paragraphs)", tags_path, stages.tags.len());

    // Stage 2: Formatted document and report
    let doc_path = format!("{}/stage2_formatted.json", output_dir);
    stages.formatted.save(&doc_path)?;
    log::info!("  💾 {}", doc_path);

    let report_path = format!("{}/stage2_report.json", output_dir);
    fs::write(&report_path, serde_json::to_string_pretty(&stages.report)?)?;
    log::info!(
        "  💾 {} ({} applied, {} skipped)",
        report_path,
        stages.report.applied.len(),
        stages.report.skipped.len()
    );

    // Stage 3: Validation
    let validation_path = format!("{}/stage3_validation.json", output_dir);
    fs::write(&validation_path, serde_json::to_string_pretty(&stages.validation)?)?;
    log::info!("  💾 {} ({} issues)", validation_path, stages.validation.issues.len());

    // Summary file: quick reference for validation scripts
    let summary = serde_json::json!({
        "captured_at": chrono::Utc::now().to_rfc3339(),
        "tag_fingerprint": stages.tags.fingerprint(),
        "stage_counts": {
            "paragraphs": stages.input.len(),
            "hints": stages.hints.as_ref().map(|h| h.len()).unwrap_or(0),
            "applied": stages.report.applied.len(),
            "skipped": stages.report.skipped.len(),
            "issues": stages.validation.issues.len(),
        }
    });
    let summary_path = format!("{}/summary.json", output_dir);
    fs::write(&summary_path, serde_json::to_string_pretty(&summary)?)?;
    log::info!("  💾 {}", summary_path);

    Ok(())
}
