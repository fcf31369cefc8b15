use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use ecg_scan::config::{self, MissingTracePolicy, PipelineConfig};
use ecg_scan::digitizer;
use ecg_scan::models::{Condition, Lead, LeadSignal, SourceImage};
use ecg_scan::preprocess;
use ecg_scan::segmentation;
use ecg_scan::synthetic::{self, SyntheticSheet};
use ecg_scan::tools::{
    dataset_scans, load_rgb, save_gray, save_mask, save_rgb, write_feature_row,
    write_signals_csv,
};
use ecg_scan::utils::grayscale::normalize;
use ecg_scan::{ModelArtifacts, Pipeline, diagnose_batch, features};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "ecgtool", version, about = "Paper ECG digitization and diagnosis tools")]
struct Cli {
    /// Log every pipeline stage
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum ConditionArg {
    Normal,
    AbnormalHeartbeat,
    MyocardialInfarction,
    HistoryOfMi,
}

impl From<ConditionArg> for Condition {
    fn from(arg: ConditionArg) -> Self {
        match arg {
            ConditionArg::Normal => Condition::Normal,
            ConditionArg::AbnormalHeartbeat => Condition::AbnormalHeartbeat,
            ConditionArg::MyocardialInfarction => Condition::MyocardialInfarction,
            ConditionArg::HistoryOfMi => Condition::HistoryOfMyocardialInfarction,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Diagnose a single scan
    Diagnose {
        #[arg(long)]
        image: PathBuf,
        #[arg(long)]
        artifacts: PathBuf,
        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
        /// Substitute zeros for leads without a trace instead of failing
        #[arg(long)]
        zero_fill: bool,
    },
    /// Print per-lead binarization and contour statistics
    Inspect {
        #[arg(long)]
        image: PathBuf,
    },
    /// Write lead crops, masks, signals and features of a scan
    DumpLeads {
        #[arg(long)]
        image: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
    /// Diagnose every scan of a dataset with one folder per class
    Batch {
        #[arg(long)]
        root: PathBuf,
        #[arg(long)]
        artifacts: PathBuf,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Render a synthetic ECG sheet
    Synth {
        #[arg(long)]
        out: PathBuf,
        #[arg(long, value_enum, default_value_t = ConditionArg::Normal)]
        condition: ConditionArg,
        #[arg(long, default_value_t = 1106)]
        width: usize,
        #[arg(long, default_value_t = 786)]
        height: usize,
        #[arg(long)]
        no_grid: bool,
    },
    /// Fit demonstration artifacts to synthetic templates
    DemoArtifacts {
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value_t = 1106)]
        width: usize,
        #[arg(long, default_value_t = 786)]
        height: usize,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match cli.command {
        Command::Diagnose {
            image,
            artifacts,
            json,
            zero_fill,
        } => diagnose_cmd(&image, &artifacts, json, zero_fill),
        Command::Inspect { image } => inspect_cmd(&image),
        Command::DumpLeads { image, out } => dump_leads_cmd(&image, &out),
        Command::Batch {
            root,
            artifacts,
            limit,
        } => batch_cmd(&root, &artifacts, limit),
        Command::Synth {
            out,
            condition,
            width,
            height,
            no_grid,
        } => synth_cmd(&out, condition.into(), width, height, no_grid),
        Command::DemoArtifacts { out, width, height } => demo_artifacts_cmd(&out, width, height),
    }
}

fn load_artifacts(dir: &Path, zero_fill: bool) -> anyhow::Result<ModelArtifacts> {
    let artifacts = ModelArtifacts::load_dir(dir)
        .with_context(|| format!("failed to load artifacts from {}", dir.display()))?;
    if !zero_fill {
        return Ok(artifacts);
    }
    let mut config = artifacts.config().clone();
    config.digitizer.missing_trace = MissingTracePolicy::ZeroFill;
    Ok(ModelArtifacts::from_parts(
        config,
        artifacts.pca().clone(),
        artifacts.classifier().clone(),
    )?)
}

fn load_image(path: &Path) -> anyhow::Result<SourceImage> {
    load_rgb(path).with_context(|| format!("failed to load image {}", path.display()))
}

fn diagnose_cmd(image: &Path, artifacts: &Path, json: bool, zero_fill: bool) -> anyhow::Result<()> {
    let artifacts = load_artifacts(artifacts, zero_fill)?;
    let scan = load_image(image)?;
    let report = Pipeline::new(&artifacts).run(&scan)?;

    if json {
        let signals: Vec<&LeadSignal> = report.signals().collect();
        let out = serde_json::json!({
            "image": image.display().to_string(),
            "label": report.label,
            "reduced": report.reduced,
            "zero_filled": report.zero_filled_leads(),
            "signals": signals,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("Image: {} ({}x{})", image.display(), scan.width(), scan.height());
    for d in &report.digitized {
        println!(
            "  {:>6}: threshold={:3} contours={:2} p2p={:.3} mV{}",
            d.signal.lead.name(),
            d.threshold,
            d.contour_count,
            d.signal.peak_to_peak(),
            if d.signal.zero_filled { " (zero-filled)" } else { "" }
        );
    }
    println!(
        "Features: {}  Reduced: {}  Time: {:.1} ms",
        report.features.len(),
        report.reduced.len(),
        report.timings.total().as_secs_f64() * 1000.0
    );
    println!("Diagnosis: {}", report.label);
    Ok(())
}

fn inspect_cmd(image: &Path) -> anyhow::Result<()> {
    let cfg = config::env_default();
    let scan = load_image(image)?;
    let gray = normalize(&scan)?;
    println!("Image: {} ({}x{})", image.display(), gray.width(), gray.height());
    if let Some(stats) = gray.stats() {
        println!(
            "Grayscale stats: min={}, max={}, mean={}",
            stats.min, stats.max, stats.mean
        );
    }
    println!("Layout: {} ({} leads)", cfg.layout.name, cfg.layout.len());

    let regions = segmentation::segment(&gray, &cfg.layout);
    let previews = preprocess::preprocess_leads(&regions, &cfg.digitizer.binarization);
    for (region, preview) in regions.iter().zip(&previews) {
        let trace = match digitizer::digitize_lead(region, &cfg.digitizer) {
            Ok(d) => format!(
                "contours={} p2p={:.3} mV",
                d.contour_count,
                d.signal.peak_to_peak()
            ),
            Err(err) => format!("FAILED: {err}"),
        };
        println!(
            "  {:>2} {:>6} rect=({},{} {}x{}) threshold={:3} ink={:.2}% {}",
            region.index,
            region.lead.name(),
            region.rect.x,
            region.rect.y,
            region.rect.width,
            region.rect.height,
            preview.threshold,
            preview.mask.ink_ratio() * 100.0,
            trace
        );
    }
    Ok(())
}

fn file_stem(lead: Lead) -> String {
    lead.name().replace(' ', "_")
}

fn dump_leads_cmd(image: &Path, out: &Path) -> anyhow::Result<()> {
    let cfg = config::env_default();
    let scan = load_image(image)?;
    let gray = normalize(&scan)?;
    fs::create_dir_all(out).with_context(|| format!("failed to create {}", out.display()))?;

    save_gray(&gray, out.join("gray.png"))?;
    let regions = segmentation::segment(&gray, &cfg.layout);
    for (lead, crop) in segmentation::segment_color(&scan, &cfg.layout) {
        save_rgb(&crop, out.join(format!("lead_{}.png", file_stem(lead))))?;
    }
    for preview in preprocess::preprocess_leads(&regions, &cfg.digitizer.binarization) {
        save_mask(&preview.mask, out.join(format!("mask_{}.png", file_stem(preview.lead))))?;
    }

    let signals: Vec<LeadSignal> = digitizer::digitize_leads(&regions, &cfg.digitizer)?
        .into_iter()
        .map(|d| d.signal)
        .collect();
    write_signals_csv(BufWriter::new(File::create(out.join("signals.csv"))?), &signals)?;

    let features = features::assemble(&signals, cfg.layout.len(), cfg.digitizer.sample_count)?;
    write_feature_row(BufWriter::new(File::create(out.join("features.csv"))?), None, &features)?;

    println!(
        "Wrote {} leads ({} features) to {}",
        signals.len(),
        features.len(),
        out.display()
    );
    Ok(())
}

fn batch_cmd(root: &Path, artifacts: &Path, limit: Option<usize>) -> anyhow::Result<()> {
    if !root.exists() {
        bail!("dataset root not found: {}", root.display());
    }
    let artifacts = load_artifacts(artifacts, false)?;
    let entries = dataset_scans(root, limit)
        .with_context(|| format!("failed to list {}", root.display()))?;
    if entries.is_empty() {
        println!("No images found under {}", root.display());
        return Ok(());
    }

    let start = Instant::now();
    let mut scans = Vec::with_capacity(entries.len());
    let mut loaded = Vec::with_capacity(entries.len());
    for entry in &entries {
        match load_rgb(&entry.path) {
            Ok(scan) => {
                scans.push(scan);
                loaded.push(entry);
            }
            Err(err) => eprintln!("Failed to load image {}: {}", entry.path.display(), err),
        }
    }
    let results = diagnose_batch(&artifacts, &scans);

    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    let (mut labelled, mut correct, mut failed) = (0usize, 0usize, 0usize);
    for (entry, result) in loaded.iter().zip(&results) {
        let path = &entry.path;
        match result {
            Ok(label) => {
                *counts.entry(label.name.clone()).or_default() += 1;
                if let Some(expected) = entry.expected {
                    labelled += 1;
                    if label.condition() == Some(expected) {
                        correct += 1;
                    }
                }
                println!("{}: {}", path.display(), label);
            }
            Err(err) => {
                failed += 1;
                println!("{}: FAILED ({})", path.display(), err);
            }
        }
    }

    println!("\nProcessed {} images in {:.2}s", loaded.len(), start.elapsed().as_secs_f64());
    for (label, count) in &counts {
        println!("  {label}: {count}");
    }
    println!("  failed: {failed}");
    if labelled > 0 {
        println!(
            "Accuracy on labelled images: {}/{} = {:.2}%",
            correct,
            labelled,
            correct as f64 / labelled as f64 * 100.0
        );
    }
    Ok(())
}

fn synth_cmd(
    out: &Path,
    condition: Condition,
    width: usize,
    height: usize,
    no_grid: bool,
) -> anyhow::Result<()> {
    let mut sheet = SyntheticSheet::new(width, height);
    if no_grid {
        sheet = sheet.without_grid();
    }
    let image = sheet.render(synthetic::condition_waveform(condition))?;
    save_rgb(&image, out).with_context(|| format!("failed to write {}", out.display()))?;
    println!("Wrote {} sheet {}x{} to {}", condition.name(), width, height, out.display());
    Ok(())
}

fn demo_artifacts_cmd(out: &Path, width: usize, height: usize) -> anyhow::Result<()> {
    let artifacts = synthetic::demo_artifacts(PipelineConfig::default(), width, height)?;
    artifacts.save_dir(out)?;
    println!(
        "Wrote demo artifacts ({} -> {} dims, {} classes) to {}",
        artifacts.pca().input_dim(),
        artifacts.pca().output_dim(),
        artifacts.labels().len(),
        out.display()
    );
    Ok(())
}
