use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use shopimg_contracts::config::ShopimgConfig;
use shopimg_contracts::events::{new_run_id, EventWriter};
use shopimg_contracts::runs::summary::{BatchSummary, ImageSource};
use shopimg_engine::{ImageEngine, JsonCatalog, Synthesizer};

#[derive(Debug, Parser)]
#[command(name = "shopimg", version, about = "Product image acquisition and normalization")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Give every product a labelled colour placeholder.
    Placeholders(JobArgs),
    /// Download mapped images, falling back to unlabelled placeholders.
    Download(JobArgs),
    /// Re-download selected products, trying alternate URLs.
    Refetch(RefetchArgs),
    /// Apply images saved locally under well-known names.
    Replace(ReplaceArgs),
    /// Write a single placeholder to a file.
    Synth(SynthArgs),
}

#[derive(Debug, Args)]
struct JobArgs {
    #[arg(long, default_value = "catalog.json")]
    catalog: PathBuf,
    #[arg(long, default_value = "media")]
    media: PathBuf,
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    events: Option<PathBuf>,
    #[arg(long)]
    run_id: Option<String>,
}

#[derive(Debug, Args)]
struct RefetchArgs {
    #[command(flatten)]
    job: JobArgs,
    #[arg(long = "slug")]
    slugs: Vec<String>,
}

#[derive(Debug, Args)]
struct ReplaceArgs {
    #[command(flatten)]
    job: JobArgs,
    #[arg(long, default_value = ".")]
    dir: PathBuf,
}

#[derive(Debug, Args)]
struct SynthArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    category: String,
    #[arg(long)]
    out: PathBuf,
    #[arg(long)]
    no_label: bool,
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("shopimg error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    dispatch(Cli::parse())
}

fn dispatch(cli: Cli) -> Result<i32> {
    match cli.command {
        Command::Placeholders(args) => run_placeholders(args),
        Command::Download(args) => run_download(args),
        Command::Refetch(args) => run_refetch(args),
        Command::Replace(args) => run_replace(args),
        Command::Synth(args) => run_synth(args),
    }
}

/// Catalog, engine and summary location shared by the batch jobs.
struct JobContext {
    catalog: JsonCatalog,
    engine: ImageEngine,
}

impl JobContext {
    fn open(args: &JobArgs) -> Result<Self> {
        let config = ShopimgConfig::load(args.config.as_deref())?;
        let events_path = args
            .events
            .clone()
            .unwrap_or_else(|| args.media.join("events.jsonl"));
        let run_id = args.run_id.clone().unwrap_or_else(new_run_id);
        let events = EventWriter::new(events_path, run_id);
        let catalog = JsonCatalog::open(&args.catalog, &args.media)?;
        let engine = ImageEngine::from_config(config, events)?
            .with_summary_path(args.media.join("summary.json"));
        Ok(Self { catalog, engine })
    }
}

fn run_placeholders(args: JobArgs) -> Result<i32> {
    let mut ctx = JobContext::open(&args)?;
    report_font(ctx.engine.synthesizer());
    let summary = ctx.engine.run_placeholders(&mut ctx.catalog)?;
    println!(
        "\nSuccessfully created: {}/{} images",
        summary.count(ImageSource::Synthesized),
        summary.total
    );
    Ok(0)
}

fn run_download(args: JobArgs) -> Result<i32> {
    let mut ctx = JobContext::open(&args)?;
    println!("Starting real image downloads...");
    let summary = ctx.engine.run_download(&mut ctx.catalog)?;
    println!(
        "\nSuccessfully downloaded: {}/{} images",
        summary.count(ImageSource::Downloaded),
        summary.total
    );
    Ok(0)
}

fn run_refetch(args: RefetchArgs) -> Result<i32> {
    let mut ctx = JobContext::open(&args.job)?;
    println!("Fixing specific product images...");
    let summary = ctx.engine.run_refetch(&mut ctx.catalog, &args.slugs)?;
    report_targeted("fixed", &summary);
    Ok(0)
}

fn run_replace(args: ReplaceArgs) -> Result<i32> {
    let mut ctx = JobContext::open(&args.job)?;
    println!("Replacing product images with custom files...");
    let summary = ctx.engine.run_replace(&mut ctx.catalog, &args.dir)?;
    if summary.total > 0 {
        report_targeted("replaced", &summary);
    }
    Ok(0)
}

fn run_synth(args: SynthArgs) -> Result<i32> {
    let config = ShopimgConfig::load(args.config.as_deref())?;
    let synthesizer = Synthesizer::from_config(&config);
    let label = !args.no_label;
    if label {
        report_font(&synthesizer);
    }
    let image = synthesizer.synthesize(&args.name, &args.category, label);
    write_output(&args.out, image.bytes())?;
    println!("Saved image: {}", args.out.display());
    Ok(0)
}

fn report_targeted(verb: &str, summary: &BatchSummary) {
    println!(
        "\nSuccessfully {verb}: {}/{} images",
        summary.saved.len(),
        summary.total
    );
    if summary.all_saved() && summary.total > 0 {
        println!("All target images have been updated");
    }
}

fn report_font(synthesizer: &Synthesizer) {
    match synthesizer.font_source() {
        Some(path) => println!("Label font: {}", path.display()),
        None => println!("No label font available, placeholders will be unlabelled"),
    }
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))
}
