// Size-targeted image compressor

use anyhow::{Context, Result};
use clap::Parser;
use size_target::output::{archive_name, format_size, write_outputs};
use size_target::source::{folder_name, load_images};
use size_target::{
    preview, BatchRunner, CompressionEngine, CompressionSettings, CompressionStatus, RunPreview,
    RunSummary, TargetPreset,
};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Shrink every JPEG, PNG and WebP under a folder to fit a size limit
#[derive(Parser, Debug)]
#[command(name = "size-target")]
#[command(version)]
#[command(about = "Compress images to land just under a target file size", long_about = None)]
struct Args {
    /// Image file or folder to process
    input: PathBuf,

    /// Size limit preset in MB: 1, 2 or 5
    #[arg(short, long, default_value = "1")]
    target: TargetPreset,

    /// Exact size limit in bytes, overrides --target
    #[arg(long)]
    target_bytes: Option<u64>,

    /// Folder to create the output in (defaults to the input's parent)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Only show the projected sizes, encode nothing
    #[arg(long)]
    dry_run: bool,

    /// Log every encoder step
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    let settings = match args.target_bytes {
        Some(bytes) => CompressionSettings::new(bytes)?,
        None => CompressionSettings::from(args.target),
    };

    let images = load_images(&args.input)
        .with_context(|| format!("Failed to load images from {}", args.input.display()))?;

    let projection = preview(&images, &settings);
    print_preview(&projection, &settings);
    if args.dry_run {
        return Ok(());
    }

    info!(images = images.len(), target = settings.target_bytes(), "starting compression");
    let runner = BatchRunner::new(CompressionEngine::default());
    let summary = runner.run(images, settings).await;
    print_results(&summary);

    let root = match &args.output {
        Some(dir) => dir.clone(),
        None => default_output_root(&args.input),
    };
    let name = archive_name(&folder_name(&args.input), &chrono::Local::now().naive_local());
    let dir = write_outputs(&root.join(name), summary.outputs())
        .context("Failed to write compressed images")?;
    println!("Output: {}", dir.display());

    Ok(())
}

fn default_output_root(input: &Path) -> PathBuf {
    input
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn print_preview(projection: &RunPreview, settings: &CompressionSettings) {
    for entry in &projection.entries {
        if entry.original_size > settings.target_bytes() {
            println!(
                "  {}  {} → {}  (will compress to {})",
                entry.name,
                format_size(entry.original_size),
                format_size(entry.projected_size),
                format_size(settings.target_bytes())
            );
        } else {
            println!(
                "  {}  {}  (no compression needed)",
                entry.name,
                format_size(entry.original_size)
            );
        }
    }
    println!(
        "{} files, {} to compress, {} → {} (saves {:.1}%)",
        projection.file_count(),
        projection.need_compression,
        format_size(projection.total_original),
        format_size(projection.total_projected),
        projection.savings_percent()
    );
}

fn print_results(summary: &RunSummary) {
    for result in summary.results() {
        let status = match result.status {
            CompressionStatus::Failed => "[FAIL]",
            CompressionStatus::Skipped => "[SKIP]",
            CompressionStatus::Compressed => "[OK]",
        };
        match result.status {
            CompressionStatus::Compressed => println!(
                "{:<6} {}  {} → {} ({:.1}% smaller, ratio {:.2})",
                status,
                result.name,
                format_size(result.original_size),
                format_size(result.final_size()),
                result.reduction_percent(),
                result.compression_ratio()
            ),
            CompressionStatus::Skipped => println!("{:<6} {}  {}", status, result.name, result.status),
            CompressionStatus::Failed => {
                println!("{:<6} {}  {} (original kept)", status, result.name, result.message)
            }
        }
    }
    println!(
        "{} files, {} compressed, {} skipped, {} failed, {} → {} (saved {:.1}%)",
        summary.len(),
        summary.compressed,
        summary.skipped,
        summary.failed,
        format_size(summary.total_original),
        format_size(summary.total_final),
        summary.savings_percent()
    );
}
