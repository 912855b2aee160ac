//! Command line front end for the difference engine.
//!
//! ```bash
//! diff_tester --original a.png --modified b.png --out-dir ./out --format png
//! diff_tester --original a.jpg --modified b.jpg --settings puzzle.json --touch-distance 20
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use waldo_diff::{DiffSettings, OutputFormat, ParallelDiffPipeline, SimilarityMode};

/// Find and circle the differences between two images.
#[derive(Parser, Debug)]
#[command(name = "diff_tester")]
#[command(version, about, long_about = None)]
struct Args {
    /// The unmodified image
    #[arg(long)]
    original: PathBuf,

    /// The image with the differences painted in
    #[arg(long)]
    modified: PathBuf,

    /// JSON settings file (camelCase keys, missing keys take defaults)
    #[arg(long)]
    settings: Option<PathBuf>,

    #[arg(long)]
    threshold: Option<u8>,

    #[arg(long)]
    min_area: Option<f64>,

    #[arg(long)]
    dilation_iter: Option<u32>,

    #[arg(long)]
    circle_thickness: Option<u32>,

    /// Circle colour as #RRGGBB
    #[arg(long)]
    circle_color: Option<String>,

    /// Max center distance (px) for two regions to count as touching
    #[arg(long)]
    touch_distance: Option<f64>,

    /// Overlay opacity, 0..=255 (0 disables the overlay)
    #[arg(long)]
    overlay_opacity: Option<u8>,

    /// basic | textured
    #[arg(long)]
    similarity: Option<SimilarityMode>,

    /// Directory that receives combined.<ext> and answer.<ext>
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// jpeg | png
    #[arg(long, default_value = "jpeg")]
    format: OutputFormat,

    /// Analysis workers (defaults to the CPU count)
    #[arg(long)]
    workers: Option<usize>,
}

impl Args {
    fn resolve_settings(&self) -> Result<DiffSettings> {
        let mut settings = match &self.settings {
            Some(path) => DiffSettings::from_json_file(path)
                .with_context(|| format!("reading settings from {}", path.display()))?,
            None => DiffSettings::default(),
        };
        if let Some(v) = self.threshold {
            settings.threshold = v;
        }
        if let Some(v) = self.min_area {
            settings.min_area = v;
        }
        if let Some(v) = self.dilation_iter {
            settings.dilation_iter = v;
        }
        if let Some(v) = self.circle_thickness {
            settings.circle_thickness = v;
        }
        if let Some(v) = &self.circle_color {
            settings.circle_color = v.clone();
        }
        if let Some(v) = self.touch_distance {
            settings.touch_distance = v;
        }
        if let Some(v) = self.overlay_opacity {
            settings.overlay_opacity = v;
        }
        if let Some(v) = self.similarity {
            settings.similarity = v;
        }
        Ok(settings)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // --- 1. Argument Parsing & Setup ---
    let args = Args::parse();
    let settings = args.resolve_settings()?;

    // --- 2. Input Loading ---
    let original = tokio::fs::read(&args.original)
        .await
        .with_context(|| format!("reading {}", args.original.display()))?;
    let modified = tokio::fs::read(&args.modified)
        .await
        .with_context(|| format!("reading {}", args.modified.display()))?;

    // --- 3. Pipeline ---
    let pipeline = match args.workers {
        Some(workers) => ParallelDiffPipeline::with_workers(settings, workers),
        None => ParallelDiffPipeline::new(settings),
    }
    .map_err(|e| anyhow::anyhow!("[{:?}] {e}", e.stage()))?;
    let active = pipeline.settings();
    info!(
        workers = pipeline.workers(),
        threshold = active.threshold,
        touch_distance = active.touch_distance,
        similarity = ?active.similarity,
        "pipeline ready"
    );

    let report = pipeline
        .process_bytes(original, modified, args.format)
        .await
        .map_err(|e| anyhow::anyhow!("[{:?}] {e}", e.stage()))?;

    // --- 4. Output ---
    tokio::fs::create_dir_all(&args.out_dir)
        .await
        .with_context(|| format!("creating {}", args.out_dir.display()))?;
    let ext = args.format.extension();
    let combined_path = args.out_dir.join(format!("combined.{ext}"));
    let answer_path = args.out_dir.join(format!("answer.{ext}"));
    tokio::fs::write(&combined_path, &report.combined_image)
        .await
        .with_context(|| format!("writing {}", combined_path.display()))?;
    tokio::fs::write(&answer_path, &report.answer_image)
        .await
        .with_context(|| format!("writing {}", answer_path.display()))?;

    println!("differences: {}", report.diff_count);
    println!("circles:     {}", report.circles_created);
    println!("combined:    {}", combined_path.display());
    println!("answer:      {}", answer_path.display());

    Ok(())
}
