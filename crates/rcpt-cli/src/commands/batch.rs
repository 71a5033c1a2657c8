//! Batch processing command for multiple receipts.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::debug;

use rcpt_core::receipt::BatchItem;

use super::{
    apply_overrides, build_pipeline, is_supported, load_config, FileOcr, OutputFormat,
    StrategyArg,
};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern for receipt images or `.txt` transcripts
    #[arg(required = true)]
    input: String,

    /// Output format for the results
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Also write a summary CSV
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Scoring model (overrides config)
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// OCR model directory (overrides config)
    #[arg(long)]
    ocr_dir: Option<PathBuf>,

    /// Extraction strategy (overrides config)
    #[arg(short, long, value_enum)]
    strategy: Option<StrategyArg>,
}

#[derive(Serialize)]
struct BatchRecord<'a> {
    file: String,
    description: &'a str,
    amount: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

impl<'a> From<&'a BatchItem<'_, PathBuf>> for BatchRecord<'a> {
    fn from(item: &'a BatchItem<'_, PathBuf>) -> Self {
        Self {
            file: item.image.display().to_string(),
            description: &item.fields.description,
            amount: &item.fields.amount,
            error: item.error.as_deref(),
        }
    }
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    apply_overrides(
        &mut config,
        args.model.as_ref(),
        args.ocr_dir.as_ref(),
        args.strategy,
    );

    let mut files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| is_supported(p))
        .collect();
    files.sort();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    eprintln!(
        "{} Found {} receipts to process",
        style("ℹ").blue(),
        files.len()
    );

    let ocr = FileOcr::for_files(&files, &config.ocr)?;
    let pipeline = build_pipeline(&config);

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} receipts")?
            .progress_chars("=>-"),
    );

    let mut on_progress = |done: usize, _total: usize| pb.set_position(done as u64);
    let items = pipeline.process_batch(&ocr, &files, Some(&mut on_progress))?;
    pb.finish_and_clear();
    pipeline.release();

    let records: Vec<BatchRecord> = items.iter().map(BatchRecord::from).collect();

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&records)?),
        OutputFormat::Text => {
            for record in &records {
                match record.error {
                    Some(error) => println!(
                        "{} {}: {}",
                        style("✗").red(),
                        record.file,
                        error
                    ),
                    None => println!(
                        "{} {}: {} | {}",
                        style("✓").green(),
                        record.file,
                        record.description,
                        if record.amount.is_empty() { "-" } else { record.amount }
                    ),
                }
            }
        }
    }

    if let Some(summary_path) = &args.summary {
        write_summary(summary_path, &records)?;
        eprintln!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let failed = items.iter().filter(|item| item.is_error()).count();
    eprintln!(
        "{} Processed {} receipts: {} succeeded, {} failed",
        style("ℹ").blue(),
        items.len(),
        items.len() - failed,
        failed
    );

    debug!("Batch completed in {:?}", start.elapsed());

    Ok(())
}

fn write_summary(path: &Path, records: &[BatchRecord]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["file", "description", "amount", "error"])?;

    for record in records {
        wtr.write_record([
            record.file.as_str(),
            record.description,
            record.amount,
            record.error.unwrap_or(""),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
