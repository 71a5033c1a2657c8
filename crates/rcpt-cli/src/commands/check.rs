//! Check command - keyword heuristics only, no scoring model.

use std::path::PathBuf;

use clap::Args;
use console::style;
use serde::Serialize;

use rcpt_core::receipt::rules::{extract_total_from_lines, guess_description, is_receipt_like};
use rcpt_core::OcrProvider;

use super::{is_supported, load_config, FileOcr, OutputFormat};

/// Arguments for the check command.
#[derive(Args)]
pub struct CheckArgs {
    /// Receipt image, or a `.txt` OCR transcript
    #[arg(required = true)]
    input: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// OCR model directory (overrides config)
    #[arg(long)]
    ocr_dir: Option<PathBuf>,
}

#[derive(Serialize)]
struct CheckOutput {
    file: String,
    receipt_like: bool,
    total: String,
    description: Option<String>,
}

pub async fn run(args: CheckArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(dir) = &args.ocr_dir {
        config.ocr.model_dir = dir.clone();
    }

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }
    if !is_supported(&args.input) {
        anyhow::bail!("Unsupported file format: {}", args.input.display());
    }

    let ocr = FileOcr::for_files(std::slice::from_ref(&args.input), &config.ocr)?;
    let text = ocr.recognize(&args.input)?;
    let lines: Vec<&str> = text.lines().collect();

    let output = CheckOutput {
        file: args.input.display().to_string(),
        receipt_like: is_receipt_like(&text),
        total: extract_total_from_lines(&lines),
        description: guess_description(&lines),
    };

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&output)?),
        OutputFormat::Text => {
            if output.receipt_like {
                println!("{} Looks like a receipt", style("✓").green());
            } else {
                println!("{} Does not look like a receipt", style("✗").yellow());
            }
            println!(
                "Total: {}",
                if output.total.is_empty() { "-" } else { output.total.as_str() }
            );
            println!(
                "Description: {}",
                output.description.as_deref().unwrap_or("-")
            );
        }
    }

    Ok(())
}
