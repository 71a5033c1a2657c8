//! Process command - extract description and amount from a single receipt.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use chrono::NaiveDate;
use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{debug, info};

use rcpt_core::sink::record_expense;
use rcpt_core::{DebugInfo, Expense, OcrProvider, ReceiptFields};

use super::{
    apply_overrides, build_pipeline, is_supported, load_config, FileOcr, OutputFormat,
    StrategyArg,
};
use crate::sheet::CsvSink;

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Receipt image, or a `.txt` OCR transcript
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Scoring model (overrides config)
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// OCR model directory (overrides config)
    #[arg(long)]
    ocr_dir: Option<PathBuf>,

    /// Extraction strategy (overrides config)
    #[arg(short, long, value_enum)]
    strategy: Option<StrategyArg>,

    /// Include model scores and confidence summaries
    #[arg(long)]
    debug: bool,

    /// Append the expense to this CSV file
    #[arg(long)]
    append: Option<PathBuf>,

    /// Expense category for the appended row
    #[arg(long, default_value = "Other")]
    category: String,

    /// Payment method for the appended row
    #[arg(long, default_value = "card")]
    method: String,

    /// Expense date for the appended row, YYYY-MM-DD (default: today)
    #[arg(long, value_parser = parse_date)]
    date: Option<NaiveDate>,
}

#[derive(Serialize)]
struct ProcessOutput<'a> {
    file: String,
    description: &'a str,
    amount: &'a str,
    currency: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    debug: Option<&'a DebugInfo>,
}

pub fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| format!("expected YYYY-MM-DD: {}", e))
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    apply_overrides(
        &mut config,
        args.model.as_ref(),
        args.ocr_dir.as_ref(),
        args.strategy,
    );

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }
    if !is_supported(&args.input) {
        anyhow::bail!("Unsupported file format: {}", args.input.display());
    }

    info!("Processing receipt: {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);

    pb.set_message("Reading receipt...");
    let ocr = FileOcr::for_files(std::slice::from_ref(&args.input), &config.ocr)?;
    let text = ocr.recognize(&args.input)?;
    debug!("Transcript has {} characters", text.chars().count());

    pb.set_message("Extracting fields...");
    let pipeline = build_pipeline(&config);
    let (fields, debug_info) = if args.debug {
        pipeline.process_receipt_with_debug(&text)?
    } else {
        (pipeline.process_receipt(&text)?, None)
    };

    pb.finish_and_clear();

    let output = format_result(&args, &fields, debug_info.as_ref(), &config.sheet.currency)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        eprintln!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    if let Some(sheet_path) = &args.append {
        let date = args
            .date
            .unwrap_or_else(|| chrono::Local::now().date_naive());
        let expense = Expense::from_fields(
            &fields,
            date,
            config.sheet.currency.clone(),
            args.category.clone(),
            args.method.clone(),
        );

        let mut sink = CsvSink::open(sheet_path)?;
        record_expense(&mut sink, &expense)?;
        eprintln!(
            "{} Appended expense to {}",
            style("✓").green(),
            sheet_path.display()
        );
    }

    pipeline.release();
    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

fn format_result(
    args: &ProcessArgs,
    fields: &ReceiptFields,
    debug_info: Option<&DebugInfo>,
    currency: &str,
) -> anyhow::Result<String> {
    match args.format {
        OutputFormat::Json => {
            let output = ProcessOutput {
                file: args.input.display().to_string(),
                description: &fields.description,
                amount: &fields.amount,
                currency,
                debug: debug_info,
            };
            Ok(serde_json::to_string_pretty(&output)?)
        }
        OutputFormat::Text => Ok(format_text(fields, debug_info, currency)),
    }
}

fn format_text(fields: &ReceiptFields, debug_info: Option<&DebugInfo>, currency: &str) -> String {
    let mut output = String::new();

    output.push_str(&format!("Description: {}\n", fields.description));
    if fields.has_amount() {
        output.push_str(&format!("Amount: {} {}\n", fields.amount, currency));
    } else {
        output.push_str("Amount: -\n");
    }

    if let Some(info) = debug_info {
        output.push('\n');
        output.push_str(&format!("Tokens: {}\n", info.tokenized_length));
        output.push_str(&format!(
            "Description confidence: avg {:.3}, max {:.3}\n",
            info.description_confidence_avg, info.max_description_confidence
        ));
        output.push_str(&format!(
            "Amount confidence: avg {:.3}, max {:.3}\n",
            info.amount_confidence_avg, info.max_amount_confidence
        ));
        output.push_str(&format!("Raw description: {:?}\n", info.extracted_description));
        output.push_str(&format!("Raw amount: {:?}\n", info.extracted_amount));
        output.push_str(&format!(
            "Reliable: {}\n",
            if info.reliable { "yes" } else { "no" }
        ));
    }

    output
}
