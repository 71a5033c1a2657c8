//! Model command - inspect the scoring model.

use std::path::PathBuf;
use std::time::Instant;

use clap::{Args, Subcommand};
use console::style;

use super::{apply_overrides, build_pipeline, load_config};

/// Arguments for the model command.
#[derive(Args)]
pub struct ModelArgs {
    #[command(subcommand)]
    command: ModelCommand,
}

#[derive(Subcommand)]
enum ModelCommand {
    /// Load the model and print its discovered signature
    Inspect {
        /// Scoring model (overrides config)
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Print the signature as JSON
        #[arg(long)]
        json: bool,
    },
}

pub async fn run(args: ModelArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    match args.command {
        ModelCommand::Inspect { model, json } => inspect(config_path, model, json),
    }
}

fn inspect(config_path: Option<&str>, model: Option<PathBuf>, json: bool) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    apply_overrides(&mut config, model.as_ref(), None, None);

    if !config.model.path.exists() {
        anyhow::bail!("Model not found: {}", config.model.path.display());
    }

    let start = Instant::now();
    let pipeline = build_pipeline(&config);
    let signature = pipeline.handle().signature()?;
    let load_time = start.elapsed();
    pipeline.release();

    if json {
        println!("{}", serde_json::to_string_pretty(&signature)?);
        return Ok(());
    }

    println!("{}", style("Scoring model").bold());
    println!("  Path:            {}", config.model.path.display());
    println!("  Loaded in:       {:?}", load_time);
    println!("  Sequence length: {}", signature.sequence_length);
    println!(
        "  Token input:     {} ({:?})",
        signature.ids_input, signature.ids_type
    );
    println!(
        "  Mask input:      {} ({:?})",
        signature.mask_input, signature.mask_type
    );
    println!(
        "  Description out: {} {:?}",
        signature.description_output.name, signature.description_output.shape
    );
    println!(
        "  Amount out:      {} {:?}",
        signature.amount_output.name, signature.amount_output.shape
    );

    Ok(())
}
