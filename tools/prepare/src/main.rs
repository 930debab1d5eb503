//! Dataset preparation tool.
//!
//! Splits `train/<class>/` into `dataset/{train,val,test}/<class>/` with a
//! seeded shuffle, copying the files.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use skin_core::cli::{resolve_pipeline_config, rule, setup_cli_logging};
use skin_core::Error;
use skin_dataset::split_dataset;
use tracing::info;

#[derive(Parser)]
#[command(name = "prepare")]
#[command(about = "Split the dataset into train/val/test", long_about = None)]
struct Cli {
    /// Pipeline configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory containing one folder per class
    #[arg(long)]
    source: Option<PathBuf>,

    /// Output root for the split directories
    #[arg(long)]
    output: Option<PathBuf>,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_cli_logging(cli.verbose)?;

    let mut config = resolve_pipeline_config(cli.config.as_deref())
        .context("Failed to load pipeline configuration")?;
    let split = &mut config.split;
    if let Some(source) = cli.source {
        split.source_dir = source;
    }
    if let Some(output) = cli.output {
        split.output_dir = output;
    }
    if let Some(seed) = cli.seed {
        split.seed = seed;
    }

    println!("{}", rule(60));
    println!("{}", "Preparing Dataset Splits".green().bold());
    println!("{}", rule(60));
    println!("\nSource: {}", split.source_dir.display());
    println!("Output: {}", split.output_dir.display());
    println!(
        "Ratios: train {:.0}% / val {:.0}% / test remainder",
        split.ratios.train * 100.0,
        split.ratios.val * 100.0
    );
    println!("Seed:   {}\n", split.seed);

    let info = match split_dataset(split) {
        Ok(info) => info,
        Err(Error::NotFound(msg)) => {
            println!("{} {}", "✗".red(), msg);
            println!("Run the download tool first to populate it.");
            return Ok(());
        }
        Err(e) => return Err(e).context("Failed to split dataset"),
    };

    info!(
        "Wrote {} images across {} classes",
        info.total(),
        info.classes.len()
    );
    println!("{}", "Split Statistics:".cyan().bold());
    println!("{}", info.table());
    println!(
        "{} Dataset prepared in '{}/'",
        "✓".green(),
        split.output_dir.display()
    );
    println!("\n{}", "Next steps:".cyan().bold());
    println!("  cargo run --release -p train");

    Ok(())
}
