//! Training CLI Tool
//!
//! Trains the skin disease classifier through the external `yolo` toolkit,
//! then exports the best checkpoint to ONNX.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use skin_core::cli::{resolve_pipeline_config, rule, save_toml_config, setup_cli_logging};
use skin_core::{Device, TrainingParams};
use skin_training::{SystemRunner, Trainer};
use tracing::info;

#[derive(Parser)]
#[command(name = "train")]
#[command(about = "Train the skin disease classifier", long_about = None)]
struct Cli {
    /// Pipeline configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of training epochs
    #[arg(short, long)]
    epochs: Option<usize>,

    /// Batch size
    #[arg(short, long)]
    batch: Option<usize>,

    /// Device: auto, cuda, mps or cpu
    #[arg(short, long)]
    device: Option<Device>,

    /// Print the resolved configuration and command without training
    #[arg(long)]
    dry_run: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn print_config(params: &TrainingParams) {
    println!("\n{}", "Training Configuration:".cyan().bold());
    println!("{}", params);
    println!("  Output:       {}", params.run_dir().display());
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_cli_logging(cli.verbose)?;

    let mut config = resolve_pipeline_config(cli.config.as_deref())
        .context("Failed to load pipeline configuration")?;
    let params = &mut config.training;
    if let Some(epochs) = cli.epochs {
        params.epochs = epochs;
    }
    if let Some(batch) = cli.batch {
        params.batch_size = batch;
    }
    if let Some(device) = cli.device {
        params.device = device;
    }
    params.validate().context("Invalid training parameters")?;
    params.device = params.device.resolve();

    println!("{}", rule(60));
    println!("{}", "Skin Diseases Classification Training".green().bold());
    println!("{}", rule(60));
    print_config(params);

    let mut trainer = Trainer::new(SystemRunner, &config.yolo.executable, params.clone());
    println!("\n{} {}", "Command:".cyan().bold(), trainer.command());

    if cli.dry_run {
        println!("\nDry run, nothing was trained.");
        return Ok(());
    }

    let saved = trainer.params().run_dir().join("pipeline_train.toml");
    save_toml_config(trainer.params(), &saved)
        .with_context(|| format!("Failed to save {}", saved.display()))?;
    info!("Saved resolved configuration to {}", saved.display());

    println!("\n{}", "Starting Training...".green().bold());
    let outcome = trainer.train().context("Training failed")?;

    let Some(checkpoint) = outcome.checkpoint else {
        println!(
            "\n{} No best.pt was found under {}",
            "✗".red(),
            trainer.params().run_dir().display()
        );
        println!("Check the trainer output above; the model was not exported.");
        return Ok(());
    };

    println!("\n{}", rule(60));
    println!("{}", "Training Complete!".green().bold());
    println!("{}", rule(60));
    println!("\n{} Best model: {}", "✓".green(), checkpoint.display());
    match outcome.onnx {
        Some(onnx) => println!("{} ONNX export: {}", "✓".green(), onnx.display()),
        None => println!("{} ONNX export was not produced", "⚠".yellow()),
    }

    println!("\n{}", "Next steps:".cyan().bold());
    println!("  cargo run --release -p evaluate");
    println!("  cargo run --release -p showcase");

    Ok(())
}
