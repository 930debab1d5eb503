//! Dataset download tool.
//!
//! Fetches the skin disease dataset from Kaggle, locates the class folders in
//! the download and installs them into the training directory.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use skin_core::cli::{resolve_pipeline_config, rule, setup_cli_logging};
use skin_core::{Error, CLASS_NAMES};
use skin_dataset::acquire::troubleshooting;
use skin_dataset::{
    install_dataset, verify_structure, AssumeYes, DatasetFetcher, InstallOutcome, KaggleFetcher,
    OverwritePrompt, StdinPrompt,
};
use tracing::info;

#[derive(Parser)]
#[command(name = "download")]
#[command(about = "Download the skin diseases dataset into train/", long_about = None)]
struct Cli {
    /// Pipeline configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Dataset handle, <owner>/<slug>
    #[arg(long)]
    dataset: Option<String>,

    /// Directory the class folders are installed into
    #[arg(long)]
    target: Option<PathBuf>,

    /// Overwrite an existing target without asking
    #[arg(short, long)]
    yes: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_cli_logging(cli.verbose)?;

    let mut config = resolve_pipeline_config(cli.config.as_deref())
        .context("Failed to load pipeline configuration")?;
    if let Some(dataset) = cli.dataset {
        config.acquisition.dataset = dataset;
    }
    if let Some(target) = cli.target {
        config.acquisition.target_dir = target;
    }
    let acquisition = config.acquisition;
    let target = acquisition.target_dir.clone();

    println!("{}", rule(60));
    println!("{}", "Skin Diseases Dataset Downloader".green().bold());
    println!("{}", rule(60));
    println!("\nDataset: {}", acquisition.dataset);
    println!("This may take a few minutes...\n");

    let fetcher = KaggleFetcher::from_config(&acquisition)?;
    let download_root = match fetcher.fetch(&acquisition.dataset) {
        Ok(path) => path,
        Err(e) => {
            println!("\n{} Error downloading dataset: {}", "✗".red(), e);
            println!("\n{}", "Troubleshooting:".yellow().bold());
            for (i, hint) in troubleshooting(&acquisition.dataset_url()).iter().enumerate() {
                println!("{}. {}", i + 1, hint);
            }
            println!("\n{} Download failed. Exiting.", "✗".red());
            return Ok(());
        }
    };
    println!("{} Dataset downloaded to: {}", "✓".green(), download_root.display());

    println!("\n{}", rule(60));
    println!("{}", "Setting Up Train Directory".cyan().bold());
    println!("{}", rule(60));

    info!("Installing into {}", target.display());
    let mut prompt: Box<dyn OverwritePrompt> = if cli.yes {
        Box::new(AssumeYes)
    } else {
        Box::new(StdinPrompt)
    };

    match install_dataset(&download_root, &target, prompt.as_mut()) {
        Ok(InstallOutcome::Installed {
            source,
            copied,
            missing,
        }) => {
            println!("\nFound data at: {}", source.display());
            for (class, count) in &copied {
                println!("  {} {}: {} images", "✓".green(), class, count);
            }
            for class in &missing {
                println!("  {} {}: not found", "⚠".yellow(), class);
            }
            if copied.is_empty() {
                println!("{} Copied '{}' to '{}'", "✓".green(), source.display(), target.display());
            }
        }
        Ok(InstallOutcome::Declined) => {
            println!("Aborted.");
            println!("\n{} Setup failed. Exiting.", "✗".red());
            return Ok(());
        }
        Err(Error::ClassesNotFound { expected, searched }) => {
            println!("\n{} Could not find train directory with expected classes", "✗".red());
            println!("Expected classes: {:?}", expected);
            println!("Searched in: {}", searched.display());
            println!("\n{} Setup failed. Exiting.", "✗".red());
            return Ok(());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to install into {}", target.display()))
        }
    }

    println!("\n{}", rule(60));
    println!("{}", "Verifying Directory Structure".cyan().bold());
    println!("{}", rule(60));

    let stats = verify_structure(&target)?;
    println!();
    for class in &stats.classes {
        if class.present {
            println!("  {} {}: {} images", "✓".green(), class.class_name, class.images);
        } else {
            println!("  {} {}: NOT FOUND", "✗".red(), class.class_name);
        }
    }
    println!("\nTotal images: {}", stats.total());

    if !stats.is_valid() {
        println!("\n{} Setup incomplete. Please check the errors above.", "✗".red());
        return Ok(());
    }

    println!("\n{}", rule(60));
    println!("{}", "Setup Complete!".green().bold());
    println!("{}", rule(60));
    println!(
        "\n{} Dataset ready in '{}/' ({} classes: {})",
        "✓".green(),
        target.display(),
        CLASS_NAMES.len(),
        CLASS_NAMES.join(", ")
    );
    println!("\n{}", "Next steps:".cyan().bold());
    println!("  1. Run: cargo run --release -p prepare");
    println!("  2. Run: cargo run --release -p train");
    println!("  3. Run: cargo run --release -p evaluate");

    Ok(())
}
