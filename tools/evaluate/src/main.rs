//! Evaluation CLI Tool
//!
//! Evaluates the best checkpoint on the held-out test split and writes the
//! confusion matrix heatmaps and classification report next to it.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use skin_core::cli::{resolve_pipeline_config, rule, setup_cli_logging};
use skin_core::{class_name, CLASS_NAMES};
use skin_training::trainer::{best_checkpoint_path, candidate_run_dirs};
use skin_training::{
    evaluate_dir, find_run_dir, open_classifier, val_command, CommandRunner, EvaluationResult,
    SystemRunner,
};
use skin_report::write_evaluation_artifacts;
use tracing::warn;

#[derive(Parser)]
#[command(name = "evaluate")]
#[command(about = "Evaluate the trained model on the test split", long_about = None)]
struct Cli {
    /// Pipeline configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Skip the toolkit's own validation pass
    #[arg(long)]
    skip_val: bool,

    /// Sample predictions printed per class
    #[arg(short, long)]
    samples_per_class: Option<usize>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn print_samples(result: &EvaluationResult, per_class: usize) {
    println!("\nTesting {} sample predictions per class...", per_class);
    for (label, name) in CLASS_NAMES.iter().enumerate() {
        let samples = result.samples_for_class(label, per_class);
        if samples.is_empty() {
            continue;
        }
        println!("\n{}:", name);
        for s in samples {
            let predicted = s.predicted_label().and_then(class_name).unwrap_or("unknown");
            let status = if s.is_correct() { "✓".green() } else { "✗".red() };
            println!(
                "  {} {}: {} ({:.2}%)",
                status,
                s.sample.file_name(),
                predicted,
                s.prediction.top1_conf() as f64 * 100.0
            );
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_cli_logging(cli.verbose)?;

    let config = resolve_pipeline_config(cli.config.as_deref())
        .context("Failed to load pipeline configuration")?;
    let evaluation = &config.evaluation;
    let yolo = config.yolo.executable.as_path();

    println!("{}", rule(60));
    println!("{}", "Skin Diseases Model Testing and Evaluation".green().bold());
    println!("{}", rule(60));

    let Some(run_dir) = find_run_dir(&config.training) else {
        let searched: Vec<_> = candidate_run_dirs(&config.training)
            .iter()
            .map(|d| best_checkpoint_path(d).display().to_string())
            .collect();
        println!("\n{} Model not found at {}", "✗".red(), searched.join(" or "));
        println!("Please train the model first (cargo run --release -p train)");
        return Ok(());
    };
    let checkpoint = best_checkpoint_path(&run_dir);
    println!("\nLoading model from {}...", checkpoint.display());

    if evaluation.run_builtin_val && !cli.skip_val {
        println!("\n{}", rule(60));
        println!("{}", "Evaluating on Test Set".cyan().bold());
        println!("{}\n", rule(60));
        let command = val_command(yolo, &checkpoint, &config.training.data);
        if let Err(e) = SystemRunner.run(&command) {
            warn!("Built-in validation failed: {}", e);
        }
    }

    println!("\nRunning predictions on test set...");
    let mut classifier = open_classifier(
        SystemRunner,
        &config.yolo,
        &checkpoint,
        config.training.image_size,
    )?;
    let result = evaluate_dir(&mut classifier, &evaluation.test_dir)
        .with_context(|| format!("Failed to evaluate {}", evaluation.test_dir.display()))?;

    println!("\n{}", result.confusion.display(&CLASS_NAMES));

    println!("{}", rule(60));
    println!("{}", "Classification Report".cyan().bold());
    println!("{}\n", rule(60));
    println!("{}", result.report);

    let artifacts = write_evaluation_artifacts(&run_dir, &result.confusion, &result.report)
        .with_context(|| format!("Failed to write results into {}", run_dir.display()))?;
    println!("{} Confusion matrix saved to {}", "✓".green(), artifacts.heatmap_png.display());
    println!("{} Annotated matrix saved to {}", "✓".green(), artifacts.heatmap_svg.display());
    println!("{} Classification report saved to {}", "✓".green(), artifacts.report.display());

    let per_class = cli.samples_per_class.unwrap_or(evaluation.samples_per_class);
    print_samples(&result, per_class);

    println!("\n{}", rule(60));
    println!("{}", "Testing Complete!".green().bold());
    println!("{}", rule(60));
    println!("\nResults saved in: {}", display_dir(&run_dir));

    Ok(())
}

fn display_dir(dir: &Path) -> String {
    format!("{}/", dir.display())
}
