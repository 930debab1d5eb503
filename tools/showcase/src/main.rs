//! Inference showcase tool.
//!
//! Samples a few test images per class, classifies them with the best
//! checkpoint and writes a Markdown gallery with the copied images.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use colored::Colorize;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use skin_core::cli::{resolve_pipeline_config, rule, setup_cli_logging};
use skin_core::DataSplit;
use skin_dataset::DatasetStatistics;
use skin_report::{
    build_records, render_markdown, sample_images, write_markdown, ModelInfo, ShowcaseStats,
};
use skin_training::{find_best_checkpoint, open_classifier, SystemRunner};
use tracing::info;

#[derive(Parser)]
#[command(name = "showcase")]
#[command(about = "Generate a Markdown gallery of sample predictions", long_about = None)]
struct Cli {
    /// Pipeline configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Images sampled per class
    #[arg(short, long)]
    samples_per_class: Option<usize>,

    /// Sampling seed
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
    if let Some(n) = cli.samples_per_class {
        config.showcase.samples_per_class = n;
    }
    if let Some(seed) = cli.seed {
        config.showcase.seed = seed;
    }
    let showcase = &config.showcase;

    println!("{}", rule(60));
    println!("{}", "Generating Inference Showcase".green().bold());
    println!("{}", rule(60));

    let Some(checkpoint) = find_best_checkpoint(&config.training) else {
        println!(
            "\n{} Model not found under {}",
            "✗".red(),
            config.training.run_dir().display()
        );
        println!("Please train the model first (cargo run --release -p train)");
        return Ok(());
    };
    println!("\nLoading model from {}...", checkpoint.display());

    let mut rng = ChaCha8Rng::seed_from_u64(showcase.seed);
    let samples = sample_images(&showcase.test_dir, showcase.samples_per_class, &mut rng)
        .with_context(|| format!("Failed to sample {}", showcase.test_dir.display()))?;

    info!(
        "Sampled {} images from {} classes",
        samples.iter().map(|c| c.images.len()).sum::<usize>(),
        samples.len()
    );

    let mut classifier = open_classifier(
        SystemRunner,
        &config.yolo,
        &checkpoint,
        config.training.image_size,
    )?;

    println!(
        "\nSampling {} images per class from {}...\n",
        showcase.samples_per_class,
        showcase.test_dir.display()
    );
    let images_dir = showcase.output_dir.join("images");
    let records = build_records(&mut classifier, &samples, &images_dir, |image, record| {
        let status = if record.is_correct() { "✓".green() } else { "✗".red() };
        let file_name = image
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        println!(
            "  {} {}: {} ({:.2}%)",
            status,
            file_name,
            record.prediction.top1_name(),
            record.prediction.top1_conf() as f64 * 100.0
        );
    })
    .context("Failed to classify showcase samples")?;

    let train_dir = config.training.data.join(DataSplit::Train.dir_name());
    let training_images = DatasetStatistics::from_dir(&train_dir)
        .ok()
        .map(|s| s.total());
    let model = ModelInfo::new(&config.training.model, &checkpoint, training_images);

    let link_prefix = format!("{}/images", showcase.output_dir.display());
    let markdown = render_markdown(&records, &model, &link_prefix, Utc::now());
    let path = write_markdown(&markdown, &showcase.output_dir, &showcase.markdown_name)
        .with_context(|| format!("Failed to write into {}", showcase.output_dir.display()))?;

    let stats = ShowcaseStats::from_records(&records);
    println!("\n{}", rule(60));
    println!("{}", "Showcase Complete!".green().bold());
    println!("{}", rule(60));
    println!(
        "\n{} Accuracy on samples: {}/{} ({:.2}%)",
        "✓".green(),
        stats.correct,
        stats.total,
        stats.accuracy() * 100.0
    );
    println!("{} Showcase written to {}", "✓".green(), path.display());
    println!("{} Images copied to {}/", "✓".green(), images_dir.display());

    Ok(())
}
