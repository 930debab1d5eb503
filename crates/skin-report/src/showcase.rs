//! Markdown gallery of sample predictions.
//!
//! A few test images per class are drawn with a seeded RNG, classified, copied
//! into `<output>/images/` and written up in a single Markdown file.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;

use skin_core::{class_name, Result, ShowcaseRecord, CLASS_NAMES};
use skin_dataset::scan_images;
use skin_training::Classifier;

/// Number of alternatives listed under each prediction
pub const TOP_K: usize = 3;

/// Images drawn from one class directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSamples {
    pub label: usize,
    pub images: Vec<PathBuf>,
}

/// Draws up to `per_class` images from each `<test_dir>/<class>/`.
///
/// Classes with at most `per_class` images contribute all of them in sorted
/// order. Missing class directories are skipped with a warning.
pub fn sample_images<R: Rng + ?Sized>(
    test_dir: &Path,
    per_class: usize,
    rng: &mut R,
) -> Result<Vec<ClassSamples>> {
    let mut samples = Vec::new();
    for (label, name) in CLASS_NAMES.iter().enumerate() {
        let class_dir = test_dir.join(name);
        if !class_dir.is_dir() {
            tracing::warn!("{} not found", class_dir.display());
            continue;
        }

        let images = scan_images(&class_dir)?;
        let images = if images.len() > per_class {
            images.choose_multiple(rng, per_class).cloned().collect()
        } else {
            images
        };
        samples.push(ClassSamples { label, images });
    }
    Ok(samples)
}

/// Classifies each sampled image and copies it to
/// `<images_dir>/<class>_<file name>`.
///
/// `on_record` is called after each image, in sampling order.
pub fn build_records<C, F>(
    classifier: &mut C,
    samples: &[ClassSamples],
    images_dir: &Path,
    mut on_record: F,
) -> Result<Vec<ShowcaseRecord>>
where
    C: Classifier + ?Sized,
    F: FnMut(&Path, &ShowcaseRecord),
{
    fs::create_dir_all(images_dir)?;

    let mut records = Vec::new();
    for class in samples {
        let name = class_name(class.label).unwrap_or("unknown");
        for image in &class.images {
            let prediction = classifier.predict(image)?;

            let file_name = image
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let dest = images_dir.join(format!("{}_{}", name, file_name));
            fs::copy(image, &dest)?;

            let record = ShowcaseRecord {
                true_label: class.label,
                image_path: dest,
                prediction,
            };
            on_record(image, &record);
            records.push(record);
        }
    }
    Ok(records)
}

/// Totals over a set of showcase records
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShowcaseStats {
    pub total: usize,
    pub correct: usize,
}

impl ShowcaseStats {
    pub fn from_records(records: &[ShowcaseRecord]) -> Self {
        Self {
            total: records.len(),
            correct: records.iter().filter(|r| r.is_correct()).count(),
        }
    }

    /// `correct / total`, 0 when empty
    pub fn accuracy(&self) -> f64 {
        if self.total > 0 {
            self.correct as f64 / self.total as f64
        } else {
            0.0
        }
    }
}

/// Facts about the model listed at the end of the showcase
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInfo {
    pub architecture: String,
    pub checkpoint_size_mb: Option<f64>,
    pub training_images: Option<usize>,
}

impl ModelInfo {
    /// Describes `model` (the pretrained weights name) and measures `checkpoint`
    pub fn new(model: &str, checkpoint: &Path, training_images: Option<usize>) -> Self {
        let checkpoint_size_mb = fs::metadata(checkpoint)
            .ok()
            .map(|m| m.len() as f64 / (1024.0 * 1024.0));
        Self {
            architecture: describe_architecture(model),
            checkpoint_size_mb,
            training_images,
        }
    }
}

/// Human-readable name for a weights file such as `yolov8s-cls.pt`
pub fn describe_architecture(model: &str) -> String {
    let stem = Path::new(model)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(model);

    let Some(rest) = stem.strip_prefix("yolov") else {
        return stem.to_string();
    };
    let (variant, classify) = match rest.strip_suffix("-cls") {
        Some(v) => (v, true),
        None => (rest, false),
    };

    let version: String = variant.chars().take_while(|c| c.is_ascii_digit()).collect();
    let size = match &variant[version.len()..] {
        "n" => "Nano",
        "s" => "Small",
        "m" => "Medium",
        "l" => "Large",
        "x" => "XLarge",
        _ => return stem.to_string(),
    };
    if version.is_empty() {
        return stem.to_string();
    }

    let mut name = format!("YOLOv{} {}", version, size);
    if classify {
        name.push_str(" Classification");
    }
    name
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn percent(p: f32) -> String {
    format!("{:.2}%", p as f64 * 100.0)
}

/// Renders the showcase document.
///
/// Images are linked as `<link_prefix>/<file name>`.
pub fn render_markdown(
    records: &[ShowcaseRecord],
    model: &ModelInfo,
    link_prefix: &str,
    generated_at: DateTime<Utc>,
) -> String {
    let stats = ShowcaseStats::from_records(records);
    let mut md: Vec<String> = Vec::new();

    md.push("# Skin Diseases Classification - Inference Showcase\n".to_string());
    md.push(format!(
        "Real predictions from the trained {} model on held-out test images.\n",
        model.architecture
    ));

    md.push("## Showcase Statistics\n".to_string());
    md.push(format!("- **Total Predictions**: {}", stats.total));
    md.push(format!("- **Correct**: {}", stats.correct));
    md.push(format!("- **Accuracy**: {:.2}%\n", stats.accuracy() * 100.0));

    md.push("## Predictions by Class\n".to_string());

    for (label, name) in CLASS_NAMES.iter().enumerate() {
        let class_records: Vec<_> = records.iter().filter(|r| r.true_label == label).collect();
        if class_records.is_empty() {
            continue;
        }

        md.push(format!("### {}\n", capitalize(name)));

        for record in class_records {
            let file_name = record
                .image_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            md.push(format!("![{}]({}/{})\n", file_name, link_prefix, file_name));

            let status = if record.is_correct() { "✅" } else { "❌" };
            md.push(format!(
                "**{} Prediction**: {} ({} confidence)\n",
                status,
                record.prediction.top1_name(),
                percent(record.prediction.top1_conf())
            ));

            md.push(format!("**Top {} Predictions**:", TOP_K));
            for (i, (idx, conf)) in record.prediction.top(TOP_K).iter().enumerate() {
                md.push(format!(
                    "  {}. {}: {}",
                    i + 1,
                    class_name(*idx).unwrap_or("unknown"),
                    percent(*conf)
                ));
            }
            md.push(String::new());
        }
    }

    md.push("---\n".to_string());
    md.push("## Model Information\n".to_string());
    md.push(format!("- **Architecture**: {}", model.architecture));
    if let Some(images) = model.training_images {
        md.push(format!(
            "- **Training Dataset**: {} images across {} classes",
            images,
            CLASS_NAMES.len()
        ));
    }
    if let Some(size) = model.checkpoint_size_mb {
        md.push(format!("- **Model Size**: {:.1}MB", size));
    }
    md.push(format!("- **Classes**: {}\n", CLASS_NAMES.join(", ")));
    md.push(format!(
        "_Generated {}_\n",
        generated_at.format("%Y-%m-%d %H:%M UTC")
    ));

    md.join("\n")
}

/// Writes the Markdown file, returning its path
pub fn write_markdown(content: &str, output_dir: &Path, file_name: &str) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)?;
    let path = output_dir.join(file_name);
    fs::write(&path, content)?;
    Ok(path)
}
