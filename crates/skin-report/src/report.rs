//! Evaluation artifacts written into the training run directory.

use std::fs;
use std::path::{Path, PathBuf};

use skin_core::{ClassificationReport, ConfusionMatrix, Result, CLASS_NAMES};

use crate::charts::save_confusion_matrix_svg;
use crate::heatmap::save_heatmap_png;

pub const REPORT_FILE: &str = "classification_report.txt";
pub const HEATMAP_PNG: &str = "confusion_matrix.png";
pub const HEATMAP_SVG: &str = "confusion_matrix.svg";

/// Decimal places in the written report
pub const REPORT_DIGITS: usize = 4;

/// Files produced by [`write_evaluation_artifacts`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationArtifacts {
    pub report: PathBuf,
    pub heatmap_png: PathBuf,
    pub heatmap_svg: PathBuf,
}

/// Writes the text report
pub fn save_report(report: &ClassificationReport, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, report.render(REPORT_DIGITS))?;
    tracing::info!("Classification report saved to {}", path.display());
    Ok(())
}

/// Writes the report and both heatmaps into `run_dir`
pub fn write_evaluation_artifacts(
    run_dir: &Path,
    cm: &ConfusionMatrix,
    report: &ClassificationReport,
) -> Result<EvaluationArtifacts> {
    let artifacts = EvaluationArtifacts {
        report: run_dir.join(REPORT_FILE),
        heatmap_png: run_dir.join(HEATMAP_PNG),
        heatmap_svg: run_dir.join(HEATMAP_SVG),
    };

    save_heatmap_png(cm, &artifacts.heatmap_png)?;
    save_confusion_matrix_svg(cm, &CLASS_NAMES, &artifacts.heatmap_svg)?;
    save_report(report, &artifacts.report)?;

    Ok(artifacts)
}
