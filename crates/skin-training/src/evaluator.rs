//! Test-set evaluation: predict every held-out image and aggregate the
//! results into a confusion matrix and classification report.

use std::path::Path;

use serde::Serialize;
use tracing::info;

use skin_core::cli::progress_bar;
use skin_core::{
    ClassificationReport, ConfusionMatrix, Error, ImageSample, Prediction, Result, CLASS_NAMES,
    NUM_CLASSES,
};
use skin_dataset::collect_samples;

use crate::predictor::Classifier;

/// A test image together with the model's answer
#[derive(Debug, Clone, Serialize)]
pub struct EvaluatedSample {
    pub sample: ImageSample,
    pub prediction: Prediction,
}

impl EvaluatedSample {
    pub fn predicted_label(&self) -> Option<usize> {
        self.prediction.top1()
    }

    pub fn is_correct(&self) -> bool {
        self.predicted_label() == Some(self.sample.label)
    }
}

/// Result of evaluating a classifier on a test directory
#[derive(Debug, Clone)]
pub struct EvaluationResult {
    /// Samples in class order, files sorted within each class
    pub samples: Vec<EvaluatedSample>,
    pub confusion: ConfusionMatrix,
    pub report: ClassificationReport,
}

impl EvaluationResult {
    /// Builds the matrix and report from evaluated samples
    pub fn from_samples(samples: Vec<EvaluatedSample>) -> Result<Self> {
        let mut y_true = Vec::with_capacity(samples.len());
        let mut y_pred = Vec::with_capacity(samples.len());
        for s in &samples {
            let predicted = s.predicted_label().ok_or_else(|| {
                Error::Prediction(format!("Empty prediction for {}", s.sample.path.display()))
            })?;
            y_true.push(s.sample.label);
            y_pred.push(predicted);
        }

        let confusion = ConfusionMatrix::from_labels(&y_true, &y_pred, NUM_CLASSES)?;
        let report = ClassificationReport::from_confusion_matrix(&confusion, &CLASS_NAMES)?;

        Ok(Self {
            samples,
            confusion,
            report,
        })
    }

    /// The first `n` samples of class `label`
    pub fn samples_for_class(&self, label: usize, n: usize) -> Vec<&EvaluatedSample> {
        self.samples
            .iter()
            .filter(|s| s.sample.label == label)
            .take(n)
            .collect()
    }
}

/// Predicts every image under `<test_dir>/<class>/` and aggregates the results.
///
/// Classes without a directory contribute no samples.
pub fn evaluate_dir<C: Classifier + ?Sized>(
    classifier: &mut C,
    test_dir: &Path,
) -> Result<EvaluationResult> {
    if !test_dir.is_dir() {
        return Err(Error::NotFound(format!(
            "Test directory not found: {}",
            test_dir.display()
        )));
    }

    let samples = collect_samples(test_dir)?;
    info!("Running predictions on {} test images", samples.len());

    let pb = progress_bar(samples.len() as u64, "images");
    let mut evaluated = Vec::with_capacity(samples.len());
    for sample in samples {
        let prediction = classifier.predict(&sample.path)?;
        evaluated.push(EvaluatedSample { sample, prediction });
        pb.inc(1);
    }
    pb.finish_and_clear();

    let result = EvaluationResult::from_samples(evaluated)?;
    info!(
        "Evaluation complete: accuracy={:.4}, macro f1={:.4}",
        result.report.accuracy, result.report.macro_avg.f1
    );
    Ok(result)
}
