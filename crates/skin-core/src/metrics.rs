//! Evaluation metrics: confusion matrix, per-class precision/recall/F1 and the
//! textual classification report written after evaluation.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Confusion Matrix for multi-class classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    /// Number of classes
    pub num_classes: usize,

    /// Matrix data (row = actual, column = predicted)
    /// Stored as a flat vector in row-major order
    pub matrix: Vec<usize>,
}

impl Default for ConfusionMatrix {
    fn default() -> Self {
        Self::new(0)
    }
}

impl ConfusionMatrix {
    /// Create a new empty confusion matrix
    pub fn new(num_classes: usize) -> Self {
        Self {
            num_classes,
            matrix: vec![0; num_classes * num_classes],
        }
    }

    /// Create confusion matrix from parallel ground-truth / prediction slices.
    ///
    /// Labels outside `0..num_classes` are rejected rather than dropped, so the
    /// matrix total always equals the number of pairs.
    pub fn from_labels(y_true: &[usize], y_pred: &[usize], num_classes: usize) -> Result<Self> {
        if y_true.len() != y_pred.len() {
            return Err(Error::InvalidArgument(format!(
                "y_true has {} labels but y_pred has {}",
                y_true.len(),
                y_pred.len()
            )));
        }

        let mut cm = Self::new(num_classes);
        for (&actual, &pred) in y_true.iter().zip(y_pred.iter()) {
            if actual >= num_classes || pred >= num_classes {
                return Err(Error::InvalidArgument(format!(
                    "label pair ({}, {}) out of range for {} classes",
                    actual, pred, num_classes
                )));
            }
            cm.add(actual, pred);
        }

        Ok(cm)
    }

    /// Add a single prediction to the matrix
    pub fn add(&mut self, actual: usize, predicted: usize) {
        if actual < self.num_classes && predicted < self.num_classes {
            let idx = actual * self.num_classes + predicted;
            self.matrix[idx] += 1;
        }
    }

    /// Get the count at (actual, predicted)
    pub fn get(&self, actual: usize, predicted: usize) -> usize {
        if actual < self.num_classes && predicted < self.num_classes {
            self.matrix[actual * self.num_classes + predicted]
        } else {
            0
        }
    }

    /// Get the total count
    pub fn total(&self) -> usize {
        self.matrix.iter().sum()
    }

    /// Get the number of correct predictions (diagonal sum)
    pub fn correct(&self) -> usize {
        (0..self.num_classes).map(|i| self.get(i, i)).sum()
    }

    /// Get overall accuracy
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total > 0 {
            self.correct() as f64 / total as f64
        } else {
            0.0
        }
    }

    /// Largest single cell, used to scale heatmap colours
    pub fn max_count(&self) -> usize {
        self.matrix.iter().copied().max().unwrap_or(0)
    }

    /// Get the row sums (actual class counts)
    pub fn row_sums(&self) -> Vec<usize> {
        (0..self.num_classes)
            .map(|row| (0..self.num_classes).map(|col| self.get(row, col)).sum())
            .collect()
    }

    /// Get the column sums (predicted class counts)
    pub fn col_sums(&self) -> Vec<usize> {
        (0..self.num_classes)
            .map(|col| (0..self.num_classes).map(|row| self.get(row, col)).sum())
            .collect()
    }

    /// Pretty print the confusion matrix
    pub fn display(&self, class_names: &[&str]) -> String {
        let mut output = String::new();
        output.push_str("Confusion Matrix (rows=actual, cols=predicted):\n\n");

        output.push_str(&format!("{:>10}", ""));
        for col in 0..self.num_classes {
            let name = class_names.get(col).copied().unwrap_or("?");
            output.push_str(&format!("{:>9}", truncate(name, 8)));
        }
        output.push('\n');

        for row in 0..self.num_classes {
            let name = class_names.get(row).copied().unwrap_or("?");
            output.push_str(&format!("{:>10}", truncate(name, 9)));
            for col in 0..self.num_classes {
                let count = self.get(row, col);
                if row == col {
                    output.push_str(&format!("{:>9}", format!("[{}]", count)));
                } else if count > 0 {
                    output.push_str(&format!("{:>9}", count));
                } else {
                    output.push_str(&format!("{:>9}", "."));
                }
            }
            output.push('\n');
        }

        output
    }
}

fn truncate(name: &str, max: usize) -> &str {
    match name.char_indices().nth(max) {
        Some((idx, _)) => &name[..idx],
        None => name,
    }
}

/// Per-class metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    /// Class index
    pub class_idx: usize,

    /// Class name
    pub class_name: String,

    /// True positives
    pub true_positives: usize,

    /// False positives
    pub false_positives: usize,

    /// False negatives
    pub false_negatives: usize,

    /// Precision = TP / (TP + FP)
    pub precision: f64,

    /// Recall = TP / (TP + FN)
    pub recall: f64,

    /// F1 = 2 * (precision * recall) / (precision + recall)
    pub f1: f64,

    /// Support = number of actual samples of this class
    pub support: usize,
}

impl ClassMetrics {
    /// Calculate metrics for a class from confusion matrix.
    /// Undefined ratios (zero denominators) are reported as 0.
    pub fn from_confusion_matrix(cm: &ConfusionMatrix, class_idx: usize, class_name: &str) -> Self {
        let true_positives = cm.get(class_idx, class_idx);

        let false_positives: usize = (0..cm.num_classes)
            .filter(|&i| i != class_idx)
            .map(|i| cm.get(i, class_idx))
            .sum();

        let false_negatives: usize = (0..cm.num_classes)
            .filter(|&i| i != class_idx)
            .map(|i| cm.get(class_idx, i))
            .sum();

        let support = true_positives + false_negatives;

        let precision = ratio(true_positives, true_positives + false_positives);
        let recall = ratio(true_positives, support);

        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Self {
            class_idx,
            class_name: class_name.to_string(),
            true_positives,
            false_positives,
            false_negatives,
            precision,
            recall,
            f1,
            support,
        }
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den > 0 {
        num as f64 / den as f64
    } else {
        0.0
    }
}

/// Averaged precision / recall / F1 row of a report
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AverageMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Per-class metrics plus accuracy and macro/weighted averages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub per_class: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: AverageMetrics,
    pub weighted_avg: AverageMetrics,
    pub total: usize,
}

impl ClassificationReport {
    /// Builds the report for every class of the matrix, named by `class_names`.
    pub fn from_confusion_matrix(cm: &ConfusionMatrix, class_names: &[&str]) -> Result<Self> {
        if class_names.len() != cm.num_classes {
            return Err(Error::InvalidArgument(format!(
                "{} class names given for a {}-class matrix",
                class_names.len(),
                cm.num_classes
            )));
        }

        let per_class: Vec<ClassMetrics> = class_names
            .iter()
            .enumerate()
            .map(|(idx, name)| ClassMetrics::from_confusion_matrix(cm, idx, name))
            .collect();

        let total = cm.total();
        let n = per_class.len().max(1) as f64;

        let macro_avg = AverageMetrics {
            precision: per_class.iter().map(|m| m.precision).sum::<f64>() / n,
            recall: per_class.iter().map(|m| m.recall).sum::<f64>() / n,
            f1: per_class.iter().map(|m| m.f1).sum::<f64>() / n,
            support: total,
        };

        let weighted = |f: fn(&ClassMetrics) -> f64| -> f64 {
            if total == 0 {
                return 0.0;
            }
            per_class.iter().map(|m| f(m) * m.support as f64).sum::<f64>() / total as f64
        };

        let weighted_avg = AverageMetrics {
            precision: weighted(|m| m.precision),
            recall: weighted(|m| m.recall),
            f1: weighted(|m| m.f1),
            support: total,
        };

        Ok(Self {
            accuracy: cm.accuracy(),
            per_class,
            macro_avg,
            weighted_avg,
            total,
        })
    }

    /// Fixed-width text table with `digits` decimals.
    pub fn render(&self, digits: usize) -> String {
        const LAST_HEADING: &str = "weighted avg";
        let width = self
            .per_class
            .iter()
            .map(|m| m.class_name.len())
            .chain([LAST_HEADING.len(), digits])
            .max()
            .unwrap_or(LAST_HEADING.len());

        let mut out = String::new();
        out.push_str(&format!(
            "{:>width$}  {:>9} {:>9} {:>9} {:>9}\n\n",
            "",
            "precision",
            "recall",
            "f1-score",
            "support",
            width = width
        ));

        for m in &self.per_class {
            out.push_str(&format_row(&m.class_name, m.precision, m.recall, m.f1, m.support, width, digits));
        }
        out.push('\n');

        out.push_str(&format!(
            "{:>width$}  {:>9} {:>9} {:>9.digits$} {:>9}\n",
            "accuracy",
            "",
            "",
            self.accuracy,
            self.total,
            width = width,
            digits = digits
        ));

        let avgs = [("macro avg", &self.macro_avg), (LAST_HEADING, &self.weighted_avg)];
        for (name, avg) in avgs {
            out.push_str(&format_row(name, avg.precision, avg.recall, avg.f1, avg.support, width, digits));
        }

        out
    }
}

fn format_row(
    name: &str,
    precision: f64,
    recall: f64,
    f1: f64,
    support: usize,
    width: usize,
    digits: usize,
) -> String {
    format!(
        "{:>width$}  {:>9.digits$} {:>9.digits$} {:>9.digits$} {:>9}\n",
        name,
        precision,
        recall,
        f1,
        support,
        width = width,
        digits = digits
    )
}

impl std::fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render(4))
    }
}
