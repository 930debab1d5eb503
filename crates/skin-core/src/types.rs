//! Core type definitions for the skin disease classification pipeline.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The five disease categories, in the index order the trainer assigns them
/// (alphabetical folder order).
pub const CLASS_NAMES: [&str; 5] = ["acne", "eksim", "herpes", "panu", "rosacea"];

/// Number of classes in [`CLASS_NAMES`].
pub const NUM_CLASSES: usize = CLASS_NAMES.len();

/// File extensions (lowercase) treated as images everywhere in the pipeline.
pub const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Get the class name for a given label index
pub fn class_name(label: usize) -> Option<&'static str> {
    CLASS_NAMES.get(label).copied()
}

/// Get the label index for a given class name
pub fn class_index(name: &str) -> Option<usize> {
    CLASS_NAMES.iter().position(|&n| n == name)
}

/// Whether `path` has one of the [`IMAGE_EXTENSIONS`] (case-insensitive).
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// An image on disk with the label implied by its class directory
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageSample {
    /// Path to the image file
    pub path: PathBuf,
    /// Class label (index into [`CLASS_NAMES`])
    pub label: usize,
    /// Class name, same as the containing directory
    pub class_name: String,
}

impl ImageSample {
    /// Creates a sample for a known class index.
    pub fn new(path: PathBuf, label: usize) -> Self {
        Self {
            path,
            label,
            class_name: class_name(label).unwrap_or("unknown").to_string(),
        }
    }

    /// File name component of the path, lossily converted
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Data split type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum DataSplit {
    /// Training data
    Train,
    /// Validation data
    Val,
    /// Test data
    Test,
}

impl DataSplit {
    /// All splits in directory-creation order
    pub const ALL: [DataSplit; 3] = [DataSplit::Train, DataSplit::Val, DataSplit::Test];

    /// Directory name used on disk
    pub fn dir_name(&self) -> &'static str {
        match self {
            DataSplit::Train => "train",
            DataSplit::Val => "val",
            DataSplit::Test => "test",
        }
    }
}

impl std::fmt::Display for DataSplit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dir_name())
    }
}

/// One inference result: the top-k classes with their confidences, highest first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Prediction {
    /// Image the prediction was made for
    pub image: PathBuf,
    /// (class index, confidence) sorted by confidence descending
    pub top_k: Vec<(usize, f32)>,
}

impl Prediction {
    /// Builds a prediction, sorting `top_k` by confidence descending.
    pub fn new(image: PathBuf, mut top_k: Vec<(usize, f32)>) -> Self {
        top_k.sort_by(|a, b| b.1.total_cmp(&a.1));
        Self { image, top_k }
    }

    /// Index of the most likely class
    pub fn top1(&self) -> Option<usize> {
        self.top_k.first().map(|(idx, _)| *idx)
    }

    /// Confidence of the most likely class (0 when empty)
    pub fn top1_conf(&self) -> f32 {
        self.top_k.first().map(|(_, c)| *c).unwrap_or(0.0)
    }

    /// The `k` most likely classes
    pub fn top(&self, k: usize) -> &[(usize, f32)] {
        &self.top_k[..k.min(self.top_k.len())]
    }

    /// Class name of the top-1 prediction
    pub fn top1_name(&self) -> &'static str {
        self.top1().and_then(class_name).unwrap_or("unknown")
    }
}

/// Showcase entry: a sampled image, where it was copied, and what the model said.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShowcaseRecord {
    /// Label derived from the directory the image was sampled from
    pub true_label: usize,
    /// Copy of the image inside the showcase directory
    pub image_path: PathBuf,
    /// Model output for the image
    pub prediction: Prediction,
}

impl ShowcaseRecord {
    /// Whether the top-1 prediction matches the directory-derived label
    pub fn is_correct(&self) -> bool {
        self.prediction.top1() == Some(self.true_label)
    }
}
