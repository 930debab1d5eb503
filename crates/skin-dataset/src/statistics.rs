//! Dataset statistics and structure verification.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use skin_core::{Result, CLASS_NAMES};

use crate::loader::count_images;

/// Image count of one class directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassCount {
    pub class_name: String,
    /// `false` when `<root>/<class>` does not exist
    pub present: bool,
    pub images: usize,
}

/// Image counts for every known class under a root directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetStatistics {
    pub root: PathBuf,
    pub classes: Vec<ClassCount>,
}

impl DatasetStatistics {
    /// Counts the images in `<root>/<class>/` for each class
    pub fn from_dir(root: &Path) -> Result<Self> {
        let mut classes = Vec::with_capacity(CLASS_NAMES.len());
        for class_name in CLASS_NAMES {
            let dir = root.join(class_name);
            classes.push(ClassCount {
                class_name: class_name.to_string(),
                present: dir.is_dir(),
                images: count_images(&dir)?,
            });
        }
        Ok(Self {
            root: root.to_path_buf(),
            classes,
        })
    }

    pub fn total(&self) -> usize {
        self.classes.iter().map(|c| c.images).sum()
    }

    /// Classes with no directory under the root
    pub fn missing_classes(&self) -> Vec<&str> {
        self.classes
            .iter()
            .filter(|c| !c.present)
            .map(|c| c.class_name.as_str())
            .collect()
    }

    /// Every class directory exists and at least one image was found
    pub fn is_valid(&self) -> bool {
        self.missing_classes().is_empty() && self.total() > 0
    }
}

/// Counts images under `root` and logs the outcome of the structure check.
pub fn verify_structure(root: &Path) -> Result<DatasetStatistics> {
    let stats = DatasetStatistics::from_dir(root)?;

    for class in &stats.classes {
        if class.present {
            tracing::info!("{}: {} images", class.class_name, class.images);
        } else {
            tracing::warn!("{}: directory missing", class.class_name);
        }
    }

    if stats.is_valid() {
        tracing::info!("Dataset structure verified: {} images", stats.total());
    } else {
        tracing::warn!("Dataset structure incomplete under {}", root.display());
    }

    Ok(stats)
}
