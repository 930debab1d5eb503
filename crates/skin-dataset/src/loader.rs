//! Image enumeration for class-folder datasets.
//!
//! Every listing is sorted so callers see the same order regardless of how the
//! filesystem enumerates entries.

use std::fs;
use std::path::{Path, PathBuf};

use skin_core::{is_image_file, Error, ImageSample, Result, CLASS_NAMES};

/// Lists the image files directly inside `dir`, sorted by path.
///
/// Non-image files and subdirectories are skipped.
pub fn scan_images(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Err(Error::NotFound(format!("Directory not found: {}", dir.display())));
    }

    if !dir.is_dir() {
        return Err(Error::InvalidArgument(format!(
            "Path is not a directory: {}",
            dir.display()
        )));
    }

    let mut images = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_image_file(&path) {
            images.push(path);
        }
    }

    images.sort();
    Ok(images)
}

/// Like [`scan_images`], but a missing directory yields an empty list.
pub fn scan_images_or_empty(dir: &Path) -> Result<Vec<PathBuf>> {
    if dir.is_dir() {
        scan_images(dir)
    } else {
        Ok(Vec::new())
    }
}

/// Number of images directly inside `dir` (0 when it does not exist)
pub fn count_images(dir: &Path) -> Result<usize> {
    Ok(scan_images_or_empty(dir)?.len())
}

/// Collects labelled samples from `<root>/<class>/` for every known class.
///
/// Classes whose directory is missing contribute nothing.
pub fn collect_samples(root: &Path) -> Result<Vec<ImageSample>> {
    let mut samples = Vec::new();
    for (label, class_name) in CLASS_NAMES.iter().enumerate() {
        let class_dir = root.join(class_name);
        if !class_dir.is_dir() {
            tracing::debug!("No directory for class {} under {}", class_name, root.display());
            continue;
        }
        samples.extend(
            scan_images(&class_dir)?
                .into_iter()
                .map(|path| ImageSample::new(path, label)),
        );
    }
    Ok(samples)
}

/// Names of the immediate subdirectories of `dir`, sorted
pub fn subdirectory_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = match fs::read_dir(dir) {
        Ok(entries) => entries
            .flatten()
            .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .collect(),
        Err(_) => Vec::new(),
    };
    names.sort();
    names
}
