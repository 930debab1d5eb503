//! Dataset acquisition: fetch the remote archive, find the class folders inside
//! it and install them into the canonical training directory.

use std::fs::{self, File};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use walkdir::WalkDir;

use skin_core::{AcquisitionConfig, Error, Result, CLASS_NAMES};

use crate::loader::{count_images, subdirectory_names};

const KAGGLE_API: &str = "https://www.kaggle.com/api/v1/datasets/download";
/// Written into the extraction directory once unpacking finished
pub const COMPLETE_MARKER: &str = ".complete";

/// Maximum depth searched below the download root for class folders
pub const SEARCH_DEPTH: usize = 4;

/// Source of a dataset archive, returning the local directory it was unpacked to.
pub trait DatasetFetcher {
    /// `dataset` is an `<owner>/<slug>` handle.
    fn fetch(&self, dataset: &str) -> Result<PathBuf>;
}

/// Kaggle API credentials
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KaggleCredentials {
    pub username: String,
    pub key: String,
}

impl KaggleCredentials {
    /// `KAGGLE_USERNAME` and `KAGGLE_KEY`, when both are set
    pub fn from_env() -> Option<Self> {
        let username = std::env::var("KAGGLE_USERNAME").ok()?;
        let key = std::env::var("KAGGLE_KEY").ok()?;
        Some(Self { username, key })
    }

    /// Reads a `kaggle.json` token file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            Error::Download(format!("Invalid credentials file {}: {}", path.display(), e))
        })
    }

    /// Environment first, then `~/.kaggle/kaggle.json`
    pub fn discover() -> Result<Self> {
        if let Some(credentials) = Self::from_env() {
            return Ok(credentials);
        }

        let token = dirs_next::home_dir()
            .map(|home| home.join(".kaggle").join("kaggle.json"))
            .filter(|path| path.is_file())
            .ok_or_else(|| {
                Error::Download(
                    "Kaggle credentials not found: set KAGGLE_USERNAME and KAGGLE_KEY \
                     or create ~/.kaggle/kaggle.json"
                        .to_string(),
                )
            })?;
        Self::from_file(&token)
    }
}

/// Splits `<owner>/<slug>` into its parts
pub fn parse_dataset_handle(dataset: &str) -> Result<(&str, &str)> {
    match dataset.split_once('/') {
        Some((owner, slug)) if !owner.is_empty() && !slug.is_empty() && !slug.contains('/') => {
            Ok((owner, slug))
        }
        _ => Err(Error::InvalidArgument(format!(
            "Dataset handle must look like <owner>/<slug>, got '{}'",
            dataset
        ))),
    }
}

/// Remediation steps printed after a failed download
pub fn troubleshooting(dataset_url: &str) -> Vec<String> {
    vec![
        "Make sure you're logged into Kaggle (KAGGLE_USERNAME/KAGGLE_KEY or ~/.kaggle/kaggle.json)"
            .to_string(),
        format!("Accept the dataset terms at: {}", dataset_url),
        "Check your internet connection".to_string(),
    ]
}

/// Downloads Kaggle datasets into a local cache, extracting each archive once.
pub struct KaggleFetcher {
    cache_dir: PathBuf,
    api_base: String,
}

impl KaggleFetcher {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            api_base: KAGGLE_API.to_string(),
        }
    }

    /// Uses the configured cache directory, or `~/.cache/skin-pipeline`
    pub fn from_config(config: &AcquisitionConfig) -> Result<Self> {
        let cache_dir = match &config.cache_dir {
            Some(dir) => dir.clone(),
            None => dirs_next::cache_dir()
                .map(|dir| dir.join("skin-pipeline"))
                .ok_or_else(|| Error::Config("Could not determine a cache directory".to_string()))?,
        };
        Ok(Self::new(cache_dir))
    }

    /// `<cache>/datasets/<owner>/<slug>`
    pub fn dataset_dir(&self, dataset: &str) -> Result<PathBuf> {
        let (owner, slug) = parse_dataset_handle(dataset)?;
        Ok(self.cache_dir.join("datasets").join(owner).join(slug))
    }

    fn download_archive(&self, dataset: &str, dest: &Path) -> Result<()> {
        let credentials = KaggleCredentials::discover()?;
        let url = format!("{}/{}", self.api_base, dataset);
        tracing::info!("Downloading {}", url);

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(3600))
            .build()
            .map_err(|e| Error::Download(format!("Failed to build HTTP client: {}", e)))?;

        let mut response = client
            .get(&url)
            .basic_auth(&credentials.username, Some(&credentials.key))
            .send()
            .map_err(|e| Error::Download(format!("Request to {} failed: {}", url, e)))?;

        let status = response.status();
        match status.as_u16() {
            401 => {
                return Err(Error::Download(
                    "Authentication failed (401): check your Kaggle username and key".to_string(),
                ))
            }
            403 => {
                return Err(Error::Download(
                    "Access denied (403): the dataset terms may not have been accepted".to_string(),
                ))
            }
            _ if !status.is_success() => {
                return Err(Error::Download(format!("Server returned {}", status)));
            }
            _ => {}
        }

        let partial = dest.with_extension("zip.part");
        let mut file = File::create(&partial)?;
        response
            .copy_to(&mut file)
            .map_err(|e| Error::Download(format!("Failed to read response body: {}", e)))?;
        file.flush()?;
        fs::rename(&partial, dest)?;
        Ok(())
    }
}

impl DatasetFetcher for KaggleFetcher {
    fn fetch(&self, dataset: &str) -> Result<PathBuf> {
        let base = self.dataset_dir(dataset)?;
        let extracted = base.join("files");

        if extracted.join(COMPLETE_MARKER).exists() {
            tracing::info!("Using cached dataset at {}", extracted.display());
            return Ok(extracted);
        }

        fs::create_dir_all(&base)?;
        let archive = base.join("archive.zip");
        if !archive.exists() {
            self.download_archive(dataset, &archive)?;
        }

        if extracted.exists() {
            fs::remove_dir_all(&extracted)?;
        }
        extract_zip(&archive, &extracted)?;
        File::create(extracted.join(COMPLETE_MARKER))?;

        Ok(extracted)
    }
}

/// Unpacks a zip archive into `dest`
pub fn extract_zip(archive: &Path, dest: &Path) -> Result<()> {
    tracing::info!("Extracting {}", archive.display());
    let file = File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file)
        .map_err(|e| Error::Download(format!("Corrupt archive {}: {}", archive.display(), e)))?;
    fs::create_dir_all(dest)?;
    zip.extract(dest)
        .map_err(|e| Error::Download(format!("Failed to extract {}: {}", archive.display(), e)))?;
    Ok(())
}

/// Whether any immediate subdirectory of `dir` is named after an expected class
pub fn has_expected_class(dir: &Path, expected: &[&str]) -> bool {
    subdirectory_names(dir)
        .iter()
        .any(|name| expected.contains(&name.as_str()))
}

/// Finds the directory holding the class folders below a download root.
///
/// Tries `<root>/train`, then `<root>`, then every directory up to
/// [`SEARCH_DEPTH`] levels down in sorted order.
pub fn locate_class_dir(root: &Path, expected: &[&str]) -> Result<PathBuf> {
    for candidate in [root.join("train"), root.to_path_buf()] {
        if candidate.is_dir() && has_expected_class(&candidate, expected) {
            return Ok(candidate);
        }
    }

    for entry in WalkDir::new(root)
        .max_depth(SEARCH_DEPTH)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if entry.file_type().is_dir() && has_expected_class(entry.path(), expected) {
            return Ok(entry.path().to_path_buf());
        }
    }

    Err(Error::ClassesNotFound {
        expected: expected.iter().map(|s| s.to_string()).collect(),
        searched: root.to_path_buf(),
    })
}

/// Copies a directory tree, returning the number of files copied
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<usize> {
    let mut copied = 0;
    for entry in WalkDir::new(src).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        let relative = entry.path().strip_prefix(src).map_err(|e| {
            Error::InvalidArgument(format!("{} outside {}: {}", entry.path().display(), src.display(), e))
        })?;
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Asked before an existing target directory is replaced
pub trait OverwritePrompt {
    fn confirm_overwrite(&mut self, target: &Path) -> Result<bool>;
}

/// Asks on stdin; only `y` (any case) confirms
pub struct StdinPrompt;

impl OverwritePrompt for StdinPrompt {
    fn confirm_overwrite(&mut self, target: &Path) -> Result<bool> {
        print!(
            "Target directory '{}' already exists. Do you want to overwrite it? (y/n): ",
            target.display()
        );
        io::stdout().flush()?;

        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(is_yes(&line))
    }
}

/// Confirms without asking (`--yes`)
pub struct AssumeYes;

impl OverwritePrompt for AssumeYes {
    fn confirm_overwrite(&mut self, _target: &Path) -> Result<bool> {
        Ok(true)
    }
}

/// Whether a prompt answer means yes
pub fn is_yes(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("y")
}

/// Result of installing a downloaded dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// Class folders were copied from `source`
    Installed {
        source: PathBuf,
        /// (class, images) for each class copied individually; empty when a
        /// nested directory was copied as a whole
        copied: Vec<(String, usize)>,
        missing: Vec<String>,
    },
    /// The operator declined to overwrite the existing target
    Declined,
}

/// Copies the class folders found under `download_root` into `target`.
///
/// Nothing is written when no class folder can be found. When the class
/// folders sit directly in the download root only the expected classes are
/// copied; otherwise the located directory is copied as a whole.
pub fn install_dataset(
    download_root: &Path,
    target: &Path,
    prompt: &mut dyn OverwritePrompt,
) -> Result<InstallOutcome> {
    let source = locate_class_dir(download_root, &CLASS_NAMES)?;
    tracing::info!("Found data at: {}", source.display());

    if target.exists() {
        if !prompt.confirm_overwrite(target)? {
            tracing::info!("Keeping existing {}", target.display());
            return Ok(InstallOutcome::Declined);
        }
        fs::remove_dir_all(target)?;
        tracing::info!("Removed existing {}", target.display());
    }

    let mut copied = Vec::new();
    let mut missing = Vec::new();

    if source == download_root {
        fs::create_dir_all(target)?;
        for class_name in CLASS_NAMES {
            let src_class = source.join(class_name);
            if !src_class.is_dir() {
                tracing::warn!("{}: not found", class_name);
                missing.push(class_name.to_string());
                continue;
            }
            let dst_class = target.join(class_name);
            copy_dir_recursive(&src_class, &dst_class)?;
            let count = count_images(&dst_class)?;
            tracing::info!("{}: {} images", class_name, count);
            copied.push((class_name.to_string(), count));
        }
    } else {
        let files = copy_dir_recursive(&source, target)?;
        tracing::info!("Copied {} files from {}", files, source.display());
    }

    Ok(InstallOutcome::Installed {
        source,
        copied,
        missing,
    })
}

/// Fetches `dataset` and installs it into `target`
pub fn acquire_dataset(
    fetcher: &dyn DatasetFetcher,
    dataset: &str,
    target: &Path,
    prompt: &mut dyn OverwritePrompt,
) -> Result<InstallOutcome> {
    let download_root = fetcher.fetch(dataset)?;
    tracing::info!("Dataset downloaded to: {}", download_root.display());
    install_dataset(&download_root, target, prompt)
}
