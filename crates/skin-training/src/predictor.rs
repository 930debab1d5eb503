//! Image classification through the toolkit's `predict` mode.
//!
//! Predictions are made one directory at a time: the toolkit writes a
//! `labels/<stem>.txt` file per image with `<confidence> <class>` lines
//! (highest first), which are parsed into [`Prediction`]s and cached.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use skin_core::{class_index, Error, Prediction, PredictorBackend, Result, YoloConfig};
use skin_dataset::scan_images;

use crate::onnx::OnnxClassifier;
use crate::trainer::export_command;
use crate::yolo::{CommandRunner, YoloCommand};

/// Anything that can classify an image file
pub trait Classifier {
    fn predict(&mut self, image: &Path) -> Result<Prediction>;
}

impl<C: Classifier + ?Sized> Classifier for Box<C> {
    fn predict(&mut self, image: &Path) -> Result<Prediction> {
        (**self).predict(image)
    }
}

/// Parses the contents of one label file into (class index, confidence) pairs.
///
/// Blank lines are skipped. A class repeated further down is ignored so that
/// re-appended files still yield one entry per class.
pub fn parse_label_file(content: &str) -> Result<Vec<(usize, f32)>> {
    let mut top_k: Vec<(usize, f32)> = Vec::new();

    for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let (conf, name) = line
            .split_once(char::is_whitespace)
            .ok_or_else(|| Error::Prediction(format!("Malformed prediction line '{}'", line)))?;

        let conf: f32 = conf
            .parse()
            .map_err(|_| Error::Prediction(format!("Invalid confidence in line '{}'", line)))?;
        let name = name.trim();
        let idx = class_index(name)
            .ok_or_else(|| Error::Prediction(format!("Unknown class '{}'", name)))?;

        if !top_k.iter().any(|(seen, _)| *seen == idx) {
            top_k.push((idx, conf));
        }
    }

    if top_k.is_empty() {
        return Err(Error::Prediction("Empty prediction file".to_string()));
    }
    Ok(top_k)
}

/// Classifier backed by `yolo classify predict`.
///
/// The toolkit rounds the confidences it writes to two decimals; use
/// [`crate::OnnxClassifier`] when exact probabilities matter.
pub struct YoloPredictor<R: CommandRunner> {
    runner: R,
    yolo: PathBuf,
    checkpoint: PathBuf,
    scratch: PathBuf,
    batches: usize,
    /// Per directory, top-k keyed by image file name
    cache: HashMap<PathBuf, HashMap<String, Vec<(usize, f32)>>>,
}

impl<R: CommandRunner> YoloPredictor<R> {
    /// `scratch` is the project directory the toolkit writes label files into;
    /// it is made absolute so the toolkit does not nest it under its own runs.
    pub fn new(
        runner: R,
        yolo: impl Into<PathBuf>,
        checkpoint: impl Into<PathBuf>,
        scratch: impl Into<PathBuf>,
    ) -> Result<Self> {
        let checkpoint = checkpoint.into();
        if !checkpoint.is_file() {
            return Err(Error::NotFound(format!(
                "Model not found at {}",
                checkpoint.display()
            )));
        }

        let scratch = scratch.into();
        let scratch = if scratch.is_absolute() {
            scratch
        } else {
            std::env::current_dir()?.join(scratch)
        };

        Ok(Self {
            runner,
            yolo: yolo.into(),
            checkpoint,
            scratch,
            batches: 0,
            cache: HashMap::new(),
        })
    }

    /// The predict command for one source directory or file
    pub fn predict_command(&self, source: &Path, name: &str) -> YoloCommand {
        YoloCommand::classify(&self.yolo, "predict")
            .path("model", &self.checkpoint)
            .path("source", source)
            .path("project", &self.scratch)
            .arg("name", name)
            .flag("exist_ok", true)
            .flag("save", false)
            .flag("save_txt", true)
            .flag("verbose", false)
    }

    /// Runs one prediction into a fresh `batch_NNN` and returns its labels directory
    fn run_batch(&mut self, source: &Path) -> Result<PathBuf> {
        let name = format!("batch_{:03}", self.batches);
        self.batches += 1;
        let out_dir = self.scratch.join(&name);
        if out_dir.exists() {
            fs::remove_dir_all(&out_dir)?;
        }

        let command = self.predict_command(source, &name);
        self.runner.run(&command)?;
        Ok(out_dir.join("labels"))
    }

    /// Predicts a whole directory in one run. Images sharing a stem would
    /// share a label file, so each of those is predicted on its own.
    fn predict_directory(&mut self, dir: &Path) -> Result<()> {
        if self.cache.contains_key(dir) {
            return Ok(());
        }

        let images = scan_images(dir)?;
        let mut by_stem: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
        for image in &images {
            by_stem.entry(file_stem(image)?).or_default().push(image.clone());
        }

        tracing::info!("Predicting {} images in {}", images.len(), dir.display());
        let labels_dir = self.run_batch(dir)?;

        let mut results = HashMap::new();
        let mut shared = Vec::new();
        for (stem, group) in by_stem {
            match group.as_slice() {
                [image] => {
                    if let Some(top_k) = read_label_file(&labels_dir, &stem)? {
                        results.insert(file_name(image)?, top_k);
                    }
                }
                _ => shared.extend(group),
            }
        }

        for image in shared {
            tracing::debug!("Predicting {} separately", image.display());
            let labels_dir = self.run_batch(&image)?;
            if let Some(top_k) = read_label_file(&labels_dir, &file_stem(&image)?)? {
                results.insert(file_name(&image)?, top_k);
            }
        }

        self.cache.insert(dir.to_path_buf(), results);
        Ok(())
    }
}

impl<R: CommandRunner> Classifier for YoloPredictor<R> {
    fn predict(&mut self, image: &Path) -> Result<Prediction> {
        let dir = image
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();
        self.predict_directory(&dir)?;

        let name = file_name(image)?;
        let top_k = self
            .cache
            .get(&dir)
            .and_then(|results| results.get(&name))
            .ok_or_else(|| {
                Error::Prediction(format!("No prediction was written for {}", image.display()))
            })?;

        Ok(Prediction::new(image.to_path_buf(), top_k.clone()))
    }
}

/// Builds the classifier selected by `config.backend`.
///
/// The ONNX backend exports `best.onnx` beside the checkpoint when it is missing.
pub fn open_classifier<'a, R: CommandRunner + 'a>(
    mut runner: R,
    config: &YoloConfig,
    checkpoint: &Path,
    image_size: u32,
) -> Result<Box<dyn Classifier + 'a>> {
    if !checkpoint.is_file() {
        return Err(Error::NotFound(format!(
            "Model not found at {}",
            checkpoint.display()
        )));
    }

    match config.backend {
        PredictorBackend::Toolkit => Ok(Box::new(YoloPredictor::new(
            runner,
            &config.executable,
            checkpoint,
            &config.predict_dir,
        )?)),
        PredictorBackend::Onnx => {
            let onnx = checkpoint.with_extension("onnx");
            if !onnx.is_file() {
                tracing::info!("{} is missing, exporting it", onnx.display());
                runner.run(&export_command(&config.executable, checkpoint))?;
            }
            Ok(Box::new(OnnxClassifier::load(&onnx, image_size)?))
        }
    }
}

fn read_label_file(labels_dir: &Path, stem: &str) -> Result<Option<Vec<(usize, f32)>>> {
    let path = labels_dir.join(format!("{}.txt", stem));
    if !path.is_file() {
        return Ok(None);
    }
    let content = fs::read_to_string(&path)?;
    parse_label_file(&content).map(Some)
}

fn file_stem(path: &Path) -> Result<String> {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .ok_or_else(|| Error::InvalidArgument(format!("No file name in {}", path.display())))
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .ok_or_else(|| Error::InvalidArgument(format!("No file name in {}", path.display())))
}
