//! Configuration structures for the pipeline stages.
//!
//! Every field has an in-source default, so each tool runs without arguments.
//! A TOML file may override any subset of fields (see [`crate::cli::load_toml_config`]).

use crate::device::Device;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration shared by all tools
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Dataset download and installation
    pub acquisition: AcquisitionConfig,
    /// Train/val/test partitioning
    pub split: SplitConfig,
    /// Parameters passed to the external trainer
    pub training: TrainingParams,
    /// Test-set evaluation
    pub evaluation: EvaluationConfig,
    /// Markdown showcase generation
    pub showcase: ShowcaseConfig,
    /// External toolkit invocation
    pub yolo: YoloConfig,
}

/// Dataset acquisition configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Remote dataset handle, `<owner>/<slug>`
    pub dataset: String,
    /// Canonical directory the class folders are copied into
    pub target_dir: PathBuf,
    /// Download cache; defaults to `~/.cache/skin-pipeline` when unset
    pub cache_dir: Option<PathBuf>,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            dataset: "sponishflea/classification-of-skin-diseases".to_string(),
            target_dir: PathBuf::from("train"),
            cache_dir: None,
        }
    }
}

impl AcquisitionConfig {
    /// Public page of the dataset, used in remediation hints
    pub fn dataset_url(&self) -> String {
        format!("https://www.kaggle.com/datasets/{}", self.dataset)
    }
}

/// Train/validation/test split ratios
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SplitRatios {
    /// Training data ratio
    pub train: f64,
    /// Validation data ratio
    pub val: f64,
    /// Nominal test ratio; the test split receives whatever is left
    pub test: f64,
}

impl Default for SplitRatios {
    fn default() -> Self {
        Self {
            train: 0.7,
            val: 0.2,
            test: 0.1,
        }
    }
}

impl SplitRatios {
    /// Validates that train and val are fractions leaving a non-negative remainder
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("train", self.train), ("val", self.val), ("test", self.test)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Config(format!(
                    "{} ratio must be between 0.0 and 1.0, got {}",
                    name, value
                )));
            }
        }
        if self.train + self.val > 1.0 + 1e-9 {
            return Err(Error::Config(format!(
                "train + val ratios must not exceed 1.0, got {}",
                self.train + self.val
            )));
        }
        Ok(())
    }
}

/// Dataset partitioning configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Directory with one subdirectory per class
    pub source_dir: PathBuf,
    /// Root of the `{train,val,test}/<class>` tree
    pub output_dir: PathBuf,
    /// Split ratios
    pub ratios: SplitRatios,
    /// Random seed for reproducibility
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("train"),
            output_dir: PathBuf::from("dataset"),
            ratios: SplitRatios::default(),
            seed: 42,
        }
    }
}

/// Optimizer names understood by the external trainer
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OptimizerType {
    /// SGD with momentum
    SGD,
    /// Adam optimizer
    Adam,
    /// AdamW optimizer
    AdamW,
    /// RMSprop optimizer
    RMSProp,
    /// Let the trainer choose
    #[serde(rename = "auto")]
    Auto,
}

impl std::fmt::Display for OptimizerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptimizerType::SGD => write!(f, "SGD"),
            OptimizerType::Adam => write!(f, "Adam"),
            OptimizerType::AdamW => write!(f, "AdamW"),
            OptimizerType::RMSProp => write!(f, "RMSProp"),
            OptimizerType::Auto => write!(f, "auto"),
        }
    }
}

/// Training hyperparameters handed to the external trainer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingParams {
    /// Pretrained model weights to start from
    pub model: String,
    /// Dataset root containing train/val/test
    pub data: PathBuf,
    /// Number of training epochs
    pub epochs: usize,
    /// Square input image size
    pub image_size: u32,
    /// Batch size
    pub batch_size: usize,
    /// Compute device; `auto` prefers an accelerator
    pub device: Device,
    /// Output project directory
    pub project: PathBuf,
    /// Run name inside the project
    pub name: String,
    /// Reuse an existing run directory
    pub exist_ok: bool,
    /// Start from pretrained weights
    pub pretrained: bool,
    /// Optimizer type
    pub optimizer: OptimizerType,
    /// Initial learning rate
    pub lr0: f64,
    /// Early stopping patience (epochs)
    pub patience: usize,
    /// Save checkpoints
    pub save: bool,
    /// Save a checkpoint every N epochs
    pub save_period: usize,
    /// Verbose trainer output
    pub verbose: bool,
    /// Let the trainer write its own plots
    pub plots: bool,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            model: "yolov8s-cls.pt".to_string(),
            data: PathBuf::from("dataset"),
            epochs: 50,
            image_size: 224,
            batch_size: 16,
            device: Device::Auto,
            project: PathBuf::from("runs/classify"),
            name: "skin_diseases".to_string(),
            exist_ok: true,
            pretrained: true,
            optimizer: OptimizerType::AdamW,
            lr0: 0.001,
            patience: 10,
            save: true,
            save_period: 10,
            verbose: true,
            plots: true,
        }
    }
}

impl TrainingParams {
    /// `<project>/<name>`, where the trainer writes its run
    pub fn run_dir(&self) -> PathBuf {
        self.project.join(&self.name)
    }

    /// Validates numeric parameters
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(Error::Config("epochs must be greater than 0".to_string()));
        }
        if self.batch_size == 0 {
            return Err(Error::Config("batch size must be greater than 0".to_string()));
        }
        if self.image_size == 0 {
            return Err(Error::Config("image size must be greater than 0".to_string()));
        }
        if !(self.lr0 > 0.0) {
            return Err(Error::Config(format!("lr0 must be positive, got {}", self.lr0)));
        }
        Ok(())
    }
}

/// Test-set evaluation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Directory with `<class>/` folders of held-out images
    pub test_dir: PathBuf,
    /// Sample predictions printed per class
    pub samples_per_class: usize,
    /// Run the trainer's own validation on the test split first
    pub run_builtin_val: bool,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            test_dir: PathBuf::from("dataset/test"),
            samples_per_class: 5,
            run_builtin_val: true,
        }
    }
}

/// Showcase configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShowcaseConfig {
    /// Directory the samples are drawn from
    pub test_dir: PathBuf,
    /// Output directory (`images/` and the Markdown file live here)
    pub output_dir: PathBuf,
    /// Images sampled per class
    pub samples_per_class: usize,
    /// Seed for sampling
    pub seed: u64,
    /// Markdown file name inside `output_dir`
    pub markdown_name: String,
}

impl Default for ShowcaseConfig {
    fn default() -> Self {
        Self {
            test_dir: PathBuf::from("dataset/test"),
            output_dir: PathBuf::from("showcase"),
            samples_per_class: 3,
            seed: 42,
            markdown_name: "INFERENCE_SHOWCASE.md".to_string(),
        }
    }
}

impl std::fmt::Display for TrainingParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "  Model:        {}", self.model)?;
        writeln!(f, "  Data:         {}", self.data.display())?;
        writeln!(f, "  Epochs:       {}", self.epochs)?;
        writeln!(f, "  Image size:   {}", self.image_size)?;
        writeln!(f, "  Batch size:   {}", self.batch_size)?;
        writeln!(f, "  Device:       {}", self.device)?;
        writeln!(f, "  Project:      {}", self.project.display())?;
        writeln!(f, "  Name:         {}", self.name)?;
        writeln!(f, "  Exist ok:     {}", self.exist_ok)?;
        writeln!(f, "  Pretrained:   {}", self.pretrained)?;
        writeln!(f, "  Optimizer:    {}", self.optimizer)?;
        writeln!(f, "  lr0:          {}", self.lr0)?;
        writeln!(f, "  Patience:     {}", self.patience)?;
        writeln!(f, "  Save:         {}", self.save)?;
        writeln!(f, "  Save period:  {}", self.save_period)?;
        writeln!(f, "  Verbose:      {}", self.verbose)?;
        write!(f, "  Plots:        {}", self.plots)
    }
}

/// How evaluation and showcase predictions are made
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PredictorBackend {
    /// Run the exported `best.onnx` in process (exact confidences)
    #[default]
    Onnx,
    /// Shell out to `yolo classify predict` (confidences rounded to 0.01)
    Toolkit,
}

/// External toolkit configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct YoloConfig {
    /// Executable name or path of the toolkit CLI
    pub executable: PathBuf,
    /// Scratch project for prediction outputs
    pub predict_dir: PathBuf,
    /// Prediction backend
    pub backend: PredictorBackend,
}

impl Default for YoloConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("yolo"),
            predict_dir: PathBuf::from("runs/classify/predictions"),
            backend: PredictorBackend::Onnx,
        }
    }
}
