//! Training infrastructure for skin disease classification.
//!
//! Model training and export are delegated to the external `yolo` toolkit.
//! This crate provides:
//! - Command assembly and execution for the toolkit
//! - Training invocation with checkpoint lookup and ONNX export
//! - [`Classifier`]s: the exported ONNX model run with tract, or the
//!   toolkit's predict mode
//! - Test-set evaluation into a confusion matrix and report

pub mod evaluator;
pub mod onnx;
pub mod predictor;
pub mod trainer;
pub mod yolo;

pub use evaluator::{evaluate_dir, EvaluatedSample, EvaluationResult};
pub use onnx::OnnxClassifier;
pub use predictor::{open_classifier, parse_label_file, Classifier, YoloPredictor};
pub use trainer::{
    export_command, find_best_checkpoint, find_run_dir, train_command, val_command, TrainOutcome,
    Trainer,
};
pub use yolo::{CommandRunner, SystemRunner, YoloCommand};

/// Re-export commonly used types
pub mod prelude {
    pub use super::evaluator::*;
    pub use super::onnx::*;
    pub use super::predictor::*;
    pub use super::trainer::*;
    pub use super::yolo::*;
}
