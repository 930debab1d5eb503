//! Training invocation, checkpoint lookup and ONNX export.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use skin_core::{Device, Result, TrainingParams};

use crate::yolo::{CommandRunner, YoloCommand};

/// Layout some toolkit versions nest relative projects under
const NESTED_PROJECT_ROOT: &str = "runs/classify";

/// `yolo classify train` with every training parameter spelled out
pub fn train_command(yolo: &Path, params: &TrainingParams, device: Device) -> YoloCommand {
    YoloCommand::classify(yolo, "train")
        .arg("model", &params.model)
        .path("data", &params.data)
        .arg("epochs", params.epochs)
        .arg("imgsz", params.image_size)
        .arg("batch", params.batch_size)
        .arg("device", device.as_arg())
        .path("project", &params.project)
        .arg("name", &params.name)
        .flag("exist_ok", params.exist_ok)
        .flag("pretrained", params.pretrained)
        .arg("optimizer", params.optimizer)
        .arg("lr0", params.lr0)
        .arg("patience", params.patience)
        .flag("save", params.save)
        .arg("save_period", params.save_period)
        .flag("verbose", params.verbose)
        .flag("plots", params.plots)
}

/// `yolo export model=<checkpoint> format=onnx`
pub fn export_command(yolo: &Path, checkpoint: &Path) -> YoloCommand {
    YoloCommand::mode(yolo, "export")
        .path("model", checkpoint)
        .arg("format", "onnx")
}

/// `yolo classify val` on the held-out test split
pub fn val_command(yolo: &Path, checkpoint: &Path, data: &Path) -> YoloCommand {
    YoloCommand::classify(yolo, "val")
        .path("model", checkpoint)
        .path("data", data)
        .arg("split", "test")
}

/// Run directories where the trainer may have written its output, in lookup order
pub fn candidate_run_dirs(params: &TrainingParams) -> Vec<PathBuf> {
    let run_dir = params.run_dir();
    let mut dirs = vec![run_dir.clone()];
    if run_dir.is_relative() {
        dirs.push(Path::new(NESTED_PROJECT_ROOT).join(&run_dir));
    }
    dirs
}

/// The run directory holding `weights/best.pt`, if any
pub fn find_run_dir(params: &TrainingParams) -> Option<PathBuf> {
    candidate_run_dirs(params)
        .into_iter()
        .find(|dir| best_checkpoint_path(dir).is_file())
}

/// `<run>/weights/best.pt`
pub fn best_checkpoint_path(run_dir: &Path) -> PathBuf {
    run_dir.join("weights").join("best.pt")
}

/// The best checkpoint of the configured run, if training produced one
pub fn find_best_checkpoint(params: &TrainingParams) -> Option<PathBuf> {
    find_run_dir(params).map(|dir| best_checkpoint_path(&dir))
}

/// Artifacts of a finished training run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainOutcome {
    /// `best.pt`, or `None` when the trainer left no checkpoint
    pub checkpoint: Option<PathBuf>,
    /// `best.onnx` beside the checkpoint after a successful export
    pub onnx: Option<PathBuf>,
}

/// Drives the external trainer and exporter
pub struct Trainer<R: CommandRunner> {
    runner: R,
    yolo: PathBuf,
    params: TrainingParams,
}

impl<R: CommandRunner> Trainer<R> {
    pub fn new(runner: R, yolo: impl Into<PathBuf>, params: TrainingParams) -> Self {
        Self {
            runner,
            yolo: yolo.into(),
            params,
        }
    }

    pub fn params(&self) -> &TrainingParams {
        &self.params
    }

    /// The training command for the resolved device
    pub fn command(&self) -> YoloCommand {
        train_command(&self.yolo, &self.params, self.params.device.resolve())
    }

    /// Trains, then exports the best checkpoint to ONNX.
    ///
    /// A run that leaves no checkpoint is reported through
    /// [`TrainOutcome::checkpoint`] rather than as an error.
    pub fn train(&mut self) -> Result<TrainOutcome> {
        self.params.validate()?;
        let command = self.command();
        info!("Starting training: {}", command);
        self.runner.run(&command)?;

        let Some(checkpoint) = find_best_checkpoint(&self.params) else {
            warn!(
                "No best.pt found under {}",
                candidate_run_dirs(&self.params)
                    .iter()
                    .map(|d| d.display().to_string())
                    .collect::<Vec<_>>()
                    .join(" or ")
            );
            return Ok(TrainOutcome {
                checkpoint: None,
                onnx: None,
            });
        };

        info!("Best checkpoint: {}", checkpoint.display());
        let onnx = self.export(&checkpoint)?;
        Ok(TrainOutcome {
            checkpoint: Some(checkpoint),
            onnx,
        })
    }

    /// Exports `checkpoint` and returns the ONNX file if it appeared
    pub fn export(&mut self, checkpoint: &Path) -> Result<Option<PathBuf>> {
        self.runner.run(&export_command(&self.yolo, checkpoint))?;
        let onnx = checkpoint.with_extension("onnx");
        if onnx.is_file() {
            info!("Exported {}", onnx.display());
            Ok(Some(onnx))
        } else {
            warn!("Export finished but {} is missing", onnx.display());
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skin_core::OptimizerType;

    #[test]
    fn test_train_command_defaults() {
        let cmd = train_command(Path::new("yolo"), &TrainingParams::default(), Device::Cpu);
        assert_eq!(&cmd.args[..2], &["classify", "train"]);
        assert_eq!(cmd.get("model"), Some("yolov8s-cls.pt"));
        assert_eq!(cmd.get("data"), Some("dataset"));
        assert_eq!(cmd.get("epochs"), Some("50"));
        assert_eq!(cmd.get("imgsz"), Some("224"));
        assert_eq!(cmd.get("batch"), Some("16"));
        assert_eq!(cmd.get("device"), Some("cpu"));
        assert_eq!(cmd.get("project"), Some("runs/classify"));
        assert_eq!(cmd.get("name"), Some("skin_diseases"));
        assert_eq!(cmd.get("exist_ok"), Some("True"));
        assert_eq!(cmd.get("optimizer"), Some("AdamW"));
        assert_eq!(cmd.get("lr0"), Some("0.001"));
        assert_eq!(cmd.get("patience"), Some("10"));
        assert_eq!(cmd.get("save_period"), Some("10"));
        assert_eq!(cmd.get("plots"), Some("True"));
    }

    #[test]
    fn test_train_command_overrides() {
        let params = TrainingParams {
            epochs: 3,
            optimizer: OptimizerType::SGD,
            plots: false,
            ..TrainingParams::default()
        };
        let cmd = train_command(Path::new("yolo"), &params, Device::Cuda);
        assert_eq!(cmd.get("epochs"), Some("3"));
        assert_eq!(cmd.get("device"), Some("0"));
        assert_eq!(cmd.get("optimizer"), Some("SGD"));
        assert_eq!(cmd.get("plots"), Some("False"));
    }

    #[test]
    fn test_export_and_val_commands() {
        let ckpt = Path::new("runs/classify/skin_diseases/weights/best.pt");
        let export = export_command(Path::new("yolo"), ckpt);
        assert_eq!(export.args[0], "export");
        assert_eq!(export.get("format"), Some("onnx"));

        let val = val_command(Path::new("yolo"), ckpt, Path::new("dataset"));
        assert_eq!(&val.args[..2], &["classify", "val"]);
        assert_eq!(val.get("split"), Some("test"));
    }

    #[test]
    fn test_candidate_run_dirs() {
        let dirs = candidate_run_dirs(&TrainingParams::default());
        assert_eq!(
            dirs,
            vec![
                PathBuf::from("runs/classify/skin_diseases"),
                PathBuf::from("runs/classify/runs/classify/skin_diseases"),
            ]
        );

        let absolute = TrainingParams {
            project: PathBuf::from("/tmp/project"),
            ..TrainingParams::default()
        };
        assert_eq!(candidate_run_dirs(&absolute).len(), 1);
    }
}
