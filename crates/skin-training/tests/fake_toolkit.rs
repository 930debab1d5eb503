use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use skin_core::{Error, PredictorBackend, Result, TrainingParams, YoloConfig, CLASS_NAMES};
use skin_training::prelude::*;
use tempfile::TempDir;

/// Stands in for the toolkit, writing the files the real one would.
#[derive(Default)]
struct FakeYolo {
    calls: Vec<YoloCommand>,
    skip_checkpoint: bool,
}

impl FakeYolo {
    fn labels_for(image: &Path) -> String {
        let true_class = image
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .unwrap_or("acne");
        let name = image.file_stem().and_then(|s| s.to_str()).unwrap_or("");
        let top = if name.contains("wrong") { "rosacea" } else { true_class };
        let conf = match image.extension().and_then(|e| e.to_str()) {
            Some("png") => "0.85",
            _ => "0.90",
        };

        let mut lines = vec![format!("{} {}", conf, top)];
        lines.extend(
            CLASS_NAMES
                .iter()
                .filter(|c| **c != top)
                .map(|c| format!("0.02 {}", c))
                .take(4),
        );
        lines.push(String::new());
        lines.join("\n")
    }
}

impl CommandRunner for FakeYolo {
    fn run(&mut self, command: &YoloCommand) -> Result<()> {
        self.calls.push(command.clone());
        let mode = if command.args[0] == "classify" {
            command.args[1].as_str()
        } else {
            command.args[0].as_str()
        };

        match mode {
            "train" => {
                if !self.skip_checkpoint {
                    let run = Path::new(command.get("project").unwrap()).join(command.get("name").unwrap());
                    fs::create_dir_all(run.join("weights")).unwrap();
                    fs::write(run.join("weights/best.pt"), b"weights").unwrap();
                }
            }
            "export" => {
                let model = PathBuf::from(command.get("model").unwrap());
                fs::write(model.with_extension("onnx"), b"onnx").unwrap();
            }
            "predict" => {
                let source = PathBuf::from(command.get("source").unwrap());
                let labels = Path::new(command.get("project").unwrap())
                    .join(command.get("name").unwrap())
                    .join("labels");
                fs::create_dir_all(&labels).unwrap();
                let images: Vec<PathBuf> = if source.is_dir() {
                    let mut found: Vec<_> =
                        fs::read_dir(&source).unwrap().map(|e| e.unwrap().path()).collect();
                    found.sort();
                    found
                } else {
                    vec![source]
                };
                // label files are appended to, like the toolkit does
                for image in images {
                    let stem = image.file_stem().unwrap().to_string_lossy().into_owned();
                    let mut file = OpenOptions::new()
                        .create(true)
                        .append(true)
                        .open(labels.join(format!("{}.txt", stem)))
                        .unwrap();
                    file.write_all(Self::labels_for(&image).as_bytes()).unwrap();
                }
            }
            _ => {}
        }
        Ok(())
    }
}

fn params_in(dir: &Path) -> TrainingParams {
    TrainingParams {
        project: dir.join("runs"),
        epochs: 1,
        ..TrainingParams::default()
    }
}

#[test]
fn training_finds_and_exports_checkpoint() {
    let tmp = TempDir::new().unwrap();
    let mut trainer = Trainer::new(FakeYolo::default(), "yolo", params_in(tmp.path()));
    let outcome = trainer.train().unwrap();

    let expected = tmp.path().join("runs/skin_diseases/weights/best.pt");
    assert_eq!(outcome.checkpoint, Some(expected.clone()));
    assert_eq!(outcome.onnx, Some(expected.with_extension("onnx")));
}

#[test]
fn training_without_checkpoint_is_reported_not_fatal() {
    let tmp = TempDir::new().unwrap();
    let runner = FakeYolo {
        skip_checkpoint: true,
        ..FakeYolo::default()
    };
    let mut trainer = Trainer::new(runner, "yolo", params_in(tmp.path()));
    let outcome = trainer.train().unwrap();
    assert_eq!(outcome.checkpoint, None);
    assert_eq!(outcome.onnx, None);
}

#[test]
fn invalid_params_never_reach_the_toolkit() {
    let tmp = TempDir::new().unwrap();
    let params = TrainingParams {
        batch_size: 0,
        ..params_in(tmp.path())
    };
    let mut trainer = Trainer::new(FakeYolo::default(), "yolo", params);
    assert!(matches!(trainer.train(), Err(Error::Config(_))));
}

fn make_test_tree(root: &Path) {
    for class in CLASS_NAMES {
        let dir = root.join(class);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("a.jpg"), b"x").unwrap();
        fs::write(dir.join("b.png"), b"x").unwrap();
    }
    fs::write(root.join("acne/c_wrong.jpg"), b"x").unwrap();
}

fn checkpoint_in(dir: &Path) -> PathBuf {
    let ckpt = dir.join("best.pt");
    fs::write(&ckpt, b"weights").unwrap();
    ckpt
}

#[test]
fn predictor_reads_label_files_and_caches_per_directory() {
    let tmp = TempDir::new().unwrap();
    let test_dir = tmp.path().join("test");
    make_test_tree(&test_dir);

    let mut predictor = YoloPredictor::new(
        FakeYolo::default(),
        "yolo",
        checkpoint_in(tmp.path()),
        tmp.path().join("scratch"),
    )
    .unwrap();

    let p = predictor.predict(&test_dir.join("herpes/a.jpg")).unwrap();
    assert_eq!(p.top1_name(), "herpes");
    assert!((p.top1_conf() - 0.90).abs() < 1e-6);
    assert_eq!(p.top(3).len(), 3);

    let wrong = predictor.predict(&test_dir.join("acne/c_wrong.jpg")).unwrap();
    assert_eq!(wrong.top1_name(), "rosacea");

    predictor.predict(&test_dir.join("herpes/b.png")).unwrap();
}

#[test]
fn predictor_counts_one_toolkit_run_per_directory() {
    let tmp = TempDir::new().unwrap();
    let test_dir = tmp.path().join("test");
    make_test_tree(&test_dir);

    let mut runner = FakeYolo::default();
    {
        let mut predictor =
            YoloPredictor::new(&mut runner, "yolo", checkpoint_in(tmp.path()), tmp.path().join("s"))
                .unwrap();
        predictor.predict(&test_dir.join("panu/a.jpg")).unwrap();
        predictor.predict(&test_dir.join("panu/b.png")).unwrap();
        predictor.predict(&test_dir.join("eksim/a.jpg")).unwrap();
    }
    assert_eq!(runner.calls.len(), 2);
    assert_eq!(runner.calls[0].get("save_txt"), Some("True"));
}

#[test]
fn predictor_separates_images_sharing_a_stem() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("acne");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("img1.jpg"), b"x").unwrap();
    fs::write(dir.join("img1.png"), b"x").unwrap();
    fs::write(dir.join("img2.jpg"), b"x").unwrap();

    let mut runner = FakeYolo::default();
    {
        let mut predictor =
            YoloPredictor::new(&mut runner, "yolo", checkpoint_in(tmp.path()), tmp.path().join("s"))
                .unwrap();
        let jpg = predictor.predict(&dir.join("img1.jpg")).unwrap();
        let png = predictor.predict(&dir.join("img1.png")).unwrap();
        let other = predictor.predict(&dir.join("img2.jpg")).unwrap();

        assert_eq!(jpg.top1_name(), "acne");
        assert!((jpg.top1_conf() - 0.90).abs() < 1e-6);
        assert!((png.top1_conf() - 0.85).abs() < 1e-6);
        assert!((other.top1_conf() - 0.90).abs() < 1e-6);
    }

    // one run for the directory plus one per colliding image
    assert_eq!(runner.calls.len(), 3);
    let sources: Vec<_> = runner.calls.iter().map(|c| c.get("source").unwrap().to_string()).collect();
    assert!(sources[1].ends_with("img1.jpg"));
    assert!(sources[2].ends_with("img1.png"));
}

#[test]
fn evaluation_covers_images_sharing_a_stem() {
    let tmp = TempDir::new().unwrap();
    let test_dir = tmp.path().join("test");
    make_test_tree(&test_dir);
    fs::write(test_dir.join("acne/a.png"), b"x").unwrap();

    let mut predictor = YoloPredictor::new(
        FakeYolo::default(),
        "yolo",
        checkpoint_in(tmp.path()),
        tmp.path().join("scratch"),
    )
    .unwrap();
    let result = evaluate_dir(&mut predictor, &test_dir).unwrap();
    assert_eq!(result.samples.len(), 12);
    assert_eq!(result.confusion.correct(), 11);
}

#[test]
fn predictor_requires_checkpoint() {
    let tmp = TempDir::new().unwrap();
    let result = YoloPredictor::new(
        FakeYolo::default(),
        "yolo",
        tmp.path().join("missing.pt"),
        tmp.path().join("scratch"),
    );
    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[test]
fn evaluation_report_agrees_with_predictions() {
    let tmp = TempDir::new().unwrap();
    let test_dir = tmp.path().join("test");
    make_test_tree(&test_dir);

    let mut predictor = YoloPredictor::new(
        FakeYolo::default(),
        "yolo",
        checkpoint_in(tmp.path()),
        tmp.path().join("scratch"),
    )
    .unwrap();
    let result = evaluate_dir(&mut predictor, &test_dir).unwrap();

    assert_eq!(result.samples.len(), 11);
    assert_eq!(result.confusion.total(), 11);
    assert_eq!(result.confusion.correct(), 10);
    // the misclassified acne image lands in the rosacea column
    assert_eq!(result.confusion.get(0, 4), 1);
    assert_eq!(result.report.per_class[0].support, 3);
    assert!((result.report.accuracy - 10.0 / 11.0).abs() < 1e-9);

    let acne_samples = result.samples_for_class(0, 5);
    let names: Vec<_> = acne_samples.iter().map(|s| s.sample.file_name()).collect();
    assert_eq!(names, vec!["a.jpg", "b.png", "c_wrong.jpg"]);
}

#[test]
fn toolkit_backend_predicts_through_the_runner() {
    let tmp = TempDir::new().unwrap();
    let test_dir = tmp.path().join("test");
    make_test_tree(&test_dir);

    let config = YoloConfig {
        backend: PredictorBackend::Toolkit,
        predict_dir: tmp.path().join("scratch"),
        ..YoloConfig::default()
    };
    let mut classifier =
        open_classifier(FakeYolo::default(), &config, &checkpoint_in(tmp.path()), 224).unwrap();
    let result = evaluate_dir(&mut classifier, &test_dir).unwrap();
    assert_eq!(result.confusion.correct(), 10);
}

#[test]
fn onnx_backend_exports_missing_model_first() {
    let tmp = TempDir::new().unwrap();
    let checkpoint = checkpoint_in(tmp.path());

    let mut runner = FakeYolo::default();
    {
        // the fake export writes placeholder bytes, which tract rejects
        let result = open_classifier(&mut runner, &YoloConfig::default(), &checkpoint, 224);
        assert!(matches!(result, Err(Error::Prediction(_))));
    }

    assert_eq!(runner.calls.len(), 1);
    assert_eq!(runner.calls[0].args[0], "export");
    assert!(checkpoint.with_extension("onnx").exists());
}

#[test]
fn classifier_requires_checkpoint() {
    let tmp = TempDir::new().unwrap();
    let mut runner = FakeYolo::default();
    {
        let missing = tmp.path().join("none.pt");
        let result = open_classifier(&mut runner, &YoloConfig::default(), &missing, 224);
        assert!(matches!(result, Err(Error::NotFound(_))));
    }
    assert!(runner.calls.is_empty());
}
