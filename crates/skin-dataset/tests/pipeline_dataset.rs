use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use skin_core::{Error, Result, SplitConfig, CLASS_NAMES};
use skin_dataset::prelude::*;
use tempfile::TempDir;

fn make_images(dir: &Path, count: usize) {
    fs::create_dir_all(dir).unwrap();
    for i in 0..count {
        fs::write(dir.join(format!("img_{:02}.jpg", i)), format!("{}", i)).unwrap();
    }
}

fn file_names(dir: &Path) -> BTreeSet<String> {
    fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}

fn config(source: PathBuf, output: PathBuf) -> SplitConfig {
    SplitConfig {
        source_dir: source,
        output_dir: output,
        ..SplitConfig::default()
    }
}

#[test]
fn split_ten_acne_images_seven_two_one() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("train");
    make_images(&source.join("acne"), 10);
    fs::write(source.join("acne").join("readme.txt"), "skip me").unwrap();

    let output = tmp.path().join("dataset");
    let info = split_dataset(&config(source.clone(), output.clone())).unwrap();

    let acne = &info.classes[0];
    assert_eq!((acne.train, acne.val, acne.test), (7, 2, 1));
    assert_eq!(file_names(&output.join("train/acne")).len(), 7);
    assert_eq!(file_names(&output.join("val/acne")).len(), 2);
    assert_eq!(file_names(&output.join("test/acne")).len(), 1);

    // other classes have empty directories
    for split in ["train", "val", "test"] {
        assert!(file_names(&output.join(split).join("rosacea")).is_empty());
    }

    // source untouched
    assert_eq!(file_names(&source.join("acne")).len(), 11);
    assert!(output.join("split_info.json").exists());
}

#[test]
fn split_is_reproducible_and_disjoint() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("train");
    for (i, class) in CLASS_NAMES.iter().enumerate() {
        make_images(&source.join(class), 5 + i * 7);
    }

    let first = tmp.path().join("first");
    let second = tmp.path().join("second");
    split_dataset(&config(source.clone(), first.clone())).unwrap();
    split_dataset(&config(source.clone(), second.clone())).unwrap();

    for class in CLASS_NAMES {
        let mut seen = BTreeSet::new();
        for split in ["train", "val", "test"] {
            let a = file_names(&first.join(split).join(class));
            let b = file_names(&second.join(split).join(class));
            assert_eq!(a, b, "{split}/{class} differs between runs");
            for name in a {
                assert!(seen.insert(name), "file in more than one split");
            }
        }
        assert_eq!(seen, file_names(&source.join(class)));
    }
}

#[test]
fn split_missing_source_is_not_found() {
    let tmp = TempDir::new().unwrap();
    let err = split_dataset(&config(tmp.path().join("nope"), tmp.path().join("out"))).unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert!(!tmp.path().join("out").exists());
}

#[test]
fn split_info_round_trips_through_disk() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("train");
    make_images(&source.join("panu"), 4);
    let output = tmp.path().join("dataset");
    let info = split_dataset(&config(source, output.clone())).unwrap();

    let loaded = SplitInfo::load(&output.join("split_info.json")).unwrap();
    assert_eq!(loaded.classes, info.classes);
    assert_eq!(loaded.seed, 42);
}

struct LocalFetcher(PathBuf);

impl DatasetFetcher for LocalFetcher {
    fn fetch(&self, _dataset: &str) -> Result<PathBuf> {
        Ok(self.0.clone())
    }
}

struct Answer(bool, usize);

impl OverwritePrompt for Answer {
    fn confirm_overwrite(&mut self, _target: &Path) -> Result<bool> {
        self.1 += 1;
        Ok(self.0)
    }
}

#[test]
fn install_copies_only_expected_classes_from_root() {
    let tmp = TempDir::new().unwrap();
    let download = tmp.path().join("download");
    make_images(&download.join("acne"), 3);
    make_images(&download.join("herpes"), 2);
    make_images(&download.join("not_a_class"), 2);

    let target = tmp.path().join("train");
    let outcome = acquire_dataset(
        &LocalFetcher(download.clone()),
        "owner/slug",
        &target,
        &mut Answer(true, 0),
    )
    .unwrap();

    match outcome {
        InstallOutcome::Installed { source, copied, missing } => {
            assert_eq!(source, download);
            assert_eq!(copied, vec![("acne".to_string(), 3), ("herpes".to_string(), 2)]);
            assert_eq!(missing, vec!["eksim", "panu", "rosacea"]);
        }
        InstallOutcome::Declined => panic!("unexpected decline"),
    }
    assert!(!target.join("not_a_class").exists());
    assert!(!verify_structure(&target).unwrap().is_valid());
}

#[test]
fn install_copies_nested_train_dir_whole() {
    let tmp = TempDir::new().unwrap();
    let download = tmp.path().join("download");
    for class in CLASS_NAMES {
        make_images(&download.join("train").join(class), 2);
    }

    let target = tmp.path().join("train");
    install_dataset(&download, &target, &mut Answer(true, 0)).unwrap();

    let stats = verify_structure(&target).unwrap();
    assert!(stats.is_valid());
    assert_eq!(stats.total(), 10);
}

#[test]
fn install_without_classes_writes_nothing() {
    let tmp = TempDir::new().unwrap();
    let download = tmp.path().join("download");
    make_images(&download.join("cats"), 2);

    let target = tmp.path().join("train");
    let mut prompt = Answer(true, 0);
    let err = install_dataset(&download, &target, &mut prompt).unwrap_err();

    assert!(matches!(err, Error::ClassesNotFound { .. }));
    assert!(!target.exists());
    assert_eq!(prompt.1, 0, "prompt asked before classes were located");
}

#[test]
fn declined_overwrite_keeps_target() {
    let tmp = TempDir::new().unwrap();
    let download = tmp.path().join("download");
    make_images(&download.join("acne"), 3);

    let target = tmp.path().join("train");
    make_images(&target.join("eksim"), 1);

    let mut prompt = Answer(false, 0);
    let outcome = install_dataset(&download, &target, &mut prompt).unwrap();

    assert_eq!(outcome, InstallOutcome::Declined);
    assert_eq!(prompt.1, 1);
    assert!(target.join("eksim/img_00.jpg").exists());
    assert!(!target.join("acne").exists());
}

#[test]
fn confirmed_overwrite_replaces_target() {
    let tmp = TempDir::new().unwrap();
    let download = tmp.path().join("download");
    make_images(&download.join("acne"), 3);

    let target = tmp.path().join("train");
    make_images(&target.join("eksim"), 1);

    install_dataset(&download, &target, &mut AssumeYes).unwrap();
    assert!(!target.join("eksim").exists());
    assert_eq!(file_names(&target.join("acne")).len(), 3);
}

fn write_archive(path: &Path, entries: &[(&str, &[u8])]) {
    use std::io::Write;

    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut zip = zip::ZipWriter::new(fs::File::create(path).unwrap());
    let options = zip::write::SimpleFileOptions::default();
    for (name, data) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap();
}

#[test]
fn fetch_extracts_cached_archive_once() {
    let tmp = TempDir::new().unwrap();
    let fetcher = KaggleFetcher::new(tmp.path().join("cache"));
    let base = fetcher.dataset_dir("o/s").unwrap();
    let archive = base.join("archive.zip");
    write_archive(&archive, &[("train/acne/a.jpg", b"a"), ("train/panu/b.jpg", b"b")]);

    let extracted = fetcher.fetch("o/s").unwrap();
    assert_eq!(extracted, base.join("files"));
    assert_eq!(fs::read(extracted.join("train/acne/a.jpg")).unwrap(), b"a");
    assert!(extracted.join(COMPLETE_MARKER).exists());

    // A completed extraction is reused without reading the archive again
    fs::remove_file(&archive).unwrap();
    fs::write(extracted.join("train/acne/extra.jpg"), b"x").unwrap();
    assert_eq!(fetcher.fetch("o/s").unwrap(), extracted);
    assert!(extracted.join("train/acne/extra.jpg").exists());
    assert!(!archive.exists());
}

#[test]
fn fetch_redoes_interrupted_extraction() {
    let tmp = TempDir::new().unwrap();
    let fetcher = KaggleFetcher::new(tmp.path().join("cache"));
    let base = fetcher.dataset_dir("o/s").unwrap();
    write_archive(&base.join("archive.zip"), &[("eksim/c.png", b"c")]);

    // Leftovers of an extraction that never wrote its marker
    make_images(&base.join("files/stale"), 1);

    let extracted = fetcher.fetch("o/s").unwrap();
    assert!(!extracted.join("stale").exists());
    assert!(extracted.join("eksim/c.png").exists());
    assert!(extracted.join(COMPLETE_MARKER).exists());
}

#[test]
fn corrupt_archive_is_a_download_error() {
    let tmp = TempDir::new().unwrap();
    let fetcher = KaggleFetcher::new(tmp.path().join("cache"));
    let base = fetcher.dataset_dir("o/s").unwrap();
    fs::create_dir_all(&base).unwrap();
    fs::write(base.join("archive.zip"), b"not a zip").unwrap();

    let err = fetcher.fetch("o/s").unwrap_err();
    assert!(matches!(err, Error::Download(_)));
    assert!(!base.join("files").join(COMPLETE_MARKER).exists());
}
