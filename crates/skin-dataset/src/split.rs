//! Seeded train/validation/test partitioning of a class-folder dataset.
//!
//! Each class is handled independently: its images are listed in sorted order,
//! shuffled with the supplied RNG and cut into contiguous slices
//!
//! - `train = floor(N * train_ratio)`
//! - `val = floor(N * val_ratio)`
//! - `test = N - train - val`
//!
//! Planning is pure; [`SplitPlan::execute`] does the copying. Files are copied,
//! never moved, so the source tree is left untouched.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use skin_core::cli::progress_bar;
use skin_core::{DataSplit, Error, Result, SplitConfig, SplitRatios, CLASS_NAMES};

use crate::loader::scan_images_or_empty;

/// Name of the metadata file written next to the split directories
pub const SPLIT_INFO_FILE: &str = "split_info.json";

/// Number of files that go to (train, val, test) for a class of `total` files
pub fn split_counts(total: usize, ratios: &SplitRatios) -> (usize, usize, usize) {
    let train = (total as f64 * ratios.train).floor() as usize;
    let val = ((total as f64 * ratios.val).floor() as usize).min(total - train);
    (train, val, total - train - val)
}

/// Split assignment for one class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSplit {
    pub class_name: String,
    pub train: Vec<PathBuf>,
    pub val: Vec<PathBuf>,
    pub test: Vec<PathBuf>,
}

impl ClassSplit {
    /// Files assigned to `split`
    pub fn files(&self, split: DataSplit) -> &[PathBuf] {
        match split {
            DataSplit::Train => &self.train,
            DataSplit::Val => &self.val,
            DataSplit::Test => &self.test,
        }
    }

    pub fn total(&self) -> usize {
        self.train.len() + self.val.len() + self.test.len()
    }

    pub fn counts(&self) -> ClassCounts {
        ClassCounts {
            class_name: self.class_name.clone(),
            train: self.train.len(),
            val: self.val.len(),
            test: self.test.len(),
        }
    }
}

/// Assigns `images` of one class to the three splits.
///
/// The input order does not matter: paths are sorted before shuffling, so the
/// result depends only on the set of paths and the RNG state.
pub fn plan_class_split<R: Rng + ?Sized>(
    class_name: &str,
    mut images: Vec<PathBuf>,
    ratios: &SplitRatios,
    rng: &mut R,
) -> ClassSplit {
    images.sort();
    images.shuffle(rng);

    let (train_count, val_count, _) = split_counts(images.len(), ratios);
    let test = images.split_off(train_count + val_count);
    let val = images.split_off(train_count);

    ClassSplit {
        class_name: class_name.to_string(),
        train: images,
        val,
        test,
    }
}

/// Split assignment for every class, in class order
#[derive(Debug, Clone)]
pub struct SplitPlan {
    pub source: PathBuf,
    pub ratios: SplitRatios,
    pub classes: Vec<ClassSplit>,
}

/// Plans the split of `<source>/<class>/` for every known class.
///
/// The same RNG is threaded through the classes in order. A missing class
/// directory plans as an empty class.
pub fn plan_split<R: Rng + ?Sized>(
    source: &Path,
    ratios: &SplitRatios,
    rng: &mut R,
) -> Result<SplitPlan> {
    if !source.is_dir() {
        return Err(Error::NotFound(format!(
            "Source directory not found: {}",
            source.display()
        )));
    }
    ratios.validate()?;

    let mut classes = Vec::with_capacity(CLASS_NAMES.len());
    for class_name in CLASS_NAMES {
        let class_dir = source.join(class_name);
        if !class_dir.is_dir() {
            tracing::warn!("Class directory missing: {}", class_dir.display());
        }
        let images = scan_images_or_empty(&class_dir)?;
        tracing::debug!("{}: {} images", class_name, images.len());
        classes.push(plan_class_split(class_name, images, ratios, rng));
    }

    Ok(SplitPlan {
        source: source.to_path_buf(),
        ratios: *ratios,
        classes,
    })
}

impl SplitPlan {
    pub fn total(&self) -> usize {
        self.classes.iter().map(ClassSplit::total).sum()
    }

    /// Creates `<output>/{train,val,test}/<class>/` for every class and copies
    /// each planned file into its split.
    pub fn execute(&self, output: &Path) -> Result<Vec<ClassCounts>> {
        for split in DataSplit::ALL {
            for class_name in CLASS_NAMES {
                fs::create_dir_all(output.join(split.dir_name()).join(class_name))?;
            }
        }

        let pb = progress_bar(self.total() as u64, "files");
        for class in &self.classes {
            pb.set_message(class.class_name.clone());
            for split in DataSplit::ALL {
                let dest_dir = output.join(split.dir_name()).join(&class.class_name);
                fs::create_dir_all(&dest_dir)?;
                for src in class.files(split) {
                    let file_name = src.file_name().ok_or_else(|| {
                        Error::InvalidArgument(format!("No file name in {}", src.display()))
                    })?;
                    fs::copy(src, dest_dir.join(file_name))?;
                    pb.inc(1);
                }
            }
        }
        pb.finish_and_clear();

        Ok(self.classes.iter().map(ClassSplit::counts).collect())
    }
}

/// Per-class split sizes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassCounts {
    pub class_name: String,
    pub train: usize,
    pub val: usize,
    pub test: usize,
}

impl ClassCounts {
    pub fn total(&self) -> usize {
        self.train + self.val + self.test
    }
}

/// Metadata recorded in `split_info.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitInfo {
    pub created_at: DateTime<Utc>,
    pub source: PathBuf,
    pub output: PathBuf,
    pub seed: u64,
    pub ratios: SplitRatios,
    pub classes: Vec<ClassCounts>,
}

impl SplitInfo {
    pub fn total(&self) -> usize {
        self.classes.iter().map(ClassCounts::total).sum()
    }

    /// (train, val, test) summed over classes
    pub fn split_totals(&self) -> (usize, usize, usize) {
        self.classes.iter().fold((0, 0, 0), |(tr, va, te), c| {
            (tr + c.train, va + c.val, te + c.test)
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Per-class table followed by overall split percentages
    pub fn table(&self) -> String {
        let mut out = format!(
            "{:<10} {:>8} {:>8} {:>8} {:>8}\n",
            "Class", "Train", "Val", "Test", "Total"
        );
        out.push_str(&format!("{}\n", "-".repeat(46)));
        for c in &self.classes {
            out.push_str(&format!(
                "{:<10} {:>8} {:>8} {:>8} {:>8}\n",
                c.class_name,
                c.train,
                c.val,
                c.test,
                c.total()
            ));
        }

        let (train, val, test) = self.split_totals();
        let total = self.total();
        out.push_str(&format!("{}\n", "-".repeat(46)));
        out.push_str(&format!(
            "{:<10} {:>8} {:>8} {:>8} {:>8}\n",
            "TOTAL", train, val, test, total
        ));

        let pct = |n: usize| if total > 0 { n as f64 / total as f64 * 100.0 } else { 0.0 };
        out.push_str(&format!(
            "\nTrain: {:.1}%  Val: {:.1}%  Test: {:.1}%\n",
            pct(train),
            pct(val),
            pct(test)
        ));
        out
    }
}

/// Plans and executes the split described by `config`, then writes
/// `split_info.json` into the output directory.
pub fn split_dataset(config: &SplitConfig) -> Result<SplitInfo> {
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let plan = plan_split(&config.source_dir, &config.ratios, &mut rng)?;

    tracing::info!(
        "Splitting {} images from {} into {}",
        plan.total(),
        config.source_dir.display(),
        config.output_dir.display()
    );

    let classes = plan.execute(&config.output_dir)?;
    let info = SplitInfo {
        created_at: Utc::now(),
        source: config.source_dir.clone(),
        output: config.output_dir.clone(),
        seed: config.seed,
        ratios: config.ratios,
        classes,
    };
    info.save(&config.output_dir.join(SPLIT_INFO_FILE))?;

    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn paths(n: usize) -> Vec<PathBuf> {
        (0..n).map(|i| PathBuf::from(format!("img_{:03}.jpg", i))).collect()
    }

    #[test]
    fn test_split_counts() {
        let ratios = SplitRatios::default();
        assert_eq!(split_counts(10, &ratios), (7, 2, 1));
        assert_eq!(split_counts(0, &ratios), (0, 0, 0));
        assert_eq!(split_counts(1, &ratios), (0, 0, 1));
        assert_eq!(split_counts(3, &ratios), (2, 0, 1));
        assert_eq!(split_counts(99, &ratios), (69, 19, 11));
    }

    #[test]
    fn test_counts_sum_for_many_sizes() {
        let ratios = SplitRatios::default();
        for n in 0..200 {
            let (train, val, test) = split_counts(n, &ratios);
            assert_eq!(train + val + test, n);
            assert_eq!(train, (n as f64 * 0.7).floor() as usize);
            assert_eq!(val, (n as f64 * 0.2).floor() as usize);
        }
    }

    #[test]
    fn test_plan_is_disjoint_and_complete() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let split = plan_class_split("acne", paths(37), &SplitRatios::default(), &mut rng);

        let all: Vec<_> = split.train.iter().chain(&split.val).chain(&split.test).collect();
        let unique: HashSet<_> = all.iter().collect();
        assert_eq!(all.len(), 37);
        assert_eq!(unique.len(), 37);
    }

    #[test]
    fn test_plan_ignores_input_order() {
        let ratios = SplitRatios::default();
        let mut reversed = paths(20);
        reversed.reverse();

        let a = plan_class_split("eksim", paths(20), &ratios, &mut ChaCha8Rng::seed_from_u64(42));
        let b = plan_class_split("eksim", reversed, &ratios, &mut ChaCha8Rng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_seeds_differ() {
        let ratios = SplitRatios::default();
        let a = plan_class_split("panu", paths(50), &ratios, &mut ChaCha8Rng::seed_from_u64(1));
        let b = plan_class_split("panu", paths(50), &ratios, &mut ChaCha8Rng::seed_from_u64(2));
        assert_ne!(a.train, b.train);
    }

    #[test]
    fn test_empty_class() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let split = plan_class_split("herpes", Vec::new(), &SplitRatios::default(), &mut rng);
        assert_eq!(split.total(), 0);
    }

    #[test]
    fn test_split_info_table() {
        let info = SplitInfo {
            created_at: Utc::now(),
            source: PathBuf::from("train"),
            output: PathBuf::from("dataset"),
            seed: 42,
            ratios: SplitRatios::default(),
            classes: vec![ClassCounts {
                class_name: "acne".to_string(),
                train: 7,
                val: 2,
                test: 1,
            }],
        };
        let table = info.table();
        assert!(table.contains("acne"));
        assert!(table.contains("Train: 70.0%"));
        assert_eq!(info.split_totals(), (7, 2, 1));
    }
}
