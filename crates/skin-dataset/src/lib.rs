//! Dataset acquisition and partitioning for the skin disease pipeline.
//!
//! This crate downloads the raw class-folder dataset, installs it into the
//! canonical training directory and splits it into train/val/test trees.

pub mod acquire;
pub mod loader;
pub mod split;
pub mod statistics;

pub use acquire::{
    acquire_dataset, install_dataset, locate_class_dir, AssumeYes, DatasetFetcher,
    InstallOutcome, KaggleFetcher, OverwritePrompt, StdinPrompt,
};
pub use loader::{collect_samples, scan_images, scan_images_or_empty};
pub use split::{plan_class_split, plan_split, split_dataset, ClassSplit, SplitInfo, SplitPlan};
pub use statistics::{verify_structure, DatasetStatistics};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::acquire::*;
    pub use crate::loader::*;
    pub use crate::split::*;
    pub use crate::statistics::*;
}
