//! Reporting for the skin disease pipeline.
//!
//! Renders evaluation results (confusion matrix heatmaps and the text
//! classification report) and the Markdown inference showcase.

pub mod charts;
pub mod colormap;
pub mod heatmap;
pub mod report;
pub mod showcase;

pub use charts::{confusion_matrix_svg, save_confusion_matrix_svg};
pub use heatmap::{render_heatmap, save_heatmap_png};
pub use report::{save_report, write_evaluation_artifacts, EvaluationArtifacts};
pub use showcase::{
    build_records, render_markdown, sample_images, write_markdown, ClassSamples, ModelInfo,
    ShowcaseStats,
};
