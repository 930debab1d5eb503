//! Core types and utilities for the skin disease classification pipeline.
//!
//! This crate provides the error type, class label set, pipeline configuration,
//! device selection and evaluation metrics shared by the pipeline crates and tools.

pub mod cli;
pub mod config;
pub mod device;
pub mod error;
pub mod metrics;
pub mod types;

pub use config::*;
pub use device::{select_best_device, Device};
pub use error::{Error, Result};
pub use metrics::*;
pub use types::*;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::cli::*;
    pub use crate::config::*;
    pub use crate::device::*;
    pub use crate::error::{Error, Result};
    pub use crate::metrics::*;
    pub use crate::types::*;
}
