//! Error types for the skin disease classification pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type shared by the pipeline crates.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A prerequisite (source directory, checkpoint, ...) is missing
    #[error("Not found: {0}")]
    NotFound(String),

    /// No directory with any of the expected class folders exists under the download
    #[error("Could not find a directory with the expected classes {expected:?} under {searched}")]
    ClassesNotFound {
        expected: Vec<String>,
        searched: PathBuf,
    },

    /// Remote dataset fetch failed
    #[error("Download failed: {0}")]
    Download(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// External command failed or could not be started
    #[error("Command `{program}` failed: {reason}")]
    Command { program: String, reason: String },

    /// Prediction output could not be read or interpreted
    #[error("Prediction error: {0}")]
    Prediction(String),

    /// Image processing error
    #[error("Image processing error: {0}")]
    Image(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid argument error
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    /// Build a [`Error::Command`] from a program name and a reason.
    pub fn command(program: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Command {
            program: program.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::Image(err.to_string())
    }
}

/// Specialized Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::NotFound("train".to_string());
        assert_eq!(err.to_string(), "Not found: train");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_command_error_display() {
        let err = Error::command("yolo", "exit status 2");
        assert_eq!(err.to_string(), "Command `yolo` failed: exit status 2");
    }

    #[test]
    fn test_classes_not_found_mentions_path() {
        let err = Error::ClassesNotFound {
            expected: vec!["acne".to_string()],
            searched: PathBuf::from("/tmp/download"),
        };
        let msg = err.to_string();
        assert!(msg.contains("acne"));
        assert!(msg.contains("/tmp/download"));
    }
}
