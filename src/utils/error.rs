//! Error Handling Module
//!
//! Defines the error type for the AGRNet library.
//! Uses thiserror for ergonomic error definitions.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for AGRNet operations
#[derive(Error, Debug)]
pub enum GraspError {
    /// Error with dataset indexing or selection
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Error with model construction or usage
    #[error("Model error: {0}")]
    Model(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Path not found
    #[error("Path not found: {}", .0.display())]
    PathNotFound(PathBuf),

    /// Feature not implemented
    #[error("{0}")]
    NotImplemented(String),
}

/// Convenience Result type for AGRNet operations
pub type Result<T> = std::result::Result<T, GraspError>;

impl From<serde_json::Error> for GraspError {
    fn from(err: serde_json::Error) -> Self {
        GraspError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GraspError::Dataset("no grasp files".to_string());
        assert_eq!(format!("{}", err), "Dataset error: no grasp files");
    }

    #[test]
    fn test_not_implemented_is_verbatim() {
        let err = GraspError::NotImplemented("Dataset Type jacquard is Not implemented".into());
        assert_eq!(err.to_string(), "Dataset Type jacquard is Not implemented");
    }

    #[test]
    fn test_path_not_found() {
        let err = GraspError::PathNotFound(PathBuf::from("/data/cornell"));
        assert!(format!("{}", err).contains("cornell"));
    }
}
