//! Error types for import-rewrite

use std::path::PathBuf;

use thiserror::Error;

use crate::edit::EditError;
use crate::file::{FileError, FileKey};

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal failures; skippable analysis gaps and overlap conflicts never surface here
#[derive(Error, Debug)]
pub enum Error {
    #[error("No tsconfig.json found at or above {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("Invalid project configuration {}: {message}", path.display())]
    Config { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error(transparent)]
    File(#[from] FileError),

    #[error("Parse error in {file}: {message}")]
    Parse { file: FileKey, message: String },

    #[error("Failed to patch {file}: {source}")]
    Patch { file: FileKey, source: EditError },

    #[error("Still conflicting after {limit} passes in: {}", files.join(", "))]
    PassLimitExceeded { limit: usize, files: Vec<String> },
}
