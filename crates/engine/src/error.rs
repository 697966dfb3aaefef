//! Engine error types.

use std::path::PathBuf;
use thiserror::Error;

/// Failure extracting text from one file or unpacking one archive.
///
/// The display form is the bare underlying message; callers wrap it in an
/// inline marker such as `[Error reading a.pdf: ...]`.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("{0}")]
    SevenZip(String),

    #[error("{0}")]
    Pdf(String),

    #[error("{0}")]
    Word(String),

    #[error("{0}")]
    Csv(#[from] csv::Error),

    #[error("{0}")]
    Spreadsheet(String),
}

/// Failures that abort a request before any model is contacted.
///
/// Document problems never land here: they are folded into the context text.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("Failed to read image {path}: {reason}")]
    Image { path: PathBuf, reason: String },

    #[error("Context builder task failed: {0}")]
    Join(String),
}
