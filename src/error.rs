use std::path::PathBuf;
use thiserror::Error;

pub type ConvertResult<T> = Result<T, ConvertError>;

#[derive(Error, Debug)]
pub enum ConvertError {
    /// Input missing, unreadable, or not a statistical file. Fatal.
    #[error("Failed to read '{}': {reason}", path.display())]
    SourceRead { path: PathBuf, reason: String },

    /// Destination unwritable or workbook serialization failed. Fatal.
    #[error("Failed to write '{}': {reason}", path.display())]
    OutputWrite { path: PathBuf, reason: String },

    /// A single date cell could not be normalized. Recovered per cell.
    #[error("Cannot convert {value} to a date: {reason}")]
    DateConversion { value: String, reason: String },

    /// A value label entry was skipped. Recovered per entry.
    #[error("Skipped value label in '{column}': {reason}")]
    LabelLookup { column: String, reason: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConvertError {
    pub fn source_read(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        ConvertError::SourceRead {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn output_write(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        ConvertError::OutputWrite {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// True for errors that abort a whole run.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            ConvertError::DateConversion { .. } | ConvertError::LabelLookup { .. }
        )
    }
}
