//! Per-run conversion settings.
//!
//! A `ConvertConfig` is built once by the invoking surface (CLI flags or the
//! upload form) and passed down explicitly; nothing here is global.

use std::collections::BTreeSet;
use std::path::PathBuf;

/// Default directory for batch output
pub const DEFAULT_OUTPUT_DIR: &str = "Converted";

/// Default worksheet name (what spreadsheet tools name the first sheet)
pub const DEFAULT_SHEET_NAME: &str = "Sheet1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertConfig {
    /// Columns normalized as dates in addition to those flagged by file metadata
    pub extra_date_columns: BTreeSet<String>,
    /// Replace coded values with their value labels
    pub apply_value_labels: bool,
    pub sheet_name: String,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            extra_date_columns: BTreeSet::new(),
            apply_value_labels: true,
            sheet_name: DEFAULT_SHEET_NAME.to_string(),
        }
    }
}

impl ConvertConfig {
    pub fn with_date_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_date_columns
            .extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn with_value_labels(mut self, apply: bool) -> Self {
        self.apply_value_labels = apply;
        self
    }

    pub fn with_sheet_name(mut self, name: impl Into<String>) -> Self {
        self.sheet_name = name.into();
        self
    }
}

/// Settings for the batch command
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub output_dir: PathBuf,
    pub convert: ConvertConfig,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            convert: ConvertConfig::default(),
        }
    }
}
