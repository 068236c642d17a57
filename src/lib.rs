//! sav2xlsx - SPSS `.sav` to Excel `.xlsx` converter
//!
//! Reads an SPSS system file and writes a single-sheet workbook in which
//! column headers are the variables' labels, coded values are replaced by
//! their value labels, and SPSS date values appear as `YYYY-MM-DD` text.
//!
//! # Features
//!
//! - Native `.sav` decoding (uncompressed and bytecode-compressed)
//! - Collision-safe header mapping from variable labels
//! - Per-cell warnings instead of aborting on bad dates or label entries
//! - CLI with batch mode, and a web upload form
//!
//! # Example
//!
//! ```no_run
//! use sav2xlsx::config::ConvertConfig;
//! use sav2xlsx::core::convert_file;
//! use std::path::Path;
//!
//! let report = convert_file(
//!     Path::new("survey.sav"),
//!     Path::new("survey.xlsx"),
//!     &ConvertConfig::default(),
//! )?;
//!
//! println!("Rows: {}", report.rows);
//! println!("Warnings: {}", report.warnings.len());
//! # Ok::<(), sav2xlsx::error::ConvertError>(())
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod excel;
pub mod logging;
pub mod sav;
pub mod types;

// Re-export commonly used types
pub use config::ConvertConfig;
pub use core::{convert_file, ConversionReport, PipelineStage};
pub use error::{ConvertError, ConvertResult};
pub use types::{ConversionWarning, RawValue, Record, SavDataset};
