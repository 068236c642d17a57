//! CLI command handlers

pub mod commands;

pub use commands::{batch, collect_sav_files, convert, output_path_for, BatchSummary};
