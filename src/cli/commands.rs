use crate::config::{BatchConfig, ConvertConfig};
use crate::core::{convert_file, ConversionReport};
use crate::error::{ConvertError, ConvertResult};
use colored::Colorize;
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const SAV_EXTENSION: &str = "sav";
const XLSX_EXTENSION: &str = "xlsx";

/// Outcome of a batch run
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub successful: Vec<ConversionReport>,
    pub failed: Vec<(PathBuf, ConvertError)>,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.successful.len() + self.failed.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Execute the single-file conversion
pub fn convert(
    input: PathBuf,
    output: PathBuf,
    config: &ConvertConfig,
) -> ConvertResult<ConversionReport> {
    println!("{}", "📊 sav2xlsx - Converting SPSS file".bold().green());
    println!("   Input:  {}", input.display());

    let output = output_path_for(&input, &output);
    println!("   Output: {}\n", output.display());

    ensure_parent_dir(&output)?;
    let report = convert_file(&input, &output, config)?;

    print_warnings(&report);
    println!(
        "{}",
        format!(
            "✅ Successfully converted '{}' to '{}' ({} rows, {} columns)",
            input.display(),
            output.display(),
            report.rows,
            report.columns
        )
        .bold()
        .green()
    );

    Ok(report)
}

/// Execute the batch conversion
pub fn batch(paths: Vec<PathBuf>, config: &BatchConfig) -> ConvertResult<BatchSummary> {
    let files = collect_sav_files(&paths)?;
    if files.is_empty() {
        return Err(ConvertError::InvalidInput("No .sav files found!".to_string()));
    }

    fs::create_dir_all(&config.output_dir)
        .map_err(|e| ConvertError::output_write(&config.output_dir, e))?;

    println!(
        "{}",
        format!("📊 Starting batch conversion of {} files...", files.len())
            .bold()
            .green()
    );
    println!("   Output directory: {}\n", config.output_dir.display());

    let mut summary = BatchSummary::default();
    let mut outputs = HashSet::new();
    let total = files.len();

    for (i, input) in files.into_iter().enumerate() {
        println!(
            "   Processing file {}/{}: {}",
            i + 1,
            total,
            display_name(&input).cyan()
        );

        let output = batch_output_path(&input, &config.output_dir);
        if !outputs.insert(output.clone()) {
            warn!(
                input = %input.display(),
                output = %output.display(),
                "output name already used in this batch, overwriting"
            );
        }

        match convert_file(&input, &output, &config.convert) {
            Ok(report) => {
                print_warnings(&report);
                println!(
                    "   {} Successfully converted: {}",
                    "✓".green(),
                    display_name(&output)
                );
                summary.successful.push(report);
            }
            Err(e) => {
                println!("   {} Failed to convert {}: {}", "✗".red(), input.display(), e);
                summary.failed.push((input, e));
            }
        }
    }

    print_summary(&summary);
    Ok(summary)
}

/// Expand files and directories into a sorted, de-duplicated list.
///
/// Directories are walked recursively and contribute files whose extension is
/// `.sav` in any case. Explicit file arguments are taken as given.
pub fn collect_sav_files(paths: &[PathBuf]) -> ConvertResult<Vec<PathBuf>> {
    let mut files = BTreeSet::new();
    for path in paths {
        if path.is_dir() {
            walk_dir(path, &mut files)?;
        } else {
            files.insert(path.clone());
        }
    }
    debug!(count = files.len(), "collected input files");
    Ok(files.into_iter().collect())
}

fn walk_dir(dir: &Path, files: &mut BTreeSet<PathBuf>) -> ConvertResult<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            walk_dir(&path, files)?;
        } else if is_sav_file(&path) {
            files.insert(path);
        }
    }
    Ok(())
}

pub fn is_sav_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(SAV_EXTENSION))
}

/// Where a single conversion writes: inside `output` if it is an existing
/// directory, otherwise `output` itself
pub fn output_path_for(input: &Path, output: &Path) -> PathBuf {
    if output.is_dir() {
        batch_output_path(input, output)
    } else {
        output.to_path_buf()
    }
}

/// `<dir>/<input stem>.xlsx`
pub fn batch_output_path(input: &Path, dir: &Path) -> PathBuf {
    let mut name = input
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| "output".into());
    name.push(".");
    name.push(XLSX_EXTENSION);
    dir.join(name)
}

fn ensure_parent_dir(path: &Path) -> ConvertResult<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|e| ConvertError::output_write(path, e))
        }
        _ => Ok(()),
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn print_warnings(report: &ConversionReport) {
    if report.warnings.is_empty() {
        return;
    }
    println!(
        "{}",
        format!("⚠️  {} warning(s):", report.warnings.len()).yellow()
    );
    for warning in &report.warnings {
        println!("      {}", warning.to_string().yellow());
    }
}

fn print_summary(summary: &BatchSummary) {
    println!("\n{}", "=== Batch Conversion Summary ===".bold());
    println!("   Total files: {}", summary.total());
    println!(
        "   Successful:  {}",
        summary.successful.len().to_string().green()
    );
    println!("   Failed:      {}", summary.failed.len().to_string().red());

    if !summary.failed.is_empty() {
        println!("\n   Failed files:");
        for (input, error) in &summary.failed {
            println!("     - {}: {}", display_name(input), error);
        }
    }
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
