//! Conversion pipeline: Reader -> Resolver -> Normalizer -> Mapper -> Writer
//!
//! Runs one conversion as a linear state machine:
//!
//! ```text
//! Idle -> Reading -> Resolving -> Normalizing -> HeaderMapping -> Writing -> Done
//!                          (any non-terminal stage) -> Failed
//! ```
//!
//! Only unreadable input and unwritable output move the run to `Failed`.
//! Per-cell and per-entry problems are collected as warnings.

use crate::config::ConvertConfig;
use crate::core::dates::DateNormalizer;
use crate::core::headers::map_headers;
use crate::core::labels::LabelResolver;
use crate::error::{ConvertError, ConvertResult};
use crate::excel::ExcelExporter;
use crate::sav::SavReader;
use crate::types::{ConversionWarning, Record, ResolvedRow, ResolvedTable, SavDataset};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Idle,
    Reading,
    Resolving,
    Normalizing,
    HeaderMapping,
    Writing,
    Done,
    Failed,
}

impl PipelineStage {
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineStage::Done | PipelineStage::Failed)
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Idle => "idle",
            PipelineStage::Reading => "reading",
            PipelineStage::Resolving => "resolving",
            PipelineStage::Normalizing => "normalizing",
            PipelineStage::HeaderMapping => "header mapping",
            PipelineStage::Writing => "writing",
            PipelineStage::Done => "done",
            PipelineStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Output of the in-memory part of the pipeline
#[derive(Debug, Clone, Default)]
pub struct Transformed {
    pub table: ResolvedTable,
    pub warnings: Vec<ConversionWarning>,
}

/// Summary of a completed run
#[derive(Debug, Clone, Serialize)]
pub struct ConversionReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub rows: usize,
    pub columns: usize,
    pub warnings: Vec<ConversionWarning>,
    pub stage: PipelineStage,
}

/// One conversion run
pub struct Pipeline {
    config: ConvertConfig,
    stage: PipelineStage,
}

impl Pipeline {
    pub fn new(config: ConvertConfig) -> Self {
        Self {
            config,
            stage: PipelineStage::Idle,
        }
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    pub fn config(&self) -> &ConvertConfig {
        &self.config
    }

    fn advance(&mut self, next: PipelineStage) {
        debug!(from = %self.stage, to = %next, "pipeline stage");
        self.stage = next;
    }

    fn fail(&mut self, error: ConvertError) -> ConvertError {
        debug!(stage = %self.stage, "pipeline failed: {}", error);
        self.stage = PipelineStage::Failed;
        error
    }

    /// Read `input`, convert it and write the workbook to `output`
    pub fn run(&mut self, input: &Path, output: &Path) -> ConvertResult<ConversionReport> {
        self.advance(PipelineStage::Reading);
        let dataset = SavReader::new(input).read().map_err(|e| self.fail(e))?;
        info!(
            rows = dataset.records.len(),
            columns = dataset.columns.len(),
            "read {}",
            input.display()
        );

        let transformed = self.transform(dataset);

        self.advance(PipelineStage::Writing);
        let exporter = ExcelExporter::new(self.config.sheet_name.clone());
        exporter
            .write(output, &transformed.table.headers, &transformed.table.rows)
            .map_err(|e| self.fail(e))?;

        self.advance(PipelineStage::Done);
        info!(
            rows = transformed.table.row_count(),
            warnings = transformed.warnings.len(),
            "wrote {}",
            output.display()
        );

        Ok(ConversionReport {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            rows: transformed.table.row_count(),
            columns: transformed.table.column_count(),
            warnings: transformed.warnings,
            stage: self.stage,
        })
    }

    /// Resolve labels, normalize dates and map headers for an in-memory dataset
    pub fn transform(&mut self, dataset: SavDataset) -> Transformed {
        let SavDataset {
            columns,
            records,
            variable_labels,
            value_labels,
            mut date_columns,
        } = dataset;
        let schema = match records.first() {
            Some(first) => first.keys().map(str::to_string).collect(),
            None => columns,
        };
        let mut warnings = Vec::new();

        self.advance(PipelineStage::Resolving);
        let records: Vec<Record> = if self.config.apply_value_labels {
            let (resolver, label_warnings) = LabelResolver::new(&value_labels);
            warnings.extend(label_warnings);
            records.into_iter().map(|r| resolver.resolve(r)).collect()
        } else {
            records
        };

        self.advance(PipelineStage::Normalizing);
        date_columns.extend(self.config.extra_date_columns.iter().cloned());
        let normalizer = DateNormalizer::new(date_columns);
        let records: Vec<Record> = records
            .into_iter()
            .enumerate()
            .map(|(row, record)| normalizer.normalize(row, record, &mut warnings))
            .collect();

        self.advance(PipelineStage::HeaderMapping);
        let headers = map_headers(&schema, &variable_labels);
        let rows = records
            .into_iter()
            .map(|record| ResolvedRow {
                values: record.fields.into_iter().map(|(_, value)| value).collect(),
            })
            .collect();

        Transformed {
            table: ResolvedTable { headers, rows },
            warnings,
        }
    }
}

/// Run the in-memory stages with a fresh pipeline
pub fn transform(dataset: SavDataset, config: &ConvertConfig) -> Transformed {
    Pipeline::new(config.clone()).transform(dataset)
}

/// Convert one `.sav` file into one `.xlsx` workbook
pub fn convert_file(
    input: &Path,
    output: &Path,
    config: &ConvertConfig,
) -> ConvertResult<ConversionReport> {
    Pipeline::new(config.clone()).run(input, output)
}
