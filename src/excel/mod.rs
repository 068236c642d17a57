//! Excel (.xlsx) output

mod exporter;

pub use exporter::ExcelExporter;
