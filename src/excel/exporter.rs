//! Excel exporter implementation

use crate::error::{ConvertError, ConvertResult};
use crate::types::{RawValue, ResolvedRow};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::path::Path;

/// Writes one header row plus data rows to a single-sheet workbook
pub struct ExcelExporter {
    sheet_name: String,
}

impl ExcelExporter {
    /// Create a new Excel exporter
    pub fn new(sheet_name: impl Into<String>) -> Self {
        Self {
            sheet_name: sheet_name.into(),
        }
    }

    /// Write `headers` and `rows` to an `.xlsx` file at `output_path`
    pub fn write(
        &self,
        output_path: &Path,
        headers: &[String],
        rows: &[ResolvedRow],
    ) -> ConvertResult<()> {
        let fail = |reason: String| ConvertError::output_write(output_path, reason);

        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet
            .set_name(&self.sheet_name)
            .map_err(|e| fail(format!("Failed to set worksheet name: {}", e)))?;

        // Header row (row 0)
        let bold = Format::new().set_bold();
        for (col_idx, header) in headers.iter().enumerate() {
            let col = column_index(col_idx).map_err(&fail)?;
            worksheet
                .write_string_with_format(0, col, header, &bold)
                .map_err(|e| fail(format!("Failed to write header: {}", e)))?;
        }

        // Data rows (starting at row 1)
        for (row_idx, row) in rows.iter().enumerate() {
            let excel_row = u32::try_from(row_idx + 1)
                .map_err(|_| fail(format!("Too many rows: {}", rows.len())))?;

            for (col_idx, value) in row.values.iter().enumerate() {
                let col = column_index(col_idx).map_err(&fail)?;
                Self::write_cell_value(worksheet, excel_row, col, value).map_err(&fail)?;
            }
        }

        // Save workbook to file
        workbook
            .save(output_path)
            .map_err(|e| fail(format!("Failed to save Excel file: {}", e)))?;

        Ok(())
    }

    /// Write a single cell based on its value type. Missing cells stay blank.
    fn write_cell_value(
        worksheet: &mut Worksheet,
        row: u32,
        col: u16,
        value: &RawValue,
    ) -> Result<(), String> {
        match value {
            RawValue::Number(n) if n.is_finite() => {
                worksheet
                    .write_number(row, col, *n)
                    .map_err(|e| format!("Failed to write number: {}", e))?;
            }
            // Excel has no NaN/infinity
            RawValue::Number(_) | RawValue::Missing => {}
            RawValue::Text(text) => {
                worksheet
                    .write_string(row, col, text)
                    .map_err(|e| format!("Failed to write text: {}", e))?;
            }
            RawValue::Date(dt) => {
                worksheet
                    .write_string(row, col, dt.format("%Y-%m-%d %H:%M:%S").to_string())
                    .map_err(|e| format!("Failed to write date: {}", e))?;
            }
        }
        Ok(())
    }
}

fn column_index(idx: usize) -> Result<u16, String> {
    u16::try_from(idx).map_err(|_| format!("Too many columns: {}", idx + 1))
}
