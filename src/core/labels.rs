//! Value label resolution
//!
//! Replaces coded values with their display strings. Codes are canonicalized
//! through [`ValueKey`] so that `1` and `1.0` hit the same label.

use crate::error::ConvertError;
use crate::types::{
    ConversionWarning, RawValue, Record, ValueKey, ValueLabelMap, WarningKind,
};
use std::collections::HashMap;
use tracing::warn;

/// Compiled value-label dictionaries, one per labeled column
#[derive(Debug, Clone, Default)]
pub struct LabelResolver {
    dictionaries: HashMap<String, HashMap<ValueKey, String>>,
}

impl LabelResolver {
    /// Compile the reader's raw dictionaries.
    ///
    /// Entries whose code can never match a cell (missing, dates, NaN or
    /// infinite numbers) are skipped; each skip yields one warning.
    pub fn new(value_labels: &ValueLabelMap) -> (Self, Vec<ConversionWarning>) {
        let mut dictionaries = HashMap::with_capacity(value_labels.len());
        let mut warnings = Vec::new();

        // Sorted so warnings come out in a stable order
        let mut columns: Vec<&String> = value_labels.keys().collect();
        columns.sort();

        for column in columns {
            let entries = &value_labels[column];
            let mut dictionary = HashMap::with_capacity(entries.len());

            for (code, label) in entries {
                match ValueKey::from_raw(code) {
                    // Last entry wins on duplicate codes
                    Some(key) => {
                        dictionary.insert(key, label.clone());
                    }
                    None => {
                        let error = ConvertError::LabelLookup {
                            column: column.clone(),
                            reason: format!(
                                "code {} for label {:?} is not a scalar code",
                                code, label
                            ),
                        };
                        warn!("{}", error);
                        warnings.push(ConversionWarning {
                            row: None,
                            column: column.clone(),
                            kind: WarningKind::LabelLookup,
                            message: error.to_string(),
                        });
                    }
                }
            }

            dictionaries.insert(column.clone(), dictionary);
        }

        (Self { dictionaries }, warnings)
    }

    /// Label for a single cell, if its column has one for this value
    pub fn lookup(&self, column: &str, value: &RawValue) -> Option<&str> {
        let dictionary = self.dictionaries.get(column)?;
        let key = ValueKey::from_raw(value)?;
        dictionary.get(&key).map(String::as_str)
    }

    /// Produce a copy of `record` with labeled codes replaced.
    ///
    /// Unlabeled columns, unknown codes and missing values are kept as is.
    pub fn resolve(&self, record: Record) -> Record {
        let fields = record
            .fields
            .into_iter()
            .map(|(key, value)| {
                let resolved = match self.lookup(&key, &value) {
                    Some(label) => RawValue::Text(label.to_string()),
                    None => value,
                };
                (key, resolved)
            })
            .collect();
        Record { fields }
    }

    pub fn is_empty(&self) -> bool {
        self.dictionaries.is_empty()
    }
}
