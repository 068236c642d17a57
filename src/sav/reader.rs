//! SPSS `.sav` reader producing a [`SavDataset`]

use super::bytes::{decode_f64, ByteCursor, Endian};
use super::data::{Slot, SlotReader};
use super::dictionary::{read_dictionary, Compression, Dictionary, MissingValues, Variable};
use super::encoding::{decode_trimmed, resolve_encoding};
use super::SavResult;
use crate::error::{ConvertError, ConvertResult};
use crate::types::{RawValue, Record, SavDataset};
use encoding_rs::Encoding;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File-level facts that are not part of the conversion contract
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SavMetadata {
    pub product: String,
    pub file_label: String,
    pub encoding: String,
    pub compressed: bool,
    pub big_endian: bool,
}

/// A decoded system file
#[derive(Debug, Clone)]
pub struct SavFile {
    pub metadata: SavMetadata,
    pub dataset: SavDataset,
}

/// Reads SPSS system files from disk
pub struct SavReader {
    path: PathBuf,
}

impl SavReader {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file into records, label dictionaries and date columns
    pub fn read(&self) -> ConvertResult<SavDataset> {
        self.read_file().map(|file| file.dataset)
    }

    /// Like [`read`](Self::read), also returning file-level metadata
    pub fn read_file(&self) -> ConvertResult<SavFile> {
        let bytes =
            std::fs::read(&self.path).map_err(|e| ConvertError::source_read(&self.path, e))?;
        parse_sav(&bytes).map_err(|e| ConvertError::source_read(&self.path, e))
    }
}

/// Decode a complete system file held in memory
pub fn parse_sav(bytes: &[u8]) -> SavResult<SavFile> {
    let mut cursor = ByteCursor::new(bytes, Endian::Little);
    let dictionary = read_dictionary(&mut cursor)?;

    let encoding_name = dictionary
        .encoding_name
        .as_deref()
        .map(|raw| String::from_utf8_lossy(raw).into_owned());
    let encoding = resolve_encoding(encoding_name.as_deref(), dictionary.codepage);
    debug!(
        encoding = encoding.name(),
        variables = dictionary.variables.len(),
        slots = dictionary.slot_count,
        "dictionary read"
    );

    let columns = column_names(&dictionary, encoding);
    let mut dataset = SavDataset {
        columns: columns.clone(),
        ..Default::default()
    };

    for (variable, column) in dictionary.variables.iter().zip(&columns) {
        if let Some(label) = &variable.label {
            dataset
                .variable_labels
                .insert(column.clone(), decode_trimmed(encoding, label));
        }
        if variable.is_date() {
            dataset.date_columns.insert(column.clone());
        }
    }

    collect_value_labels(&dictionary, &columns, encoding, &mut dataset);
    dataset.records = read_records(&dictionary, &columns, encoding, cursor)?;

    let header = &dictionary.header;
    Ok(SavFile {
        metadata: SavMetadata {
            product: decode_trimmed(encoding, &header.product),
            file_label: decode_trimmed(encoding, &header.file_label),
            encoding: encoding.name().to_string(),
            compressed: header.compression != Compression::None,
            big_endian: header.endian == Endian::Big,
        },
        dataset,
    })
}

/// Column keys: long names (extension 13) where given, short names otherwise
fn column_names(dictionary: &Dictionary, encoding: &'static Encoding) -> Vec<String> {
    let long_names: HashMap<String, String> = dictionary
        .long_names
        .as_deref()
        .map(|raw| {
            decode_trimmed(encoding, raw)
                .split('\t')
                .filter_map(|pair| pair.split_once('='))
                .map(|(short, long)| (short.trim().to_string(), long.trim().to_string()))
                .collect()
        })
        .unwrap_or_default();

    dictionary
        .variables
        .iter()
        .map(|v| {
            let short = decode_trimmed(encoding, &v.short_name);
            long_names.get(&short).cloned().unwrap_or(short)
        })
        .collect()
}

fn collect_value_labels(
    dictionary: &Dictionary,
    columns: &[String],
    encoding: &'static Encoding,
    dataset: &mut SavDataset,
) {
    let endian = dictionary.header.endian;

    for set in &dictionary.label_sets {
        for &slot in &set.slots {
            let Some(index) = dictionary.variable_at_slot(slot) else {
                warn!(slot, "value labels refer to an unknown variable, skipped");
                continue;
            };
            let variable = &dictionary.variables[index];
            let entries = dataset
                .value_labels
                .entry(columns[index].clone())
                .or_default();

            for (code, label) in &set.entries {
                let key = if variable.is_numeric() {
                    RawValue::Number(decode_f64(*code, endian))
                } else {
                    RawValue::Text(decode_trimmed(encoding, code))
                };
                entries.push((key, decode_trimmed(encoding, label)));
            }
        }
    }

    for set in &dictionary.long_string_labels {
        let name = decode_trimmed(encoding, &set.variable);
        let index = columns.iter().position(|c| *c == name).or_else(|| {
            dictionary
                .variables
                .iter()
                .position(|v| decode_trimmed(encoding, &v.short_name) == name)
        });
        let Some(index) = index.filter(|&i| !dictionary.variables[i].is_numeric()) else {
            warn!(variable = %name, "long string value labels refer to an unknown variable, skipped");
            continue;
        };

        let entries = dataset
            .value_labels
            .entry(columns[index].clone())
            .or_default();
        for (value, label) in &set.entries {
            entries.push((
                RawValue::Text(decode_trimmed(encoding, value)),
                decode_trimmed(encoding, label),
            ));
        }
    }
}

fn read_records(
    dictionary: &Dictionary,
    columns: &[String],
    encoding: &'static Encoding,
    cursor: ByteCursor<'_>,
) -> SavResult<Vec<Record>> {
    let header = &dictionary.header;
    let mut slots = SlotReader::new(cursor, header.compression, header.bias);
    let mut records = Vec::with_capacity(header.case_count.unwrap_or(0).min(1 << 20));

    while header.case_count.map_or(true, |n| records.len() < n) {
        let Some(case) = slots.next_case(dictionary.slot_count)? else {
            break;
        };

        let mut record = Record::with_capacity(dictionary.variables.len());
        for (variable, column) in dictionary.variables.iter().zip(columns) {
            let cells = &case[variable.first_slot..variable.first_slot + variable.slots];
            let value = decode_cell(variable, cells, dictionary.sysmis, header.endian, encoding);
            record.push(column.clone(), value);
        }
        records.push(record);
    }

    if let Some(expected) = header.case_count {
        if records.len() < expected {
            warn!(expected, found = records.len(), "file ends before its declared case count");
        }
    }

    Ok(records)
}

fn decode_cell(
    variable: &Variable,
    cells: &[Slot],
    sysmis: f64,
    endian: Endian,
    encoding: &'static Encoding,
) -> RawValue {
    if variable.is_numeric() {
        let value = match cells[0] {
            Slot::SysMis | Slot::Spaces => return RawValue::Missing,
            Slot::Number(n) => n,
            Slot::Raw(bytes) => decode_f64(bytes, endian),
        };
        if value == sysmis || value.is_nan() || is_user_missing_number(&variable.missing, value) {
            return RawValue::Missing;
        }
        return RawValue::Number(value);
    }

    let bytes = string_bytes(variable, cells, sysmis, endian);

    if let MissingValues::Text(codes) = &variable.missing {
        let trimmed = trim_padding(&bytes);
        if codes.iter().any(|code| trim_padding(code) == trimmed) {
            return RawValue::Missing;
        }
    }

    RawValue::Text(decode_trimmed(encoding, &bytes))
}

/// Data bytes of a string cell, joining the segments of a very long string
fn string_bytes(variable: &Variable, cells: &[Slot], sysmis: f64, endian: Endian) -> Vec<u8> {
    let raw = |cells: &[Slot]| -> Vec<u8> {
        cells
            .iter()
            .flat_map(|slot| slot.to_bytes(endian, sysmis))
            .collect()
    };

    if variable.segments.is_empty() {
        let mut bytes = raw(cells);
        bytes.truncate(variable.width);
        return bytes;
    }

    let mut bytes = Vec::with_capacity(variable.width);
    let mut start = 0;
    for segment in &variable.segments {
        let end = (start + segment.slots).min(cells.len());
        let mut piece = raw(&cells[start..end]);
        piece.truncate(segment.used);
        bytes.append(&mut piece);
        start = end;
    }
    bytes
}

fn is_user_missing_number(missing: &MissingValues, value: f64) -> bool {
    match missing {
        MissingValues::Numeric { values, range } => {
            values.contains(&value)
                || range.is_some_and(|(low, high)| value >= low && value <= high)
        }
        _ => false,
    }
}

fn trim_padding(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|&b| b != b' ' && b != 0)
        .map_or(0, |i| i + 1);
    &bytes[..end]
}
