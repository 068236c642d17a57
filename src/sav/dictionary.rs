//! File header and dictionary records of an SPSS system file.
//!
//! Everything here is kept as raw bytes; text is decoded once the whole
//! dictionary has been read, because the encoding record comes last.

use super::bytes::{decode_f64, ByteCursor, Endian};
use super::{SavError, SavResult};
use tracing::debug;

const HEADER_MAGIC: &[u8; 4] = b"$FL2";
const ZLIB_MAGIC: &[u8; 4] = b"$FL3";

const REC_VARIABLE: i32 = 2;
const REC_VALUE_LABELS: i32 = 3;
const REC_VALUE_LABEL_VARS: i32 = 4;
const REC_DOCUMENT: i32 = 6;
const REC_EXTENSION: i32 = 7;
const REC_DICT_END: i32 = 999;

const EXT_INTEGER_INFO: i32 = 3;
const EXT_FLOAT_INFO: i32 = 4;
const EXT_LONG_NAMES: i32 = 13;
const EXT_VERY_LONG_STRINGS: i32 = 14;
const EXT_ENCODING: i32 = 20;
const EXT_LONG_STRING_LABELS: i32 = 21;

/// Data bytes carried by each segment of a very long string but the last
const SEGMENT_BYTES: usize = 252;
/// Widest string a single variable record can describe
const MAX_SHORT_STRING: usize = 255;

/// Format type codes that hold calendar dates (seconds since 1582-10-14).
///
/// DATE, DATETIME, ADATE, JDATE, QYR, MOYR, WKYR, EDATE, SDATE, YMDHMS.
/// Pure time and duration formats (TIME, DTIME, MTIME) are not dates.
const DATE_FORMAT_TYPES: [u8; 10] = [20, 22, 23, 24, 28, 29, 30, 38, 39, 41];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Bytecode,
}

#[derive(Debug, Clone)]
pub struct FileHeader {
    pub endian: Endian,
    pub product: Vec<u8>,
    pub compression: Compression,
    /// `None` when the writer did not know the case count (-1)
    pub case_count: Option<usize>,
    pub bias: f64,
    pub file_label: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MissingValues {
    None,
    /// Up to three discrete codes, plus an optional inclusive range
    Numeric {
        values: Vec<f64>,
        range: Option<(f64, f64)>,
    },
    /// Up to three discrete 8-byte strings
    Text(Vec<[u8; 8]>),
}

#[derive(Debug, Clone)]
pub struct Variable {
    pub short_name: Vec<u8>,
    /// 0 for numeric, otherwise the string width in bytes
    pub width: usize,
    pub print_format: i32,
    pub label: Option<Vec<u8>>,
    pub missing: MissingValues,
    /// Index of the variable's first 8-byte slot within a case
    pub first_slot: usize,
    /// Number of 8-byte slots the variable occupies in a case
    pub slots: usize,
    /// Pieces of a very long string (extension 14); empty otherwise
    pub segments: Vec<Segment>,
}

/// One segment variable folded into a very long string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub slots: usize,
    /// Leading bytes of the segment that hold data
    pub used: usize,
}

impl Variable {
    pub fn is_numeric(&self) -> bool {
        self.width == 0
    }

    pub fn format_type(&self) -> u8 {
        ((self.print_format >> 16) & 0xff) as u8
    }

    pub fn is_date(&self) -> bool {
        self.is_numeric() && DATE_FORMAT_TYPES.contains(&self.format_type())
    }
}

/// One value label record (type 3) together with its variable list (type 4)
#[derive(Debug, Clone)]
pub struct LabelSet {
    pub entries: Vec<([u8; 8], Vec<u8>)>,
    /// 1-based slot indexes, as stored in the file
    pub slots: Vec<usize>,
}

/// Value labels of a string variable wider than 8 bytes (extension 21)
#[derive(Debug, Clone)]
pub struct LongStringLabels {
    pub variable: Vec<u8>,
    pub entries: Vec<(Vec<u8>, Vec<u8>)>,
}

#[derive(Debug, Clone)]
pub struct Dictionary {
    pub header: FileHeader,
    pub variables: Vec<Variable>,
    pub label_sets: Vec<LabelSet>,
    pub long_string_labels: Vec<LongStringLabels>,
    /// Total 8-byte slots per case
    pub slot_count: usize,
    pub sysmis: f64,
    pub codepage: Option<i32>,
    pub encoding_name: Option<Vec<u8>>,
    pub long_names: Option<Vec<u8>>,
}

impl Dictionary {
    /// Index into `variables` of the variable starting at a 1-based slot
    pub fn variable_at_slot(&self, slot: usize) -> Option<usize> {
        let zero_based = slot.checked_sub(1)?;
        self.variables
            .binary_search_by_key(&zero_based, |v| v.first_slot)
            .ok()
    }
}

fn read_header(cursor: &mut ByteCursor<'_>) -> SavResult<FileHeader> {
    let magic = cursor.read_array::<4>().map_err(|_| SavError::NotSavFile)?;
    if &magic == ZLIB_MAGIC {
        return Err(SavError::UnsupportedCompression(
            "zlib-compressed (.zsav) files".to_string(),
        ));
    }
    if &magic != HEADER_MAGIC {
        return Err(SavError::NotSavFile);
    }

    let product = cursor.take(60)?.to_vec();

    // Layout code is 2 or 3; whichever byte order reads it that way is the file's
    let layout = cursor.read_array::<4>()?;
    let endian = if matches!(i32::from_le_bytes(layout), 2 | 3) {
        Endian::Little
    } else if matches!(i32::from_be_bytes(layout), 2 | 3) {
        Endian::Big
    } else {
        return Err(SavError::NotSavFile);
    };
    cursor.set_endian(endian);

    let _nominal_case_size = cursor.read_i32()?;
    let compression = match cursor.read_i32()? {
        0 => Compression::None,
        1 => Compression::Bytecode,
        other => {
            return Err(SavError::UnsupportedCompression(format!(
                "compression code {}",
                other
            )))
        }
    };
    let _weight_index = cursor.read_i32()?;
    let case_count = usize::try_from(cursor.read_i32()?).ok();
    let bias = cursor.read_f64()?;
    let _creation_date = cursor.take(9)?;
    let _creation_time = cursor.take(8)?;
    let file_label = cursor.take(64)?.to_vec();
    cursor.skip(3)?;

    Ok(FileHeader {
        endian,
        product,
        compression,
        case_count,
        bias,
        file_label,
    })
}

fn read_missing(cursor: &mut ByteCursor<'_>, code: i32, numeric: bool) -> SavResult<MissingValues> {
    let offset = cursor.position();
    let invalid = |reason: String| SavError::InvalidDictionary { offset, reason };

    match (numeric, code) {
        (_, 0) => Ok(MissingValues::None),
        (true, 1..=3) => {
            let values = (0..code)
                .map(|_| cursor.read_f64())
                .collect::<SavResult<Vec<_>>>()?;
            Ok(MissingValues::Numeric {
                values,
                range: None,
            })
        }
        (true, -2) | (true, -3) => {
            let low = cursor.read_f64()?;
            let high = cursor.read_f64()?;
            let values = if code == -3 {
                vec![cursor.read_f64()?]
            } else {
                Vec::new()
            };
            Ok(MissingValues::Numeric {
                values,
                range: Some((low, high)),
            })
        }
        (false, 1..=3) => {
            let values = (0..code)
                .map(|_| cursor.read_array::<8>())
                .collect::<SavResult<Vec<_>>>()?;
            Ok(MissingValues::Text(values))
        }
        (_, other) => Err(invalid(format!("invalid missing value code {}", other))),
    }
}

/// Parse the header and all dictionary records, leaving the cursor at the data
pub fn read_dictionary(cursor: &mut ByteCursor<'_>) -> SavResult<Dictionary> {
    let header = read_header(cursor)?;

    let mut variables: Vec<Variable> = Vec::new();
    let mut label_sets = Vec::new();
    let mut long_string_labels = Vec::new();
    let mut very_long_strings = None;
    let mut slot_count = 0usize;
    let mut sysmis = -f64::MAX;
    let mut codepage = None;
    let mut encoding_name = None;
    let mut long_names = None;

    loop {
        let offset = cursor.position();
        let record_type = cursor.read_i32()?;

        match record_type {
            REC_VARIABLE => {
                let var_type = cursor.read_i32()?;
                let has_label = cursor.read_i32()?;
                let missing_code = cursor.read_i32()?;
                let print_format = cursor.read_i32()?;
                let _write_format = cursor.read_i32()?;
                let short_name = cursor.take(8)?.to_vec();

                let label = if has_label == 1 {
                    let len = cursor.read_count("variable label length")?;
                    let text = cursor.take(len)?.to_vec();
                    cursor.skip(len.next_multiple_of(4) - len)?;
                    Some(text)
                } else {
                    None
                };

                if var_type == -1 {
                    // Continuation of the previous string variable
                    let previous = variables.last_mut().ok_or(SavError::InvalidDictionary {
                        offset,
                        reason: "continuation record without a variable".to_string(),
                    })?;
                    previous.slots += 1;
                    slot_count += 1;
                    continue;
                }

                let width = usize::try_from(var_type).map_err(|_| SavError::InvalidDictionary {
                    offset,
                    reason: format!("invalid variable type {}", var_type),
                })?;
                let missing = read_missing(cursor, missing_code, width == 0)?;

                variables.push(Variable {
                    short_name,
                    width,
                    print_format,
                    label,
                    missing,
                    first_slot: slot_count,
                    slots: 1,
                    segments: Vec::new(),
                });
                slot_count += 1;
            }

            REC_VALUE_LABELS => {
                let count = cursor.read_count("value label count")?;
                let mut entries = Vec::with_capacity(count.min(4096));
                for _ in 0..count {
                    let code = cursor.read_array::<8>()?;
                    let len = usize::from(cursor.read_u8()?);
                    let label = cursor.take(len)?.to_vec();
                    // Length byte + label are padded to a multiple of 8
                    cursor.skip((len + 1).next_multiple_of(8) - (len + 1))?;
                    entries.push((code, label));
                }

                let vars_offset = cursor.position();
                if cursor.read_i32()? != REC_VALUE_LABEL_VARS {
                    return Err(SavError::InvalidDictionary {
                        offset: vars_offset,
                        reason: "value labels not followed by a variable list".to_string(),
                    });
                }
                let var_count = cursor.read_count("value label variable count")?;
                let slots = (0..var_count)
                    .map(|_| cursor.read_count("value label variable index"))
                    .collect::<SavResult<Vec<_>>>()?;
                label_sets.push(LabelSet { entries, slots });
            }

            REC_DOCUMENT => {
                let lines = cursor.read_count("document line count")?;
                let len = lines.checked_mul(80).ok_or(SavError::InvalidDictionary {
                    offset,
                    reason: "document record too large".to_string(),
                })?;
                cursor.skip(len)?;
            }

            REC_EXTENSION => {
                let subtype = cursor.read_i32()?;
                let size = cursor.read_count("extension element size")?;
                let count = cursor.read_count("extension element count")?;
                let len = size.checked_mul(count).ok_or(SavError::InvalidDictionary {
                    offset,
                    reason: "extension record too large".to_string(),
                })?;
                let data = cursor.take(len)?;
                let mut ext = ByteCursor::new(data, header.endian);

                match subtype {
                    EXT_INTEGER_INFO if size == 4 && count >= 8 => {
                        ext.skip(7 * 4)?;
                        codepage = Some(ext.read_i32()?);
                    }
                    EXT_FLOAT_INFO if size == 8 && count >= 1 => {
                        sysmis = decode_f64(ext.read_array::<8>()?, header.endian);
                    }
                    EXT_LONG_NAMES => long_names = Some(data.to_vec()),
                    EXT_VERY_LONG_STRINGS => very_long_strings = Some(data.to_vec()),
                    EXT_ENCODING => encoding_name = Some(data.to_vec()),
                    EXT_LONG_STRING_LABELS => {
                        long_string_labels.extend(read_long_string_labels(&mut ext)?);
                    }
                    other => debug!(subtype = other, len, "skipping extension record"),
                }
            }

            REC_DICT_END => {
                let _filler = cursor.read_i32()?;
                break;
            }

            other => {
                return Err(SavError::InvalidRecord {
                    offset,
                    record_type: other,
                })
            }
        }
    }

    let offset = cursor.position();
    if variables.is_empty() || slot_count == 0 {
        return Err(SavError::InvalidDictionary {
            offset,
            reason: "dictionary declares no variables".to_string(),
        });
    }
    if let Some(raw) = &very_long_strings {
        variables = merge_very_long_strings(variables, &parse_very_long_strings(raw), offset)?;
    }

    Ok(Dictionary {
        header,
        variables,
        label_sets,
        long_string_labels,
        slot_count,
        sysmis,
        codepage,
        encoding_name,
        long_names,
    })
}

fn read_long_string_labels(ext: &mut ByteCursor<'_>) -> SavResult<Vec<LongStringLabels>> {
    let mut sets = Vec::new();
    while !ext.is_at_end() {
        let name_len = ext.read_count("long string label variable name length")?;
        let variable = ext.take(name_len)?.to_vec();
        let _width = ext.read_count("long string label width")?;
        let count = ext.read_count("long string label count")?;

        let mut entries = Vec::with_capacity(count.min(4096));
        for _ in 0..count {
            let len = ext.read_count("long string value length")?;
            let value = ext.take(len)?.to_vec();
            let len = ext.read_count("long string label length")?;
            let label = ext.take(len)?.to_vec();
            entries.push((value, label));
        }
        sets.push(LongStringLabels { variable, entries });
    }
    Ok(sets)
}

fn trim_name(bytes: &[u8]) -> &[u8] {
    let is_pad = |b: &u8| *b == 0 || b.is_ascii_whitespace();
    let start = bytes.iter().position(|b| !is_pad(b)).unwrap_or(bytes.len());
    let end = bytes.iter().rposition(|b| !is_pad(b)).map_or(start, |i| i + 1);
    &bytes[start..end]
}

/// `SHORT=WIDTH` pairs, each terminated by NUL and tab
fn parse_very_long_strings(raw: &[u8]) -> Vec<(Vec<u8>, usize)> {
    raw.split(|&b| b == b'\t')
        .filter_map(|pair| {
            let eq = pair.iter().position(|&b| b == b'=')?;
            let name = trim_name(&pair[..eq]);
            let width = std::str::from_utf8(trim_name(&pair[eq + 1..]))
                .ok()?
                .parse()
                .ok()?;
            Some((name.to_vec(), width))
        })
        .collect()
}

/// Fold the segment variables of each very long string into its first segment
fn merge_very_long_strings(
    variables: Vec<Variable>,
    widths: &[(Vec<u8>, usize)],
    offset: usize,
) -> SavResult<Vec<Variable>> {
    let mut merged = Vec::with_capacity(variables.len());
    let mut rest = variables.into_iter();

    while let Some(mut variable) = rest.next() {
        let width = widths
            .iter()
            .find(|(name, _)| name.as_slice() == trim_name(&variable.short_name))
            .map(|(_, width)| *width);

        if let Some(width) = width.filter(|&w| w > MAX_SHORT_STRING && !variable.is_numeric()) {
            let count = width.div_ceil(SEGMENT_BYTES);
            let mut segments = vec![Segment {
                slots: variable.slots,
                used: SEGMENT_BYTES,
            }];
            for index in 1..count {
                let next = rest
                    .next()
                    .filter(|v| !v.is_numeric())
                    .ok_or_else(|| SavError::InvalidDictionary {
                        offset,
                        reason: format!(
                            "very long string '{}' lacks segment {} of {}",
                            String::from_utf8_lossy(trim_name(&variable.short_name)),
                            index + 1,
                            count
                        ),
                    })?;
                variable.slots += next.slots;
                segments.push(Segment {
                    slots: next.slots,
                    used: SEGMENT_BYTES,
                });
            }
            if let Some(last) = segments.last_mut() {
                last.used = width - SEGMENT_BYTES * (count - 1);
            }
            variable.width = width;
            variable.segments = segments;
        }
        merged.push(variable);
    }
    Ok(merged)
}
