//! Test-only writer for SPSS system files.
//!
//! Produces little-endian `.sav` files byte by byte so the integration tests
//! can exercise the reader and the whole conversion without binary fixtures.

#![allow(dead_code)]

use std::path::Path;

pub const BIAS: f64 = 100.0;
pub const SYSMIS: f64 = -f64::MAX;

/// Print format type codes used by the fixtures
pub const FMT_F: u8 = 5;
pub const FMT_DATE: u8 = 20;
pub const FMT_ADATE: u8 = 23;
pub const FMT_A: u8 = 1;

/// Data bytes per segment of a very long string, all segments but the last
const SEGMENT_BYTES: usize = 252;

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Num(f64),
    Str(String),
    SysMis,
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Num(n)
    }
}

impl From<i32> for Cell {
    fn from(n: i32) -> Self {
        Cell::Num(f64::from(n))
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Str(s.to_string())
    }
}

#[derive(Debug, Clone)]
pub enum Code {
    Num(f64),
    Str(String),
}

#[derive(Debug, Clone)]
struct VarDef {
    short_name: String,
    long_name: Option<String>,
    /// 0 = numeric
    width: usize,
    format_type: u8,
    label: Option<String>,
    missing: Vec<f64>,
}

impl VarDef {
    fn is_very_long(&self) -> bool {
        self.width > 255
    }

    /// Widths of the variable records written for this variable
    fn segment_widths(&self) -> Vec<usize> {
        if !self.is_very_long() {
            return vec![self.width];
        }
        let count = self.width.div_ceil(SEGMENT_BYTES);
        (0..count)
            .map(|i| {
                if i + 1 < count {
                    255
                } else {
                    self.width - SEGMENT_BYTES * (count - 1)
                }
            })
            .collect()
    }

    fn slots(&self) -> usize {
        if self.width == 0 {
            1
        } else {
            self.segment_widths().iter().map(|w| w.div_ceil(8)).sum()
        }
    }

    fn print_format(&self, width: usize) -> i32 {
        let (width, decimals) = if self.width == 0 {
            if self.format_type == FMT_F {
                (8, 2)
            } else {
                (11, 0)
            }
        } else {
            (width as i32, 0)
        };
        (i32::from(self.format_type) << 16) | (width << 8) | decimals
    }

    fn key(&self) -> &str {
        self.long_name.as_deref().unwrap_or(&self.short_name)
    }
}

enum Slot {
    Num(f64),
    SysMis,
    Bytes([u8; 8]),
}

#[derive(Default, Clone)]
pub struct SavBuilder {
    vars: Vec<VarDef>,
    label_sets: Vec<(Vec<String>, Vec<(Code, String)>)>,
    /// Extension 21 label sets, by short name
    wide_label_sets: Vec<(String, Vec<(String, String)>)>,
    rows: Vec<Vec<Cell>>,
    compressed: bool,
    encoding: Option<String>,
    codepage: Option<i32>,
    declared_cases: Option<i32>,
}

impl SavBuilder {
    pub fn new() -> Self {
        Self {
            encoding: Some("UTF-8".to_string()),
            ..Default::default()
        }
    }

    pub fn numeric(mut self, name: &str, label: Option<&str>) -> Self {
        self.vars.push(VarDef {
            short_name: name.to_string(),
            long_name: None,
            width: 0,
            format_type: FMT_F,
            label: label.map(str::to_string),
            missing: Vec::new(),
        });
        self
    }

    pub fn date(mut self, name: &str, label: Option<&str>) -> Self {
        self.vars.push(VarDef {
            short_name: name.to_string(),
            long_name: None,
            width: 0,
            format_type: FMT_DATE,
            label: label.map(str::to_string),
            missing: Vec::new(),
        });
        self
    }

    pub fn string(mut self, name: &str, width: usize, label: Option<&str>) -> Self {
        self.vars.push(VarDef {
            short_name: name.to_string(),
            long_name: None,
            width,
            format_type: FMT_A,
            label: label.map(str::to_string),
            missing: Vec::new(),
        });
        self
    }

    /// A string wider than 255 bytes, written as segment variables plus
    /// an extension 14 record
    pub fn very_long_string(mut self, name: &str, width: usize, label: Option<&str>) -> Self {
        assert!(width > 255, "use string() for widths up to 255");
        self.vars.push(VarDef {
            short_name: name.to_string(),
            long_name: None,
            width,
            format_type: FMT_A,
            label: label.map(str::to_string),
            missing: Vec::new(),
        });
        self
    }

    /// Give the most recently added variable a long name (extension 13)
    pub fn long_name(mut self, long: &str) -> Self {
        if let Some(var) = self.vars.last_mut() {
            var.long_name = Some(long.to_string());
        }
        self
    }

    /// Discrete user-missing codes for the most recently added numeric variable
    pub fn missing(mut self, codes: &[f64]) -> Self {
        if let Some(var) = self.vars.last_mut() {
            var.missing = codes.to_vec();
        }
        self
    }

    pub fn value_labels(mut self, vars: &[&str], labels: Vec<(Code, &str)>) -> Self {
        self.label_sets.push((
            vars.iter().map(|v| v.to_string()).collect(),
            labels.into_iter().map(|(c, l)| (c, l.to_string())).collect(),
        ));
        self
    }

    /// Value labels for a string wider than 8 bytes (extension 21)
    pub fn wide_string_labels(mut self, var: &str, labels: Vec<(&str, &str)>) -> Self {
        self.wide_label_sets.push((
            var.to_string(),
            labels
                .into_iter()
                .map(|(v, l)| (v.to_string(), l.to_string()))
                .collect(),
        ));
        self
    }

    pub fn row(mut self, cells: Vec<Cell>) -> Self {
        self.rows.push(cells);
        self
    }

    pub fn compressed(mut self, compressed: bool) -> Self {
        self.compressed = compressed;
        self
    }

    /// Name the encoding in extension record 20 (`None` omits the record)
    pub fn encoding(mut self, name: Option<&str>) -> Self {
        self.encoding = name.map(str::to_string);
        self
    }

    /// Write the machine integer record with this codepage
    pub fn codepage(mut self, codepage: i32) -> Self {
        self.codepage = Some(codepage);
        self
    }

    /// Override the case count written in the header (-1 = unknown)
    pub fn declared_cases(mut self, count: i32) -> Self {
        self.declared_cases = Some(count);
        self
    }

    fn slot_count(&self) -> usize {
        self.vars.iter().map(VarDef::slots).sum()
    }

    /// 1-based slot index of a variable's first slot
    fn slot_index(&self, name: &str) -> i32 {
        let mut slot = 1;
        for var in &self.vars {
            if var.short_name == name {
                return slot;
            }
            slot += var.slots() as i32;
        }
        panic!("unknown variable {name}");
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_header(&mut out);
        for var in &self.vars {
            write_variable(&mut out, var);
        }
        self.write_value_labels(&mut out);
        self.write_extensions(&mut out);
        put_i32(&mut out, 999);
        put_i32(&mut out, 0);
        self.write_data(&mut out);
        out
    }

    pub fn write_to(&self, path: &Path) {
        std::fs::write(path, self.build()).unwrap();
    }

    fn write_header(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(b"$FL2");
        put_padded(out, "@(#) SPSS DATA FILE sav2xlsx fixture", 60);
        put_i32(out, 2);
        put_i32(out, self.slot_count() as i32);
        put_i32(out, i32::from(self.compressed));
        put_i32(out, 0);
        put_i32(out, self.declared_cases.unwrap_or(self.rows.len() as i32));
        put_f64(out, BIAS);
        put_padded(out, "01 Jan 24", 9);
        put_padded(out, "12:00:00", 8);
        put_padded(out, "fixture", 64);
        out.extend_from_slice(&[0; 3]);
    }

    fn write_value_labels(&self, out: &mut Vec<u8>) {
        for (vars, labels) in &self.label_sets {
            put_i32(out, 3);
            put_i32(out, labels.len() as i32);
            for (code, label) in labels {
                match code {
                    Code::Num(n) => put_f64(out, *n),
                    Code::Str(s) => put_padded(out, s, 8),
                }
                let bytes = label.as_bytes();
                out.push(bytes.len() as u8);
                out.extend_from_slice(bytes);
                let used = bytes.len() + 1;
                out.resize(out.len() + (used.next_multiple_of(8) - used), b' ');
            }

            put_i32(out, 4);
            put_i32(out, vars.len() as i32);
            for var in vars {
                put_i32(out, self.slot_index(var));
            }
        }
    }

    fn write_extensions(&self, out: &mut Vec<u8>) {
        if let Some(codepage) = self.codepage {
            put_i32(out, 7);
            put_i32(out, 3);
            put_i32(out, 4);
            put_i32(out, 8);
            for value in [24, 0, 0, -1, 1, i32::from(self.compressed), 2, codepage] {
                put_i32(out, value);
            }
        }

        put_i32(out, 7);
        put_i32(out, 4);
        put_i32(out, 8);
        put_i32(out, 3);
        put_f64(out, SYSMIS);
        put_f64(out, f64::MAX);
        put_f64(out, f64::MIN_POSITIVE);

        let long_names: Vec<String> = self
            .vars
            .iter()
            .filter_map(|v| {
                v.long_name
                    .as_ref()
                    .map(|long| format!("{}={}", v.short_name, long))
            })
            .collect();
        if !long_names.is_empty() {
            let text = long_names.join("\t");
            put_i32(out, 7);
            put_i32(out, 13);
            put_i32(out, 1);
            put_i32(out, text.len() as i32);
            out.extend_from_slice(text.as_bytes());
        }

        let very_long: String = self
            .vars
            .iter()
            .filter(|v| v.is_very_long())
            .map(|v| format!("{}={:05}\0\t", v.short_name, v.width))
            .collect();
        if !very_long.is_empty() {
            put_i32(out, 7);
            put_i32(out, 14);
            put_i32(out, 1);
            put_i32(out, very_long.len() as i32);
            out.extend_from_slice(very_long.as_bytes());
        }

        if let Some(name) = &self.encoding {
            put_i32(out, 7);
            put_i32(out, 20);
            put_i32(out, 1);
            put_i32(out, name.len() as i32);
            out.extend_from_slice(name.as_bytes());
        }

        if !self.wide_label_sets.is_empty() {
            let mut data = Vec::new();
            for (name, labels) in &self.wide_label_sets {
                let var = self
                    .vars
                    .iter()
                    .find(|v| v.short_name == *name)
                    .unwrap_or_else(|| panic!("unknown variable {name}"));
                put_i32(&mut data, var.key().len() as i32);
                data.extend_from_slice(var.key().as_bytes());
                put_i32(&mut data, var.width as i32);
                put_i32(&mut data, labels.len() as i32);
                for (value, label) in labels {
                    put_i32(&mut data, var.width as i32);
                    put_padded(&mut data, value, var.width);
                    put_i32(&mut data, label.len() as i32);
                    data.extend_from_slice(label.as_bytes());
                }
            }
            put_i32(out, 7);
            put_i32(out, 21);
            put_i32(out, 1);
            put_i32(out, data.len() as i32);
            out.extend_from_slice(&data);
        }
    }

    fn case_slots(&self, row: &[Cell]) -> Vec<Slot> {
        let mut slots = Vec::new();
        for (var, cell) in self.vars.iter().zip(row) {
            if var.width == 0 {
                slots.push(match cell {
                    Cell::Num(n) => Slot::Num(*n),
                    Cell::SysMis => Slot::SysMis,
                    Cell::Str(s) => panic!("string {s:?} in numeric column"),
                });
            } else {
                let text = match cell {
                    Cell::Str(s) => s.clone(),
                    other => panic!("{other:?} in string column"),
                };
                let mut bytes = text.into_bytes();
                bytes.truncate(var.width);
                let widths = var.segment_widths();
                let mut rest = bytes.as_slice();
                for (index, width) in widths.iter().enumerate() {
                    let used = if index + 1 < widths.len() {
                        SEGMENT_BYTES
                    } else {
                        *width
                    };
                    let (piece, tail) = rest.split_at(used.min(rest.len()));
                    rest = tail;
                    let mut segment = piece.to_vec();
                    segment.resize(width.div_ceil(8) * 8, b' ');
                    for chunk in segment.chunks(8) {
                        let mut slot = [0u8; 8];
                        slot.copy_from_slice(chunk);
                        slots.push(Slot::Bytes(slot));
                    }
                }
            }
        }
        slots
    }

    fn write_data(&self, out: &mut Vec<u8>) {
        let slots: Vec<Slot> = self.rows.iter().flat_map(|r| self.case_slots(r)).collect();

        if !self.compressed {
            for slot in slots {
                match slot {
                    Slot::Num(n) => put_f64(out, n),
                    Slot::SysMis => put_f64(out, SYSMIS),
                    Slot::Bytes(b) => out.extend_from_slice(&b),
                }
            }
            return;
        }

        let mut opcodes = Vec::new();
        let mut literals: Vec<Option<[u8; 8]>> = Vec::new();
        for slot in slots {
            let (opcode, literal) = match slot {
                Slot::SysMis => (255u8, None),
                Slot::Num(n) if n.fract() == 0.0 && (1.0..=251.0).contains(&(n + BIAS)) => {
                    ((n + BIAS) as u8, None)
                }
                Slot::Num(n) => (253, Some(n.to_le_bytes())),
                Slot::Bytes(b) if b == [b' '; 8] => (254, None),
                Slot::Bytes(b) => (253, Some(b)),
            };
            opcodes.push(opcode);
            literals.push(literal);
        }
        opcodes.push(252);
        literals.push(None);
        while opcodes.len() % 8 != 0 {
            opcodes.push(0);
            literals.push(None);
        }

        for (block, block_literals) in opcodes.chunks(8).zip(literals.chunks(8)) {
            out.extend_from_slice(block);
            for literal in block_literals.iter().flatten() {
                out.extend_from_slice(literal);
            }
        }
    }
}

fn write_variable(out: &mut Vec<u8>, var: &VarDef) {
    for (index, width) in var.segment_widths().into_iter().enumerate() {
        if index == 0 {
            write_record(out, var, &var.short_name, width, var.label.as_deref(), &var.missing);
        } else {
            let prefix: String = var.short_name.chars().take(7).collect();
            write_record(out, var, &format!("{prefix}{index}"), width, None, &[]);
        }
    }
}

fn write_record(
    out: &mut Vec<u8>,
    var: &VarDef,
    name: &str,
    width: usize,
    label: Option<&str>,
    missing: &[f64],
) {
    put_i32(out, 2);
    put_i32(out, width as i32);
    put_i32(out, i32::from(label.is_some()));
    put_i32(out, missing.len() as i32);
    put_i32(out, var.print_format(width));
    put_i32(out, var.print_format(width));
    put_padded(out, name, 8);

    if let Some(label) = label {
        let bytes = label.as_bytes();
        put_i32(out, bytes.len() as i32);
        out.extend_from_slice(bytes);
        out.resize(out.len() + (bytes.len().next_multiple_of(4) - bytes.len()), b' ');
    }
    for code in missing {
        put_f64(out, *code);
    }

    let slots = if width == 0 { 1 } else { width.div_ceil(8) };
    for _ in 1..slots {
        put_i32(out, 2);
        put_i32(out, -1);
        put_i32(out, 0);
        put_i32(out, 0);
        put_i32(out, 0x011d_0800);
        put_i32(out, 0x011d_0800);
        put_padded(out, "", 8);
    }
}

fn put_i32(out: &mut Vec<u8>, value: i32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn put_f64(out: &mut Vec<u8>, value: f64) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn put_padded(out: &mut Vec<u8>, text: &str, len: usize) {
    let mut bytes = text.as_bytes().to_vec();
    bytes.resize(len, b' ');
    out.extend_from_slice(&bytes[..len]);
}

/// Seconds since the SPSS epoch for a calendar date
pub fn spss_seconds(year: i32, month: u32, day: u32) -> f64 {
    let epoch = chrono::NaiveDate::from_ymd_opt(1582, 10, 14).unwrap();
    let date = chrono::NaiveDate::from_ymd_opt(year, month, day).unwrap();
    (date - epoch).num_days() as f64 * 86_400.0
}

/// The scenario from the conversion contract: one labeled code, one date
pub fn scenario() -> SavBuilder {
    SavBuilder::new()
        .numeric("sex", Some("Gender"))
        .date("dob", Some("Date of Birth"))
        .value_labels(&["sex"], vec![(Code::Num(1.0), "Male"), (Code::Num(2.0), "Female")])
        .row(vec![Cell::Num(1.0), Cell::Num(0.0)])
}

/// Read the first worksheet back as rows of cells
pub fn read_sheet(path: &Path, sheet: &str) -> Vec<Vec<calamine::Data>> {
    use calamine::{open_workbook, Reader, Xlsx};

    let mut workbook: Xlsx<_> = open_workbook(path).unwrap();
    let range = workbook.worksheet_range(sheet).unwrap();
    range.rows().map(|row| row.to_vec()).collect()
}

/// Header row of a produced workbook
pub fn read_headers(path: &Path) -> Vec<String> {
    read_sheet(path, "Sheet1")[0]
        .iter()
        .map(|cell| cell.to_string())
        .collect()
}
