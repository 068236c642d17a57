use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

//==============================================================================
// Cell Values
//==============================================================================

/// A single decoded cell, as handed over by the `.sav` reader
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// Numeric value (SPSS stores every numeric as f64)
    Number(f64),
    /// String value, trailing pad spaces removed
    Text(String),
    /// Date/time value already materialized by the reader
    Date(NaiveDateTime),
    /// System-missing or user-missing value
    Missing,
}

impl RawValue {
    pub fn is_missing(&self) -> bool {
        matches!(self, RawValue::Missing)
    }

    /// Get the type name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            RawValue::Number(_) => "Number",
            RawValue::Text(_) => "Text",
            RawValue::Date(_) => "Date",
            RawValue::Missing => "Missing",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            RawValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            RawValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Number(n) => write!(f, "{}", n),
            RawValue::Text(s) => write!(f, "{:?}", s),
            RawValue::Date(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            RawValue::Missing => write!(f, "<missing>"),
        }
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        RawValue::Number(value as f64)
    }
}

impl From<i32> for RawValue {
    fn from(value: i32) -> Self {
        RawValue::Number(f64::from(value))
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

impl From<NaiveDateTime> for RawValue {
    fn from(value: NaiveDateTime) -> Self {
        RawValue::Date(value)
    }
}

impl From<NaiveDate> for RawValue {
    fn from(value: NaiveDate) -> Self {
        RawValue::Date(value.and_time(chrono::NaiveTime::MIN))
    }
}

impl<T: Into<RawValue>> From<Option<T>> for RawValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(RawValue::Missing, Into::into)
    }
}

//==============================================================================
// Value Label Keys
//==============================================================================

/// Canonical numeric code: a finite f64 with `-0.0` folded into `0.0`.
///
/// Integer and float spellings of the same code (`1` and `1.0`) produce the
/// same `NumericCode`. Matching stays exact otherwise, `1.5` never equals `1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NumericCode(u64);

impl NumericCode {
    pub fn new(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        let value = if value == 0.0 { 0.0 } else { value };
        Some(Self(value.to_bits()))
    }

    pub fn value(self) -> f64 {
        f64::from_bits(self.0)
    }
}

impl From<i64> for NumericCode {
    fn from(value: i64) -> Self {
        // i64 -> f64 is always finite
        Self(if value == 0 { 0 } else { (value as f64).to_bits() })
    }
}

/// Comparable form of a value-label code
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueKey {
    Numeric(NumericCode),
    Text(String),
}

impl ValueKey {
    /// Canonicalize a raw value for dictionary lookup.
    ///
    /// Returns `None` for values that can never be a label code: missing,
    /// dates, and non-finite numbers.
    pub fn from_raw(value: &RawValue) -> Option<Self> {
        match value {
            RawValue::Number(n) => NumericCode::new(*n).map(ValueKey::Numeric),
            RawValue::Text(s) => Some(ValueKey::Text(s.clone())),
            RawValue::Date(_) | RawValue::Missing => None,
        }
    }
}

//==============================================================================
// Records and Dictionaries
//==============================================================================

/// One source row: column keys with their raw values, in dictionary order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    pub fields: Vec<(String, RawValue)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<RawValue>) {
        self.fields.push((key.into(), value.into()));
    }

    pub fn get(&self, key: &str) -> Option<&RawValue> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &RawValue> {
        self.fields.iter().map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<RawValue>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Column key -> variable label
pub type VariableLabelMap = HashMap<String, String>;

/// Column key -> raw (code, label) entries, exactly as the reader produced them
pub type ValueLabelMap = HashMap<String, Vec<(RawValue, String)>>;

/// Columns carrying SPSS date formats
pub type DateColumnSet = BTreeSet<String>;

/// Everything the reader hands to the conversion core
#[derive(Debug, Clone, Default)]
pub struct SavDataset {
    /// Column keys in dictionary order (defines the schema even with zero cases)
    pub columns: Vec<String>,
    pub records: Vec<Record>,
    pub variable_labels: VariableLabelMap,
    pub value_labels: ValueLabelMap,
    pub date_columns: DateColumnSet,
}

impl SavDataset {
    /// Column keys that define the output schema.
    ///
    /// The first record wins when present; the dictionary order is used for
    /// files without cases.
    pub fn schema(&self) -> Vec<String> {
        match self.records.first() {
            Some(first) => first.keys().map(str::to_string).collect(),
            None => self.columns.clone(),
        }
    }
}

//==============================================================================
// Resolved Output
//==============================================================================

/// One output row, values aligned with `ResolvedTable::headers`
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRow {
    pub values: Vec<RawValue>,
}

/// Presentation-ready rows plus their unique headers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedTable {
    pub headers: Vec<String>,
    pub rows: Vec<ResolvedRow>,
}

impl ResolvedTable {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }
}

//==============================================================================
// Warnings
//==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    DateConversion,
    LabelLookup,
}

/// A recovered, non-fatal problem attributable to a cell or dictionary entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionWarning {
    /// Zero-based record index; `None` for dictionary-level issues
    pub row: Option<usize>,
    pub column: String,
    pub kind: WarningKind,
    pub message: String,
}

impl fmt::Display for ConversionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.row {
            Some(row) => write!(f, "row {}, column '{}': {}", row, self.column, self.message),
            None => write!(f, "column '{}': {}", self.column, self.message),
        }
    }
}
