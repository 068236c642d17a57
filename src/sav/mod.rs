//! SPSS system file (`.sav`) decoding
//!
//! Reads the dictionary (variables, variable labels, value labels, formats,
//! encoding, very long strings) and the case data, uncompressed or
//! bytecode-compressed, and turns them into a
//! [`SavDataset`](crate::types::SavDataset).
//!
//! Not supported: zlib-compressed `.zsav` files.

mod bytes;
mod data;
mod dictionary;
mod encoding;
mod reader;

pub use bytes::Endian;
pub use encoding::{codepage_to_encoding, resolve_encoding};
pub use reader::{parse_sav, SavFile, SavMetadata, SavReader};

use thiserror::Error;

pub type SavResult<T> = Result<T, SavError>;

#[derive(Error, Debug)]
pub enum SavError {
    #[error("not an SPSS system file")]
    NotSavFile,

    #[error("unsupported compression: {0}")]
    UnsupportedCompression(String),

    #[error("file truncated at byte {offset}: needed {expected} bytes, {available} available")]
    Truncated {
        offset: usize,
        expected: usize,
        available: usize,
    },

    #[error("unknown record type {record_type} at byte {offset}")]
    InvalidRecord { offset: usize, record_type: i32 },

    #[error("invalid dictionary at byte {offset}: {reason}")]
    InvalidDictionary { offset: usize, reason: String },
}
