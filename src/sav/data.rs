//! Case data of an SPSS system file.
//!
//! A case is a fixed number of 8-byte slots. Uncompressed files store the
//! slots verbatim. Bytecode-compressed files interleave blocks of eight
//! one-byte opcodes with the literal slots they refer to:
//!
//! | opcode | meaning |
//! |---|---|
//! | 0 | padding, ignored |
//! | 1..=251 | numeric value `opcode - bias` |
//! | 252 | end of data |
//! | 253 | next literal 8 bytes from the stream |
//! | 254 | eight spaces (string filler) |
//! | 255 | system-missing numeric |

use super::bytes::{encode_f64, ByteCursor, Endian};
use super::dictionary::Compression;
use super::{SavError, SavResult};

const OP_PADDING: u8 = 0;
const OP_END: u8 = 252;
const OP_LITERAL: u8 = 253;
const OP_SPACES: u8 = 254;
const OP_SYSMIS: u8 = 255;

/// One decoded 8-byte slot
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Slot {
    /// Literal bytes as stored
    Raw([u8; 8]),
    /// Small integer carried by the opcode itself
    Number(f64),
    Spaces,
    SysMis,
}

impl Slot {
    /// The slot's bytes, as they would appear uncompressed
    pub fn to_bytes(self, endian: Endian, sysmis: f64) -> [u8; 8] {
        match self {
            Slot::Raw(bytes) => bytes,
            Slot::Number(n) => encode_f64(n, endian),
            Slot::Spaces => [b' '; 8],
            Slot::SysMis => encode_f64(sysmis, endian),
        }
    }
}

/// Yields the slots of the data section, one at a time
pub struct SlotReader<'a> {
    cursor: ByteCursor<'a>,
    compression: Compression,
    bias: f64,
    opcodes: [u8; 8],
    next_opcode: usize,
    finished: bool,
}

impl<'a> SlotReader<'a> {
    pub fn new(cursor: ByteCursor<'a>, compression: Compression, bias: f64) -> Self {
        Self {
            cursor,
            compression,
            bias,
            opcodes: [0; 8],
            next_opcode: 8,
            finished: false,
        }
    }

    /// Next slot, or `None` at the end of the data
    pub fn next_slot(&mut self) -> SavResult<Option<Slot>> {
        if self.finished {
            return Ok(None);
        }
        match self.compression {
            Compression::None => {
                if self.cursor.is_at_end() {
                    self.finished = true;
                    return Ok(None);
                }
                Ok(Some(Slot::Raw(self.cursor.read_array::<8>()?)))
            }
            Compression::Bytecode => self.next_compressed(),
        }
    }

    fn next_compressed(&mut self) -> SavResult<Option<Slot>> {
        loop {
            if self.next_opcode == 8 {
                if self.cursor.is_at_end() {
                    self.finished = true;
                    return Ok(None);
                }
                self.opcodes = self.cursor.read_array::<8>()?;
                self.next_opcode = 0;
            }

            let opcode = self.opcodes[self.next_opcode];
            self.next_opcode += 1;

            match opcode {
                OP_PADDING => continue,
                OP_END => {
                    self.finished = true;
                    return Ok(None);
                }
                OP_LITERAL => return Ok(Some(Slot::Raw(self.cursor.read_array::<8>()?))),
                OP_SPACES => return Ok(Some(Slot::Spaces)),
                OP_SYSMIS => return Ok(Some(Slot::SysMis)),
                code => return Ok(Some(Slot::Number(f64::from(code) - self.bias))),
            }
        }
    }

    /// Read one whole case of `slot_count` slots.
    ///
    /// Returns `None` when the data ends cleanly before the case starts, and
    /// for an empty case layout, which would otherwise never consume input.
    pub fn next_case(&mut self, slot_count: usize) -> SavResult<Option<Vec<Slot>>> {
        if slot_count == 0 {
            return Ok(None);
        }
        let mut slots = Vec::with_capacity(slot_count);
        for i in 0..slot_count {
            match self.next_slot()? {
                Some(slot) => slots.push(slot),
                None if i == 0 => return Ok(None),
                None => {
                    return Err(SavError::Truncated {
                        offset: self.cursor.position(),
                        expected: (slot_count - i) * 8,
                        available: 0,
                    })
                }
            }
        }
        Ok(Some(slots))
    }
}
