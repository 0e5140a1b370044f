//! Linear-sweep decoding of EVM bytecode.
//!
//! Decoding never fails: bytes without a catalog entry decode to an
//! unrecognized instruction, and a push whose immediate runs past the end of
//! the buffer keeps only the bytes that are actually there.

use std::borrow::Cow;
use std::fmt;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::opcode::{self, Opcode, WORD_SIZE};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedInstruction {
    offset: usize,
    code: u8,
    opcode: Option<Opcode>,
    immediate: Option<Vec<u8>>,
}

impl DecodedInstruction {
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn code(&self) -> u8 {
        self.code
    }

    /// `None` when the byte has no catalog entry.
    pub fn opcode(&self) -> Option<Opcode> {
        self.opcode
    }

    pub fn is_known(&self) -> bool {
        self.opcode.is_some()
    }

    pub fn mnemonic(&self) -> Cow<'static, str> {
        match self.opcode {
            Some(op) => Cow::Borrowed(op.mnemonic()),
            None => Cow::Owned(format!("UNKNOWN({:#04x})", self.code)),
        }
    }

    /// The immediate bytes present in the source, possibly fewer than
    /// [`Self::nominal_immediate_len`] at the end of the code.
    pub fn immediate(&self) -> Option<&[u8]> {
        self.immediate.as_deref()
    }

    pub fn nominal_immediate_len(&self) -> usize {
        self.opcode.map_or(0, Opcode::immediate_len)
    }

    pub fn is_truncated(&self) -> bool {
        self.immediate
            .as_ref()
            .is_some_and(|imm| imm.len() < self.nominal_immediate_len())
    }

    /// Bytes consumed from the source, opcode included.
    pub fn encoded_len(&self) -> usize {
        1 + self.immediate.as_ref().map_or(0, Vec::len)
    }

    /// Offset of the byte following this instruction.
    pub fn next_offset(&self) -> usize {
        self.offset + self.encoded_len()
    }

    /// The immediate right-padded with zeros to its nominal width, the way the
    /// processor reads a push that runs off the end of the code.
    pub fn padded_immediate(&self) -> Option<Vec<u8>> {
        self.immediate.as_ref().map(|imm| {
            let mut padded = imm.clone();
            padded.resize(self.nominal_immediate_len(), 0);
            padded
        })
    }

    /// The pushed value as a big-endian 256-bit word.
    pub fn push_value(&self) -> Option<[u8; WORD_SIZE]> {
        self.padded_immediate().map(|imm| {
            let mut word = [0u8; WORD_SIZE];
            word[WORD_SIZE - imm.len()..].copy_from_slice(&imm);
            word
        })
    }
}

impl fmt::Display for DecodedInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}  {}", self.offset, self.mnemonic())?;
        if let Some(imm) = &self.immediate {
            write!(f, "  0x{}", hex::encode(imm))?;
        }
        Ok(())
    }
}

impl Serialize for DecodedInstruction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("DecodedInstruction", 5)?;
        s.serialize_field("offset", &self.offset)?;
        s.serialize_field("code", &self.code)?;
        s.serialize_field("mnemonic", &self.mnemonic())?;
        s.serialize_field(
            "immediate",
            &self.immediate.as_ref().map(|imm| format!("0x{}", hex::encode(imm))),
        )?;
        s.serialize_field("truncated", &self.is_truncated())?;
        s.end()
    }
}

/// Lazy decoder over a borrowed code buffer.
///
/// Create a new decoder to restart from the beginning.
#[derive(Debug, Clone)]
pub struct Decoder<'a> {
    code: &'a [u8],
    cursor: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(code: &'a [u8]) -> Self {
        Self { code, cursor: 0 }
    }

    pub fn get_pc(&self) -> usize {
        self.cursor
    }
}

impl Iterator for Decoder<'_> {
    type Item = DecodedInstruction;

    fn next(&mut self) -> Option<Self::Item> {
        let offset = self.cursor;
        let code = *self.code.get(offset)?;
        self.cursor += 1;

        let desc = match opcode::lookup(code) {
            Some(desc) => desc,
            None => {
                log::trace!("unknown opcode {:#04x} at {:#x}", code, offset);
                return Some(DecodedInstruction {
                    offset,
                    code,
                    opcode: None,
                    immediate: None,
                });
            }
        };

        let immediate = if desc.immediate_len > 0 {
            let end = (self.cursor + desc.immediate_len).min(self.code.len());
            let imm = self.code[self.cursor..end].to_vec();
            if imm.len() < desc.immediate_len {
                log::trace!(
                    "{} at {:#x} truncated: {} of {} immediate bytes",
                    desc.mnemonic,
                    offset,
                    imm.len(),
                    desc.immediate_len
                );
            }
            self.cursor = end;
            Some(imm)
        } else {
            None
        };

        Some(DecodedInstruction {
            offset,
            code,
            opcode: Opcode::from_byte(code),
            immediate,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.code.len() - self.cursor;
        (remaining.min(1), Some(remaining))
    }
}

impl std::iter::FusedIterator for Decoder<'_> {}

/// Decode the whole buffer into a listing of instructions.
pub fn decode(code: &[u8]) -> Vec<DecodedInstruction> {
    Decoder::new(code).collect()
}
