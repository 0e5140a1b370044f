//! The EVM instruction catalog.
//!
//! Every active opcode has exactly one [`OpcodeDescriptor`]. Opcodes that the
//! processor does not implement (`RETURNDATASIZE`, `RETURNDATACOPY`,
//! `STATICCALL` and the designated `INVALID` byte) are deliberately missing,
//! so looking them up yields `None` just like any other unassigned value.

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use strum::{EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Size in bytes of a full machine word, and the largest push immediate.
pub const WORD_SIZE: usize = 32;

#[derive(
    FromPrimitive,
    EnumIter,
    EnumString,
    IntoStaticStr,
    strum::Display,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
#[repr(u8)]
pub enum Opcode {
    // 0x00: stop and arithmetic
    Stop = 0x00,
    Add = 0x01,
    Mul = 0x02,
    Sub = 0x03,
    Div = 0x04,
    SDiv = 0x05,
    Mod = 0x06,
    SMod = 0x07,
    AddMod = 0x08,
    MulMod = 0x09,
    Exp = 0x0a,
    SignExtend = 0x0b,

    // 0x10: comparison and bitwise logic
    Lt = 0x10,
    Gt = 0x11,
    SLt = 0x12,
    SGt = 0x13,
    Eq = 0x14,
    IsZero = 0x15,
    And = 0x16,
    Or = 0x17,
    Xor = 0x18,
    Not = 0x19,
    Byte = 0x1a,

    // 0x20
    Sha3 = 0x20,

    // 0x30: environmental information
    Address = 0x30,
    Balance = 0x31,
    Origin = 0x32,
    Caller = 0x33,
    CallValue = 0x34,
    CallDataLoad = 0x35,
    CallDataSize = 0x36,
    CallDataCopy = 0x37,
    CodeSize = 0x38,
    CodeCopy = 0x39,
    GasPrice = 0x3a,
    ExtCodeSize = 0x3b,
    ExtCodeCopy = 0x3c,

    // 0x40: block information
    BlockHash = 0x40,
    Coinbase = 0x41,
    Timestamp = 0x42,
    Number = 0x43,
    PrevRandao = 0x44,
    GasLimit = 0x45,

    // 0x50: stack, memory, storage and flow
    Pop = 0x50,
    MLoad = 0x51,
    MStore = 0x52,
    MStore8 = 0x53,
    SLoad = 0x54,
    SStore = 0x55,
    Jump = 0x56,
    JumpI = 0x57,
    Pc = 0x58,
    MSize = 0x59,
    Gas = 0x5a,
    JumpDest = 0x5b,

    // 0x60..0x7f: push family
    Push1 = 0x60,
    Push2 = 0x61,
    Push3 = 0x62,
    Push4 = 0x63,
    Push5 = 0x64,
    Push6 = 0x65,
    Push7 = 0x66,
    Push8 = 0x67,
    Push9 = 0x68,
    Push10 = 0x69,
    Push11 = 0x6a,
    Push12 = 0x6b,
    Push13 = 0x6c,
    Push14 = 0x6d,
    Push15 = 0x6e,
    Push16 = 0x6f,
    Push17 = 0x70,
    Push18 = 0x71,
    Push19 = 0x72,
    Push20 = 0x73,
    Push21 = 0x74,
    Push22 = 0x75,
    Push23 = 0x76,
    Push24 = 0x77,
    Push25 = 0x78,
    Push26 = 0x79,
    Push27 = 0x7a,
    Push28 = 0x7b,
    Push29 = 0x7c,
    Push30 = 0x7d,
    Push31 = 0x7e,
    Push32 = 0x7f,

    // 0x80: duplication
    Dup1 = 0x80,
    Dup2 = 0x81,
    Dup3 = 0x82,
    Dup4 = 0x83,
    Dup5 = 0x84,
    Dup6 = 0x85,
    Dup7 = 0x86,
    Dup8 = 0x87,
    Dup9 = 0x88,
    Dup10 = 0x89,
    Dup11 = 0x8a,
    Dup12 = 0x8b,
    Dup13 = 0x8c,
    Dup14 = 0x8d,
    Dup15 = 0x8e,
    Dup16 = 0x8f,

    // 0x90: exchange
    Swap1 = 0x90,
    Swap2 = 0x91,
    Swap3 = 0x92,
    Swap4 = 0x93,
    Swap5 = 0x94,
    Swap6 = 0x95,
    Swap7 = 0x96,
    Swap8 = 0x97,
    Swap9 = 0x98,
    Swap10 = 0x99,
    Swap11 = 0x9a,
    Swap12 = 0x9b,
    Swap13 = 0x9c,
    Swap14 = 0x9d,
    Swap15 = 0x9e,
    Swap16 = 0x9f,

    // 0xa0: logging
    Log0 = 0xa0,
    Log1 = 0xa1,
    Log2 = 0xa2,
    Log3 = 0xa3,
    Log4 = 0xa4,

    // 0xf0: system
    Create = 0xf0,
    Call = 0xf1,
    CallCode = 0xf2,
    Return = 0xf3,
    DelegateCall = 0xf4,
    Revert = 0xfd,
    SelfDestruct = 0xff,
}

impl Opcode {
    pub fn from_byte(code: u8) -> Option<Self> {
        Self::from_u8(code)
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn mnemonic(self) -> &'static str {
        self.into()
    }

    pub fn is_push(self) -> bool {
        (Opcode::Push1 as u8..=Opcode::Push32 as u8).contains(&self.code())
    }

    /// Number of immediate bytes following the opcode.
    ///
    /// Only the push family carries an immediate: `PUSHn` is followed by `n` bytes.
    pub fn immediate_len(self) -> usize {
        if self.is_push() {
            (self.code() - Opcode::Push1 as u8) as usize + 1
        } else {
            0
        }
    }

    pub fn descriptor(self) -> OpcodeDescriptor {
        OpcodeDescriptor {
            code: self.code(),
            mnemonic: self.mnemonic(),
            immediate_len: self.immediate_len(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeDescriptor {
    pub code: u8,
    pub mnemonic: &'static str,
    pub immediate_len: usize,
}

lazy_static::lazy_static! {
    static ref CATALOG: [Option<OpcodeDescriptor>; 256] = {
        let mut table = [None; 256];
        for op in Opcode::iter() {
            table[op.code() as usize] = Some(op.descriptor());
        }
        table
    };
}

/// Look up the descriptor for a raw opcode byte.
pub fn lookup(code: u8) -> Option<&'static OpcodeDescriptor> {
    CATALOG[code as usize].as_ref()
}

/// All active descriptors in ascending opcode order.
pub fn catalog() -> impl Iterator<Item = &'static OpcodeDescriptor> {
    CATALOG.iter().flatten()
}
