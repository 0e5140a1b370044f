//! This crate implements the core functionality of eevm tooling
//!
//! This mostly includes the opcode catalog, bytecode decoding, jump destination analysis and code hashing.

#![allow(clippy::uninlined_format_args)]

pub mod analysis;
pub mod decoder;
pub mod hash;
pub mod opcode;

pub use analysis::JumpTable;
pub use decoder::{decode, DecodedInstruction, Decoder};
pub use hash::{Hasher, Keccak256, Keccak256Hasher};
pub use opcode::{lookup, Opcode, OpcodeDescriptor};
