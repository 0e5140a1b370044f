use bitvec::prelude::*;

use crate::decoder::Decoder;
use crate::opcode::Opcode;

/// Valid jump destinations of a piece of code.
///
/// A destination is a `JUMPDEST` that starts an instruction; a `0x5b` byte
/// inside a push immediate does not count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JumpTable {
    dests: BitVec,
}

impl JumpTable {
    pub fn analyze(code: &[u8]) -> Self {
        let mut dests = bitvec![0; code.len()];
        for inst in Decoder::new(code) {
            if inst.opcode() == Some(Opcode::JumpDest) {
                dests.set(inst.offset(), true);
            }
        }
        log::debug!(
            "jump analysis: {} destinations in {} bytes",
            dests.count_ones(),
            code.len()
        );
        Self { dests }
    }

    pub fn is_jump_dest(&self, offset: usize) -> bool {
        self.dests.get(offset).is_some_and(|bit| *bit)
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.dests.iter_ones()
    }

    pub fn len(&self) -> usize {
        self.dests.count_ones()
    }

    pub fn is_empty(&self) -> bool {
        self.dests.not_any()
    }
}
