use dpusim::isa::{OpCode, Register};

use crate::encoder::components::{pack_bare, pack_i_format, word_to_bytes};

pub fn encode_nop() -> [u8; 4] {
    word_to_bytes(pack_bare(OpCode::NOP))
}

pub fn encode_halt() -> [u8; 4] {
    word_to_bytes(pack_bare(OpCode::HALT))
}

/// `CALL` has no operands in this ISA — the callee address is always reached through `JL`/
/// `JLR`, which set `RA`. `CALL` itself is a reserved trap opcode the decoder treats as a no-op.
pub fn encode_call() -> [u8; 4] {
    word_to_bytes(pack_bare(OpCode::CALL))
}

pub fn encode_copy(rd: Register, rs1: Register) -> [u8; 4] {
    word_to_bytes(pack_i_format(OpCode::COPY, rd, rs1, 0))
}
