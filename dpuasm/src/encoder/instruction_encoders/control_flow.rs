use dpusim::isa::{OpCode, Register};

use crate::encoder::components::{pack_i_format, pack_j_format, pack_register_jump, word_to_bytes};

/// `BEZ`/`BNZ rs1, offset` — `rs1` only feeds the zero flag upstream of this instruction
/// (condition codes are set by the preceding ALU op, not read here), so the register field is
/// unused and the relative `offset` occupies the full 16-bit immediate.
pub fn encode_branch(op: OpCode, offset: i32) -> [u8; 4] {
    word_to_bytes(pack_i_format(op, Register::ZERO, Register::ZERO, offset))
}

/// `JMP`/`JL offset` — 26-bit PC-relative offset from the instruction following this one.
pub fn encode_jump(op: OpCode, offset: i32) -> [u8; 4] {
    word_to_bytes(pack_j_format(op, offset as u32))
}

/// `JR`/`JLR rs1` — absolute target taken from a register.
pub fn encode_jump_register(op: OpCode, rs1: Register) -> [u8; 4] {
    word_to_bytes(pack_register_jump(op, rs1))
}
