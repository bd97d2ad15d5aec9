use dpusim::isa::{OpCode, Register};

use crate::encoder::components::{pack_i_format, word_to_bytes};

pub fn encode_load(op: OpCode, rd: Register, rs1: Register, offset: i32) -> [u8; 4] {
    word_to_bytes(pack_i_format(op, rd, rs1, offset))
}

pub fn encode_store(op: OpCode, rd: Register, rs1: Register, offset: i32) -> [u8; 4] {
    word_to_bytes(pack_i_format(op, rd, rs1, offset))
}

pub fn encode_load_immediate(rd: Register, value: i32) -> [u8; 4] {
    word_to_bytes(pack_i_format(OpCode::LI, rd, Register::ZERO, value))
}

/// `value` is the already-shifted-down high 16 bits (i.e. `original_value >> 16`) — the
/// low 16 bits are zeroed by `dpusim::pipeline`'s decode on writeback.
pub fn encode_load_immediate_high(rd: Register, value: i32) -> [u8; 4] {
    word_to_bytes(pack_i_format(OpCode::LHI, rd, Register::ZERO, value))
}
