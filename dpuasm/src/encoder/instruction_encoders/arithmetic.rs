use dpusim::isa::{AluFunct, OpCode, Register};

use crate::encoder::components::{pack_i_format, pack_r_format, word_to_bytes};

pub fn encode_alu(rd: Register, rs1: Register, rs2: Register, funct: AluFunct) -> [u8; 4] {
    word_to_bytes(pack_r_format(OpCode::ALU, rd, rs1, rs2, funct))
}

pub fn encode_immediate_alu(op: OpCode, rd: Register, rs1: Register, value: i32) -> [u8; 4] {
    word_to_bytes(pack_i_format(op, rd, rs1, value))
}
