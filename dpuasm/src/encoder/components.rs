//! Bit-packing primitives shared by every instruction-category encoder: one function per
//! instruction *shape*, not per mnemonic.

use dpusim::isa::{AluFunct, OpCode, Register};

use super::constants::*;

fn opcode_id(op: OpCode) -> u32 {
    const ALL: &[OpCode] = &[
        OpCode::NOP, OpCode::ALU, OpCode::HALT, OpCode::CALL, OpCode::COPY, OpCode::LI,
        OpCode::LHI, OpCode::LB, OpCode::LH, OpCode::LW, OpCode::SB, OpCode::SH, OpCode::SW,
        OpCode::ADDI, OpCode::SUBI, OpCode::MULI, OpCode::DIVI, OpCode::ANDI, OpCode::ORI,
        OpCode::XORI, OpCode::FLIP, OpCode::SLLI, OpCode::SRLI, OpCode::SRAI, OpCode::SEQI,
        OpCode::SNEI, OpCode::SLTI, OpCode::SGTI, OpCode::SLEI, OpCode::SGEI, OpCode::BEZ,
        OpCode::BNZ, OpCode::JMP, OpCode::JL, OpCode::JR, OpCode::JLR,
    ];
    ALL.iter().position(|&o| o == op).expect("every OpCode variant is listed") as u32
}

fn alu_funct_id(funct: AluFunct) -> u32 {
    const ALL: &[AluFunct] = &[
        AluFunct::ADD, AluFunct::SUB, AluFunct::MUL, AluFunct::DIV, AluFunct::AND, AluFunct::OR,
        AluFunct::XOR, AluFunct::SLL, AluFunct::SRL, AluFunct::SRA, AluFunct::SEQ, AluFunct::SNE,
        AluFunct::SLT, AluFunct::SGT, AluFunct::SLE, AluFunct::SGE,
    ];
    ALL.iter().position(|&f| f == funct).expect("every AluFunct variant is listed") as u32
}

/// `rd`, `rs1`, `rs2`, `funct` — the ALU instruction's format.
pub fn pack_r_format(op: OpCode, rd: Register, rs1: Register, rs2: Register, funct: AluFunct) -> u32 {
    (opcode_id(op) << OPCODE_SHIFT)
        | ((rd.id() as u32 & REG_MASK) << RD_SHIFT)
        | ((rs1.id() as u32 & REG_MASK) << RS1_SHIFT)
        | ((rs2.id() as u32 & REG_MASK) << RS2_SHIFT)
        | (alu_funct_id(funct) & FUNCT_MASK)
}

/// `rd`, `rs1`, 16-bit sign-extended immediate — loads, stores, immediate-ALU, LI/LHI.
pub fn pack_i_format(op: OpCode, rd: Register, rs1: Register, immediate: i32) -> u32 {
    (opcode_id(op) << OPCODE_SHIFT)
        | ((rd.id() as u32 & REG_MASK) << RD_SHIFT)
        | ((rs1.id() as u32 & REG_MASK) << RS1_SHIFT)
        | ((immediate as u32) & IMMEDIATE_MASK)
}

/// 26-bit absolute address — JMP/JL.
pub fn pack_j_format(op: OpCode, address: u32) -> u32 {
    (opcode_id(op) << OPCODE_SHIFT) | (address & ADDRESS_MASK)
}

/// `rs1` only — JR/JLR, whose target lives in a register rather than the instruction word.
pub fn pack_register_jump(op: OpCode, rs1: Register) -> u32 {
    (opcode_id(op) << OPCODE_SHIFT) | ((rs1.id() as u32 & REG_MASK) << RS1_SHIFT)
}

/// Bare opcode, every field zero — NOP/HALT/CALL.
pub fn pack_bare(op: OpCode) -> u32 {
    opcode_id(op) << OPCODE_SHIFT
}

pub fn word_to_bytes(word: u32) -> [u8; 4] {
    word.to_le_bytes()
}
