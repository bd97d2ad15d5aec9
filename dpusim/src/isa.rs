//! Register names and opcodes shared between the linker's instruction encoder (`dpuasm`) and
//! this crate's pipeline decode/execute stage. Kept in `dpusim` (rather than duplicated) since
//! both sides must agree on the exact same binary encoding.
//!
//! Grounded on the teacher's DLX-derived ISA (`examples/snacchus-vcpu/src/processor/enums.rs`
//! and the dialect documented in `examples/snacchus-vcpu/vasm/src/lib.rs`), unchanged: the
//! specification does not redefine a PIM-specific instruction set.

use util::{EnumFromStr, ParseEnumError};
use util_derive::EnumFromStr;

pub const REGISTER_COUNT: usize = 32;

pub const OPCODE_WIDTH: u32 = 6;
pub const REG_ID_WIDTH: u32 = 5;
pub const FUNCT_WIDTH: u32 = 6;
pub const IMMEDIATE_WIDTH: u32 = 16;
pub const ADDRESS_WIDTH: u32 = 26;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, EnumFromStr)]
#[repr(u8)]
pub enum Register {
    ZERO,
    V0,
    V1,
    A0,
    A1,
    A2,
    A3,
    A4,
    T0,
    T1,
    T2,
    T3,
    T4,
    T5,
    T6,
    T7,
    T8,
    T9,
    S0,
    S1,
    S2,
    S3,
    S4,
    S5,
    S6,
    S7,
    S8,
    S9,
    SP,
    FP,
    RM,
    RA,
}

impl Register {
    pub fn id(self) -> u32 {
        self as u32
    }

    pub fn from_id(id: u32) -> Option<Register> {
        const ALL: [Register; REGISTER_COUNT] = [
            Register::ZERO,
            Register::V0,
            Register::V1,
            Register::A0,
            Register::A1,
            Register::A2,
            Register::A3,
            Register::A4,
            Register::T0,
            Register::T1,
            Register::T2,
            Register::T3,
            Register::T4,
            Register::T5,
            Register::T6,
            Register::T7,
            Register::T8,
            Register::T9,
            Register::S0,
            Register::S1,
            Register::S2,
            Register::S3,
            Register::S4,
            Register::S5,
            Register::S6,
            Register::S7,
            Register::S8,
            Register::S9,
            Register::SP,
            Register::FP,
            Register::RM,
            Register::RA,
        ];
        ALL.get(id as usize).copied()
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, EnumFromStr)]
pub enum OpCode {
    NOP,
    ALU,
    HALT,
    CALL,
    COPY,
    LI,
    LHI,
    LB,
    LH,
    LW,
    SB,
    SH,
    SW,
    ADDI,
    SUBI,
    MULI,
    DIVI,
    ANDI,
    ORI,
    XORI,
    FLIP,
    SLLI,
    SRLI,
    SRAI,
    SEQI,
    SNEI,
    SLTI,
    SGTI,
    SLEI,
    SGEI,
    BEZ,
    BNZ,
    JMP,
    JL,
    JR,
    JLR,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, EnumFromStr)]
pub enum AluFunct {
    ADD,
    SUB,
    MUL,
    DIV,
    AND,
    OR,
    XOR,
    SLL,
    SRL,
    SRA,
    SEQ,
    SNE,
    SLT,
    SGT,
    SLE,
    SGE,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn register_from_str_round_trips_id() {
        let reg = Register::from_str("T3").unwrap();
        assert_eq!(Register::from_id(reg.id()), Some(reg));
    }

    #[test]
    fn unknown_register_name_is_an_error() {
        let err: Result<Register, ParseEnumError> = Register::from_str("NOPE");
        assert!(err.is_err());
    }
}
