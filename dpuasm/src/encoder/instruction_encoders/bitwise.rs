use dpusim::isa::{OpCode, Register};

use crate::encoder::components::{pack_i_format, word_to_bytes};

/// `FLIP rd, rs1` — bitwise complement. Encoded in the I-format shape with the immediate
/// field unused (zero), since it carries only two register operands.
pub fn encode_flip(rd: Register, rs1: Register) -> [u8; 4] {
    word_to_bytes(pack_i_format(OpCode::FLIP, rd, rs1, 0))
}
