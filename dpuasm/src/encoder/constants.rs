//! Bit-field widths and positions for the three instruction formats. Mirrors
//! `dpusim::pipeline::decode`'s bit masks exactly — the encoder and the decoder must never
//! drift apart.

pub const OPCODE_SHIFT: u32 = 26;
pub const RD_SHIFT: u32 = 21;
pub const RS1_SHIFT: u32 = 16;
pub const RS2_SHIFT: u32 = 11;

pub const REG_MASK: u32 = 0x1F;
pub const FUNCT_MASK: u32 = 0x3F;
pub const IMMEDIATE_MASK: u32 = 0xFFFF;
pub const ADDRESS_MASK: u32 = 0x03FF_FFFF;

pub const IMMEDIATE_MIN: i64 = i16::MIN as i64;
pub const IMMEDIATE_MAX: i64 = i16::MAX as i64;
pub const ADDRESS_MAX: i64 = ADDRESS_MASK as i64;
