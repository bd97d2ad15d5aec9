//! Small primitives shared between the `dpuasm` linker and the `dpusim` execution engine.

use std::error::Error;
use std::fmt;

pub mod bytestream;

pub use bytestream::ByteStream;

/// Byte order used for every multi-byte value in this workspace: images, instruction words,
/// register loads/stores, and the binary section images.
pub type Endian = byteorder::LittleEndian;

/// Error returned by [`EnumFromStr::from_str`] when a mnemonic, register name, or directive
/// keyword does not match any variant of the target enum.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct ParseEnumError {
    pub value: String,
    pub enum_name: &'static str,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "\"{}\" is not a valid {}", &self.value, &self.enum_name)
    }
}

impl Error for ParseEnumError {}

/// Derivable via `#[derive(EnumFromStr)]` ([`util_derive`]) for any field-less enum: the
/// assembler leans on this for mnemonics, register names, condition codes, and section/chunk
/// keywords instead of hand-written match arms.
pub trait EnumFromStr: Sized {
    fn from_str(s: &str) -> Result<Self, ParseEnumError>;
}
