//! Byte-addressable stores with explicit base/size and alignment invariants.
//!
//! Grounded on the teacher's `Storage` trait (`src/memory.rs`), generalized from a single flat
//! `Memory` implementor to the four device stores (`atomic`, `iram`, `wram`, `mram`) plus the
//! DRAM-timing-aware [`controller`].

use thiserror::Error;

pub mod atomic;
pub mod controller;
pub mod iram;
pub mod mram;
pub mod wram;

pub use atomic::Atomic;
pub use controller::MemoryController;
pub use iram::Iram;
pub use mram::Mram;
pub use wram::Wram;

pub const BYTE_BYTES: u32 = 1;
pub const HALF_BYTES: u32 = 2;
pub const WORD_BYTES: u32 = 4;

/// Memory address out of a store's range, or not aligned to the access granularity the store
/// requires (wordlines, for MRAM; none, for the byte-granular SRAMs).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BoundsError {
    #[error("address {address} + length {length} exceeds store of size {size}")]
    OutOfRange {
        address: u32,
        length: u32,
        size: u32,
    },

    #[error("address {address} is not aligned to {granularity} bytes")]
    Misaligned { address: u32, granularity: u32 },
}

/// A flat byte-addressable region with bounds-checked reads and writes in the workspace's
/// shared [`util::Endian`].
pub trait Storage {
    /// Total length of the storage in bytes. Not every address in `[0, length)` is necessarily
    /// backed by the same granularity of access (MRAM is wordline-granular).
    fn length(&self) -> u32;

    fn check_range(&self, address: u32, length: u32) -> bool;

    fn borrow_slice(&self, address: u32, length: u32) -> Result<&[u8], BoundsError>;

    fn borrow_slice_mut(&mut self, address: u32, length: u32) -> Result<&mut [u8], BoundsError>;

    fn read(&self, address: u32, size: u32) -> Result<u32, BoundsError> {
        use byteorder::ByteOrder;
        debug_assert!((1..=4).contains(&size));
        Ok(util::Endian::read_uint(self.borrow_slice(address, size)?, size as usize) as u32)
    }

    fn read_byte(&self, address: u32) -> Result<u8, BoundsError> {
        Ok(self.borrow_slice(address, BYTE_BYTES)?[0])
    }

    fn read_half(&self, address: u32) -> Result<u16, BoundsError> {
        use byteorder::ByteOrder;
        Ok(util::Endian::read_u16(self.borrow_slice(address, HALF_BYTES)?))
    }

    fn read_word(&self, address: u32) -> Result<u32, BoundsError> {
        use byteorder::ByteOrder;
        Ok(util::Endian::read_u32(self.borrow_slice(address, WORD_BYTES)?))
    }

    fn write(&mut self, address: u32, size: u32, value: u32) -> Result<(), BoundsError> {
        use byteorder::ByteOrder;
        debug_assert!((1..=4).contains(&size));
        util::Endian::write_uint(self.borrow_slice_mut(address, size)?, u64::from(value), size as usize);
        Ok(())
    }

    fn write_byte(&mut self, address: u32, value: u8) -> Result<(), BoundsError> {
        self.borrow_slice_mut(address, BYTE_BYTES)?[0] = value;
        Ok(())
    }

    fn write_half(&mut self, address: u32, value: u16) -> Result<(), BoundsError> {
        use byteorder::ByteOrder;
        util::Endian::write_u16(self.borrow_slice_mut(address, HALF_BYTES)?, value);
        Ok(())
    }

    fn write_word(&mut self, address: u32, value: u32) -> Result<(), BoundsError> {
        use byteorder::ByteOrder;
        util::Endian::write_u32(self.borrow_slice_mut(address, WORD_BYTES)?, value);
        Ok(())
    }
}

/// Flat byte-addressable block, the common implementation behind [`Atomic`], [`Iram`], and
/// [`Wram`] (MRAM is wordline-structured and exposes its own `read`/`write` on [`Mram`] instead
/// of implementing this trait, since its accesses are always wordline-granular).
#[derive(Clone, Debug, Default)]
pub struct FlatMemory {
    data: Vec<u8>,
}

impl FlatMemory {
    pub fn new(length: u32) -> FlatMemory {
        FlatMemory {
            data: vec![0; length as usize],
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl<'a> From<&'a [u8]> for FlatMemory {
    fn from(s: &'a [u8]) -> FlatMemory {
        FlatMemory { data: Vec::from(s) }
    }
}

impl Storage for FlatMemory {
    fn length(&self) -> u32 {
        self.data.len() as u32
    }

    fn check_range(&self, address: u32, length: u32) -> bool {
        let len = self.data.len() as u32;
        address <= len && address.saturating_add(length) <= len
    }

    fn borrow_slice(&self, address: u32, length: u32) -> Result<&[u8], BoundsError> {
        if self.check_range(address, length) {
            Ok(&self.data[address as usize..(address + length) as usize])
        } else {
            Err(BoundsError::OutOfRange {
                address,
                length,
                size: self.length(),
            })
        }
    }

    fn borrow_slice_mut(&mut self, address: u32, length: u32) -> Result<&mut [u8], BoundsError> {
        if self.check_range(address, length) {
            Ok(&mut self.data[address as usize..(address + length) as usize])
        } else {
            Err(BoundsError::OutOfRange {
                address,
                length,
                size: self.data.len() as u32,
            })
        }
    }
}
