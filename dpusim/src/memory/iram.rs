//! Instruction SRAM: holds the encoded program image a thread's PC walks.

use super::{BoundsError, FlatMemory, Storage};

#[derive(Clone, Debug, Default)]
pub struct Iram {
    memory: FlatMemory,
}

impl Iram {
    pub fn new(size: u32) -> Iram {
        Iram {
            memory: FlatMemory::new(size),
        }
    }

    pub fn load_image(&mut self, image: &[u8]) {
        self.memory = FlatMemory::from(image);
    }
}

impl Storage for Iram {
    fn length(&self) -> u32 {
        self.memory.length()
    }

    fn check_range(&self, address: u32, length: u32) -> bool {
        self.memory.check_range(address, length)
    }

    fn borrow_slice(&self, address: u32, length: u32) -> Result<&[u8], BoundsError> {
        self.memory.borrow_slice(address, length)
    }

    fn borrow_slice_mut(&mut self, address: u32, length: u32) -> Result<&mut [u8], BoundsError> {
        self.memory.borrow_slice_mut(address, length)
    }
}
