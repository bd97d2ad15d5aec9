//! MRAM: wordline-granular DRAM behind the timing-aware [`super::controller::MemoryController`].
//!
//! Grounded on the retrieved original's `Mram`/`Wordline` (`uPIMulator/src/simulator/dpu/dram/
//! {mram,wordline}.go`): same invariants, same JSON snapshot shape, reworked into `Storage` plus
//! explicit `serde` (de)serialization instead of hand-rolled `MarshalJSON`.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use util::ByteStream;

use super::BoundsError;

/// Corrupt or structurally invalid MRAM/WRAM snapshot JSON.
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("failed to read snapshot file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("snapshot wordline at address {address} has size {actual}, expected {expected}")]
    WordlineSizeMismatch {
        address: u32,
        actual: usize,
        expected: u32,
    },
}

/// The minimum MRAM storage quantum. Read returns a copy; write overwrites from offset 0 —
/// alignment of the source write is the caller's responsibility.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wordline {
    address: u32,
    size: u32,
    byte_stream: ByteStream,
}

impl Wordline {
    pub fn new(address: u32, size: u32) -> Wordline {
        Wordline {
            address,
            size,
            byte_stream: ByteStream::with_size(size as usize),
        }
    }

    pub fn address(&self) -> u32 {
        self.address
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn read(&self) -> ByteStream {
        self.byte_stream.clone()
    }

    /// Overwrite from offset 0. Per the adopted contract for sub-wordline writes: inputs no
    /// larger than `size` are accepted and written from offset 0; larger inputs are rejected
    /// instead of silently truncated or overrunning.
    pub fn write(&mut self, input: &ByteStream) -> Result<(), BoundsError> {
        if input.size() > self.size as usize {
            return Err(BoundsError::OutOfRange {
                address: self.address,
                length: input.size() as u32,
                size: self.size,
            });
        }

        for i in 0..input.size() {
            self.byte_stream.set(i, input.get(i));
        }
        for i in input.size()..self.size as usize {
            self.byte_stream.set(i, 0);
        }

        Ok(())
    }
}

/// MRAM: an array of [`Wordline`]s of configured `wordline_size` bytes, based at `mram_offset`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Mram {
    address: u32,
    size: u32,
    wordlines: Vec<Wordline>,
}

impl Mram {
    /// `address % wordline_size == 0`, `size % wordline_size == 0`,
    /// `wordline_size % (mram_data_width/8) == 0` are all preconditions enforced by
    /// [`crate::config::Config::validate`]; this constructor only assumes `wordline_size > 0`.
    pub fn new(address: u32, size: u32, wordline_size: u32) -> Mram {
        debug_assert_eq!(address % wordline_size, 0);
        debug_assert_eq!(size % wordline_size, 0);

        let count = size / wordline_size;
        let wordlines = (0..count)
            .map(|i| Wordline::new(address + i * wordline_size, wordline_size))
            .collect();

        Mram {
            address,
            size,
            wordlines,
        }
    }

    pub fn address(&self) -> u32 {
        self.address
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    fn index(&self, address: u32) -> Result<usize, BoundsError> {
        if address < self.address || address >= self.address + self.size {
            return Err(BoundsError::OutOfRange {
                address,
                length: 0,
                size: self.size,
            });
        }

        let wordline_size = self.wordlines[0].size();
        let offset = address - self.address;
        if offset % wordline_size != 0 {
            return Err(BoundsError::Misaligned {
                address,
                granularity: wordline_size,
            });
        }

        Ok((offset / wordline_size) as usize)
    }

    pub fn read(&self, address: u32) -> Result<ByteStream, BoundsError> {
        Ok(self.wordlines[self.index(address)?].read())
    }

    pub fn write(&mut self, address: u32, input: &ByteStream) -> Result<(), BoundsError> {
        let idx = self.index(address)?;
        self.wordlines[idx].write(input)
    }

    pub fn load_image(&mut self, image: &[u8]) {
        let wordline_size = self.wordlines[0].size() as usize;
        for (i, wordline) in self.wordlines.iter_mut().enumerate() {
            let start = i * wordline_size;
            let end = (start + wordline_size).min(image.len());
            let chunk = if start < image.len() {
                &image[start..end]
            } else {
                &[]
            };
            let _ = wordline.write(&ByteStream::from(chunk));
        }
    }

    /// Writes `{address, size, wordlines:[{address,size,byte_stream:[...]}]}`.
    pub fn save_to_json(&self) -> Result<String, ImageError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Loads a previously saved snapshot, validating each wordline's size matches this MRAM's
    /// configured wordline size.
    pub fn replace_from_json(&mut self, json: &str) -> Result<(), ImageError> {
        let loaded: Mram = serde_json::from_str(json)?;
        let expected = self.wordlines[0].size();

        for wordline in &loaded.wordlines {
            if wordline.size() != expected {
                return Err(ImageError::WordlineSizeMismatch {
                    address: wordline.address(),
                    actual: wordline.size() as usize,
                    expected,
                });
            }
        }

        *self = loaded;
        Ok(())
    }

    /// `load_local=1` snapshot restore: reports found/not-found rather than treating a missing
    /// file as fatal.
    pub fn try_load(&mut self, path: &std::path::Path) -> Result<bool, ImageError> {
        if !path.exists() {
            return Ok(false);
        }
        let json = std::fs::read_to_string(path)?;
        self.replace_from_json(&json)?;
        Ok(true)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn wordline_rejects_oversized_write() {
        let mut wl = Wordline::new(0, 4);
        let input = ByteStream::from(&[1u8, 2, 3, 4, 5][..]);
        assert!(wl.write(&input).is_err());
    }

    #[test]
    fn wordline_write_from_offset_zero() {
        let mut wl = Wordline::new(0, 4);
        let input = ByteStream::from(&[9u8, 9][..]);
        wl.write(&input).unwrap();
        assert_eq!(wl.read().as_slice(), &[9, 9, 0, 0]);
    }

    #[test]
    fn mram_alignment_enforced_on_read() {
        let mram = Mram::new(0, 64, 32);
        assert!(mram.read(16).is_err());
        assert!(mram.read(32).is_ok());
    }

    #[test]
    fn snapshot_round_trip_is_identity() {
        let mut mram = Mram::new(0, 64, 32);
        mram.write(32, &ByteStream::from(&[1u8, 2, 3][..])).unwrap();

        let json = mram.save_to_json().unwrap();
        let mut restored = Mram::new(0, 64, 32);
        restored.replace_from_json(&json).unwrap();

        assert_eq!(restored.wordlines, mram.wordlines);
    }
}
