//! Bit/byte-exact buffer with append, get/set, merge, and address-keyed merge.
//!
//! Grounded on `ByteStream` from the retrieved original implementation
//! (`uPIMulator/src/abi/encoding/byte_stream.go`): every linker image and every MRAM wordline
//! is one of these underneath.

use serde::{Deserialize, Serialize};

/// An ordered sequence of bytes. Cheap to clone; owns its storage.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ByteStream {
    bytes: Vec<u8>,
}

impl ByteStream {
    pub fn new() -> ByteStream {
        ByteStream { bytes: Vec::new() }
    }

    /// A stream of `size` zero bytes.
    pub fn with_size(size: usize) -> ByteStream {
        ByteStream {
            bytes: vec![0; size],
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn get(&self, pos: usize) -> u8 {
        self.bytes[pos]
    }

    pub fn set(&mut self, pos: usize, value: u8) {
        self.bytes[pos] = value;
    }

    pub fn append(&mut self, value: u8) {
        self.bytes.push(value);
    }

    pub fn extend_from_slice(&mut self, values: &[u8]) {
        self.bytes.extend_from_slice(values);
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Plain concatenation: `self` grows by `other`'s full contents, in order.
    pub fn merge(&mut self, other: &ByteStream) {
        self.bytes.extend_from_slice(&other.bytes);
    }

    /// Overlay `other` into `self` at the absolute address `other_start_address`, where `self`
    /// is understood to begin at `self_base_address` (the precondition `spec.md` §9 calls out:
    /// "`MergeMemoryBlocks` assumes `this` begins at `mram_offset`"). Grows `self` and
    /// zero-fills any gap between the two regions. Idempotent when the two regions never
    /// overlapping ranges are merged repeatedly with the same inputs.
    pub fn merge_at_address(&mut self, other: &ByteStream, self_base_address: u64, other_start_address: u64) {
        let other_end = other_start_address + other.size() as u64;

        let merged_size = if self.size() > 0 {
            let self_end = self_base_address + self.size() as u64;
            self_end.max(other_end) - self_base_address
        } else {
            other_end - self_base_address
        };

        let mut merged = ByteStream::with_size(merged_size as usize);

        for i in 0..self.size() {
            merged.set(i, self.get(i));
        }

        for i in 0..other.size() {
            let offset = (other_start_address - self_base_address) as usize + i;
            merged.set(offset, other.get(i));
        }

        self.bytes = merged.bytes;
    }

    /// One decimal integer per line, in order — the `*.bin` image format from `spec.md` §6.
    pub fn to_decimal_lines(&self) -> String {
        let mut out = String::with_capacity(self.bytes.len() * 4);
        for b in &self.bytes {
            out.push_str(&b.to_string());
            out.push('\n');
        }
        out
    }

    /// Inverse of [`to_decimal_lines`](Self::to_decimal_lines): parses one unsigned byte value
    /// per non-empty line.
    pub fn from_decimal_lines(text: &str) -> Result<ByteStream, std::num::ParseIntError> {
        let mut bytes = Vec::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            bytes.push(line.parse::<u8>()?);
        }
        Ok(ByteStream { bytes })
    }
}

impl From<Vec<u8>> for ByteStream {
    fn from(bytes: Vec<u8>) -> ByteStream {
        ByteStream { bytes }
    }
}

impl<'a> From<&'a [u8]> for ByteStream {
    fn from(bytes: &'a [u8]) -> ByteStream {
        ByteStream {
            bytes: Vec::from(bytes),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn merge_is_associative() {
        let a = ByteStream::from(&[1u8, 2][..]);
        let b = ByteStream::from(&[3u8, 4][..]);
        let c = ByteStream::from(&[5u8, 6][..]);

        let mut ab_then_c = a.clone();
        ab_then_c.merge(&b);
        ab_then_c.merge(&c);

        let mut bc = b.clone();
        bc.merge(&c);
        let mut a_then_bc = a.clone();
        a_then_bc.merge(&bc);

        assert_eq!(ab_then_c, a_then_bc);
    }

    #[test]
    fn merge_at_address_zero_fills_gap() {
        let mut base = ByteStream::from(&[1u8, 2][..]);
        let overlay = ByteStream::from(&[9u8, 9][..]);

        base.merge_at_address(&overlay, 0, 4);

        assert_eq!(base.as_slice(), &[1, 2, 0, 0, 9, 9]);
    }

    #[test]
    fn merge_at_address_idempotent_on_disjoint_overlays() {
        let mut a = ByteStream::from(&[1u8, 2][..]);
        let overlay = ByteStream::from(&[9u8][..]);

        a.merge_at_address(&overlay, 0, 8);
        let once = a.clone();

        let mut fresh = ByteStream::from(&[1u8, 2][..]);
        fresh.merge_at_address(&overlay, 0, 8);

        assert_eq!(once, fresh);
    }

    #[test]
    fn decimal_round_trip() {
        let bytes = ByteStream::from(&[0u8, 255, 128, 1][..]);
        let text = bytes.to_decimal_lines();
        let parsed = ByteStream::from_decimal_lines(&text).unwrap();
        assert_eq!(bytes, parsed);
    }
}
