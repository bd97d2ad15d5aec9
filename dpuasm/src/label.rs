//! A label: a name, an address, a size, the statements between it and the next label, and the
//! bytes those statements encode to. Labels own their statements exclusively; they never
//! back-pointer to the section that contains them.

use crate::ast::Statement;
use util::ByteStream;

#[derive(Clone, Debug)]
pub struct Label {
    pub name: String,
    pub address: u32,
    pub statements: Vec<Statement>,
    image: ByteStream,
}

impl Label {
    pub fn new(name: impl Into<String>) -> Label {
        Label {
            name: name.into(),
            address: 0,
            statements: Vec::new(),
            image: ByteStream::new(),
        }
    }

    /// Sum of the statement-emitted bytes — set once the instruction assigner has encoded every
    /// statement into `image`.
    pub fn size(&self) -> u32 {
        self.image.size() as u32
    }

    pub fn image(&self) -> &ByteStream {
        &self.image
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.image.extend_from_slice(bytes);
    }

    /// Discards the image so it can be rebuilt from scratch — used when the instruction
    /// assigner replaces a label's placeholder bytes with its real encoded bytes.
    pub fn clear(&mut self) {
        self.image = ByteStream::new();
    }
}
