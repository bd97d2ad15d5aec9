//! The target memory map: region base/size for the four images, and the named constants
//! symbol resolution is allowed to leave unresolved (`executable.unresolved ⊆ linker_constants`).
//!
//! Grounded on the retrieved original's `misc.ConfigLoader` region accessors
//! (`AtomicOffset`/`AtomicSize`/... referenced from `executable.go`'s `*ByteStream` methods) and
//! on the spec's "Linker script `Assign`" step, which places each section's base address from
//! this map.

use indexmap::IndexMap;

use crate::section::{Section, SectionName};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    pub offset: u32,
    pub size: u32,
}

impl Region {
    pub fn end(&self) -> u32 {
        self.offset + self.size
    }

    pub fn contains(&self, address: u32) -> bool {
        address >= self.offset && address < self.end()
    }
}

#[derive(Clone, Debug)]
pub struct LinkerScript {
    pub atomic: Region,
    pub iram: Region,
    pub wram: Region,
    pub mram: Region,
    constants: IndexMap<String, i64>,
}

impl LinkerScript {
    pub fn new(atomic: Region, iram: Region, wram: Region, mram: Region) -> LinkerScript {
        let mut constants = IndexMap::new();
        constants.insert("ATOMIC_OFFSET".to_string(), atomic.offset as i64);
        constants.insert("ATOMIC_SIZE".to_string(), atomic.size as i64);
        constants.insert("IRAM_OFFSET".to_string(), iram.offset as i64);
        constants.insert("IRAM_SIZE".to_string(), iram.size as i64);
        constants.insert("WRAM_OFFSET".to_string(), wram.offset as i64);
        constants.insert("WRAM_SIZE".to_string(), wram.size as i64);
        constants.insert("MRAM_OFFSET".to_string(), mram.offset as i64);
        constants.insert("MRAM_SIZE".to_string(), mram.size as i64);

        LinkerScript {
            atomic,
            iram,
            wram,
            mram,
            constants,
        }
    }

    pub fn region(&self, section_name: SectionName) -> Region {
        match section_name {
            SectionName::ATOMIC => self.atomic,
            SectionName::MRAM => self.mram,
            SectionName::DPU_HOST | SectionName::BSS | SectionName::DATA | SectionName::RODATA => self.wram,
            _ => self.iram,
        }
    }

    pub fn has_linker_constant(&self, name: &str) -> bool {
        self.constants.contains_key(name)
    }

    pub fn linker_constant(&self, name: &str) -> Option<i64> {
        self.constants.get(name).copied()
    }

    pub fn set_linker_constant(&mut self, name: impl Into<String>, value: i64) {
        self.constants.insert(name.into(), value);
    }

    pub fn constants(&self) -> &IndexMap<String, i64> {
        &self.constants
    }

    /// Assigns each section's base address by placing sections into their region in the order
    /// they were added, packing contiguously within the region. The MRAM-resident alignment
    /// rule is `Section::set_address`'s own concern; this only decides where each section
    /// starts.
    pub fn assign(&self, sections: &mut [Section]) {
        let mut cursor = IndexMap::new();
        cursor.insert(SectionName::ATOMIC, self.atomic.offset);
        cursor.insert(SectionName::MRAM, self.mram.offset);

        let mut iram_cursor = self.iram.offset;
        let mut wram_cursor = self.wram.offset;
        let mut atomic_cursor = self.atomic.offset;
        let mut mram_cursor = self.mram.offset;

        for section in sections.iter_mut() {
            match section.section_name {
                SectionName::ATOMIC => {
                    section.set_address(atomic_cursor);
                    atomic_cursor += section.size();
                }
                SectionName::MRAM => {
                    section.set_address(mram_cursor);
                    mram_cursor += section.size();
                }
                SectionName::DPU_HOST | SectionName::BSS | SectionName::DATA | SectionName::RODATA => {
                    section.set_address(wram_cursor);
                    wram_cursor += section.size();
                }
                _ => {
                    section.set_address(iram_cursor);
                    iram_cursor += section.size();
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::section::SectionType;

    fn script() -> LinkerScript {
        LinkerScript::new(
            Region { offset: 0, size: 256 },
            Region { offset: 0, size: 24576 },
            Region { offset: 0, size: 65536 },
            Region { offset: 0, size: 67108864 },
        )
    }

    #[test]
    fn regions_route_by_section_name() {
        let ls = script();
        assert_eq!(ls.region(SectionName::TEXT), ls.iram);
        assert_eq!(ls.region(SectionName::MRAM), ls.mram);
        assert_eq!(ls.region(SectionName::DATA), ls.wram);
    }

    #[test]
    fn assign_packs_sections_contiguously_within_a_region() {
        let ls = script();
        let mut text_a = Section::new(SectionName::TEXT, "a", vec![], SectionType::PROGBITS);
        text_a.cur_label_mut().push_bytes(&[0u8; 4]);
        let mut text_b = Section::new(SectionName::TEXT, "b", vec![], SectionType::PROGBITS);
        text_b.cur_label_mut().push_bytes(&[0u8; 4]);

        let mut sections = vec![text_a, text_b];
        ls.assign(&mut sections);

        assert_eq!(sections[0].address, 0);
        assert_eq!(sections[1].address, 4);
    }

    #[test]
    fn linker_constants_seed_from_the_memory_map() {
        let ls = script();
        assert!(ls.has_linker_constant("MRAM_SIZE"));
        assert_eq!(ls.linker_constant("MRAM_SIZE"), Some(67108864));
    }
}
