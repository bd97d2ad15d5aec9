//! Section metadata and the single address/size/byte-stream layout rule shared by all three.
//!
//! Grounded on the retrieved original's `Section` (`uPIMulator/src/linker/kernel/section.go`):
//! same enclosed enumerations, same MRAM-resident alignment set, same per-section hidden-label
//! prefix strings.

use util::EnumFromStr;
use util_derive::EnumFromStr;

use crate::label::Label;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, EnumFromStr)]
pub enum SectionName {
    ATOMIC,
    BSS,
    DATA,
    DEBUG_ABBREV,
    DEBUG_FRAME,
    DEBUG_INFO,
    DEBUG_LINE,
    DEBUG_LOC,
    DEBUG_RANGES,
    DEBUG_STR,
    DPU_HOST,
    MRAM,
    RODATA,
    STACK_SIZES,
    TEXT,
}

impl SectionName {
    /// The per-section hidden-label prefix, e.g. `"text."` — used to name the default label
    /// every section gets at construction.
    pub fn hidden_label_prefix(self) -> &'static str {
        match self {
            SectionName::ATOMIC => "atomic.",
            SectionName::BSS => "bss.",
            SectionName::DATA => "data.",
            SectionName::DEBUG_ABBREV => "debug_abbrev.",
            SectionName::DEBUG_FRAME => "debug_frame.",
            SectionName::DEBUG_INFO => "debug_info.",
            SectionName::DEBUG_LINE => "debug_line.",
            SectionName::DEBUG_LOC => "debug_loc.",
            SectionName::DEBUG_RANGES => "debug_ranges.",
            SectionName::DEBUG_STR => "debug_str.",
            SectionName::DPU_HOST => "dpu_host.",
            SectionName::MRAM => "mram.",
            SectionName::RODATA => "rodata.",
            SectionName::STACK_SIZES => "stack_sizes.",
            SectionName::TEXT => "text.",
        }
    }

    /// The MRAM-resident set: labels here are placed on 8-byte boundaries rather than packed
    /// contiguously.
    pub fn is_mram_resident(self) -> bool {
        matches!(
            self,
            SectionName::DEBUG_ABBREV
                | SectionName::DEBUG_FRAME
                | SectionName::DEBUG_INFO
                | SectionName::DEBUG_LINE
                | SectionName::DEBUG_LOC
                | SectionName::DEBUG_RANGES
                | SectionName::DEBUG_STR
                | SectionName::STACK_SIZES
                | SectionName::MRAM
        )
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, EnumFromStr)]
pub enum SectionFlag {
    ALLOC,
    WRITE,
    EXECINSTR,
    LINK_ORDER,
    MERGE,
    STRINGS,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, EnumFromStr)]
pub enum SectionType {
    PROGBITS,
    NOBITS,
}

fn pad_to_8(offset: u32) -> u32 {
    (offset + 7) & !7
}

/// A section: an ordered list of labels, the first of which is always the section's own
/// "hidden" label (`<section_name>.<user_name>`), whose address is the section's base.
#[derive(Clone, Debug)]
pub struct Section {
    pub section_name: SectionName,
    pub user_name: String,
    pub flags: Vec<SectionFlag>,
    pub section_type: SectionType,
    pub labels: Vec<Label>,
    pub address: u32,
    cur_label: usize,
}

impl Section {
    pub fn new(section_name: SectionName, user_name: impl Into<String>, flags: Vec<SectionFlag>, section_type: SectionType) -> Section {
        let user_name = user_name.into();
        let hidden_name = format!("{}{}", section_name.hidden_label_prefix(), user_name);

        Section {
            section_name,
            user_name,
            flags,
            section_type,
            labels: vec![Label::new(hidden_name)],
            address: 0,
            cur_label: 0,
        }
    }

    pub fn label(&self, name: &str) -> Option<&Label> {
        self.labels.iter().find(|l| l.name == name)
    }

    pub fn label_mut(&mut self, name: &str) -> Option<&mut Label> {
        self.labels.iter_mut().find(|l| l.name == name)
    }

    /// Appends a new, empty label to the section. Does nothing if a label of that name already
    /// exists — labels are never duplicated within a section.
    pub fn append_label(&mut self, name: impl Into<String>) {
        let name = name.into();
        if self.label(&name).is_none() {
            self.labels.push(Label::new(name));
        }
    }

    /// Points the current-label cursor at an existing label. Panics if the label hasn't been
    /// appended yet — mirrors the retrieved original, where checking out an unknown label is a
    /// programmer error, not a recoverable one.
    pub fn checkout_label(&mut self, name: &str) {
        self.cur_label = self
            .labels
            .iter()
            .position(|l| l.name == name)
            .unwrap_or_else(|| panic!("label {name} is not found"));
    }

    pub fn cur_label(&self) -> &Label {
        &self.labels[self.cur_label]
    }

    pub fn cur_label_mut(&mut self) -> &mut Label {
        &mut self.labels[self.cur_label]
    }

    /// Assigns each label's address starting at `base`. MRAM-resident sections round the
    /// running offset up to the next 8-byte boundary after *every* label, trailing label
    /// included — the same rule `size` and `to_byte_stream` apply, so a label's padding is
    /// always already reflected in the section's total size.
    pub fn set_address(&mut self, base: u32) {
        self.address = base;
        let mut offset = base;

        for label in &mut self.labels {
            label.address = offset;
            offset += label.size();
            if self.section_name.is_mram_resident() {
                offset = pad_to_8(offset);
            }
        }
    }

    /// Sum of label sizes, with the same trailing 8-byte rounding `set_address` applies to
    /// MRAM-resident sections after every label.
    pub fn size(&self) -> u32 {
        let mut offset = 0u32;
        for label in &self.labels {
            offset += label.size();
            if self.section_name.is_mram_resident() {
                offset = pad_to_8(offset);
            }
        }
        offset
    }

    /// Concatenates every label's image, padding to the next 8-byte boundary after each one
    /// for MRAM-resident sections — including the trailing label — so byte-stream emission
    /// agrees with address placement.
    pub fn to_byte_stream(&self) -> util::ByteStream {
        let mut out = util::ByteStream::new();

        for label in &self.labels {
            out.merge(label.image());
            if self.section_name.is_mram_resident() {
                let padded = pad_to_8(out.size() as u32);
                while (out.size() as u32) < padded {
                    out.append(0);
                }
            }
        }

        out
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn mram_alignment_matches_scenario() {
        let mut section = Section::new(SectionName::DEBUG_INFO, "x", vec![], SectionType::PROGBITS);
        section.labels.clear();

        for (name, size) in [("a", 3usize), ("b", 5), ("c", 1)] {
            let mut label = Label::new(name);
            label.push_bytes(&vec![0u8; size]);
            section.labels.push(label);
        }

        section.set_address(0);

        assert_eq!(section.labels[0].address, 0);
        assert_eq!(section.labels[1].address, 8);
        assert_eq!(section.labels[2].address, 16);
        assert_eq!(section.size(), 24);

        let bytes = section.to_byte_stream();
        assert_eq!(bytes.size(), 24);
    }

    #[test]
    fn non_mram_sections_are_contiguous() {
        let mut section = Section::new(SectionName::TEXT, "x", vec![], SectionType::PROGBITS);
        section.labels.clear();

        for (name, size) in [("a", 3usize), ("b", 5)] {
            let mut label = Label::new(name);
            label.push_bytes(&vec![0u8; size]);
            section.labels.push(label);
        }

        section.set_address(0);

        assert_eq!(section.labels[0].address, 0);
        assert_eq!(section.labels[1].address, 3);
        assert_eq!(section.size(), 8);
    }
}
