//! The linked-but-not-yet-laid-out program: one benchmark relocatable, the SDK relocatables
//! absorbed to resolve it, merged liveness, and (once layout runs) an ordered list of sections.
//!
//! Grounded on the retrieved original's `Executable`
//! (`uPIMulator/src/linker/kernel/executable.go`): same `Section`/`Sort`/`*ByteStream` shape,
//! `indexmap` in place of the Go `orderedmap` dependency per the ordered-collections redesign
//! note.

use indexmap::{IndexMap, IndexSet};

use crate::error::LinkError;
use crate::liveness::Liveness;
use crate::relocatable::Relocatable;
use crate::section::{Section, SectionFlag, SectionName, SectionType};

pub struct Executable {
    pub name: String,
    pub path: std::path::PathBuf,

    pub benchmark_relocatable: Option<Relocatable>,
    pub sdk_relocatables: IndexMap<String, Relocatable>,

    pub statements: Vec<crate::ast::Statement>,
    pub liveness: Liveness,

    pub sections: Vec<Section>,
    cur_section: usize,
}

impl Executable {
    pub fn new(name: impl Into<String>) -> Executable {
        Executable {
            name: name.into(),
            path: std::path::PathBuf::new(),
            benchmark_relocatable: None,
            sdk_relocatables: IndexMap::new(),
            statements: Vec::new(),
            liveness: Liveness::new(),
            sections: Vec::new(),
            cur_section: 0,
        }
    }

    pub fn set_benchmark_relocatable(&mut self, relocatable: Relocatable) {
        self.liveness.merge(&relocatable.liveness);
        self.benchmark_relocatable = Some(relocatable);
    }

    /// Absorbs an SDK unit: renames its locals (scoped to its own name) before merging, so two
    /// SDK units that both define a local symbol of the same name never collide.
    pub fn add_sdk_relocatable(&mut self, mut relocatable: Relocatable) {
        if self.sdk_relocatables.contains_key(&relocatable.name) {
            return;
        }

        relocatable.rename_locals();
        self.liveness.merge(&relocatable.liveness);
        self.sdk_relocatables.insert(relocatable.name.clone(), relocatable);
    }

    /// `uses \ defs`, evaluated against the executable's merged liveness so far.
    pub fn unresolved_symbols(&self) -> IndexSet<String> {
        self.liveness.unresolved_symbols()
    }

    /// Concatenates the benchmark's statements then every absorbed SDK unit's, in absorption
    /// order — this is what gets re-lexed and re-parsed for layout.
    pub fn assembly_statements(&self) -> Vec<crate::ast::Statement> {
        let mut statements = Vec::new();
        if let Some(benchmark) = &self.benchmark_relocatable {
            statements.extend(benchmark.statements.clone());
        }
        for relocatable in self.sdk_relocatables.values() {
            statements.extend(relocatable.statements.clone());
        }
        statements
    }

    pub fn section(&self, section_name: SectionName, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.section_name == section_name && s.user_name == name)
    }

    pub fn section_mut(&mut self, section_name: SectionName, name: &str) -> Option<&mut Section> {
        self.sections.iter_mut().find(|s| s.section_name == section_name && s.user_name == name)
    }

    pub fn add_section(&mut self, section_name: SectionName, name: impl Into<String>, flags: Vec<SectionFlag>, section_type: SectionType) {
        let name = name.into();
        if self.section(section_name, &name).is_none() {
            self.sections.push(Section::new(section_name, name, flags, section_type));
        }
    }

    pub fn checkout_section(&mut self, section_name: SectionName, name: &str) {
        self.cur_section = self
            .sections
            .iter()
            .position(|s| s.section_name == section_name && s.user_name == name)
            .unwrap_or_else(|| panic!("section {section_name:?}/{name} is not found"));
    }

    pub fn cur_section(&mut self) -> &mut Section {
        &mut self.sections[self.cur_section]
    }

    /// The one section (across all of them) that owns a label of this name. Duplicate owners
    /// are a hard error — label names must be globally unique across the whole executable.
    pub fn label(&self, label_name: &str) -> Result<Option<&crate::label::Label>, LinkError> {
        let mut found = None;
        for section in &self.sections {
            if let Some(label) = section.label(label_name) {
                if found.is_some() {
                    return Err(LinkError::DuplicateLabel(label_name.to_string()));
                }
                found = Some(label);
            }
        }
        Ok(found)
    }

    /// Every label's resolved address, in section-then-label order — the contents of
    /// `addresses.txt`.
    pub fn addresses(&self) -> IndexMap<String, u32> {
        let mut addresses = IndexMap::new();
        for section in &self.sections {
            for label in &section.labels {
                addresses.insert(label.name.clone(), label.address);
            }
        }
        addresses
    }

    /// Sections whose base address lies in `[begin, end)`, ascending by address — the
    /// per-image slice `atomic`/`iram`/`wram`/`mram` byte streams are built from.
    pub fn sections_in_range(&self, begin: u32, end: u32) -> Vec<&Section> {
        let mut sections: Vec<&Section> = self.sections.iter().filter(|s| s.address >= begin && s.address < end).collect();
        sections.sort_by_key(|s| s.address);
        sections
    }

    pub fn atomic_byte_stream(&self, region: crate::linker_script::Region) -> util::ByteStream {
        let mut out = util::ByteStream::new();
        for section in self.sections_in_range(region.offset, region.end()) {
            out.merge(&section.to_byte_stream());
        }
        out
    }

    pub fn iram_byte_stream(&self, region: crate::linker_script::Region) -> util::ByteStream {
        self.atomic_byte_stream(region)
    }

    pub fn wram_byte_stream(&self, region: crate::linker_script::Region) -> util::ByteStream {
        self.atomic_byte_stream(region)
    }

    /// MRAM sections are merged address-keyed rather than concatenated, so gaps between
    /// sections are zero-filled at absolute MRAM offsets rather than dropped.
    pub fn mram_byte_stream(&self, region: crate::linker_script::Region) -> util::ByteStream {
        let mut out = util::ByteStream::new();
        for section in self.sections_in_range(region.offset, region.end()) {
            out.merge_at_address(&section.to_byte_stream(), region.offset as u64, section.address as u64);
        }
        out
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::linker_script::Region;

    #[test]
    fn duplicate_label_across_sections_is_an_error() {
        let mut exe = Executable::new("bench");
        exe.add_section(SectionName::TEXT, "bench", vec![], SectionType::PROGBITS);
        exe.add_section(SectionName::DATA, "bench", vec![], SectionType::PROGBITS);

        exe.checkout_section(SectionName::TEXT, "bench");
        exe.cur_section().append_label("dup");

        exe.checkout_section(SectionName::DATA, "bench");
        exe.cur_section().append_label("dup");

        assert!(matches!(exe.label("dup"), Err(LinkError::DuplicateLabel(_))));
    }

    #[test]
    fn mram_byte_stream_zero_fills_gaps_between_sections() {
        let mut exe = Executable::new("bench");
        exe.add_section(SectionName::MRAM, "a", vec![], SectionType::PROGBITS);
        exe.add_section(SectionName::MRAM, "b", vec![], SectionType::PROGBITS);

        exe.checkout_section(SectionName::MRAM, "a");
        exe.cur_section().cur_label_mut().push_bytes(&[1, 2, 3]);
        exe.sections[0].set_address(0);

        exe.checkout_section(SectionName::MRAM, "b");
        exe.cur_section().cur_label_mut().push_bytes(&[9]);
        exe.sections[1].set_address(16);

        let region = Region { offset: 0, size: 64 };
        let bytes = exe.mram_byte_stream(region);

        assert_eq!(bytes.get(0), 1);
        assert_eq!(bytes.get(3), 0);
        assert_eq!(bytes.get(16), 9);
    }
}
