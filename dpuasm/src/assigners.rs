//! Label, Set, and Instruction assigners: the three passes that turn a linked executable's flat
//! statement stream into a section/label skeleton, resolved `.set` aliases, and encoded
//! instruction bytes.
//!
//! Grounded on the retrieved original's `Assign` family
//! (`uPIMulator/src/linker/kernel/*assigner*.go`): same label-then-address-then-set-then-encode
//! ordering, adapted to this crate's placeholder-then-overwrite label image.

use indexmap::IndexMap;

use crate::ast::{Directive, Expr, Statement};
use crate::encoder;
use crate::error::LinkError;
use crate::executable::Executable;
use crate::linker_script::LinkerScript;
use crate::section::{SectionName, SectionType};
use util::EnumFromStr;

/// Byte width a statement contributes to its label's image. Purely structural: no address or
/// symbol lookup is needed, since every instruction in this ISA is a fixed 4 bytes and every
/// data directive's width comes from its own literal contents. `.zero` is restricted by the
/// grammar to the bare program-counter token, so it never contributes bytes.
fn statement_width(statement: &Statement) -> u32 {
    match statement {
        Statement::Label(_) => 0,
        Statement::Directive(Directive::Section(_)) => 0,
        Statement::Directive(Directive::Global(_)) => 0,
        Statement::Directive(Directive::Set { .. }) => 0,
        Statement::Directive(Directive::Zero(_)) => 0,
        Statement::Directive(Directive::Byte(values)) => values.len() as u32,
        Statement::Directive(Directive::Half(values)) => values.len() as u32 * 2,
        Statement::Directive(Directive::Word(values)) => values.len() as u32 * 4,
        Statement::Directive(Directive::String(s)) => s.len() as u32 + 1,
        Statement::Directive(Directive::Block(size)) => *size,
        Statement::Instruction { .. } => encoder::INSTRUCTION_SIZE,
    }
}

fn section_name_from_directive(name: &str) -> Result<SectionName, LinkError> {
    SectionName::from_str(name.trim_start_matches('.'))
        .map_err(|_| LinkError::Parse(crate::error::ParseError::Malformed(format!("unknown section {name:?}"))))
}

/// Walks the executable's flat statement stream (benchmark then every absorbed SDK unit, in
/// absorption order) and populates each section's labels, pushing zero-byte placeholders of the
/// correct width so label/section sizes are already accurate before addresses are assigned.
/// Every absorbed unit shares one section per name under the executable's own name — the
/// statement stream was already concatenated during resolution, so unit boundaries no longer
/// matter for layout.
pub fn assign_labels(executable: &mut Executable) -> Result<(), LinkError> {
    let unit_name = executable.name.clone();

    executable.add_section(SectionName::TEXT, unit_name.as_str(), vec![], SectionType::PROGBITS);
    executable.checkout_section(SectionName::TEXT, &unit_name);

    for statement in executable.assembly_statements() {
        match &statement {
            Statement::Directive(Directive::Section(name)) => {
                let section_name = section_name_from_directive(name)?;
                let section_type = if section_name == SectionName::BSS {
                    SectionType::NOBITS
                } else {
                    SectionType::PROGBITS
                };
                executable.add_section(section_name, unit_name.as_str(), vec![], section_type);
                executable.checkout_section(section_name, &unit_name);
            }
            Statement::Label(name) => {
                executable.cur_section().append_label(name.clone());
                executable.cur_section().checkout_label(name);
            }
            other => {
                let width = statement_width(other);
                let label = executable.cur_section().cur_label_mut();
                label.statements.push(other.clone());
                if width > 0 {
                    label.push_bytes(&vec![0u8; width as usize]);
                }
            }
        }
    }

    check_labels_unique(executable)
}

/// Two SDK units that each declare `.global foo` collide once merged, since global symbols are
/// never renamed (only locals are, in [`crate::relocatable::Relocatable::rename_locals`]).
fn check_labels_unique(executable: &Executable) -> Result<(), LinkError> {
    let mut seen = std::collections::HashSet::new();
    for section in &executable.sections {
        for label in &section.labels {
            if !seen.insert(label.name.clone()) {
                return Err(LinkError::DuplicateLabel(label.name.clone()));
            }
        }
    }
    Ok(())
}

fn eval_expr(expr: &Expr, current_address: i64, addresses: &IndexMap<String, u32>, linker_script: &LinkerScript) -> Result<i64, LinkError> {
    match expr {
        Expr::Literal(v) => Ok(*v),
        Expr::ProgramCounter => Ok(current_address),
        Expr::Symbol(name) => addresses
            .get(name)
            .map(|a| *a as i64)
            .or_else(|| linker_script.linker_constant(name))
            .ok_or_else(|| LinkError::MissingPointer(name.clone())),
    }
}

/// Re-walks every section's labels (addresses already assigned by [`LinkerScript::assign`]),
/// resolving `.set` aliases into linker constants and replacing each label's placeholder image
/// with the real encoded bytes. `current_address` tracks the running PC across a label's
/// statements so branch/jump offsets and `.set .` both see the right value.
pub fn assign_instructions(executable: &mut Executable, linker_script: &mut LinkerScript) -> Result<(), LinkError> {
    let addresses = executable.addresses();

    for section in executable.sections.iter_mut() {
        for label in section.labels.iter_mut() {
            label.clear();
            let mut offset = label.address;
            let statements = label.statements.clone();

            for statement in &statements {
                match statement {
                    Statement::Directive(Directive::Set { alias, expr }) => {
                        let value = eval_expr(expr, offset as i64, &addresses, linker_script)?;
                        linker_script.set_linker_constant(alias.clone(), value);
                    }
                    Statement::Directive(Directive::Byte(values)) => {
                        for v in values {
                            label.push_bytes(&[*v as u8]);
                        }
                    }
                    Statement::Directive(Directive::Half(values)) => {
                        for v in values {
                            label.push_bytes(&(*v as u16).to_le_bytes());
                        }
                    }
                    Statement::Directive(Directive::Word(values)) => {
                        for v in values {
                            label.push_bytes(&(*v as u32).to_le_bytes());
                        }
                    }
                    Statement::Directive(Directive::String(s)) => {
                        label.push_bytes(s.as_bytes());
                        label.push_bytes(&[0]);
                    }
                    Statement::Directive(Directive::Block(size)) => {
                        label.push_bytes(&vec![0u8; *size as usize]);
                    }
                    Statement::Directive(Directive::Zero(_))
                    | Statement::Directive(Directive::Section(_))
                    | Statement::Directive(Directive::Global(_))
                    | Statement::Label(_) => {}
                    Statement::Instruction { mnemonic, operands } => {
                        let resolve = |name: &str| {
                            addresses
                                .get(name)
                                .map(|a| *a as i64)
                                .or_else(|| linker_script.linker_constant(name))
                        };
                        let bytes = encoder::encode(mnemonic, operands, offset, &resolve)?;
                        label.push_bytes(&bytes);
                    }
                }
                offset += statement_width(statement);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::linker_script::Region;
    use crate::relocatable::Relocatable;

    fn script() -> LinkerScript {
        LinkerScript::new(
            Region { offset: 0, size: 256 },
            Region { offset: 0, size: 24576 },
            Region { offset: 0, size: 65536 },
            Region { offset: 0, size: 67108864 },
        )
    }

    #[test]
    fn label_assigner_sizes_match_instruction_count() {
        let source = "main:\n  NOP\n  HALT\n";
        let relocatable = Relocatable::from_source("bench", std::path::PathBuf::new(), source.to_string()).unwrap();

        let mut executable = Executable::new("bench");
        executable.set_benchmark_relocatable(relocatable);
        assign_labels(&mut executable).unwrap();

        let section = executable.section(SectionName::TEXT, "bench").unwrap();
        assert_eq!(section.size(), 8);
    }

    #[test]
    fn instruction_assigner_encodes_halt_in_place() {
        let source = "main:\n  HALT\n";
        let relocatable = Relocatable::from_source("bench", std::path::PathBuf::new(), source.to_string()).unwrap();

        let mut executable = Executable::new("bench");
        executable.set_benchmark_relocatable(relocatable);
        assign_labels(&mut executable).unwrap();

        let mut ls = script();
        ls.assign(&mut executable.sections);
        assign_instructions(&mut executable, &mut ls).unwrap();

        let section = executable.section(SectionName::TEXT, "bench").unwrap();
        let label = section.label("main").unwrap();
        assert_eq!(label.image().as_slice(), encoder::encode_instruction(dpusim::isa::OpCode::HALT, "halt", &[], 0, &|_| None).unwrap());
    }

    #[test]
    fn set_alias_becomes_a_linker_constant() {
        let source = "main:\n  .set alias, 42\n  NOP\n";
        let relocatable = Relocatable::from_source("bench", std::path::PathBuf::new(), source.to_string()).unwrap();

        let mut executable = Executable::new("bench");
        executable.set_benchmark_relocatable(relocatable);
        assign_labels(&mut executable).unwrap();

        let mut ls = script();
        ls.assign(&mut executable.sections);
        assign_instructions(&mut executable, &mut ls).unwrap();

        assert_eq!(ls.linker_constant("alias"), Some(42));
    }

    #[test]
    fn duplicate_global_label_across_absorbed_units_is_an_error() {
        use crate::relocatable::Relocatable;

        let benchmark = Relocatable::from_source("bench", std::path::PathBuf::new(), ".global foo\nfoo:\n  NOP\n".to_string()).unwrap();
        let other = Relocatable::from_source("sdk.other", std::path::PathBuf::new(), ".global foo\nfoo:\n  NOP\n".to_string()).unwrap();

        let mut executable = Executable::new("bench");
        executable.set_benchmark_relocatable(benchmark);
        executable.add_sdk_relocatable(other);

        assert!(matches!(assign_labels(&mut executable), Err(LinkError::DuplicateLabel(_))));
    }
}
