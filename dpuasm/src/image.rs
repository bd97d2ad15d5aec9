//! Writes a linked [`Executable`]'s four flat images plus `addresses.txt`/`values.txt`/`main.S`
//! to `bin_dirpath`.
//!
//! Grounded on the retrieved original's `Executable.DumpAssembly` and image writers
//! (`uPIMulator/src/linker/kernel/executable.go`): same four-image split and the same
//! `"<label>: <address>"` text format for the two side-table files.

use std::fs;
use std::path::Path;

use crate::ast::{Directive, Expr, Operand, Statement};
use crate::error::LinkError;
use crate::executable::Executable;
use crate::linker_script::LinkerScript;

/// Writes every linker output file into `bin_dirpath`, creating it if necessary.
pub fn emit(executable: &Executable, linker_script: &LinkerScript, bin_dirpath: &Path) -> Result<(), LinkError> {
    fs::create_dir_all(bin_dirpath)?;

    fs::write(
        bin_dirpath.join("atomic.bin"),
        executable.atomic_byte_stream(linker_script.atomic).to_decimal_lines(),
    )?;
    fs::write(
        bin_dirpath.join("iram.bin"),
        executable.iram_byte_stream(linker_script.iram).to_decimal_lines(),
    )?;
    fs::write(
        bin_dirpath.join("wram.bin"),
        executable.wram_byte_stream(linker_script.wram).to_decimal_lines(),
    )?;
    fs::write(
        bin_dirpath.join("mram.bin"),
        executable.mram_byte_stream(linker_script.mram).to_decimal_lines(),
    )?;

    fs::write(bin_dirpath.join("addresses.txt"), addresses_txt(executable))?;
    fs::write(bin_dirpath.join("values.txt"), values_txt(linker_script))?;
    fs::write(bin_dirpath.join("main.S"), main_s(executable))?;

    Ok(())
}

fn addresses_txt(executable: &Executable) -> String {
    let mut out = String::new();
    for (label, address) in executable.addresses() {
        out.push_str(&format!("{label}: {address}\n"));
    }
    out
}

fn values_txt(linker_script: &LinkerScript) -> String {
    let mut out = String::new();
    for (name, value) in linker_script.constants() {
        out.push_str(&format!("{name}: {value}\n"));
    }
    out
}

/// Concatenated assembly text, benchmark first then every absorbed SDK unit in absorption
/// order — the same order [`Executable::assembly_statements`] walks for layout.
fn main_s(executable: &Executable) -> String {
    let mut out = String::new();
    for statement in executable.assembly_statements() {
        out.push_str(&render_statement(&statement));
        out.push('\n');
    }
    out
}

fn render_expr(expr: &Expr) -> String {
    match expr {
        Expr::Literal(v) => v.to_string(),
        Expr::Symbol(name) => name.clone(),
        Expr::ProgramCounter => ".".to_string(),
    }
}

fn render_operand(operand: &Operand) -> String {
    match operand {
        Operand::Register(r) => format!("${r:?}"),
        Operand::Immediate(expr) => render_expr(expr),
        Operand::Memory { offset, base } => format!("{}(${base:?})", render_expr(offset)),
    }
}

fn render_statement(statement: &Statement) -> String {
    match statement {
        Statement::Label(name) => format!("{name}:"),
        Statement::Directive(Directive::Section(name)) => format!("  .section {name}"),
        Statement::Directive(Directive::Global(name)) => format!("  .global {name}"),
        Statement::Directive(Directive::Set { alias, expr }) => format!("  .set {alias}, {}", render_expr(expr)),
        Statement::Directive(Directive::Zero(expr)) => format!("  .zero {}", render_expr(expr)),
        Statement::Directive(Directive::Byte(values)) => format!(
            "  .byte {}",
            values.iter().map(i64::to_string).collect::<Vec<_>>().join(", ")
        ),
        Statement::Directive(Directive::Half(values)) => format!(
            "  .half {}",
            values.iter().map(i64::to_string).collect::<Vec<_>>().join(", ")
        ),
        Statement::Directive(Directive::Word(values)) => format!(
            "  .word {}",
            values.iter().map(i64::to_string).collect::<Vec<_>>().join(", ")
        ),
        Statement::Directive(Directive::String(s)) => format!("  .string \"{s}\""),
        Statement::Directive(Directive::Block(size)) => format!("  .block {size}"),
        Statement::Instruction { mnemonic, operands } => {
            if operands.is_empty() {
                format!("  {mnemonic}")
            } else {
                let rendered: Vec<String> = operands.iter().map(render_operand).collect();
                format!("  {mnemonic} {}", rendered.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::link;
    use crate::linker_script::Region;
    use crate::relocatable::Relocatable;
    use indexmap::IndexMap;

    fn script() -> LinkerScript {
        LinkerScript::new(
            Region { offset: 0, size: 256 },
            Region { offset: 0, size: 24576 },
            Region { offset: 0, size: 65536 },
            Region { offset: 0, size: 67108864 },
        )
    }

    fn crt0() -> Relocatable {
        Relocatable::from_source(
            link::CRT0_UNIT,
            std::path::PathBuf::new(),
            ".global __sys_end\n.global __sys_used_mram_end\n__sys_end:\n__sys_used_mram_end:\n  HALT\n".to_string(),
        )
        .unwrap()
    }

    #[test]
    fn emit_writes_every_output_file() {
        let benchmark = Relocatable::from_source("bench", std::path::PathBuf::new(), ".global main\nmain:\n  NOP\n".to_string()).unwrap();
        let sdk = IndexMap::from([(link::CRT0_UNIT.to_string(), crt0())]);
        let mut ls = script();
        let executable = link::link(benchmark, &sdk, &mut ls).unwrap();

        let dir = tempfile::tempdir().unwrap();
        emit(&executable, &ls, dir.path()).unwrap();

        for name in ["atomic.bin", "iram.bin", "wram.bin", "mram.bin", "addresses.txt", "values.txt", "main.S"] {
            assert!(dir.path().join(name).exists(), "missing {name}");
        }

        let addresses = fs::read_to_string(dir.path().join("addresses.txt")).unwrap();
        assert!(addresses.contains("main: "));
        assert!(addresses.contains("__sys_end: "));
    }
}
