//! A single compiled unit: source lines, AST, and liveness. Lexed once, parsed once, liveness
//! analyzed once; local symbols are renamed later, when the unit is absorbed into an executable.

use crate::ast::Statement;
use crate::error::ParseError;
use crate::liveness::{self, Liveness};

#[derive(Clone, Debug)]
pub struct Relocatable {
    pub name: String,
    pub path: std::path::PathBuf,
    pub source: String,
    pub statements: Vec<Statement>,
    pub liveness: Liveness,
}

impl Relocatable {
    /// Lexes, parses, and liveness-analyzes `source` in one pass — this is the unit of work the
    /// linker's parallel phase fans out over.
    pub fn from_source(name: impl Into<String>, path: std::path::PathBuf, source: String) -> Result<Relocatable, ParseError> {
        let statements = crate::parser::parse(&source)?;
        let liveness = liveness::analyze(&statements);

        Ok(Relocatable {
            name: name.into(),
            path,
            source,
            statements,
            liveness,
        })
    }

    /// Prefixes this unit's local symbols with its own name, consistently across its AST and
    /// its liveness sets, so that identically-named locals in different SDK units never
    /// collide once merged into an executable.
    pub fn rename_locals(&mut self) {
        let locals = self.liveness.local_symbols();
        let unit_name = self.name.clone();

        self.liveness.rename_locals(&unit_name);

        for statement in &mut self.statements {
            rename_statement(statement, &unit_name, &locals);
        }
    }
}

fn rename_symbol(name: &str, unit_name: &str, locals: &indexmap::IndexSet<String>) -> String {
    if locals.contains(name) {
        format!("{unit_name}.{name}")
    } else {
        name.to_string()
    }
}

fn rename_statement(statement: &mut Statement, unit_name: &str, locals: &indexmap::IndexSet<String>) {
    use crate::ast::{Directive, Expr, Operand};

    match statement {
        Statement::Label(name) => *name = rename_symbol(name, unit_name, locals),
        Statement::Directive(Directive::Global(name)) => *name = rename_symbol(name, unit_name, locals),
        Statement::Directive(Directive::Set { alias, expr }) => {
            *alias = rename_symbol(alias, unit_name, locals);
            rename_expr(expr, unit_name, locals);
        }
        Statement::Directive(Directive::Zero(expr)) => rename_expr(expr, unit_name, locals),
        Statement::Directive(_) => {}
        Statement::Instruction { operands, .. } => {
            for operand in operands {
                match operand {
                    Operand::Immediate(expr) => rename_expr(expr, unit_name, locals),
                    Operand::Memory { offset, .. } => rename_expr(offset, unit_name, locals),
                    Operand::Register(_) => {}
                }
            }
        }
    }

    fn rename_expr(expr: &mut Expr, unit_name: &str, locals: &indexmap::IndexSet<String>) {
        if let Expr::Symbol(name) = expr {
            *name = rename_symbol(name, unit_name, locals);
        }
    }
}
