//! Per-relocatable symbol analysis: defs, uses, globals, and the derived locals/unresolved sets.
//!
//! Grounded on the retrieved original's `Liveness` (`uPIMulator/src/linker/kernel/liveness.go`):
//! three insertion-ordered sets, reimplemented with `indexmap::IndexSet` instead of a
//! hand-rolled ordered map, per the "ordered maps keyed by ... string name, preserving insertion
//! order" redesign note.

use indexmap::IndexSet;

use crate::ast::{Directive, Operand, Statement};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Liveness {
    defs: IndexSet<String>,
    uses: IndexSet<String>,
    globals: IndexSet<String>,
}

impl Liveness {
    pub fn new() -> Liveness {
        Liveness::default()
    }

    pub fn add_def(&mut self, name: impl Into<String>) {
        self.defs.insert(name.into());
    }

    pub fn add_use(&mut self, name: impl Into<String>) {
        self.uses.insert(name.into());
    }

    pub fn add_global_symbol(&mut self, name: impl Into<String>) {
        self.globals.insert(name.into());
    }

    pub fn defs(&self) -> &IndexSet<String> {
        &self.defs
    }

    pub fn uses(&self) -> &IndexSet<String> {
        &self.uses
    }

    pub fn globals(&self) -> &IndexSet<String> {
        &self.globals
    }

    /// `defs \ globals`, in `defs`'s insertion order.
    pub fn local_symbols(&self) -> IndexSet<String> {
        self.defs.iter().filter(|d| !self.globals.contains(*d)).cloned().collect()
    }

    /// `uses \ defs`, in `uses`'s insertion order.
    pub fn unresolved_symbols(&self) -> IndexSet<String> {
        self.uses.iter().filter(|u| !self.defs.contains(*u)).cloned().collect()
    }

    /// Unions another unit's liveness into this one (used when an executable absorbs an SDK
    /// relocatable).
    pub fn merge(&mut self, other: &Liveness) {
        self.defs.extend(other.defs.iter().cloned());
        self.uses.extend(other.uses.iter().cloned());
        self.globals.extend(other.globals.iter().cloned());
    }

    /// Prefixes every local (non-global) def with `"<unit_name>."` and rewrites every reference
    /// to that symbol consistently across defs/uses/globals. Applying this twice with the same
    /// `unit_name` is idempotent: the second pass finds no unprefixed locals left to rename.
    pub fn rename_locals(&mut self, unit_name: &str) {
        let prefix = format!("{unit_name}.");
        let locals = self.local_symbols();
        let rename = |name: &str| -> String {
            if locals.contains(name) && !name.starts_with(&prefix) {
                format!("{unit_name}.{name}")
            } else {
                name.to_string()
            }
        };

        self.defs = self.defs.iter().map(|d| rename(d)).collect();
        self.uses = self.uses.iter().map(|u| rename(u)).collect();
        self.globals = self.globals.iter().map(|g| rename(g)).collect();
    }
}

/// Walks a relocatable's parsed statements, building up its [`Liveness`]: every label
/// definition contributes to `defs`, every symbol reference to `uses`, every `.global name` to
/// `globals`.
pub fn analyze(statements: &[Statement]) -> Liveness {
    let mut liveness = Liveness::new();

    for statement in statements {
        match statement {
            Statement::Label(name) => liveness.add_def(name.clone()),
            Statement::Directive(Directive::Global(name)) => liveness.add_global_symbol(name.clone()),
            Statement::Directive(Directive::Set { expr, .. }) => add_expr_use(&mut liveness, expr),
            Statement::Directive(Directive::Zero(expr)) => add_expr_use(&mut liveness, expr),
            Statement::Directive(_) => {}
            Statement::Instruction { operands, .. } => {
                for operand in operands {
                    match operand {
                        Operand::Immediate(expr) => add_expr_use(&mut liveness, expr),
                        Operand::Memory { offset, .. } => add_expr_use(&mut liveness, offset),
                        Operand::Register(_) => {}
                    }
                }
            }
        }
    }

    liveness
}

fn add_expr_use(liveness: &mut Liveness, expr: &crate::ast::Expr) {
    if let crate::ast::Expr::Symbol(name) = expr {
        liveness.add_use(name.clone());
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn locals_and_globals_are_disjoint_and_subset_of_defs() {
        let mut l = Liveness::new();
        l.add_def("main");
        l.add_def("helper");
        l.add_global_symbol("main");

        let locals = l.local_symbols();
        assert!(!locals.contains("main"));
        assert!(locals.contains("helper"));
        assert!(l.local_symbols().is_disjoint(&l.globals));
    }

    #[test]
    fn rename_locals_is_idempotent() {
        let mut l = Liveness::new();
        l.add_def("foo");
        l.add_use("foo");

        l.rename_locals("misc");
        let once = l.clone();
        l.rename_locals("misc");

        assert_eq!(once, l);
    }
}
