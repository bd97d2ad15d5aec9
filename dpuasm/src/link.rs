//! Symbol resolution and the top-level pipeline that turns a benchmark relocatable plus an SDK
//! catalogue into a fully laid-out [`Executable`].
//!
//! Grounded on the retrieved original's absorption loop
//! (`uPIMulator/src/linker/linker.go`'s `for !this.HasResolved()`), with the no-progress guard
//! the original lacks: a full pass over the SDK catalogue that absorbs nothing while symbols
//! remain unresolved is a fatal `LinkError::UnresolvedSymbols`, not a spin.

use indexmap::IndexMap;

use crate::assigners;
use crate::error::LinkError;
use crate::executable::Executable;
use crate::linker_script::LinkerScript;
use crate::relocatable::Relocatable;

/// Every DPU program's implicit entry point. Absorbed unconditionally before the resolution
/// loop starts, regardless of whether the benchmark happens to reference it directly.
pub const CRT0_UNIT: &str = "misc.crt0";

/// Symbols every executable must resolve to, checked once linking finishes.
const REQUIRED_SYMBOLS: &[&str] = &["__sys_end", "__sys_used_mram_end"];

/// Absorbs SDK relocatables into `executable` until every used symbol is either defined or a
/// linker constant.
pub fn resolve(executable: &mut Executable, sdk: &IndexMap<String, Relocatable>, linker_script: &LinkerScript) -> Result<(), LinkError> {
    let crt0 = sdk.get(CRT0_UNIT).ok_or(LinkError::MissingRequiredSymbol("misc.crt0"))?;
    executable.add_sdk_relocatable(crt0.clone());

    loop {
        let unresolved = remaining_unresolved(executable, linker_script);
        if unresolved.is_empty() {
            return Ok(());
        }

        let mut absorbed_any = false;
        for relocatable in sdk.values() {
            if executable.sdk_relocatables.contains_key(&relocatable.name) {
                continue;
            }
            let defines_unresolved = relocatable.liveness.globals().iter().any(|g| unresolved.contains(g));
            if defines_unresolved {
                executable.add_sdk_relocatable(relocatable.clone());
                absorbed_any = true;
            }
        }

        if !absorbed_any {
            return Err(LinkError::UnresolvedSymbols(unresolved.into_iter().collect()));
        }
    }
}

fn remaining_unresolved(executable: &Executable, linker_script: &LinkerScript) -> indexmap::IndexSet<String> {
    executable
        .unresolved_symbols()
        .into_iter()
        .filter(|s| !linker_script.has_linker_constant(s))
        .collect()
}

/// Adopts `benchmark`, absorbs the SDK units needed to resolve it, then lays out sections and
/// encodes every instruction. Returns the finished executable, ready for [`crate::image`].
pub fn link(benchmark: Relocatable, sdk: &IndexMap<String, Relocatable>, linker_script: &mut LinkerScript) -> Result<Executable, LinkError> {
    let mut executable = Executable::new(benchmark.name.clone());
    executable.set_benchmark_relocatable(benchmark);

    resolve(&mut executable, sdk, linker_script)?;

    assigners::assign_labels(&mut executable)?;
    linker_script.assign(&mut executable.sections);
    assigners::assign_instructions(&mut executable, linker_script)?;

    for symbol in REQUIRED_SYMBOLS {
        if !executable.addresses().contains_key(*symbol) && !linker_script.has_linker_constant(symbol) {
            return Err(LinkError::MissingRequiredSymbol(symbol));
        }
    }

    Ok(executable)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::linker_script::Region;

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
            CRT0_UNIT,
            std::path::PathBuf::new(),
            ".global __sys_end\n.global __sys_used_mram_end\n__sys_end:\n__sys_used_mram_end:\n  HALT\n".to_string(),
        )
        .unwrap()
    }

    #[test]
    fn crt0_is_absorbed_unconditionally() {
        let mut exe = Executable::new("bench");
        let sdk = IndexMap::from([(CRT0_UNIT.to_string(), crt0())]);
        let ls = script();

        resolve(&mut exe, &sdk, &ls).unwrap();

        assert!(exe.sdk_relocatables.contains_key(CRT0_UNIT));
    }

    #[test]
    fn unresolved_symbol_with_no_progress_is_an_error() {
        let mut exe = Executable::new("bench");
        let benchmark = Relocatable::from_source("bench", std::path::PathBuf::new(), "main:\n  LI $V0, missing\n".to_string()).unwrap();
        exe.set_benchmark_relocatable(benchmark);

        let sdk = IndexMap::from([(CRT0_UNIT.to_string(), crt0())]);
        let ls = script();

        let err = resolve(&mut exe, &sdk, &ls).unwrap_err();
        assert!(matches!(err, LinkError::UnresolvedSymbols(_)));
    }

    #[test]
    fn empty_benchmark_links_and_produces_addresses_for_required_symbols() {
        let benchmark = Relocatable::from_source("bench", std::path::PathBuf::new(), ".global main\nmain:\n".to_string()).unwrap();
        let sdk = IndexMap::from([(CRT0_UNIT.to_string(), crt0())]);
        let mut ls = script();

        let exe = link(benchmark, &sdk, &mut ls).unwrap();

        let addresses = exe.addresses();
        assert!(addresses.contains_key("__sys_end"));
        assert!(addresses.contains_key("main"));
    }
}
