//! End-to-end linker scenarios exercised through the public `link`/`image` API, one test per
//! scenario grounded in a concrete SDK-absorption behavior a unit test on a single module can't
//! show by itself.

use indexmap::IndexMap;

use dpuasm::error::LinkError;
use dpuasm::link::{self, CRT0_UNIT};
use dpuasm::linker_script::{LinkerScript, Region};
use dpuasm::relocatable::Relocatable;

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

/// Two SDK units each define a non-global label `foo`. After absorption the executable must not
/// report it as duplicated: local-symbol renaming prefixes each `foo` with its own unit name.
#[test]
fn local_labels_of_the_same_name_across_units_do_not_collide() {
    let benchmark = Relocatable::from_source(
        "bench",
        std::path::PathBuf::new(),
        ".global main\nmain:\n  JL misc.helper.routine\n  HALT\n".to_string(),
    )
    .unwrap();

    let helper = Relocatable::from_source(
        "misc.helper",
        std::path::PathBuf::new(),
        ".global routine\nrouting_detail:\nroutine:\n  JMP foo\nfoo:\n  JR $RA\n".to_string(),
    )
    .unwrap();
    let other = Relocatable::from_source(
        "misc.other",
        std::path::PathBuf::new(),
        ".global unused_other\nunused_other:\nfoo:\n  JR $RA\n".to_string(),
    )
    .unwrap();

    let sdk = IndexMap::from([
        (CRT0_UNIT.to_string(), crt0()),
        ("misc.helper".to_string(), helper),
        ("misc.other".to_string(), other),
    ]);
    let mut ls = script();

    let executable = link::link(benchmark, &sdk, &mut ls).unwrap();

    let addresses = executable.addresses();
    assert!(addresses.contains_key("misc.helper.foo"));
    assert!(!addresses.contains_key("foo"));
}

/// If both SDK units instead declare `.global foo`, linking must abort: global symbols are
/// never renamed, so the names genuinely collide once merged.
#[test]
fn duplicate_global_labels_abort_linking() {
    let benchmark = Relocatable::from_source("bench", std::path::PathBuf::new(), ".global main\nmain:\n  HALT\n".to_string()).unwrap();
    let helper = Relocatable::from_source("misc.helper", std::path::PathBuf::new(), ".global foo\nfoo:\n  JR $RA\n".to_string()).unwrap();
    let other = Relocatable::from_source("misc.other", std::path::PathBuf::new(), ".global foo\nfoo:\n  JR $RA\n".to_string()).unwrap();

    let sdk = IndexMap::from([
        (CRT0_UNIT.to_string(), crt0()),
        ("misc.helper".to_string(), helper),
        ("misc.other".to_string(), other),
    ]);
    let mut ls = script();

    let err = link::link(benchmark, &sdk, &mut ls).unwrap_err();
    assert!(matches!(err, LinkError::DuplicateLabel(_)));
}
