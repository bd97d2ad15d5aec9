//! Relocatable linker for the DPU assembly dialect.
//!
//! Pipeline: [`lexer`] tokenizes, [`parser`] builds the [`ast`], [`liveness`] tracks each
//! [`relocatable::Relocatable`]'s defs/uses/globals. [`link`] absorbs SDK relocatables into an
//! [`executable::Executable`] until every symbol resolves, [`linker_script`] assigns section
//! addresses, [`assigners`] resolves labels/sets/instructions to concrete bytes, and [`image`]
//! emits the four flat binaries plus `addresses.txt`/`values.txt`/`main.S`.

pub mod assigners;
pub mod ast;
pub mod encoder;
pub mod error;
pub mod executable;
pub mod image;
pub mod label;
pub mod lexer;
pub mod link;
pub mod linker_script;
pub mod liveness;
pub mod parser;
pub mod relocatable;
pub mod section;
