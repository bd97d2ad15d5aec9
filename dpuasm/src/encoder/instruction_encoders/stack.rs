//! This ISA has no push/pop stack instructions of its own — subroutine linkage goes through
//! the `RA` register (set by `JL`/`JLR`) and a software-managed stack pointer register (`SP`),
//! not dedicated opcodes. Kept as its own module, empty, for the same category split the
//! retrieved original's encoder uses.
