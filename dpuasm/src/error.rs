//! Error taxonomy for the linker, one closed `thiserror` enum per phase.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LexError {
    #[error("{0}")]
    Pest(#[from] Box<pest::error::Error<crate::lexer::Rule>>),
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error("invalid integer literal {text:?}: {source}")]
    InvalidInt {
        text: String,
        #[source]
        source: std::num::ParseIntError,
    },

    #[error("invalid register name {0:?}")]
    InvalidRegister(String),

    #[error(".zero expects a program-counter expression, got {0:?}")]
    NotProgramCounterExpr(String),

    #[error("malformed statement: {0}")]
    Malformed(String),
}

#[derive(Error, Debug)]
pub enum LinkError {
    #[error("label {0:?} is duplicated")]
    DuplicateLabel(String),

    #[error("unresolved symbol(s) after a full absorption pass with no progress: {0:?}")]
    UnresolvedSymbols(Vec<String>),

    #[error("required symbol {0:?} is missing from the executable")]
    MissingRequiredSymbol(&'static str),

    #[error("expected pointer {0:?} missing from addresses.txt")]
    MissingPointer(String),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("mnemonic {mnemonic:?} has no encoding for the given operand shape")]
    UnrepresentableOperands { mnemonic: String },

    #[error("immediate {value} does not fit in {width} bits")]
    ImmediateTooWide { value: i64, width: u32 },

    #[error("symbol {0:?} used as an operand was never resolved to an address")]
    UnresolvedOperand(String),
}
