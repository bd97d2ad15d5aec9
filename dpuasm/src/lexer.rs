//! Assembly text → token stream. `pest` derives the tokenizer/recursive-descent parser together
//! from `grammar.pest`; this module is the thin seam the rest of the linker calls through, kept
//! separate from [`crate::parser`] so the two spec components stay distinguishable even though
//! one library produces both.

use pest::Parser;
use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "grammar.pest"]
pub struct Lexer;

pub type Pairs<'i> = pest::iterators::Pairs<'i, Rule>;

/// Tokenizes `source` into the top-level `program` parse tree. Syntax errors (malformed
/// directives, unterminated strings, unrecognized tokens) surface here as `LexError`.
pub fn lex(source: &str) -> Result<Pairs<'_>, crate::error::LexError> {
    Lexer::parse(Rule::program, source)
        .map_err(|e| crate::error::LexError::Pest(Box::new(e)))
}
