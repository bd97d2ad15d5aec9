//! Token stream → statement AST: directives, label declarations, and instructions.

use pest::iterators::Pair;
use util::EnumFromStr;

use crate::ast::{Directive, Expr, Operand, Statement};
use crate::error::ParseError;
use crate::lexer::Rule;
use dpusim::isa::Register;

pub fn parse(source: &str) -> Result<Vec<Statement>, ParseError> {
    let mut pairs = crate::lexer::lex(source)?;
    let program = pairs.next().expect("program rule always produces one pair");

    let mut statements = Vec::new();
    for pair in program.into_inner() {
        match pair.as_rule() {
            Rule::EOI => {}
            Rule::label_decl => statements.push(parse_label(pair)?),
            Rule::section_directive => statements.push(Statement::Directive(Directive::Section(
                inner_text(pair, 0),
            ))),
            Rule::global_directive => {
                statements.push(Statement::Directive(Directive::Global(inner_text(pair, 0))))
            }
            Rule::set_directive => statements.push(parse_set(pair)?),
            Rule::zero_directive => statements.push(parse_zero(pair)?),
            Rule::byte_directive => statements.push(Statement::Directive(Directive::Byte(parse_int_list(pair)?))),
            Rule::half_directive => statements.push(Statement::Directive(Directive::Half(parse_int_list(pair)?))),
            Rule::word_directive => statements.push(Statement::Directive(Directive::Word(parse_int_list(pair)?))),
            Rule::string_directive => statements.push(Statement::Directive(Directive::String(parse_string(pair)?))),
            Rule::block_directive => statements.push(Statement::Directive(Directive::Block(parse_block(pair)?))),
            Rule::instruction => statements.push(parse_instruction(pair)?),
            other => return Err(ParseError::Malformed(format!("unexpected top-level rule {other:?}"))),
        }
    }

    Ok(statements)
}

fn inner_text(pair: Pair<Rule>, index: usize) -> String {
    pair.into_inner().nth(index).unwrap().as_str().to_string()
}

fn parse_label(pair: Pair<Rule>) -> Result<Statement, ParseError> {
    let name = pair.into_inner().next().unwrap().as_str().to_string();
    Ok(Statement::Label(name))
}

fn parse_int(text: &str) -> Result<i64, ParseError> {
    let (text, negative) = match text.strip_prefix('-') {
        Some(rest) => (rest, true),
        None => (text, false),
    };

    let value = if let Some(hex) = text.strip_prefix("0x") {
        i64::from_str_radix(hex, 16)
    } else if let Some(oct) = text.strip_prefix("0o") {
        i64::from_str_radix(oct, 8)
    } else if let Some(bin) = text.strip_prefix("0b") {
        i64::from_str_radix(bin, 2)
    } else {
        text.parse::<i64>()
    }
    .map_err(|source| ParseError::InvalidInt {
        text: text.to_string(),
        source,
    })?;

    Ok(if negative { -value } else { value })
}

fn parse_expr(pair: Pair<Rule>) -> Result<Expr, ParseError> {
    match pair.as_rule() {
        Rule::pc_expr => Ok(Expr::ProgramCounter),
        Rule::int_literal => Ok(Expr::Literal(parse_int(pair.as_str())?)),
        Rule::identifier => Ok(Expr::Symbol(pair.as_str().to_string())),
        other => Err(ParseError::Malformed(format!("expected expression, got {other:?}"))),
    }
}

fn parse_set(pair: Pair<Rule>) -> Result<Statement, ParseError> {
    let mut inner = pair.into_inner();
    let alias = inner.next().unwrap().as_str().to_string();
    let expr = parse_expr(inner.next().unwrap())?;
    Ok(Statement::Directive(Directive::Set { alias, expr }))
}

fn parse_zero(pair: Pair<Rule>) -> Result<Statement, ParseError> {
    let expr_pair = pair.into_inner().next().unwrap();
    let text = expr_pair.as_str().to_string();
    let expr = parse_expr(expr_pair)?;
    if expr != Expr::ProgramCounter {
        return Err(ParseError::NotProgramCounterExpr(text));
    }
    Ok(Statement::Directive(Directive::Zero(expr)))
}

fn parse_int_list(pair: Pair<Rule>) -> Result<Vec<i64>, ParseError> {
    let list_pair = pair.into_inner().next().unwrap();
    list_pair
        .into_inner()
        .map(|p| parse_int(p.as_str()))
        .collect()
}

fn parse_string(pair: Pair<Rule>) -> Result<String, ParseError> {
    let lit = pair.into_inner().next().unwrap().as_str();
    Ok(lit[1..lit.len() - 1].to_string())
}

fn parse_block(pair: Pair<Rule>) -> Result<u32, ParseError> {
    let text = pair.into_inner().next().unwrap().as_str();
    let value = parse_int(text)?;
    Ok(value as u32)
}

fn parse_register(pair: Pair<Rule>) -> Result<Register, ParseError> {
    let name = pair.as_str().trim_start_matches('$');
    Register::from_str(name).map_err(|_| ParseError::InvalidRegister(name.to_string()))
}

fn parse_operand(pair: Pair<Rule>) -> Result<Operand, ParseError> {
    match pair.as_rule() {
        Rule::register => Ok(Operand::Register(parse_register(pair)?)),
        Rule::mem_operand => {
            let mut inner = pair.into_inner();
            let offset = parse_expr(inner.next().unwrap())?;
            let base = parse_register(inner.next().unwrap())?;
            Ok(Operand::Memory { offset, base })
        }
        Rule::pc_expr | Rule::int_literal | Rule::identifier => Ok(Operand::Immediate(parse_expr(pair)?)),
        other => Err(ParseError::Malformed(format!("unexpected operand rule {other:?}"))),
    }
}

fn parse_instruction(pair: Pair<Rule>) -> Result<Statement, ParseError> {
    let mut inner = pair.into_inner();
    let mnemonic = inner.next().unwrap().as_str().to_string();

    let operands = match inner.next() {
        Some(list) => list.into_inner().map(parse_operand).collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };

    Ok(Statement::Instruction { mnemonic, operands })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_label_and_halt() {
        let statements = parse("main:\n  HALT\n").unwrap();
        assert_eq!(statements[0], Statement::Label("main".to_string()));
        assert_eq!(
            statements[1],
            Statement::Instruction {
                mnemonic: "HALT".to_string(),
                operands: vec![],
            }
        );
    }

    #[test]
    fn parses_byte_directive_with_signed_and_hex_values() {
        let statements = parse(".byte 1, -45, 0xFF\n").unwrap();
        assert_eq!(
            statements[0],
            Statement::Directive(Directive::Byte(vec![1, -45, 255]))
        );
    }

    #[test]
    fn rejects_zero_directive_without_pc_expr() {
        let err = parse(".zero 4\n").unwrap_err();
        assert!(matches!(err, ParseError::NotProgramCounterExpr(_)));
    }

    #[test]
    fn parses_load_with_memory_operand() {
        let statements = parse("LW $T0, 4($SP)\n").unwrap();
        match &statements[0] {
            Statement::Instruction { mnemonic, operands } => {
                assert_eq!(mnemonic, "LW");
                assert_eq!(operands.len(), 2);
            }
            other => panic!("unexpected statement {other:?}"),
        }
    }
}
