//! Expression parser
//!
//! Turns raw infix text into an operation tree in three passes:
//! tokenize (with bracket validation), shunting-yard conversion to postfix,
//! and stack-based tree construction.

use std::fmt;

use crate::error::{CalcError, CalcResult};
use crate::types::Operator;

pub mod postfix;
pub mod tree;

#[cfg(test)]
mod tests;

pub use postfix::{postfix_to_string, to_postfix};
pub use tree::{build_tree, build_tree_with_depth, Node, DEFAULT_MAX_DEPTH};

/* ===================== Tokens ===================== */

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Token {
    Number(f64),
    Op(Operator),
    LParen,
    RParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(value) => write!(f, "{}", value),
            Token::Op(op) => write!(f, "{}", op),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
        }
    }
}

/* ===================== Public API ===================== */

/// Parse an infix expression into an operation tree
///
/// Whitespace anywhere in the source is ignored. Every failure here happens
/// before any task exists for the expression.
pub fn parse_expression(source: &str) -> CalcResult<Node> {
    parse_expression_with_depth(source, DEFAULT_MAX_DEPTH)
}

/// Parse with an explicit limit on how deeply operations may nest
pub fn parse_expression_with_depth(source: &str, max_depth: usize) -> CalcResult<Node> {
    let postfix = postfix_expression(source)?;
    build_tree_with_depth(&postfix, max_depth)
}

/// Validate an infix expression and return it in postfix order
pub fn postfix_expression(source: &str) -> CalcResult<Vec<Token>> {
    let expression = strip_whitespace(source);
    if expression.is_empty() {
        return Err(CalcError::EmptyExpression);
    }

    validate_parentheses(&expression)?;
    let tokens = tokenize(&expression)?;
    to_postfix(&tokens)
}

pub fn strip_whitespace(source: &str) -> String {
    source.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Check that every `)` closes an earlier `(` and that none are left open
pub fn validate_parentheses(expression: &str) -> CalcResult<()> {
    let mut depth: usize = 0;

    for (position, c) in expression.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1).ok_or_else(|| {
                    CalcError::malformed(format!("unmatched ')' at position {}", position))
                })?;
            }
            _ => {}
        }
    }

    if depth != 0 {
        return Err(CalcError::malformed(format!("{} unclosed '('", depth)));
    }

    Ok(())
}

/// Split an expression into numbers, operators and parentheses
pub fn tokenize(expression: &str) -> CalcResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = expression.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        if is_number_char(c) {
            let mut end = start;
            while let Some(&(i, d)) = chars.peek() {
                if !is_number_char(d) {
                    break;
                }
                end = i + d.len_utf8();
                chars.next();
            }

            let literal = &expression[start..end];
            let value = literal
                .parse::<f64>()
                .map_err(|_| CalcError::malformed(format!("invalid number '{}'", literal)))?;
            tokens.push(Token::Number(value));
            continue;
        }

        chars.next();
        let token = match c {
            '(' => Token::LParen,
            ')' => Token::RParen,
            _ => match Operator::from_char(c) {
                Some(op) => Token::Op(op),
                None => {
                    return Err(CalcError::malformed(format!(
                        "unexpected character '{}' at position {}",
                        c, start
                    )))
                }
            },
        };
        tokens.push(token);
    }

    Ok(tokens)
}

fn is_number_char(c: char) -> bool {
    c.is_ascii_digit() || c == '.'
}
