//! Infix to postfix conversion (shunting-yard)

use super::Token;
use crate::error::{CalcError, CalcResult};

/// Reorder infix tokens into postfix order
///
/// `+ -` bind looser than `* /`, equal precedence associates left, and
/// parentheses override both. Operand/operator alternation is checked as we
/// go, so a leading, doubled or trailing operator is rejected here.
pub fn to_postfix(tokens: &[Token]) -> CalcResult<Vec<Token>> {
    if tokens.is_empty() {
        return Err(CalcError::EmptyExpression);
    }

    let mut output = Vec::with_capacity(tokens.len());
    let mut operators: Vec<Token> = Vec::new();
    let mut expect_operand = true;

    for &token in tokens {
        match token {
            Token::Number(value) => {
                if !expect_operand {
                    return Err(CalcError::malformed(format!(
                        "missing operator before {}",
                        value
                    )));
                }
                output.push(token);
                expect_operand = false;
            }
            Token::Op(op) => {
                if expect_operand {
                    return Err(CalcError::malformed(format!(
                        "operator '{}' in operand position",
                        op
                    )));
                }
                while let Some(&Token::Op(top)) = operators.last() {
                    if top.precedence() < op.precedence() {
                        break;
                    }
                    output.push(Token::Op(top));
                    operators.pop();
                }
                operators.push(token);
                expect_operand = true;
            }
            Token::LParen => {
                if !expect_operand {
                    return Err(CalcError::malformed("missing operator before '('"));
                }
                operators.push(token);
            }
            Token::RParen => {
                if expect_operand {
                    return Err(CalcError::malformed("expected operand before ')'"));
                }
                loop {
                    match operators.pop() {
                        Some(Token::LParen) => break,
                        Some(op) => output.push(op),
                        None => return Err(CalcError::malformed("unmatched ')'")),
                    }
                }
            }
        }
    }

    if expect_operand {
        return Err(match tokens.last() {
            Some(Token::Op(op)) => CalcError::malformed(format!("trailing operator '{}'", op)),
            _ => CalcError::malformed("incomplete expression"),
        });
    }

    while let Some(token) = operators.pop() {
        if token == Token::LParen {
            return Err(CalcError::malformed("unmatched '('"));
        }
        output.push(token);
    }

    Ok(output)
}

/// Space-separated rendering, e.g. `2 3 4 * +`
pub fn postfix_to_string(postfix: &[Token]) -> String {
    postfix
        .iter()
        .map(|token| token.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}
