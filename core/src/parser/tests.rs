use super::*;
use crate::types::Operator;

/// Evaluate postfix tokens directly with a value stack
fn eval_postfix(postfix: &[Token]) -> f64 {
    let mut stack = Vec::new();
    for token in postfix {
        match token {
            Token::Number(v) => stack.push(*v),
            Token::Op(op) => {
                let right = stack.pop().expect("right operand");
                let left = stack.pop().expect("left operand");
                stack.push(op.apply(left, right));
            }
            _ => panic!("parenthesis in postfix output"),
        }
    }
    assert_eq!(stack.len(), 1);
    stack[0]
}

fn eval_tree(node: &Node) -> f64 {
    match node {
        Node::Leaf(v) => *v,
        Node::Binary { op, left, right } => op.apply(eval_tree(left), eval_tree(right)),
    }
}

fn postfix_of(source: &str) -> String {
    let tokens = tokenize(&strip_whitespace(source)).unwrap();
    postfix_to_string(&to_postfix(&tokens).unwrap())
}

fn malformed(source: &str) -> bool {
    matches!(parse_expression(source), Err(CalcError::MalformedExpression(_)))
}

/* ===================== Tokenizer / Validator ===================== */

#[test]
fn test_tokenize_mixed() {
    let tokens = tokenize("12.5*(3-1)").unwrap();
    assert_eq!(
        tokens,
        vec![
            Token::Number(12.5),
            Token::Op(Operator::Mul),
            Token::LParen,
            Token::Number(3.0),
            Token::Op(Operator::Sub),
            Token::Number(1.0),
            Token::RParen,
        ]
    );
}

#[test]
fn test_tokenize_rejects_unknown_character() {
    let err = tokenize("2+x").unwrap_err();
    assert!(matches!(err, CalcError::MalformedExpression(msg) if msg.contains("'x'")));
}

#[test]
fn test_tokenize_rejects_bad_number() {
    assert!(matches!(
        tokenize("1.2.3+1"),
        Err(CalcError::MalformedExpression(_))
    ));
    assert!(matches!(tokenize("."), Err(CalcError::MalformedExpression(_))));
}

#[test]
fn test_validate_parentheses() {
    assert!(validate_parentheses("(1+2)*((3))").is_ok());
    assert!(validate_parentheses("").is_ok());
    assert!(validate_parentheses("(1+2").is_err());
    assert!(validate_parentheses("1+2)").is_err());
    assert!(validate_parentheses(")(").is_err());
}

#[test]
fn test_empty_expression() {
    assert_eq!(parse_expression(""), Err(CalcError::EmptyExpression));
    assert_eq!(parse_expression("   \t "), Err(CalcError::EmptyExpression));
}

#[test]
fn test_whitespace_ignored() {
    let tree = parse_expression(" 2 +\t3 * 4 ").unwrap();
    assert_eq!(eval_tree(&tree), 14.0);
}

#[test]
fn test_unbalanced_parentheses_malformed() {
    for source in ["(1+2", "1+2)", "((1)", "(1+2))*3", ")1+2("] {
        assert!(malformed(source), "expected malformed: {}", source);
    }
}

/* ===================== Postfix ===================== */

#[test]
fn test_postfix_precedence() {
    assert_eq!(postfix_of("2+3*4"), "2 3 4 * +");
    assert_eq!(postfix_of("2*3+4"), "2 3 * 4 +");
}

#[test]
fn test_postfix_left_associative() {
    assert_eq!(postfix_of("8-3-2"), "8 3 - 2 -");
    assert_eq!(postfix_of("8/4/2"), "8 4 / 2 /");
    assert_eq!(postfix_of("8/4*2"), "8 4 / 2 *");
}

#[test]
fn test_postfix_parentheses_override() {
    assert_eq!(postfix_of("(1+2)*(3-1)"), "1 2 + 3 1 - *");
    assert_eq!(postfix_of("8-(3-2)"), "8 3 2 - -");
}

#[test]
fn test_postfix_evaluates_like_infix() {
    let cases = [
        ("2+3*4", 14.0),
        ("(1+2)*(3-1)", 6.0),
        ("10-4-3", 3.0),
        ("100/10/5", 2.0),
        ("2*(3+4)*5", 70.0),
        ("1+2*3-4/2", 5.0),
        ("((7))", 7.0),
        ("1.5*4", 6.0),
        ("(8-2)/(1+2)-1", 1.0),
        ("3-2*(1+1)/4", 2.0),
    ];

    for (source, expected) in cases {
        let tokens = tokenize(source).unwrap();
        let postfix = to_postfix(&tokens).unwrap();
        assert_eq!(eval_postfix(&postfix), expected, "postfix of {}", source);
        assert_eq!(
            eval_tree(&build_tree(&postfix).unwrap()),
            expected,
            "tree of {}",
            source
        );
    }
}

#[test]
fn test_trailing_operator() {
    let err = parse_expression("2+").unwrap_err();
    assert!(matches!(err, CalcError::MalformedExpression(msg) if msg.contains("trailing")));
}

#[test]
fn test_operator_in_operand_position() {
    for source in ["-3", "2*-3", "+1", "(*2)", "2++3"] {
        assert!(malformed(source), "expected malformed: {}", source);
    }
}

#[test]
fn test_operand_in_operator_position() {
    for source in ["2(3)", "(1)2", "(1)(2)", "()", "(1+)"] {
        assert!(malformed(source), "expected malformed: {}", source);
    }
}

#[test]
fn test_postfix_mismatched_parentheses_rechecked() {
    let tokens = tokenize("(1+2").unwrap();
    assert!(matches!(
        to_postfix(&tokens),
        Err(CalcError::MalformedExpression(_))
    ));

    let tokens = tokenize("1+2)").unwrap();
    assert!(matches!(
        to_postfix(&tokens),
        Err(CalcError::MalformedExpression(_))
    ));
}

/* ===================== Tree Builder ===================== */

#[test]
fn test_tree_shape() {
    let tree = parse_expression("2+3*4").unwrap();
    let expected = Node::binary(
        Operator::Add,
        Node::Leaf(2.0),
        Node::binary(Operator::Mul, Node::Leaf(3.0), Node::Leaf(4.0)),
    );
    assert_eq!(tree, expected);
    assert_eq!(tree.operation_count(), 2);
    assert_eq!(tree.depth(), 2);
}

#[test]
fn test_tree_right_child_is_most_recent() {
    let tree = build_tree(&[
        Token::Number(7.0),
        Token::Number(2.0),
        Token::Op(Operator::Sub),
    ])
    .unwrap();
    assert_eq!(
        tree,
        Node::binary(Operator::Sub, Node::Leaf(7.0), Node::Leaf(2.0))
    );
}

#[test]
fn test_tree_single_leaf() {
    let tree = parse_expression("42").unwrap();
    assert!(tree.is_leaf());
    assert_eq!(tree.operation_count(), 0);
}

#[test]
fn test_tree_insufficient_operands() {
    let err = build_tree(&[Token::Number(1.0), Token::Op(Operator::Add)]).unwrap_err();
    assert_eq!(err, CalcError::InsufficientOperands("+".to_string()));
}

#[test]
fn test_tree_leftover_operands() {
    let err = build_tree(&[Token::Number(1.0), Token::Number(2.0)]).unwrap_err();
    assert!(matches!(err, CalcError::MalformedExpression(_)));

    let err = build_tree(&[]).unwrap_err();
    assert!(matches!(err, CalcError::MalformedExpression(_)));
}

#[test]
fn test_tree_rejects_parenthesis_tokens() {
    let err = build_tree(&[Token::LParen, Token::Number(1.0)]).unwrap_err();
    assert!(matches!(err, CalcError::MalformedExpression(_)));
}

/* ===================== Nesting Limit ===================== */

fn chain(terms: usize) -> String {
    vec!["1"; terms].join("+")
}

#[test]
fn test_long_chain_rejected_without_recursion() {
    let err = parse_expression(&chain(10_000)).unwrap_err();
    let limit = format!("deeper than {}", DEFAULT_MAX_DEPTH);
    assert!(matches!(err, CalcError::MalformedExpression(msg) if msg.contains(&limit)));

    let err = parse_expression(&chain(200_000)).unwrap_err();
    assert!(err.is_parse_error());
}

#[test]
fn test_depth_limit_is_inclusive() {
    let tree = parse_expression(&chain(DEFAULT_MAX_DEPTH + 1)).unwrap();
    assert_eq!(tree.depth(), DEFAULT_MAX_DEPTH);
    assert_eq!(tree.operation_count(), DEFAULT_MAX_DEPTH);

    assert!(malformed(&chain(DEFAULT_MAX_DEPTH + 2)));
}

#[test]
fn test_custom_depth_limit() {
    assert!(parse_expression_with_depth("1+2+3", 2).is_ok());
    assert!(matches!(
        parse_expression_with_depth("1+2+3+4", 2),
        Err(CalcError::MalformedExpression(_))
    ));

    // Balanced trees are only as deep as their longest branch
    let tree = parse_expression_with_depth("(1+2)*(3+4)", 2).unwrap();
    assert_eq!(tree.depth(), 2);
    assert_eq!(tree.operation_count(), 3);
}

#[test]
fn test_build_tree_tracks_depth_per_branch() {
    let postfix = to_postfix(&tokenize("1*(2+(3-4))").unwrap()).unwrap();
    assert!(matches!(
        build_tree_with_depth(&postfix, 2),
        Err(CalcError::MalformedExpression(_))
    ));
    assert_eq!(build_tree_with_depth(&postfix, 3).unwrap().depth(), 3);
}
