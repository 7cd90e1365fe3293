//! Operation tree built from postfix tokens

use super::Token;
use crate::error::{CalcError, CalcResult};
use crate::types::Operator;

/// Nesting limit applied when no other is configured
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Node of a binary operation tree
///
/// Children are owned exclusively, so a tree is always acyclic and every
/// internal node has exactly two children.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Leaf(f64),
    Binary {
        op: Operator,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    pub fn binary(op: Operator, left: Node, right: Node) -> Self {
        Node::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    /// Number of internal nodes, i.e. tasks a full evaluation publishes
    pub fn operation_count(&self) -> usize {
        let mut count = 0;
        let mut pending = vec![self];

        while let Some(node) = pending.pop() {
            if let Node::Binary { left, right, .. } = node {
                count += 1;
                pending.push(left.as_ref());
                pending.push(right.as_ref());
            }
        }

        count
    }

    /// Length of the longest root-to-leaf path counted in internal nodes
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut pending = vec![(self, 0)];

        while let Some((node, depth)) = pending.pop() {
            match node {
                Node::Leaf(_) => deepest = deepest.max(depth),
                Node::Binary { left, right, .. } => {
                    pending.push((left.as_ref(), depth + 1));
                    pending.push((right.as_ref(), depth + 1));
                }
            }
        }

        deepest
    }
}

/// Build a tree from postfix tokens using a pending-node stack
///
/// Uses [`DEFAULT_MAX_DEPTH`] as the nesting limit.
pub fn build_tree(postfix: &[Token]) -> CalcResult<Node> {
    build_tree_with_depth(postfix, DEFAULT_MAX_DEPTH)
}

/// Build a tree, rejecting one nested deeper than `max_depth` operations
///
/// Evaluating and dropping a tree both recurse once per level, so the limit
/// is checked while building and no oversized tree ever exists.
pub fn build_tree_with_depth(postfix: &[Token], max_depth: usize) -> CalcResult<Node> {
    // Each pending node is paired with its depth
    let mut stack: Vec<(Node, usize)> = Vec::new();

    for token in postfix {
        match *token {
            Token::Number(value) => stack.push((Node::Leaf(value), 0)),
            Token::Op(op) => {
                let ((right, right_depth), (left, left_depth)) = match (stack.pop(), stack.pop()) {
                    (Some(right), Some(left)) => (right, left),
                    _ => return Err(CalcError::InsufficientOperands(op.to_string())),
                };

                let depth = 1 + left_depth.max(right_depth);
                if depth > max_depth {
                    return Err(CalcError::malformed(format!(
                        "expression nests deeper than {} operations",
                        max_depth
                    )));
                }
                stack.push((Node::binary(op, left, right), depth));
            }
            Token::LParen | Token::RParen => {
                return Err(CalcError::malformed("parenthesis in postfix input"));
            }
        }
    }

    if stack.len() != 1 {
        return Err(CalcError::malformed(format!(
            "expected a single root, found {} nodes",
            stack.len()
        )));
    }

    stack
        .pop()
        .map(|(root, _)| root)
        .ok_or_else(|| CalcError::malformed("expected a single root"))
}
