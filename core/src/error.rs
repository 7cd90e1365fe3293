use std::time::Duration;

use crate::types::{ExpressionStatus, TaskId};

/// Errors produced while parsing, evaluating, or tracking an expression
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CalcError {
    #[error("expression is empty")]
    EmptyExpression,

    #[error("malformed expression: {0}")]
    MalformedExpression(String),

    #[error("not enough operands for operator '{0}'")]
    InsufficientOperands(String),

    #[error("no task available")]
    NoTaskAvailable,

    #[error("task {id} was not completed within {after:?}")]
    TaskTimeout { id: TaskId, after: Duration },

    #[error("task {0} was dropped before a result was delivered")]
    TaskDropped(TaskId),

    #[error("division by zero")]
    DivisionByZero,

    #[error("evaluation cancelled")]
    Cancelled,

    #[error("expression {0} not found")]
    ExpressionNotFound(String),

    #[error("expression {id} is already {status}")]
    InvalidTransition { id: String, status: ExpressionStatus },
}

impl CalcError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        CalcError::MalformedExpression(reason.into())
    }

    /// Whether the error was detected before any task was created
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            CalcError::EmptyExpression
                | CalcError::MalformedExpression(_)
                | CalcError::InsufficientOperands(_)
        )
    }
}

pub type CalcResult<T> = Result<T, CalcError>;
