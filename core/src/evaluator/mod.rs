//! Parallel tree evaluator
//!
//! Leaves resolve immediately. Internal nodes evaluate both subtrees
//! concurrently, then publish one task for their own operation and wait for a
//! worker to deliver the result.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::{DivisionByZero, EvaluationSettings, OperationTimings};
use crate::error::{CalcError, CalcResult};
use crate::parser::Node;
use crate::tasks::TaskStore;
use crate::types::{CreateTaskParams, Operator, TaskId};


type EvalFuture<'a> = Pin<Box<dyn Future<Output = CalcResult<f64>> + Send + 'a>>;

#[derive(Clone)]
pub struct Evaluator {
    tasks: Arc<TaskStore>,
    timings: OperationTimings,
    task_timeout: Option<Duration>,
    division_by_zero: DivisionByZero,
    max_depth: usize,
}

impl Evaluator {
    pub fn new(
        tasks: Arc<TaskStore>,
        timings: OperationTimings,
        evaluation: &EvaluationSettings,
    ) -> Self {
        Self {
            tasks,
            timings,
            task_timeout: evaluation.task_timeout(),
            division_by_zero: evaluation.division_by_zero,
            max_depth: evaluation.max_depth,
        }
    }

    /// Deepest operation nesting this evaluator accepts
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Evaluate a tree to a single value
    ///
    /// Cancelling `cancel` stops every pending wait in the tree and
    /// withdraws their tasks from the store. Trees nested deeper than
    /// `max_depth` are rejected before any task is published.
    pub async fn evaluate(&self, node: &Node, cancel: &CancellationToken) -> CalcResult<f64> {
        let depth = node.depth();
        if depth > self.max_depth {
            return Err(CalcError::malformed(format!(
                "expression nests {} operations deep, limit is {}",
                depth, self.max_depth
            )));
        }

        self.evaluate_node(node, cancel).await
    }

    /// Uses `Box::pin` for async recursion.
    fn evaluate_node<'a>(&'a self, node: &'a Node, cancel: &'a CancellationToken) -> EvalFuture<'a> {
        Box::pin(async move {
            match node {
                Node::Leaf(value) => Ok(*value),
                Node::Binary { op, left, right } => {
                    // First failure drops the sibling, whose guard withdraws its task
                    let (left, right) = tokio::try_join!(
                        self.evaluate_node(left, cancel),
                        self.evaluate_node(right, cancel)
                    )?;
                    self.dispatch(*op, left, right, cancel).await
                }
            }
        })
    }

    async fn dispatch(
        &self,
        op: Operator,
        left: f64,
        right: f64,
        cancel: &CancellationToken,
    ) -> CalcResult<f64> {
        if op == Operator::Div && right == 0.0 {
            return match self.division_by_zero {
                DivisionByZero::Error => Err(CalcError::DivisionByZero),
                DivisionByZero::ReturnLeft => {
                    warn!(left, "division by zero, returning left operand");
                    Ok(left)
                }
            };
        }

        let (id, receiver) = self.tasks.insert(CreateTaskParams {
            operand1: left,
            operand2: right,
            operation: op,
            operation_time: self.timings.for_operator(op),
        });
        let _guard = PendingTask {
            tasks: &self.tasks,
            id,
        };
        debug!(task_id = id, operation = %op, left, right, "task published");

        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(task_id = id, "evaluation cancelled while waiting");
                Err(CalcError::Cancelled)
            }
            result = self.await_delivery(id, receiver) => result,
        }
    }

    async fn await_delivery(&self, id: TaskId, receiver: oneshot::Receiver<f64>) -> CalcResult<f64> {
        let Some(limit) = self.task_timeout else {
            return receiver.await.map_err(|_| CalcError::TaskDropped(id));
        };

        match tokio::time::timeout(limit, receiver).await {
            Ok(delivery) => delivery.map_err(|_| CalcError::TaskDropped(id)),
            Err(_) => {
                warn!(task_id = id, timeout = ?limit, "task timed out");
                Err(CalcError::TaskTimeout { id, after: limit })
            }
        }
    }
}

/// Withdraws a task from the store when its waiter goes away
///
/// After a normal delivery the entry is already gone and this is a no-op.
struct PendingTask<'a> {
    tasks: &'a TaskStore,
    id: TaskId,
}

impl Drop for PendingTask<'_> {
    fn drop(&mut self) {
        self.tasks.discard(self.id);
    }
}
