use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{CalcError, CalcResult};
use crate::evaluator::Evaluator;
use crate::expressions::ExpressionStore;
use crate::parser::parse_expression_with_depth;
use crate::types::{Expression, ExpressionListFilter};

/// Service for submitting expressions and following them to completion
#[derive(Clone)]
pub struct CalculationService {
    expressions: Arc<ExpressionStore>,
    evaluator: Evaluator,
    shutdown: CancellationToken,
    /// Cancellation handles of evaluations still in progress
    running: Arc<Mutex<HashMap<String, CancellationToken>>>,
}

impl CalculationService {
    pub fn new(expressions: Arc<ExpressionStore>, evaluator: Evaluator) -> Self {
        Self {
            expressions,
            evaluator,
            shutdown: CancellationToken::new(),
            running: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn running(&self) -> MutexGuard<'_, HashMap<String, CancellationToken>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Submit an expression and return its id right away
    ///
    /// Parsing happens before this returns: an invalid expression is
    /// recorded as `error` without publishing any task. Valid expressions are
    /// evaluated on the runtime in the background.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(&self, source: impl Into<String>) -> String {
        let source = source.into();
        let id = self.expressions.create(source.clone());

        let tree = match parse_expression_with_depth(&source, self.evaluator.max_depth()) {
            Ok(tree) => tree,
            Err(err) => {
                warn!(expression_id = %id, error = %err, "expression rejected");
                self.record(&id, Err(err));
                return id;
            }
        };

        let token = self.shutdown.child_token();
        self.running().insert(id.clone(), token.clone());
        debug!(expression_id = %id, operations = tree.operation_count(), "evaluation started");

        let service = self.clone();
        let expression_id = id.clone();
        tokio::spawn(async move {
            let mut outcome = service.evaluator.evaluate(&tree, &token).await;

            // Same lock as `cancel`: once it has reported true, the record
            // ends cancelled even if the value arrived first
            {
                let mut running = service.running();
                running.remove(&expression_id);
                if token.is_cancelled() {
                    outcome = Err(CalcError::Cancelled);
                }
            }
            service.record(&expression_id, outcome);
        });

        id
    }

    fn record(&self, id: &str, outcome: CalcResult<f64>) {
        let recorded = match outcome {
            Ok(value) => self.expressions.complete(id, value),
            Err(err) => self.expressions.fail(id, err.to_string()),
        };

        if let Err(err) = recorded {
            warn!(expression_id = %id, error = %err, "failed to record outcome");
        }
    }

    pub fn get(&self, id: &str) -> CalcResult<Expression> {
        self.expressions.get(id)
    }

    pub fn list(&self, filter: &ExpressionListFilter) -> Vec<Expression> {
        self.expressions.list(filter)
    }

    /// Wait for an expression to reach a terminal state
    pub async fn wait(&self, id: &str) -> CalcResult<Expression> {
        self.expressions.wait_terminal(id).await
    }

    /// Cancel a running evaluation
    ///
    /// Returns true when the evaluation was still running; its record then
    /// ends in `error` with the cancellation message. Returns false when the
    /// expression has already finished.
    pub fn cancel(&self, id: &str) -> CalcResult<bool> {
        if let Some(token) = self.running().get(id) {
            token.cancel();
            return Ok(true);
        }

        // Not running: either finished or unknown
        self.expressions.get(id).map(|_| false)
    }

    pub fn running_count(&self) -> usize {
        self.running().len()
    }

    /// Cancel every evaluation in progress
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}
