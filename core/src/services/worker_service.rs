use std::sync::Arc;
use std::time::Duration;

use crate::error::CalcResult;
use crate::tasks::{TaskStats, TaskStore};
use crate::types::{Task, TaskResult};

/// Service for worker operations (claiming tasks and submitting results)
#[derive(Clone)]
pub struct WorkerService {
    tasks: Arc<TaskStore>,
}

impl WorkerService {
    pub fn new(tasks: Arc<TaskStore>) -> Self {
        Self { tasks }
    }

    /// Claim the next unclaimed task
    ///
    /// Fails with `NoTaskAvailable` when nothing is waiting; callers are
    /// expected to back off and poll again.
    pub fn claim_task(&self) -> CalcResult<Task> {
        self.tasks.claim_next()
    }

    /// Submit the result of a claimed task
    ///
    /// Returns false for unknown, withdrawn or already completed tasks.
    pub fn submit_result(&self, result: TaskResult) -> bool {
        self.tasks.complete(result.id, result.result)
    }

    /// Return claims held longer than `older_than` to the queue
    pub fn requeue_stale(&self, older_than: Duration) -> usize {
        self.tasks.requeue_stale(older_than)
    }

    pub fn stats(&self) -> TaskStats {
        self.tasks.stats()
    }
}
