use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::{CalcError, CalcResult};
use crate::types::{CreateTaskParams, Task, TaskId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Unclaimed,
    Claimed { since: Instant },
}

/// Read-only view of a stored task
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSnapshot {
    pub task: Task,
    pub state: TaskState,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskStats {
    pub unclaimed: usize,
    pub in_flight: usize,
}

struct Entry {
    task: Task,
    state: TaskState,
    sender: oneshot::Sender<f64>,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<TaskId, Entry>,
    /// Unclaimed ids in insertion order; may hold ids already discarded
    queue: VecDeque<TaskId>,
}

/// Registry matching published tasks to the evaluations waiting on them
///
/// One mutex guards all state and no critical section awaits, so the store
/// can be shared freely between evaluations and workers.
pub struct TaskStore {
    next_id: AtomicU64,
    inner: Mutex<Inner>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            inner: Mutex::new(Inner::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish a new unclaimed task
    ///
    /// Returns the assigned id and the receiving half of its delivery channel.
    pub fn insert(&self, params: CreateTaskParams) -> (TaskId, oneshot::Receiver<f64>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = oneshot::channel();

        let task = Task {
            id,
            operand1: params.operand1,
            operand2: params.operand2,
            operation: params.operation,
            operation_time: u64::try_from(params.operation_time.as_millis()).unwrap_or(u64::MAX),
        };

        let mut inner = self.lock();
        inner.entries.insert(
            id,
            Entry {
                task,
                state: TaskState::Unclaimed,
                sender,
            },
        );
        inner.queue.push_back(id);

        (id, receiver)
    }

    /// Claim the oldest unclaimed task for a worker
    pub fn claim_next(&self) -> CalcResult<Task> {
        let mut inner = self.lock();

        while let Some(id) = inner.queue.pop_front() {
            let Some(entry) = inner.entries.get_mut(&id) else {
                continue;
            };
            if entry.state != TaskState::Unclaimed {
                continue;
            }

            entry.state = TaskState::Claimed {
                since: Instant::now(),
            };
            debug!(task_id = id, operation = %entry.task.operation, "task claimed");
            return Ok(entry.task.clone());
        }

        Err(CalcError::NoTaskAvailable)
    }

    /// Deliver a result to the evaluation waiting on `id`
    ///
    /// Unknown or already completed ids are ignored. Returns whether the
    /// value reached a waiting evaluation.
    pub fn complete(&self, id: TaskId, value: f64) -> bool {
        let entry = self.lock().entries.remove(&id);

        let Some(entry) = entry else {
            debug!(task_id = id, "ignoring result for unknown or completed task");
            return false;
        };

        if entry.sender.send(value).is_err() {
            debug!(task_id = id, "evaluation stopped waiting, result dropped");
            return false;
        }

        debug!(task_id = id, value, "task completed");
        true
    }

    pub fn lookup(&self, id: TaskId) -> Option<TaskSnapshot> {
        self.lock().entries.get(&id).map(|entry| TaskSnapshot {
            task: entry.task.clone(),
            state: entry.state,
        })
    }

    /// Remove a task nobody is waiting for any more
    pub fn discard(&self, id: TaskId) -> bool {
        let removed = self.lock().entries.remove(&id).is_some();
        if removed {
            debug!(task_id = id, "task discarded");
        }
        removed
    }

    /// Return claims older than `older_than` to the unclaimed queue
    pub fn requeue_stale(&self, older_than: Duration) -> usize {
        let now = Instant::now();
        let mut inner = self.lock();
        let Inner { entries, queue } = &mut *inner;

        let mut stale: Vec<TaskId> = entries
            .iter()
            .filter_map(|(id, entry)| match entry.state {
                TaskState::Claimed { since } if now.duration_since(since) >= older_than => {
                    Some(*id)
                }
                _ => None,
            })
            .collect();
        stale.sort_unstable();

        for id in &stale {
            if let Some(entry) = entries.get_mut(id) {
                entry.state = TaskState::Unclaimed;
                queue.push_back(*id);
                warn!(task_id = *id, "requeued stale claim");
            }
        }

        stale.len()
    }

    pub fn stats(&self) -> TaskStats {
        let inner = self.lock();
        inner
            .entries
            .values()
            .fold(TaskStats::default(), |mut stats, entry| {
                match entry.state {
                    TaskState::Unclaimed => stats.unclaimed += 1,
                    TaskState::Claimed { .. } => stats.in_flight += 1,
                }
                stats
            })
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}
