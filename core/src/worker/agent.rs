use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::services::WorkerService;
use crate::types::TaskResult;

/// In-process worker following the poll contract
///
/// Claims a task, waits out its simulated duration, computes the operation
/// and submits the result. Backs off for `poll_interval` when the queue is
/// empty.
pub struct Agent {
    id: usize,
    service: WorkerService,
    poll_interval: Duration,
}

impl Agent {
    pub fn new(id: usize, service: WorkerService, poll_interval: Duration) -> Self {
        Self {
            id,
            service,
            poll_interval,
        }
    }

    pub async fn run(self, shutdown: CancellationToken) {
        info!(agent_id = self.id, "agent started");

        while !shutdown.is_cancelled() {
            let task = match self.service.claim_task() {
                Ok(task) => task,
                Err(_) => {
                    tokio::select! {
                        _ = shutdown.cancelled() => {}
                        _ = tokio::time::sleep(self.poll_interval) => {}
                    }
                    continue;
                }
            };

            let result = TaskResult {
                id: task.id,
                result: task.compute(),
            };

            // A task abandoned here is picked up again by stale-claim recovery
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(task.duration()) => {}
            }

            let delivered = self.service.submit_result(result);
            debug!(
                agent_id = self.id,
                task_id = task.id,
                operation = %task.operation,
                delivered,
                "result submitted"
            );
        }

        info!(agent_id = self.id, "agent stopped");
    }
}
