use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::Agent;
use crate::config::WorkerSettings;
use crate::services::WorkerService;

/// Running set of agents plus the optional stale-claim reaper
pub struct AgentPool {
    agents: usize,
    shutdown: CancellationToken,
    handles: JoinSet<()>,
}

impl AgentPool {
    pub fn spawn(service: WorkerService, settings: &WorkerSettings) -> Self {
        let shutdown = CancellationToken::new();
        let mut handles = JoinSet::new();

        for id in 0..settings.computing_power {
            let agent = Agent::new(id, service.clone(), settings.poll_interval());
            handles.spawn(agent.run(shutdown.clone()));
        }

        if let Some(claim_timeout) = settings.claim_timeout() {
            handles.spawn(reap_stale_claims(
                service.clone(),
                claim_timeout,
                shutdown.clone(),
            ));
        }

        info!(agents = settings.computing_power, "agent pool started");

        Self {
            agents: settings.computing_power,
            shutdown,
            handles,
        }
    }

    pub fn size(&self) -> usize {
        self.agents
    }

    /// Stop all agents and wait for them to exit
    pub async fn shutdown(mut self) {
        self.shutdown.cancel();

        while let Some(joined) = self.handles.join_next().await {
            if let Err(err) = joined {
                warn!(error = %err, "agent exited abnormally");
            }
        }

        info!("agent pool stopped");
    }
}

/// Periodically hand claims held by unresponsive agents back to the queue
async fn reap_stale_claims(
    service: WorkerService,
    claim_timeout: Duration,
    shutdown: CancellationToken,
) {
    let period = (claim_timeout / 2).max(Duration::from_millis(1));
    let mut interval = tokio::time::interval(period);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = interval.tick() => {
                let requeued = service.requeue_stale(claim_timeout);
                if requeued > 0 {
                    warn!(requeued, "recovered stale claims");
                }
            }
        }
    }
}
