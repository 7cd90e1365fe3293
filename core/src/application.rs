//! Application wiring
//!
//! Builds the stores, evaluator and services from a `Config`. Agents are
//! started separately so callers can choose to run without any.

use std::sync::Arc;

use crate::config::Config;
use crate::evaluator::Evaluator;
use crate::expressions::ExpressionStore;
use crate::services::{CalculationService, WorkerService};
use crate::tasks::TaskStore;
use crate::worker::AgentPool;

/// The Abacus application instance with all services
pub struct Application {
    pub config: Config,
    pub tasks: Arc<TaskStore>,
    pub expressions: Arc<ExpressionStore>,
    pub calculation_service: CalculationService,
    pub worker_service: WorkerService,
}

impl Application {
    /// Create a new Application instance (pure instantiation, no tasks spawned)
    pub fn new(config: Config) -> Self {
        let tasks = Arc::new(TaskStore::new());
        let expressions = Arc::new(ExpressionStore::new());
        let evaluator = Evaluator::new(tasks.clone(), config.timings.clone(), &config.evaluation);

        Self {
            calculation_service: CalculationService::new(expressions.clone(), evaluator),
            worker_service: WorkerService::new(tasks.clone()),
            tasks,
            expressions,
            config,
        }
    }

    /// Start the configured number of agents
    pub fn spawn_agents(&self) -> AgentPool {
        AgentPool::spawn(self.worker_service.clone(), &self.config.workers)
    }

    /// Cancel running evaluations, then stop the agents
    pub async fn shutdown(&self, agents: AgentPool) {
        self.calculation_service.shutdown();
        agents.shutdown().await;
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

#[cfg(test)]
#[path = "application_tests.rs"]
mod tests;
