//! Worker agents
//!
//! In-process implementation of the worker poll contract, plus the pool that
//! runs a configured number of agents.

mod agent;
mod pool;


pub use agent::Agent;
pub use pool::AgentPool;
