pub mod application;
pub mod cli;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod expressions;
pub mod parser;
pub mod services;
pub mod tasks;
pub mod types;
pub mod worker;

// Re-export main types
pub use error::{CalcError, CalcResult};
pub use types::*;

pub use application::Application;
pub use config::Config;
