mod calculation_service;
mod worker_service;

pub use calculation_service::CalculationService;
pub use worker_service::WorkerService;
