// Task correlation module
//
// Holds every operation published by an evaluation until a worker delivers
// its result:
// - Inserting tasks and handing back the waiting side of the delivery channel
// - Claiming tasks for workers (at most one active claim per task)
// - Completing tasks exactly once
// - Requeueing claims abandoned by dead workers

mod store;


// Re-export public API
pub use store::{TaskSnapshot, TaskState, TaskStats, TaskStore};
