// Expression lifecycle module
//
// Tracks every submitted expression for historical lookup:
// - Creating records in the pending state
// - Moving a record to success or error exactly once
// - Querying and waiting on records

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

use crate::types::Expression;

mod create;
mod lifecycle;
mod query;


#[derive(Default)]
struct Inner {
    records: HashMap<String, Expression>,
    /// Ids in creation order
    order: Vec<String>,
}

/// Concurrent store of expression records
///
/// Records are never deleted. `changed` wakes everyone waiting on a record
/// whenever any record reaches a terminal state.
#[derive(Default)]
pub struct ExpressionStore {
    inner: Mutex<Inner>,
    changed: Notify,
}

impl ExpressionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
