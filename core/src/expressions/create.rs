use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::ExpressionStore;
use crate::types::{Expression, ExpressionStatus};

impl ExpressionStore {
    /// Create a pending record for `source` and return its id
    pub fn create(&self, source: impl Into<String>) -> String {
        let id = Uuid::new_v4().to_string();
        let record = Expression {
            id: id.clone(),
            expression: source.into(),
            status: ExpressionStatus::Pending,
            result: None,
            error: None,
            created_at: Utc::now(),
            completed_at: None,
        };

        info!(expression_id = %id, expression = %record.expression, "expression created");

        let mut inner = self.lock();
        inner.order.push(id.clone());
        inner.records.insert(id.clone(), record);

        id
    }
}
