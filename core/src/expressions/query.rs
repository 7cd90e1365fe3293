use super::ExpressionStore;
use crate::error::{CalcError, CalcResult};
use crate::types::{Expression, ExpressionListFilter};

impl ExpressionStore {
    /// Get a record by id
    pub fn get(&self, id: &str) -> CalcResult<Expression> {
        self.lock()
            .records
            .get(id)
            .cloned()
            .ok_or_else(|| CalcError::ExpressionNotFound(id.to_string()))
    }

    /// List records in creation order
    pub fn list(&self, filter: &ExpressionListFilter) -> Vec<Expression> {
        let inner = self.lock();
        let matching = inner
            .order
            .iter()
            .filter_map(|id| inner.records.get(id))
            .filter(|record| filter.status.map_or(true, |status| record.status == status))
            .cloned();

        match filter.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait until the record reaches success or error
    pub async fn wait_terminal(&self, id: &str) -> CalcResult<Expression> {
        loop {
            // Register before checking so a transition in between is not missed
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let record = self.get(id)?;
            if record.status.is_terminal() {
                return Ok(record);
            }

            notified.await;
        }
    }
}
