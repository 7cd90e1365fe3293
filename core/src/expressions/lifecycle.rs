use chrono::Utc;
use tracing::info;

use super::ExpressionStore;
use crate::error::{CalcError, CalcResult};
use crate::types::{format_result, ExpressionStatus};

impl ExpressionStore {
    /// Mark an expression as successfully evaluated
    pub fn complete(&self, id: &str, value: f64) -> CalcResult<()> {
        self.finish(id, ExpressionStatus::Success, Some(format_result(value)), None)?;
        info!(expression_id = %id, value, "expression succeeded");
        Ok(())
    }

    /// Mark an expression as failed with `message`
    pub fn fail(&self, id: &str, message: impl Into<String>) -> CalcResult<()> {
        let message = message.into();
        self.finish(id, ExpressionStatus::Error, None, Some(message.clone()))?;
        info!(expression_id = %id, error = %message, "expression failed");
        Ok(())
    }

    /// Apply the single terminal transition of a record
    fn finish(
        &self,
        id: &str,
        status: ExpressionStatus,
        result: Option<String>,
        error: Option<String>,
    ) -> CalcResult<()> {
        {
            let mut inner = self.lock();
            let record = inner
                .records
                .get_mut(id)
                .ok_or_else(|| CalcError::ExpressionNotFound(id.to_string()))?;

            if record.status.is_terminal() {
                return Err(CalcError::InvalidTransition {
                    id: id.to_string(),
                    status: record.status,
                });
            }

            record.status = status;
            record.result = result;
            record.error = error;
            record.completed_at = Some(Utc::now());
        }

        self.changed.notify_waiters();
        Ok(())
    }
}
