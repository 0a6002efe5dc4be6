use std::sync::Arc;

use tracing::{info, warn};

use vidsage_core::{is_executable, QueryOutcome, ResultSource, StageContext, StatementGuard};
use vidsage_db::{Warehouse, WarehouseSession};

use crate::error::PipelineError;

/// Runs synthesized statements against the warehouse.
///
/// Each call opens its own session and closes it before returning, whether
/// the statement succeeded or not. Nothing is cached between calls.
#[derive(Clone)]
pub struct QueryExecutor {
    warehouse: Arc<dyn Warehouse>,
    fallback_table: String,
    guard: StatementGuard,
}

impl QueryExecutor {
    pub fn new(
        warehouse: Arc<dyn Warehouse>,
        fallback_table: impl Into<String>,
        guard: StatementGuard,
    ) -> Self {
        Self { warehouse, fallback_table: fallback_table.into(), guard }
    }

    pub fn fallback_statement(&self) -> String {
        format!("SELECT * FROM {}", self.fallback_table)
    }

    pub async fn run(
        &self,
        synthesized: String,
        correlation_id: &str,
    ) -> Result<StageContext, PipelineError> {
        if !is_executable(&synthesized) {
            info!(
                event_name = "pipeline.executor.bypassed",
                correlation_id,
                "synthesized text is not a statement, forwarding as context"
            );
            return Ok(StageContext::Passthrough(synthesized));
        }

        self.guard.check(&synthesized).map_err(|violation| {
            warn!(
                event_name = "pipeline.executor.rejected",
                correlation_id,
                guard = self.guard.as_str(),
                %violation,
                "statement rejected by guard"
            );
            PipelineError::UnsafeStatement { reason: violation.to_string() }
        })?;

        let mut session = self.warehouse.open().await.map_err(PipelineError::WarehouseConnect)?;
        let outcome = self.execute(session.as_mut(), &synthesized).await;

        if let Err(error) = session.close().await {
            warn!(
                event_name = "pipeline.executor.close_failed",
                correlation_id,
                provider = self.warehouse.provider(),
                error = %error,
                "warehouse session did not close cleanly"
            );
        }

        let outcome = outcome?;
        info!(
            event_name = "pipeline.executor.completed",
            correlation_id,
            provider = self.warehouse.provider(),
            source = outcome.source.as_str(),
            rows = outcome.result.len(),
            "statement executed"
        );
        Ok(StageContext::Rows(outcome))
    }

    async fn execute(
        &self,
        session: &mut dyn WarehouseSession,
        statement: &str,
    ) -> Result<QueryOutcome, PipelineError> {
        let primary = session.query(statement).await.map_err(PipelineError::WarehouseQuery)?;
        if !primary.is_empty() {
            return Ok(QueryOutcome { source: ResultSource::Primary, result: primary });
        }

        let fallback = session
            .query(&self.fallback_statement())
            .await
            .map_err(PipelineError::WarehouseQuery)?;
        Ok(QueryOutcome { source: ResultSource::Fallback, result: fallback })
    }
}
