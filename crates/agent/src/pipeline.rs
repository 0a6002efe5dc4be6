use std::sync::Arc;

use tracing::{info, warn};

use vidsage_core::config::AppConfig;
use vidsage_core::ConversationHistory;
use vidsage_db::Warehouse;

use crate::answer_synthesis::AnswerSynthesizer;
use crate::error::PipelineError;
use crate::executor::QueryExecutor;
use crate::llm::LlmClient;
use crate::prompts::{PromptError, PromptSet};
use crate::query_synthesis::QuerySynthesizer;

/// History -> query synthesis -> execution -> answer synthesis.
///
/// Holds only immutable configuration and shared clients, so one instance
/// serves every request concurrently.
#[derive(Clone)]
pub struct ChatPipeline {
    query: QuerySynthesizer,
    executor: QueryExecutor,
    answer: AnswerSynthesizer,
}

impl ChatPipeline {
    /// Fails when a configured prompt template does not render.
    pub fn new(
        llm: Arc<dyn LlmClient>,
        warehouse: Arc<dyn Warehouse>,
        config: &AppConfig,
    ) -> Result<Self, PromptError> {
        let prompts = Arc::new(PromptSet::from_config(&config.prompts, &config.warehouse)?);
        let temperature = config.llm.temperature;
        Ok(Self {
            query: QuerySynthesizer::new(Arc::clone(&llm), Arc::clone(&prompts), temperature),
            executor: QueryExecutor::new(
                warehouse,
                config.warehouse.fallback_table.clone(),
                config.warehouse.statement_guard,
            ),
            answer: AnswerSynthesizer::new(llm, prompts, temperature),
        })
    }

    pub async fn respond(
        &self,
        history: &ConversationHistory,
        correlation_id: &str,
    ) -> Result<String, PipelineError> {
        if history.is_empty() {
            return Err(PipelineError::MissingHistory);
        }

        info!(
            event_name = "pipeline.request.started",
            correlation_id,
            messages = history.len(),
            "chat pipeline started"
        );

        let result = self.run_stages(history, correlation_id).await;
        match &result {
            Ok(reply) => info!(
                event_name = "pipeline.request.completed",
                correlation_id,
                chars = reply.len(),
                "chat pipeline completed"
            ),
            Err(error) => warn!(
                event_name = "pipeline.request.failed",
                correlation_id,
                kind = error.kind(),
                error = %error,
                "chat pipeline failed"
            ),
        }
        result
    }

    async fn run_stages(
        &self,
        history: &ConversationHistory,
        correlation_id: &str,
    ) -> Result<String, PipelineError> {
        let synthesized = self.query.synthesize(history, correlation_id).await?;
        let context = self.executor.run(synthesized, correlation_id).await?;
        self.answer.synthesize(history, &context, correlation_id).await
    }
}
