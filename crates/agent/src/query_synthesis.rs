use std::sync::Arc;

use tracing::info;

use vidsage_core::{is_executable, ConversationHistory};

use crate::error::{PipelineError, Stage};
use crate::llm::{CompletionRequest, LlmClient};
use crate::prompts::PromptSet;

/// First completion: conversation in, catalog statement or refusal text out.
#[derive(Clone)]
pub struct QuerySynthesizer {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptSet>,
    temperature: f32,
}

impl QuerySynthesizer {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: Arc<PromptSet>, temperature: f32) -> Self {
        Self { llm, prompts, temperature }
    }

    /// Deterministic in `history`: the same history always builds the same request.
    pub fn request(&self, history: &ConversationHistory) -> Result<CompletionRequest, PipelineError> {
        let system = self
            .prompts
            .render_query()
            .map_err(|error| PipelineError::PromptRender(error.to_string()))?;
        Ok(CompletionRequest::new(system, history.messages(), self.temperature))
    }

    pub async fn synthesize(
        &self,
        history: &ConversationHistory,
        correlation_id: &str,
    ) -> Result<String, PipelineError> {
        let request = self.request(history)?;
        let output = self
            .llm
            .complete(request)
            .await
            .map_err(PipelineError::completion(Stage::QuerySynthesis))?;

        let output = output.trim();
        if output.is_empty() {
            return Err(PipelineError::SynthesisEmptyOutput);
        }

        info!(
            event_name = "pipeline.query_synthesis.completed",
            correlation_id,
            model = self.llm.model(),
            executable = is_executable(output),
            chars = output.len(),
            "query synthesis completed"
        );
        Ok(output.to_string())
    }
}
