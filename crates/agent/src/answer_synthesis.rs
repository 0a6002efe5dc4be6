use std::sync::Arc;

use tracing::info;

use vidsage_core::{ConversationHistory, ReplyShape, StageContext};

use crate::error::{PipelineError, Stage};
use crate::llm::{CompletionRequest, LlmClient};
use crate::prompts::PromptSet;

/// Second completion: grounds the reply in the executor's context.
#[derive(Clone)]
pub struct AnswerSynthesizer {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptSet>,
    temperature: f32,
}

impl AnswerSynthesizer {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: Arc<PromptSet>, temperature: f32) -> Self {
        Self { llm, prompts, temperature }
    }

    pub fn request(
        &self,
        history: &ConversationHistory,
        context: &StageContext,
    ) -> Result<CompletionRequest, PipelineError> {
        let system = self
            .prompts
            .render_answer(&context.render())
            .map_err(|error| PipelineError::PromptRender(error.to_string()))?;
        Ok(CompletionRequest::new(system, history.messages(), self.temperature))
    }

    pub async fn synthesize(
        &self,
        history: &ConversationHistory,
        context: &StageContext,
        correlation_id: &str,
    ) -> Result<String, PipelineError> {
        let request = self.request(history, context)?;
        let output = self
            .llm
            .complete(request)
            .await
            .map_err(PipelineError::completion(Stage::AnswerSynthesis))?;

        let output = output.trim();
        if output.is_empty() {
            return Err(PipelineError::AnswerEmptyOutput);
        }

        let shape = ReplyShape::classify(output);
        info!(
            event_name = "pipeline.answer_synthesis.completed",
            correlation_id,
            model = self.llm.model(),
            shape = shape.label(),
            grounded_on_rows = context.was_executed(),
            "answer synthesis completed"
        );
        Ok(output.to_string())
    }
}
