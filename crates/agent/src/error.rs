use std::fmt;

use thiserror::Error;

use vidsage_core::InterfaceError;
use vidsage_db::WarehouseError;

use crate::llm::LlmError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    QuerySynthesis,
    AnswerSynthesis,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QuerySynthesis => "query_synthesis",
            Self::AnswerSynthesis => "answer_synthesis",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no message history provided")]
    MissingHistory,
    #[error("query synthesis produced no output")]
    SynthesisEmptyOutput,
    #[error("{stage} completion failed: {source}")]
    Completion {
        stage: Stage,
        #[source]
        source: LlmError,
    },
    #[error("could not open a warehouse session: {0}")]
    WarehouseConnect(#[source] WarehouseError),
    #[error("warehouse statement failed: {0}")]
    WarehouseQuery(#[source] WarehouseError),
    #[error("generated statement rejected: {reason}")]
    UnsafeStatement { reason: String },
    #[error("answer synthesis produced no output")]
    AnswerEmptyOutput,
    #[error("prompt template failed to render: {0}")]
    PromptRender(String),
}

impl PipelineError {
    pub fn completion(stage: Stage) -> impl FnOnce(LlmError) -> Self {
        move |source| Self::Completion { stage, source }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingHistory => "missing_history",
            Self::SynthesisEmptyOutput => "synthesis_empty_output",
            Self::Completion { .. } => "completion",
            Self::WarehouseConnect(_) => "warehouse_connect",
            Self::WarehouseQuery(_) => "warehouse_query",
            Self::UnsafeStatement { .. } => "unsafe_statement",
            Self::AnswerEmptyOutput => "answer_empty_output",
            Self::PromptRender(_) => "prompt_render",
        }
    }

    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        match self {
            Self::MissingHistory => InterfaceError::missing_history(correlation_id),
            other => InterfaceError::internal(other.to_string(), correlation_id),
        }
    }
}
