//! Chat pipeline for the video catalog assistant.
//!
//! A request flows through three stages in order:
//! 1. **Query synthesis** (`query_synthesis`) - the completion service turns
//!    the conversation into a catalog statement or a refusal sentence.
//! 2. **Execution** (`executor`) - a statement starting with `SELECT` runs
//!    against the warehouse, falling back to the featured table when it
//!    matches nothing. Anything else passes through untouched.
//! 3. **Answer synthesis** (`answer_synthesis`) - a second completion grounds
//!    the reply in the rows or the passthrough text.
//!
//! The LLM never sees the warehouse directly. It only writes text that the
//! executor decides whether to run.

pub mod answer_synthesis;
pub mod error;
pub mod executor;
pub mod llm;
pub mod openai;
pub mod pipeline;
pub mod prompts;
pub mod query_synthesis;

#[cfg(test)]
mod test_support;

pub use error::{PipelineError, Stage};
pub use llm::{CompletionRequest, LlmClient, LlmError};
pub use openai::OpenAiClient;
pub use pipeline::ChatPipeline;
pub use prompts::{PromptError, PromptSet};
