use std::sync::Arc;

use uuid::Uuid;
use vidsage_agent::{ChatPipeline, OpenAiClient};
use vidsage_core::config::{AppConfig, LoadOptions, LogFormat};
use vidsage_core::{ConversationHistory, Message};
use vidsage_db::connect;

use crate::commands::{current_thread_runtime, traced, CommandResult};

pub fn run(text: &str) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "ask",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };
    init_logging(&config);

    let runtime = match current_thread_runtime() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "ask",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let llm = match OpenAiClient::from_config(&config.llm) {
        Ok(llm) => llm,
        Err(error) => return CommandResult::failure("ask", "client_setup", error.to_string(), 4),
    };
    let warehouse = match connect(&config.warehouse) {
        Ok(warehouse) => warehouse,
        Err(error) => return CommandResult::failure("ask", "client_setup", error.to_string(), 4),
    };

    let pipeline = match ChatPipeline::new(Arc::new(llm), warehouse, &config) {
        Ok(pipeline) => pipeline,
        Err(error) => return CommandResult::failure("ask", "prompt_template", error.to_string(), 4),
    };
    let history = ConversationHistory::new(vec![Message::user(text)]);
    let correlation_id = Uuid::new_v4().to_string();

    let outcome = runtime
        .block_on(pipeline.respond(&history, &correlation_id))
        .map_err(|error| (error.kind(), error.to_string(), 5u8));
    traced("ask", &correlation_id, outcome)
}

/// Logs go to stderr so stdout carries only the JSON result.
fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    // A subscriber may already be installed when several commands run in one process.
    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
