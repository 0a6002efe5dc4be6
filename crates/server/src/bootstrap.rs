use std::sync::Arc;

use thiserror::Error;
use tracing::info;
use vidsage_agent::{ChatPipeline, LlmError, OpenAiClient, PromptError};
use vidsage_core::config::{AppConfig, ConfigError, LoadOptions};
use vidsage_db::{connect, WarehouseError};

pub struct Application {
    pub config: AppConfig,
    pub pipeline: Arc<ChatPipeline>,
    pub warehouse_provider: &'static str,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("completion client setup failed: {0}")]
    Llm(#[source] LlmError),
    #[error("warehouse setup failed: {0}")]
    Warehouse(#[source] WarehouseError),
    #[error(transparent)]
    Prompts(#[from] PromptError),
}

pub fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config)
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );
    config.validate()?;

    let llm = OpenAiClient::from_config(&config.llm).map_err(BootstrapError::Llm)?;
    let warehouse = connect(&config.warehouse).map_err(BootstrapError::Warehouse)?;
    let warehouse_provider = warehouse.provider();
    info!(
        event_name = "system.bootstrap.clients_ready",
        correlation_id = "bootstrap",
        model = %config.llm.model,
        warehouse_provider,
        statement_guard = config.warehouse.statement_guard.as_str(),
        "completion and warehouse clients configured"
    );

    let pipeline = Arc::new(ChatPipeline::new(Arc::new(llm), warehouse, &config)?);
    Ok(Application { config, pipeline, warehouse_provider })
}
