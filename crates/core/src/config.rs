use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::statement::StatementGuard;

pub const DEFAULT_CONFIG_FILE: &str = "vidsage.toml";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub warehouse: WarehouseConfig,
    pub prompts: PromptConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
}

#[derive(Clone, Debug)]
pub struct WarehouseConfig {
    pub provider: WarehouseProvider,
    pub url: String,
    pub account: Option<String>,
    pub user: Option<String>,
    pub password: Option<SecretString>,
    pub warehouse: Option<String>,
    pub database: Option<String>,
    pub schema: Option<String>,
    pub role: Option<String>,
    pub catalog_table: String,
    pub fallback_table: String,
    pub statement_guard: StatementGuard,
}

/// Optional replacements for the built-in system prompt templates.
#[derive(Clone, Debug, Default)]
pub struct PromptConfig {
    pub query_system: Option<String>,
    pub answer_system: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarehouseProvider {
    Snowflake,
    Sqlite,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub llm_api_key: Option<String>,
    pub llm_base_url: Option<String>,
    pub llm_model: Option<String>,
    pub warehouse_provider: Option<WarehouseProvider>,
    pub warehouse_url: Option<String>,
    pub statement_guard: Option<StatementGuard>,
    pub server_port: Option<u16>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                api_key: None,
                base_url: "https://api.openai.com/v1".to_string(),
                model: "gpt-4o-mini".to_string(),
                temperature: 0.1,
            },
            warehouse: WarehouseConfig {
                provider: WarehouseProvider::Snowflake,
                url: "sqlite://vidsage.db".to_string(),
                account: None,
                user: None,
                password: None,
                warehouse: None,
                database: None,
                schema: None,
                role: None,
                catalog_table: "VIDEO_CATALOG".to_string(),
                fallback_table: "FEATURED_VIDEOS".to_string(),
                statement_guard: StatementGuard::default(),
            },
            prompts: PromptConfig::default(),
            server: ServerConfig { bind_address: "127.0.0.1".to_string(), port: 5000 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl WarehouseProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Snowflake => "snowflake",
            Self::Sqlite => "sqlite",
        }
    }
}

impl std::str::FromStr for WarehouseProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "snowflake" => Ok(Self::Snowflake),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(ConfigError::Validation(format!(
                "unsupported warehouse provider `{other}` (expected snowflake|sqlite)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(llm) = patch.llm {
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = base_url;
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(temperature) = llm.temperature {
                self.llm.temperature = temperature;
            }
        }

        if let Some(warehouse) = patch.warehouse {
            if let Some(provider) = warehouse.provider {
                self.warehouse.provider = provider;
            }
            if let Some(url) = warehouse.url {
                self.warehouse.url = url;
            }
            if let Some(account) = warehouse.account {
                self.warehouse.account = Some(account);
            }
            if let Some(user) = warehouse.user {
                self.warehouse.user = Some(user);
            }
            if let Some(password_value) = warehouse.password {
                self.warehouse.password = Some(secret_value(password_value));
            }
            if let Some(name) = warehouse.warehouse {
                self.warehouse.warehouse = Some(name);
            }
            if let Some(database) = warehouse.database {
                self.warehouse.database = Some(database);
            }
            if let Some(schema) = warehouse.schema {
                self.warehouse.schema = Some(schema);
            }
            if let Some(role) = warehouse.role {
                self.warehouse.role = Some(role);
            }
            if let Some(catalog_table) = warehouse.catalog_table {
                self.warehouse.catalog_table = catalog_table;
            }
            if let Some(fallback_table) = warehouse.fallback_table {
                self.warehouse.fallback_table = fallback_table;
            }
            if let Some(statement_guard) = warehouse.statement_guard {
                self.warehouse.statement_guard = statement_guard;
            }
        }

        if let Some(prompts) = patch.prompts {
            if let Some(query_system) = prompts.query_system {
                self.prompts.query_system = Some(query_system);
            }
            if let Some(answer_system) = prompts.answer_system {
                self.prompts.answer_system = Some(answer_system);
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        let api_key = read_env("VIDSAGE_LLM_API_KEY")
            .or_else(|| read_env("OPENAI_API_KEY"))
            .or_else(|| read_env("OPEN_AI_API"));
        if let Some(value) = api_key {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("VIDSAGE_LLM_BASE_URL") {
            self.llm.base_url = value;
        }
        if let Some(value) = read_env("VIDSAGE_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("VIDSAGE_LLM_TEMPERATURE") {
            self.llm.temperature = parse_f32("VIDSAGE_LLM_TEMPERATURE", &value)?;
        }

        if let Some(value) = read_env("VIDSAGE_WAREHOUSE_PROVIDER") {
            self.warehouse.provider = value.parse()?;
        }
        if let Some(value) = read_env("VIDSAGE_WAREHOUSE_URL") {
            self.warehouse.url = value;
        }
        if let Some(value) = read_env_alias("VIDSAGE_WAREHOUSE_ACCOUNT", "SNOWFLAKE_ACCOUNT") {
            self.warehouse.account = Some(value);
        }
        if let Some(value) = read_env_alias("VIDSAGE_WAREHOUSE_USER", "SNOWFLAKE_USER") {
            self.warehouse.user = Some(value);
        }
        if let Some(value) = read_env_alias("VIDSAGE_WAREHOUSE_PASSWORD", "SNOWFLAKE_PASSWORD") {
            self.warehouse.password = Some(secret_value(value));
        }
        if let Some(value) = read_env_alias("VIDSAGE_WAREHOUSE_NAME", "SNOWFLAKE_WAREHOUSE") {
            self.warehouse.warehouse = Some(value);
        }
        if let Some(value) = read_env_alias("VIDSAGE_WAREHOUSE_DATABASE", "SNOWFLAKE_DATABASE") {
            self.warehouse.database = Some(value);
        }
        if let Some(value) = read_env_alias("VIDSAGE_WAREHOUSE_SCHEMA", "SNOWFLAKE_SCHEMA") {
            self.warehouse.schema = Some(value);
        }
        if let Some(value) = read_env_alias("VIDSAGE_WAREHOUSE_ROLE", "SNOWFLAKE_ROLE") {
            self.warehouse.role = Some(value);
        }
        if let Some(value) = read_env("VIDSAGE_WAREHOUSE_CATALOG_TABLE") {
            self.warehouse.catalog_table = value;
        }
        if let Some(value) = read_env("VIDSAGE_WAREHOUSE_FALLBACK_TABLE") {
            self.warehouse.fallback_table = value;
        }
        if let Some(value) = read_env("VIDSAGE_WAREHOUSE_STATEMENT_GUARD") {
            self.warehouse.statement_guard =
                value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
                    key: "VIDSAGE_WAREHOUSE_STATEMENT_GUARD".to_string(),
                    value: value.clone(),
                })?;
        }

        if let Some(value) = read_env_alias("VIDSAGE_QUERY_PROMPT", "gpt_system_prompt1") {
            self.prompts.query_system = Some(value);
        }
        if let Some(value) = read_env_alias("VIDSAGE_ANSWER_PROMPT", "gpt_system_prompt2") {
            self.prompts.answer_system = Some(value);
        }

        if let Some(value) = read_env("VIDSAGE_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("VIDSAGE_SERVER_PORT") {
            self.server.port = parse_u16("VIDSAGE_SERVER_PORT", &value)?;
        }

        let log_level =
            read_env("VIDSAGE_LOGGING_LEVEL").or_else(|| read_env("VIDSAGE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("VIDSAGE_LOGGING_FORMAT").or_else(|| read_env("VIDSAGE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(llm_api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(secret_value(llm_api_key));
        }
        if let Some(llm_base_url) = overrides.llm_base_url {
            self.llm.base_url = llm_base_url;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(provider) = overrides.warehouse_provider {
            self.warehouse.provider = provider;
        }
        if let Some(url) = overrides.warehouse_url {
            self.warehouse.url = url;
        }
        if let Some(statement_guard) = overrides.statement_guard {
            self.warehouse.statement_guard = statement_guard;
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_llm(&self.llm)?;
        validate_warehouse(&self.warehouse)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from("config").join(DEFAULT_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    let missing =
        llm.api_key.as_ref().map(|value| value.expose_secret().trim().is_empty()).unwrap_or(true);
    if missing {
        return Err(ConfigError::Validation(
            "llm.api_key is required (set VIDSAGE_LLM_API_KEY or OPENAI_API_KEY)".to_string(),
        ));
    }

    if !llm.base_url.starts_with("http://") && !llm.base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "llm.base_url must start with http:// or https://".to_string(),
        ));
    }

    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }

    if !(0.0..=2.0).contains(&llm.temperature) {
        return Err(ConfigError::Validation(
            "llm.temperature must be in range 0.0..=2.0".to_string(),
        ));
    }

    Ok(())
}

fn validate_warehouse(warehouse: &WarehouseConfig) -> Result<(), ConfigError> {
    match warehouse.provider {
        WarehouseProvider::Snowflake => {
            let required = [
                ("warehouse.account", warehouse.account.as_deref()),
                ("warehouse.user", warehouse.user.as_deref()),
                ("warehouse.warehouse", warehouse.warehouse.as_deref()),
                ("warehouse.database", warehouse.database.as_deref()),
                ("warehouse.schema", warehouse.schema.as_deref()),
            ];
            for (key, value) in required {
                if value.map(|value| value.trim().is_empty()).unwrap_or(true) {
                    return Err(ConfigError::Validation(format!(
                        "{key} is required for the snowflake provider"
                    )));
                }
            }

            let password_missing = warehouse
                .password
                .as_ref()
                .map(|value| value.expose_secret().is_empty())
                .unwrap_or(true);
            if password_missing {
                return Err(ConfigError::Validation(
                    "warehouse.password is required for the snowflake provider".to_string(),
                ));
            }
        }
        WarehouseProvider::Sqlite => {
            let url = warehouse.url.trim();
            if !url.starts_with("sqlite:") {
                return Err(ConfigError::Validation(
                    "warehouse.url must be a sqlite URL (`sqlite://...` or `sqlite::...`)"
                        .to_string(),
                ));
            }
        }
    }

    if !is_table_identifier(&warehouse.catalog_table) {
        return Err(ConfigError::Validation(format!(
            "warehouse.catalog_table `{}` is not a valid table identifier",
            warehouse.catalog_table
        )));
    }
    if !is_table_identifier(&warehouse.fallback_table) {
        return Err(ConfigError::Validation(format!(
            "warehouse.fallback_table `{}` is not a valid table identifier",
            warehouse.fallback_table
        )));
    }

    Ok(())
}

/// Accepts `TABLE`, `SCHEMA.TABLE` or `DB.SCHEMA.TABLE` with unquoted parts.
pub fn is_table_identifier(value: &str) -> bool {
    let parts = value.split('.').collect::<Vec<_>>();
    if parts.is_empty() || parts.len() > 3 {
        return false;
    }

    parts.iter().all(|part| {
        let mut chars = part.chars();
        match chars.next() {
            Some(first) if first.is_ascii_alphabetic() || first == '_' => {
                chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '$')
            }
            _ => false,
        }
    })
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation("server.bind_address must not be empty".to_string()));
    }

    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn read_env_alias(key: &str, legacy_key: &str) -> Option<String> {
    read_env(key).or_else(|| read_env(legacy_key))
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_f32(key: &str, value: &str) -> Result<f32, ConfigError> {
    value.parse::<f32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    llm: Option<LlmPatch>,
    warehouse: Option<WarehousePatch>,
    prompts: Option<PromptPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct WarehousePatch {
    provider: Option<WarehouseProvider>,
    url: Option<String>,
    account: Option<String>,
    user: Option<String>,
    password: Option<String>,
    warehouse: Option<String>,
    database: Option<String>,
    schema: Option<String>,
    role: Option<String>,
    catalog_table: Option<String>,
    fallback_table: Option<String>,
    statement_guard: Option<StatementGuard>,
}

#[derive(Debug, Default, Deserialize)]
struct PromptPatch {
    query_system: Option<String>,
    answer_system: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
