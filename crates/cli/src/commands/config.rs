use std::env;
use std::fs;
use std::path::Path;

use secrecy::SecretString;
use toml::Value;
use vidsage_core::config::{resolve_config_path, AppConfig, LoadOptions};

struct Field {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

impl Field {
    fn new(key: &'static str, value: impl Into<String>, env_keys: &'static [&'static str]) -> Self {
        Self { key, value: value.into(), env_keys }
    }
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in fields(&config) {
        let source = field_source(
            field.key,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key, &field.value, source));
    }

    lines.join("\n")
}

fn fields(config: &AppConfig) -> Vec<Field> {
    let llm = &config.llm;
    let warehouse = &config.warehouse;

    vec![
        Field::new(
            "llm.api_key",
            redact_secret(llm.api_key.as_ref()),
            &["VIDSAGE_LLM_API_KEY", "OPENAI_API_KEY", "OPEN_AI_API"],
        ),
        Field::new("llm.base_url", llm.base_url.as_str(), &["VIDSAGE_LLM_BASE_URL"]),
        Field::new("llm.model", llm.model.as_str(), &["VIDSAGE_LLM_MODEL"]),
        Field::new("llm.temperature", llm.temperature.to_string(), &["VIDSAGE_LLM_TEMPERATURE"]),
        Field::new(
            "warehouse.provider",
            warehouse.provider.as_str(),
            &["VIDSAGE_WAREHOUSE_PROVIDER"],
        ),
        Field::new("warehouse.url", warehouse.url.as_str(), &["VIDSAGE_WAREHOUSE_URL"]),
        Field::new(
            "warehouse.account",
            or_unset(warehouse.account.as_deref()),
            &["VIDSAGE_WAREHOUSE_ACCOUNT", "SNOWFLAKE_ACCOUNT"],
        ),
        Field::new(
            "warehouse.user",
            or_unset(warehouse.user.as_deref()),
            &["VIDSAGE_WAREHOUSE_USER", "SNOWFLAKE_USER"],
        ),
        Field::new(
            "warehouse.password",
            redact_secret(warehouse.password.as_ref()),
            &["VIDSAGE_WAREHOUSE_PASSWORD", "SNOWFLAKE_PASSWORD"],
        ),
        Field::new(
            "warehouse.warehouse",
            or_unset(warehouse.warehouse.as_deref()),
            &["VIDSAGE_WAREHOUSE_NAME", "SNOWFLAKE_WAREHOUSE"],
        ),
        Field::new(
            "warehouse.database",
            or_unset(warehouse.database.as_deref()),
            &["VIDSAGE_WAREHOUSE_DATABASE", "SNOWFLAKE_DATABASE"],
        ),
        Field::new(
            "warehouse.schema",
            or_unset(warehouse.schema.as_deref()),
            &["VIDSAGE_WAREHOUSE_SCHEMA", "SNOWFLAKE_SCHEMA"],
        ),
        Field::new(
            "warehouse.role",
            or_unset(warehouse.role.as_deref()),
            &["VIDSAGE_WAREHOUSE_ROLE", "SNOWFLAKE_ROLE"],
        ),
        Field::new(
            "warehouse.catalog_table",
            warehouse.catalog_table.as_str(),
            &["VIDSAGE_WAREHOUSE_CATALOG_TABLE"],
        ),
        Field::new(
            "warehouse.fallback_table",
            warehouse.fallback_table.as_str(),
            &["VIDSAGE_WAREHOUSE_FALLBACK_TABLE"],
        ),
        Field::new(
            "warehouse.statement_guard",
            warehouse.statement_guard.as_str(),
            &["VIDSAGE_WAREHOUSE_STATEMENT_GUARD"],
        ),
        Field::new(
            "prompts.query_system",
            prompt_state(config.prompts.query_system.as_deref()),
            &["VIDSAGE_QUERY_PROMPT", "gpt_system_prompt1"],
        ),
        Field::new(
            "prompts.answer_system",
            prompt_state(config.prompts.answer_system.as_deref()),
            &["VIDSAGE_ANSWER_PROMPT", "gpt_system_prompt2"],
        ),
        Field::new(
            "server.bind_address",
            config.server.bind_address.as_str(),
            &["VIDSAGE_SERVER_BIND_ADDRESS"],
        ),
        Field::new("server.port", config.server.port.to_string(), &["VIDSAGE_SERVER_PORT"]),
        Field::new(
            "logging.level",
            config.logging.level.as_str(),
            &["VIDSAGE_LOGGING_LEVEL", "VIDSAGE_LOG_LEVEL"],
        ),
        Field::new(
            "logging.format",
            format!("{:?}", config.logging.format),
            &["VIDSAGE_LOGGING_FORMAT", "VIDSAGE_LOG_FORMAT"],
        ),
    ]
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    let from_env = env_keys.iter().find(|key| {
        env::var(key).map(|value| !value.trim().is_empty()).unwrap_or(false)
    });
    if let Some(env_key) = from_env {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_secret(secret: Option<&SecretString>) -> &'static str {
    if secret.is_some() {
        "<redacted>"
    } else {
        "<unset>"
    }
}

fn or_unset(value: Option<&str>) -> &str {
    value.unwrap_or("<unset>")
}

fn prompt_state(value: Option<&str>) -> String {
    match value {
        Some(text) => format!("<custom, {} chars>", text.chars().count()),
        None => "<built-in>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use toml::Value;

    use super::{contains_path, prompt_state, redact_secret};

    #[test]
    fn contains_path_walks_nested_tables() {
        let doc: Value = "[warehouse]\ncatalog_table = \"VIDEOS\"\n".parse().expect("toml");

        assert!(contains_path(&doc, "warehouse.catalog_table"));
        assert!(!contains_path(&doc, "warehouse.fallback_table"));
        assert!(!contains_path(&doc, "llm.model"));
    }

    #[test]
    fn secrets_and_prompts_are_summarised() {
        let secret = secrecy::SecretString::from("sk-live-123".to_string());

        assert_eq!(redact_secret(Some(&secret)), "<redacted>");
        assert_eq!(redact_secret(None), "<unset>");
        assert_eq!(prompt_state(Some("abc")), "<custom, 3 chars>");
        assert_eq!(prompt_state(None), "<built-in>");
    }
}
