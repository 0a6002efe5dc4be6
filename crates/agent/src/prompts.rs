//! System prompt templates for both completion stages.
//!
//! Templates use tera syntax. Operators may replace either template through
//! configuration; the replacement sees the same variables as the default.
//! Both templates are rendered once when the set is built, so a broken
//! override fails at startup instead of on every request.

use std::error::Error as _;

use serde_json::json;
use tera::{Context, Tera};
use thiserror::Error;

use vidsage_core::config::{PromptConfig, WarehouseConfig, WarehouseProvider};
use vidsage_core::{CATALOG_COLUMNS, CATEGORIES, SEARCHABLE_COLUMNS};

pub const ROW_LIMIT: usize = 10;
pub const WORD_LIMIT: usize = 120;

/// Emitted by query synthesis for off-topic input. Never starts with `SELECT`.
pub const REFUSAL_SENTENCE: &str =
    "This question is not about the video catalog, so no query was generated.";

pub const REDIRECT_SENTENCE: &str = "I can only help with questions about our videos. \
Ask me about a topic, a guest or a category and I will find something worth watching.";

const DEFAULT_QUERY_TEMPLATE: &str = r#"You translate questions about a video catalog into one {{ dialect }} SQL statement.

The only table is {{ catalog_table }} with these columns:
{% for column in columns %}- {{ column.name }} ({{ column.sql_type }}): {{ column.description }}
{% endfor %}
CATEGORY is one of: {{ categories | join(sep=", ") }}.

Rules:
- Reply with the statement only. It must start with SELECT. No explanation and no code fences.
- Every text value is stored in lower case, so write search terms in lower case.
- Match with LIKE '%term%' using a single word per LIKE, across {{ searchable | join(sep=", ") }}.
- Combine predicates with OR only. Never use AND.
- Always end the statement with LIMIT {{ row_limit }}.
- If the request is vague, broaden the search instead of refusing.
- If the request has nothing to do with videos, reply with exactly this sentence and nothing else:
{{ refusal_sentence }}"#;

const DEFAULT_ANSWER_TEMPLATE: &str = r#"You are the assistant of a video channel and help viewers find videos to watch.

Data for the latest question:
{{ context }}

How to answer:
- If the viewer asks for a video recommendation, reply with one line in the form 'reply','thumbnail_url','video_url'. Wrap each part in single quotes and separate the parts with commas and no spaces. Take both URLs from the data above. Never leave a URL empty. If no row has both URLs, answer in prose instead.
- Otherwise answer in plain prose of at most {{ word_limit }} words, using only the data above.
- If the viewer greets you, introduce yourself and explain that you find videos by topic, guest or category.
- If the data above is the sentence "{{ refusal_sentence }}", reply with exactly:
{{ redirect_sentence }}"#;

#[derive(Debug, Error)]
#[error("{template} prompt template is invalid: {detail}")]
pub struct PromptError {
    pub template: &'static str,
    pub detail: String,
}

impl PromptError {
    fn new(template: &'static str, error: &tera::Error) -> Self {
        let mut detail = error.to_string();
        let mut source = error.source();
        while let Some(cause) = source {
            detail.push_str(": ");
            detail.push_str(&cause.to_string());
            source = cause.source();
        }
        Self { template, detail }
    }
}

#[derive(Clone, Debug)]
pub struct PromptSet {
    query_template: String,
    answer_template: String,
    catalog_table: String,
    dialect: &'static str,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self {
            query_template: DEFAULT_QUERY_TEMPLATE.to_string(),
            answer_template: DEFAULT_ANSWER_TEMPLATE.to_string(),
            catalog_table: "VIDEO_CATALOG".to_string(),
            dialect: dialect(WarehouseProvider::Snowflake),
        }
    }
}

fn dialect(provider: WarehouseProvider) -> &'static str {
    match provider {
        WarehouseProvider::Snowflake => "Snowflake",
        WarehouseProvider::Sqlite => "SQLite",
    }
}

impl PromptSet {
    pub fn from_config(
        prompts: &PromptConfig,
        warehouse: &WarehouseConfig,
    ) -> Result<Self, PromptError> {
        let set = Self {
            query_template: prompts
                .query_system
                .clone()
                .unwrap_or_else(|| DEFAULT_QUERY_TEMPLATE.to_string()),
            answer_template: prompts
                .answer_system
                .clone()
                .unwrap_or_else(|| DEFAULT_ANSWER_TEMPLATE.to_string()),
            catalog_table: warehouse.catalog_table.clone(),
            dialect: dialect(warehouse.provider),
        };

        set.render_query().map_err(|error| PromptError::new("query", &error))?;
        set.render_answer("[]").map_err(|error| PromptError::new("answer", &error))?;
        Ok(set)
    }

    pub fn render_query(&self) -> Result<String, tera::Error> {
        Tera::one_off(&self.query_template, &self.base_context(), false)
    }

    /// Renders the answer prompt around `context`. A template that never
    /// places the context gets it appended.
    pub fn render_answer(&self, context: &str) -> Result<String, tera::Error> {
        let mut variables = self.base_context();
        variables.insert("context", context);
        let rendered = Tera::one_off(&self.answer_template, &variables, false)?;

        if rendered.contains(context) {
            Ok(rendered)
        } else {
            Ok(format!("{rendered}\n\nData for the latest question:\n{context}"))
        }
    }

    fn base_context(&self) -> Context {
        let columns = CATALOG_COLUMNS
            .iter()
            .map(|column| {
                json!({
                    "name": column.name,
                    "sql_type": column.sql_type,
                    "description": column.description,
                })
            })
            .collect::<Vec<_>>();

        let mut context = Context::new();
        context.insert("catalog_table", &self.catalog_table);
        context.insert("dialect", self.dialect);
        context.insert("columns", &columns);
        context.insert("categories", CATEGORIES);
        context.insert("searchable", SEARCHABLE_COLUMNS);
        context.insert("row_limit", &ROW_LIMIT);
        context.insert("word_limit", &WORD_LIMIT);
        context.insert("refusal_sentence", REFUSAL_SENTENCE);
        context.insert("redirect_sentence", REDIRECT_SENTENCE);
        context
    }
}

#[cfg(test)]
mod tests {
    use vidsage_core::config::{AppConfig, PromptConfig, WarehouseProvider};
    use vidsage_core::is_executable;

    use super::{PromptSet, REDIRECT_SENTENCE, REFUSAL_SENTENCE};

    #[test]
    fn refusal_sentence_is_never_executable() {
        assert!(!is_executable(REFUSAL_SENTENCE));
    }

    #[test]
    fn default_query_prompt_describes_table_and_rules() {
        let mut config = AppConfig::default();
        config.warehouse.catalog_table = "ANALYTICS.PUBLIC.VIDEOS".to_string();
        let prompts = PromptSet::from_config(&config.prompts, &config.warehouse).expect("prompts");

        let rendered = prompts.render_query().expect("render");

        assert!(rendered.contains("one Snowflake SQL statement"));
        assert!(rendered.contains("ANALYTICS.PUBLIC.VIDEOS"));
        assert!(rendered.contains("- THUMBNAIL_URL (TEXT)"));
        assert!(rendered.contains("podcast, interview, tutorial, short, livestream"));
        assert!(rendered.contains("LIMIT 10"));
        assert!(rendered.contains("OR only"));
        assert!(rendered.contains(REFUSAL_SENTENCE));
        assert!(!rendered.contains("{{"));
    }

    #[test]
    fn default_answer_prompt_embeds_context_and_contract() {
        let rendered = PromptSet::default()
            .render_answer(r#"[{"TITLE": "the science of deep sleep"}]"#)
            .expect("render");

        assert!(rendered.contains(r#""TITLE": "the science of deep sleep""#));
        assert!(rendered.contains("'reply','thumbnail_url','video_url'"));
        assert!(rendered.contains("at most 120 words"));
        assert!(rendered.contains(REDIRECT_SENTENCE));
    }

    #[test]
    fn plain_text_override_gets_context_appended() {
        let config = AppConfig::default();
        let overrides = PromptConfig {
            query_system: None,
            answer_system: Some("Answer briefly and kindly.".to_string()),
        };
        let prompts = PromptSet::from_config(&overrides, &config.warehouse).expect("prompts");

        let rendered = prompts.render_answer("no rows matched").expect("render");

        assert!(rendered.starts_with("Answer briefly and kindly."));
        assert!(rendered.ends_with("no rows matched"));
    }

    #[test]
    fn override_may_place_context_itself() {
        let config = AppConfig::default();
        let overrides = PromptConfig {
            query_system: Some("Query {{ catalog_table }} with LIMIT {{ row_limit }}.".to_string()),
            answer_system: Some("Rows: {{ context }}. Be brief.".to_string()),
        };
        let prompts = PromptSet::from_config(&overrides, &config.warehouse).expect("prompts");

        assert_eq!(prompts.render_query().expect("query"), "Query VIDEO_CATALOG with LIMIT 10.");
        assert_eq!(prompts.render_answer("[]").expect("answer"), "Rows: []. Be brief.");
    }

    #[test]
    fn sqlite_provider_names_its_dialect() {
        let mut config = AppConfig::default();
        config.warehouse.provider = WarehouseProvider::Sqlite;
        let prompts = PromptSet::from_config(&config.prompts, &config.warehouse).expect("prompts");

        let rendered = prompts.render_query().expect("render");

        assert!(rendered.contains("one SQLite SQL statement"));
        assert!(!rendered.contains("Snowflake"));
    }

    #[test]
    fn broken_query_override_is_rejected_when_built() {
        let config = AppConfig::default();
        let overrides = PromptConfig {
            query_system: Some("{% if %}".to_string()),
            answer_system: None,
        };

        let error = PromptSet::from_config(&overrides, &config.warehouse).expect_err("invalid");

        assert_eq!(error.template, "query");
    }

    #[test]
    fn legacy_prose_with_tag_markers_is_rejected_when_built() {
        let config = AppConfig::default();
        let overrides = PromptConfig {
            query_system: None,
            answer_system: Some("Keep answers short {# and friendly.".to_string()),
        };

        let error = PromptSet::from_config(&overrides, &config.warehouse).expect_err("invalid");

        assert_eq!(error.template, "answer");
        assert!(error.to_string().starts_with("answer prompt template is invalid"));
    }

    #[test]
    fn unknown_variable_in_override_is_rejected_when_built() {
        let config = AppConfig::default();
        let overrides = PromptConfig {
            query_system: Some("Query {{ table_name }}.".to_string()),
            answer_system: None,
        };

        assert!(PromptSet::from_config(&overrides, &config.warehouse).is_err());
    }
}
