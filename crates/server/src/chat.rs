use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};
use uuid::Uuid;
use vidsage_agent::ChatPipeline;
use vidsage_core::{ConversationHistory, InterfaceError, Message};

#[derive(Clone)]
pub struct ChatState {
    pipeline: Arc<ChatPipeline>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Option<Vec<Message>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatError {
    pub error: String,
}

pub fn router(pipeline: Arc<ChatPipeline>) -> Router {
    Router::new()
        .route("/process-query", post(process_query))
        .route("/chat", post(process_query))
        .with_state(ChatState { pipeline })
}

pub async fn process_query(
    State(state): State<ChatState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, (StatusCode, Json<ChatError>)> {
    let correlation_id = Uuid::new_v4().to_string();
    let Json(request) = payload.map_err(|rejection| {
        reject(InterfaceError::bad_request(rejection.body_text(), correlation_id.as_str()))
    })?;

    let history = ConversationHistory::new(request.messages.unwrap_or_default());
    match state.pipeline.respond(&history, &correlation_id).await {
        Ok(response) => Ok(Json(ChatResponse { response })),
        Err(failure) => Err(reject(failure.into_interface(correlation_id))),
    }
}

fn reject(failure: InterfaceError) -> (StatusCode, Json<ChatError>) {
    let status =
        StatusCode::from_u16(failure.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        error!(
            event_name = "http.chat.failed",
            correlation_id = failure.correlation_id(),
            status = status.as_u16(),
            error = %failure,
            "chat request failed"
        );
    } else {
        warn!(
            event_name = "http.chat.rejected",
            correlation_id = failure.correlation_id(),
            status = status.as_u16(),
            error = %failure,
            "chat request rejected"
        );
    }
    (status, Json(ChatError { error: failure.user_message().to_string() }))
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;
    use vidsage_agent::{ChatPipeline, CompletionRequest, LlmClient, LlmError};
    use vidsage_core::config::{AppConfig, WarehouseProvider};
    use vidsage_core::errors::{
        INVALID_REQUEST_MESSAGE, MISSING_HISTORY_MESSAGE, PROCESSING_FAILURE_MESSAGE,
    };
    use vidsage_db::{connect, DemoCatalog};

    use crate::chat::router;

    #[derive(Default)]
    struct CannedLlm {
        replies: Mutex<VecDeque<String>>,
        systems: Mutex<Vec<String>>,
    }

    impl CannedLlm {
        fn new(replies: &[&str]) -> Arc<Self> {
            let llm = Self::default();
            llm.replies
                .lock()
                .expect("replies lock")
                .extend(replies.iter().map(|reply| reply.to_string()));
            Arc::new(llm)
        }

        fn systems(&self) -> Vec<String> {
            self.systems.lock().expect("systems lock").clone()
        }
    }

    #[async_trait]
    impl LlmClient for CannedLlm {
        fn model(&self) -> &str {
            "canned"
        }

        async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
            self.systems.lock().expect("systems lock").push(request.system);
            self.replies.lock().expect("replies lock").pop_front().ok_or(LlmError::NoChoices)
        }
    }

    fn sqlite_config(url: &str) -> AppConfig {
        let mut config = AppConfig::default();
        config.warehouse.provider = WarehouseProvider::Sqlite;
        config.warehouse.url = url.to_string();
        config
    }

    async fn seeded_config(dir: &TempDir) -> AppConfig {
        let url = format!("sqlite://{}", dir.path().join("catalog.db").display());
        DemoCatalog::seed(&url, "VIDEO_CATALOG", "FEATURED_VIDEOS").await.expect("seed");
        sqlite_config(&url)
    }

    fn app(llm: Arc<CannedLlm>, config: &AppConfig) -> Router {
        let warehouse = connect(&config.warehouse).expect("warehouse");
        router(Arc::new(ChatPipeline::new(llm, warehouse, config).expect("prompts render")))
    }

    async fn post(app: Router, path: &str, body: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(path)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .expect("request"),
            )
            .await
            .expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[tokio::test]
    async fn sleep_question_is_answered_from_catalog_rows() {
        let dir = TempDir::new().expect("temp dir");
        let config = seeded_config(&dir).await;
        let llm = CannedLlm::new(&[
            "SELECT TITLE, THUMBNAIL_URL, VIDEO_URL FROM VIDEO_CATALOG WHERE LOWER(TITLE) LIKE '%sleep%' OR LOWER(TOPIC) LIKE '%sleep%' LIMIT 10",
            "There are two videos on sleep in the catalog.",
        ]);

        let (status, body) = post(
            app(llm.clone(), &config),
            "/process-query",
            r#"{"messages":[{"role":"user","content":"videos about sleep"}]}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"response": "There are two videos on sleep in the catalog."}));
        let systems = llm.systems();
        assert!(systems[1].contains("fix your sleep schedule in 7 days"));
        assert!(!systems[1].contains("strength training after forty"));
    }

    #[tokio::test]
    async fn unmatched_statement_falls_back_to_featured_videos() {
        let dir = TempDir::new().expect("temp dir");
        let config = seeded_config(&dir).await;
        let llm = CannedLlm::new(&[
            "SELECT * FROM VIDEO_CATALOG WHERE LOWER(TITLE) LIKE '%knitting%' LIMIT 10",
            "Nothing on knitting, but here is our most requested episode.",
        ]);

        let (status, _) = post(
            app(llm.clone(), &config),
            "/chat",
            r#"{"messages":[{"role":"user","content":"knitting videos"}]}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let systems = llm.systems();
        assert!(systems[1].contains("lsODSDmY4CY"));
        assert!(!systems[1].contains("the science of deep sleep"));
    }

    #[tokio::test]
    async fn empty_or_missing_history_is_rejected() {
        let config = sqlite_config("sqlite::memory:");
        for body in [r#"{"messages":[]}"#, r#"{}"#, r#"{"messages":null}"#] {
            let llm = CannedLlm::new(&[]);
            let (status, payload) = post(app(llm.clone(), &config), "/process-query", body).await;

            assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
            assert_eq!(payload, json!({"error": MISSING_HISTORY_MESSAGE}));
            assert!(llm.systems().is_empty());
        }
    }

    #[tokio::test]
    async fn malformed_body_is_a_bad_request() {
        let config = sqlite_config("sqlite::memory:");
        for body in ["not json", r#"{"messages":[{"role":"tool","content":"x"}]}"#] {
            let (status, payload) =
                post(app(CannedLlm::new(&[]), &config), "/process-query", body).await;

            assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
            assert_eq!(payload, json!({"error": INVALID_REQUEST_MESSAGE}));
        }
    }

    #[tokio::test]
    async fn warehouse_failure_returns_generic_error() {
        let config = sqlite_config("sqlite:///nonexistent-dir/vidsage/catalog.db");
        let llm = CannedLlm::new(&["SELECT * FROM VIDEO_CATALOG LIMIT 10", "unused"]);

        let (status, payload) = post(
            app(llm, &config),
            "/process-query",
            r#"{"messages":[{"role":"user","content":"anything new?"}]}"#,
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(payload, json!({"error": PROCESSING_FAILURE_MESSAGE}));
    }
}
