use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use vidsage_core::{QueryResult, Row};
use vidsage_db::{Warehouse, WarehouseError, WarehouseSession};

use crate::llm::{CompletionRequest, LlmClient, LlmError};

/// Replies with queued completions in order and records every request.
#[derive(Default)]
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedLlm {
    pub fn replying(replies: &[&str]) -> Arc<Self> {
        let llm = Self::default();
        for reply in replies {
            llm.push(Ok(reply.to_string()));
        }
        Arc::new(llm)
    }

    pub fn push(&self, reply: Result<String, LlmError>) {
        self.replies.lock().expect("replies lock").push_back(reply);
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    fn model(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        self.requests.lock().expect("requests lock").push(request);
        self.replies
            .lock()
            .expect("replies lock")
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::NoChoices))
    }
}

#[derive(Default)]
struct WarehouseLog {
    results: Mutex<VecDeque<Result<QueryResult, WarehouseError>>>,
    statements: Mutex<Vec<String>>,
    opens: AtomicUsize,
    closes: AtomicUsize,
}

/// Serves queued results per statement and records what ran.
#[derive(Default)]
pub struct RecordingWarehouse {
    log: Arc<WarehouseLog>,
    refuse_connections: bool,
}

impl RecordingWarehouse {
    pub fn with_results(results: Vec<Result<QueryResult, WarehouseError>>) -> Arc<Self> {
        let warehouse = Self::default();
        warehouse.log.results.lock().expect("results lock").extend(results);
        Arc::new(warehouse)
    }

    pub fn unreachable() -> Arc<Self> {
        Arc::new(Self { log: Arc::default(), refuse_connections: true })
    }

    pub fn statements(&self) -> Vec<String> {
        self.log.statements.lock().expect("statements lock").clone()
    }

    pub fn opens(&self) -> usize {
        self.log.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.log.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Warehouse for RecordingWarehouse {
    fn provider(&self) -> &'static str {
        "recording"
    }

    async fn open(&self) -> Result<Box<dyn WarehouseSession>, WarehouseError> {
        if self.refuse_connections {
            return Err(WarehouseError::Rejected("connection refused".to_string()));
        }
        self.log.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(RecordingSession { log: Arc::clone(&self.log) }))
    }
}

struct RecordingSession {
    log: Arc<WarehouseLog>,
}

#[async_trait]
impl WarehouseSession for RecordingSession {
    async fn query(&mut self, statement: &str) -> Result<QueryResult, WarehouseError> {
        self.log.statements.lock().expect("statements lock").push(statement.to_string());
        self.log
            .results
            .lock()
            .expect("results lock")
            .pop_front()
            .unwrap_or_else(|| Ok(QueryResult::empty()))
    }

    async fn close(self: Box<Self>) -> Result<(), WarehouseError> {
        self.log.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn video_row(title: &str, id: &str) -> Row {
    Row::new(vec![
        ("TITLE".to_string(), json!(title)),
        ("THUMBNAIL_URL".to_string(), json!(format!("https://i.ytimg.com/vi/{id}/maxresdefault.jpg"))),
        ("VIDEO_URL".to_string(), json!(format!("https://www.youtube.com/watch?v={id}"))),
    ])
}
