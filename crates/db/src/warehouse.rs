use async_trait::async_trait;
use thiserror::Error;

use vidsage_core::QueryResult;

#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("warehouse transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("warehouse rejected request: {0}")]
    Rejected(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("warehouse configuration error: {0}")]
    Configuration(String),
}

/// Source of per-request warehouse sessions. Implementations hold only
/// immutable connection settings; nothing is pooled or cached between calls.
#[async_trait]
pub trait Warehouse: Send + Sync {
    fn provider(&self) -> &'static str;

    async fn open(&self) -> Result<Box<dyn WarehouseSession>, WarehouseError>;
}

/// One open connection. Callers must hand it back through [`close`] on every
/// exit path.
///
/// [`close`]: WarehouseSession::close
#[async_trait]
pub trait WarehouseSession: Send {
    async fn query(&mut self, statement: &str) -> Result<QueryResult, WarehouseError>;

    async fn close(self: Box<Self>) -> Result<(), WarehouseError>;
}
