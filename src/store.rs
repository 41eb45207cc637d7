//! The contract between a repository and the remote table store.

use async_trait::async_trait;
use thiserror::Error;

use crate::record::{Record, Value};

/// Largest number of delete requests a single batch call accepts.
pub const MAX_BATCH_DELETE: usize = 25;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Batch of {size} requests exceeds the limit of {limit}")]
    BatchTooLarge { size: usize, limit: usize },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Request failed: {0}")]
    Request(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    Hash,
    Range,
}

/// One component of a table's key schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySchemaElement {
    pub attribute_name: String,
    pub key_type: KeyType,
}

/// Opaque marker telling the store where the previous scan page ended.
#[derive(Debug, Clone, PartialEq)]
pub struct ContinuationToken(pub(crate) Record);

/// One page of a scan. `continuation` is `None` once the table is exhausted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanPage {
    pub items: Vec<Record>,
    pub continuation: Option<ContinuationToken>,
}

#[async_trait]
pub trait TableStore: Send + Sync {
    /// Ordered key schema of `table`.
    async fn describe_key_schema(&self, table: &str) -> StoreResult<Vec<KeySchemaElement>>;

    /// Fetch the page that follows `start`, or the first page when `start` is `None`.
    async fn scan(&self, table: &str, start: Option<ContinuationToken>) -> StoreResult<ScanPage>;

    /// Delete the rows whose `key_field` equals one of `ids`.
    ///
    /// Implementations reject more than [`MAX_BATCH_DELETE`] ids per call.
    async fn batch_delete(&self, table: &str, key_field: &str, ids: &[Value]) -> StoreResult<()>;
}
