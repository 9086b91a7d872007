use async_trait::async_trait;

use crate::error::Result;
use crate::models::{AttributeValue, FieldMap};

/// BatchGetItem for a single table
#[derive(Debug, Clone, PartialEq)]
pub struct BatchGetRequest {
    pub table: String,
    pub keys: Vec<FieldMap>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchGetResponse {
    pub items: Vec<FieldMap>,
    /// Keys the store did not process in this call
    pub unprocessed_keys: Vec<FieldMap>,
}

/// Unconditional PutItem
#[derive(Debug, Clone, PartialEq)]
pub struct PutRequest {
    pub table: String,
    pub item: FieldMap,
}

/// Query against a table or one of its secondary indexes
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub table: String,
    pub index_name: Option<String>,
    pub key_condition: String,
    pub filter: Option<String>,
    pub names: Vec<(String, String)>,
    pub values: Vec<(String, AttributeValue)>,
    pub limit: Option<u32>,
    pub scan_forward: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResponse {
    pub items: Vec<FieldMap>,
    /// Continuation cursor, present when more results exist
    pub last_evaluated_key: Option<FieldMap>,
}

/// Wire operations of the key-value store
///
/// Implementations surface terminal failures as `StoreUnavailable`; any
/// retrying happens below this seam.
#[async_trait]
pub trait StoreTransport: Send + Sync {
    async fn batch_get(&self, request: BatchGetRequest) -> Result<BatchGetResponse>;

    async fn put_item(&self, request: PutRequest) -> Result<()>;

    async fn query(&self, request: QueryRequest) -> Result<QueryResponse>;
}
