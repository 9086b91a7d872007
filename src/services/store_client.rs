//! Store client: typed get / insert / query over a [`StoreTransport`]
//!
//! Every call builds its own field maps and alias table; the client holds no
//! mutable state and applies no locking. Concurrent writers to one key race
//! and the store's last write wins.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::try_join_all;
use tracing::{debug, info, warn};

use crate::error::{AppError, Result};
use crate::models::record::Record;
use crate::models::{FieldMap, QueryDescriptor, StoreConfig};
use crate::services::dynamo_transport::DynamoTransport;
use crate::services::expression::build_expression;
use crate::services::mapper;
use crate::services::memory_transport::MemoryTransport;
use crate::services::transport::{BatchGetRequest, PutRequest, QueryRequest, StoreTransport};

pub struct StoreClient {
    config: StoreConfig,
    transport: Arc<dyn StoreTransport>,
}

impl StoreClient {
    /// Client over an explicit transport
    pub fn new(config: StoreConfig, transport: Arc<dyn StoreTransport>) -> Self {
        Self { config, transport }
    }

    /// Resolve the configured profile and connect to DynamoDB
    ///
    /// Fails when the profile cannot be resolved; no store call is attempted.
    pub async fn connect(config: StoreConfig) -> Result<Self> {
        let transport = DynamoTransport::connect(&config).await?;
        Ok(Self::new(config, Arc::new(transport)))
    }

    /// Client over an empty in-process table for `R` (dry runs)
    ///
    /// Writes are kept in memory and dropped with the client.
    pub fn in_memory<R: Record>(config: StoreConfig) -> Self {
        let transport = MemoryTransport::new().with_table(
            config.table_name(R::TABLE_NAME),
            R::key_fields(),
            R::indexes(),
        );

        info!(table = %config.table_name(R::TABLE_NAME), "Using in-memory store");
        Self::new(config, Arc::new(transport))
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Fetch the records for `keys`
    ///
    /// Keys are split into chunks of at most `max_batch_get`; chunks run
    /// concurrently in groups of `concurrent_batches`. Keys absent from the
    /// store are omitted. Result order is unspecified. Any failing chunk
    /// fails the whole call.
    pub async fn get<R: Record>(&self, keys: &[R]) -> Result<Vec<R>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let table = self.config.table_name(R::TABLE_NAME).to_string();

        // The store rejects a batch naming the same key twice
        let mut seen: HashSet<FieldMap> = HashSet::with_capacity(keys.len());
        let mut key_maps: Vec<FieldMap> = Vec::with_capacity(keys.len());
        for record in keys {
            let key = record.primary_key()?;
            if seen.insert(key.clone()) {
                key_maps.push(key);
            }
        }

        let batch_size = self.config.batch_size();
        let concurrent_batches = self.config.concurrent_batches.max(1);
        let chunks: Vec<&[FieldMap]> = key_maps.chunks(batch_size).collect();
        let total_chunks = chunks.len();

        info!(
            table = %table,
            keys = key_maps.len(),
            batch_size = batch_size,
            chunks = total_chunks,
            "Batch get"
        );

        let started = Instant::now();
        let mut items: Vec<FieldMap> = Vec::new();

        for (group_idx, group) in chunks.chunks(concurrent_batches).enumerate() {
            let requests = group.iter().map(|chunk| {
                self.transport.batch_get(BatchGetRequest {
                    table: table.clone(),
                    keys: chunk.to_vec(),
                })
            });

            let responses = try_join_all(requests).await.map_err(|e| {
                warn!(table = %table, group = group_idx + 1, error = %e, "Batch get chunk failed");
                e
            })?;

            for response in responses {
                if !response.unprocessed_keys.is_empty() {
                    return Err(AppError::StoreUnavailable(format!(
                        "BatchGetItem on '{}': {} keys left unprocessed (first: {:?})",
                        table,
                        response.unprocessed_keys.len(),
                        response.unprocessed_keys.first()
                    )));
                }
                items.extend(response.items);
            }
        }

        debug!(
            table = %table,
            found = items.len(),
            duration_ms = millis(started.elapsed()),
            "Batch get completed"
        );

        mapper::from_field_maps(&items)
    }

    /// Unconditional put (overwrites any item with the same key)
    pub async fn insert<R: Record>(&self, record: &R) -> Result<()> {
        let item = mapper::to_field_map(record)?;
        let table = self.config.table_name(R::TABLE_NAME).to_string();

        for field in R::key_fields() {
            if !item.contains_key(*field) {
                return Err(AppError::Conversion(format!(
                    "{}: cannot insert a record without key field '{}'",
                    R::TABLE_NAME,
                    field
                )));
            }
        }

        debug!(table = %table, key = ?record.primary_key().ok(), "Put item");

        self.transport.put_item(PutRequest { table, item }).await
    }

    /// Run one index query and return the matching records
    ///
    /// Returns a single page: when the store reports more results, they are
    /// not fetched.
    pub async fn query<R: Record>(&self, descriptor: &QueryDescriptor) -> Result<Vec<R>> {
        validate_descriptor::<R>(descriptor)?;

        let built = build_expression(descriptor);
        let key_condition = built.key_condition.ok_or_else(|| {
            AppError::InvalidQuery(format!("{}: no key condition to submit", descriptor.table))
        })?;

        let request = QueryRequest {
            table: self.config.table_name(&descriptor.table).to_string(),
            index_name: descriptor.index_name.clone(),
            key_condition,
            filter: built.filter,
            names: built.aliases.names,
            values: built.aliases.values,
            limit: descriptor.limit,
            scan_forward: descriptor.scan_direction.is_forward(),
        };

        debug!(
            table = %request.table,
            index = ?request.index_name,
            key_condition = %request.key_condition,
            filter = ?request.filter,
            limit = ?request.limit,
            scan_forward = request.scan_forward,
            "Query"
        );

        let table = request.table.clone();
        let response = self.transport.query(request).await?;

        if let Some(cursor) = &response.last_evaluated_key {
            warn!(
                table = %table,
                returned = response.items.len(),
                cursor = ?cursor,
                "Query has more results; only the first page is returned"
            );
        }

        mapper::from_field_maps(&response.items)
    }
}

/// Whole milliseconds, saturating at `u64::MAX`
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Check a descriptor against the record's declared keys and indexes
pub fn validate_descriptor<R: Record>(descriptor: &QueryDescriptor) -> Result<()> {
    if descriptor.table != R::TABLE_NAME {
        return Err(AppError::InvalidQuery(format!(
            "descriptor targets '{}' but records are read as '{}'",
            descriptor.table,
            R::TABLE_NAME
        )));
    }

    if descriptor.key_conditions.is_empty() {
        return Err(AppError::InvalidQuery(format!(
            "{}: a query needs at least one key condition",
            descriptor.table
        )));
    }

    let key_fields: &[&str] = match &descriptor.index_name {
        Some(name) => {
            R::index(name)
                .ok_or_else(|| {
                    AppError::InvalidQuery(format!("{}: unknown index '{}'", descriptor.table, name))
                })?
                .key_fields
        }
        None => R::key_fields(),
    };

    for condition in descriptor.key_conditions.iter().chain(&descriptor.filters) {
        if condition.field.is_empty() {
            return Err(AppError::InvalidQuery(format!(
                "{}: condition with an empty field name",
                descriptor.table
            )));
        }
    }

    for condition in &descriptor.key_conditions {
        if !key_fields.contains(&condition.field.as_str()) {
            return Err(AppError::InvalidQuery(format!(
                "{}: key condition on '{}' is not covered by {}",
                descriptor.table,
                condition.field,
                descriptor.index_name.as_deref().unwrap_or("the primary key")
            )));
        }
        if !condition.comparator.allowed_in_key_condition() {
            return Err(AppError::InvalidQuery(format!(
                "{}: '{}' cannot be used in a key condition",
                descriptor.table, condition.comparator
            )));
        }
    }

    let partition_key = key_fields.first().copied().unwrap_or_default();
    let has_partition_equality = descriptor
        .key_conditions
        .iter()
        .any(|c| c.field == partition_key && c.comparator == crate::models::Comparator::Eq);
    if !has_partition_equality {
        return Err(AppError::InvalidQuery(format!(
            "{}: key condition must test '{}' for equality",
            descriptor.table, partition_key
        )));
    }

    Ok(())
}
