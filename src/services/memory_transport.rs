//! In-process store implementing the wire operations
//!
//! Tables hold plain field maps keyed by their declared primary key. Queries
//! parse and evaluate the same expression strings and alias tables the HTTP
//! transport would send, with the store's semantics: the limit caps the
//! number of items evaluated, and the filter applies afterwards.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use async_trait::async_trait;
use tokio::sync::{Mutex as TokioMutex, RwLock};
use tracing::debug;

use crate::constants::MAX_BATCH_GET_ITEMS;
use crate::error::{AppError, Result};
use crate::models::record::{IndexDescriptor, Record};
use crate::models::{AttributeValue, Comparator, FieldMap};
use crate::services::transport::{
    BatchGetRequest, BatchGetResponse, PutRequest, QueryRequest, QueryResponse, StoreTransport,
};

#[derive(Debug, Default)]
struct MemoryTable {
    key_fields: Vec<String>,
    /// Index name -> key fields (partition, then optional sort)
    indexes: HashMap<String, Vec<String>>,
    items: Vec<FieldMap>,
}

impl MemoryTable {
    fn key_of(&self, item: &FieldMap) -> Option<Vec<AttributeValue>> {
        self.key_fields.iter().map(|f| item.get(f).cloned()).collect()
    }

    fn matches_key(&self, item: &FieldMap, key: &FieldMap) -> bool {
        self.key_fields.iter().all(|f| item.get(f).is_some() && item.get(f) == key.get(f))
    }
}

/// Store held entirely in memory
#[derive(Debug, Default)]
pub struct MemoryTransport {
    tables: RwLock<HashMap<String, MemoryTable>>,
    batch_get_calls: AtomicUsize,
    put_calls: AtomicUsize,
    query_calls: AtomicUsize,
    /// 1-based batch-get call number that fails, for fault tests
    failing_batch_call: Option<usize>,
    queries: TokioMutex<Vec<QueryRequest>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a table with its primary key and secondary indexes
    pub fn with_table(mut self, name: &str, key_fields: &[&str], indexes: &[IndexDescriptor]) -> Self {
        let table = MemoryTable {
            key_fields: key_fields.iter().map(|f| f.to_string()).collect(),
            indexes: indexes
                .iter()
                .map(|i| {
                    (
                        i.name.to_string(),
                        i.key_fields.iter().map(|f| f.to_string()).collect(),
                    )
                })
                .collect(),
            items: Vec::new(),
        };
        self.tables.get_mut().insert(name.to_string(), table);
        self
    }

    /// Declare the table backing `R` under its logical name
    pub fn with_record_table<R: Record>(self) -> Self {
        self.with_table(R::TABLE_NAME, R::key_fields(), R::indexes())
    }

    /// Make the n-th batch-get call (1-based) fail
    pub fn with_failing_batch_call(mut self, call: usize) -> Self {
        self.failing_batch_call = Some(call);
        self
    }

    pub fn batch_get_calls(&self) -> usize {
        self.batch_get_calls.load(AtomicOrdering::SeqCst)
    }

    pub fn put_calls(&self) -> usize {
        self.put_calls.load(AtomicOrdering::SeqCst)
    }

    pub fn query_calls(&self) -> usize {
        self.query_calls.load(AtomicOrdering::SeqCst)
    }

    /// Query requests received so far
    pub async fn recorded_queries(&self) -> Vec<QueryRequest> {
        self.queries.lock().await.clone()
    }

    /// Number of items stored in a table
    pub async fn item_count(&self, table: &str) -> usize {
        self.tables
            .read()
            .await
            .get(table)
            .map(|t| t.items.len())
            .unwrap_or(0)
    }
}

fn missing_table(action: &str, table: &str) -> AppError {
    AppError::StoreUnavailable(format!(
        "{} on '{}': ResourceNotFoundException: table does not exist",
        action, table
    ))
}

#[async_trait]
impl StoreTransport for MemoryTransport {
    async fn batch_get(&self, request: BatchGetRequest) -> Result<BatchGetResponse> {
        let call = self.batch_get_calls.fetch_add(1, AtomicOrdering::SeqCst) + 1;
        if self.failing_batch_call == Some(call) {
            return Err(AppError::StoreUnavailable(format!(
                "BatchGetItem on '{}': injected failure on call {}",
                request.table, call
            )));
        }
        if request.keys.len() > MAX_BATCH_GET_ITEMS {
            return Err(AppError::StoreUnavailable(format!(
                "BatchGetItem on '{}': ValidationException: {} keys exceeds {}",
                request.table,
                request.keys.len(),
                MAX_BATCH_GET_ITEMS
            )));
        }

        let tables = self.tables.read().await;
        let table = tables
            .get(&request.table)
            .ok_or_else(|| missing_table("BatchGetItem", &request.table))?;

        let items: Vec<FieldMap> = request
            .keys
            .iter()
            .filter_map(|key| table.items.iter().find(|item| table.matches_key(item, key)))
            .cloned()
            .collect();

        debug!(table = %request.table, keys = request.keys.len(), found = items.len(), "Memory batch get");

        Ok(BatchGetResponse {
            items,
            unprocessed_keys: Vec::new(),
        })
    }

    async fn put_item(&self, request: PutRequest) -> Result<()> {
        self.put_calls.fetch_add(1, AtomicOrdering::SeqCst);

        let mut tables = self.tables.write().await;
        let table = tables
            .get_mut(&request.table)
            .ok_or_else(|| missing_table("PutItem", &request.table))?;

        let key = table.key_of(&request.item).ok_or_else(|| {
            AppError::StoreUnavailable(format!(
                "PutItem on '{}': ValidationException: item is missing key attributes {:?}",
                request.table, table.key_fields
            ))
        })?;

        match table
            .items
            .iter()
            .position(|existing| table.key_of(existing).as_ref() == Some(&key))
        {
            Some(pos) => table.items[pos] = request.item,
            None => table.items.push(request.item),
        }
        Ok(())
    }

    async fn query(&self, request: QueryRequest) -> Result<QueryResponse> {
        self.query_calls.fetch_add(1, AtomicOrdering::SeqCst);
        self.queries.lock().await.push(request.clone());

        let tables = self.tables.read().await;
        let table = tables
            .get(&request.table)
            .ok_or_else(|| missing_table("Query", &request.table))?;

        let index_keys = match &request.index_name {
            Some(index) => table.indexes.get(index).ok_or_else(|| {
                AppError::StoreUnavailable(format!(
                    "Query on '{}': ValidationException: no index '{}'",
                    request.table, index
                ))
            })?,
            None => &table.key_fields,
        };

        let key_condition = Predicate::parse(&request.key_condition, &request)?;
        let filter = match &request.filter {
            Some(filter) => Some(Predicate::parse(filter, &request)?),
            None => None,
        };

        let mut candidates: Vec<&FieldMap> = table
            .items
            .iter()
            .filter(|item| index_keys.iter().all(|f| item.contains_key(f)))
            .filter(|item| key_condition.matches(item))
            .collect();

        if let Some(sort_key) = index_keys.get(1) {
            candidates.sort_by(|a, b| match (a.get(sort_key), b.get(sort_key)) {
                (Some(x), Some(y)) => x.compare(y).unwrap_or(Ordering::Equal),
                _ => Ordering::Equal,
            });
        }
        if !request.scan_forward {
            candidates.reverse();
        }

        let limit = request.limit.map(|l| l as usize).unwrap_or(usize::MAX);
        let truncated = candidates.len() > limit;
        candidates.truncate(limit);

        let last_evaluated_key = if truncated {
            candidates.last().map(|item| {
                table
                    .key_fields
                    .iter()
                    .chain(index_keys.iter())
                    .filter_map(|f| item.get(f).map(|v| (f.clone(), v.clone())))
                    .collect::<FieldMap>()
            })
        } else {
            None
        };

        let items: Vec<FieldMap> = candidates
            .into_iter()
            .filter(|item| filter.as_ref().map(|f| f.matches(item)).unwrap_or(true))
            .cloned()
            .collect();

        Ok(QueryResponse {
            items,
            last_evaluated_key,
        })
    }
}

/// One `<attribute> <op> <literal>` clause with aliases resolved
#[derive(Debug, Clone)]
struct Clause {
    attribute: String,
    comparator: Comparator,
    value: AttributeValue,
}

impl Clause {
    fn matches(&self, item: &FieldMap) -> bool {
        let Some(actual) = item.get(&self.attribute) else {
            return self.comparator == Comparator::Ne;
        };
        match actual.compare(&self.value) {
            Some(ordering) => match self.comparator {
                Comparator::Eq => ordering == Ordering::Equal,
                Comparator::Ne => ordering != Ordering::Equal,
                Comparator::Lt => ordering == Ordering::Less,
                Comparator::Le => ordering != Ordering::Greater,
                Comparator::Gt => ordering == Ordering::Greater,
                Comparator::Ge => ordering != Ordering::Less,
            },
            None => self.comparator == Comparator::Ne,
        }
    }
}

/// Conjunction of clauses
#[derive(Debug, Clone)]
struct Predicate {
    clauses: Vec<Clause>,
}

impl Predicate {
    fn parse(expression: &str, request: &QueryRequest) -> Result<Self> {
        let invalid = |reason: &str| {
            AppError::StoreUnavailable(format!(
                "Query on '{}': ValidationException: invalid expression '{}': {}",
                request.table, expression, reason
            ))
        };

        let tokens: Vec<&str> = expression.split_whitespace().collect();
        if tokens.is_empty() {
            return Err(invalid("empty expression"));
        }

        let mut clauses = Vec::new();
        for (i, group) in tokens.split(|t| t.eq_ignore_ascii_case("AND")).enumerate() {
            let [name, op, value] = group else {
                return Err(invalid(&format!("clause {} is not '<name> <op> <value>'", i + 1)));
            };

            let attribute = if name.starts_with('#') {
                request
                    .names
                    .iter()
                    .find(|(token, _)| token.as_str() == *name)
                    .map(|(_, field)| field.clone())
                    .ok_or_else(|| invalid(&format!("unbound name alias {}", name)))?
            } else {
                name.to_string()
            };
            let comparator = Comparator::from_symbol(op)
                .ok_or_else(|| invalid(&format!("unknown operator {}", op)))?;
            let value = request
                .values
                .iter()
                .find(|(token, _)| token.as_str() == *value)
                .map(|(_, v)| v.clone())
                .ok_or_else(|| invalid(&format!("unbound value alias {}", value)))?;

            clauses.push(Clause {
                attribute,
                comparator,
                value,
            });
        }

        Ok(Self { clauses })
    }

    fn matches(&self, item: &FieldMap) -> bool {
        self.clauses.iter().all(|c| c.matches(item))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Quote;

    fn quote_item(symbol: &str, market_cap: f64, price: f64) -> FieldMap {
        let mut item = FieldMap::new();
        item.insert("symbol".to_string(), AttributeValue::string(symbol));
        item.insert("instrumentType".to_string(), AttributeValue::string("COMMON_STOCK"));
        item.insert("marketCap".to_string(), AttributeValue::number(market_cap));
        item.insert("latestPrice".to_string(), AttributeValue::number(price));
        item
    }

    async fn seeded() -> MemoryTransport {
        let store = MemoryTransport::new().with_record_table::<Quote>();
        for (symbol, cap, price) in [("AAPL", 3.0e12, 190.0), ("MSFT", 2.8e12, 410.0), ("NVR", 2.0e10, 7500.0)] {
            store
                .put_item(PutRequest {
                    table: "stock-quotes".to_string(),
                    item: quote_item(symbol, cap, price),
                })
                .await
                .unwrap();
        }
        store
    }

    fn index_query(limit: Option<u32>, filter: Option<&str>) -> QueryRequest {
        QueryRequest {
            table: "stock-quotes".to_string(),
            index_name: Some("instrumentType-marketCap-index".to_string()),
            key_condition: "#sourceinstrumentType = :instrumentType".to_string(),
            filter: filter.map(str::to_string),
            names: vec![
                ("#sourceinstrumentType".to_string(), "instrumentType".to_string()),
                ("#sourcelatestPrice".to_string(), "latestPrice".to_string()),
            ],
            values: vec![
                (":instrumentType".to_string(), AttributeValue::string("COMMON_STOCK")),
                (":latestPrice".to_string(), AttributeValue::number(1000.0)),
            ],
            limit,
            scan_forward: false,
        }
    }

    #[tokio::test]
    async fn test_put_overwrites_same_key() {
        let store = seeded().await;
        store
            .put_item(PutRequest {
                table: "stock-quotes".to_string(),
                item: quote_item("AAPL", 1.0, 1.0),
            })
            .await
            .unwrap();
        assert_eq!(store.item_count("stock-quotes").await, 3);
        assert_eq!(store.put_calls(), 4);
    }

    #[tokio::test]
    async fn test_query_orders_by_sort_key() {
        let store = seeded().await;
        let response = store.query(index_query(None, None)).await.unwrap();
        let symbols: Vec<&str> = response.items.iter().map(|i| i["symbol"].as_str().unwrap()).collect();
        assert_eq!(symbols, vec!["AAPL", "MSFT", "NVR"]);
        assert!(response.last_evaluated_key.is_none());
    }

    #[tokio::test]
    async fn test_limit_applies_before_filter() {
        let store = seeded().await;
        let response = store
            .query(index_query(Some(2), Some("#sourcelatestPrice < :latestPrice")))
            .await
            .unwrap();
        assert_eq!(response.items.len(), 2);
        let cursor = response.last_evaluated_key.unwrap();
        assert_eq!(cursor["symbol"], AttributeValue::string("MSFT"));
    }

    #[tokio::test]
    async fn test_unbound_alias_is_rejected() {
        let store = seeded().await;
        let mut request = index_query(None, None);
        request.key_condition = "#sourceinstrumentType = :missing".to_string();
        assert!(matches!(store.query(request).await, Err(AppError::StoreUnavailable(_))));
    }

    #[tokio::test]
    async fn test_missing_table() {
        let store = MemoryTransport::new();
        let result = store
            .batch_get(BatchGetRequest {
                table: "nope".to_string(),
                keys: Vec::new(),
            })
            .await;
        assert!(matches!(result, Err(AppError::StoreUnavailable(_))));
    }

    #[test]
    fn test_clause_semantics_for_missing_attribute() {
        let clause = Clause {
            attribute: "symbol".to_string(),
            comparator: Comparator::Ne,
            value: AttributeValue::string("FB"),
        };
        assert!(clause.matches(&FieldMap::new()));

        let clause = Clause {
            comparator: Comparator::Eq,
            ..clause
        };
        assert!(!clause.matches(&FieldMap::new()));
    }
}
