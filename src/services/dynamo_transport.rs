//! DynamoDB transport on the AWS SDK
//!
//! Credentials come from the configured named profile only; a profile that
//! does not resolve fails `connect` before any store call is made.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_config::profile::ProfileFileCredentialsProvider;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::provider::ProvideCredentials;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::primitives::Blob;
use aws_sdk_dynamodb::types::{AttributeValue as WireValue, KeysAndAttributes};
use aws_sdk_dynamodb::Client;
use tracing::{debug, info};

use crate::error::{AppError, Result};
use crate::models::{AttributeValue, FieldMap, StoreConfig};
use crate::services::transport::{
    BatchGetRequest, BatchGetResponse, PutRequest, QueryRequest, QueryResponse, StoreTransport,
};

type WireItem = HashMap<String, WireValue>;

pub struct DynamoTransport {
    client: Client,
}

impl DynamoTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Resolve the named profile and build an SDK client for `config`
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let credentials = ProfileFileCredentialsProvider::builder()
            .profile_name(&config.profile)
            .build();

        credentials.provide_credentials().await.map_err(|e| {
            AppError::Config(format!(
                "credentials not found for \"{}\" profile: {}",
                config.profile,
                DisplayErrorContext(&e)
            ))
        })?;

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .profile_name(&config.profile)
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(config.timeout)
                    .build(),
            );

        if let Some(endpoint) = config.endpoint_override() {
            loader = loader.endpoint_url(endpoint);
        }

        let sdk_config = loader.load().await;

        info!(
            region = %config.region,
            profile = %config.profile,
            endpoint = ?config.endpoint_override(),
            "Created DynamoDB client"
        );

        Ok(Self::new(Client::new(&sdk_config)))
    }
}

#[async_trait]
impl StoreTransport for DynamoTransport {
    async fn batch_get(&self, request: BatchGetRequest) -> Result<BatchGetResponse> {
        let keys = request.keys.iter().map(item_to_wire).collect::<Vec<_>>();
        let keys_and_attributes = KeysAndAttributes::builder()
            .set_keys(Some(keys))
            .build()
            .map_err(|e| AppError::StoreUnavailable(format!("BatchGetItem on '{}': {}", request.table, e)))?;

        let output = self
            .client
            .batch_get_item()
            .request_items(&request.table, keys_and_attributes)
            .send()
            .await
            .map_err(|e| unavailable("BatchGetItem", &request.table, e))?;

        let items = output
            .responses()
            .and_then(|responses| responses.get(&request.table))
            .map(|items| items.iter().map(item_from_wire).collect::<Result<Vec<_>>>())
            .transpose()?
            .unwrap_or_default();

        let unprocessed_keys = output
            .unprocessed_keys()
            .and_then(|unprocessed| unprocessed.get(&request.table))
            .map(|k| k.keys().iter().map(item_from_wire).collect::<Result<Vec<_>>>())
            .transpose()?
            .unwrap_or_default();

        debug!(table = %request.table, found = items.len(), "BatchGetItem");
        Ok(BatchGetResponse {
            items,
            unprocessed_keys,
        })
    }

    async fn put_item(&self, request: PutRequest) -> Result<()> {
        self.client
            .put_item()
            .table_name(&request.table)
            .set_item(Some(item_to_wire(&request.item)))
            .send()
            .await
            .map_err(|e| unavailable("PutItem", &request.table, e))?;
        Ok(())
    }

    async fn query(&self, request: QueryRequest) -> Result<QueryResponse> {
        let names: HashMap<String, String> = request.names.iter().cloned().collect();
        let values: WireItem = request
            .values
            .iter()
            .map(|(token, value)| (token.clone(), value_to_wire(value)))
            .collect();

        let output = self
            .client
            .query()
            .table_name(&request.table)
            .set_index_name(request.index_name.clone())
            .key_condition_expression(&request.key_condition)
            .set_filter_expression(request.filter.clone())
            .set_expression_attribute_names((!names.is_empty()).then_some(names))
            .set_expression_attribute_values((!values.is_empty()).then_some(values))
            .set_limit(request.limit.map(|l| i32::try_from(l).unwrap_or(i32::MAX)))
            .scan_index_forward(request.scan_forward)
            .send()
            .await
            .map_err(|e| unavailable("Query", &request.table, e))?;

        let items = output
            .items()
            .iter()
            .map(item_from_wire)
            .collect::<Result<Vec<_>>>()?;
        let last_evaluated_key = output.last_evaluated_key().map(item_from_wire).transpose()?;

        Ok(QueryResponse {
            items,
            last_evaluated_key,
        })
    }
}

fn unavailable<E: std::error::Error>(action: &str, table: &str, err: E) -> AppError {
    AppError::StoreUnavailable(format!("{} on '{}': {}", action, table, DisplayErrorContext(err)))
}

pub fn value_to_wire(value: &AttributeValue) -> WireValue {
    match value {
        AttributeValue::S(s) => WireValue::S(s.clone()),
        AttributeValue::N(n) => WireValue::N(n.clone()),
        AttributeValue::Bool(b) => WireValue::Bool(*b),
        AttributeValue::B(bytes) => WireValue::B(Blob::new(bytes.clone())),
        AttributeValue::Null => WireValue::Null(true),
    }
}

/// Scalar attribute from the SDK type; collections are not supported
pub fn value_from_wire(value: &WireValue) -> Result<AttributeValue> {
    match value {
        WireValue::S(s) => Ok(AttributeValue::S(s.clone())),
        WireValue::N(n) => Ok(AttributeValue::N(n.clone())),
        WireValue::Bool(b) => Ok(AttributeValue::Bool(*b)),
        WireValue::B(blob) => Ok(AttributeValue::B(blob.as_ref().to_vec())),
        WireValue::Null(_) => Ok(AttributeValue::Null),
        other => Err(AppError::Conversion(format!(
            "unsupported attribute value: {:?}",
            other
        ))),
    }
}

pub fn item_to_wire(item: &FieldMap) -> WireItem {
    item.iter()
        .map(|(name, value)| (name.clone(), value_to_wire(value)))
        .collect()
}

pub fn item_from_wire(item: &WireItem) -> Result<FieldMap> {
    item.iter()
        .map(|(name, value)| Ok((name.clone(), value_from_wire(value)?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_values_map_to_sdk_types() {
        assert_eq!(value_to_wire(&AttributeValue::string("AAPL")), WireValue::S("AAPL".to_string()));
        assert_eq!(value_to_wire(&AttributeValue::number(150.25)), WireValue::N("150.25".to_string()));
        assert_eq!(value_to_wire(&AttributeValue::Null), WireValue::Null(true));
        assert_eq!(
            value_to_wire(&AttributeValue::B(vec![0xde, 0xad])),
            WireValue::B(Blob::new(vec![0xde, 0xad]))
        );

        assert_eq!(
            value_from_wire(&WireValue::Bool(true)).unwrap(),
            AttributeValue::Bool(true)
        );
        assert_eq!(
            value_from_wire(&WireValue::B(Blob::new(vec![1, 2]))).unwrap(),
            AttributeValue::B(vec![1, 2])
        );
    }

    #[test]
    fn test_collections_are_rejected() {
        let list = WireValue::L(vec![WireValue::S("x".to_string())]);
        assert!(matches!(value_from_wire(&list), Err(AppError::Conversion(_))));

        let mut item = WireItem::new();
        item.insert("symbol".to_string(), WireValue::S("AAPL".to_string()));
        item.insert("tags".to_string(), WireValue::Ss(vec!["a".to_string()]));
        assert!(item_from_wire(&item).is_err());
    }

    #[test]
    fn test_item_from_wire() {
        let mut item = WireItem::new();
        item.insert("symbol".to_string(), WireValue::S("AAPL".to_string()));
        item.insert("marketCap".to_string(), WireValue::N("2500000000000".to_string()));

        let map = item_from_wire(&item).unwrap();
        assert_eq!(map["symbol"], AttributeValue::string("AAPL"));
        assert_eq!(map["marketCap"].as_f64(), Some(2.5e12));
    }

    /// Accept one connection, capture the raw request and answer `{}`
    async fn capture_one_request(listener: tokio::net::TcpListener) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let (mut socket, _) = listener.accept().await.unwrap();
        let mut raw = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            raw.extend_from_slice(&buf[..n]);

            let text = String::from_utf8_lossy(&raw).to_string();
            if let Some(head_end) = text.find("\r\n\r\n") {
                let content_length = text[..head_end]
                    .lines()
                    .find_map(|l| {
                        let (name, value) = l.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if raw.len() >= head_end + 4 + content_length {
                    break;
                }
            }
        }

        socket
            .write_all(
                b"HTTP/1.1 200 OK\r\ncontent-type: application/x-amz-json-1.0\r\ncontent-length: 2\r\n\r\n{}",
            )
            .await
            .unwrap();
        String::from_utf8_lossy(&raw).to_string()
    }

    #[tokio::test]
    async fn test_requests_are_signed() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());
        let server = tokio::spawn(capture_one_request(listener));

        let sdk_config = aws_sdk_dynamodb::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .endpoint_url(endpoint)
            .credentials_provider(aws_credential_types::Credentials::new(
                "AKIDTESTSIGNING",
                "secret",
                None,
                None,
                "test",
            ))
            .build();
        let transport = DynamoTransport::new(Client::from_conf(sdk_config));

        let mut item = FieldMap::new();
        item.insert("symbol".to_string(), AttributeValue::string("AAPL"));
        transport
            .put_item(PutRequest {
                table: "stock-quotes".to_string(),
                item,
            })
            .await
            .unwrap();

        let request = server.await.unwrap().to_lowercase();
        assert!(request.contains("x-amz-target: dynamodb_20120810.putitem"));
        assert!(request.contains("authorization: aws4-hmac-sha256 credential=akidtestsigning/"));
        assert!(request.contains("x-amz-date:"));
    }

    #[tokio::test]
    async fn test_connect_fails_for_unknown_profile() {
        let config = StoreConfig {
            profile: "djia-profile-that-does-not-exist".to_string(),
            endpoint: Some("http://127.0.0.1:1".to_string()),
            ..StoreConfig::default()
        };
        let result = DynamoTransport::connect(&config).await;
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[tokio::test]
    #[ignore] // Requires a local DynamoDB on port 8000 and the configured profile
    async fn test_put_against_local_store() {
        let config = StoreConfig {
            endpoint: Some("http://localhost:8000".to_string()),
            ..StoreConfig::default()
        };
        let transport = DynamoTransport::connect(&config).await.unwrap();
        let mut item = FieldMap::new();
        item.insert("symbol".to_string(), AttributeValue::string("AAPL"));
        transport
            .put_item(PutRequest {
                table: "stock-quotes".to_string(),
                item,
            })
            .await
            .unwrap();
    }
}
