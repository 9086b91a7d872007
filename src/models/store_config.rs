use std::collections::HashMap;
use std::time::Duration;

use crate::constants::{
    DEFAULT_CONCURRENT_BATCHES, DEFAULT_PROFILE, DEFAULT_REGION, DEFAULT_STORE_TIMEOUT_SECS,
    MAX_BATCH_GET_ITEMS,
};
use crate::error::{AppError, Result};

/// Configuration of the store client
///
/// Passed explicitly to the client constructor. The named profile is read
/// from the shared AWS config/credentials files when the client connects.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Region of the backing store (e.g., "us-east-1")
    pub region: String,

    /// Named credential profile that must resolve before any store call
    pub profile: String,

    /// Endpoint override (e.g., a local store at http://localhost:8000)
    pub endpoint: Option<String>,

    /// Logical table name -> physical table name
    pub table_overrides: HashMap<String, String>,

    /// Keys per batch-get request (clamped to the store limit)
    pub max_batch_get: usize,

    /// Batch-get chunks dispatched concurrently
    pub concurrent_batches: usize,

    /// Transport timeout per request
    pub timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            profile: DEFAULT_PROFILE.to_string(),
            endpoint: None,
            table_overrides: HashMap::new(),
            max_batch_get: MAX_BATCH_GET_ITEMS,
            concurrent_batches: DEFAULT_CONCURRENT_BATCHES,
            timeout: Duration::from_secs(DEFAULT_STORE_TIMEOUT_SECS),
        }
    }
}

impl StoreConfig {
    /// Build configuration from `DJIA_*` environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let table_overrides = match std::env::var("DJIA_TABLE_OVERRIDES") {
            Ok(raw) => parse_table_overrides(&raw)?,
            Err(_) => HashMap::new(),
        };

        Ok(Self {
            region: std::env::var("DJIA_AWS_REGION").unwrap_or(defaults.region),
            profile: std::env::var("DJIA_AWS_PROFILE").unwrap_or(defaults.profile),
            endpoint: std::env::var("DJIA_STORE_ENDPOINT").ok(),
            table_overrides,
            max_batch_get: env_usize("DJIA_MAX_BATCH_GET")?.unwrap_or(defaults.max_batch_get),
            concurrent_batches: env_usize("DJIA_CONCURRENT_BATCHES")?
                .unwrap_or(defaults.concurrent_batches),
            timeout: env_usize("DJIA_STORE_TIMEOUT_SECS")?
                .map(|secs| Duration::from_secs(secs as u64))
                .unwrap_or(defaults.timeout),
        })
    }

    /// Endpoint override, trimmed; `None` lets the SDK resolve the regional endpoint
    pub fn endpoint_override(&self) -> Option<String> {
        self.endpoint
            .as_deref()
            .map(|e| e.trim().trim_end_matches('/').to_string())
            .filter(|e| !e.is_empty())
    }

    /// Physical table name for a logical one
    pub fn table_name<'a>(&'a self, logical: &'a str) -> &'a str {
        self.table_overrides
            .get(logical)
            .map(String::as_str)
            .unwrap_or(logical)
    }

    /// Batch size actually used (1..=store limit)
    pub fn batch_size(&self) -> usize {
        self.max_batch_get.clamp(1, MAX_BATCH_GET_ITEMS)
    }
}

fn env_usize(name: &str) -> Result<Option<usize>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<usize>()
            .map(Some)
            .map_err(|e| AppError::Config(format!("{} must be a positive integer: {}", name, e))),
        Err(_) => Ok(None),
    }
}

/// Parse `logical=physical,logical2=physical2`
pub fn parse_table_overrides(raw: &str) -> Result<HashMap<String, String>> {
    let mut overrides = HashMap::new();
    for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (logical, physical) = pair.split_once('=').ok_or_else(|| {
            AppError::Config(format!("Invalid table override '{}': expected logical=physical", pair))
        })?;
        let (logical, physical) = (logical.trim(), physical.trim());
        if logical.is_empty() || physical.is_empty() {
            return Err(AppError::Config(format!("Invalid table override '{}'", pair)));
        }
        overrides.insert(logical.to_string(), physical.to_string());
    }
    Ok(overrides)
}
