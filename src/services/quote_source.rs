use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

use crate::constants::QUOTE_TOKEN_ENV;
use crate::error::{AppError, Result};

/// Quote API base address
pub const IEX_BASE_URL: &str = "https://cloud.iexapis.com";

/// Source of raw quote documents, one symbol at a time
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Request address for `symbol`, safe to log
    fn request_url(&self, symbol: &str) -> String;

    /// Raw JSON body of the quote; `NotFound` when the symbol is unknown
    async fn fetch_raw(&self, symbol: &str) -> Result<String>;
}

/// Client for the per-symbol quote endpoint
pub struct QuoteSource {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

impl QuoteSource {
    pub fn new(base_url: &str, token: String) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(AppError::Config(format!(
                "Invalid quote base_url: must start with http:// or https://, got: '{}'",
                base_url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url,
            token,
            client,
        })
    }

    /// Build from the token in `IEX_Cloud_Secret_Key`
    pub fn from_env() -> Result<Self> {
        let token = std::env::var(QUOTE_TOKEN_ENV)
            .map_err(|_| AppError::Config(format!("{} is not set", QUOTE_TOKEN_ENV)))?;
        Self::new(IEX_BASE_URL, token)
    }

    fn path(&self, symbol: &str) -> String {
        format!("{}/beta/stock/{}/quote", self.base_url, symbol.to_lowercase())
    }
}

#[async_trait]
impl QuoteProvider for QuoteSource {
    fn request_url(&self, symbol: &str) -> String {
        format!("{}?token=***", self.path(symbol))
    }

    async fn fetch_raw(&self, symbol: &str) -> Result<String> {
        let url = self.path(symbol);
        debug!(symbol = symbol, url = %url, "Fetching quote");

        let response = self
            .client
            .get(&url)
            .query(&[("token", self.token.as_str())])
            .send()
            .await
            .map_err(|e| AppError::Network(format!("Quote request for {} failed: {}", symbol, e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("{} not found", symbol)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::Network(format!("Failed to read quote for {}: {}", symbol, e)))?;

        if !status.is_success() {
            return Err(AppError::Network(format!(
                "Quote API returned error status {} for {}: {}",
                status, symbol, body
            )));
        }

        Ok(body)
    }
}
