use std::path::Path;

use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::{AppError, Result};
use crate::models::TickerSymbol;

/// Exchange listing endpoint
pub const NYSE_FILTER_URL: &str = "https://www.nyse.com/api/quotes/filter";

/// Client for the exchange's ticker listing
pub struct TickerSource {
    url: String,
    client: reqwest::Client,
}

impl TickerSource {
    pub fn new() -> Result<Self> {
        Self::with_url(NYSE_FILTER_URL)
    }

    pub fn with_url(url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|e| AppError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            url: url.trim().to_string(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Download the whole equity listing in one page and return the raw body
    pub async fn download(&self) -> Result<String> {
        let request = json!({
            "instrumentType": "EQUITY",
            "pageNumber": 1,
            "sortColumn": "NORMALIZED_TICKER",
            "sortOrder": "ASC",
            "maxResultsPerPage": "10000",
            "filterToken": ""
        });

        debug!(url = %self.url, "Requesting ticker listing");

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Network(format!("Listing request failed: {} (url: {})", e, self.url)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());
            return Err(AppError::Network(format!(
                "Listing returned error status {}: {}",
                status, body
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::Network(format!("Failed to read listing body: {}", e)))?;

        Ok(body)
    }

    /// Download, validate, and persist the raw listing to `path`
    pub async fn download_to_file(&self, path: &Path) -> Result<usize> {
        let body = self.download().await?;
        let count = validate_listing(&body)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, body.as_bytes()).await?;

        info!(count = count, url = %self.url, path = %path.display(), "Saved ticker listing");
        Ok(count)
    }
}

/// Check that a listing body holds every row it announces
///
/// Each row carries the listing's `total`; a single page must contain all of
/// them.
pub fn validate_listing(body: &str) -> Result<usize> {
    let rows: Vec<Value> = serde_json::from_str(body)
        .map_err(|e| AppError::Parse(format!("Listing is not a JSON array: {}", e)))?;

    let Some(first) = rows.first() else {
        return Err(AppError::Parse("Listing is empty".to_string()));
    };

    let total = first["total"]
        .as_u64()
        .ok_or_else(|| AppError::Parse("Listing rows have no 'total' field".to_string()))?;

    if total as usize != rows.len() {
        return Err(AppError::Parse(format!(
            "Listing is incomplete: {} rows received, {} announced",
            rows.len(),
            total
        )));
    }

    Ok(rows.len())
}

/// Load the saved listing, keeping one instrument type (case-insensitive)
pub fn load_ticker_symbols(path: &Path, instrument_type: &str) -> Result<Vec<TickerSymbol>> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| AppError::Io(format!("Failed to read {}: {}", path.display(), e)))?;

    let symbols: Vec<TickerSymbol> = serde_json::from_str(&contents)?;

    Ok(symbols
        .into_iter()
        .filter(|s| s.is_type(instrument_type))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const LISTING: &str = r#"[
        {"symbolTicker":"AAPL","instrumentType":"COMMON_STOCK","instrumentName":"APPLE INC","exchangeId":"558","total":3},
        {"symbolTicker":"BRK.B","instrumentType":"common_stock","instrumentName":"BERKSHIRE HATHAWAY","exchangeId":"558","total":3},
        {"symbolTicker":"SPY","instrumentType":"EXCHANGE_TRADED_FUND","instrumentName":"SPDR S&P 500","exchangeId":"558","total":3}
    ]"#;

    #[test]
    fn test_validate_listing() {
        assert_eq!(validate_listing(LISTING).unwrap(), 3);
        assert!(validate_listing("[]").is_err());
        assert!(validate_listing("{}").is_err());

        let truncated = r#"[{"symbolTicker":"AAPL","instrumentType":"COMMON_STOCK","total":2}]"#;
        assert!(validate_listing(truncated).is_err());
    }

    #[test]
    fn test_load_filters_by_type() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("TickerSymbols.json");
        std::fs::write(&path, LISTING).unwrap();

        let stocks = load_ticker_symbols(&path, "COMMON_STOCK").unwrap();
        let symbols: Vec<&str> = stocks.iter().map(|s| s.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["AAPL", "BRK.B"]);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let result = load_ticker_symbols(&dir.path().join("absent.json"), "COMMON_STOCK");
        assert!(matches!(result, Err(AppError::Io(_))));
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_download_listing() {
        let source = TickerSource::new().unwrap();
        let body = source.download().await.unwrap();
        assert!(validate_listing(&body).unwrap() > 1000);
    }
}
