//! Quote ingestion: one quote request per listed stock, each stored as it
//! arrives. Unknown symbols are skipped; any other failure aborts the run.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::constants::{INSTRUMENT_TYPE_STOCK, QUOTE_REQUEST_DELAY_MS};
use crate::error::{AppError, Result};
use crate::models::{Quote, TickerSymbol};
use crate::services::quote_source::QuoteProvider;
use crate::services::store_client::StoreClient;

/// Outcome of a completed run
#[derive(Debug, Clone)]
pub struct QuoteSyncStats {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub stored: usize,
    pub not_found: Vec<String>,
}

impl QuoteSyncStats {
    fn start() -> Self {
        let now = Utc::now();
        Self {
            started_at: now,
            finished_at: now,
            stored: 0,
            not_found: Vec::new(),
        }
    }

    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

pub struct QuoteSync<P: QuoteProvider> {
    provider: P,
    store: StoreClient,
    delay: Duration,
}

impl<P: QuoteProvider> QuoteSync<P> {
    pub fn new(provider: P, store: StoreClient) -> Self {
        Self {
            provider,
            store,
            delay: Duration::from_millis(QUOTE_REQUEST_DELAY_MS),
        }
    }

    /// Pause between consecutive quote requests
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn store(&self) -> &StoreClient {
        &self.store
    }

    pub async fn run(&self, stocks: &[TickerSymbol]) -> Result<QuoteSyncStats> {
        let mut stats = QuoteSyncStats::start();
        info!(count = stocks.len(), "Starting quote sync");

        for (i, stock) in stocks.iter().enumerate() {
            let url = self.provider.request_url(&stock.symbol);

            let body = match self.provider.fetch_raw(&stock.symbol).await {
                Ok(body) => body,
                Err(e) if e.is_not_found() => {
                    warn!(symbol = %stock.symbol, "Quote not found, skipping");
                    stats.not_found.push(stock.symbol.clone());
                    continue;
                }
                Err(e) => return Err(report(e, &url, stock, None)),
            };

            let mut quote: Quote = match serde_json::from_str(&body) {
                Ok(quote) => quote,
                Err(e) => return Err(report(e.into(), &url, stock, Some(&body))),
            };
            quote.instrument_type = Some(INSTRUMENT_TYPE_STOCK.to_string());

            if let Err(e) = self.store.insert(&quote).await {
                return Err(report(e, &url, stock, Some(&body)));
            }
            stats.stored += 1;

            if (i + 1) % 100 == 0 {
                info!(done = i + 1, total = stocks.len(), "Quote sync progress");
            }

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }

        stats.finished_at = Utc::now();
        info!(
            stored = stats.stored,
            not_found = stats.not_found.len(),
            elapsed_secs = stats.elapsed().num_seconds(),
            "Quote sync finished"
        );
        Ok(stats)
    }
}

fn report(err: AppError, url: &str, stock: &TickerSymbol, body: Option<&str>) -> AppError {
    let record = serde_json::to_string(stock).unwrap_or_else(|_| format!("{:?}", stock));
    error!(
        url = url,
        stock = %record,
        body = body.unwrap_or(""),
        error = %err,
        "Quote sync aborted"
    );
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    use async_trait::async_trait;

    use crate::models::StoreConfig;
    use crate::services::memory_transport::MemoryTransport;

    struct FakeQuotes {
        bodies: HashMap<String, String>,
    }

    #[async_trait]
    impl QuoteProvider for FakeQuotes {
        fn request_url(&self, symbol: &str) -> String {
            format!("fake://{}", symbol)
        }

        async fn fetch_raw(&self, symbol: &str) -> Result<String> {
            self.bodies
                .get(symbol)
                .cloned()
                .ok_or_else(|| AppError::NotFound(format!("{} not found", symbol)))
        }
    }

    fn stock(symbol: &str) -> TickerSymbol {
        TickerSymbol {
            symbol: symbol.to_string(),
            instrument_type: INSTRUMENT_TYPE_STOCK.to_string(),
            company_name: None,
            exchange_id: None,
        }
    }

    fn quote_sync(bodies: &[(&str, &str)]) -> (QuoteSync<FakeQuotes>, Arc<MemoryTransport>) {
        let transport = Arc::new(MemoryTransport::new().with_record_table::<Quote>());
        let store = StoreClient::new(StoreConfig::default(), transport.clone());
        let provider = FakeQuotes {
            bodies: bodies
                .iter()
                .map(|(s, b)| (s.to_string(), b.to_string()))
                .collect(),
        };
        (QuoteSync::new(provider, store).with_delay(Duration::ZERO), transport)
    }

    #[tokio::test]
    async fn test_run_stores_quotes_and_skips_unknown() {
        let (sync, transport) = quote_sync(&[
            ("AAPL", r#"{"symbol":"AAPL","latestPrice":150.25,"marketCap":2500000000000,"companyName":"Apple Inc."}"#),
            ("KO", r#"{"symbol":"KO","latestPrice":60.1,"marketCap":260000000000}"#),
        ]);

        let stats = sync
            .run(&[stock("AAPL"), stock("ZZZZ"), stock("KO")])
            .await
            .unwrap();

        assert_eq!(stats.stored, 2);
        assert_eq!(stats.not_found, vec!["ZZZZ".to_string()]);
        assert_eq!(transport.put_calls(), 2);

        let stored = sync.store().get(&[Quote::key("AAPL")]).await.unwrap();
        assert_eq!(stored[0].instrument_type.as_deref(), Some(INSTRUMENT_TYPE_STOCK));
        assert_eq!(stored[0].latest_price, Some(150.25));
    }

    #[tokio::test]
    async fn test_run_aborts_on_bad_body() {
        let (sync, transport) = quote_sync(&[
            ("AAPL", "<html>rate limited</html>"),
            ("KO", r#"{"symbol":"KO","latestPrice":60.1}"#),
        ]);

        let err = sync.run(&[stock("AAPL"), stock("KO")]).await.unwrap_err();
        assert!(matches!(err, AppError::Parse(_)));
        assert_eq!(transport.put_calls(), 0);
    }
}
