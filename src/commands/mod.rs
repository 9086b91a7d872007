pub mod djia;
pub mod download_tickers;
pub mod get;
pub mod sync_quotes;
