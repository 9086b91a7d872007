use std::path::PathBuf;

use crate::constants::INSTRUMENT_TYPE_STOCK;
use crate::models::{Quote, StoreConfig};
use crate::services::{load_ticker_symbols, QuoteSource, QuoteSync, StoreClient};
use crate::utils::get_ticker_symbol_path;

pub fn run(input: Option<PathBuf>, limit: Option<usize>, dry_run: bool) {
    let path = input.unwrap_or_else(get_ticker_symbol_path);

    let mut stocks = match load_ticker_symbols(&path, INSTRUMENT_TYPE_STOCK) {
        Ok(stocks) => stocks,
        Err(e) => {
            eprintln!("❌ Failed to load ticker listing: {}", e);
            eprintln!("   Run `djia download-tickers` first");
            std::process::exit(1);
        }
    };
    if let Some(limit) = limit {
        stocks.truncate(limit);
    }

    println!("📊 Found {} common stocks in {}", stocks.len(), path.display());
    if dry_run {
        println!("🧪 DRY RUN: quotes are kept in memory, nothing is written to the store");
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("❌ Failed to create async runtime: {}", e);
            std::process::exit(1);
        }
    };

    match runtime.block_on(async {
        let config = StoreConfig::from_env()?;
        let store = if dry_run {
            StoreClient::in_memory::<Quote>(config)
        } else {
            StoreClient::connect(config).await?
        };
        let sync = QuoteSync::new(QuoteSource::from_env()?, store);
        sync.run(&stocks).await
    }) {
        Ok(stats) => {
            println!("\n✅ Quote sync completed in {}s", stats.elapsed().num_seconds());
            println!("   Stored: {}", stats.stored);
            if !stats.not_found.is_empty() {
                println!("   Not found ({}): {}", stats.not_found.len(), stats.not_found.join(", "));
            }
        }
        Err(e) => {
            eprintln!("\n❌ Quote sync failed: {}", e);
            std::process::exit(1);
        }
    }
}
