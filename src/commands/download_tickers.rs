use std::path::PathBuf;

use crate::services::TickerSource;
use crate::utils::get_ticker_symbol_path;

pub fn run(output: Option<PathBuf>) {
    let path = output.unwrap_or_else(get_ticker_symbol_path);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("❌ Failed to create async runtime: {}", e);
            std::process::exit(1);
        }
    };

    println!("📥 Downloading ticker listing...");

    match runtime.block_on(async {
        let source = TickerSource::new()?;
        source.download_to_file(&path).await
    }) {
        Ok(count) => {
            println!("✅ Saved {} tickers to {}", count, path.display());
        }
        Err(e) => {
            eprintln!("❌ Ticker download failed: {}", e);
            std::process::exit(1);
        }
    }
}
