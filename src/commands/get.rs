use crate::models::{Quote, StoreConfig};
use crate::services::{format_component, StoreClient};

pub fn run(symbols: Vec<String>) {
    let keys: Vec<Quote> = symbols
        .iter()
        .map(|s| Quote::key(s.trim().to_uppercase()))
        .collect();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("❌ Failed to create async runtime: {}", e);
            std::process::exit(1);
        }
    };

    match runtime.block_on(async {
        let store = StoreClient::connect(StoreConfig::from_env()?).await?;
        store.get(&keys).await
    }) {
        Ok(quotes) => {
            for quote in &quotes {
                println!("{}", format_component(quote));
            }

            let missing: Vec<&str> = keys
                .iter()
                .map(|k| k.symbol.as_str())
                .filter(|s| !quotes.iter().any(|q| q.symbol == *s))
                .collect();
            if !missing.is_empty() {
                println!("⚠️  Not stored: {}", missing.join(", "));
            }
        }
        Err(e) => {
            eprintln!("❌ Lookup failed: {}", e);
            std::process::exit(1);
        }
    }
}
