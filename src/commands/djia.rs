use crate::models::StoreConfig;
use crate::services::{format_component, index_components, IndexListingParams, StoreClient};

pub fn run(max_price: f64, exclude: Vec<String>, count: usize) {
    let mut params = IndexListingParams {
        max_price,
        count,
        ..Default::default()
    };
    for symbol in exclude {
        let symbol = symbol.trim().to_uppercase();
        if !symbol.is_empty() && !params.excluded.contains(&symbol) {
            params.excluded.push(symbol);
        }
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("❌ Failed to create async runtime: {}", e);
            std::process::exit(1);
        }
    };

    match runtime.block_on(async {
        let store = StoreClient::connect(StoreConfig::from_env()?).await?;
        index_components(&store, &params).await
    }) {
        Ok(quotes) => {
            for quote in &quotes {
                println!("{}", format_component(quote));
            }
            if quotes.len() < params.count {
                eprintln!("⚠️  Only {} of {} components found", quotes.len(), params.count);
            }
        }
        Err(e) => {
            eprintln!("❌ Index listing failed: {}", e);
            std::process::exit(1);
        }
    }
}
