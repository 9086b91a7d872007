//! Price-weighted index listing
//!
//! The largest common stocks by market cap, below a price ceiling and minus
//! an exclusion list, read from the market-cap index in descending order.

use tracing::info;

use crate::constants::{
    DEFAULT_EXCLUDED_SYMBOLS, DEFAULT_MAX_PRICE, INDEX_COMPONENT_COUNT, INDEX_QUERY_LIMIT,
    INDEX_SORT_BY_MARKET_CAP, INSTRUMENT_TYPE_STOCK,
};
use crate::error::Result;
use crate::models::{AttributeValue, Condition, Quote, QueryDescriptor, ScanDirection};
use crate::services::store_client::StoreClient;
use crate::utils::right_pad;

#[derive(Debug, Clone)]
pub struct IndexListingParams {
    pub max_price: f64,
    pub excluded: Vec<String>,
    pub count: usize,
    pub query_limit: u32,
}

impl Default for IndexListingParams {
    fn default() -> Self {
        Self {
            max_price: DEFAULT_MAX_PRICE,
            excluded: DEFAULT_EXCLUDED_SYMBOLS.iter().map(|s| s.to_string()).collect(),
            count: INDEX_COMPONENT_COUNT,
            query_limit: INDEX_QUERY_LIMIT,
        }
    }
}

/// Query over the market-cap index for `params`
pub fn index_query(params: &IndexListingParams) -> QueryDescriptor {
    let mut descriptor = QueryDescriptor::for_record::<Quote>()
        .index(INDEX_SORT_BY_MARKET_CAP)
        .key_condition(Condition::eq(
            "instrumentType",
            AttributeValue::string(INSTRUMENT_TYPE_STOCK),
        ))
        .filter(Condition::lt("latestPrice", AttributeValue::number(params.max_price)))
        .limit(params.query_limit)
        .direction(ScanDirection::Descending);

    for symbol in &params.excluded {
        descriptor = descriptor.filter(Condition::ne("symbol", AttributeValue::string(symbol.as_str())));
    }

    descriptor
}

pub async fn index_components(store: &StoreClient, params: &IndexListingParams) -> Result<Vec<Quote>> {
    let mut quotes: Vec<Quote> = store.query(&index_query(params)).await?;
    quotes.truncate(params.count);

    info!(components = quotes.len(), max_price = params.max_price, "Built index listing");
    Ok(quotes)
}

/// `SYMBOL marketCap companyName - latestPrice`, symbol padded to 6 columns
pub fn format_component(quote: &Quote) -> String {
    format!(
        "{} {} {} - {}",
        right_pad(&quote.symbol, 6),
        quote.market_cap.map(|v| v.to_string()).unwrap_or_default(),
        quote.company_name.as_deref().unwrap_or(""),
        quote.latest_price.map(|v| v.to_string()).unwrap_or_default()
    )
}
