//! Store and Market Constants
//!
//! Limits of the key-value store wire protocol, the table/index names the
//! quote jobs depend on, and the default parameters of the index listing.

/// Maximum number of keys the store accepts in a single BatchGetItem call
pub const MAX_BATCH_GET_ITEMS: usize = 100;

/// Number of batch-get chunks dispatched concurrently by default
pub const DEFAULT_CONCURRENT_BATCHES: usize = 4;

/// Default transport timeout for store requests
pub const DEFAULT_STORE_TIMEOUT_SECS: u64 = 30;

/// Default region of the backing store
pub const DEFAULT_REGION: &str = "us-east-1";

/// Default named credential profile
pub const DEFAULT_PROFILE: &str = "income-calculator";

/// Name alias prefix: `#source<field>`
pub const NAME_ALIAS_PREFIX: &str = "#source";

/// Value alias prefix: `:<field>`
pub const VALUE_ALIAS_PREFIX: &str = ":";

/// Instrument type of common stocks in the ticker listing
pub const INSTRUMENT_TYPE_STOCK: &str = "COMMON_STOCK";

/// Global secondary index on (instrumentType, marketCap)
pub const INDEX_SORT_BY_MARKET_CAP: &str = "instrumentType-marketCap-index";

/// Default location of the downloaded ticker listing
pub const DEFAULT_TICKER_SYMBOL_PATH: &str = "TickerSymbols.json";

/// Environment variable holding the quote API token
pub const QUOTE_TOKEN_ENV: &str = "IEX_Cloud_Secret_Key";

/// Pause between quote requests (quote API rate limit)
pub const QUOTE_REQUEST_DELAY_MS: u64 = 250;

/// Number of components listed by the index command
pub const INDEX_COMPONENT_COUNT: usize = 30;

/// Candidates scanned by the index query before the filter applies
pub const INDEX_QUERY_LIMIT: u32 = 1000;

/// Default price ceiling of the index listing
pub const DEFAULT_MAX_PRICE: f64 = 1000.0;

/// Large caps left out of the price-weighted listing by default
pub const DEFAULT_EXCLUDED_SYMBOLS: &[&str] = &[
    "FB", "BRK.B", "BAC", "MA", "CMCSA", "C", "ABT", "LLY", "ADBE", "ABBV", "CRM",
    "AVGO", "AMGN", "MDT", "HON", "ACN", "COST",
];
