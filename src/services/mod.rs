pub mod dynamo_transport;
pub mod expression;
pub mod index_listing;
pub mod mapper;
pub mod memory_transport;
pub mod quote_source;
pub mod quote_sync;
pub mod store_client;
pub mod ticker_source;
pub mod transport;

pub use dynamo_transport::DynamoTransport;
pub use index_listing::{format_component, index_components, index_query, IndexListingParams};
pub use memory_transport::MemoryTransport;
pub use quote_source::{QuoteProvider, QuoteSource};
pub use quote_sync::{QuoteSync, QuoteSyncStats};
pub use store_client::StoreClient;
pub use ticker_source::{load_ticker_symbols, TickerSource};
pub use transport::StoreTransport;
