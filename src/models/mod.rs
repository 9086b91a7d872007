mod attribute;
mod query;
mod quote;
mod store_config;
mod ticker_symbol;
pub mod record;

pub use attribute::{AttributeValue, FieldMap};
pub use query::{Comparator, Condition, QueryDescriptor, ScanDirection};
pub use quote::Quote;
pub use store_config::{parse_table_overrides, StoreConfig};
pub use ticker_symbol::TickerSymbol;
