use serde::{Deserialize, Serialize};

use crate::constants::INDEX_SORT_BY_MARKET_CAP;
use crate::error::Result;
use crate::models::record::{
    kind_mismatch, unknown_field, FieldDescriptor, FieldValue, IndexDescriptor, Record, ScalarKind,
};

/// Latest quote of one listed instrument
///
/// Deserialized straight from the quote API response (unknown fields are
/// ignored) and persisted to the `stock-quotes` table keyed by `symbol`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// Market capitalization in USD
    #[serde(default)]
    pub market_cap: Option<f64>,

    /// Last traded price in USD
    #[serde(default)]
    pub latest_price: Option<f64>,

    /// Ticker symbol (primary key)
    pub symbol: String,

    #[serde(default)]
    pub company_name: Option<String>,

    /// Set by the ingestion job, not by the quote API
    #[serde(default)]
    pub instrument_type: Option<String>,
}

const QUOTE_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::renamed("market_cap", "marketCap", ScalarKind::Number),
    FieldDescriptor::renamed("latest_price", "latestPrice", ScalarKind::Number),
    FieldDescriptor::new("symbol", ScalarKind::String),
    FieldDescriptor::renamed("company_name", "companyName", ScalarKind::String),
    FieldDescriptor::renamed("instrument_type", "instrumentType", ScalarKind::String),
];

const QUOTE_INDEXES: &[IndexDescriptor] = &[IndexDescriptor {
    name: INDEX_SORT_BY_MARKET_CAP,
    key_fields: &["instrumentType", "marketCap"],
}];

impl Quote {
    /// Key-only stub used for lookups
    pub fn key(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            ..Self::default()
        }
    }
}

impl Record for Quote {
    const TABLE_NAME: &'static str = "stock-quotes";

    fn fields() -> &'static [FieldDescriptor] {
        QUOTE_FIELDS
    }

    fn key_fields() -> &'static [&'static str] {
        &["symbol"]
    }

    fn indexes() -> &'static [IndexDescriptor] {
        QUOTE_INDEXES
    }

    fn read_field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "market_cap" => self.market_cap.map(FieldValue::Number),
            "latest_price" => self.latest_price.map(FieldValue::Number),
            "symbol" if !self.symbol.is_empty() => Some(FieldValue::String(self.symbol.clone())),
            "company_name" => self.company_name.clone().map(FieldValue::String),
            "instrument_type" => self.instrument_type.clone().map(FieldValue::String),
            _ => None,
        }
    }

    fn write_field(&mut self, name: &str, value: FieldValue) -> Result<()> {
        match (name, value) {
            ("market_cap", FieldValue::Number(v)) => self.market_cap = Some(v),
            ("latest_price", FieldValue::Number(v)) => self.latest_price = Some(v),
            ("symbol", FieldValue::String(v)) => self.symbol = v,
            ("company_name", FieldValue::String(v)) => self.company_name = Some(v),
            ("instrument_type", FieldValue::String(v)) => self.instrument_type = Some(v),
            (name, value) if Self::fields().iter().any(|d| d.name == name) => {
                return Err(kind_mismatch(Self::TABLE_NAME, name, &value));
            }
            (name, _) => return Err(unknown_field(Self::TABLE_NAME, name)),
        }
        Ok(())
    }
}
