use serde::{Deserialize, Serialize};

/// One row of the exchange's ticker listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerSymbol {
    #[serde(rename = "symbolTicker")]
    pub symbol: String,

    #[serde(rename = "instrumentType")]
    pub instrument_type: String,

    #[serde(rename = "instrumentName", default)]
    pub company_name: Option<String>,

    #[serde(rename = "exchangeId", default)]
    pub exchange_id: Option<String>,
}

impl TickerSymbol {
    /// Case-insensitive instrument type match
    pub fn is_type(&self, instrument_type: &str) -> bool {
        self.instrument_type.eq_ignore_ascii_case(instrument_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_listing_row() {
        let row = r#"{"symbolTicker":"BRK.B","instrumentType":"COMMON_STOCK","instrumentName":"BERKSHIRE HATHAWAY INC","exchangeId":"558","total":6542}"#;
        let ticker: TickerSymbol = serde_json::from_str(row).unwrap();
        assert_eq!(ticker.symbol, "BRK.B");
        assert_eq!(ticker.exchange_id.as_deref(), Some("558"));
        assert!(ticker.is_type("common_stock"));
        assert!(!ticker.is_type("EQUITY"));
    }
}
