use std::path::PathBuf;

use crate::constants::DEFAULT_TICKER_SYMBOL_PATH;

/// Get ticker listing path from environment variable or use default
pub fn get_ticker_symbol_path() -> PathBuf {
    std::env::var("TICKER_SYMBOL_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_TICKER_SYMBOL_PATH))
}

/// Pad `text` with spaces on the right up to `width` characters
pub fn right_pad(text: &str, width: usize) -> String {
    format!("{:<width$}", text, width = width)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_right_pad() {
        assert_eq!(right_pad("KO", 6), "KO    ");
        assert_eq!(right_pad("GOOGL", 6), "GOOGL ");
        assert_eq!(right_pad("LONGSYM", 6), "LONGSYM");
    }
}
