use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// Wire representation of one record: field name -> tagged scalar
pub type FieldMap = BTreeMap<String, AttributeValue>;

/// Tagged scalar as the store transmits it
///
/// Numbers travel as decimal strings (`N`) so the store never sees a lossy
/// binary float.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttributeValue {
    /// String
    S(String),
    /// Number in decimal string form
    N(String),
    /// Boolean
    Bool(bool),
    /// Binary blob
    B(Vec<u8>),
    /// Explicit null
    Null,
}

impl AttributeValue {
    /// Wire tag name ("S", "N", "BOOL", "B", "NULL")
    pub fn tag(&self) -> &'static str {
        match self {
            AttributeValue::S(_) => "S",
            AttributeValue::N(_) => "N",
            AttributeValue::Bool(_) => "BOOL",
            AttributeValue::B(_) => "B",
            AttributeValue::Null => "NULL",
        }
    }

    pub fn string(value: impl Into<String>) -> Self {
        AttributeValue::S(value.into())
    }

    pub fn number(value: f64) -> Self {
        AttributeValue::N(value.to_string())
    }

    pub fn integer(value: i64) -> Self {
        AttributeValue::N(value.to_string())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::S(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::N(n) => n.parse().ok(),
            _ => None,
        }
    }

    /// Textual form of the literal, used to derive alias tokens
    pub fn literal_text(&self) -> String {
        match self {
            AttributeValue::S(s) => s.clone(),
            AttributeValue::N(n) => n.clone(),
            AttributeValue::Bool(b) => b.to_string(),
            AttributeValue::B(bytes) => bytes.iter().map(|b| format!("{:02x}", b)).collect(),
            AttributeValue::Null => "null".to_string(),
        }
    }

    /// Ordering between two values of the same tag
    ///
    /// Numbers compare numerically, strings and binaries lexicographically.
    /// Values of different tags are incomparable.
    pub fn compare(&self, other: &AttributeValue) -> Option<Ordering> {
        match (self, other) {
            (AttributeValue::S(a), AttributeValue::S(b)) => Some(a.cmp(b)),
            (AttributeValue::N(a), AttributeValue::N(b)) => {
                let a: f64 = a.parse().ok()?;
                let b: f64 = b.parse().ok()?;
                a.partial_cmp(&b)
            }
            (AttributeValue::B(a), AttributeValue::B(b)) => Some(a.cmp(b)),
            (AttributeValue::Bool(a), AttributeValue::Bool(b)) => Some(a.cmp(b)),
            (AttributeValue::Null, AttributeValue::Null) => Some(Ordering::Equal),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::B(bytes) => write!(f, "{}:<{} bytes>", self.tag(), bytes.len()),
            _ => write!(f, "{}:{}", self.tag(), self.literal_text()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers_compare_numerically() {
        let small = AttributeValue::N("9".to_string());
        let large = AttributeValue::N("10".to_string());
        assert_eq!(small.compare(&large), Some(Ordering::Less));
    }

    #[test]
    fn test_mixed_tags_are_incomparable() {
        let s = AttributeValue::string("1");
        let n = AttributeValue::integer(1);
        assert_eq!(s.compare(&n), None);
    }

    #[test]
    fn test_literal_text() {
        assert_eq!(AttributeValue::string("BRK.B").literal_text(), "BRK.B");
        assert_eq!(AttributeValue::number(150.25).literal_text(), "150.25");
        assert_eq!(AttributeValue::B(vec![0xab, 0x01]).literal_text(), "ab01");
    }
}
