use std::fmt;

use crate::models::attribute::AttributeValue;
use crate::models::record::Record;

/// Scan direction over the index sort key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanDirection {
    #[default]
    Ascending,
    Descending,
}

impl ScanDirection {
    /// Value of the wire protocol's `ScanIndexForward` flag
    pub fn is_forward(&self) -> bool {
        matches!(self, ScanDirection::Ascending)
    }
}

/// Comparison operator of a predicate clause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Comparator::Eq => "=",
            Comparator::Ne => "<>",
            Comparator::Lt => "<",
            Comparator::Le => "<=",
            Comparator::Gt => ">",
            Comparator::Ge => ">=",
        }
    }

    /// Parse the operator symbol used in expressions
    pub fn from_symbol(s: &str) -> Option<Self> {
        match s {
            "=" => Some(Comparator::Eq),
            "<>" => Some(Comparator::Ne),
            "<" => Some(Comparator::Lt),
            "<=" => Some(Comparator::Le),
            ">" => Some(Comparator::Gt),
            ">=" => Some(Comparator::Ge),
            _ => None,
        }
    }

    /// Whether the key-condition grammar accepts this operator
    pub fn allowed_in_key_condition(&self) -> bool {
        !matches!(self, Comparator::Ne)
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// `<field> <comparator> <literal>`
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// Wire name of the attribute
    pub field: String,
    pub comparator: Comparator,
    pub value: AttributeValue,
}

impl Condition {
    pub fn new(field: impl Into<String>, comparator: Comparator, value: AttributeValue) -> Self {
        Self {
            field: field.into(),
            comparator,
            value,
        }
    }

    pub fn eq(field: impl Into<String>, value: AttributeValue) -> Self {
        Self::new(field, Comparator::Eq, value)
    }

    pub fn ne(field: impl Into<String>, value: AttributeValue) -> Self {
        Self::new(field, Comparator::Ne, value)
    }

    pub fn lt(field: impl Into<String>, value: AttributeValue) -> Self {
        Self::new(field, Comparator::Lt, value)
    }

    pub fn gt(field: impl Into<String>, value: AttributeValue) -> Self {
        Self::new(field, Comparator::Gt, value)
    }
}

/// Logical intent of one index query before serialization
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryDescriptor {
    /// Logical table name (before configured overrides)
    pub table: String,
    pub index_name: Option<String>,
    pub key_conditions: Vec<Condition>,
    pub filters: Vec<Condition>,
    pub limit: Option<u32>,
    pub scan_direction: ScanDirection,
}

impl QueryDescriptor {
    /// Start a query against the table backing `R`
    pub fn for_record<R: Record>() -> Self {
        Self {
            table: R::TABLE_NAME.to_string(),
            ..Self::default()
        }
    }

    pub fn index(mut self, name: impl Into<String>) -> Self {
        self.index_name = Some(name.into());
        self
    }

    pub fn key_condition(mut self, condition: Condition) -> Self {
        self.key_conditions.push(condition);
        self
    }

    pub fn filter(mut self, condition: Condition) -> Self {
        self.filters.push(condition);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn direction(mut self, direction: ScanDirection) -> Self {
        self.scan_direction = direction;
        self
    }

    /// True when the descriptor has no predicate at all
    pub fn is_empty(&self) -> bool {
        self.key_conditions.is_empty() && self.filters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Quote;

    #[test]
    fn test_comparator_symbols() {
        for op in [
            Comparator::Eq,
            Comparator::Ne,
            Comparator::Lt,
            Comparator::Le,
            Comparator::Gt,
            Comparator::Ge,
        ] {
            assert_eq!(Comparator::from_symbol(op.symbol()), Some(op));
        }
        assert!(!Comparator::Ne.allowed_in_key_condition());
    }

    #[test]
    fn test_descriptor_builder() {
        let query = QueryDescriptor::for_record::<Quote>()
            .index("instrumentType-marketCap-index")
            .key_condition(Condition::eq("instrumentType", AttributeValue::string("COMMON_STOCK")))
            .limit(30)
            .direction(ScanDirection::Descending);

        assert_eq!(query.table, "stock-quotes");
        assert_eq!(query.key_conditions.len(), 1);
        assert!(query.filters.is_empty());
        assert!(!query.scan_direction.is_forward());
        assert!(!query.is_empty());
        assert!(QueryDescriptor::for_record::<Quote>().is_empty());
    }
}
