//! Expression builder for index queries
//!
//! Field names and literal values never appear inline in an expression.
//! Each referenced field gets a name alias (`#source<field>`) and each
//! literal a value alias (`:<field>`, or a token derived from the literal
//! when the field already has a different one). Tokens only contain ASCII
//! alphanumerics and `_`: every other character is replaced by a fixed-width
//! marker, so reserved words and characters such as `.` never reach the wire.
//!
//! Allocation follows first-reference order (key conditions, then filters),
//! which makes the output byte-identical for the same descriptor.

use crate::constants::{NAME_ALIAS_PREFIX, VALUE_ALIAS_PREFIX};
use crate::models::{AttributeValue, Condition, QueryDescriptor};

/// Separator between the field part and the literal part of a derived token
const TOKEN_SEPARATOR: &str = "__";

/// Alias allocations of one descriptor, in first-reference order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AliasTable {
    /// `#token` -> field name
    pub names: Vec<(String, String)>,
    /// `:token` -> literal
    pub values: Vec<(String, AttributeValue)>,
    /// Field each value token was allocated for (parallel to `values`)
    value_fields: Vec<String>,
}

impl AliasTable {
    /// Name alias for `field`, allocated on first use
    pub fn name_alias(&mut self, field: &str) -> String {
        if let Some((token, _)) = self.names.iter().find(|(_, f)| f == field) {
            return token.clone();
        }
        let token = format!("{}{}", NAME_ALIAS_PREFIX, canonicalize(field));
        self.names.push((token.clone(), field.to_string()));
        token
    }

    /// Value alias for `value` compared against `field`, allocated on first use
    pub fn value_alias(&mut self, field: &str, value: &AttributeValue) -> String {
        let existing = self
            .values
            .iter()
            .zip(&self.value_fields)
            .find(|((_, v), f)| v == value && f.as_str() == field);
        if let Some(((token, _), _)) = existing {
            return token.clone();
        }

        let primary = format!("{}{}", VALUE_ALIAS_PREFIX, canonicalize(field));
        let token = if !self.has_value_token(&primary) {
            primary
        } else {
            let derived = format!(
                "{}{}{}",
                primary,
                TOKEN_SEPARATOR,
                canonicalize(&value.literal_text())
            );
            if !self.has_value_token(&derived) {
                derived
            } else {
                // Same text under another tag (e.g., S "1" vs N "1")
                format!("{}{}{}", derived, TOKEN_SEPARATOR, value.tag().to_lowercase())
            }
        };

        self.values.push((token.clone(), value.clone()));
        self.value_fields.push(field.to_string());
        token
    }

    fn has_value_token(&self, token: &str) -> bool {
        self.values.iter().any(|(t, _)| t == token)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.values.is_empty()
    }
}

/// Serialized expressions of one query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuiltExpression {
    /// `None` when the descriptor has no key conditions
    pub key_condition: Option<String>,
    /// `None` when the descriptor has no filters
    pub filter: Option<String>,
    pub aliases: AliasTable,
}

/// Builds key-condition and filter expressions for a descriptor
#[derive(Debug, Default)]
pub struct ExpressionBuilder {
    aliases: AliasTable,
}

impl ExpressionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render one `<nameAlias> <op> <valueAlias>` clause
    pub fn clause(&mut self, condition: &Condition) -> String {
        let name = self.aliases.name_alias(&condition.field);
        let value = self.aliases.value_alias(&condition.field, &condition.value);
        format!("{} {} {}", name, condition.comparator.symbol(), value)
    }

    /// Join clauses with AND; `None` for an empty list
    pub fn conjunction(&mut self, conditions: &[Condition]) -> Option<String> {
        if conditions.is_empty() {
            return None;
        }
        let clauses: Vec<String> = conditions.iter().map(|c| self.clause(c)).collect();
        Some(clauses.join(" AND "))
    }

    /// Build both expressions; the builder is consumed with its alias table
    pub fn build(mut self, descriptor: &QueryDescriptor) -> BuiltExpression {
        let key_condition = self.conjunction(&descriptor.key_conditions);
        let filter = self.conjunction(&descriptor.filters);

        BuiltExpression {
            key_condition,
            filter,
            aliases: self.aliases,
        }
    }
}

/// Build the expressions of `descriptor` with a fresh alias table
pub fn build_expression(descriptor: &QueryDescriptor) -> BuiltExpression {
    ExpressionBuilder::new().build(descriptor)
}

/// Protocol-safe form of arbitrary text
///
/// ASCII alphanumerics are kept; any other character (including `_`) becomes
/// `_` followed by its code point as 6 uppercase hex digits. The mapping is
/// injective and the output never contains `__` nor ends with `_`.
pub fn canonicalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
        } else {
            out.push_str(&format!("_{:06X}", c as u32));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Comparator, Quote, ScanDirection};
    use std::collections::HashSet;

    fn index_query() -> QueryDescriptor {
        QueryDescriptor::for_record::<Quote>()
            .index("instrumentType-marketCap-index")
            .key_condition(Condition::eq("instrumentType", AttributeValue::string("COMMON_STOCK")))
            .filter(Condition::lt("latestPrice", AttributeValue::number(1000.0)))
            .limit(1000)
            .direction(ScanDirection::Descending)
    }

    #[test]
    fn test_key_condition_and_filter_are_separate() {
        let built = build_expression(&index_query());

        assert_eq!(
            built.key_condition.as_deref(),
            Some("#sourceinstrumentType = :instrumentType")
        );
        assert_eq!(built.filter.as_deref(), Some("#sourcelatestPrice < :latestPrice"));
        assert_eq!(built.aliases.names.len(), 2);
        assert_eq!(built.aliases.values.len(), 2);
        assert_ne!(built.aliases.names[0].0, built.aliases.names[1].0);
        assert_ne!(built.aliases.values[0].0, built.aliases.values[1].0);
    }

    #[test]
    fn test_output_is_stable() {
        let descriptor = index_query().filter(Condition::ne("symbol", AttributeValue::string("BRK.B")));
        assert_eq!(build_expression(&descriptor), build_expression(&descriptor));
    }

    #[test]
    fn test_repeated_field_reuses_name_alias() {
        let descriptor = QueryDescriptor::for_record::<Quote>()
            .filter(Condition::gt("latestPrice", AttributeValue::number(10.0)))
            .filter(Condition::lt("latestPrice", AttributeValue::number(100.0)));

        let built = build_expression(&descriptor);
        assert_eq!(built.aliases.names.len(), 1);
        assert_eq!(built.aliases.values.len(), 2);
        assert_eq!(
            built.filter.as_deref(),
            Some("#sourcelatestPrice > :latestPrice AND #sourcelatestPrice < :latestPrice__100")
        );
    }

    #[test]
    fn test_repeated_literal_reuses_value_alias() {
        let mut aliases = AliasTable::default();
        let first = aliases.value_alias("symbol", &AttributeValue::string("FB"));
        let second = aliases.value_alias("symbol", &AttributeValue::string("FB"));
        assert_eq!(first, second);
        assert_eq!(aliases.values.len(), 1);
    }

    #[test]
    fn test_exclusion_list_tokens_have_no_dot() {
        let mut descriptor = QueryDescriptor::for_record::<Quote>();
        for symbol in ["FB", "BRK.B", "BRK_B", "BRK-B"] {
            descriptor = descriptor.filter(Condition::ne("symbol", AttributeValue::string(symbol)));
        }

        let built = build_expression(&descriptor);
        let tokens: Vec<&str> = built.aliases.values.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(tokens[0], ":symbol");
        assert_eq!(tokens[1], ":symbol__BRK_00002EB");
        assert!(tokens.iter().all(|t| !t.contains('.')));

        let unique: HashSet<&str> = tokens.iter().copied().collect();
        assert_eq!(unique.len(), tokens.len());
        assert!(built.filter.unwrap().contains("#sourcesymbol <> :symbol__BRK_00002EB"));
    }

    #[test]
    fn test_same_text_under_different_tags() {
        let mut aliases = AliasTable::default();
        let a = aliases.value_alias("code", &AttributeValue::string("0"));
        let b = aliases.value_alias("code", &AttributeValue::string("1"));
        let c = aliases.value_alias("code", &AttributeValue::integer(1));
        assert_eq!(a, ":code");
        assert_eq!(b, ":code__1");
        assert_eq!(c, ":code__1__n");
    }

    #[test]
    fn test_names_with_illegal_characters() {
        let mut aliases = AliasTable::default();
        let dotted = aliases.name_alias("price.latest");
        let underscored = aliases.name_alias("price_latest");
        assert_eq!(dotted, "#sourceprice_00002Elatest");
        assert_ne!(dotted, underscored);
        assert!(!dotted.contains('.'));
    }

    #[test]
    fn test_canonicalize_is_injective_on_tricky_inputs() {
        let inputs = ["a.b", "a_b", "a_00002Eb", "a__b", "", "é", "a b"];
        let outputs: HashSet<String> = inputs.iter().map(|s| canonicalize(s)).collect();
        assert_eq!(outputs.len(), inputs.len());
        for out in &outputs {
            assert!(!out.contains("__"));
            assert!(out.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
        }
    }

    #[test]
    fn test_empty_descriptor_builds_nothing() {
        let built = build_expression(&QueryDescriptor::for_record::<Quote>());
        assert_eq!(built.key_condition, None);
        assert_eq!(built.filter, None);
        assert!(built.aliases.is_empty());
    }

    #[test]
    fn test_all_comparators_render() {
        let mut builder = ExpressionBuilder::new();
        let clause = builder.clause(&Condition::new(
            "marketCap",
            Comparator::Ge,
            AttributeValue::integer(1),
        ));
        assert_eq!(clause, "#sourcemarketCap >= :marketCap");
    }
}
