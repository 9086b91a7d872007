//! Record capability
//!
//! Every type the store persists or queries implements [`Record`]. The trait
//! carries a declared field-descriptor table instead of relying on runtime
//! introspection: each field has a Rust-side name, an optional wire name and
//! a scalar kind.

use crate::error::{AppError, Result};
use crate::models::attribute::FieldMap;
use crate::services::mapper;

/// Declared scalar kind of a record field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    String,
    /// Decimal number (f64 in memory, `N` on the wire)
    Number,
    /// Whole number (i64 in memory, `N` on the wire)
    Integer,
    Boolean,
    Binary,
}

/// In-memory value of one record field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    String(String),
    Number(f64),
    Integer(i64),
    Boolean(bool),
    Binary(Vec<u8>),
}

impl FieldValue {
    /// Scalar kind this value belongs to
    pub fn kind(&self) -> ScalarKind {
        match self {
            FieldValue::String(_) => ScalarKind::String,
            FieldValue::Number(_) => ScalarKind::Number,
            FieldValue::Integer(_) => ScalarKind::Integer,
            FieldValue::Boolean(_) => ScalarKind::Boolean,
            FieldValue::Binary(_) => ScalarKind::Binary,
        }
    }
}

/// One entry of a record's field-descriptor table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Field name as the record exposes it through `read_field`/`write_field`
    pub name: &'static str,
    /// Attribute name on the wire, when it differs from `name`
    pub wire_name: Option<&'static str>,
    pub kind: ScalarKind,
}

impl FieldDescriptor {
    pub const fn new(name: &'static str, kind: ScalarKind) -> Self {
        Self {
            name,
            wire_name: None,
            kind,
        }
    }

    pub const fn renamed(name: &'static str, wire_name: &'static str, kind: ScalarKind) -> Self {
        Self {
            name,
            wire_name: Some(wire_name),
            kind,
        }
    }

    /// Attribute name used in field maps and expressions
    pub fn wire_name(&self) -> &'static str {
        self.wire_name.unwrap_or(self.name)
    }
}

/// Secondary index declared on a record's table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexDescriptor {
    pub name: &'static str,
    /// Partition key first, then the optional sort key (wire names)
    pub key_fields: &'static [&'static str],
}

/// Contract every persisted type satisfies
pub trait Record: Default + Send + Sync + 'static {
    /// Logical name of the backing table
    const TABLE_NAME: &'static str;

    /// Declared field-descriptor table
    fn fields() -> &'static [FieldDescriptor];

    /// Wire names of the primary key attributes
    fn key_fields() -> &'static [&'static str];

    /// Secondary indexes available for queries
    fn indexes() -> &'static [IndexDescriptor] {
        &[]
    }

    /// Current value of a declared field, `None` when absent
    fn read_field(&self, name: &str) -> Option<FieldValue>;

    /// Assign a declared field
    fn write_field(&mut self, name: &str, value: FieldValue) -> Result<()>;

    /// Primary-key projection, derived from the record's own fields
    fn primary_key(&self) -> Result<FieldMap> {
        let mut item = mapper::to_field_map(self)?;
        let mut key = FieldMap::new();
        for field in Self::key_fields() {
            let value = item.remove(*field).ok_or_else(|| {
                AppError::Conversion(format!(
                    "{}: key field '{}' is absent",
                    Self::TABLE_NAME,
                    field
                ))
            })?;
            key.insert((*field).to_string(), value);
        }
        Ok(key)
    }

    /// Descriptor of a field by wire name
    fn descriptor(wire_name: &str) -> Option<&'static FieldDescriptor> {
        Self::fields().iter().find(|d| d.wire_name() == wire_name)
    }

    /// Index by name
    fn index(name: &str) -> Option<&'static IndexDescriptor> {
        Self::indexes().iter().find(|i| i.name == name)
    }
}

/// Error for a `write_field` call whose value kind does not match the field
pub fn kind_mismatch(table: &str, field: &str, value: &FieldValue) -> AppError {
    AppError::Conversion(format!(
        "{}: field '{}' cannot hold a {:?} value",
        table,
        field,
        value.kind()
    ))
}

/// Error for a `write_field` call naming an undeclared field
pub fn unknown_field(table: &str, field: &str) -> AppError {
    AppError::Conversion(format!("{}: no declared field '{}'", table, field))
}
