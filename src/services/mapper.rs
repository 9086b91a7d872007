//! Field mapper: typed records <-> field maps
//!
//! Conversion is driven entirely by each record's declared descriptor table.
//! Absent fields are skipped on write and left at their zero value on read;
//! attributes the record does not declare are ignored on read.

use crate::error::{AppError, Result};
use crate::models::record::{FieldDescriptor, FieldValue, Record, ScalarKind};
use crate::models::{AttributeValue, FieldMap};

/// Convert a record into its wire field map
pub fn to_field_map<R: Record>(record: &R) -> Result<FieldMap> {
    let mut item = FieldMap::new();

    for descriptor in R::fields() {
        let Some(value) = record.read_field(descriptor.name) else {
            continue;
        };
        let attribute = encode::<R>(descriptor, value)?;
        item.insert(descriptor.wire_name().to_string(), attribute);
    }

    Ok(item)
}

/// Convert a wire field map into a record
pub fn from_field_map<R: Record>(item: &FieldMap) -> Result<R> {
    let mut record = R::default();

    for descriptor in R::fields() {
        let Some(attribute) = item.get(descriptor.wire_name()) else {
            continue;
        };
        if let Some(value) = decode::<R>(descriptor, attribute)? {
            record.write_field(descriptor.name, value)?;
        }
    }

    Ok(record)
}

/// Convert every field map, preserving order
pub fn from_field_maps<R: Record>(items: &[FieldMap]) -> Result<Vec<R>> {
    items.iter().map(from_field_map::<R>).collect()
}

fn encode<R: Record>(descriptor: &FieldDescriptor, value: FieldValue) -> Result<AttributeValue> {
    match (descriptor.kind, value) {
        (ScalarKind::String, FieldValue::String(s)) => Ok(AttributeValue::S(s)),
        (ScalarKind::Number, FieldValue::Number(n)) => {
            if !n.is_finite() {
                return Err(AppError::Conversion(format!(
                    "{}.{}: {} has no numeric wire form",
                    R::TABLE_NAME,
                    descriptor.name,
                    n
                )));
            }
            Ok(AttributeValue::number(n))
        }
        (ScalarKind::Integer, FieldValue::Integer(i)) => Ok(AttributeValue::integer(i)),
        (ScalarKind::Boolean, FieldValue::Boolean(b)) => Ok(AttributeValue::Bool(b)),
        (ScalarKind::Binary, FieldValue::Binary(bytes)) => Ok(AttributeValue::B(bytes)),
        (kind, value) => Err(AppError::Conversion(format!(
            "{}.{}: declared {:?} but holds {:?}",
            R::TABLE_NAME,
            descriptor.name,
            kind,
            value.kind()
        ))),
    }
}

fn decode<R: Record>(
    descriptor: &FieldDescriptor,
    attribute: &AttributeValue,
) -> Result<Option<FieldValue>> {
    let mismatch = || {
        AppError::Conversion(format!(
            "{}.{}: declared {:?} but the store sent {}",
            R::TABLE_NAME,
            descriptor.wire_name(),
            descriptor.kind,
            attribute
        ))
    };

    let value = match (descriptor.kind, attribute) {
        (_, AttributeValue::Null) => return Ok(None),
        (ScalarKind::String, AttributeValue::S(s)) => FieldValue::String(s.clone()),
        (ScalarKind::Number, AttributeValue::N(n)) => {
            FieldValue::Number(n.trim().parse::<f64>().map_err(|_| mismatch())?)
        }
        (ScalarKind::Integer, AttributeValue::N(n)) => {
            FieldValue::Integer(n.trim().parse::<i64>().map_err(|_| mismatch())?)
        }
        (ScalarKind::Boolean, AttributeValue::Bool(b)) => FieldValue::Boolean(*b),
        (ScalarKind::Binary, AttributeValue::B(bytes)) => FieldValue::Binary(bytes.clone()),
        _ => return Err(mismatch()),
    };

    Ok(Some(value))
}
