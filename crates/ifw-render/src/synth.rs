//! Synthetic form-variable values.
//!
//! Each declared field gets one stable, human-debuggable placeholder derived
//! from its key and type, so a rendered template shows at a glance which
//! field ended up where.

use ifw_core::{FieldType, FormVariable};
use serde_json::{Map, Value};

/// Map each field key to a synthetic value.
///
/// Fields of an unknown type produce no entry.
pub fn synthesize(fields: &[FormVariable]) -> Map<String, Value> {
    fields
        .iter()
        .filter_map(|field| synthetic_value(field).map(|value| (field.key.clone(), value)))
        .collect()
}

/// The synthetic value for one field, or `None` for an unknown type.
pub fn synthetic_value(field: &FormVariable) -> Option<Value> {
    match &field.field_type {
        FieldType::String | FieldType::Enum | FieldType::DynamicEnum => {
            Some(Value::String(field.key.clone()))
        }
        FieldType::Boolean => Some(Value::Bool(true)),
        FieldType::Uri => Some(Value::String(format!("https://{}.com", field.key))),
        FieldType::Unknown(name) => {
            tracing::debug!(key = %field.key, field_type = %name, "no synthetic value for unknown field type");
            None
        }
    }
}
