//! Field mapping: raw request input to prepared, typed field values

use crate::artifact::InvalidValueTreatment;
use crate::handle::{InputField, ModelHandle};
use docclass_core::{DataType, Error, FieldValue, Result};
use std::collections::HashMap;

/// Prepared input values, in the handle's input field declaration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreparedFields {
    entries: Vec<(String, FieldValue)>,
}

impl PreparedFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value, replacing any previous value for the same field
    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Bind a raw input string to the model's input fields.
///
/// Every declared input field receives the whole raw string; for the
/// single-text-field models this service hosts that is the entire request
/// payload.
pub fn prepare(raw_input: &str, handle: &ModelHandle) -> Result<PreparedFields> {
    let mut fields = PreparedFields::new();
    for field in handle.input_fields() {
        fields.insert(field.name.clone(), prepare_value(field, Some(raw_input))?);
    }
    Ok(fields)
}

/// Bind a structured record to the model's input fields by name.
///
/// Fields absent from the record are treated as missing.
pub fn prepare_record(
    record: &HashMap<String, String>,
    handle: &ModelHandle,
) -> Result<PreparedFields> {
    let mut fields = PreparedFields::new();
    for field in handle.input_fields() {
        let raw = record.get(&field.name).map(String::as_str);
        fields.insert(field.name.clone(), prepare_value(field, raw)?);
    }
    Ok(fields)
}

/// Prepare one field value from its raw text (`None` when absent)
pub fn prepare_value(field: &InputField, raw: Option<&str>) -> Result<FieldValue> {
    let raw = match raw {
        Some(raw) if !is_missing(field.data_type, raw) => raw,
        _ => return missing(field, raw.unwrap_or_default()),
    };

    match field.data_type.parse(raw) {
        Some(value) if field.accepts(&value) => Ok(value),
        Some(_) => invalid(field, raw, "value is not one of the field's valid values"),
        None => invalid(
            field,
            raw,
            &format!("value is not a valid {} literal", field.data_type),
        ),
    }
}

/// Only non-string values can be missing; an empty string is a valid text
fn is_missing(data_type: DataType, raw: &str) -> bool {
    data_type != DataType::String && raw.trim().is_empty()
}

fn missing(field: &InputField, raw: &str) -> Result<FieldValue> {
    field.missing_value_replacement.clone().ok_or_else(|| {
        Error::field_preparation(&field.name, raw, "value is missing and the field has no replacement")
    })
}

fn invalid(field: &InputField, raw: &str, reason: &str) -> Result<FieldValue> {
    match field.invalid_value_treatment {
        InvalidValueTreatment::ReturnInvalid => {
            Err(Error::field_preparation(&field.name, raw, reason))
        }
        InvalidValueTreatment::AsMissing => missing(field, raw),
        InvalidValueTreatment::AsIs => match field.data_type {
            DataType::String => Ok(FieldValue::Text(raw.to_string())),
            _ => Err(Error::field_preparation(&field.name, raw, reason)),
        },
    }
}
