use serde_json::{Map, Value};

use super::registration::RegistrationId;
use super::schema::{FieldSchema, REGISTRATION_FIELD, SUBMITTED_AT_FIELD};

/// A submission's values reordered and padded to match a [`FieldSchema`]
/// exactly. `values()[i]` always corresponds to `schema.fields()[i]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRow {
    values: Vec<String>,
}

impl NormalizedRow {
    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn into_values(self) -> Vec<String> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Map an arbitrary payload onto the schema's ordered field list.
///
/// The designated identifier and timestamp columns are filled from the
/// arguments; every other column takes the payload value coerced to a display
/// string, or an empty string when absent. Extra payload keys are dropped.
/// Never fails: output length equals schema length for every input.
pub fn normalize_row(
    payload: &Map<String, Value>,
    schema: &FieldSchema,
    registration: &RegistrationId,
    submitted_at: &str,
) -> NormalizedRow {
    let values = schema
        .fields()
        .iter()
        .map(|field| match *field {
            REGISTRATION_FIELD => registration.0.clone(),
            SUBMITTED_AT_FIELD => submitted_at.to_string(),
            name => payload.get(name).map(display_value).unwrap_or_default(),
        })
        .collect();

    NormalizedRow { values }
}

/// Coerce a JSON value to the display string persisted in the store.
///
/// Composite sections (arrays, objects) are kept as opaque compact JSON
/// rather than decomposed.
pub(crate) fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        composite => serde_json::to_string(composite).unwrap_or_default(),
    }
}
