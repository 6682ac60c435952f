//! Lightweight input validation helpers. Keep logic minimal and deterministic.

use serde_json::Value;

use crate::{CollectionName, CoreError, Record, RecordId, ID_FIELD};

/// Accept a request body as a record: it must be a JSON object, and an `id`
/// field, when present, must be usable as a `RecordId`.
pub fn validate_record(body: Value) -> Result<Record, CoreError> {
    let Value::Object(record) = body else {
        return Err(CoreError::InvalidRecord("body must be a JSON object".into()));
    };
    if let Some(id) = record.get(ID_FIELD) {
        if RecordId::from_value(id).is_none() {
            return Err(CoreError::InvalidId);
        }
    }
    Ok(record)
}

/// Validate a collection path segment using the same rules as `CollectionName::new`.
pub fn validate_collection(s: &str) -> Result<CollectionName, CoreError> {
    CollectionName::new(s.to_string())
}

/// Look up a possibly dotted field path (`position.lat`) inside a record.
pub fn field_at<'a>(record: &'a Record, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut cur = record.get(parts.next()?)?;
    for part in parts {
        cur = cur.as_object()?.get(part)?;
    }
    Some(cur)
}

/// Textual form of a scalar used for query-string comparisons.
pub fn value_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
