//! Domain library for the WorldWise cities workspace.
//!
//! Holds the record types shared by the mock collection endpoint and the
//! client stores, the storage port (trait), and error definitions. Only serde
//! is pulled in; keep adapters and IO concerns out of this crate.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A stored JSON object. The mock endpoint is generic over record shape; only
/// the `id` field has meaning to it.
pub type Record = Map<String, Value>;

/// Name of the field carrying a record's identity.
pub const ID_FIELD: &str = "id";

/// Identity of a record: a JSON number or a JSON string.
///
/// Two ids are equal when their textual forms are equal, so the path segment
/// `"7"` addresses a record stored with the number `7`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Number(u64),
    Text(String),
}

impl RecordId {
    /// Interpret a path segment. All-digit segments become numbers.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        if s.is_empty() {
            return Err(CoreError::InvalidId);
        }
        if s.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(n) = s.parse::<u64>() {
                return Ok(RecordId::Number(n));
            }
        }
        Ok(RecordId::Text(s.to_string()))
    }

    /// Read the id out of a JSON value; `None` for anything that is not a
    /// non-negative integer or a non-empty string.
    pub fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::Number(n) => n.as_u64().map(RecordId::Number),
            Value::String(s) if !s.is_empty() => Some(RecordId::Text(s.clone())),
            _ => None,
        }
    }

    /// Read the id of a record, if it carries a usable one.
    pub fn of(record: &Record) -> Option<Self> {
        record.get(ID_FIELD).and_then(Self::from_value)
    }

    pub fn to_value(&self) -> Value {
        match self {
            RecordId::Number(n) => Value::from(*n),
            RecordId::Text(s) => Value::String(s.clone()),
        }
    }

    pub fn as_number(&self) -> Option<u64> {
        match self {
            RecordId::Number(n) => Some(*n),
            RecordId::Text(_) => None,
        }
    }
}

impl Display for RecordId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordId::Number(n) => write!(f, "{}", n),
            RecordId::Text(s) => f.write_str(s),
        }
    }
}

impl PartialEq for RecordId {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (RecordId::Number(a), RecordId::Number(b)) => a == b,
            (RecordId::Text(a), RecordId::Text(b)) => a == b,
            _ => self.to_string() == other.to_string(),
        }
    }
}

impl Eq for RecordId {}

impl Hash for RecordId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_string().hash(state);
    }
}

impl From<u64> for RecordId {
    fn from(n: u64) -> Self {
        RecordId::Number(n)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        RecordId::Text(s.to_string())
    }
}

/// Name of a collection inside the data file (`cities`).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CollectionName(String);

impl CollectionName {
    pub fn new<S: Into<String>>(s: S) -> Result<Self, CoreError> {
        let val = s.into();
        if val.is_empty() {
            return Err(CoreError::InvalidCollection("empty".into()));
        }
        if !val
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(CoreError::InvalidCollection("invalid characters".into()));
        }
        Ok(Self(val))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CollectionName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Map coordinates of a visited city.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lng: f64,
}

/// A visited city as stored in the `cities` collection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct City {
    pub id: RecordId,
    pub city_name: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub emoji: String,
    /// ISO-8601 timestamp of the visit, kept as the server stores it.
    pub date: String,
    #[serde(default)]
    pub notes: String,
    pub position: Position,
}

/// A city that has not been stored yet; the server assigns the id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCity {
    pub city_name: String,
    pub country: String,
    pub emoji: String,
    pub date: String,
    pub notes: String,
    pub position: Position,
}

/// The signed-in user's profile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(rename = "avatar")]
    pub avatar_url: String,
}

/// Id generation strategy for records created without an id.
pub trait IdGenerator: Send + Sync {
    /// Propose an id given the ids already present in the collection.
    fn next_id(&self, existing: &[RecordId]) -> RecordId;
}

/// Repository port for the collections behind the mock endpoint.
///
/// Every method fails with `CoreError::NotFound` when the collection itself
/// does not exist.
pub trait CollectionRepository: Send + Sync {
    /// Names of all collections, in storage order.
    fn collections(&self) -> Result<Vec<CollectionName>, CoreError>;
    fn list(&self, collection: &CollectionName) -> Result<Vec<Record>, CoreError>;
    fn get(&self, collection: &CollectionName, id: &RecordId)
        -> Result<Option<Record>, CoreError>;
    /// Append a record. The record must carry an id not already present.
    fn insert(&self, collection: &CollectionName, record: Record) -> Result<(), CoreError>;
    /// Replace the record with the given id in place.
    fn replace(
        &self,
        collection: &CollectionName,
        id: &RecordId,
        record: Record,
    ) -> Result<(), CoreError>;
    fn delete(&self, collection: &CollectionName, id: &RecordId) -> Result<(), CoreError>;
}

/// Core domain errors (no external error crates to keep deps minimal).
#[derive(Debug)]
pub enum CoreError {
    InvalidCollection(String),
    InvalidRecord(String),
    InvalidId,
    AlreadyExists,
    NotFound,
    Repository(String),
}

impl Display for CoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CoreError::InvalidCollection(msg) => write!(f, "invalid collection: {}", msg),
            CoreError::InvalidRecord(msg) => write!(f, "invalid record: {}", msg),
            CoreError::InvalidId => write!(f, "invalid id"),
            CoreError::AlreadyExists => write!(f, "resource already exists"),
            CoreError::NotFound => write!(f, "not found"),
            CoreError::Repository(msg) => write!(f, "repository error: {}", msg),
        }
    }
}

impl Error for CoreError {}

pub mod adapters;
pub mod base62;
pub mod ids;
pub mod service;
pub mod validate;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_id_parses_digits_as_numbers() {
        assert!(matches!(RecordId::parse("73930385"), Ok(RecordId::Number(73930385))));
        assert!(matches!(RecordId::parse("a1b2"), Ok(RecordId::Text(_))));
        assert!(matches!(RecordId::parse(""), Err(CoreError::InvalidId)));
    }

    #[test]
    fn record_id_equality_uses_text_form() {
        assert_eq!(RecordId::Number(12), RecordId::Text("12".into()));
        assert_ne!(RecordId::Number(12), RecordId::Number(13));
        assert_ne!(RecordId::Text("x".into()), RecordId::Number(1));
    }

    #[test]
    fn record_id_from_value_rejects_unusable_ids() {
        assert!(RecordId::from_value(&Value::from(-1)).is_none());
        assert!(RecordId::from_value(&Value::from(1.5)).is_none());
        assert!(RecordId::from_value(&Value::String(String::new())).is_none());
        assert!(RecordId::from_value(&Value::Null).is_none());
        assert_eq!(RecordId::from_value(&Value::from(4)), Some(RecordId::Number(4)));
    }

    #[test]
    fn collection_name_validation() {
        assert!(CollectionName::new("cities").is_ok());
        assert!(CollectionName::new("").is_err());
        assert!(CollectionName::new("a/b").is_err());
    }

    #[test]
    fn city_uses_camel_case_wire_names() {
        let raw = serde_json::json!({
            "cityName": "Lisbon",
            "country": "Portugal",
            "emoji": "🇵🇹",
            "date": "2027-10-31T15:59:59.138Z",
            "notes": "My favorite city so far!",
            "position": { "lat": 38.727881642324164, "lng": -9.140900099907554 },
            "id": 73930385
        });
        let city: City = serde_json::from_value(raw).expect("city");
        assert_eq!(city.city_name, "Lisbon");
        assert_eq!(city.id, RecordId::Number(73930385));

        let back = serde_json::to_value(&city).unwrap();
        assert_eq!(back["cityName"], "Lisbon");
        assert!(back.get("city_name").is_none());
    }

    #[test]
    fn city_tolerates_missing_optional_fields() {
        let raw = serde_json::json!({
            "id": "abc",
            "cityName": "Madrid",
            "date": "2027-07-15T08:22:53.976Z",
            "position": { "lat": 40.46, "lng": -3.7 }
        });
        let city: City = serde_json::from_value(raw).expect("city");
        assert_eq!(city.notes, "");
        assert_eq!(city.emoji, "");
    }
}
