use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{DATA_FIELD_NAME, ID_FIELD_NAME, OBJECT_ID_FIELD_NAME};

/// Server-assigned identifier of a persisted record.
///
/// Endpoints disagree on the representation, some return Mongo style string ids,
/// others plain integers. Both are kept as they came so that the id can be sent
/// back unchanged in the request path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RemoteId {
    Number(i64),
    Text(String),
}

impl RemoteId {
    /// Interprets a JSON value as an identifier.
    /// Empty strings and zero are not identifiers.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(text) if !text.is_empty() => Some(Self::Text(text.clone())),
            Value::Number(number) => number
                .as_i64()
                .filter(|n| *n != 0)
                .map(Self::Number),
            _ => None,
        }
    }

    /// Parses an identifier typed by a user or taken from a query parameter.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            None
        } else {
            Some(Self::Text(raw.to_owned()))
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Number(n) => Value::from(*n),
            Self::Text(text) => Value::String(text.clone()),
        }
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

impl From<&str> for RemoteId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<i64> for RemoteId {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

/// Finds the id of a record returned by a create call.
///
/// Tries, in order: `_id`, `id`, `<singular>._id`, `<singular>.id`, `data._id`, `data.id`.
pub fn extract_id(result: &Value, singular_name: &str) -> Option<RemoteId> {
    if !result.is_object() {
        return None;
    }

    let id_in = |container: Option<&Value>, key: &str| {
        container
            .and_then(|value| value.get(key))
            .and_then(RemoteId::from_value)
    };
    let wrapped = result.get(singular_name);
    let data = result.get(DATA_FIELD_NAME);

    id_in(Some(result), OBJECT_ID_FIELD_NAME)
        .or_else(|| id_in(Some(result), ID_FIELD_NAME))
        .or_else(|| id_in(wrapped, OBJECT_ID_FIELD_NAME))
        .or_else(|| id_in(wrapped, ID_FIELD_NAME))
        .or_else(|| id_in(data, OBJECT_ID_FIELD_NAME))
        .or_else(|| id_in(data, ID_FIELD_NAME))
}

/// Key of a record inside a listing: `id` first, then `_id`.
pub fn record_key(record: &Value) -> Option<RemoteId> {
    record
        .get(ID_FIELD_NAME)
        .and_then(RemoteId::from_value)
        .or_else(|| record.get(OBJECT_ID_FIELD_NAME).and_then(RemoteId::from_value))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn extracts_top_level_object_id_first() {
        let result = json!({"_id": "abc123", "id": 7});
        assert_eq!(extract_id(&result, "caseStudy"), Some(RemoteId::from("abc123")));
    }

    #[test]
    fn extracts_wrapped_and_data_ids() {
        let wrapped = json!({"caseStudy": {"_id": "cs-1"}});
        assert_eq!(extract_id(&wrapped, "caseStudy"), Some(RemoteId::from("cs-1")));

        let data = json!({"data": {"id": 42}});
        assert_eq!(extract_id(&data, "blog"), Some(RemoteId::from(42)));
    }

    #[test]
    fn falsy_ids_fall_through() {
        let result = json!({"_id": "", "id": 0, "data": {"id": "late"}});
        assert_eq!(extract_id(&result, "service"), Some(RemoteId::from("late")));
    }

    #[test]
    fn non_objects_have_no_id() {
        assert_eq!(extract_id(&json!(null), "blog"), None);
        assert_eq!(extract_id(&json!(["a"]), "blog"), None);
        assert_eq!(extract_id(&json!({"ok": true}), "blog"), None);
    }

    #[test]
    fn record_key_prefers_id() {
        assert_eq!(record_key(&json!({"id": "1", "_id": "x"})), Some(RemoteId::from("1")));
        assert_eq!(record_key(&json!({"_id": "x"})), Some(RemoteId::from("x")));
    }

    #[test]
    fn displays_raw_value() {
        assert_eq!(RemoteId::from(12).to_string(), "12");
        assert_eq!(RemoteId::from("abc").to_string(), "abc");
        assert_eq!(RemoteId::parse("  "), None);
    }
}
