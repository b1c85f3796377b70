use serde::Serialize;
use serde_json::{Map, Value};

use crate::domain::content_types::{AttributeType, ListShape};
use crate::domain::draft::{Draft, FieldValue, Row};
use crate::domain::text::parse_delimited;

/// The sanitized, server-ready projection of a [`Draft`].
///
/// Recomputed on every save attempt, never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Payload(Map<String, Value>);

impl Payload {
    /// Projects a draft: text trimmed, empty optional text and dates as `null`,
    /// tags split into an array, and list rows without a meaningful cell dropped.
    pub fn build(draft: &Draft) -> Self {
        let mut body = Map::new();
        for (attribute, value) in draft.fields() {
            let projected = match (attribute.attribute_type, value) {
                (AttributeType::Tags, FieldValue::Text(text)) => Value::from(parse_delimited(text)),
                (AttributeType::Date, FieldValue::Text(text)) => non_empty_or_null(text),
                (_, FieldValue::Text(text)) if attribute.nullable => non_empty_or_null(text),
                (_, FieldValue::Text(text)) => Value::String(text.trim().to_owned()),
                (_, FieldValue::Boolean(flag)) => Value::Bool(*flag),
                (_, FieldValue::Integer(number)) => Value::from(*number),
                (_, FieldValue::List(rows)) => match &attribute.list {
                    Some(shape) => Value::Array(sanitize_rows(rows, shape)),
                    None => Value::Array(Vec::new()),
                },
            };
            body.insert(attribute.id.to_string(), projected);
        }
        Self(body)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

fn non_empty_or_null(text: &str) -> Value {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Value::Null
    } else {
        Value::String(trimmed.to_owned())
    }
}

fn sanitize_rows(rows: &[Row], shape: &ListShape) -> Vec<Value> {
    rows.iter()
        .filter(|row| is_meaningful_row(row, shape))
        .map(|row| {
            let cleaned = row
                .iter()
                .map(|(cell, value)| {
                    let value = match value {
                        Value::String(text) => Value::String(text.trim().to_owned()),
                        other => other.clone(),
                    };
                    (cell.clone(), value)
                })
                .collect();
            Value::Object(cleaned)
        })
        .collect()
}

/// A row is kept iff at least one of its meaningful cells is non-empty.
pub fn is_meaningful_row(row: &Row, shape: &ListShape) -> bool {
    shape
        .meaningful
        .iter()
        .any(|cell| row.get(cell).is_some_and(is_meaningful))
}

fn is_meaningful(value: &Value) -> bool {
    match value {
        Value::String(text) => !text.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Number(_) => true,
        Value::Bool(flag) => *flag,
        Value::Object(_) => true,
        Value::Null => false,
    }
}
