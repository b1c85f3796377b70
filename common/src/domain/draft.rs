use std::collections::BTreeMap;
use std::iter;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::content_types::{Attribute, AttributeType, ContentType, ListShape};
use crate::domain::payload::Payload;
use crate::domain::text::{count_images, estimate_read_time, join_delimited, slugify, word_count};

/// One row of a list field: cell name → value.
pub type Row = Map<String, Value>;

// tag field whose urls count as images of the content
const IMAGE_URLS_FIELD_NAME: &str = "imageUrls";

/// Size of the rich text a read time is derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentStats {
    pub words: usize,
    pub images: usize,
    pub read_minutes: i64,
}

/// Value of one field while it is being edited.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// text, rich text, dates and comma separated tags
    Text(String),
    Boolean(bool),
    Integer(i64),
    List(Vec<Row>),
}

/// The in-memory editable representation of one content record.
///
/// A draft always has a value for every attribute of its content type, so the
/// editor never has to deal with missing fields. Nothing is validated while
/// editing, required fields are checked by [`Draft::validate`] right before a save.
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    content_type: &'static ContentType,
    fields: BTreeMap<String, FieldValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
    #[error("unknown field `{0}`")]
    UnknownField(String),
    #[error("field `{field}` expects a {expected} value")]
    TypeMismatch {
        field: String,
        expected: &'static str,
    },
    #[error("`{0}` is not a list field")]
    NotAList(String),
    #[error("row {index} of `{list}` does not exist")]
    RowOutOfRange { list: String, index: usize },
    #[error("rows of `{list}` have no `{cell}` cell")]
    UnknownCell { list: String, cell: String },
    #[error("`{list}` must keep at least {min_rows} row(s)")]
    MinimumRows { list: String, min_rows: usize },
    #[error("`{0}` cannot be generated as a slug")]
    NoSlugSource(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please provide {}.", .0.join(", "))]
    MissingFields(Vec<String>),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_rows(&self) -> Option<&[Row]> {
        match self {
            Self::List(rows) => Some(rows),
            _ => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Boolean(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::List(_) => "list",
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl Draft {
    /// Empty draft filled with the defaults of the content type.
    pub fn new(content_type: &'static ContentType) -> Self {
        let fields = content_type
            .attributes
            .iter()
            .map(|attribute| (attribute.id.to_string(), default_value(attribute)))
            .collect();
        Self {
            content_type,
            fields,
        }
    }

    /// Draft populated from a record fetched from the server.
    pub fn from_record(content_type: &'static ContentType, record: &Value) -> Self {
        let mut draft = Self::new(content_type);
        draft.hydrate(record);
        draft
    }

    pub fn content_type(&self) -> &'static ContentType {
        self.content_type
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_text)
    }

    pub fn rows(&self, name: &str) -> Option<&[Row]> {
        self.get(name).and_then(FieldValue::as_rows)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&Attribute, &FieldValue)> {
        self.content_type
            .attributes
            .iter()
            .filter_map(|attribute| self.fields.get(attribute.id.as_ref()).map(|value| (attribute, value)))
    }

    /// Replaces every field with the value found in `record`.
    ///
    /// Keys are looked up as camelCase, snake_case, then the attribute aliases.
    /// Missing text falls back to an empty string, missing booleans and integers
    /// to the attribute default, missing lists to template rows.
    pub fn hydrate(&mut self, record: &Value) {
        for attribute in &self.content_type.attributes {
            let value = hydrate_value(attribute, record);
            self.fields.insert(attribute.id.to_string(), value);
        }
        self.refresh_derived();
    }

    /// Replaces one scalar field.
    pub fn set_field(&mut self, name: &str, value: impl Into<FieldValue>) -> Result<(), DraftError> {
        let attribute = self.attribute(name)?;
        let value = value.into();
        let accepted = matches!(
            (attribute.attribute_type, &value),
            (
                AttributeType::Text | AttributeType::RichText | AttributeType::Date | AttributeType::Tags,
                FieldValue::Text(_)
            ) | (AttributeType::Boolean, FieldValue::Boolean(_))
                | (AttributeType::Integer, FieldValue::Integer(_))
        );
        if !accepted {
            tracing::debug!("rejected {} value for field {}", value.kind(), name);
            return Err(DraftError::TypeMismatch {
                field: name.to_owned(),
                expected: expected_kind(attribute.attribute_type),
            });
        }

        let is_rich_text = attribute.attribute_type == AttributeType::RichText;
        self.fields.insert(name.to_owned(), value);
        if is_rich_text {
            self.refresh_derived();
        }
        Ok(())
    }

    /// Replaces one cell of one row of a list field.
    pub fn set_list_item(
        &mut self,
        list: &str,
        index: usize,
        cell: &str,
        value: impl Into<Value>,
    ) -> Result<(), DraftError> {
        let shape = self.list_shape(list)?;
        if !shape.fields.iter().any(|field| field == cell) {
            return Err(DraftError::UnknownCell {
                list: list.to_owned(),
                cell: cell.to_owned(),
            });
        }

        let row = self
            .rows_mut(list)?
            .get_mut(index)
            .ok_or_else(|| DraftError::RowOutOfRange {
                list: list.to_owned(),
                index,
            })?;
        row.insert(cell.to_owned(), value.into());
        Ok(())
    }

    /// Appends a blank row built from the list template, returns its index.
    pub fn add_list_row(&mut self, list: &str) -> Result<usize, DraftError> {
        let template = self.list_shape(list)?.template();
        let rows = self.rows_mut(list)?;
        rows.push(template);
        Ok(rows.len() - 1)
    }

    /// Removes one row, refusing to go below the minimum row count of the list.
    pub fn remove_list_row(&mut self, list: &str, index: usize) -> Result<Row, DraftError> {
        let min_rows = self.list_shape(list)?.min_rows;
        let rows = self.rows_mut(list)?;
        if index >= rows.len() {
            return Err(DraftError::RowOutOfRange {
                list: list.to_owned(),
                index,
            });
        }
        if rows.len() <= min_rows {
            return Err(DraftError::MinimumRows {
                list: list.to_owned(),
                min_rows,
            });
        }
        Ok(rows.remove(index))
    }

    /// Derives a slug from the first non-empty source field.
    /// Returns `false` when every source is empty and nothing changed.
    pub fn generate_slug(&mut self, name: &str) -> Result<bool, DraftError> {
        let attribute = self.attribute(name)?;
        if attribute.slug_from.is_empty() {
            return Err(DraftError::NoSlugSource(name.to_owned()));
        }

        let base = attribute
            .slug_from
            .iter()
            .filter_map(|source| self.text(source.as_ref()))
            .find(|text| !text.trim().is_empty())
            .map(slugify);

        match base {
            Some(slug) => {
                self.fields.insert(name.to_owned(), FieldValue::Text(slug));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Minimum-required-field check run before any network call.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let missing = self
            .content_type
            .required
            .iter()
            .filter(|name| {
                self.text(name.as_ref())
                    .is_none_or(|text| text.trim().is_empty())
            })
            .map(ToString::to_string)
            .collect::<Vec<_>>();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::MissingFields(missing))
        }
    }

    /// Word, image and read-time summary of the first read-time source, if the
    /// content type has one.
    pub fn content_stats(&self) -> Option<ContentStats> {
        let source = self
            .content_type
            .attributes
            .iter()
            .find_map(|attribute| attribute.read_time_from.as_ref())?;
        let html = self.text(source.as_ref()).unwrap_or_default();
        let image_urls = self.text(IMAGE_URLS_FIELD_NAME).unwrap_or_default();

        Some(ContentStats {
            words: word_count(html),
            images: count_images(html, image_urls),
            read_minutes: estimate_read_time(html),
        })
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    pub fn build_payload(&self) -> Payload {
        Payload::build(self)
    }

    fn attribute(&self, name: &str) -> Result<&'static Attribute, DraftError> {
        let content_type: &'static ContentType = self.content_type;
        content_type
            .attribute(name)
            .ok_or_else(|| DraftError::UnknownField(name.to_owned()))
    }

    fn list_shape(&self, list: &str) -> Result<&'static ListShape, DraftError> {
        self.attribute(list)?
            .list
            .as_ref()
            .ok_or_else(|| DraftError::NotAList(list.to_owned()))
    }

    fn rows_mut(&mut self, list: &str) -> Result<&mut Vec<Row>, DraftError> {
        match self.fields.get_mut(list) {
            Some(FieldValue::List(rows)) => Ok(rows),
            _ => Err(DraftError::NotAList(list.to_owned())),
        }
    }

    fn refresh_derived(&mut self) {
        for attribute in &self.content_type.attributes {
            let Some(source) = &attribute.read_time_from else {
                continue;
            };
            let minutes = self.text(source.as_ref()).map_or(0, estimate_read_time);
            self.fields
                .insert(attribute.id.to_string(), FieldValue::Integer(minutes));
        }
    }
}

fn expected_kind(attribute_type: AttributeType) -> &'static str {
    match attribute_type {
        AttributeType::Boolean => "boolean",
        AttributeType::Integer => "integer",
        AttributeType::List => "list",
        _ => "text",
    }
}

fn default_value(attribute: &Attribute) -> FieldValue {
    let default = attribute.default.as_ref();
    match attribute.attribute_type {
        AttributeType::Boolean => {
            FieldValue::Boolean(default.and_then(Value::as_bool).unwrap_or(false))
        }
        AttributeType::Integer => {
            FieldValue::Integer(default.and_then(Value::as_i64).unwrap_or(0))
        }
        AttributeType::List => FieldValue::List(template_rows(attribute.list.as_ref(), 0)),
        _ => FieldValue::Text(default.and_then(Value::as_str).unwrap_or_default().to_owned()),
    }
}

fn template_rows(shape: Option<&ListShape>, existing: usize) -> Vec<Row> {
    match shape {
        Some(shape) => {
            let missing = shape.initial_rows().saturating_sub(existing);
            iter::repeat_with(|| shape.template()).take(missing).collect()
        }
        None => Vec::new(),
    }
}

fn lookup<'r>(
    record: &'r Value,
    attribute: &Attribute,
    accept: impl Fn(&Value) -> bool,
) -> Option<&'r Value> {
    let snake_case = attribute.id.snake_case();
    iter::once(attribute.id.as_ref())
        .chain(iter::once(snake_case.as_str()))
        .chain(attribute.aliases.iter().map(String::as_str))
        .filter_map(|key| record.get(key))
        .find(|value| accept(value))
}

fn hydrate_value(attribute: &Attribute, record: &Value) -> FieldValue {
    let non_empty = |value: &Value| match value {
        Value::String(text) => !text.is_empty(),
        Value::Number(_) => true,
        Value::Array(items) => !items.is_empty(),
        _ => false,
    };
    let present = |value: &Value| !value.is_null();

    match attribute.attribute_type {
        AttributeType::Text | AttributeType::RichText => {
            let text = match lookup(record, attribute, non_empty) {
                Some(Value::String(text)) => text.clone(),
                Some(Value::Number(number)) => number.to_string(),
                _ => String::new(),
            };
            FieldValue::Text(text)
        }
        AttributeType::Date => {
            let text = match lookup(record, attribute, non_empty) {
                Some(Value::String(text)) => text.chars().take(10).collect(),
                _ => String::new(),
            };
            FieldValue::Text(text)
        }
        AttributeType::Tags => {
            let text = match lookup(record, attribute, non_empty) {
                Some(Value::String(text)) => text.clone(),
                Some(Value::Array(items)) => {
                    let tags = items.iter().filter_map(Value::as_str).collect::<Vec<_>>();
                    join_delimited(&tags)
                }
                _ => String::new(),
            };
            FieldValue::Text(text)
        }
        AttributeType::Boolean => match lookup(record, attribute, Value::is_boolean) {
            Some(Value::Bool(flag)) => FieldValue::Boolean(*flag),
            _ => default_value(attribute),
        },
        AttributeType::Integer => {
            let number = lookup(record, attribute, present).and_then(|value| match value {
                Value::Number(number) => number
                    .as_i64()
                    .or_else(|| number.as_f64().map(|float| float.round() as i64)),
                Value::String(text) => text.trim().parse().ok(),
                _ => None,
            });
            number.map_or_else(|| default_value(attribute), FieldValue::Integer)
        }
        AttributeType::List => {
            let shape = attribute.list.as_ref();
            let mut rows = match lookup(record, attribute, non_empty) {
                Some(Value::Array(items)) => items
                    .iter()
                    .map(|item| merge_over_template(shape, item))
                    .collect(),
                _ => Vec::new(),
            };
            let padding = template_rows(shape, rows.len());
            rows.extend(padding);
            FieldValue::List(rows)
        }
    }
}

fn merge_over_template(shape: Option<&ListShape>, item: &Value) -> Row {
    let mut row = shape.map(ListShape::template).unwrap_or_default();
    if let Value::Object(cells) = item {
        for (cell, value) in cells {
            row.insert(cell.clone(), value.clone());
        }
    }
    row
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::test_utils::{blogs, case_studies};

    #[test]
    fn new_draft_has_defaults_and_template_rows() {
        let draft = Draft::new(case_studies());

        assert_eq!(draft.text("heroTitle"), Some(""));
        assert_eq!(draft.get("showLikes"), Some(&FieldValue::Boolean(true)));
        assert_eq!(draft.get("featured"), Some(&FieldValue::Boolean(false)));

        let metrics = draft.rows("metrics").unwrap();
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0], json!({"label": "", "value": "", "order": ""}).as_object().unwrap().clone());
    }

    #[test]
    fn set_field_checks_names_and_kinds() {
        let mut draft = Draft::new(case_studies());

        draft.set_field("heroTitle", "Grid resilience").unwrap();
        assert_eq!(draft.text("heroTitle"), Some("Grid resilience"));

        assert_eq!(
            draft.set_field("nope", "x"),
            Err(DraftError::UnknownField("nope".into()))
        );
        assert!(matches!(
            draft.set_field("featured", "yes"),
            Err(DraftError::TypeMismatch { expected: "boolean", .. })
        ));
        assert!(matches!(
            draft.set_field("metrics", "x"),
            Err(DraftError::TypeMismatch { expected: "list", .. })
        ));
    }

    #[test]
    fn list_rows_can_be_edited_added_and_removed() {
        let mut draft = Draft::new(case_studies());

        draft.set_list_item("metrics", 0, "label", "Uptime").unwrap();
        let index = draft.add_list_row("metrics").unwrap();
        assert_eq!(index, 1);
        draft.set_list_item("metrics", 1, "value", "99.9%").unwrap();

        let rows = draft.rows("metrics").unwrap();
        assert_eq!(rows[0]["label"], json!("Uptime"));
        assert_eq!(rows[1]["label"], json!(""));
        assert_eq!(rows[1]["value"], json!("99.9%"));

        let removed = draft.remove_list_row("metrics", 0).unwrap();
        assert_eq!(removed["label"], json!("Uptime"));
        assert_eq!(draft.rows("metrics").unwrap().len(), 1);
    }

    #[test]
    fn list_errors_are_reported_not_panicked() {
        let mut draft = Draft::new(case_studies());

        assert_eq!(
            draft.set_list_item("metrics", 3, "label", "x"),
            Err(DraftError::RowOutOfRange { list: "metrics".into(), index: 3 })
        );
        assert_eq!(
            draft.set_list_item("metrics", 0, "colour", "x"),
            Err(DraftError::UnknownCell { list: "metrics".into(), cell: "colour".into() })
        );
        assert_eq!(
            draft.add_list_row("heroTitle"),
            Err(DraftError::NotAList("heroTitle".into()))
        );
    }

    #[test]
    fn last_row_cannot_be_removed() {
        let mut draft = Draft::new(case_studies());
        assert_eq!(
            draft.remove_list_row("metrics", 0),
            Err(DraftError::MinimumRows { list: "metrics".into(), min_rows: 1 })
        );
        assert_eq!(draft.rows("metrics").unwrap().len(), 1);
    }

    #[test]
    fn validation_requires_non_blank_text() {
        let mut draft = Draft::new(case_studies());
        assert_eq!(
            draft.validate(),
            Err(ValidationError::MissingFields(vec!["heroTitle".into(), "heroSubtitle".into()]))
        );

        draft.set_field("heroTitle", "T").unwrap();
        draft.set_field("heroSubtitle", "   ").unwrap();
        assert_eq!(
            draft.validate().unwrap_err().to_string(),
            "Please provide heroSubtitle."
        );

        draft.set_field("heroSubtitle", "S").unwrap();
        assert!(draft.is_valid());
    }

    #[test]
    fn hydrates_camel_snake_and_alias_keys() {
        let record = json!({
            "hero_title": "From snake",
            "heroSubtitle": "",
            "hero_subtitle": "Fallback",
            "publishedDate": "2024-03-05T10:00:00.000Z",
            "show_likes": false,
            "metrics_json": [{"label": "Uptime", "order": 1}],
            "challengeCards": [],
        });
        let draft = Draft::from_record(case_studies(), &record);

        assert_eq!(draft.text("heroTitle"), Some("From snake"));
        assert_eq!(draft.text("heroSubtitle"), Some("Fallback"));
        assert_eq!(draft.text("publishedDate"), Some("2024-03-05"));
        assert_eq!(draft.get("showLikes"), Some(&FieldValue::Boolean(false)));
        assert_eq!(draft.get("featured"), Some(&FieldValue::Boolean(false)));

        let metrics = draft.rows("metrics").unwrap();
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0]["label"], json!("Uptime"));
        assert_eq!(metrics[0]["value"], json!(""));
        assert_eq!(metrics[0]["order"], json!(1));

        assert_eq!(draft.rows("challengeCards").unwrap().len(), 1);
    }

    #[test]
    fn missing_boolean_uses_default() {
        let draft = Draft::from_record(case_studies(), &json!({"showLikes": null}));
        assert_eq!(draft.get("showLikes"), Some(&FieldValue::Boolean(true)));
    }

    #[test]
    fn read_time_follows_content() {
        let mut draft = Draft::new(blogs());
        assert_eq!(draft.get("readTime"), Some(&FieldValue::Integer(0)));

        let content = format!("<p>{}</p>", "word ".repeat(250));
        draft.set_field("content", content).unwrap();
        assert_eq!(draft.get("readTime"), Some(&FieldValue::Integer(2)));
    }

    #[test]
    fn content_stats_count_words_and_images() {
        let mut draft = Draft::new(blogs());
        draft
            .set_field("content", "<p>Grid <img src=\"a.png\"> upgrade</p>")
            .unwrap();
        draft.set_field("imageUrls", "x.png, y.png").unwrap();

        assert_eq!(
            draft.content_stats(),
            Some(ContentStats {
                words: 2,
                images: 3,
                read_minutes: 1
            })
        );
        assert_eq!(Draft::new(case_studies()).content_stats(), None);
    }

    #[test]
    fn slug_uses_first_non_empty_source() {
        let mut draft = Draft::new(blogs());
        assert_eq!(draft.generate_slug("slug"), Ok(false));

        draft.set_field("metaTitle", "Meta Only").unwrap();
        assert_eq!(draft.generate_slug("slug"), Ok(true));
        assert_eq!(draft.text("slug"), Some("meta-only"));

        draft.set_field("title", "Grid 2.0 Launch").unwrap();
        draft.generate_slug("slug").unwrap();
        assert_eq!(draft.text("slug"), Some("grid-20-launch"));

        assert_eq!(
            draft.generate_slug("title"),
            Err(DraftError::NoSlugSource("title".into()))
        );
    }

    #[test]
    fn tags_hydrate_from_arrays() {
        let draft = Draft::from_record(blogs(), &json!({"tags": ["grid", "energy"], "keywords": "a, b"}));
        assert_eq!(draft.text("tags"), Some("grid,energy"));
        assert_eq!(draft.text("keywords"), Some("a, b"));
    }
}
