use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use luminair_common::content_types::ContentType;
use luminair_common::identity::{RemoteId, record_key};
use luminair_common::{ID_FIELD_NAME, TITLE_FIELD_NAME};
use serde_json::{Map, Value, json};

use crate::domain::error::ApiError;
use crate::domain::table::{Column, DataTable};
use crate::domain::{Collection, ContentApi, unwrap_list};

/// Field keeping the record as fetched inside a formatted row.
pub const RAW_FIELD_NAME: &str = "raw";

/// Asks the user before something destructive happens.
pub trait ConfirmationPrompt {
    fn confirm(&self, message: &str) -> bool;
}

/// Prompt answering yes to everything, for `--yes` style flags.
#[derive(Debug, Clone, Copy)]
pub struct AlwaysConfirm;

impl ConfirmationPrompt for AlwaysConfirm {
    fn confirm(&self, _message: &str) -> bool {
        true
    }
}

/// List view of one collection: its table plus the load and delete flows.
pub struct CollectionPage<A: ContentApi> {
    collection: Collection<A>,
    content_type: &'static ContentType,
    table: DataTable,
    loading: bool,
    error: Option<String>,
    message: Option<String>,
    deleting: BTreeSet<String>,
}

impl<A: ContentApi> CollectionPage<A> {
    pub fn new(api: A, content_type: &'static ContentType) -> Self {
        Self {
            collection: Collection::new(api, content_type.id.clone()),
            content_type,
            table: DataTable::new(default_columns(content_type)),
            loading: false,
            error: None,
            message: None,
            deleting: BTreeSet::new(),
        }
    }

    pub fn table(&self) -> &DataTable {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut DataTable {
        &mut self.table
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn is_deleting(&self, key: &str) -> bool {
        self.deleting.contains(key)
    }

    /// Fetches the collection, a failure leaves an empty table and an error message.
    pub async fn load(&mut self) -> Result<(), ApiError> {
        self.loading = true;
        self.error = None;
        let result = self.collection.list().await;
        self.loading = false;

        match result {
            Ok(response) => {
                let rows = unwrap_list(response)
                    .into_iter()
                    .map(|record| format_row(self.content_type, record))
                    .collect();
                self.table.set_rows(rows);
                Ok(())
            }
            Err(error) => {
                tracing::error!("failed to load {}: {}", self.content_type.id, error);
                self.error = Some(error.to_string());
                self.table.set_rows(Vec::new());
                Err(error)
            }
        }
    }

    /// Deletes one row after confirmation. Returns false when nothing was deleted.
    pub async fn delete(
        &mut self,
        key: &str,
        prompt: &impl ConfirmationPrompt,
    ) -> Result<bool, ApiError> {
        let Some(row) = self.table.row(key) else {
            return Ok(false);
        };
        let question = format!("Are you sure you want to delete \"{}\"?", self.display_title(row));
        let id = row
            .get(RAW_FIELD_NAME)
            .and_then(record_key)
            .unwrap_or_else(|| RemoteId::from(key));
        if !prompt.confirm(&question) {
            return Ok(false);
        }

        self.deleting.insert(key.to_owned());
        let result = self.collection.remove(&id).await;
        self.deleting.remove(key);

        match result {
            Ok(_) => {
                let rows = self
                    .table
                    .rows()
                    .iter()
                    .filter(|row| self.table.row_key(row).as_deref() != Some(key))
                    .cloned()
                    .collect();
                self.table.set_rows(rows);
                self.message = Some(format!("{} deleted successfully.", self.content_type.title()));
                tracing::info!("deleted {} record {}", self.content_type.id, id);
                Ok(true)
            }
            Err(error) => {
                self.error = Some(error.to_string());
                Err(error)
            }
        }
    }

    fn display_title(&self, row: &Value) -> String {
        row_title(row).unwrap_or_else(|| format!("this {}", self.content_type.title().to_lowercase()))
    }
}

/// Columns shown for a collection: blogs get their dashboard layout, other
/// collections show their hero title.
pub fn default_columns(content_type: &ContentType) -> Vec<Column> {
    if is_blog(content_type) {
        return vec![
            Column::new("thumbnail", "").width("80px"),
            Column::new("info", "Title").render(|_, row| {
                format!("{} ({})", text(row, TITLE_FIELD_NAME), text(row, "duration"))
            }),
            Column::new("author", "Author"),
            Column::new("publishedOn", "Date"),
            Column::new("status", "Status").render(|_, row| text(row, "statusLabel").to_owned()),
        ];
    }

    let mut columns = vec![Column::new(title_field(content_type), "Title")];
    for field in ["heroSubtitle", "category", "publishedDate"] {
        if let Some(attribute) = content_type.attribute(field) {
            columns.push(Column::new(attribute.id.to_string(), label(field)));
        }
    }
    columns
}

/// Row of the list view for one fetched record.
///
/// The fetched record is kept under [`RAW_FIELD_NAME`], the key field is copied
/// to `id` so that `_id` keyed records work with the table.
pub fn format_row(content_type: &ContentType, record: Value) -> Value {
    let id = record_key(&record).map(|id| id.to_value()).unwrap_or(Value::Null);
    if is_blog(content_type) {
        return format_blog(id, record);
    }

    let mut row = match &record {
        Value::Object(fields) => fields.clone(),
        _ => Map::new(),
    };
    row.insert(ID_FIELD_NAME.to_owned(), id);
    row.insert(RAW_FIELD_NAME.to_owned(), record);
    Value::Object(row)
}

const FALLBACK_THUMBNAIL: &str =
    "https://images.unsplash.com/photo-1487412720507-e7ab37603c6f?auto=format&fit=crop&w=160&h=100&q=60";
const FALLBACK_AVATAR: &str = "https://i.pravatar.cc/48?img=7";

fn format_blog(id: Value, blog: Value) -> Value {
    let thumbnail = blog
        .get("imageUrls")
        .and_then(Value::as_array)
        .and_then(|urls| urls.first())
        .and_then(Value::as_str)
        .unwrap_or(FALLBACK_THUMBNAIL);
    let read_minutes = ["readTime", "read_time_minutes"]
        .iter()
        .find_map(|key| blog.get(key).and_then(Value::as_i64).filter(|minutes| *minutes != 0))
        .unwrap_or(0);
    let duration = if read_minutes > 0 {
        format!("{read_minutes:02}:00")
    } else {
        "—".to_owned()
    };
    let published = ["publishedAt", "published_at"]
        .iter()
        .find_map(|key| blog.get(key).and_then(Value::as_str).filter(|date| !date.is_empty()));
    let status = blog_status(&blog, published.is_some());

    json!({
        "id": id,
        "title": non_empty(&blog, TITLE_FIELD_NAME).unwrap_or("Untitled"),
        "duration": duration,
        "author": non_empty(&blog, "authorName").unwrap_or("Unknown Author"),
        "authorAvatar": non_empty(&blog, "authorImage").unwrap_or(FALLBACK_AVATAR),
        "publishedOn": published.map_or_else(|| "Not scheduled".to_owned(), format_date),
        "statusLabel": status_label(&status),
        "status": status,
        "thumbnail": thumbnail,
        "raw": blog,
    })
}

/// `status` of the record, else `public` when it has a publish date, else `draft`.
pub fn blog_status(blog: &Value, has_publish_date: bool) -> String {
    match non_empty(blog, "status") {
        Some(status) => status.to_owned(),
        None if has_publish_date => "public".to_owned(),
        None => "draft".to_owned(),
    }
}

pub fn status_label(status: &str) -> &'static str {
    match status {
        "public" => "Published",
        "private" => "Private",
        _ => "Draft",
    }
}

/// `Mar 5, 2024` for an RFC 3339 timestamp or a plain date, the input otherwise.
pub fn format_date(raw: &str) -> String {
    let date = DateTime::parse_from_rfc3339(raw)
        .map(|timestamp| timestamp.date_naive())
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map(|t| t.date()))
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"));

    match date {
        Ok(date) => date.format("%b %-d, %Y").to_string(),
        Err(_) => {
            tracing::warn!("unexpected date format: {}", raw);
            raw.to_owned()
        }
    }
}

fn is_blog(content_type: &ContentType) -> bool {
    content_type.id.as_ref() == "blogs"
}

fn title_field(content_type: &ContentType) -> &'static str {
    if content_type.attribute(TITLE_FIELD_NAME).is_some() {
        TITLE_FIELD_NAME
    } else {
        "heroTitle"
    }
}

fn row_title(row: &Value) -> Option<String> {
    [TITLE_FIELD_NAME, "heroTitle"]
        .iter()
        .find_map(|key| non_empty(row, key))
        .map(String::from)
}

fn label(field: &str) -> &'static str {
    match field {
        "heroSubtitle" => "Subtitle",
        "category" => "Category",
        "publishedDate" => "Date",
        _ => "",
    }
}

fn non_empty<'v>(value: &'v Value, key: &str) -> Option<&'v str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
}

fn text<'v>(value: &'v Value, key: &str) -> &'v str {
    value.get(key).and_then(Value::as_str).unwrap_or_default()
}
