use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use luminair_common::identity::{RemoteId, record_key};
use serde_json::Value;

/// Renders one cell from the field value and the whole row.
pub type Render = Arc<dyn Fn(&Value, &Value) -> String + Send + Sync>;

#[derive(Clone)]
pub struct Column {
    pub key: String,
    pub title: String,
    pub width: Option<String>,
    render: Option<Render>,
}

/// Where the host saw a pointer-down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointerTarget {
    /// inside the action menu of the row with this key
    Menu(String),
    Elsewhere,
}

/// Interactions reported back to the owner of the rows, which are never
/// modified by the table itself.
#[derive(Debug, Clone, PartialEq)]
pub enum TableEvent {
    SelectionChanged(Vec<String>),
    RowClicked(Value),
    Edit(Value),
    Delete(Value),
}

/// Selection and row-menu state of a table of JSON records.
#[derive(Debug, Clone, Default)]
pub struct DataTable {
    columns: Vec<Column>,
    /// record field holding the row key, `id` then `_id` when unset
    key_field: Option<String>,
    rows: Vec<Value>,
    selected: BTreeSet<String>,
    open_menu: Option<String>,
}

impl Column {
    pub fn new(key: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            width: None,
            render: None,
        }
    }

    pub fn width(mut self, width: impl Into<String>) -> Self {
        self.width = Some(width.into());
        self
    }

    pub fn render(mut self, render: impl Fn(&Value, &Value) -> String + Send + Sync + 'static) -> Self {
        self.render = Some(Arc::new(render));
        self
    }
}

impl fmt::Debug for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("key", &self.key)
            .field("title", &self.title)
            .field("width", &self.width)
            .field("render", &self.render.is_some())
            .finish()
    }
}

impl DataTable {
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            ..Self::default()
        }
    }

    pub fn with_key_field(mut self, key_field: impl Into<String>) -> Self {
        self.key_field = Some(key_field.into());
        self
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn rows(&self) -> &[Value] {
        &self.rows
    }

    /// Replaces the rows, selection and open menu only keep rows still present.
    pub fn set_rows(&mut self, rows: Vec<Value>) {
        let keyless = rows.iter().filter(|row| self.row_key(row).is_none()).count();
        if keyless > 0 {
            tracing::warn!("{} row(s) have no key and cannot be selected", keyless);
        }
        self.rows = rows;
        self.retain_rows();
    }

    pub fn row_key(&self, row: &Value) -> Option<String> {
        let id = match &self.key_field {
            Some(field) => row.get(field).and_then(RemoteId::from_value),
            None => record_key(row),
        };
        id.map(|id| id.to_string())
    }

    pub fn row(&self, key: &str) -> Option<&Value> {
        self.rows
            .iter()
            .find(|row| self.row_key(row).as_deref() == Some(key))
    }

    // selection

    pub fn selected(&self) -> Vec<String> {
        self.selected.iter().cloned().collect()
    }

    pub fn is_selected(&self, key: &str) -> bool {
        self.selected.contains(key)
    }

    /// True iff there are rows and every one of them is selected.
    /// A row without a key can never be selected, so it keeps this false.
    pub fn all_selected(&self) -> bool {
        !self.rows.is_empty()
            && self.rows.iter().all(|row| {
                self.row_key(row)
                    .is_some_and(|key| self.selected.contains(&key))
            })
    }

    pub fn toggle_row(&mut self, key: &str) -> Option<TableEvent> {
        self.row(key)?;
        if !self.selected.remove(key) {
            self.selected.insert(key.to_owned());
        }
        Some(self.selection_changed())
    }

    pub fn toggle_select_all(&mut self) -> TableEvent {
        if self.all_selected() {
            self.selected.clear();
        } else {
            self.selected = self.keys().into_iter().collect();
        }
        self.selection_changed()
    }

    /// Drops selected keys and the open menu of rows that are gone.
    pub fn retain_rows(&mut self) {
        let keys = self.keys().into_iter().collect::<BTreeSet<_>>();
        self.selected.retain(|key| keys.contains(key));
        if self.open_menu.as_ref().is_some_and(|key| !keys.contains(key)) {
            self.open_menu = None;
        }
    }

    // row menu

    pub fn open_menu(&self) -> Option<&str> {
        self.open_menu.as_deref()
    }

    /// Opens the menu of a row, closing any other, or closes it when already open.
    pub fn toggle_menu(&mut self, key: &str) {
        if self.open_menu.as_deref() == Some(key) {
            self.open_menu = None;
        } else if self.row(key).is_some() {
            self.open_menu = Some(key.to_owned());
        }
    }

    /// Returns true when the pointer-down closed the open menu.
    pub fn pointer_down(&mut self, target: &PointerTarget) -> bool {
        match (&self.open_menu, target) {
            (Some(open), PointerTarget::Menu(key)) if open == key => false,
            (Some(_), _) => {
                self.open_menu = None;
                true
            }
            (None, _) => false,
        }
    }

    pub fn click_row(&self, key: &str) -> Option<TableEvent> {
        self.row(key).cloned().map(TableEvent::RowClicked)
    }

    pub fn edit(&mut self, key: &str) -> Option<TableEvent> {
        self.open_menu = None;
        self.row(key).cloned().map(TableEvent::Edit)
    }

    pub fn delete(&mut self, key: &str) -> Option<TableEvent> {
        self.open_menu = None;
        self.row(key).cloned().map(TableEvent::Delete)
    }

    // cells

    pub fn render_cell(&self, row: &Value, column: &Column) -> String {
        let value = row.get(&column.key).unwrap_or(&Value::Null);
        match &column.render {
            Some(render) => render(value, row),
            None => display_value(value),
        }
    }

    /// Every cell of every row, in column order.
    pub fn render(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .map(|column| self.render_cell(row, column))
                    .collect()
            })
            .collect()
    }

    fn keys(&self) -> Vec<String> {
        self.rows.iter().filter_map(|row| self.row_key(row)).collect()
    }

    fn selection_changed(&self) -> TableEvent {
        TableEvent::SelectionChanged(self.selected())
    }
}

/// Objects and arrays as JSON text, falsy values as an empty string.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null | Value::Bool(false) => String::new(),
        Value::Bool(true) => "true".to_owned(),
        Value::Number(number) if number.as_f64() == Some(0.0) => String::new(),
        Value::Number(number) => number.to_string(),
        Value::String(text) => text.clone(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}
