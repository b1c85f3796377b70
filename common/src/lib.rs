mod domain;
mod infrastructure;

pub mod test_utils;

// Record field names understood by the content API

pub const ID_FIELD_NAME: &str = "id";
pub const OBJECT_ID_FIELD_NAME: &str = "_id";
pub const DATA_FIELD_NAME: &str = "data";
pub const TITLE_FIELD_NAME: &str = "title";

// expose domain module

pub use domain::*;
pub use infrastructure::content_types::{builtin as builtin_content_types, load as load_content_types, parse as parse_content_type};
