use crate::domain::ContentTypeId;
use crate::domain::content_types::ContentType;
use crate::infrastructure::content_types::{builtin, parse};

/// Fixtures over the built-in schemas.
///
/// Public so that other crates can reuse them for their own tests.
pub fn content_type(id: &str) -> &'static ContentType {
    builtin()
        .unwrap()
        .get(&ContentTypeId::try_new(id).unwrap())
        .unwrap()
}

pub fn blogs() -> &'static ContentType {
    content_type("blogs")
}

pub fn services() -> &'static ContentType {
    content_type("services")
}

pub fn case_studies() -> &'static ContentType {
    content_type("case-studies")
}

/// Helper for building a leaked `ContentType` from an inline JSON schema.
pub fn make_type(id: &str, schema: &str) -> &'static ContentType {
    parse(id, schema).unwrap()
}
