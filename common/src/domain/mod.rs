use std::fmt::Debug;
use std::sync::LazyLock;
use nutype::nutype;
use regex::Regex;
use crate::domain::content_types::ContentType;

pub mod content_types;
pub mod draft;
pub mod identity;
pub mod payload;
pub mod text;

pub trait ContentTypes: Send + Sync + Debug + 'static {
    /// iterate all content types metadata
    fn iterate(&self) -> Box<dyn Iterator<Item = &'static ContentType> + '_>;
    /// find content type metadata by its id
    fn get(&self, id: &ContentTypeId) -> Option<&'static ContentType>;
}

// Collection ids are used verbatim as REST path segments: "case-studies", "blogs".
pub const COLLECTION_ID_REGEX: &str = r"^[a-z0-9][a-z0-9-]*$";

static COLLECTION_ID_REGEX_COMPILED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(COLLECTION_ID_REGEX).expect("COLLECTION_ID_REGEX must be a valid regex")
});

// Attribute names are the camelCase keys of the JSON payload: "heroTitle", "tableOfContents".
pub const ATTRIBUTE_NAME_REGEX: &str = r"^[A-Za-z][A-Za-z0-9_]*$";

static ATTRIBUTE_NAME_REGEX_COMPILED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(ATTRIBUTE_NAME_REGEX).expect("ATTRIBUTE_NAME_REGEX must be a valid regex")
});

pub fn is_collection_id(id: &str) -> bool {
    COLLECTION_ID_REGEX_COMPILED.is_match(id)
}

pub fn is_attribute_name(name: &str) -> bool {
    ATTRIBUTE_NAME_REGEX_COMPILED.is_match(name)
}

#[nutype(
    sanitize(trim, lowercase),
    validate(not_empty, len_char_max = 40, predicate = is_collection_id),
    derive(
        Clone,
        Debug,
        Display,
        FromStr,
        AsRef,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        Serialize
    )
)]
pub struct ContentTypeId(String);

#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 64, predicate = is_attribute_name),
    derive(
        Clone,
        Debug,
        Display,
        FromStr,
        AsRef,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        Serialize,
        Deserialize
    )
)]
pub struct AttributeId(String);

impl AttributeId {
    /// The snake_case spelling older endpoints use for the same field.
    pub fn snake_case(&self) -> String {
        to_snake_case(self.as_ref())
    }
}

pub fn to_snake_case(name: &str) -> String {
    let mut result = String::with_capacity(name.len() + 4);
    for ch in name.chars() {
        if ch.is_ascii_uppercase() {
            if !result.is_empty() {
                result.push('_');
            }
            result.push(ch.to_ascii_lowercase());
        } else {
            result.push(ch);
        }
    }
    result
}
