use nutype::nutype;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{AttributeId, ContentTypeId};

/// A ContentType defines the structure of one editable collection
/// Example: a Case Study with its hero section, metrics list and contact cards
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentType {
    pub id: ContentTypeId,
    pub info: ContentTypeInfo,
    /// fields that must be non-blank before anything is sent to the server
    pub required: Vec<AttributeId>,
    pub attributes: Vec<Attribute>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentTypeInfo {
    pub title: ContentTitle,
    /// key under which some endpoints wrap a single record, e.g. `caseStudy`
    pub singular_name: AttributeId,
    pub plural_name: ContentTypeId,
}

#[nutype(
    sanitize(trim),
    validate(not_empty),
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
pub struct ContentTitle(String);

/// One field of a content type.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
    pub id: AttributeId,
    pub attribute_type: AttributeType,
    /// empty text is sent as `null`
    pub nullable: bool,
    pub default: Option<Value>,
    /// extra record keys accepted when hydrating from the server
    pub aliases: Vec<String>,
    /// integer field derived from the word count of a rich text field
    pub read_time_from: Option<AttributeId>,
    /// candidate sources for slug generation, first non-empty wins
    pub slug_from: Vec<AttributeId>,
    pub list: Option<ListShape>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttributeType {
    Text,
    RichText,
    /// `YYYY-MM-DD`
    Date,
    Boolean,
    Integer,
    /// comma separated while editing, an array in the payload
    Tags,
    /// ordered rows of string cells
    List,
}

/// Shape of the rows of a list attribute.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListShape {
    /// every row carries exactly these cells, in this order
    pub fields: Vec<String>,
    /// a row survives payload sanitizing iff one of these cells is non-empty
    pub meaningful: Vec<String>,
    pub min_rows: usize,
}

// implementations

impl ContentType {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|attribute| attribute.id.as_ref() == name)
    }

    pub fn singular_name(&self) -> &str {
        self.info.singular_name.as_ref()
    }

    pub fn title(&self) -> &str {
        self.info.title.as_ref()
    }
}

impl PartialEq for ContentType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for ContentType {}

impl Attribute {
    pub fn is_list(&self) -> bool {
        self.attribute_type == AttributeType::List
    }
}

impl ListShape {
    /// A blank row with every cell present.
    pub fn template(&self) -> serde_json::Map<String, Value> {
        self.fields
            .iter()
            .map(|field| (field.clone(), Value::String(String::new())))
            .collect()
    }

    pub fn initial_rows(&self) -> usize {
        self.min_rows.max(1)
    }
}

impl PartialEq for Attribute {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for Attribute {}
