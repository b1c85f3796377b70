use std::{collections::BTreeMap, fs, path::Path, sync::{Arc, OnceLock}};

use anyhow::{anyhow, bail, Context};
use serde::Deserialize;
use serde_json::Value;

use crate::domain::content_types::{Attribute, AttributeType, ContentTitle, ContentType, ContentTypeInfo, ListShape};
use crate::domain::{AttributeId, ContentTypeId, ContentTypes};

// Schemas shipped with the admin, one file per collection.
const BUILTIN_SCHEMAS: [(&str, &str); 3] = [
    ("blogs", include_str!("../../schema/blogs.json")),
    ("services", include_str!("../../schema/services.json")),
    ("case-studies", include_str!("../../schema/case-studies.json")),
];

static BUILTIN_REGISTRY: OnceLock<Arc<dyn ContentTypes>> = OnceLock::new();
static LOADED_REGISTRY: OnceLock<Arc<dyn ContentTypes>> = OnceLock::new();

/// Registry of the schemas compiled into the binary.
pub fn builtin() -> Result<&'static dyn ContentTypes, anyhow::Error> {
    if let Some(registry) = BUILTIN_REGISTRY.get() {
        return Ok(registry.as_ref());
    }

    let mut types = BTreeMap::new();
    for (id, content) in BUILTIN_SCHEMAS {
        let content_type = parse(id, content)?;
        types.insert(content_type.id.clone(), content_type);
    }
    // a concurrent caller may have won the race, both registries are identical
    let _ = BUILTIN_REGISTRY.set(Arc::new(ContentTypesRegistry { types }));

    BUILTIN_REGISTRY
        .get()
        .map(|registry| registry.as_ref())
        .ok_or_else(|| anyhow!("built-in content types are not initialized"))
}

/// Loads every `*.json` schema of a directory, falling back to the built-in
/// schemas when no directory is configured.
pub fn load(schema_config_path: Option<&str>) -> Result<&'static dyn ContentTypes, anyhow::Error> {
    let Some(schema_config_path) = schema_config_path else {
        return builtin();
    };

    let loaded = ContentTypesRegistry::load(schema_config_path)?;
    LOADED_REGISTRY
        .set(Arc::new(loaded))
        .map_err(|_| anyhow!("content types are already loaded"))?;

    LOADED_REGISTRY
        .get()
        .map(|registry| registry.as_ref())
        .ok_or_else(|| anyhow!("content types are not initialized"))
}

/// Parses one schema; `id` is the collection id, usually the file stem.
pub fn parse(id: &str, content: &str) -> Result<&'static ContentType, anyhow::Error> {
    let record = serde_json::from_str::<ContentTypeRecord>(content)
        .with_context(|| format!("failed to parse JSON schema of '{}'", id))?;
    let content_type = ContentType::try_from((id, record))?;
    Ok(Box::leak(Box::new(content_type)))
}

#[derive(Debug)]
struct ContentTypesRegistry {
    types: BTreeMap<ContentTypeId, &'static ContentType>,
}

impl ContentTypes for ContentTypesRegistry {
    fn iterate(&self) -> Box<dyn Iterator<Item = &'static ContentType> + '_> {
        Box::new(self.types.values().copied())
    }

    fn get(&self, id: &ContentTypeId) -> Option<&'static ContentType> {
        self.types.get(id).copied()
    }
}

impl ContentTypesRegistry {
    fn load(schema_config_path: &str) -> Result<Self, anyhow::Error> {
        let dir_path = Path::new(schema_config_path);

        tracing::debug!("Loading content types from {}", dir_path.to_string_lossy());

        let entries = fs::read_dir(dir_path).with_context(|| {
            format!(
                "failed to read schema config directory: {}",
                dir_path.to_string_lossy()
            )
        })?;

        let mut types = BTreeMap::new();
        for entry_res in entries {
            let entry =
                entry_res.map_err(|e| anyhow!("failed to read a directory entry: {}", e))?;
            let path = entry.path();
            if path.is_file() && is_json(&path) {
                let content_type = load_content_type(&path)?;
                types.insert(content_type.id.clone(), content_type);
            }
        }

        if types.is_empty() {
            bail!("no content type schemas found in {}", dir_path.to_string_lossy());
        }

        Ok(Self { types })
    }
}

fn load_content_type(path: &Path) -> Result<&'static ContentType, anyhow::Error> {
    let path_str = path.to_string_lossy().into_owned();

    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read schema file '{}'", path_str))?;

    let id = path
        .file_stem()
        .and_then(|os_str| os_str.to_str())
        .ok_or_else(|| anyhow!("failed to get file stem for path '{}'", path_str))?;

    parse(id, &content)
}

fn is_json(path: &Path) -> bool {
    path.extension().map(|ext| ext == "json").unwrap_or(false)
}

// internal structs for Deserializing

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContentTypeRecord {
    info: ContentTypeInfoRecord,
    #[serde(default)]
    required: Vec<String>,
    attributes: BTreeMap<String, AttributeRecord>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContentTypeInfoRecord {
    title: String,
    singular_name: String,
    plural_name: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AttributeRecord {
    #[serde(alias = "type")]
    attribute_type: AttributeType,
    #[serde(default)]
    nullable: bool,
    default: Option<Value>,
    #[serde(default)]
    aliases: Vec<String>,
    read_time_from: Option<String>,
    #[serde(default)]
    slug_from: Vec<String>,
    #[serde(default)]
    fields: Vec<String>,
    #[serde(default)]
    meaningful: Vec<String>,
    min_rows: Option<usize>,
}

// conversion into content type model

impl TryFrom<(&str, ContentTypeRecord)> for ContentType {
    type Error = anyhow::Error;

    fn try_from(value: (&str, ContentTypeRecord)) -> Result<Self, Self::Error> {
        let id = ContentTypeId::try_new(value.0)?;
        let record = value.1;
        let info = ContentTypeInfo::try_from(&record.info)?;

        let mut attributes = Vec::with_capacity(record.attributes.len());
        for (name, attribute) in &record.attributes {
            let attribute = Attribute::try_from((name.as_str(), attribute))
                .with_context(|| format!("invalid attribute '{}' of '{}'", name, id))?;
            attributes.push(attribute);
        }

        let mut required = Vec::with_capacity(record.required.len());
        for name in &record.required {
            let attribute = attributes
                .iter()
                .find(|attribute| attribute.id.as_ref() == name.as_str())
                .ok_or_else(|| anyhow!("required field '{}' of '{}' is not an attribute", name, id))?;
            if !matches!(attribute.attribute_type, AttributeType::Text | AttributeType::RichText) {
                bail!("required field '{}' of '{}' must be text", name, id);
            }
            required.push(attribute.id.clone());
        }

        let content_type = Self {
            id,
            info,
            required,
            attributes,
        };
        check_references(&content_type)?;
        Ok(content_type)
    }
}

impl TryFrom<&ContentTypeInfoRecord> for ContentTypeInfo {
    type Error = anyhow::Error;

    fn try_from(value: &ContentTypeInfoRecord) -> Result<Self, Self::Error> {
        let title = ContentTitle::try_new(value.title.as_str())?;
        let singular_name = AttributeId::try_new(value.singular_name.as_str())?;
        let plural_name = ContentTypeId::try_new(value.plural_name.as_str())?;

        Ok(Self {
            title,
            singular_name,
            plural_name,
        })
    }
}

impl TryFrom<(&str, &AttributeRecord)> for Attribute {
    type Error = anyhow::Error;

    fn try_from(value: (&str, &AttributeRecord)) -> Result<Self, Self::Error> {
        let (name, record) = value;
        let id = AttributeId::try_new(name)?;

        let list = if record.attribute_type == AttributeType::List {
            if record.fields.is_empty() {
                bail!("list attribute must declare its fields");
            }
            if let Some(unknown) = record
                .meaningful
                .iter()
                .find(|cell| !record.fields.contains(cell))
            {
                bail!("meaningful cell '{}' is not a field of the list", unknown);
            }
            let meaningful = if record.meaningful.is_empty() {
                record.fields.clone()
            } else {
                record.meaningful.clone()
            };
            Some(ListShape {
                fields: record.fields.clone(),
                meaningful,
                min_rows: record.min_rows.unwrap_or(1),
            })
        } else {
            None
        };

        let read_time_from = record
            .read_time_from
            .as_deref()
            .map(|source| AttributeId::try_new(source))
            .transpose()?;
        let slug_from = record
            .slug_from
            .iter()
            .map(|source| AttributeId::try_new(source.as_str()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            id,
            attribute_type: record.attribute_type,
            nullable: record.nullable,
            default: record.default.clone(),
            aliases: record.aliases.clone(),
            read_time_from,
            slug_from,
            list,
        })
    }
}

// derived fields must point at attributes of the right kind
fn check_references(content_type: &ContentType) -> Result<(), anyhow::Error> {
    for attribute in &content_type.attributes {
        if let Some(source) = &attribute.read_time_from {
            if attribute.attribute_type != AttributeType::Integer {
                bail!("'{}' derives a read time but is not an integer", attribute.id);
            }
            match content_type.attribute(source.as_ref()) {
                Some(source) if source.attribute_type == AttributeType::RichText => {}
                _ => bail!("'{}' reads time from '{}' which is not rich text", attribute.id, source),
            }
        }
        for source in &attribute.slug_from {
            if content_type.attribute(source.as_ref()).is_none() {
                bail!("'{}' generates a slug from unknown field '{}'", attribute.id, source);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_has_three_collections() {
        let registry = builtin().unwrap();
        let ids = registry
            .iterate()
            .map(|content_type| content_type.id.to_string())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["blogs", "case-studies", "services"]);

        let case_studies = registry
            .get(&ContentTypeId::try_new("case-studies").unwrap())
            .unwrap();
        assert_eq!(case_studies.singular_name(), "caseStudy");
        assert_eq!(case_studies.required.len(), 2);
    }

    #[test]
    fn list_meaningful_cells_default_to_all_fields() {
        let content_type = parse(
            "notes",
            r#"{
                "info": {"title": "Notes", "singularName": "note", "pluralName": "notes"},
                "attributes": {
                    "title": {"type": "text"},
                    "links": {"type": "list", "fields": ["label", "url"], "minRows": 0}
                }
            }"#,
        )
        .unwrap();

        let shape = content_type.attribute("links").unwrap().list.as_ref().unwrap();
        assert_eq!(shape.meaningful, vec!["label", "url"]);
        assert_eq!(shape.min_rows, 0);
        assert_eq!(shape.initial_rows(), 1);
    }

    #[test]
    fn rejects_broken_schemas() {
        let unknown_required = r#"{
            "info": {"title": "X", "singularName": "x", "pluralName": "xs"},
            "required": ["missing"],
            "attributes": {"title": {"type": "text"}}
        }"#;
        assert!(parse("xs", unknown_required).is_err());

        let list_without_fields = r#"{
            "info": {"title": "X", "singularName": "x", "pluralName": "xs"},
            "attributes": {"rows": {"type": "list"}}
        }"#;
        assert!(parse("xs", list_without_fields).is_err());

        let bad_read_time = r#"{
            "info": {"title": "X", "singularName": "x", "pluralName": "xs"},
            "attributes": {"body": {"type": "text"}, "minutes": {"type": "integer", "readTimeFrom": "body"}}
        }"#;
        assert!(parse("xs", bad_read_time).is_err());

        assert!(parse("Bad Id", "{}").is_err());
    }
}
