//! Per-repository import declarations (`.snyk.d/import.yaml`).

use super::project::Tag;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

/// Conventional location of the declaration inside a repository.
pub const IMPORT_DECLARATION_PATH: &str = ".snyk.d/import.yaml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ImportDeclaration {
    #[serde(default)]
    pub schema: Option<u32>,
    #[serde(flatten)]
    pub base: ImportFields,
    /// Overrides keyed by source-hosting instance name.
    #[serde(default)]
    pub instances: BTreeMap<String, ImportFields>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ImportFields {
    #[serde(rename = "orgName", default)]
    pub org_name: Option<String>,
    #[serde(rename = "integrationName", default)]
    pub integration_name: Option<String>,
    #[serde(default)]
    pub branches: Option<Vec<String>>,
    #[serde(default, deserialize_with = "deserialize_tags")]
    pub tags: Option<Vec<Tag>>,
}

impl ImportDeclaration {
    pub fn parse(content: &[u8]) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_slice(content)
    }

    /// Flattens the declaration for one instance; instance values win field by field.
    pub fn resolve(&self, instance: Option<&str>) -> ImportFields {
        let mut fields = self.base.clone();
        let Some(over) = instance.and_then(|name| self.instances.get(name)) else {
            return fields;
        };
        if over.org_name.is_some() {
            fields.org_name = over.org_name.clone();
        }
        if over.integration_name.is_some() {
            fields.integration_name = over.integration_name.clone();
        }
        if over.branches.is_some() {
            fields.branches = over.branches.clone();
        }
        if over.tags.is_some() {
            fields.tags = over.tags.clone();
        }
        fields
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TagsRepr {
    List(Vec<Tag>),
    Map(BTreeMap<String, serde_yaml::Value>),
}

fn deserialize_tags<'de, D>(deserializer: D) -> Result<Option<Vec<Tag>>, D::Error>
where
    D: Deserializer<'de>,
{
    let repr: Option<TagsRepr> = Option::deserialize(deserializer)?;
    Ok(repr.map(|repr| match repr {
        TagsRepr::List(tags) => tags,
        TagsRepr::Map(map) => {
            map.into_iter().map(|(key, value)| Tag::new(key, scalar_to_string(&value))).collect()
        }
    }))
}

fn scalar_to_string(value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Null => String::new(),
        other => serde_yaml::to_string(other).unwrap_or_default().trim().to_string(),
    }
}
