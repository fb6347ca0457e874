#![allow(non_snake_case)]

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::assign;

/// The OpenAPI document being built for an application.
///
/// Version-specific containers are optional: Swagger 2.0 documents carry
/// `definitions` (plus `basePath`/`schemes`/`consumes`/`produces`), OpenAPI 3
/// documents carry `components`. Operations are kept as raw JSON trees so the
/// path-set override syntax applies to them uniformly; unknown top-level keys
/// supplied through `specs` overrides ride in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RootDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swagger: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openapi: Option<String>,
    pub info: Info,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub basePath: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub schemes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub consumes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub produces: Vec<String>,
    pub paths: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definitions: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Components>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub security: Vec<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RootDocument {
    /// The schema registry of the document, regardless of dialect.
    pub fn schemas(&self) -> Option<&Map<String, Value>> {
        match &self.components {
            Some(components) => Some(&components.schemas),
            None => self.definitions.as_ref(),
        }
    }

    pub fn schemas_mut(&mut self) -> &mut Map<String, Value> {
        match &mut self.components {
            Some(components) => &mut components.schemas,
            None => self.definitions.get_or_insert_with(Map::new),
        }
    }

    /// Looks up a single generated operation by route key and verb.
    pub fn operation(&self, route: &str, verb: &str) -> Option<&Value> {
        self.paths.get(route)?.get(verb)
    }

    /// Merges a user-supplied override mapping into the document using the
    /// path-set syntax.
    pub fn merge_overrides(&mut self, overrides: &Map<String, Value>) -> Result<(), serde_json::Error> {
        let mut tree = serde_json::to_value(&*self)?;
        assign::assign(&mut tree, std::slice::from_ref(overrides));
        *self = serde_json::from_value(tree)?;
        Ok(())
    }
}

/// Components object of an OpenAPI 3 document.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Components {
    pub schemas: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Information about the API.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Info {
    pub title: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Tag information for API operations; unique by name in the document.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Tag {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub externalDocs: Option<ExternalDocs>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Tag {
    /// Fills in fields the existing entry does not declare yet, keeping
    /// whatever an earlier service already provided.
    pub fn merge_missing(&mut self, other: &Tag) {
        if self.description.is_none() {
            self.description = other.description.clone();
        }
        if self.externalDocs.is_none() {
            self.externalDocs = other.externalDocs.clone();
        }
        for (key, value) in &other.extra {
            if !self.extra.contains_key(key) {
                self.extra.insert(key.clone(), value.clone());
            }
        }
    }
}

/// External documentation reference.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ExternalDocs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub url: String,
}
