use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::IdType;
use crate::models::ExternalDocs;

/// The shape a registered service exposes to the documentation generator:
/// which methods it implements, how its resources are identified, and any
/// declarative doc overrides.
///
/// The generator never mutates a descriptor; per-method overrides are
/// consumed from a scratch copy.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct ServiceDescriptor {
    pub id: IdField,
    pub id_separator: Option<String>,
    pub methods: BTreeSet<String>,
    pub multi: MultiCapability,
    pub docs: Option<DocOptions>,
    pub custom: Vec<CustomMethod>,
}

impl ServiceDescriptor {
    /// Descriptor exposing the given methods and nothing else.
    pub fn with_methods(methods: &[&str]) -> Self {
        Self {
            methods: methods.iter().map(|method| method.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn implements(&self, method: &str) -> bool {
        self.methods.contains(method)
    }

    pub fn id_names(&self) -> Vec<String> {
        self.id.names()
    }

    pub fn id_separator(&self) -> &str {
        self.id_separator.as_deref().unwrap_or(",")
    }
}

/// Resource id specification: a single field or an ordered list for
/// composite ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdField {
    Single(String),
    Composite(Vec<String>),
}

impl Default for IdField {
    fn default() -> Self {
        Self::Single("id".to_string())
    }
}

impl IdField {
    pub fn names(&self) -> Vec<String> {
        match self {
            Self::Single(name) => vec![name.clone()],
            Self::Composite(names) => names.clone(),
        }
    }
}

/// Whether the service accepts multi-item calls for update/patch/remove.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MultiCapability {
    Flag(bool),
    Methods(Vec<String>),
}

impl Default for MultiCapability {
    fn default() -> Self {
        Self::Flag(false)
    }
}

impl MultiCapability {
    pub fn supports(&self, method: &str) -> bool {
        match self {
            Self::Flag(enabled) => *enabled,
            Self::Methods(methods) => methods.iter().any(|m| m == "all" || m == method),
        }
    }
}

/// Declarative per-service documentation overrides.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct DocOptions {
    pub description: Option<String>,
    pub tag: Option<String>,
    pub tags: Vec<String>,
    pub external_docs: Option<ExternalDocs>,
    pub model: Option<String>,
    pub model_name: Option<String>,
    pub id_type: Option<IdType>,
    /// Per-operation id name overrides, e.g. `{"get": "slug"}`.
    pub id_names: BTreeMap<String, String>,
    /// Operation names the root security requirement applies to, or `"all"`.
    pub securities: Vec<String>,
    /// Named schema refs per generated schema slot (`findResponse`, ...).
    pub refs: BTreeMap<String, SchemaRef>,
    pub definition: Option<Value>,
    pub definitions: Map<String, Value>,
    pub schema: Option<Value>,
    pub schemas: Map<String, Value>,
    /// Per-operation override objects, or `false` to suppress an operation.
    pub operations: BTreeMap<String, OperationOverride>,
    /// Base methods to document multi-item variants for.
    pub multi: Vec<String>,
    pub overwrite_tag_spec: bool,
}

/// Explicit per-registration options, taking precedence over whatever the
/// service itself declares.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServiceOptions {
    pub methods: Option<Vec<String>>,
    pub docs: Option<DocOptions>,
}

/// A named pointer to a schema, either plain or composed of several refs
/// (`oneOf`/`anyOf`/`allOf`, OpenAPI 3 only).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaRef {
    Name(String),
    Composite(CompositeRef),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeRef {
    pub refs: Vec<String>,
    #[serde(rename = "type")]
    pub kind: CompositeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompositeKind {
    #[serde(rename = "oneOf")]
    OneOf,
    #[serde(rename = "anyOf")]
    AnyOf,
    #[serde(rename = "allOf")]
    AllOf,
}

impl CompositeKind {
    pub fn key(self) -> &'static str {
        match self {
            Self::OneOf => "oneOf",
            Self::AnyOf => "anyOf",
            Self::AllOf => "allOf",
        }
    }
}

/// An override for one generated operation: a path-set mapping merged onto
/// the default, or `false` to drop the operation entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OperationOverride {
    Flag(bool),
    Patch(Map<String, Value>),
}

impl OperationOverride {
    pub fn is_disabled(&self) -> bool {
        matches!(self, Self::Flag(false))
    }

    pub fn patch(&self) -> Option<&Map<String, Value>> {
        match self {
            Self::Patch(map) => Some(map),
            Self::Flag(_) => None,
        }
    }
}

/// A non-CRUD method a service exposes at an extra HTTP verb and path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomMethod {
    pub method: String,
    pub http_method: String,
    #[serde(default)]
    pub path: String,
}

/// Discovers the custom HTTP operations of a service. Selected once at
/// start-up and injected into the generator; frameworks without a
/// custom-method mechanism use [`NoopRegistrar`].
pub trait CustomMethodRegistrar: Send + Sync {
    fn custom_methods(&self, service: &ServiceDescriptor, path: &str) -> Vec<CustomMethod>;
}

/// Registrar for frameworks without custom-method support: discovers nothing.
pub struct NoopRegistrar;

impl CustomMethodRegistrar for NoopRegistrar {
    fn custom_methods(&self, _service: &ServiceDescriptor, _path: &str) -> Vec<CustomMethod> {
        Vec::new()
    }
}

/// Registrar reading the custom operations the descriptor itself declares.
pub struct DeclaredRegistrar;

impl CustomMethodRegistrar for DeclaredRegistrar {
    fn custom_methods(&self, service: &ServiceDescriptor, _path: &str) -> Vec<CustomMethod> {
        service.custom.clone()
    }
}
