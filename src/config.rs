use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::defaults::OperationGenerator;
use crate::service::{OperationOverride, ServiceDescriptor};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unsupported openApiVersion {0}! Allowed versions: 2, 3")]
    UnsupportedVersion(u8),
}

/// The OpenAPI dialect to emit. Anything but 2 or 3 is rejected before any
/// service is processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum OpenApiVersion {
    V2,
    V3,
}

impl Default for OpenApiVersion {
    fn default() -> Self {
        Self::V3
    }
}

impl TryFrom<u8> for OpenApiVersion {
    type Error = ConfigError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(Self::V2),
            3 => Ok(Self::V3),
            other => Err(ConfigError::UnsupportedVersion(other)),
        }
    }
}

impl From<OpenApiVersion> for u8 {
    fn from(version: OpenApiVersion) -> Self {
        match version {
            OpenApiVersion::V2 => 2,
            OpenApiVersion::V3 => 3,
        }
    }
}

/// A path to match or strip: a literal string or a regular expression.
#[derive(Debug, Clone)]
pub enum PathPattern {
    Literal(String),
    Pattern(Regex),
}

impl PathPattern {
    /// Removes the first occurrence of the pattern from `path`.
    pub fn strip(&self, path: &str) -> String {
        match self {
            Self::Literal(prefix) => path.replacen(prefix.as_str(), "", 1),
            Self::Pattern(re) => re.replace(path, "").into_owned(),
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Literal(literal) => literal == path,
            Self::Pattern(re) => re.is_match(path),
        }
    }
}

impl<'de> Deserialize<'de> for PathPattern {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Pattern { regex: String },
            Literal(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Literal(value) => Ok(Self::Literal(value)),
            Repr::Pattern { regex } => Regex::new(&regex)
                .map(Self::Pattern)
                .map_err(serde::de::Error::custom),
        }
    }
}

pub type FilterFn = Arc<dyn Fn(&ServiceDescriptor, &str) -> bool + Send + Sync>;

/// Matches services for include/ignore filtering by tag, path, or custom
/// predicate; the three matchers are OR'd. An empty filter matches nothing,
/// which for `include` means "no restriction".
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServiceFilter {
    pub tags: Vec<String>,
    pub paths: Vec<PathPattern>,
    #[serde(skip)]
    pub filter: Option<FilterFn>,
}

impl ServiceFilter {
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.paths.is_empty() && self.filter.is_none()
    }

    pub fn matches(&self, tag: &str, path: &str, service: &ServiceDescriptor) -> bool {
        self.tags.iter().any(|candidate| candidate == tag)
            || self.paths.iter().any(|pattern| pattern.matches(path))
            || self.filter.as_ref().is_some_and(|filter| filter(service, path))
    }
}

impl fmt::Debug for ServiceFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceFilter")
            .field("tags", &self.tags)
            .field("paths", &self.paths)
            .field("filter", &self.filter.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// Parameter type for generated id path parameters: one type for every id,
/// or positional types for composite ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdType {
    Single(String),
    Positional(Vec<String>),
}

impl Default for IdType {
    fn default() -> Self {
        Self::Single("integer".to_string())
    }
}

impl IdType {
    pub fn type_at(&self, position: usize) -> &str {
        match self {
            Self::Single(ty) => ty,
            Self::Positional(types) => types.get(position).map(String::as_str).unwrap_or("integer"),
        }
    }
}

pub type ListNameFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// The override layers applied on top of the built-in operation defaults.
#[derive(Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Defaults {
    /// Replacement default generators per operation name.
    #[serde(skip)]
    pub operation_generators: BTreeMap<String, OperationGenerator>,
    /// Override mappings (or `false`) applied to every service's operations.
    pub operations: BTreeMap<String, OperationOverride>,
    /// Base methods to document multi-item variants for, unless the service
    /// declares its own list.
    pub multi: Vec<String>,
    /// Naming scheme for the generated list schema, overriding the dialect
    /// default (`{model}List` for v3, `{model} list` for v2).
    #[serde(skip)]
    pub list_schema_name: Option<ListNameFn>,
}

impl fmt::Debug for Defaults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Defaults")
            .field(
                "operation_generators",
                &self.operation_generators.keys().collect::<Vec<_>>(),
            )
            .field("operations", &self.operations)
            .field("multi", &self.multi)
            .field("list_schema_name", &self.list_schema_name.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// Plugin configuration, consumed as plain data.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub open_api_version: OpenApiVersion,
    /// Overrides merged into the freshly created document (info block,
    /// servers, security schemes, ...), using the path-set syntax.
    pub specs: Map<String, Value>,
    /// Registration-path prefix stripped before tag/model derivation.
    pub prefix: Option<PathPattern>,
    /// Path segments matching this pattern become a version suffix on the
    /// derived tag.
    #[serde(deserialize_with = "optional_regex")]
    pub version_prefix: Option<Regex>,
    pub include: ServiceFilter,
    pub ignore: ServiceFilter,
    /// Root security requirement applied to operations listed in a service's
    /// `securities`.
    pub security: Vec<Value>,
    pub id_type: IdType,
    /// Extra query parameters documented on every `find` operation, ahead of
    /// the built-in `$limit`/`$skip`/`$sort`.
    pub find_query_parameters: Vec<Value>,
    /// Path the generated document is served at.
    pub docs_json_path: String,
    pub defaults: Defaults,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            open_api_version: OpenApiVersion::default(),
            specs: Map::new(),
            prefix: None,
            version_prefix: None,
            include: ServiceFilter::default(),
            ignore: ServiceFilter::default(),
            security: Vec::new(),
            id_type: IdType::default(),
            find_query_parameters: Vec::new(),
            docs_json_path: "/swagger.json".to_string(),
            defaults: Defaults::default(),
        }
    }
}

impl Config {
    pub fn new(open_api_version: u8) -> Result<Self, ConfigError> {
        Ok(Self {
            open_api_version: OpenApiVersion::try_from(open_api_version)?,
            ..Self::default()
        })
    }
}

fn optional_regex<'de, D>(deserializer: D) -> Result<Option<Regex>, D::Error>
where
    D: Deserializer<'de>,
{
    let pattern: Option<String> = Option::deserialize(deserializer)?;
    pattern
        .map(|raw| Regex::new(&raw).map_err(serde::de::Error::custom))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_version_validation() {
        assert_eq!(OpenApiVersion::try_from(2).unwrap(), OpenApiVersion::V2);
        assert_eq!(OpenApiVersion::try_from(3).unwrap(), OpenApiVersion::V3);
        let error = OpenApiVersion::try_from(4).unwrap_err();
        assert_eq!(
            error.to_string(),
            "Unsupported openApiVersion 4! Allowed versions: 2, 3"
        );
    }

    #[test]
    fn test_config_rejects_bad_version_at_load_time() {
        let result: Result<Config, _> = serde_json::from_value(json!({ "openApiVersion": 1 }));
        assert!(result.is_err());
    }

    #[test]
    fn test_path_pattern_strip() {
        let literal = PathPattern::Literal("api/".to_string());
        assert_eq!(literal.strip("api/users"), "users");

        let pattern: PathPattern = serde_json::from_value(json!({ "regex": "^api/v\\d+/" })).unwrap();
        assert_eq!(pattern.strip("api/v2/users"), "users");
    }

    #[test]
    fn test_empty_filter_matches_nothing() {
        let filter = ServiceFilter::default();
        assert!(filter.is_empty());
        assert!(!filter.matches("users", "users", &ServiceDescriptor::default()));
    }

    #[test]
    fn test_filter_matchers_are_ored() {
        let filter = ServiceFilter {
            tags: vec!["users".to_string()],
            paths: vec![PathPattern::Literal("messages".to_string())],
            filter: Some(Arc::new(|_, path| path.starts_with("admin"))),
        };
        let service = ServiceDescriptor::default();
        assert!(filter.matches("users", "anything", &service));
        assert!(filter.matches("other", "messages", &service));
        assert!(filter.matches("other", "admin/zone", &service));
        assert!(!filter.matches("other", "nothing", &service));
    }

    #[test]
    fn test_id_type_positional_lookup() {
        let id_type = IdType::Positional(vec!["integer".to_string(), "string".to_string()]);
        assert_eq!(id_type.type_at(0), "integer");
        assert_eq!(id_type.type_at(1), "string");
        assert_eq!(id_type.type_at(2), "integer");
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.open_api_version, OpenApiVersion::V3);
        assert_eq!(config.docs_json_path, "/swagger.json");
        assert_eq!(config.id_type, IdType::Single("integer".to_string()));
    }
}
