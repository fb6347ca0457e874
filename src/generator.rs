use log::{debug, info};
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::assign;
use crate::config::{Config, ConfigError, OpenApiVersion};
use crate::defaults::{default_refs, Dialect, OperationContext};
use crate::models::{RootDocument, Tag};
use crate::service::{
    CustomMethod, CustomMethodRegistrar, DeclaredRegistrar, DocOptions, OperationOverride,
    SchemaRef, ServiceDescriptor, ServiceOptions,
};

/// Path segment placeholder a custom method route uses for the resource id.
const ID_PLACEHOLDER: &str = "__id";

#[derive(Error, Debug)]
pub enum GeneratorError {
    #[error("Multiple refs defined as object are only supported with openApiVersion 3")]
    CompositeRefUnsupported,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to serialize specification: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to serialize specification: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Builds the OpenAPI document for an application, one registered service at
/// a time.
///
/// The generator owns the document and is its only writer; services must be
/// added in registration order since tag upserts and schema registration are
/// order-dependent.
pub struct SpecGenerator {
    config: Config,
    dialect: &'static Dialect,
    document: RootDocument,
    registrar: Box<dyn CustomMethodRegistrar>,
}

/// One operation scheduled for generation.
struct PlannedOperation {
    name: String,
    verb: String,
    route: String,
    custom: bool,
    path_params: Vec<String>,
    id_names: Vec<String>,
}

impl SpecGenerator {
    /// Creates a generator with the dialect-specific empty document, seeded
    /// with the configured `specs` overrides.
    pub fn new(config: Config) -> Result<Self, GeneratorError> {
        let dialect = Dialect::for_version(config.open_api_version);
        let mut document = dialect.default_document();
        if !config.specs.is_empty() {
            document.merge_overrides(&config.specs)?;
        }
        Ok(Self {
            config,
            dialect,
            document,
            registrar: Box::new(DeclaredRegistrar),
        })
    }

    /// Swaps the custom-method discovery adapter.
    pub fn with_registrar(mut self, registrar: Box<dyn CustomMethodRegistrar>) -> Self {
        self.registrar = registrar;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The document built so far; the documentation endpoint serves this.
    pub fn document(&self) -> &RootDocument {
        &self.document
    }

    pub fn into_document(self) -> RootDocument {
        self.document
    }

    pub fn document_json(&self) -> Result<String, GeneratorError> {
        Ok(serde_json::to_string_pretty(&self.document)?)
    }

    pub fn document_yaml(&self) -> Result<String, GeneratorError> {
        Ok(serde_yaml::to_string(&self.document)?)
    }

    pub fn add_service(
        &mut self,
        service: &ServiceDescriptor,
        path: &str,
    ) -> Result<(), GeneratorError> {
        self.add_service_with_options(service, path, None)
    }

    /// Documents one registered service: derives its tag and model from the
    /// path, generates an operation per capability, applies the override
    /// layers, and upserts the tag entry.
    pub fn add_service_with_options(
        &mut self,
        service: &ServiceDescriptor,
        path: &str,
        options: Option<&ServiceOptions>,
    ) -> Result<(), GeneratorError> {
        let docs = options
            .and_then(|options| options.docs.clone())
            .or_else(|| service.docs.clone())
            .unwrap_or_default();

        let api_path = self.api_path(path);
        let (derived_tag, derived_model) =
            derive_tag_and_model(&api_path, self.config.version_prefix.as_ref());
        let tag = docs.tag.clone().unwrap_or(derived_tag);
        let model = docs.model.clone().unwrap_or(derived_model);
        let model_name = docs.model_name.clone().unwrap_or_else(|| model.clone());
        let tags = if docs.tags.is_empty() {
            vec![tag.clone()]
        } else {
            docs.tags.clone()
        };

        if !self.config.include.is_empty() && !self.config.include.matches(&tag, path, service) {
            debug!("Service at {path} not included in the documentation");
            return Ok(());
        }
        if self.config.ignore.matches(&tag, path, service) {
            debug!("Service at {path} ignored for documentation");
            return Ok(());
        }

        // Composite refs are a v3-only feature; reject them before touching
        // the document.
        if self.config.open_api_version == OpenApiVersion::V2
            && docs
                .refs
                .values()
                .any(|schema_ref| matches!(schema_ref, SchemaRef::Composite(_)))
        {
            return Err(GeneratorError::CompositeRefUnsupported);
        }

        let list_name = match &self.config.defaults.list_schema_name {
            Some(naming) => naming(&model),
            None => self.dialect.list_schema_name(&model),
        };
        self.register_schemas(&docs, &model, &list_name);

        let planned = self.plan_operations(service, path, &api_path, &docs, options);

        // Per-method overrides are consumed exactly once per service; work on
        // scratch copies so the caller's descriptor stays untouched.
        let mut config_overrides = self.config.defaults.operations.clone();
        let mut service_overrides = docs.operations.clone();
        let config_all = config_overrides.remove("all");
        let service_all = service_overrides.remove("all");

        for operation in planned {
            let config_override = config_overrides.remove(&operation.name);
            let service_override = service_overrides.remove(&operation.name);
            let layers = [&config_all, &config_override, &service_all, &service_override];

            if layers
                .iter()
                .any(|layer| layer.as_ref().is_some_and(OperationOverride::is_disabled))
            {
                debug!("Operation {} disabled for service at {path}", operation.name);
                continue;
            }

            let id_type = docs
                .id_type
                .clone()
                .unwrap_or_else(|| self.config.id_type.clone());
            let id_types: Vec<String> = (0..operation.id_names.len())
                .map(|position| id_type.type_at(position).to_string())
                .collect();
            let secured = docs
                .securities
                .iter()
                .any(|name| name == "all" || name == &operation.name);
            let security = if secured {
                self.config.security.clone()
            } else {
                Vec::new()
            };
            let refs = self.resolve_refs(&docs, &model, &list_name, &operation)?;

            let ctx = OperationContext {
                method: operation.name.clone(),
                tag: tag.clone(),
                tags: tags.clone(),
                model: model.clone(),
                model_name: model_name.clone(),
                id_names: operation.id_names.clone(),
                id_types,
                security,
                refs,
                path_params: operation.path_params.clone(),
                config: &self.config,
            };

            let default = match self.config.defaults.operation_generators.get(&operation.name) {
                Some(generate) => Some(generate(&ctx)),
                None if operation.custom => Some(self.dialect.custom_operation(&ctx)),
                None => self.dialect.operation_defaults(&ctx),
            };
            let Some(mut spec) = default else {
                debug!("No default generator for operation {}", operation.name);
                continue;
            };

            for layer in layers {
                if let Some(overrides) = layer.as_ref().and_then(OperationOverride::patch) {
                    assign::assign(&mut spec, std::slice::from_ref(overrides));
                }
            }

            let verbs = self
                .document
                .paths
                .entry(operation.route.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(entry) = verbs {
                entry.insert(operation.verb.clone(), spec);
            }
            debug!(
                "Added operation {} {} for service at {path}",
                operation.verb, operation.route
            );
        }

        self.upsert_tag(&docs, &tag);
        info!("Added service at {path} to the api documentation");
        Ok(())
    }

    /// Registers the schemas a service declares: its primary definition under
    /// the model name (plus a generated list schema), and any extra named
    /// definitions as given. Later entries overwrite earlier ones.
    fn register_schemas(&mut self, docs: &DocOptions, model: &str, list_name: &str) {
        let list_schema = self.dialect.list_schema_for(model);
        let schemas = self.document.schemas_mut();
        if let Some(definition) = docs.schema.clone().or_else(|| docs.definition.clone()) {
            schemas.insert(model.to_string(), definition);
            schemas.insert(list_name.to_string(), list_schema);
        }
        for (name, schema) in docs.definitions.iter().chain(docs.schemas.iter()) {
            schemas.insert(name.clone(), schema.clone());
        }
    }

    /// Determines the operation set of a service: implemented CRUD methods
    /// (narrowed by explicit registration options), their multi variants, and
    /// the custom methods the registrar discovers.
    fn plan_operations(
        &self,
        service: &ServiceDescriptor,
        path: &str,
        api_path: &str,
        docs: &DocOptions,
        options: Option<&ServiceOptions>,
    ) -> Vec<PlannedOperation> {
        const CRUD_METHODS: [(&str, &str, bool); 6] = [
            ("find", "get", false),
            ("get", "get", true),
            ("create", "post", false),
            ("update", "put", true),
            ("patch", "patch", true),
            ("remove", "delete", true),
        ];

        let base_route = format!("/{}", api_path.trim_matches('/'));
        let allowed_methods = options.and_then(|options| options.methods.as_ref());
        let multi_wanted = if docs.multi.is_empty() {
            &self.config.defaults.multi
        } else {
            &docs.multi
        };

        let mut planned = Vec::new();
        for (method, verb, addresses_id) in CRUD_METHODS {
            if !service.implements(method) {
                continue;
            }
            if let Some(allowed) = allowed_methods {
                if !allowed.iter().any(|name| name == method) {
                    continue;
                }
            }

            let id_names = operation_id_names(docs, method, service);
            let route = if addresses_id {
                id_route(&base_route, &id_names, service.id_separator())
            } else {
                base_route.clone()
            };
            planned.push(PlannedOperation {
                name: method.to_string(),
                verb: verb.to_string(),
                route,
                custom: false,
                path_params: Vec::new(),
                id_names,
            });

            if matches!(method, "update" | "patch" | "remove")
                && multi_wanted.iter().any(|name| name == method || name == "all")
                && service.multi.supports(method)
            {
                planned.push(PlannedOperation {
                    name: format!("{method}Multi"),
                    verb: verb.to_string(),
                    route: base_route.clone(),
                    custom: false,
                    path_params: Vec::new(),
                    id_names: Vec::new(),
                });
            }
        }

        for custom in self.registrar.custom_methods(service, path) {
            let (route, path_params) =
                custom_route(&base_route, &custom, &service.id_names(), service.id_separator());
            planned.push(PlannedOperation {
                name: custom.method.clone(),
                verb: custom.http_method.to_lowercase(),
                route,
                custom: true,
                path_params,
                id_names: service.id_names(),
            });
        }
        planned
    }

    /// Resolves the schema slots an operation's defaults refer to. Slot
    /// declarations from the service win over the built-in defaults.
    fn resolve_refs(
        &self,
        docs: &DocOptions,
        model: &str,
        list_name: &str,
        operation: &PlannedOperation,
    ) -> Result<BTreeMap<String, Value>, GeneratorError> {
        let mut refs = default_refs(model, list_name);
        if operation.custom {
            refs.insert(
                format!("{}Request", operation.name),
                SchemaRef::Name(model.to_string()),
            );
            refs.insert(
                format!("{}Response", operation.name),
                SchemaRef::Name(model.to_string()),
            );
        }
        for (slot, schema_ref) in &docs.refs {
            refs.insert(slot.clone(), schema_ref.clone());
        }
        refs.into_iter()
            .map(|(slot, schema_ref)| Ok((slot, self.dialect.resolve_ref(&schema_ref)?)))
            .collect()
    }

    /// Upserts the tag entry for a service. An existing entry keeps the
    /// fields it already declares unless `overwriteTagSpec` is set.
    fn upsert_tag(&mut self, docs: &DocOptions, tag: &str) {
        let description = docs
            .description
            .clone()
            .unwrap_or_else(|| format!("A {tag} service"));
        let entry = Tag {
            name: tag.to_string(),
            description: Some(description),
            externalDocs: docs.external_docs.clone(),
            extra: Map::new(),
        };
        match self.document.tags.iter_mut().find(|existing| existing.name == tag) {
            Some(existing) if docs.overwrite_tag_spec => *existing = entry,
            Some(existing) => existing.merge_missing(&entry),
            None => self.document.tags.push(entry),
        }
    }

    fn api_path(&self, path: &str) -> String {
        let stripped = match &self.config.prefix {
            Some(prefix) => prefix.strip(path),
            None => path.to_string(),
        };
        stripped.trim_matches('/').to_string()
    }
}

/// Derives the default tag and model from an api path: first segment and
/// second segment when the path is nested, the path itself otherwise. A
/// segment matching the version pattern is extracted and appended to the tag.
fn derive_tag_and_model(api_path: &str, version_prefix: Option<&Regex>) -> (String, String) {
    let segments: Vec<&str> = api_path.split('/').filter(|s| !s.is_empty()).collect();
    let version =
        version_prefix.and_then(|re| segments.iter().find(|segment| re.is_match(segment)).copied());
    let rest: Vec<&str> = match version_prefix {
        Some(re) => segments
            .iter()
            .filter(|segment| !re.is_match(segment))
            .copied()
            .collect(),
        None => segments,
    };

    let (tag, model) = match rest.as_slice() {
        [] => (api_path.to_string(), api_path.to_string()),
        [single] => (single.to_string(), single.to_string()),
        [first, second, ..] => (first.to_string(), second.to_string()),
    };
    match version {
        Some(version) => (format!("{tag} {version}"), model),
        None => (tag, model),
    }
}

fn operation_id_names(docs: &DocOptions, method: &str, service: &ServiceDescriptor) -> Vec<String> {
    match docs.id_names.get(method) {
        Some(name) => vec![name.clone()],
        None => service.id_names(),
    }
}

/// Route key for an id-addressed operation; composite ids render as one
/// placeholder per component, joined by the id separator.
fn id_route(base_route: &str, id_names: &[String], separator: &str) -> String {
    let placeholders: Vec<String> = id_names.iter().map(|name| format!("{{{name}}}")).collect();
    format!("{base_route}/{}", placeholders.join(separator))
}

/// Route key and string path parameters of a custom method. `:name` segments
/// become placeholders; the id placeholder sentinel renders as the id
/// component placeholders and contributes no string parameter.
fn custom_route(
    base_route: &str,
    custom: &CustomMethod,
    id_names: &[String],
    separator: &str,
) -> (String, Vec<String>) {
    let mut params = Vec::new();
    let mut rendered = Vec::new();
    for segment in custom.path.split('/').filter(|segment| !segment.is_empty()) {
        match segment.strip_prefix(':') {
            Some(name) if name == ID_PLACEHOLDER => {
                let placeholders: Vec<String> =
                    id_names.iter().map(|name| format!("{{{name}}}")).collect();
                rendered.push(placeholders.join(separator));
            }
            Some(name) => {
                params.push(name.to_string());
                rendered.push(format!("{{{name}}}"));
            }
            None => rendered.push(segment.to_string()),
        }
    }
    let route = if rendered.is_empty() {
        base_route.to_string()
    } else {
        format!("{base_route}/{}", rendered.join("/"))
    };
    (route, params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{IdType, PathPattern, ServiceFilter};
    use crate::service::{IdField, MultiCapability};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    fn docs(value: Value) -> DocOptions {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_find_only_service_generates_a_single_route() {
        let mut generator = SpecGenerator::new(Config::default()).unwrap();
        let service = ServiceDescriptor::with_methods(&["find"]);
        generator.add_service(&service, "messages").unwrap();

        let document = generator.document();
        assert_eq!(document.paths.len(), 1);
        let verbs = document.paths["/messages"].as_object().unwrap();
        assert_eq!(verbs.keys().collect::<Vec<_>>(), vec!["get"]);
    }

    #[test]
    fn test_full_crud_service_routes_and_verbs() {
        let mut generator = SpecGenerator::new(Config::default()).unwrap();
        let service =
            ServiceDescriptor::with_methods(&["find", "get", "create", "update", "patch", "remove"]);
        generator.add_service(&service, "messages").unwrap();

        let document = generator.document();
        let base = document.paths["/messages"].as_object().unwrap();
        assert_eq!(base.keys().collect::<Vec<_>>(), vec!["get", "post"]);
        let with_id = document.paths["/messages/{id}"].as_object().unwrap();
        assert_eq!(
            with_id.keys().collect::<Vec<_>>(),
            vec!["get", "put", "patch", "delete"]
        );
    }

    #[test]
    fn test_explicit_methods_narrow_the_operation_set() {
        let mut generator = SpecGenerator::new(Config::default()).unwrap();
        let service = ServiceDescriptor::with_methods(&["find", "get", "create"]);
        let options = ServiceOptions {
            methods: Some(vec!["find".to_string()]),
            docs: None,
        };
        generator
            .add_service_with_options(&service, "messages", Some(&options))
            .unwrap();

        let document = generator.document();
        assert_eq!(document.paths.len(), 1);
        let verbs = document.paths["/messages"].as_object().unwrap();
        assert_eq!(verbs.keys().collect::<Vec<_>>(), vec!["get"]);
    }

    #[test]
    fn test_disabled_operation_leaves_no_empty_route() {
        let mut generator = SpecGenerator::new(Config::default()).unwrap();
        let mut service = ServiceDescriptor::with_methods(&["find", "get"]);
        service.docs = Some(docs(json!({ "operations": { "find": false } })));
        generator.add_service(&service, "messages").unwrap();

        let document = generator.document();
        assert!(!document.paths.contains_key("/messages"));
        assert!(document.paths.contains_key("/messages/{id}"));
    }

    #[test]
    fn test_config_level_disable_applies_to_every_service() {
        let mut config = Config::default();
        config
            .defaults
            .operations
            .insert("find".to_string(), OperationOverride::Flag(false));
        let mut generator = SpecGenerator::new(config).unwrap();
        generator
            .add_service(&ServiceDescriptor::with_methods(&["find"]), "messages")
            .unwrap();

        assert!(generator.document().paths.is_empty());
    }

    #[test]
    fn test_security_gating_per_operation() {
        let mut config = Config::default();
        config.security = vec![json!({ "BearerAuth": [] })];
        let mut generator = SpecGenerator::new(config).unwrap();
        let mut service = ServiceDescriptor::with_methods(&["find", "create"]);
        service.docs = Some(docs(json!({ "securities": ["create"] })));
        generator.add_service(&service, "messages").unwrap();

        let document = generator.document();
        let create = document.operation("/messages", "post").unwrap();
        assert_eq!(create["security"], json!([{ "BearerAuth": [] }]));
        let find = document.operation("/messages", "get").unwrap();
        assert_eq!(find["security"], json!([]));
    }

    #[test]
    fn test_securities_all_covers_every_operation() {
        let mut config = Config::default();
        config.security = vec![json!({ "BearerAuth": [] })];
        let mut generator = SpecGenerator::new(config).unwrap();
        let mut service = ServiceDescriptor::with_methods(&["find", "get"]);
        service.docs = Some(docs(json!({ "securities": ["all"] })));
        generator.add_service(&service, "messages").unwrap();

        let document = generator.document();
        for (route, verb) in [("/messages", "get"), ("/messages/{id}", "get")] {
            let operation = document.operation(route, verb).unwrap();
            assert_eq!(operation["security"], json!([{ "BearerAuth": [] }]));
        }
    }

    #[test]
    fn test_composite_id_route_and_positional_types() {
        let mut config = Config::default();
        config.id_type = IdType::Positional(vec!["integer".to_string(), "string".to_string()]);
        let mut generator = SpecGenerator::new(config).unwrap();
        let mut service = ServiceDescriptor::with_methods(&["get"]);
        service.id = IdField::Composite(vec!["companyId".to_string(), "contactId".to_string()]);
        generator.add_service(&service, "contacts").unwrap();

        let document = generator.document();
        let operation = document
            .operation("/contacts/{companyId},{contactId}", "get")
            .unwrap();
        let parameters = operation["parameters"].as_array().unwrap();
        assert_eq!(parameters.len(), 2);
        assert_eq!(parameters[0]["name"], "companyId");
        assert_eq!(parameters[0]["schema"], json!({ "type": "integer" }));
        assert_eq!(parameters[1]["name"], "contactId");
        assert_eq!(parameters[1]["schema"], json!({ "type": "string" }));
    }

    #[test]
    fn test_custom_id_separator_in_route_key() {
        let mut generator = SpecGenerator::new(Config::default()).unwrap();
        let mut service = ServiceDescriptor::with_methods(&["get"]);
        service.id = IdField::Composite(vec!["a".to_string(), "b".to_string()]);
        service.id_separator = Some("|".to_string());
        generator.add_service(&service, "things").unwrap();

        assert!(generator.document().paths.contains_key("/things/{a}|{b}"));
    }

    #[test]
    fn test_id_name_override_per_operation() {
        let mut generator = SpecGenerator::new(Config::default()).unwrap();
        let mut service = ServiceDescriptor::with_methods(&["get", "remove"]);
        service.docs = Some(docs(json!({ "idNames": { "get": "slug" } })));
        generator.add_service(&service, "pages").unwrap();

        let document = generator.document();
        assert!(document.operation("/pages/{slug}", "get").is_some());
        assert!(document.operation("/pages/{id}", "delete").is_some());
    }

    #[test]
    fn test_tag_upsert_is_order_dependent() {
        let first = {
            let mut service = ServiceDescriptor::with_methods(&["find"]);
            service.docs = Some(docs(json!({ "description": "First one" })));
            service
        };
        let second = {
            let mut service = ServiceDescriptor::with_methods(&["get"]);
            service.docs = Some(docs(json!({ "description": "Second one" })));
            service
        };

        let mut forward = SpecGenerator::new(Config::default()).unwrap();
        forward.add_service(&first, "messages").unwrap();
        forward.add_service(&second, "messages").unwrap();
        assert_eq!(forward.document().tags.len(), 1);
        assert_eq!(
            forward.document().tags[0].description.as_deref(),
            Some("First one")
        );

        let mut reversed = SpecGenerator::new(Config::default()).unwrap();
        reversed.add_service(&second, "messages").unwrap();
        reversed.add_service(&first, "messages").unwrap();
        assert_eq!(
            reversed.document().tags[0].description.as_deref(),
            Some("Second one")
        );
    }

    #[test]
    fn test_overwrite_tag_spec_replaces_existing_entry() {
        let mut generator = SpecGenerator::new(Config::default()).unwrap();
        let mut first = ServiceDescriptor::with_methods(&["find"]);
        first.docs = Some(docs(json!({ "description": "First one" })));
        let mut second = ServiceDescriptor::with_methods(&["get"]);
        second.docs = Some(docs(json!({ "description": "Second one", "overwriteTagSpec": true })));

        generator.add_service(&first, "messages").unwrap();
        generator.add_service(&second, "messages").unwrap();
        assert_eq!(
            generator.document().tags[0].description.as_deref(),
            Some("Second one")
        );
    }

    #[test]
    fn test_include_and_ignore_apply_independently() {
        let mut config = Config::default();
        config.include = ServiceFilter {
            tags: vec!["messages".to_string(), "users".to_string()],
            ..ServiceFilter::default()
        };
        config.ignore = ServiceFilter {
            paths: vec![PathPattern::Literal("users".to_string())],
            ..ServiceFilter::default()
        };
        let mut generator = SpecGenerator::new(config).unwrap();
        let service = ServiceDescriptor::with_methods(&["find"]);

        generator.add_service(&service, "messages").unwrap();
        // Included by tag but still excluded by the ignore filter.
        generator.add_service(&service, "users").unwrap();
        // Not included at all.
        generator.add_service(&service, "orders").unwrap();

        let document = generator.document();
        assert_eq!(document.paths.len(), 1);
        assert!(document.paths.contains_key("/messages"));
    }

    #[test]
    fn test_prefix_and_version_prefix_shape_tag_and_routes() {
        let mut config = Config::default();
        config.prefix = Some(PathPattern::Literal("api/".to_string()));
        config.version_prefix = Some(Regex::new(r"^v\d+$").unwrap());
        let mut generator = SpecGenerator::new(config).unwrap();
        let service = ServiceDescriptor::with_methods(&["find"]);
        generator.add_service(&service, "api/v1/messages").unwrap();

        let document = generator.document();
        assert!(document.paths.contains_key("/v1/messages"));
        assert_eq!(document.tags[0].name, "messages v1");
        let find = document.operation("/v1/messages", "get").unwrap();
        assert_eq!(find["tags"], json!(["messages v1"]));
    }

    #[test]
    fn test_multi_variants_require_docs_and_capability() {
        let mut generator = SpecGenerator::new(Config::default()).unwrap();

        let mut capable = ServiceDescriptor::with_methods(&["update", "remove"]);
        capable.multi = MultiCapability::Methods(vec!["update".to_string()]);
        capable.docs = Some(docs(json!({ "multi": ["update", "remove"] })));
        generator.add_service(&capable, "messages").unwrap();

        let document = generator.document();
        // updateMulti lands on the id-less route, removeMulti is filtered out
        // because the service does not allow multi remove.
        let base = document.paths["/messages"].as_object().unwrap();
        assert_eq!(base.keys().collect::<Vec<_>>(), vec!["put"]);
        assert_eq!(
            base["put"]["responses"]["200"]["content"]["application/json"]["schema"]["$ref"],
            "#/components/schemas/messagesList"
        );
    }

    #[test]
    fn test_multi_all_from_config_defaults() {
        let mut config = Config::default();
        config.defaults.multi = vec!["all".to_string()];
        let mut generator = SpecGenerator::new(config).unwrap();
        let mut service = ServiceDescriptor::with_methods(&["patch"]);
        service.multi = MultiCapability::Flag(true);
        generator.add_service(&service, "messages").unwrap();

        let document = generator.document();
        assert!(document.operation("/messages", "patch").is_some());
        assert!(document.operation("/messages/{id}", "patch").is_some());
    }

    #[test]
    fn test_operation_override_layers_merge_in_order() {
        let mut config = Config::default();
        config.defaults.operations.insert(
            "find".to_string(),
            OperationOverride::Patch(object(json!({
                "summary": "from config",
                "description": "from config",
            }))),
        );
        let mut generator = SpecGenerator::new(config).unwrap();
        let mut service = ServiceDescriptor::with_methods(&["find"]);
        service.docs = Some(docs(json!({
            "operations": {
                "find": {
                    "description": "from service",
                    "parameters[-]": { "name": "$search", "in": "query" },
                },
            },
        })));
        generator.add_service(&service, "messages").unwrap();

        let find = generator.document().operation("/messages", "get").unwrap();
        assert_eq!(find["summary"], "from config");
        assert_eq!(find["description"], "from service");
        let parameters = find["parameters"].as_array().unwrap();
        assert_eq!(parameters[0]["name"], "$search");
        assert_eq!(parameters[1]["name"], "$limit");
    }

    #[test]
    fn test_operations_all_override_applies_to_each_operation() {
        let mut generator = SpecGenerator::new(Config::default()).unwrap();
        let mut service = ServiceDescriptor::with_methods(&["find", "get"]);
        service.docs = Some(docs(json!({
            "operations": { "all": { "x-internal": true } },
        })));
        generator.add_service(&service, "messages").unwrap();

        let document = generator.document();
        assert_eq!(document.operation("/messages", "get").unwrap()["x-internal"], json!(true));
        assert_eq!(
            document.operation("/messages/{id}", "get").unwrap()["x-internal"],
            json!(true)
        );
    }

    #[test]
    fn test_refs_override_changes_response_schema() {
        let mut generator = SpecGenerator::new(Config::default()).unwrap();
        let mut service = ServiceDescriptor::with_methods(&["find"]);
        service.docs = Some(docs(json!({ "refs": { "findResponse": "message_page" } })));
        generator.add_service(&service, "messages").unwrap();

        let find = generator.document().operation("/messages", "get").unwrap();
        assert_eq!(
            find["responses"]["200"]["content"]["application/json"]["schema"]["$ref"],
            "#/components/schemas/message_page"
        );
    }

    #[test]
    fn test_composite_ref_fails_fast_on_v2() {
        let mut generator = SpecGenerator::new(Config::new(2).unwrap()).unwrap();
        let mut service = ServiceDescriptor::with_methods(&["find"]);
        service.docs = Some(docs(json!({
            "refs": { "findResponse": { "refs": ["cat", "dog"], "type": "oneOf" } },
        })));

        let error = generator.add_service(&service, "pets").unwrap_err();
        assert!(matches!(error, GeneratorError::CompositeRefUnsupported));
        // Nothing was written before the failure.
        assert!(generator.document().paths.is_empty());
    }

    #[test]
    fn test_v2_service_registers_definitions() {
        let mut generator = SpecGenerator::new(Config::new(2).unwrap()).unwrap();
        let mut service = ServiceDescriptor::with_methods(&["find", "get"]);
        service.docs = Some(docs(json!({
            "definition": { "type": "object", "properties": { "content": { "type": "string" } } },
        })));
        generator.add_service(&service, "messages").unwrap();

        let document = generator.document();
        let definitions = document.definitions.as_ref().unwrap();
        assert!(definitions.contains_key("messages"));
        assert_eq!(
            definitions["messages list"],
            json!({ "type": "array", "items": { "$ref": "#/definitions/messages" } })
        );
        let find = document.operation("/messages", "get").unwrap();
        assert_eq!(
            find["responses"]["200"]["schema"]["$ref"],
            "#/definitions/messages list"
        );
    }

    #[test]
    fn test_extra_definitions_overwrite_generated_list_schema() {
        let mut generator = SpecGenerator::new(Config::default()).unwrap();
        let mut service = ServiceDescriptor::with_methods(&["find"]);
        service.docs = Some(docs(json!({
            "schema": { "type": "object" },
            "schemas": { "messagesList": { "type": "object", "properties": {} } },
        })));
        generator.add_service(&service, "messages").unwrap();

        let schemas = generator.document().schemas().unwrap();
        assert_eq!(schemas["messagesList"], json!({ "type": "object", "properties": {} }));
    }

    #[test]
    fn test_custom_method_route_params_and_defaults() {
        let mut generator = SpecGenerator::new(Config::default()).unwrap();
        let mut service = ServiceDescriptor::with_methods(&["find", "publish"]);
        service.custom = vec![CustomMethod {
            method: "publish".to_string(),
            http_method: "POST".to_string(),
            path: ":channel/publish".to_string(),
        }];
        generator.add_service(&service, "messages").unwrap();

        let operation = generator
            .document()
            .operation("/messages/{channel}/publish", "post")
            .unwrap();
        assert_eq!(operation["description"], "A custom publish method.");
        let parameters = operation["parameters"].as_array().unwrap();
        assert_eq!(parameters.len(), 1);
        assert_eq!(parameters[0]["name"], "channel");
        assert_eq!(parameters[0]["schema"], json!({ "type": "string" }));
    }

    #[test]
    fn test_custom_method_id_placeholder_sentinel() {
        let mut generator = SpecGenerator::new(Config::default()).unwrap();
        let mut service = ServiceDescriptor::with_methods(&["archive"]);
        service.custom = vec![CustomMethod {
            method: "archive".to_string(),
            http_method: "POST".to_string(),
            path: ":__id/archive".to_string(),
        }];
        generator.add_service(&service, "messages").unwrap();

        let operation = generator
            .document()
            .operation("/messages/{id}/archive", "post")
            .unwrap();
        // The sentinel contributes no string path parameter.
        assert_eq!(operation["parameters"], json!([]));
    }

    #[test]
    fn test_noop_registrar_discovers_nothing() {
        let mut generator = SpecGenerator::new(Config::default())
            .unwrap()
            .with_registrar(Box::new(crate::service::NoopRegistrar));
        let mut service = ServiceDescriptor::with_methods(&["publish"]);
        service.custom = vec![CustomMethod {
            method: "publish".to_string(),
            http_method: "POST".to_string(),
            path: "publish".to_string(),
        }];
        generator.add_service(&service, "messages").unwrap();

        assert!(generator.document().paths.is_empty());
    }

    #[test]
    fn test_custom_operation_generator_replaces_default() {
        let mut config = Config::default();
        config.defaults.operation_generators.insert(
            "find".to_string(),
            std::sync::Arc::new(|ctx| {
                json!({
                    "tags": ctx.tags,
                    "summary": "listing",
                    "description": "",
                    "parameters": [],
                    "responses": {},
                    "security": ctx.security,
                })
            }),
        );
        let mut generator = SpecGenerator::new(config).unwrap();
        generator
            .add_service(&ServiceDescriptor::with_methods(&["find"]), "messages")
            .unwrap();

        let find = generator.document().operation("/messages", "get").unwrap();
        assert_eq!(find["summary"], "listing");
        assert!(find.get("requestBody").is_none());
    }

    #[test]
    fn test_service_options_docs_take_precedence() {
        let mut generator = SpecGenerator::new(Config::default()).unwrap();
        let mut service = ServiceDescriptor::with_methods(&["find"]);
        service.docs = Some(docs(json!({ "description": "from service" })));
        let options = ServiceOptions {
            methods: None,
            docs: Some(docs(json!({ "description": "from options" }))),
        };
        generator
            .add_service_with_options(&service, "messages", Some(&options))
            .unwrap();

        assert_eq!(
            generator.document().tags[0].description.as_deref(),
            Some("from options")
        );
    }

    #[test]
    fn test_caller_descriptor_is_not_mutated() {
        let mut generator = SpecGenerator::new(Config::default()).unwrap();
        let mut service = ServiceDescriptor::with_methods(&["find"]);
        service.docs = Some(docs(json!({
            "operations": { "find": { "description": "once" } },
        })));
        let before = serde_json::to_value(&service).unwrap();
        generator.add_service(&service, "messages").unwrap();
        let after = serde_json::to_value(&service).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_specs_overrides_seed_the_document() {
        let mut config = Config::default();
        config.specs = object(json!({
            "info.title": "Message API",
            "info.version": "1.0.0",
        }));
        let generator = SpecGenerator::new(config).unwrap();
        assert_eq!(generator.document().info.title, "Message API");
    }

    #[test]
    fn test_derive_tag_and_model_from_nested_path() {
        let (tag, model) = derive_tag_and_model("users/contacts", None);
        assert_eq!(tag, "users");
        assert_eq!(model, "contacts");

        let (tag, model) = derive_tag_and_model("messages", None);
        assert_eq!(tag, "messages");
        assert_eq!(model, "messages");
    }
}
