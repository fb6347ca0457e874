use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::config::{Config, OpenApiVersion};
use crate::generator::GeneratorError;
use crate::models::{Components, RootDocument};
use crate::service::SchemaRef;

/// Replacement for a built-in default operation generator.
pub type OperationGenerator = Arc<dyn Fn(&OperationContext<'_>) -> Value + Send + Sync>;

/// Contextual inputs a default operation is generated from.
pub struct OperationContext<'a> {
    /// Canonical operation name: `find`, `get`, ..., `updateMulti`, or a
    /// custom method name.
    pub method: String,
    pub tag: String,
    pub tags: Vec<String>,
    pub model: String,
    pub model_name: String,
    /// Id components addressed by this operation, in route order.
    pub id_names: Vec<String>,
    /// Parameter types for the id components, positionally.
    pub id_types: Vec<String>,
    /// Security requirement list for this operation; empty unless the
    /// service opted the operation in.
    pub security: Vec<Value>,
    /// Resolved schema objects per slot (`findResponse`, `createRequest`, ...).
    pub refs: BTreeMap<String, Value>,
    /// String path parameters of a custom method route.
    pub path_params: Vec<String>,
    pub config: &'a Config,
}

impl OperationContext<'_> {
    /// The resolved schema for a slot; an empty schema when nothing is
    /// registered under that name.
    pub fn schema(&self, slot: &str) -> Value {
        self.refs
            .get(slot)
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()))
    }
}

/// Default schema slots for the canonical operations: singular slots point at
/// the model schema, multi/list slots at the generated list schema.
pub fn default_refs(model: &str, list_name: &str) -> BTreeMap<String, SchemaRef> {
    const MODEL_SLOTS: [&str; 8] = [
        "getResponse",
        "createRequest",
        "createResponse",
        "updateRequest",
        "updateResponse",
        "patchRequest",
        "patchResponse",
        "removeResponse",
    ];
    const LIST_SLOTS: [&str; 6] = [
        "findResponse",
        "updateMultiRequest",
        "updateMultiResponse",
        "patchMultiRequest",
        "patchMultiResponse",
        "removeMultiResponse",
    ];

    let mut refs = BTreeMap::new();
    for slot in MODEL_SLOTS {
        refs.insert(slot.to_string(), SchemaRef::Name(model.to_string()));
    }
    for slot in LIST_SLOTS {
        refs.insert(slot.to_string(), SchemaRef::Name(list_name.to_string()));
    }
    refs
}

/// Everything that differs between the Swagger 2.0 and OpenAPI 3 output
/// dialects: document shape, schema-ref rendering, and per-method default
/// operation bodies. The orchestration in the generator is shared.
pub struct Dialect {
    version: OpenApiVersion,
    ref_path: fn(&str) -> String,
    list_name: fn(&str) -> String,
    document: fn() -> RootDocument,
    defaults: fn(&OperationContext<'_>) -> Option<Value>,
    custom: fn(&OperationContext<'_>) -> Value,
}

static V2_DIALECT: Dialect = Dialect {
    version: OpenApiVersion::V2,
    ref_path: v2_ref_path,
    list_name: v2_list_name,
    document: v2_document,
    defaults: v2_operation_defaults,
    custom: v2_custom_defaults,
};

static V3_DIALECT: Dialect = Dialect {
    version: OpenApiVersion::V3,
    ref_path: v3_ref_path,
    list_name: v3_list_name,
    document: v3_document,
    defaults: v3_operation_defaults,
    custom: v3_custom_defaults,
};

impl Dialect {
    pub fn for_version(version: OpenApiVersion) -> &'static Dialect {
        match version {
            OpenApiVersion::V2 => &V2_DIALECT,
            OpenApiVersion::V3 => &V3_DIALECT,
        }
    }

    pub fn version(&self) -> OpenApiVersion {
        self.version
    }

    /// Reference string for a registered schema name.
    pub fn schema_ref(&self, name: &str) -> String {
        (self.ref_path)(name)
    }

    /// Default name of the generated list schema for a model.
    pub fn list_schema_name(&self, model: &str) -> String {
        (self.list_name)(model)
    }

    /// The generated list schema: an array wrapping a ref to the model.
    pub fn list_schema_for(&self, model: &str) -> Value {
        json!({ "type": "array", "items": { "$ref": self.schema_ref(model) } })
    }

    /// Initial empty document for this dialect.
    pub fn default_document(&self) -> RootDocument {
        (self.document)()
    }

    /// Default operation body for a canonical operation name, if one exists.
    pub fn operation_defaults(&self, ctx: &OperationContext<'_>) -> Option<Value> {
        (self.defaults)(ctx)
    }

    /// Default operation body for a custom method.
    pub fn custom_operation(&self, ctx: &OperationContext<'_>) -> Value {
        (self.custom)(ctx)
    }

    /// Resolves a declared schema ref into a schema object. Composite refs
    /// are an OpenAPI 3 feature.
    pub fn resolve_ref(&self, schema_ref: &SchemaRef) -> Result<Value, GeneratorError> {
        match schema_ref {
            SchemaRef::Name(name) => Ok(json!({ "$ref": self.schema_ref(name) })),
            SchemaRef::Composite(composite) => {
                if self.version == OpenApiVersion::V2 {
                    return Err(GeneratorError::CompositeRefUnsupported);
                }
                let refs: Vec<Value> = composite
                    .refs
                    .iter()
                    .map(|name| json!({ "$ref": self.schema_ref(name) }))
                    .collect();
                let mut schema = Map::new();
                schema.insert(composite.kind.key().to_string(), Value::Array(refs));
                if let Some(discriminator) = &composite.discriminator {
                    schema.insert("discriminator".to_string(), discriminator.clone());
                }
                Ok(Value::Object(schema))
            }
        }
    }
}

fn v2_ref_path(name: &str) -> String {
    format!("#/definitions/{name}")
}

fn v3_ref_path(name: &str) -> String {
    format!("#/components/schemas/{name}")
}

fn v2_list_name(model: &str) -> String {
    format!("{model} list")
}

fn v3_list_name(model: &str) -> String {
    format!("{model}List")
}

fn v2_document() -> RootDocument {
    RootDocument {
        swagger: Some("2.0".to_string()),
        basePath: Some("/".to_string()),
        schemes: vec!["http".to_string()],
        consumes: vec!["application/json".to_string()],
        produces: vec!["application/json".to_string()],
        definitions: Some(Map::new()),
        ..RootDocument::default()
    }
}

fn v3_document() -> RootDocument {
    RootDocument {
        openapi: Some("3.0.3".to_string()),
        components: Some(Components::default()),
        ..RootDocument::default()
    }
}

const FIND_QUERY_DEFAULTS: [(&str, &str, &str); 3] = [
    ("$limit", "Number of results to return", "integer"),
    ("$skip", "Number of results to skip", "integer"),
    ("$sort", "Property to sort results", "string"),
];

/// Query parameters of a `find` operation: globally configured parameters
/// first, then the built-in listing parameters not shadowed by name.
fn find_parameters(ctx: &OperationContext<'_>, build: fn(&str, &str, &str) -> Value) -> Value {
    let mut parameters = ctx.config.find_query_parameters.clone();
    let taken: Vec<String> = parameters
        .iter()
        .filter_map(|parameter| parameter.get("name").and_then(Value::as_str))
        .map(str::to_string)
        .collect();
    for (name, description, ty) in FIND_QUERY_DEFAULTS {
        if !taken.iter().any(|existing| existing == name) {
            parameters.push(build(name, description, ty));
        }
    }
    Value::Array(parameters)
}

fn v2_query_param(name: &str, description: &str, ty: &str) -> Value {
    json!({ "description": description, "in": "query", "name": name, "type": ty })
}

fn v3_query_param(name: &str, description: &str, ty: &str) -> Value {
    json!({ "description": description, "in": "query", "name": name, "schema": { "type": ty } })
}

fn v2_id_parameters(ctx: &OperationContext<'_>, action: &str) -> Vec<Value> {
    ctx.id_names
        .iter()
        .enumerate()
        .map(|(position, name)| {
            json!({
                "description": format!("ID of {} {}", ctx.model_name, action),
                "in": "path",
                "required": true,
                "name": name,
                "type": ctx.id_types.get(position).map(String::as_str).unwrap_or("integer"),
            })
        })
        .collect()
}

fn v3_id_parameters(ctx: &OperationContext<'_>, action: &str) -> Vec<Value> {
    ctx.id_names
        .iter()
        .enumerate()
        .map(|(position, name)| {
            json!({
                "description": format!("ID of {} {}", ctx.model_name, action),
                "in": "path",
                "required": true,
                "name": name,
                "schema": {
                    "type": ctx.id_types.get(position).map(String::as_str).unwrap_or("integer"),
                },
            })
        })
        .collect()
}

fn v2_body_parameter(ctx: &OperationContext<'_>, slot: &str) -> Value {
    json!({ "in": "body", "name": "body", "required": true, "schema": ctx.schema(slot) })
}

fn v3_request_body(ctx: &OperationContext<'_>, slot: &str) -> Value {
    json!({ "required": true, "content": { "application/json": { "schema": ctx.schema(slot) } } })
}

fn v2_operation_defaults(ctx: &OperationContext<'_>) -> Option<Value> {
    let operation = match ctx.method.as_str() {
        "find" => json!({
            "tags": ctx.tags,
            "summary": "",
            "description": "Retrieves a list of all resources from the service.",
            "parameters": find_parameters(ctx, v2_query_param),
            "responses": {
                "200": { "description": "success", "schema": ctx.schema("findResponse") },
                "401": { "description": "not authenticated" },
                "500": { "description": "general error" },
            },
            "security": ctx.security,
        }),
        "get" => json!({
            "tags": ctx.tags,
            "summary": "",
            "description": "Retrieves a single resource with the given id from the service.",
            "parameters": v2_id_parameters(ctx, "to return"),
            "responses": {
                "200": { "description": "success", "schema": ctx.schema("getResponse") },
                "401": { "description": "not authenticated" },
                "404": { "description": "not found" },
                "500": { "description": "general error" },
            },
            "security": ctx.security,
        }),
        "create" => json!({
            "tags": ctx.tags,
            "summary": "",
            "description": "Creates a new resource with data.",
            "parameters": [v2_body_parameter(ctx, "createRequest")],
            "responses": {
                "201": { "description": "created", "schema": ctx.schema("createResponse") },
                "401": { "description": "not authenticated" },
                "500": { "description": "general error" },
            },
            "security": ctx.security,
        }),
        "update" => {
            let mut parameters = v2_id_parameters(ctx, "to update");
            parameters.push(v2_body_parameter(ctx, "updateRequest"));
            json!({
                "tags": ctx.tags,
                "summary": "",
                "description": "Updates the resource identified by id using data.",
                "parameters": parameters,
                "responses": {
                    "200": { "description": "success", "schema": ctx.schema("updateResponse") },
                    "401": { "description": "not authenticated" },
                    "404": { "description": "not found" },
                    "500": { "description": "general error" },
                },
                "security": ctx.security,
            })
        }
        "updateMulti" => json!({
            "tags": ctx.tags,
            "summary": "",
            "description": "Updates multiple resources.",
            "parameters": [v2_body_parameter(ctx, "updateMultiRequest")],
            "responses": {
                "200": { "description": "success", "schema": ctx.schema("updateMultiResponse") },
                "401": { "description": "not authenticated" },
                "500": { "description": "general error" },
            },
            "security": ctx.security,
        }),
        "patch" => {
            let mut parameters = v2_id_parameters(ctx, "to update");
            parameters.push(v2_body_parameter(ctx, "patchRequest"));
            json!({
                "tags": ctx.tags,
                "summary": "",
                "description": "Updates the resource identified by id using data.",
                "parameters": parameters,
                "responses": {
                    "200": { "description": "success", "schema": ctx.schema("patchResponse") },
                    "401": { "description": "not authenticated" },
                    "404": { "description": "not found" },
                    "500": { "description": "general error" },
                },
                "security": ctx.security,
            })
        }
        "patchMulti" => json!({
            "tags": ctx.tags,
            "summary": "",
            "description": "Updates multiple resources.",
            "parameters": [v2_body_parameter(ctx, "patchMultiRequest")],
            "responses": {
                "200": { "description": "success", "schema": ctx.schema("patchMultiResponse") },
                "401": { "description": "not authenticated" },
                "500": { "description": "general error" },
            },
            "security": ctx.security,
        }),
        "remove" => json!({
            "tags": ctx.tags,
            "summary": "",
            "description": "Removes the resource with id.",
            "parameters": v2_id_parameters(ctx, "to remove"),
            "responses": {
                "200": { "description": "success", "schema": ctx.schema("removeResponse") },
                "401": { "description": "not authenticated" },
                "404": { "description": "not found" },
                "500": { "description": "general error" },
            },
            "security": ctx.security,
        }),
        "removeMulti" => json!({
            "tags": ctx.tags,
            "summary": "",
            "description": "Removes multiple resources.",
            "parameters": [],
            "responses": {
                "200": { "description": "success", "schema": ctx.schema("removeMultiResponse") },
                "401": { "description": "not authenticated" },
                "500": { "description": "general error" },
            },
            "security": ctx.security,
        }),
        _ => return None,
    };
    Some(operation)
}

fn v3_operation_defaults(ctx: &OperationContext<'_>) -> Option<Value> {
    let operation = match ctx.method.as_str() {
        "find" => json!({
            "tags": ctx.tags,
            "summary": "",
            "description": "Retrieves a list of all resources from the service.",
            "parameters": find_parameters(ctx, v3_query_param),
            "responses": {
                "200": {
                    "description": "success",
                    "content": { "application/json": { "schema": ctx.schema("findResponse") } },
                },
                "401": { "description": "not authenticated" },
                "500": { "description": "general error" },
            },
            "security": ctx.security,
        }),
        "get" => json!({
            "tags": ctx.tags,
            "summary": "",
            "description": "Retrieves a single resource with the given id from the service.",
            "parameters": v3_id_parameters(ctx, "to return"),
            "responses": {
                "200": {
                    "description": "success",
                    "content": { "application/json": { "schema": ctx.schema("getResponse") } },
                },
                "401": { "description": "not authenticated" },
                "404": { "description": "not found" },
                "500": { "description": "general error" },
            },
            "security": ctx.security,
        }),
        "create" => json!({
            "tags": ctx.tags,
            "summary": "",
            "description": "Creates a new resource with data.",
            "parameters": [],
            "requestBody": v3_request_body(ctx, "createRequest"),
            "responses": {
                "201": {
                    "description": "created",
                    "content": { "application/json": { "schema": ctx.schema("createResponse") } },
                },
                "401": { "description": "not authenticated" },
                "500": { "description": "general error" },
            },
            "security": ctx.security,
        }),
        "update" => json!({
            "tags": ctx.tags,
            "summary": "",
            "description": "Updates the resource identified by id using data.",
            "parameters": v3_id_parameters(ctx, "to update"),
            "requestBody": v3_request_body(ctx, "updateRequest"),
            "responses": {
                "200": {
                    "description": "success",
                    "content": { "application/json": { "schema": ctx.schema("updateResponse") } },
                },
                "401": { "description": "not authenticated" },
                "404": { "description": "not found" },
                "500": { "description": "general error" },
            },
            "security": ctx.security,
        }),
        "updateMulti" => json!({
            "tags": ctx.tags,
            "summary": "",
            "description": "Updates multiple resources.",
            "parameters": [],
            "requestBody": v3_request_body(ctx, "updateMultiRequest"),
            "responses": {
                "200": {
                    "description": "success",
                    "content": { "application/json": { "schema": ctx.schema("updateMultiResponse") } },
                },
                "401": { "description": "not authenticated" },
                "500": { "description": "general error" },
            },
            "security": ctx.security,
        }),
        "patch" => json!({
            "tags": ctx.tags,
            "summary": "",
            "description": "Updates the resource identified by id using data.",
            "parameters": v3_id_parameters(ctx, "to update"),
            "requestBody": v3_request_body(ctx, "patchRequest"),
            "responses": {
                "200": {
                    "description": "success",
                    "content": { "application/json": { "schema": ctx.schema("patchResponse") } },
                },
                "401": { "description": "not authenticated" },
                "404": { "description": "not found" },
                "500": { "description": "general error" },
            },
            "security": ctx.security,
        }),
        "patchMulti" => json!({
            "tags": ctx.tags,
            "summary": "",
            "description": "Updates multiple resources.",
            "parameters": [],
            "requestBody": v3_request_body(ctx, "patchMultiRequest"),
            "responses": {
                "200": {
                    "description": "success",
                    "content": { "application/json": { "schema": ctx.schema("patchMultiResponse") } },
                },
                "401": { "description": "not authenticated" },
                "500": { "description": "general error" },
            },
            "security": ctx.security,
        }),
        "remove" => json!({
            "tags": ctx.tags,
            "summary": "",
            "description": "Removes the resource with id.",
            "parameters": v3_id_parameters(ctx, "to remove"),
            "responses": {
                "200": {
                    "description": "success",
                    "content": { "application/json": { "schema": ctx.schema("removeResponse") } },
                },
                "401": { "description": "not authenticated" },
                "404": { "description": "not found" },
                "500": { "description": "general error" },
            },
            "security": ctx.security,
        }),
        "removeMulti" => json!({
            "tags": ctx.tags,
            "summary": "",
            "description": "Removes multiple resources.",
            "parameters": [],
            "responses": {
                "200": {
                    "description": "success",
                    "content": { "application/json": { "schema": ctx.schema("removeMultiResponse") } },
                },
                "401": { "description": "not authenticated" },
                "500": { "description": "general error" },
            },
            "security": ctx.security,
        }),
        _ => return None,
    };
    Some(operation)
}

fn v2_custom_defaults(ctx: &OperationContext<'_>) -> Value {
    let parameters: Vec<Value> = ctx
        .path_params
        .iter()
        .map(|name| json!({ "in": "path", "name": name, "type": "string", "required": true }))
        .collect();
    json!({
        "tags": ctx.tags,
        "summary": "",
        "description": format!("A custom {} method.", ctx.method),
        "parameters": parameters,
        "responses": {},
        "security": ctx.security,
    })
}

fn v3_custom_defaults(ctx: &OperationContext<'_>) -> Value {
    let parameters: Vec<Value> = ctx
        .path_params
        .iter()
        .map(|name| {
            json!({ "in": "path", "name": name, "schema": { "type": "string" }, "required": true })
        })
        .collect();
    json!({
        "tags": ctx.tags,
        "summary": "",
        "description": format!("A custom {} method.", ctx.method),
        "parameters": parameters,
        "responses": {},
        "security": ctx.security,
    })
}
